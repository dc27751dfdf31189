//! Catalog (commerce) service API module
//!
//! Typed access to the products, buyers and user groups the migration reads
//! and patches, behind the [`CatalogApi`] trait so the migration engine can
//! run against an in-memory catalog in tests.

pub mod auth;
pub mod client;
pub mod models;
pub mod query;
pub mod resilience;

pub use auth::CredentialSet;
pub use client::{CatalogApi, CatalogClient};
pub use models::{Buyer, ExtendedRecord, ListPage, Product, UserGroup};
pub use query::ListOptions;
pub use resilience::{ConcurrencyConfig, ResilienceConfig, ThrottleConfig};
