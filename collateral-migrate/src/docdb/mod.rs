//! Document database access
//!
//! Query and whole-document replace against a single container. The client
//! follows continuation tokens itself, so callers always see a complete
//! result set.

pub mod auth;
pub mod client;

pub use client::{ContainerRef, DocumentClient, DocumentStore};
