//! Request shaping for the migration backends
//!
//! Concurrency limiting for the catalog API and fixed-delay throttling
//! settings for the document store.

pub mod concurrency;
pub mod config;

pub use concurrency::{ConcurrencyLimiter, ConcurrencyStats};
pub use config::{ConcurrencyConfig, ResilienceConfig, ThrottleConfig};
