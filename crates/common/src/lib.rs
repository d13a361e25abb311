//! PubHarvest Common Library
//!
//! Shared code for the PubHarvest services including:
//! - Database entities, store trait, and repository
//! - Response cache (Redis and in-memory)
//! - Error types and handling
//! - Configuration management
//! - Metrics and observability

pub mod cache;
pub mod config;
pub mod db;
pub mod errors;
pub mod metrics;
pub mod records;

// Re-export commonly used types
pub use cache::{MemoryCache, RedisCache, ResponseCache};
pub use config::AppConfig;
pub use db::{DbPool, MemoryStore, PublicationFields, Repository, Store};
pub use errors::{AppError, Result};
pub use records::NormalizedRecord;

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
