//! PubHarvest ingestion pipeline
//!
//! Pulls bibliographic records per author from the NCBI E-utilities
//! API, normalizes publication dates, dedups against stored records,
//! and maintains author associations:
//! 1. Resolve the effective query from the author's stored settings
//! 2. Two-phase remote fetch (esearch then esummary), cached
//! 3. Normalize dates and identifiers
//! 4. Upsert into the store and associate with the author

pub mod dates;
pub mod eutils;
pub mod lifecycle;
pub mod pipeline;
pub mod query;
pub mod resync;
pub mod upsert;

pub use eutils::{HttpBackend, SearchBackend, SearchClient};
pub use lifecycle::{AuthorLifecycle, DeleteMode, DeleteOutcome};
pub use pipeline::{IngestionPipeline, RunSummary, SweepSummary};
pub use resync::{rebuild_dates, RebuildSummary};
