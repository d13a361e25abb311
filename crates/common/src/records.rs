//! Normalized record types exchanged between the search client, cache,
//! and store.

use serde::{Deserialize, Serialize};

/// A bibliographic record after normalization, ready to be cached and
/// upserted. String fields use the empty string for "absent", mirroring
/// the upstream payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedRecord {
    /// Upstream external id (PMID)
    pub pmid: String,
    pub title: String,
    pub journal: String,
    /// Canonical calendar date; when non-empty, always a valid `YYYY-MM-DD`
    pub iso_date: String,
    /// Human-facing date string, independent of the ISO value
    pub display_date: String,
    /// Author names joined with `", "`
    pub authors: String,
    pub doi: String,
    pub pmcid: String,
    /// Canonical article URL derived from the PMID
    pub url: String,
}

impl NormalizedRecord {
    /// A record with neither an external id nor a title has nothing to
    /// key on and is skipped during ingestion.
    pub fn is_identifiable(&self) -> bool {
        !self.pmid.is_empty() || !self.title.is_empty()
    }
}
