//! The persistent store interface required of the host
//!
//! The ingestion core talks to storage exclusively through this trait.
//! `Repository` implements it over PostgreSQL; `MemoryStore` implements
//! it over hash maps for tests and local development.

use crate::db::models::{Author, Publication};
use crate::errors::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use sea_orm::prelude::DateTimeWithTimeZone;
use uuid::Uuid;

/// Field values written to a publication on insert or overwrite.
///
/// Every subsequent sighting of a record overwrites all of these
/// (last-write-wins); the association set is managed separately.
/// Strings use empty-for-absent, matching the upstream payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublicationFields {
    pub pmid: String,
    pub title: String,
    pub journal: String,
    pub pubdate_raw: String,
    pub pubdate_display: String,
    pub pubdate_iso: String,
    pub authors: String,
    pub doi: String,
    pub pmcid: String,
    pub url: String,
}

impl PublicationFields {
    /// Rebuild the field set from a stored row, e.g. to rewrite one
    /// field while keeping the rest.
    pub fn from_publication(publication: &Publication) -> Self {
        Self {
            pmid: publication.pmid.clone().unwrap_or_default(),
            title: publication.title.clone(),
            journal: publication.journal.clone(),
            pubdate_raw: publication.pubdate_raw.clone(),
            pubdate_display: publication.pubdate_display.clone(),
            pubdate_iso: publication.pubdate_iso.clone(),
            authors: publication.authors.clone(),
            doi: publication.doi.clone(),
            pmcid: publication.pmcid.clone(),
            url: publication.url.clone(),
        }
    }
}

/// Convert a canonical `YYYY-MM-DD` date into the externally visible
/// sort timestamp (midnight UTC). `None` when the string is not a
/// valid calendar date.
pub fn published_at_from_iso(iso: &str) -> Option<DateTimeWithTimeZone> {
    let date = NaiveDate::parse_from_str(iso, "%Y-%m-%d").ok()?;
    let naive = date.and_hms_opt(0, 0, 0)?;
    Some(chrono::DateTime::<chrono::Utc>::from_naive_utc_and_offset(naive, chrono::Utc).into())
}

/// Store operations the ingestion core requires of the host.
///
/// Dedup lookups and listings exclude trashed rows. Association
/// updates are idempotent.
#[async_trait]
pub trait Store: Send + Sync {
    // Authors
    async fn find_author(&self, id: Uuid) -> Result<Option<Author>>;
    async fn find_author_by_name(&self, name: &str) -> Result<Option<Author>>;
    async fn list_authors(&self) -> Result<Vec<Author>>;

    /// Create or update an author by name
    async fn save_author(
        &self,
        name: &str,
        query: &str,
        bibliography_url: Option<&str>,
    ) -> Result<Author>;

    /// Remove an author and its remaining association rows
    async fn delete_author(&self, id: Uuid) -> Result<()>;

    // Publications
    async fn find_publication_by_pmid(&self, pmid: &str) -> Result<Option<Publication>>;
    async fn find_publication_by_title(&self, title: &str) -> Result<Option<Publication>>;
    async fn insert_publication(&self, fields: &PublicationFields) -> Result<Publication>;

    /// Overwrite every field of an existing publication
    async fn overwrite_publication(
        &self,
        id: Uuid,
        fields: &PublicationFields,
    ) -> Result<Publication>;

    /// Set the externally visible sort timestamp from an ISO date
    /// string. An unparseable string is a no-op, never an error.
    async fn set_published_at(&self, id: Uuid, iso_date: &str) -> Result<()>;

    /// Soft-delete a publication
    async fn trash_publication(&self, id: Uuid) -> Result<()>;

    /// All live publications (date-resync sweep)
    async fn list_publications(&self) -> Result<Vec<Publication>>;

    /// Live publications associated with an author, newest first
    async fn publications_for_author(
        &self,
        author_id: Uuid,
        limit: Option<u64>,
    ) -> Result<Vec<Publication>>;

    // Associations
    async fn attach_author(&self, publication_id: Uuid, author_id: Uuid) -> Result<()>;
    async fn detach_author(&self, publication_id: Uuid, author_id: Uuid) -> Result<()>;
    async fn author_ids_for(&self, publication_id: Uuid) -> Result<Vec<Uuid>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_published_at_from_iso() {
        let ts = published_at_from_iso("2021-06-28").unwrap();
        assert_eq!(ts.to_rfc3339(), "2021-06-28T00:00:00+00:00");

        assert!(published_at_from_iso("").is_none());
        assert!(published_at_from_iso("2021").is_none());
        assert!(published_at_from_iso("2021-13-01").is_none());
    }
}
