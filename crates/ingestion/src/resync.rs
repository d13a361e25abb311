//! Date-resync utility
//!
//! Rows stored before the ISO date field existed carry only the raw
//! display date. This sweep backfills the ISO field from the raw value
//! and propagates any non-empty ISO date into the sort timestamp.
//! Idempotent, operator triggered, independent of ingestion.

use crate::dates;
use pubharvest_common::db::models::Publication;
use pubharvest_common::db::{PublicationFields, Store};
use pubharvest_common::errors::Result;
use serde::Serialize;
use tracing::{info, instrument};

/// Outcome of a date rebuild sweep
#[derive(Debug, Default, Clone, Serialize)]
pub struct RebuildSummary {
    /// Rows scanned
    pub scanned: usize,
    /// Rows whose ISO date was backfilled from the raw value
    pub backfilled: usize,
    /// Rows whose sort timestamp was resynchronized
    pub resynced: usize,
}

/// Repair one publication's date fields. Returns
/// (iso backfilled, sort timestamp resynced).
pub async fn resync_publication(
    store: &dyn Store,
    publication: &Publication,
) -> Result<(bool, bool)> {
    let mut iso = publication.pubdate_iso.clone();
    let mut backfilled = false;

    if iso.is_empty() && !publication.pubdate_raw.is_empty() {
        let candidate = dates::to_iso(publication.pubdate_raw.trim());
        if !candidate.is_empty() {
            let mut fields = PublicationFields::from_publication(publication);
            fields.pubdate_iso = candidate.clone();
            store.overwrite_publication(publication.id, &fields).await?;
            iso = candidate;
            backfilled = true;
        }
    }

    if iso.is_empty() {
        return Ok((false, false));
    }

    store.set_published_at(publication.id, &iso).await?;
    Ok((backfilled, true))
}

/// Sweep every live publication
#[instrument(skip(store))]
pub async fn rebuild_dates(store: &dyn Store) -> Result<RebuildSummary> {
    let mut summary = RebuildSummary::default();

    for publication in store.list_publications().await? {
        summary.scanned += 1;
        let (backfilled, resynced) = resync_publication(store, &publication).await?;
        if backfilled {
            summary.backfilled += 1;
        }
        if resynced {
            summary.resynced += 1;
        }
    }

    info!(
        scanned = summary.scanned,
        backfilled = summary.backfilled,
        resynced = summary.resynced,
        "Date rebuild complete"
    );

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pubharvest_common::db::MemoryStore;

    async fn insert(store: &MemoryStore, raw: &str, iso: &str) -> Publication {
        store
            .insert_publication(&PublicationFields {
                pmid: "1".into(),
                title: "T".into(),
                pubdate_raw: raw.into(),
                pubdate_iso: iso.into(),
                ..Default::default()
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_backfills_iso_from_legacy_raw_date() {
        let store = MemoryStore::new();
        insert(&store, "2019 Mar", "").await;

        let summary = rebuild_dates(&store).await.unwrap();
        assert_eq!(summary.scanned, 1);
        assert_eq!(summary.backfilled, 1);
        assert_eq!(summary.resynced, 1);

        let publication = store.find_publication_by_pmid("1").await.unwrap().unwrap();
        assert_eq!(publication.pubdate_iso, "2019-03-28");
        assert!(publication.published_at.is_some());
    }

    #[tokio::test]
    async fn test_existing_iso_only_resyncs_timestamp() {
        let store = MemoryStore::new();
        insert(&store, "2019 Mar", "2020-01-15").await;

        let summary = rebuild_dates(&store).await.unwrap();
        assert_eq!(summary.backfilled, 0);
        assert_eq!(summary.resynced, 1);

        let publication = store.find_publication_by_pmid("1").await.unwrap().unwrap();
        assert_eq!(publication.pubdate_iso, "2020-01-15");
        let published_at = publication.published_at.unwrap();
        assert_eq!(published_at.to_rfc3339(), "2020-01-15T00:00:00+00:00");
    }

    #[tokio::test]
    async fn test_unusable_dates_are_left_alone() {
        let store = MemoryStore::new();
        insert(&store, "ahead of print", "").await;

        let summary = rebuild_dates(&store).await.unwrap();
        assert_eq!(summary.backfilled, 0);
        assert_eq!(summary.resynced, 0);

        let publication = store.find_publication_by_pmid("1").await.unwrap().unwrap();
        assert_eq!(publication.pubdate_iso, "");
        assert!(publication.published_at.is_none());
    }

    #[tokio::test]
    async fn test_rebuild_is_idempotent() {
        let store = MemoryStore::new();
        insert(&store, "2019 Mar", "").await;

        rebuild_dates(&store).await.unwrap();
        let summary = rebuild_dates(&store).await.unwrap();

        assert_eq!(summary.backfilled, 0);
        assert_eq!(summary.resynced, 1);

        let publication = store.find_publication_by_pmid("1").await.unwrap().unwrap();
        assert_eq!(publication.pubdate_iso, "2019-03-28");
    }
}
