//! Record upsert and association
//!
//! Finds or creates the stored publication for a normalized record,
//! overwrites its fields (last-write-wins, no field-level merge), and
//! attaches the originating author. The association set only ever
//! grows here; ingestion never deletes.

use pubharvest_common::db::models::Author;
use pubharvest_common::db::{PublicationFields, Store};
use pubharvest_common::errors::Result;
use pubharvest_common::records::NormalizedRecord;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

pub struct RecordUpserter {
    store: Arc<dyn Store>,
}

impl RecordUpserter {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Upsert one record and associate it with `author`. Returns the
    /// stored publication id.
    pub async fn upsert(&self, record: &NormalizedRecord, author: &Author) -> Result<Uuid> {
        let fields = publication_fields(record);

        // Dedup by PMID first, exact title second
        let mut existing = None;
        if !record.pmid.is_empty() {
            existing = self.store.find_publication_by_pmid(&record.pmid).await?;
        }
        if existing.is_none() && !record.title.is_empty() {
            existing = self.store.find_publication_by_title(&record.title).await?;
        }

        let publication = match existing {
            Some(publication) => {
                debug!(publication_id = %publication.id, pmid = %record.pmid, "Overwriting existing publication");
                self.store
                    .overwrite_publication(publication.id, &fields)
                    .await?
            }
            None => self.store.insert_publication(&fields).await?,
        };

        if !fields.pubdate_iso.is_empty() {
            self.store
                .set_published_at(publication.id, &fields.pubdate_iso)
                .await?;
        }

        self.store.attach_author(publication.id, author.id).await?;

        Ok(publication.id)
    }
}

/// Map a normalized record onto stored field values. All three date
/// forms are written together; a title-less record is stored under its
/// PMID.
fn publication_fields(record: &NormalizedRecord) -> PublicationFields {
    let title = if record.title.is_empty() {
        format!("PMID {}", record.pmid)
    } else {
        record.title.clone()
    };

    PublicationFields {
        pmid: record.pmid.clone(),
        title,
        journal: record.journal.clone(),
        pubdate_raw: record.display_date.clone(),
        pubdate_display: record.display_date.clone(),
        pubdate_iso: record.iso_date.clone(),
        authors: record.authors.clone(),
        doi: record.doi.clone(),
        pmcid: record.pmcid.clone(),
        url: record.url.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pubharvest_common::db::MemoryStore;

    fn record(pmid: &str, title: &str, iso: &str) -> NormalizedRecord {
        NormalizedRecord {
            pmid: pmid.to_string(),
            title: title.to_string(),
            iso_date: iso.to_string(),
            display_date: "2021 Jun".to_string(),
            ..Default::default()
        }
    }

    async fn store_with_author() -> (Arc<MemoryStore>, Author) {
        let store = Arc::new(MemoryStore::new());
        let author = store.save_author("Henderson", "", None).await.unwrap();
        (store, author)
    }

    #[tokio::test]
    async fn test_upsert_is_idempotent() {
        let (store, author) = store_with_author().await;
        let upserter = RecordUpserter::new(store.clone());
        let r = record("1", "Title", "2021-06-28");

        let first = upserter.upsert(&r, &author).await.unwrap();
        let second = upserter.upsert(&r, &author).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(store.list_publications().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_pmid_match_wins_over_title_change() {
        let (store, author) = store_with_author().await;
        let upserter = RecordUpserter::new(store.clone());

        upserter
            .upsert(&record("1", "Original title", ""), &author)
            .await
            .unwrap();
        upserter
            .upsert(&record("1", "Corrected title", ""), &author)
            .await
            .unwrap();

        let publications = store.list_publications().await.unwrap();
        assert_eq!(publications.len(), 1);
        assert_eq!(publications[0].title, "Corrected title");
    }

    #[tokio::test]
    async fn test_title_dedup_without_pmid() {
        let (store, author) = store_with_author().await;
        let upserter = RecordUpserter::new(store.clone());

        upserter
            .upsert(&record("", "Shared title", ""), &author)
            .await
            .unwrap();
        upserter
            .upsert(&record("", "Shared title", ""), &author)
            .await
            .unwrap();

        assert_eq!(store.list_publications().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_title_falls_back_to_pmid() {
        let (store, author) = store_with_author().await;
        let upserter = RecordUpserter::new(store.clone());

        let id = upserter.upsert(&record("99", "", ""), &author).await.unwrap();

        let publications = store.list_publications().await.unwrap();
        assert_eq!(publications[0].id, id);
        assert_eq!(publications[0].title, "PMID 99");
    }

    #[tokio::test]
    async fn test_association_is_additive_across_authors() {
        let (store, author_a) = store_with_author().await;
        let author_b = store.save_author("Smith", "", None).await.unwrap();
        let upserter = RecordUpserter::new(store.clone());
        let r = record("1", "Co-authored", "");

        let id = upserter.upsert(&r, &author_a).await.unwrap();
        upserter.upsert(&r, &author_b).await.unwrap();

        let mut owners = store.author_ids_for(id).await.unwrap();
        owners.sort();
        let mut expected = vec![author_a.id, author_b.id];
        expected.sort();
        assert_eq!(owners, expected);
    }

    #[tokio::test]
    async fn test_nonempty_iso_date_syncs_sort_timestamp() {
        let (store, author) = store_with_author().await;
        let upserter = RecordUpserter::new(store.clone());

        let id = upserter
            .upsert(&record("1", "Dated", "2021-06-28"), &author)
            .await
            .unwrap();

        let publication = store.find_publication_by_pmid("1").await.unwrap().unwrap();
        assert_eq!(publication.id, id);
        let published_at = publication.published_at.unwrap();
        assert_eq!(published_at.to_rfc3339(), "2021-06-28T00:00:00+00:00");
    }

    #[tokio::test]
    async fn test_empty_iso_date_leaves_sort_timestamp_unset() {
        let (store, author) = store_with_author().await;
        let upserter = RecordUpserter::new(store.clone());

        upserter.upsert(&record("1", "Undated", ""), &author).await.unwrap();

        let publication = store.find_publication_by_pmid("1").await.unwrap().unwrap();
        assert!(publication.published_at.is_none());
    }
}
