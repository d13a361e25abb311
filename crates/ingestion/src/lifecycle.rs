//! Author lifecycle: deletion with cascading record disposition
//!
//! Removing an author must decide what happens to its publications.
//! `Keep` detaches the author everywhere; `Purge` trashes publications
//! owned exclusively by the author while co-owned records survive with
//! the membership removed. The author row itself goes last, after
//! every publication has been dealt with.

use pubharvest_common::db::Store;
use pubharvest_common::errors::Result;
use pubharvest_common::metrics;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// What happens to a deleted author's publications
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeleteMode {
    /// Detach the author everywhere; never delete a publication
    #[default]
    Keep,
    /// Trash publications owned exclusively by this author
    Purge,
}

/// Caller-visible outcome, including the mode actually applied so an
/// operator-facing notice can state whether exclusive records were
/// purged
#[derive(Debug, Clone, Serialize)]
pub struct DeleteOutcome {
    pub mode: DeleteMode,
    pub detached: usize,
    pub trashed: usize,
}

pub struct AuthorLifecycle {
    store: Arc<dyn Store>,
}

impl AuthorLifecycle {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Delete an author. Returns `None` when the author does not exist.
    #[instrument(skip(self))]
    pub async fn delete_author(
        &self,
        id: Uuid,
        mode: DeleteMode,
    ) -> Result<Option<DeleteOutcome>> {
        let Some(author) = self.store.find_author(id).await? else {
            return Ok(None);
        };

        let mut outcome = DeleteOutcome {
            mode,
            detached: 0,
            trashed: 0,
        };

        for publication in self.store.publications_for_author(id, None).await? {
            let exclusive = mode == DeleteMode::Purge
                && self.store.author_ids_for(publication.id).await?.len() <= 1;

            if exclusive {
                self.store.trash_publication(publication.id).await?;
                outcome.trashed += 1;
            } else {
                self.store.detach_author(publication.id, id).await?;
                outcome.detached += 1;
            }
        }

        self.store.delete_author(id).await?;

        metrics::record_trashed(outcome.trashed);
        info!(
            author = %author.name,
            mode = ?mode,
            detached = outcome.detached,
            trashed = outcome.trashed,
            "Author deleted"
        );

        Ok(Some(outcome))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pubharvest_common::db::models::Author;
    use pubharvest_common::db::{MemoryStore, PublicationFields};

    struct Fixture {
        store: Arc<MemoryStore>,
        lifecycle: AuthorLifecycle,
        henderson: Author,
        smith: Author,
        /// Owned by Henderson alone
        exclusive: Uuid,
        /// Co-owned by Henderson and Smith
        shared: Uuid,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let henderson = store.save_author("Henderson", "", None).await.unwrap();
        let smith = store.save_author("Smith", "", None).await.unwrap();

        let exclusive = store
            .insert_publication(&PublicationFields {
                pmid: "1".into(),
                title: "Exclusive".into(),
                ..Default::default()
            })
            .await
            .unwrap()
            .id;
        let shared = store
            .insert_publication(&PublicationFields {
                pmid: "2".into(),
                title: "Shared".into(),
                ..Default::default()
            })
            .await
            .unwrap()
            .id;

        store.attach_author(exclusive, henderson.id).await.unwrap();
        store.attach_author(shared, henderson.id).await.unwrap();
        store.attach_author(shared, smith.id).await.unwrap();

        let lifecycle = AuthorLifecycle::new(store.clone());

        Fixture {
            store,
            lifecycle,
            henderson,
            smith,
            exclusive,
            shared,
        }
    }

    #[tokio::test]
    async fn test_purge_trashes_exclusive_and_detaches_shared() {
        let f = fixture().await;

        let outcome = f
            .lifecycle
            .delete_author(f.henderson.id, DeleteMode::Purge)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(outcome.mode, DeleteMode::Purge);
        assert_eq!(outcome.trashed, 1);
        assert_eq!(outcome.detached, 1);

        // Exclusive publication is trashed, shared one survives
        assert!(f.store.find_publication_by_pmid("1").await.unwrap().is_none());
        let shared = f.store.find_publication_by_pmid("2").await.unwrap().unwrap();
        assert_eq!(shared.id, f.shared);
        assert_eq!(
            f.store.author_ids_for(f.shared).await.unwrap(),
            vec![f.smith.id]
        );

        assert!(f.store.find_author(f.henderson.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_keep_detaches_everything_and_deletes_nothing() {
        let f = fixture().await;

        let outcome = f
            .lifecycle
            .delete_author(f.henderson.id, DeleteMode::Keep)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(outcome.mode, DeleteMode::Keep);
        assert_eq!(outcome.trashed, 0);
        assert_eq!(outcome.detached, 2);

        // Both publications survive; the exclusive one is now orphaned
        assert!(f.store.find_publication_by_pmid("1").await.unwrap().is_some());
        assert!(f.store.find_publication_by_pmid("2").await.unwrap().is_some());
        assert!(f.store.author_ids_for(f.exclusive).await.unwrap().is_empty());

        assert!(f.store.find_author(f.henderson.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unknown_author_is_a_noop() {
        let f = fixture().await;

        let outcome = f
            .lifecycle
            .delete_author(Uuid::new_v4(), DeleteMode::Purge)
            .await
            .unwrap();

        assert!(outcome.is_none());
        assert!(f.store.find_author(f.henderson.id).await.unwrap().is_some());
        assert!(f.store.find_publication_by_pmid("1").await.unwrap().is_some());
    }
}
