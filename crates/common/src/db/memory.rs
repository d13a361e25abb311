//! In-memory store implementation
//!
//! Hash-map-backed implementation of the `Store` trait for tests and
//! local development. Semantics mirror the PostgreSQL repository:
//! trashed rows are invisible to lookups and listings, association
//! updates are idempotent.

use crate::db::models::{Author, Publication};
use crate::db::store::{published_at_from_iso, PublicationFields, Store};
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;
use tracing::warn;
use uuid::Uuid;

#[derive(Default)]
struct Inner {
    authors: HashMap<Uuid, Author>,
    publications: HashMap<Uuid, Publication>,
    /// (publication_id, author_id)
    links: HashSet<(Uuid, Uuid)>,
}

/// In-memory store for tests and local development
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn build_publication(fields: &PublicationFields) -> Publication {
    let now = chrono::Utc::now();
    Publication {
        id: Uuid::new_v4(),
        pmid: if fields.pmid.is_empty() {
            None
        } else {
            Some(fields.pmid.clone())
        },
        title: fields.title.clone(),
        journal: fields.journal.clone(),
        pubdate_raw: fields.pubdate_raw.clone(),
        pubdate_display: fields.pubdate_display.clone(),
        pubdate_iso: fields.pubdate_iso.clone(),
        authors: fields.authors.clone(),
        doi: fields.doi.clone(),
        pmcid: fields.pmcid.clone(),
        url: fields.url.clone(),
        published_at: None,
        trashed_at: None,
        created_at: now.into(),
        updated_at: now.into(),
    }
}

#[async_trait]
impl Store for MemoryStore {
    // Authors

    async fn find_author(&self, id: Uuid) -> Result<Option<Author>> {
        let inner = self.inner.read().await;
        Ok(inner.authors.get(&id).cloned())
    }

    async fn find_author_by_name(&self, name: &str) -> Result<Option<Author>> {
        let inner = self.inner.read().await;
        Ok(inner.authors.values().find(|a| a.name == name).cloned())
    }

    async fn list_authors(&self) -> Result<Vec<Author>> {
        let inner = self.inner.read().await;
        let mut authors: Vec<Author> = inner.authors.values().cloned().collect();
        authors.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(authors)
    }

    async fn save_author(
        &self,
        name: &str,
        query: &str,
        bibliography_url: Option<&str>,
    ) -> Result<Author> {
        let mut inner = self.inner.write().await;
        let now = chrono::Utc::now();

        if let Some(existing) = inner.authors.values_mut().find(|a| a.name == name) {
            existing.query = query.to_string();
            existing.bibliography_url = bibliography_url.map(str::to_string);
            existing.updated_at = now.into();
            return Ok(existing.clone());
        }

        let author = Author {
            id: Uuid::new_v4(),
            name: name.to_string(),
            query: query.to_string(),
            bibliography_url: bibliography_url.map(str::to_string),
            created_at: now.into(),
            updated_at: now.into(),
        };
        inner.authors.insert(author.id, author.clone());
        Ok(author)
    }

    async fn delete_author(&self, id: Uuid) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner.links.retain(|(_, author_id)| *author_id != id);
        inner.authors.remove(&id);
        Ok(())
    }

    // Publications

    async fn find_publication_by_pmid(&self, pmid: &str) -> Result<Option<Publication>> {
        let inner = self.inner.read().await;
        Ok(inner
            .publications
            .values()
            .filter(|p| !p.is_trashed() && p.pmid.as_deref() == Some(pmid))
            .min_by_key(|p| p.created_at)
            .cloned())
    }

    async fn find_publication_by_title(&self, title: &str) -> Result<Option<Publication>> {
        let inner = self.inner.read().await;
        Ok(inner
            .publications
            .values()
            .filter(|p| !p.is_trashed() && p.title == title)
            .min_by_key(|p| p.created_at)
            .cloned())
    }

    async fn insert_publication(&self, fields: &PublicationFields) -> Result<Publication> {
        let mut inner = self.inner.write().await;
        let publication = build_publication(fields);
        inner.publications.insert(publication.id, publication.clone());
        Ok(publication)
    }

    async fn overwrite_publication(
        &self,
        id: Uuid,
        fields: &PublicationFields,
    ) -> Result<Publication> {
        let mut inner = self.inner.write().await;
        let publication = inner
            .publications
            .get_mut(&id)
            .ok_or_else(|| AppError::PublicationNotFound { id: id.to_string() })?;

        publication.pmid = if fields.pmid.is_empty() {
            None
        } else {
            Some(fields.pmid.clone())
        };
        publication.title = fields.title.clone();
        publication.journal = fields.journal.clone();
        publication.pubdate_raw = fields.pubdate_raw.clone();
        publication.pubdate_display = fields.pubdate_display.clone();
        publication.pubdate_iso = fields.pubdate_iso.clone();
        publication.authors = fields.authors.clone();
        publication.doi = fields.doi.clone();
        publication.pmcid = fields.pmcid.clone();
        publication.url = fields.url.clone();
        publication.updated_at = chrono::Utc::now().into();

        Ok(publication.clone())
    }

    async fn set_published_at(&self, id: Uuid, iso_date: &str) -> Result<()> {
        let Some(timestamp) = published_at_from_iso(iso_date) else {
            warn!(publication_id = %id, iso_date, "Unparseable ISO date; sort timestamp unchanged");
            return Ok(());
        };

        let mut inner = self.inner.write().await;
        let publication = inner
            .publications
            .get_mut(&id)
            .ok_or_else(|| AppError::PublicationNotFound { id: id.to_string() })?;
        publication.published_at = Some(timestamp);
        Ok(())
    }

    async fn trash_publication(&self, id: Uuid) -> Result<()> {
        let mut inner = self.inner.write().await;
        let publication = inner
            .publications
            .get_mut(&id)
            .ok_or_else(|| AppError::PublicationNotFound { id: id.to_string() })?;
        publication.trashed_at = Some(chrono::Utc::now().into());
        Ok(())
    }

    async fn list_publications(&self) -> Result<Vec<Publication>> {
        let inner = self.inner.read().await;
        let mut publications: Vec<Publication> = inner
            .publications
            .values()
            .filter(|p| !p.is_trashed())
            .cloned()
            .collect();
        publications.sort_by_key(|p| p.created_at);
        Ok(publications)
    }

    async fn publications_for_author(
        &self,
        author_id: Uuid,
        limit: Option<u64>,
    ) -> Result<Vec<Publication>> {
        let inner = self.inner.read().await;
        let mut publications: Vec<Publication> = inner
            .links
            .iter()
            .filter(|(_, aid)| *aid == author_id)
            .filter_map(|(pid, _)| inner.publications.get(pid))
            .filter(|p| !p.is_trashed())
            .cloned()
            .collect();

        // Newest first, None sorting last
        publications.sort_by(|a, b| {
            b.published_at
                .cmp(&a.published_at)
                .then(b.created_at.cmp(&a.created_at))
        });

        if let Some(limit) = limit {
            publications.truncate(limit as usize);
        }

        Ok(publications)
    }

    // Associations

    async fn attach_author(&self, publication_id: Uuid, author_id: Uuid) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner.links.insert((publication_id, author_id));
        Ok(())
    }

    async fn detach_author(&self, publication_id: Uuid, author_id: Uuid) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner.links.remove(&(publication_id, author_id));
        Ok(())
    }

    async fn author_ids_for(&self, publication_id: Uuid) -> Result<Vec<Uuid>> {
        let inner = self.inner.read().await;
        Ok(inner
            .links
            .iter()
            .filter(|(pid, _)| *pid == publication_id)
            .map(|(_, aid)| *aid)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(pmid: &str, title: &str) -> PublicationFields {
        PublicationFields {
            pmid: pmid.to_string(),
            title: title.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_save_author_upserts_by_name() {
        let store = MemoryStore::new();

        let created = store
            .save_author("Henderson", "henderson[au]", None)
            .await
            .unwrap();
        let updated = store
            .save_author("Henderson", "henderson am[au]", Some("https://example.org"))
            .await
            .unwrap();

        assert_eq!(created.id, updated.id);
        assert_eq!(updated.query, "henderson am[au]");
        assert_eq!(store.list_authors().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_attach_is_idempotent() {
        let store = MemoryStore::new();
        let author = store.save_author("A", "", None).await.unwrap();
        let publication = store.insert_publication(&fields("1", "T")).await.unwrap();

        store.attach_author(publication.id, author.id).await.unwrap();
        store.attach_author(publication.id, author.id).await.unwrap();

        assert_eq!(
            store.author_ids_for(publication.id).await.unwrap(),
            vec![author.id]
        );
    }

    #[tokio::test]
    async fn test_trashed_rows_are_invisible() {
        let store = MemoryStore::new();
        let publication = store.insert_publication(&fields("1", "T")).await.unwrap();

        assert!(store
            .find_publication_by_pmid("1")
            .await
            .unwrap()
            .is_some());

        store.trash_publication(publication.id).await.unwrap();

        assert!(store.find_publication_by_pmid("1").await.unwrap().is_none());
        assert!(store.find_publication_by_title("T").await.unwrap().is_none());
        assert!(store.list_publications().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_publications_for_author_newest_first() {
        let store = MemoryStore::new();
        let author = store.save_author("A", "", None).await.unwrap();

        let older = store.insert_publication(&fields("1", "Old")).await.unwrap();
        let newer = store.insert_publication(&fields("2", "New")).await.unwrap();
        let undated = store.insert_publication(&fields("3", "Undated")).await.unwrap();

        store.set_published_at(older.id, "2019-01-01").await.unwrap();
        store.set_published_at(newer.id, "2021-06-28").await.unwrap();

        for p in [&older, &newer, &undated] {
            store.attach_author(p.id, author.id).await.unwrap();
        }

        let listed = store
            .publications_for_author(author.id, None)
            .await
            .unwrap();
        let titles: Vec<&str> = listed.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["New", "Old", "Undated"]);

        let limited = store
            .publications_for_author(author.id, Some(1))
            .await
            .unwrap();
        assert_eq!(limited.len(), 1);
        assert_eq!(limited[0].title, "New");
    }
}
