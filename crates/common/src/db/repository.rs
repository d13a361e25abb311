//! PostgreSQL store implementation
//!
//! SeaORM-backed implementation of the `Store` trait.

use crate::db::models::*;
use crate::db::store::{published_at_from_iso, PublicationFields, Store};
use crate::db::DbPool;
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use tracing::warn;
use uuid::Uuid;

/// Repository for data access operations
#[derive(Clone)]
pub struct Repository {
    pool: DbPool,
}

impl Repository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn conn(&self) -> &DatabaseConnection {
        self.pool.conn()
    }

    /// Ping the database
    pub async fn ping(&self) -> Result<()> {
        self.pool.ping().await
    }
}

fn opt_pmid(pmid: &str) -> Option<String> {
    if pmid.is_empty() {
        None
    } else {
        Some(pmid.to_string())
    }
}

fn apply_fields(model: &mut PublicationActiveModel, fields: &PublicationFields) {
    model.pmid = Set(opt_pmid(&fields.pmid));
    model.title = Set(fields.title.clone());
    model.journal = Set(fields.journal.clone());
    model.pubdate_raw = Set(fields.pubdate_raw.clone());
    model.pubdate_display = Set(fields.pubdate_display.clone());
    model.pubdate_iso = Set(fields.pubdate_iso.clone());
    model.authors = Set(fields.authors.clone());
    model.doi = Set(fields.doi.clone());
    model.pmcid = Set(fields.pmcid.clone());
    model.url = Set(fields.url.clone());
}

#[async_trait]
impl Store for Repository {
    // ========================================================================
    // Authors
    // ========================================================================

    async fn find_author(&self, id: Uuid) -> Result<Option<Author>> {
        AuthorEntity::find_by_id(id)
            .one(self.conn())
            .await
            .map_err(Into::into)
    }

    async fn find_author_by_name(&self, name: &str) -> Result<Option<Author>> {
        AuthorEntity::find()
            .filter(AuthorColumn::Name.eq(name))
            .one(self.conn())
            .await
            .map_err(Into::into)
    }

    async fn list_authors(&self) -> Result<Vec<Author>> {
        AuthorEntity::find()
            .order_by_asc(AuthorColumn::Name)
            .all(self.conn())
            .await
            .map_err(Into::into)
    }

    async fn save_author(
        &self,
        name: &str,
        query: &str,
        bibliography_url: Option<&str>,
    ) -> Result<Author> {
        let now = chrono::Utc::now();

        match self.find_author_by_name(name).await? {
            Some(existing) => {
                let mut author: AuthorActiveModel = existing.into();
                author.query = Set(query.to_string());
                author.bibliography_url = Set(bibliography_url.map(str::to_string));
                author.updated_at = Set(now.into());
                author.update(self.conn()).await.map_err(Into::into)
            }
            None => {
                let author = AuthorActiveModel {
                    id: Set(Uuid::new_v4()),
                    name: Set(name.to_string()),
                    query: Set(query.to_string()),
                    bibliography_url: Set(bibliography_url.map(str::to_string)),
                    created_at: Set(now.into()),
                    updated_at: Set(now.into()),
                };
                author.insert(self.conn()).await.map_err(Into::into)
            }
        }
    }

    async fn delete_author(&self, id: Uuid) -> Result<()> {
        PublicationAuthorEntity::delete_many()
            .filter(PublicationAuthorColumn::AuthorId.eq(id))
            .exec(self.conn())
            .await?;

        AuthorEntity::delete_by_id(id).exec(self.conn()).await?;
        Ok(())
    }

    // ========================================================================
    // Publications
    // ========================================================================

    async fn find_publication_by_pmid(&self, pmid: &str) -> Result<Option<Publication>> {
        PublicationEntity::find()
            .filter(PublicationColumn::Pmid.eq(pmid))
            .filter(PublicationColumn::TrashedAt.is_null())
            .one(self.conn())
            .await
            .map_err(Into::into)
    }

    async fn find_publication_by_title(&self, title: &str) -> Result<Option<Publication>> {
        PublicationEntity::find()
            .filter(PublicationColumn::Title.eq(title))
            .filter(PublicationColumn::TrashedAt.is_null())
            .one(self.conn())
            .await
            .map_err(Into::into)
    }

    async fn insert_publication(&self, fields: &PublicationFields) -> Result<Publication> {
        let now = chrono::Utc::now();

        let mut publication = PublicationActiveModel {
            id: Set(Uuid::new_v4()),
            published_at: Set(None),
            trashed_at: Set(None),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
            ..Default::default()
        };
        apply_fields(&mut publication, fields);

        publication.insert(self.conn()).await.map_err(Into::into)
    }

    async fn overwrite_publication(
        &self,
        id: Uuid,
        fields: &PublicationFields,
    ) -> Result<Publication> {
        let existing = PublicationEntity::find_by_id(id)
            .one(self.conn())
            .await?
            .ok_or_else(|| AppError::PublicationNotFound { id: id.to_string() })?;

        let mut publication: PublicationActiveModel = existing.into();
        apply_fields(&mut publication, fields);
        publication.updated_at = Set(chrono::Utc::now().into());

        publication.update(self.conn()).await.map_err(Into::into)
    }

    async fn set_published_at(&self, id: Uuid, iso_date: &str) -> Result<()> {
        let Some(timestamp) = published_at_from_iso(iso_date) else {
            warn!(publication_id = %id, iso_date, "Unparseable ISO date; sort timestamp unchanged");
            return Ok(());
        };

        let existing = PublicationEntity::find_by_id(id)
            .one(self.conn())
            .await?
            .ok_or_else(|| AppError::PublicationNotFound { id: id.to_string() })?;

        let mut publication: PublicationActiveModel = existing.into();
        publication.published_at = Set(Some(timestamp));
        publication.update(self.conn()).await?;
        Ok(())
    }

    async fn trash_publication(&self, id: Uuid) -> Result<()> {
        let existing = PublicationEntity::find_by_id(id)
            .one(self.conn())
            .await?
            .ok_or_else(|| AppError::PublicationNotFound { id: id.to_string() })?;

        let mut publication: PublicationActiveModel = existing.into();
        publication.trashed_at = Set(Some(chrono::Utc::now().into()));
        publication.update(self.conn()).await?;
        Ok(())
    }

    async fn list_publications(&self) -> Result<Vec<Publication>> {
        PublicationEntity::find()
            .filter(PublicationColumn::TrashedAt.is_null())
            .all(self.conn())
            .await
            .map_err(Into::into)
    }

    async fn publications_for_author(
        &self,
        author_id: Uuid,
        limit: Option<u64>,
    ) -> Result<Vec<Publication>> {
        let links = PublicationAuthorEntity::find()
            .filter(PublicationAuthorColumn::AuthorId.eq(author_id))
            .all(self.conn())
            .await?;

        let ids: Vec<Uuid> = links.into_iter().map(|l| l.publication_id).collect();
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut query = PublicationEntity::find()
            .filter(PublicationColumn::Id.is_in(ids))
            .filter(PublicationColumn::TrashedAt.is_null())
            .order_by_desc(PublicationColumn::PublishedAt)
            .order_by_desc(PublicationColumn::CreatedAt);

        if let Some(limit) = limit {
            query = query.limit(limit);
        }

        query.all(self.conn()).await.map_err(Into::into)
    }

    // ========================================================================
    // Associations
    // ========================================================================

    async fn attach_author(&self, publication_id: Uuid, author_id: Uuid) -> Result<()> {
        let existing = PublicationAuthorEntity::find()
            .filter(PublicationAuthorColumn::PublicationId.eq(publication_id))
            .filter(PublicationAuthorColumn::AuthorId.eq(author_id))
            .one(self.conn())
            .await?;

        if existing.is_none() {
            let link = PublicationAuthorActiveModel {
                publication_id: Set(publication_id),
                author_id: Set(author_id),
            };
            link.insert(self.conn()).await?;
        }

        Ok(())
    }

    async fn detach_author(&self, publication_id: Uuid, author_id: Uuid) -> Result<()> {
        PublicationAuthorEntity::delete_many()
            .filter(PublicationAuthorColumn::PublicationId.eq(publication_id))
            .filter(PublicationAuthorColumn::AuthorId.eq(author_id))
            .exec(self.conn())
            .await?;
        Ok(())
    }

    async fn author_ids_for(&self, publication_id: Uuid) -> Result<Vec<Uuid>> {
        let links = PublicationAuthorEntity::find()
            .filter(PublicationAuthorColumn::PublicationId.eq(publication_id))
            .all(self.conn())
            .await?;

        Ok(links.into_iter().map(|l| l.author_id).collect())
    }
}
