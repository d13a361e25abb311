//! Author management handlers
//!
//! The admin collaborator's surface: create/update authors, list them,
//! delete with cascading record disposition, and list an author's
//! stored publications.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::AppState;
use pubharvest_common::db::models::{Author, Publication};
use pubharvest_common::errors::{AppError, Result};
use pubharvest_ingestion::query::normalize_quotes;
use pubharvest_ingestion::DeleteMode;

const DEFAULT_LIST_LIMIT: u64 = 10;

/// Request to create or update an author by name
#[derive(Debug, Deserialize)]
pub struct SaveAuthorRequest {
    pub name: String,

    /// Manual search query; stored with quotes normalized
    #[serde(default)]
    pub query: String,

    /// Optional bibliography URL; a PubMed results URL takes
    /// precedence over the manual query during ingestion
    #[serde(default)]
    pub bibliography_url: Option<String>,
}

#[derive(Serialize)]
pub struct AuthorResponse {
    pub id: Uuid,
    pub name: String,
    pub query: String,
    pub bibliography_url: Option<String>,
}

impl From<Author> for AuthorResponse {
    fn from(author: Author) -> Self {
        Self {
            id: author.id,
            name: author.name,
            query: author.query,
            bibliography_url: author.bibliography_url,
        }
    }
}

#[derive(Serialize)]
pub struct PublicationResponse {
    pub id: Uuid,
    pub pmid: Option<String>,
    pub title: String,
    pub journal: String,
    pub display_date: String,
    pub iso_date: String,
    pub authors: String,
    pub doi: String,
    pub pmcid: String,
    pub url: String,
    pub published_at: Option<String>,
}

impl From<Publication> for PublicationResponse {
    fn from(publication: Publication) -> Self {
        Self {
            id: publication.id,
            pmid: publication.pmid,
            title: publication.title,
            journal: publication.journal,
            display_date: publication.pubdate_display,
            iso_date: publication.pubdate_iso,
            authors: publication.authors,
            doi: publication.doi,
            pmcid: publication.pmcid,
            url: publication.url,
            published_at: publication.published_at.map(|dt| dt.to_rfc3339()),
        }
    }
}

/// Create or update an author
pub async fn save_author(
    State(state): State<AppState>,
    Json(request): Json<SaveAuthorRequest>,
) -> Result<Json<AuthorResponse>> {
    let name = request.name.trim();
    if name.is_empty() {
        return Err(AppError::Validation {
            message: "author name is required".into(),
        });
    }

    let query = normalize_quotes(&request.query);
    let bibliography_url = request
        .bibliography_url
        .as_deref()
        .map(str::trim)
        .filter(|url| !url.is_empty());

    let author = state
        .store
        .save_author(name, &query, bibliography_url)
        .await?;

    tracing::info!(author = %author.name, "Author saved");

    Ok(Json(author.into()))
}

/// List all authors
pub async fn list_authors(State(state): State<AppState>) -> Result<Json<Vec<AuthorResponse>>> {
    let authors = state.store.list_authors().await?;
    Ok(Json(authors.into_iter().map(Into::into).collect()))
}

#[derive(Debug, Default, Deserialize)]
pub struct DeleteParams {
    #[serde(default)]
    pub mode: DeleteMode,
}

/// Response after deleting an author; reports the mode actually
/// applied so the operator notice can state whether exclusive
/// publications were purged
#[derive(Serialize)]
pub struct DeleteAuthorResponse {
    pub mode: DeleteMode,
    pub detached: usize,
    pub trashed: usize,
    pub message: String,
}

/// Delete an author with the requested record disposition
pub async fn delete_author(
    State(state): State<AppState>,
    Path(author_id): Path<Uuid>,
    Query(params): Query<DeleteParams>,
) -> Result<Json<DeleteAuthorResponse>> {
    let outcome = state
        .lifecycle
        .delete_author(author_id, params.mode)
        .await?
        .ok_or_else(|| AppError::AuthorNotFound {
            id: author_id.to_string(),
        })?;

    let message = match outcome.mode {
        DeleteMode::Purge => {
            "Author removed. Publications exclusive to this author were moved to the trash; \
             co-authored publications were kept with the author unassigned."
        }
        DeleteMode::Keep => "Author removed. All publications were kept with the author unassigned.",
    };

    Ok(Json(DeleteAuthorResponse {
        mode: outcome.mode,
        detached: outcome.detached,
        trashed: outcome.trashed,
        message: message.to_string(),
    }))
}

#[derive(Debug, Default, Deserialize)]
pub struct ListPublicationsParams {
    pub limit: Option<u64>,
}

/// List an author's stored publications, newest first
pub async fn list_publications(
    State(state): State<AppState>,
    Path(author_id): Path<Uuid>,
    Query(params): Query<ListPublicationsParams>,
) -> Result<Json<Vec<PublicationResponse>>> {
    state
        .store
        .find_author(author_id)
        .await?
        .ok_or_else(|| AppError::AuthorNotFound {
            id: author_id.to_string(),
        })?;

    let limit = params.limit.unwrap_or(DEFAULT_LIST_LIMIT);
    let publications = state
        .store
        .publications_for_author(author_id, Some(limit))
        .await?;

    Ok(Json(publications.into_iter().map(Into::into).collect()))
}
