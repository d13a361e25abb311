//! Ingestion control surface handlers
//!
//! fetch-one, fetch-all, and the date-resync sweep. `force` bypasses
//! the response cache; the fresh result still warms it.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::AppState;
use pubharvest_common::errors::{AppError, Result};
use pubharvest_ingestion::{RebuildSummary, RunSummary, SweepSummary};

#[derive(Debug, Default, Deserialize)]
pub struct FetchParams {
    #[serde(default)]
    pub force: bool,
}

/// Fetch and ingest one author's publications
pub async fn fetch_author(
    State(state): State<AppState>,
    Path(author_id): Path<Uuid>,
    Query(params): Query<FetchParams>,
) -> Result<Json<RunSummary>> {
    let summary = state
        .pipeline
        .run_for_author_id(author_id, params.force)
        .await?
        .ok_or_else(|| AppError::AuthorNotFound {
            id: author_id.to_string(),
        })?;

    Ok(Json(summary))
}

/// Fetch and ingest every author's publications; one author's failure
/// never stops the rest
pub async fn fetch_all(
    State(state): State<AppState>,
    Query(params): Query<FetchParams>,
) -> Result<Json<SweepSummary>> {
    let sweep = state.pipeline.run_for_all(params.force).await?;
    Ok(Json(sweep))
}

/// Rebuild date fields across the whole store
pub async fn rebuild_dates(State(state): State<AppState>) -> Result<Json<RebuildSummary>> {
    let summary = pubharvest_ingestion::rebuild_dates(state.store.as_ref()).await?;
    Ok(Json(summary))
}
