//! Ingestion pipeline
//!
//! Orchestrates one author's run: resolve query → fetch → normalize →
//! upsert → associate. Best-effort: an unresolvable query is a no-op,
//! a fetch failure skips the whole run with nothing applied, a
//! per-record problem skips that record only, and a bulk sweep never
//! lets one author's failure stop the others.

use crate::eutils::SearchClient;
use crate::query::resolve_query;
use crate::upsert::RecordUpserter;
use pubharvest_common::db::models::Author;
use pubharvest_common::db::Store;
use pubharvest_common::errors::Result;
use pubharvest_common::metrics;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, instrument, warn};
use uuid::Uuid;

/// Outcome of one author's run
#[derive(Debug, Default, Clone, Serialize)]
pub struct RunSummary {
    pub fetched: usize,
    pub upserted: usize,
    pub skipped: usize,
}

/// Outcome of a sweep over every author
#[derive(Debug, Default, Clone, Serialize)]
pub struct SweepSummary {
    pub authors: usize,
    pub failed: usize,
    pub upserted: usize,
}

pub struct IngestionPipeline {
    store: Arc<dyn Store>,
    client: SearchClient,
    upserter: RecordUpserter,
    retmax: u32,
}

impl IngestionPipeline {
    pub fn new(store: Arc<dyn Store>, client: SearchClient, retmax: u32) -> Self {
        let upserter = RecordUpserter::new(store.clone());
        Self {
            store,
            client,
            upserter,
            retmax,
        }
    }

    /// Run ingestion for one author. An unresolvable query is a no-op;
    /// an upstream failure fails the whole run with nothing applied
    /// from that fetch.
    #[instrument(skip(self, author), fields(author = %author.name))]
    pub async fn run_for_author(&self, author: &Author, force: bool) -> Result<RunSummary> {
        let Some(query) = resolve_query(author) else {
            debug!("No query to fetch; skipping");
            return Ok(RunSummary::default());
        };

        let records = self.client.search(&query, self.retmax, force).await?;

        let mut summary = RunSummary {
            fetched: records.len(),
            ..Default::default()
        };

        for record in &records {
            if !record.is_identifiable() {
                summary.skipped += 1;
                continue;
            }

            match self.upserter.upsert(record, author).await {
                Ok(_) => summary.upserted += 1,
                Err(e) => {
                    warn!(pmid = %record.pmid, error = %e, "Failed to upsert record");
                    summary.skipped += 1;
                }
            }
        }

        metrics::record_run(summary.upserted, summary.skipped);
        debug!(
            fetched = summary.fetched,
            upserted = summary.upserted,
            skipped = summary.skipped,
            "Run complete"
        );

        Ok(summary)
    }

    /// Run ingestion for an author by id. `None` when the author does
    /// not exist.
    pub async fn run_for_author_id(&self, id: Uuid, force: bool) -> Result<Option<RunSummary>> {
        match self.store.find_author(id).await? {
            Some(author) => Ok(Some(self.run_for_author(&author, force).await?)),
            None => Ok(None),
        }
    }

    /// Run every author independently; one author's failure never
    /// stops the rest.
    #[instrument(skip(self))]
    pub async fn run_for_all(&self, force: bool) -> Result<SweepSummary> {
        let authors = self.store.list_authors().await?;
        let mut sweep = SweepSummary {
            authors: authors.len(),
            ..Default::default()
        };

        for author in &authors {
            match self.run_for_author(author, force).await {
                Ok(summary) => sweep.upserted += summary.upserted,
                Err(e) => {
                    metrics::record_run_failure();
                    error!(author = %author.name, error = %e, "Author run failed");
                    sweep.failed += 1;
                }
            }
        }

        Ok(sweep)
    }
}
