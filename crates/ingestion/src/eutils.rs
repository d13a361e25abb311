//! NCBI E-utilities search client
//!
//! Two sequential remote calls: esearch returns an ordered PMID list
//! for a query; esummary returns the record payloads for those ids in
//! one batched request. Results are normalized and cached per
//! (query, limit). A forced refresh skips the cache lookup but still
//! writes the fresh result back so later unforced calls benefit.
//!
//! Any transport failure or non-success status in either phase aborts
//! the whole call; partial results are never returned or cached. No
//! retries; a failed call is retried only by an operator re-invoking
//! with force.

use crate::dates;
use async_trait::async_trait;
use pubharvest_common::cache::{keys, ResponseCache};
use pubharvest_common::config::EutilsConfig;
use pubharvest_common::errors::{AppError, Result};
use pubharvest_common::metrics;
use pubharvest_common::records::NormalizedRecord;
use regex_lite::Regex;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};
use tracing::{debug, instrument, warn};

/// Article URL base for records ingested from PubMed
pub const ARTICLE_URL_BASE: &str = "https://pubmed.ncbi.nlm.nih.gov";

/// One record as returned by the summarize phase, before normalization
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawSummary {
    pub pmid: String,
    pub title: String,
    pub journal: String,
    pub pubdate: String,
    pub epubdate: String,
    pub sortpubdate: String,
    pub authors: Vec<String>,
    pub doi: String,
    pub pmcid: String,
}

/// Transport for the two remote phases
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Submit the query; returns the ordered PMID list (may be empty)
    async fn esearch(&self, term: &str, retmax: u32) -> Result<Vec<String>>;

    /// Fetch summaries for all ids in one batched request
    async fn esummary(&self, ids: &[String]) -> Result<Vec<RawSummary>>;
}

// ============================================================================
// Response parsing
// ============================================================================

#[derive(Debug, Deserialize)]
struct EsearchEnvelope {
    #[serde(default)]
    esearchresult: EsearchResult,
}

#[derive(Debug, Default, Deserialize)]
struct EsearchResult {
    #[serde(default)]
    idlist: Vec<String>,
}

/// Parse an esearch response body into the PMID list
pub fn parse_esearch(body: &str) -> Result<Vec<String>> {
    let envelope: EsearchEnvelope = serde_json::from_str(body)?;
    Ok(envelope.esearchresult.idlist)
}

#[derive(Debug, Deserialize)]
struct EsummaryEnvelope {
    #[serde(default)]
    result: EsummaryResult,
}

#[derive(Debug, Default, Deserialize)]
struct EsummaryResult {
    #[serde(default)]
    uids: Vec<String>,
    #[serde(flatten)]
    items: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct EsummaryItem {
    title: String,
    fulljournalname: String,
    source: String,
    pubdate: String,
    epubdate: String,
    sortpubdate: String,
    authors: Vec<EsummaryAuthor>,
    articleids: Vec<ArticleId>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct EsummaryAuthor {
    name: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ArticleId {
    idtype: String,
    value: String,
}

/// Parse an esummary response body into raw summaries, in uid order.
/// Ids without a payload entry are skipped.
pub fn parse_esummary(body: &str) -> Result<Vec<RawSummary>> {
    let envelope: EsummaryEnvelope = serde_json::from_str(body)?;
    let mut summaries = Vec::with_capacity(envelope.result.uids.len());

    for uid in &envelope.result.uids {
        let Some(value) = envelope.result.items.get(uid) else {
            continue;
        };

        let item: EsummaryItem = match serde_json::from_value(value.clone()) {
            Ok(item) => item,
            Err(e) => {
                warn!(pmid = %uid, error = %e, "Skipping malformed summary item");
                continue;
            }
        };

        let journal = if item.fulljournalname.is_empty() {
            item.source
        } else {
            item.fulljournalname
        };

        let mut doi = String::new();
        let mut pmcid = String::new();
        for article_id in &item.articleids {
            match article_id.idtype.as_str() {
                "doi" => doi = article_id.value.clone(),
                "pmcid" => pmcid = article_id.value.clone(),
                _ => {}
            }
        }

        summaries.push(RawSummary {
            pmid: uid.clone(),
            title: item.title,
            journal,
            pubdate: item.pubdate,
            epubdate: item.epubdate,
            sortpubdate: item.sortpubdate,
            authors: item
                .authors
                .into_iter()
                .map(|a| a.name)
                .filter(|name| !name.is_empty())
                .collect(),
            doi,
            pmcid,
        });
    }

    Ok(summaries)
}

fn tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<[^>]*>").unwrap())
}

/// Titles occasionally arrive with embedded markup
fn strip_tags(raw: &str) -> String {
    tag_re().replace_all(raw, "").trim().to_string()
}

/// Normalize one raw summary into the canonical record shape
pub fn normalize_summary(raw: &RawSummary) -> NormalizedRecord {
    let url = if raw.pmid.is_empty() {
        String::new()
    } else {
        format!("{}/{}/", ARTICLE_URL_BASE, raw.pmid)
    };

    NormalizedRecord {
        pmid: raw.pmid.clone(),
        title: strip_tags(&raw.title),
        journal: raw.journal.clone(),
        iso_date: dates::combine(&raw.sortpubdate, &raw.epubdate, &raw.pubdate),
        display_date: dates::display_date(&raw.epubdate, &raw.pubdate),
        authors: raw.authors.join(", "),
        doi: raw.doi.clone(),
        pmcid: raw.pmcid.clone(),
        url,
    }
}

// ============================================================================
// HTTP transport
// ============================================================================

/// Reqwest-backed transport with a fixed per-call timeout
pub struct HttpBackend {
    client: reqwest::Client,
    config: EutilsConfig,
}

impl HttpBackend {
    pub fn new(config: EutilsConfig, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, config })
    }

    /// Parameters both phases require per NCBI usage policy
    fn shared_params(&self) -> Vec<(&'static str, String)> {
        vec![
            ("db", self.config.db.clone()),
            ("retmode", "json".to_string()),
            ("tool", self.config.tool.clone()),
            ("email", self.config.email.clone()),
        ]
    }

    async fn get_body(
        &self,
        phase: &str,
        url: &str,
        params: &[(&'static str, String)],
    ) -> Result<String> {
        let started = Instant::now();

        let response = match self.client.get(url).query(params).send().await {
            Ok(response) => response,
            Err(e) => {
                metrics::record_eutils(phase, started.elapsed().as_secs_f64(), false);
                return Err(AppError::upstream(phase, e.to_string()));
            }
        };

        let status = response.status();
        if !status.is_success() {
            metrics::record_eutils(phase, started.elapsed().as_secs_f64(), false);
            return Err(AppError::upstream(phase, format!("status {}", status)));
        }

        let body = response.text().await?;
        metrics::record_eutils(phase, started.elapsed().as_secs_f64(), true);
        Ok(body)
    }
}

#[async_trait]
impl SearchBackend for HttpBackend {
    async fn esearch(&self, term: &str, retmax: u32) -> Result<Vec<String>> {
        let mut params = self.shared_params();
        params.push(("term", term.to_string()));
        params.push(("sort", "pub date".to_string()));
        params.push(("retmax", retmax.to_string()));

        let body = self
            .get_body("esearch", &self.config.esearch_url, &params)
            .await?;
        parse_esearch(&body)
    }

    async fn esummary(&self, ids: &[String]) -> Result<Vec<RawSummary>> {
        let mut params = self.shared_params();
        params.push(("id", ids.join(",")));

        let body = self
            .get_body("esummary", &self.config.esummary_url, &params)
            .await?;
        parse_esummary(&body)
    }
}

// ============================================================================
// Search client
// ============================================================================

/// Cached two-phase search over a transport backend
pub struct SearchClient {
    backend: Arc<dyn SearchBackend>,
    cache: Arc<dyn ResponseCache>,
    cache_ttl: Duration,
}

impl SearchClient {
    pub fn new(
        backend: Arc<dyn SearchBackend>,
        cache: Arc<dyn ResponseCache>,
        cache_ttl: Duration,
    ) -> Self {
        Self {
            backend,
            cache,
            cache_ttl,
        }
    }

    /// Run the two-phase search for `query`, capped at `limit` results.
    ///
    /// `force` skips the cache lookup; the fresh result is still
    /// written back. An empty id list from phase one short-circuits
    /// phase two and is cached like any other result.
    #[instrument(skip(self, query))]
    pub async fn search(
        &self,
        query: &str,
        limit: u32,
        force: bool,
    ) -> Result<Vec<NormalizedRecord>> {
        let key = keys::search_results(query, limit);

        if !force {
            match self.cache.get(&key).await {
                Ok(Some(records)) => {
                    metrics::record_cache(true);
                    debug!(count = records.len(), "Returning cached search results");
                    return Ok(records);
                }
                Ok(None) => metrics::record_cache(false),
                Err(e) => warn!(error = %e, "Cache lookup failed; fetching fresh"),
            }
        }

        let ids = self.backend.esearch(query, limit).await?;
        if ids.is_empty() {
            self.write_cache(&key, &[]).await;
            return Ok(Vec::new());
        }

        let summaries = self.backend.esummary(&ids).await?;
        let records: Vec<NormalizedRecord> = summaries.iter().map(normalize_summary).collect();

        self.write_cache(&key, &records).await;
        Ok(records)
    }

    async fn write_cache(&self, key: &str, records: &[NormalizedRecord]) {
        if let Err(e) = self.cache.put(key, records, self.cache_ttl).await {
            warn!(error = %e, "Failed to cache search results");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pubharvest_common::cache::MemoryCache;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const ESEARCH_BODY: &str = r#"{
        "header": {"type": "esearch", "version": "0.3"},
        "esearchresult": {
            "count": "2",
            "retmax": "2",
            "idlist": ["33524754", "32887691"]
        }
    }"#;

    const ESEARCH_EMPTY_BODY: &str = r#"{
        "esearchresult": {"count": "0", "idlist": []}
    }"#;

    const ESUMMARY_BODY: &str = r#"{
        "header": {"type": "esummary", "version": "0.3"},
        "result": {
            "uids": ["33524754"],
            "33524754": {
                "uid": "33524754",
                "title": "Outcomes of <i>elective</i> repair",
                "fulljournalname": "Journal of Vascular Surgery",
                "source": "J Vasc Surg",
                "pubdate": "2021 Jun",
                "epubdate": "2021 Jan 29",
                "sortpubdate": "2021/06/01 00:00",
                "authors": [
                    {"name": "Henderson A", "authtype": "Author"},
                    {"name": "Smith J", "authtype": "Author"}
                ],
                "articleids": [
                    {"idtype": "pubmed", "idtypen": 1, "value": "33524754"},
                    {"idtype": "doi", "idtypen": 3, "value": "10.1016/j.jvs.2021.01.001"},
                    {"idtype": "pmcid", "idtypen": 8, "value": "PMC8012345"}
                ]
            }
        }
    }"#;

    #[test]
    fn test_parse_esearch() {
        let ids = parse_esearch(ESEARCH_BODY).unwrap();
        assert_eq!(ids, vec!["33524754", "32887691"]);
    }

    #[test]
    fn test_parse_esearch_empty() {
        assert!(parse_esearch(ESEARCH_EMPTY_BODY).unwrap().is_empty());
    }

    #[test]
    fn test_parse_esummary() {
        let summaries = parse_esummary(ESUMMARY_BODY).unwrap();
        assert_eq!(summaries.len(), 1);

        let summary = &summaries[0];
        assert_eq!(summary.pmid, "33524754");
        assert_eq!(summary.journal, "Journal of Vascular Surgery");
        assert_eq!(summary.authors, vec!["Henderson A", "Smith J"]);
        assert_eq!(summary.doi, "10.1016/j.jvs.2021.01.001");
        assert_eq!(summary.pmcid, "PMC8012345");
        assert_eq!(summary.sortpubdate, "2021/06/01 00:00");
    }

    #[test]
    fn test_parse_esummary_journal_falls_back_to_source() {
        let body = r#"{
            "result": {
                "uids": ["1"],
                "1": {"title": "T", "source": "J Abbrev", "fulljournalname": ""}
            }
        }"#;
        let summaries = parse_esummary(body).unwrap();
        assert_eq!(summaries[0].journal, "J Abbrev");
    }

    #[test]
    fn test_parse_esummary_skips_missing_items() {
        let body = r#"{"result": {"uids": ["1", "2"], "1": {"title": "T"}}}"#;
        let summaries = parse_esummary(body).unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].pmid, "1");
    }

    #[test]
    fn test_normalize_summary() {
        let summaries = parse_esummary(ESUMMARY_BODY).unwrap();
        let record = normalize_summary(&summaries[0]);

        assert_eq!(record.title, "Outcomes of elective repair");
        assert_eq!(record.iso_date, "2021-06-01");
        assert_eq!(record.display_date, "2021 Jan 29");
        assert_eq!(record.authors, "Henderson A, Smith J");
        assert_eq!(record.url, "https://pubmed.ncbi.nlm.nih.gov/33524754/");
    }

    struct CountingBackend {
        searches: AtomicUsize,
        summaries: AtomicUsize,
        ids: Vec<String>,
    }

    impl CountingBackend {
        fn new(ids: Vec<String>) -> Self {
            Self {
                searches: AtomicUsize::new(0),
                summaries: AtomicUsize::new(0),
                ids,
            }
        }
    }

    #[async_trait]
    impl SearchBackend for CountingBackend {
        async fn esearch(&self, _term: &str, _retmax: u32) -> Result<Vec<String>> {
            self.searches.fetch_add(1, Ordering::SeqCst);
            Ok(self.ids.clone())
        }

        async fn esummary(&self, ids: &[String]) -> Result<Vec<RawSummary>> {
            self.summaries.fetch_add(1, Ordering::SeqCst);
            Ok(ids
                .iter()
                .map(|id| RawSummary {
                    pmid: id.clone(),
                    title: format!("Article {}", id),
                    ..Default::default()
                })
                .collect())
        }
    }

    fn client(backend: Arc<CountingBackend>) -> SearchClient {
        SearchClient::new(backend, Arc::new(MemoryCache::new()), Duration::from_secs(60))
    }

    #[tokio::test]
    async fn test_unforced_calls_within_ttl_hit_cache() {
        let backend = Arc::new(CountingBackend::new(vec!["1".into()]));
        let client = client(backend.clone());

        let first = client.search("q", 10, false).await.unwrap();
        let second = client.search("q", 10, false).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(backend.searches.load(Ordering::SeqCst), 1);
        assert_eq!(backend.summaries.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_force_refetches_and_rewarms_cache() {
        let backend = Arc::new(CountingBackend::new(vec!["1".into()]));
        let client = client(backend.clone());

        client.search("q", 10, false).await.unwrap();
        client.search("q", 10, true).await.unwrap();
        assert_eq!(backend.searches.load(Ordering::SeqCst), 2);

        // The forced fetch warmed the cache for unforced callers
        client.search("q", 10, false).await.unwrap();
        assert_eq!(backend.searches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_empty_idlist_short_circuits_and_is_cached() {
        let backend = Arc::new(CountingBackend::new(vec![]));
        let client = client(backend.clone());

        let first = client.search("nothing", 10, false).await.unwrap();
        let second = client.search("nothing", 10, false).await.unwrap();

        assert!(first.is_empty());
        assert!(second.is_empty());
        assert_eq!(backend.searches.load(Ordering::SeqCst), 1);
        assert_eq!(backend.summaries.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_distinct_limits_are_cached_separately() {
        let backend = Arc::new(CountingBackend::new(vec!["1".into()]));
        let client = client(backend.clone());

        client.search("q", 10, false).await.unwrap();
        client.search("q", 30, false).await.unwrap();

        assert_eq!(backend.searches.load(Ordering::SeqCst), 2);
    }
}
