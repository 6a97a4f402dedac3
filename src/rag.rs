//! Retrieval of ranked evidence snippets with citation identifiers

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use crate::contracts::Evidence;
use crate::error::{ChiralityError, Result};
use crate::utils::math::sparse_cosine;
use crate::utils::{cap_text, hash_content};

/// Default per-snippet cap, in bytes
pub const SNIPPET_MAX_CHARS: usize = 800;

#[async_trait]
pub trait Retriever: Send + Sync {
    async fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<Evidence>>;
}

/// Retriever that never finds anything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRetriever;

#[async_trait]
impl Retriever for NoRetriever {
    async fn retrieve(&self, _query: &str, _top_k: usize) -> Result<Vec<Evidence>> {
        Ok(Vec::new())
    }
}

/// In-memory corpus ranked by term overlap with the query
#[derive(Debug, Clone)]
pub struct CorpusRetriever {
    entries: Vec<(Evidence, HashMap<String, f32>)>,
    min_score: f32,
}

impl CorpusRetriever {
    pub fn new(items: Vec<Evidence>) -> Self {
        let entries = items
            .into_iter()
            .map(|e| {
                let terms = term_counts(&e.snippet);
                (e, terms)
            })
            .collect();
        Self {
            entries,
            min_score: 0.0,
        }
    }

    /// Drop hits scoring at or below `floor`
    pub fn with_min_score(mut self, floor: f32) -> Self {
        self.min_score = floor.clamp(0.0, 1.0);
        self
    }

    /// Load a JSON array of `{citation_id, snippet}` objects
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let items: Vec<Evidence> = serde_json::from_str(&raw)?;
        Ok(Self::new(items))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl Retriever for CorpusRetriever {
    async fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<Evidence>> {
        let q = term_counts(query);
        let mut scored: Vec<(f32, &Evidence)> = self
            .entries
            .iter()
            .map(|(e, terms)| (sparse_cosine(&q, terms), e))
            .filter(|(score, _)| *score > self.min_score)
            .collect();
        // Stable sort keeps corpus order for ties
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));
        Ok(scored
            .into_iter()
            .take(top_k)
            .map(|(_, e)| e.clone())
            .collect())
    }
}

/// Retriever backed by a remote search endpoint.
///
/// POSTs `{"query": ..., "top_k": ...}` and accepts either a bare array of
/// evidence or `{"snippets": [...]}`.
#[derive(Debug, Clone)]
pub struct HttpRetriever {
    client: Client,
    url: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RetrieveResponse {
    Wrapped { snippets: Vec<Evidence> },
    Bare(Vec<Evidence>),
}

impl HttpRetriever {
    pub fn new(url: impl Into<String>, timeout_ms: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .map_err(|e| ChiralityError::Config {
                message: format!("Failed to build HTTP client: {}", e),
            })?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl Retriever for HttpRetriever {
    async fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<Evidence>> {
        let resp = self
            .client
            .post(&self.url)
            .json(&json!({"query": query, "top_k": top_k}))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read response body".to_string());
            return Err(ChiralityError::RetrievalUnavailable {
                message: format!("retrieval endpoint returned {}: {}", status.as_u16(), body),
            });
        }

        let parsed: RetrieveResponse = resp.json().await?;
        Ok(match parsed {
            RetrieveResponse::Wrapped { snippets } => snippets,
            RetrieveResponse::Bare(items) => items,
        })
    }
}

/// Cap, dedupe and truncate raw hits
pub fn postprocess(items: Vec<Evidence>, top_k: usize, max_chars: usize) -> Vec<Evidence> {
    let mut seen_hashes = HashSet::new();
    let mut seen_ids = HashSet::new();
    let mut out = Vec::with_capacity(top_k.min(items.len()));

    for mut item in items {
        if out.len() >= top_k {
            break;
        }
        if item.snippet.trim().is_empty() {
            continue;
        }
        cap_text(&mut item.snippet, max_chars);
        if !seen_ids.insert(item.citation_id.clone()) {
            continue;
        }
        if !seen_hashes.insert(hash_content(&item.snippet)) {
            continue;
        }
        out.push(item);
    }

    out
}

/// Retrieve evidence for `query`. Failure degrades to empty evidence.
pub async fn retrieve_summary(
    retriever: &dyn Retriever,
    query: &str,
    top_k: usize,
    max_chars: usize,
) -> Vec<Evidence> {
    match retriever.retrieve(query, top_k).await {
        Ok(items) => {
            let kept = postprocess(items, top_k, max_chars);
            debug!("retrieval returned {} snippets", kept.len());
            kept
        }
        Err(e) => {
            warn!("Retrieval unavailable, continuing without evidence: {}", e);
            Vec::new()
        }
    }
}

fn term_counts(text: &str) -> HashMap<String, f32> {
    let mut counts = HashMap::new();
    for token in text
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.len() > 2)
    {
        *counts.entry(token.to_string()).or_insert(0.0) += 1.0;
    }
    counts
}
