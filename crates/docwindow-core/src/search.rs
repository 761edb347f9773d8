//! Hybrid search: lexical candidate retrieval, semantic re-rank, and
//! context-window expansion.
//!
//! The algorithm operates entirely through the [`Store`] trait and an
//! injected [`EmbeddingProvider`]; it has no database or configuration
//! dependencies.
//!
//! # Algorithm
//!
//! 1. Extract uppercase keywords from the query. No keywords → empty result,
//!    no backend call.
//! 2. Fetch `top_k × 3` lexical candidates (weighted keyword counts over
//!    `bm25_text`, content, title, file name), zero scores dropped.
//! 3. Embed the query (provider loaded once, lazily) and score each candidate
//!    by clamped cosine similarity against its stored vector.
//! 4. `combined = bm25_weight × lexical + embedding_weight × semantic`;
//!    stable sort descending, keep `top_k`.
//! 5. Optionally expand each hit into its context window
//!    (see [`crate::context`]).
//!
//! # Failure handling
//!
//! Search never returns `Err`. A storage failure or timeout yields a
//! [`SearchStatus::Failed`] outcome with no results; an embedding failure
//! degrades to [`SearchStatus::LexicalOnly`]; a malformed stored vector scores
//! `0.0` for that chunk only; a context fetch failure falls back to the
//! matched chunk alone with `context_error` set.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::context::{join_contents, select_window};
use crate::embedding::{parse_embedding, semantic_score, EmbeddingProvider};
use crate::error::SearchFailure;
use crate::models::{format_ts_iso, ChunkRecord, DocumentSummary};
use crate::store::{LexicalCandidate, LexicalQuery, Store};
use crate::text::KeywordMatcher;

/// Lexical candidates fetched per requested result.
pub const OVER_FETCH_FACTOR: usize = 3;

/// Default context-window half-width.
pub const DEFAULT_CONTEXT_WINDOW: usize = 2;

// ============ Settings and requests ============

/// Searcher defaults, decoupled from application config.
#[derive(Debug, Clone)]
pub struct SearcherSettings {
    pub top_k: usize,
    pub bm25_weight: f64,
    pub embedding_weight: f64,
    /// Context-window half-width `W`.
    pub context_window: usize,
    /// Categories for which [`HybridSearcher::search_auto`] expands context.
    pub context_categories: Vec<String>,
    /// Instruction prefix for asymmetric query embeddings.
    pub query_prefix: Option<String>,
    pub storage_timeout: Duration,
    pub embedding_timeout: Duration,
}

impl Default for SearcherSettings {
    fn default() -> Self {
        Self {
            top_k: 5,
            bm25_weight: 0.3,
            embedding_weight: 0.7,
            context_window: DEFAULT_CONTEXT_WINDOW,
            context_categories: vec!["table-context".into(), "experiment-readout".into()],
            query_prefix: None,
            storage_timeout: Duration::from_secs(30),
            embedding_timeout: Duration::from_secs(60),
        }
    }
}

/// One search invocation. Unset fields fall back to [`SearcherSettings`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub top_k: Option<usize>,
    pub bm25_weight: Option<f64>,
    pub embedding_weight: Option<f64>,
    pub context_window: Option<usize>,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Default::default()
        }
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn subcategory(mut self, subcategory: impl Into<String>) -> Self {
        self.subcategory = Some(subcategory.into());
        self
    }

    pub fn top_k(mut self, top_k: usize) -> Self {
        self.top_k = Some(top_k);
        self
    }

    pub fn weights(mut self, bm25_weight: f64, embedding_weight: f64) -> Self {
        self.bm25_weight = Some(bm25_weight);
        self.embedding_weight = Some(embedding_weight);
        self
    }

    pub fn context_window(mut self, half_width: usize) -> Self {
        self.context_window = Some(half_width);
        self
    }
}

// ============ Results ============

/// Document identity fields carried by every hit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HitDocument {
    pub document_id: String,
    pub document_title: String,
    pub relative_path: String,
    pub file_name: String,
    pub category: String,
    pub subcategory: Option<String>,
    pub source_url: Option<String>,
    /// ISO 8601.
    pub last_modified: String,
}

impl From<&DocumentSummary> for HitDocument {
    fn from(d: &DocumentSummary) -> Self {
        Self {
            document_id: d.document_id.clone(),
            document_title: d.document_title.clone(),
            relative_path: d.relative_path.clone(),
            file_name: d.file_name.clone(),
            category: d.category.clone(),
            subcategory: d.subcategory.clone(),
            source_url: d.source_url.clone(),
            last_modified: format_ts_iso(d.last_modified),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HitScores {
    pub lexical_score: f64,
    pub semantic_score: f64,
    pub combined_score: f64,
}

/// Plain search result: the matched chunk's content.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    #[serde(flatten)]
    pub document: HitDocument,
    pub chunk_id: String,
    pub chunk_sequence: i64,
    #[serde(flatten)]
    pub scores: HitScores,
    pub content: String,
}

/// Context search result: the matched chunk expanded to its window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContextHit {
    #[serde(flatten)]
    pub document: HitDocument,
    pub chunk_id: String,
    #[serde(flatten)]
    pub scores: HitScores,
    pub context_chunks: Vec<ChunkRecord>,
    pub context_content: String,
    /// Number of chunks in `context_chunks`.
    pub context_window_size: usize,
    pub is_full_document: bool,
    /// Set when the window could not be fetched and only the matched chunk
    /// is returned.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context_error: Option<String>,
}

/// How a search concluded.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SearchStatus {
    /// Lexical and (when weighted) semantic scoring both ran.
    Complete,
    /// The embedding provider was unavailable; semantic scores are all `0.0`.
    LexicalOnly { reason: String },
    /// The storage backend could not be queried; results are empty.
    Failed(SearchFailure),
}

/// Results plus an explicit status, so "no matches" and "backend
/// unavailable" are distinguishable.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchOutcome<T> {
    pub status: SearchStatus,
    pub results: Vec<T>,
}

impl<T> SearchOutcome<T> {
    pub fn complete(results: Vec<T>) -> Self {
        Self {
            status: SearchStatus::Complete,
            results,
        }
    }

    pub fn failed(failure: SearchFailure) -> Self {
        Self {
            status: SearchStatus::Failed(failure),
            results: Vec::new(),
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.status, SearchStatus::Failed(_))
    }

    fn map<U>(self, f: impl FnMut(T) -> U) -> SearchOutcome<U> {
        SearchOutcome {
            status: self.status,
            results: self.results.into_iter().map(f).collect(),
        }
    }
}

/// Outcome of [`HybridSearcher::search_auto`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SearchResults {
    Plain(SearchOutcome<SearchHit>),
    WithContext(SearchOutcome<ContextHit>),
}

impl SearchResults {
    pub fn status(&self) -> &SearchStatus {
        match self {
            SearchResults::Plain(o) => &o.status,
            SearchResults::WithContext(o) => &o.status,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            SearchResults::Plain(o) => o.results.len(),
            SearchResults::WithContext(o) => o.results.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A candidate after fusion, before presentation.
struct ScoredMatch {
    candidate: LexicalCandidate,
    scores: HitScores,
}

// ============ Searcher ============

/// Hybrid searcher over a [`Store`], with an injected embedding provider.
///
/// The provider is loaded lazily on the first search that needs a query
/// embedding, at most once per searcher; a failed load is remembered and
/// every later search runs lexical-only.
pub struct HybridSearcher<S> {
    store: S,
    provider: Arc<dyn EmbeddingProvider>,
    settings: SearcherSettings,
    provider_ready: OnceCell<bool>,
}

impl<S: Store> HybridSearcher<S> {
    pub fn new(store: S, provider: Arc<dyn EmbeddingProvider>, settings: SearcherSettings) -> Self {
        Self {
            store,
            provider,
            settings,
            provider_ready: OnceCell::new(),
        }
    }

    pub fn settings(&self) -> &SearcherSettings {
        &self.settings
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Plain search: ranked hits with the matched chunk's content.
    pub async fn search(&self, req: &SearchRequest) -> SearchOutcome<SearchHit> {
        self.rank(req).await.map(|m| SearchHit {
            document: HitDocument::from(&m.candidate.document),
            chunk_id: m.candidate.chunk_id,
            chunk_sequence: m.candidate.chunk_sequence,
            scores: m.scores,
            content: m.candidate.content,
        })
    }

    /// Search and expand every hit into its context window.
    pub async fn search_with_context(&self, req: &SearchRequest) -> SearchOutcome<ContextHit> {
        let half_width = req.context_window.unwrap_or(self.settings.context_window);
        let ranked = self.rank(req).await;

        let mut results = Vec::with_capacity(ranked.results.len());
        for m in ranked.results {
            results.push(self.expand(m, half_width).await);
        }
        SearchOutcome {
            status: ranked.status,
            results,
        }
    }

    /// Context search when the request's category is a context category,
    /// plain search otherwise.
    pub async fn search_auto(&self, req: &SearchRequest) -> SearchResults {
        let wants_context = req
            .category
            .as_deref()
            .is_some_and(|c| self.settings.context_categories.iter().any(|cc| cc == c));
        if wants_context {
            SearchResults::WithContext(self.search_with_context(req).await)
        } else {
            SearchResults::Plain(self.search(req).await)
        }
    }

    /// Steps 1 to 4: keywords, lexical candidates, semantic scores, fusion.
    async fn rank(&self, req: &SearchRequest) -> SearchOutcome<ScoredMatch> {
        let top_k = req.top_k.unwrap_or(self.settings.top_k);
        let bm25_weight = req.bm25_weight.unwrap_or(self.settings.bm25_weight);
        let embedding_weight = req.embedding_weight.unwrap_or(self.settings.embedding_weight);

        let Some(matcher) = KeywordMatcher::from_query(&req.query) else {
            debug!(query = %req.query, "no searchable keywords in query");
            return SearchOutcome::complete(Vec::new());
        };
        if top_k == 0 {
            return SearchOutcome::complete(Vec::new());
        }
        if ((bm25_weight + embedding_weight) - 1.0).abs() > 1e-9 {
            debug!(bm25_weight, embedding_weight, "search weights do not sum to 1.0");
        }

        let lexical = LexicalQuery {
            matcher: &matcher,
            category: req.category.as_deref(),
            subcategory: req.subcategory.as_deref(),
            limit: top_k.saturating_mul(OVER_FETCH_FACTOR),
        };
        let candidates = match self
            .with_storage_timeout("lexical candidate query", self.store.lexical_candidates(&lexical))
            .await
        {
            Ok(c) => c,
            Err(failure) => {
                warn!(query = %req.query, error = %failure, "search backend unavailable");
                return SearchOutcome::failed(failure);
            }
        };
        if candidates.is_empty() {
            debug!(keywords = ?matcher.keywords(), "no lexical matches");
            return SearchOutcome::complete(Vec::new());
        }

        let (query_vec, status) = if embedding_weight == 0.0 {
            (None, SearchStatus::Complete)
        } else {
            match self.embed_query(&req.query).await {
                Ok(v) => (Some(v), SearchStatus::Complete),
                Err(reason) => {
                    warn!(reason = %reason, "semantic scoring unavailable, ranking lexically");
                    (None, SearchStatus::LexicalOnly { reason })
                }
            }
        };

        let candidate_count = candidates.len();
        let mut scored: Vec<ScoredMatch> = candidates
            .into_iter()
            .map(|candidate| {
                let semantic = match &query_vec {
                    Some(q) => candidate_semantic_score(q, &candidate),
                    None => 0.0,
                };
                let scores = HitScores {
                    lexical_score: candidate.lexical_score,
                    semantic_score: semantic,
                    combined_score: bm25_weight * candidate.lexical_score
                        + embedding_weight * semantic,
                };
                ScoredMatch { candidate, scores }
            })
            .collect();

        // Stable: equal combined scores keep the lexical ordering.
        scored.sort_by(|a, b| b.scores.combined_score.total_cmp(&a.scores.combined_score));
        scored.truncate(top_k);

        info!(
            query = %req.query,
            keywords = ?matcher.keywords(),
            candidates = candidate_count,
            results = scored.len(),
            "search complete"
        );
        SearchOutcome {
            status,
            results: scored,
        }
    }

    /// Step 5 for one hit. Never fails; falls back to the matched chunk.
    async fn expand(&self, m: ScoredMatch, half_width: usize) -> ContextHit {
        let document_id = m.candidate.document.document_id.clone();
        let window = match self
            .with_storage_timeout("context window query", self.store.document_chunks(&document_id))
            .await
        {
            Ok(chunks) => select_window(&chunks, &m.candidate.chunk_id, half_width)
                .ok_or_else(|| format!("chunk {} not found in its document", m.candidate.chunk_id)),
            Err(failure) => Err(failure.to_string()),
        };

        let (context_chunks, is_full_document, context_error) = match window {
            Ok(w) => (w.chunks, w.bounds.is_full_document, None),
            Err(error) => {
                warn!(document_id = %document_id, error = %error, "context expansion failed, returning matched chunk");
                let single = ChunkRecord {
                    chunk_id: m.candidate.chunk_id.clone(),
                    chunk_sequence: m.candidate.chunk_sequence,
                    chunk_start: m.candidate.chunk_start,
                    chunk_end: m.candidate.chunk_end,
                    content: m.candidate.content.clone(),
                };
                (vec![single], false, Some(error))
            }
        };

        ContextHit {
            document: HitDocument::from(&m.candidate.document),
            chunk_id: m.candidate.chunk_id,
            scores: m.scores,
            context_content: join_contents(&context_chunks),
            context_window_size: context_chunks.len(),
            context_chunks,
            is_full_document,
            context_error,
        }
    }

    /// Load the provider once; `false` if it is unusable.
    async fn ensure_provider(&self) -> bool {
        *self
            .provider_ready
            .get_or_init(|| async {
                let secs = self.settings.embedding_timeout.as_secs();
                match tokio::time::timeout(self.settings.embedding_timeout, self.provider.load()).await {
                    Ok(Ok(())) => {
                        info!(model = self.provider.model_name(), "embedding provider loaded");
                        true
                    }
                    Ok(Err(e)) => {
                        warn!(model = self.provider.model_name(), error = %format!("{:#}", e), "embedding provider failed to load");
                        false
                    }
                    Err(_) => {
                        warn!(model = self.provider.model_name(), secs, "embedding provider load timed out");
                        false
                    }
                }
            })
            .await
    }

    /// Embed the query, or explain why it could not be embedded.
    async fn embed_query(&self, query: &str) -> Result<Vec<f32>, String> {
        if !self.ensure_provider().await {
            return Err("embedding provider unavailable".to_string());
        }
        let prefix = self.settings.query_prefix.as_deref();
        match tokio::time::timeout(self.settings.embedding_timeout, self.provider.embed(query, prefix))
            .await
        {
            Ok(Ok(v)) => Ok(v),
            Ok(Err(e)) => Err(format!("query embedding failed: {:#}", e)),
            Err(_) => Err(format!(
                "query embedding timed out after {}s",
                self.settings.embedding_timeout.as_secs()
            )),
        }
    }

    async fn with_storage_timeout<T>(
        &self,
        operation: &str,
        fut: impl Future<Output = anyhow::Result<T>>,
    ) -> Result<T, SearchFailure> {
        match tokio::time::timeout(self.settings.storage_timeout, fut).await {
            Ok(Ok(v)) => Ok(v),
            Ok(Err(e)) => Err(SearchFailure::backend(format!("{:#}", e))),
            Err(_) => Err(SearchFailure::Timeout {
                operation: operation.to_string(),
                secs: self.settings.storage_timeout.as_secs(),
            }),
        }
    }
}

fn candidate_semantic_score(query_vec: &[f32], candidate: &LexicalCandidate) -> f64 {
    let Some(raw) = candidate.embedding.as_deref() else {
        return 0.0;
    };
    match parse_embedding(raw) {
        Some(stored) => semantic_score(query_vec, &stored),
        None => {
            warn!(chunk_id = %candidate.chunk_id, "malformed stored embedding, semantic score 0");
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serializes_with_state_tag() {
        let complete = serde_json::to_value(SearchStatus::Complete).unwrap();
        assert_eq!(complete, serde_json::json!({"state": "complete"}));

        let lexical = serde_json::to_value(SearchStatus::LexicalOnly {
            reason: "down".into(),
        })
        .unwrap();
        assert_eq!(lexical["state"], "lexical_only");
        assert_eq!(lexical["reason"], "down");

        let failed =
            serde_json::to_value(SearchStatus::Failed(SearchFailure::backend("no db"))).unwrap();
        assert_eq!(failed["state"], "failed");
        assert_eq!(failed["kind"], "backend");
        assert_eq!(failed["message"], "no db");
    }

    #[test]
    fn test_request_deserializes_with_defaults() {
        let req: SearchRequest =
            serde_json::from_str(r#"{"query": "orders", "top_k": 3}"#).unwrap();
        assert_eq!(req.query, "orders");
        assert_eq!(req.top_k, Some(3));
        assert!(req.category.is_none());
        assert!(req.context_window.is_none());
    }

    #[test]
    fn test_request_builder() {
        let req = SearchRequest::new("q")
            .category("table-context")
            .subcategory("sales")
            .weights(0.5, 0.5)
            .context_window(1);
        assert_eq!(req.category.as_deref(), Some("table-context"));
        assert_eq!(req.bm25_weight, Some(0.5));
        assert_eq!(req.context_window, Some(1));
    }

    #[test]
    fn test_hit_serializes_flat() {
        let hit = SearchHit {
            document: HitDocument {
                document_id: "d".into(),
                document_title: "t".into(),
                relative_path: "a/t.md".into(),
                file_name: "t.md".into(),
                category: "general".into(),
                subcategory: None,
                source_url: None,
                last_modified: format_ts_iso(0),
            },
            chunk_id: "c".into(),
            chunk_sequence: 0,
            scores: HitScores {
                lexical_score: 1.0,
                semantic_score: 0.5,
                combined_score: 0.65,
            },
            content: "x".into(),
        };
        let v = serde_json::to_value(&hit).unwrap();
        assert_eq!(v["document_id"], "d");
        assert_eq!(v["combined_score"], 0.65);
        assert_eq!(v["last_modified"], "1970-01-01T00:00:00Z");
    }
}
