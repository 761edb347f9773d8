//! Embedding provider trait and vector utilities.
//!
//! Defines the [`EmbeddingProvider`] trait that every embedding backend
//! implements, plus pure helpers for normalization, similarity, and the JSON
//! form vectors take in storage.
//!
//! Concrete providers (Ollama, OpenAI, fastembed) live in the `docwindow`
//! app crate. Providers return L2-normalized vectors, so cosine similarity
//! against stored chunk vectors reduces to a dot product.

use anyhow::Result;
use async_trait::async_trait;

/// A text → vector model.
///
/// `load` is expensive (model download, warm-up, connectivity probe) and is
/// called at most once per searcher; `embed` may be called many times after
/// a successful load.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Returns the model identifier (e.g. `"nomic-embed-text"`).
    fn model_name(&self) -> &str;
    /// Returns the embedding vector dimensionality (e.g. `768`).
    fn dims(&self) -> usize;
    /// Prepare the model for use.
    async fn load(&self) -> Result<()>;
    /// Embed `text`, prepending `prefix` when given. The result is unit length.
    async fn embed(&self, text: &str, prefix: Option<&str>) -> Result<Vec<f32>>;
}

/// Prepend an instruction prefix for asymmetric query/passage models.
pub fn with_prefix(text: &str, prefix: Option<&str>) -> String {
    match prefix {
        Some(p) if !p.is_empty() => format!("{}{}", p, text),
        _ => text.to_string(),
    }
}

/// Scale `v` to unit length in place. Zero vectors are left unchanged.
pub fn normalize(v: &mut [f32]) {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

/// Compute cosine similarity between two embedding vectors.
///
/// Returns a value in `[-1.0, 1.0]`; `0.0` for empty vectors or vectors of
/// different lengths.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }

    dot / denom
}

/// Encode a vector as the JSON array stored in the `embedding` column.
pub fn embedding_to_json(v: &[f32]) -> String {
    serde_json::to_string(v).unwrap_or_else(|_| "[]".to_string())
}

/// Parse a stored embedding. `None` unless it is a JSON array of more than
/// one finite number.
pub fn parse_embedding(raw: &str) -> Option<Vec<f32>> {
    let values: Vec<f64> = serde_json::from_str(raw).ok()?;
    if values.len() <= 1 || values.iter().any(|x| !x.is_finite()) {
        return None;
    }
    Some(values.into_iter().map(|x| x as f32).collect())
}

/// Semantic relevance of a stored chunk vector to the query vector.
///
/// Negative similarity is treated as no relevance and clamped to `0.0`.
pub fn semantic_score(query: &[f32], stored: &[f32]) -> f64 {
    (cosine_similarity(query, stored) as f64).max(0.0)
}
