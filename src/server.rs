//! JSON HTTP API.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Health check (returns version) |
//! | `POST` | `/search` | Hybrid search; `"context": true` forces context windows |
//! | `GET`  | `/documents/{id}` | Full document with its chunks |
//!
//! `POST /search` always answers `200` with `{ "status": ..., "results": [...] }`.
//! A storage failure is reported in the body as `status.state = "failed"`,
//! never as an HTTP error, so clients branch on one field.
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "not_found", "message": "document not found: ..." } }
//! ```
//!
//! Error codes: `not_found` (404), `internal` (500).
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted to support browser-based
//! clients.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use docwindow_core::models::DocumentResponse;
use docwindow_core::search::{HybridSearcher, SearchRequest, SearchResults};
use docwindow_core::store::Store;

use crate::config::Config;
use crate::search::build_searcher;

/// Shared application state passed to all route handlers.
struct AppState<S> {
    searcher: Arc<HybridSearcher<S>>,
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            searcher: Arc::clone(&self.searcher),
        }
    }
}

/// Starts the HTTP server on `[server].bind` and runs until the process exits.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let searcher = Arc::new(build_searcher(config).await?);
    let app = router(searcher);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!(bind = %bind_addr, "server listening");
    println!("docwindow listening on http://{}", bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}

/// Build the API router over any [`Store`].
pub fn router<S: Store + 'static>(searcher: Arc<HybridSearcher<S>>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/search", post(handle_search::<S>))
        .route("/documents/{id}", get(handle_get_document::<S>))
        .layer(cors)
        .with_state(AppState { searcher })
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    /// Machine-readable error code (e.g., `"not_found"`).
    code: String,
    message: String,
}

/// Internal error type that converts into an Axum HTTP response.
struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found".to_string(),
        message: message.into(),
    }
}

fn internal(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal".to_string(),
        message: message.into(),
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ POST /search ============

/// Request body for `POST /search`: a [`SearchRequest`] plus a context flag.
#[derive(Deserialize)]
struct SearchBody {
    #[serde(flatten)]
    request: SearchRequest,
    #[serde(default)]
    context: bool,
}

async fn handle_search<S: Store + 'static>(
    State(state): State<AppState<S>>,
    Json(body): Json<SearchBody>,
) -> Json<SearchResults> {
    let results = if body.context {
        SearchResults::WithContext(state.searcher.search_with_context(&body.request).await)
    } else {
        state.searcher.search_auto(&body.request).await
    };
    Json(results)
}

// ============ GET /documents/{id} ============

async fn handle_get_document<S: Store + 'static>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
) -> Result<Json<DocumentResponse>, AppError> {
    match state.searcher.store().get_document(&id).await {
        Ok(Some(doc)) => Ok(Json(doc)),
        Ok(None) => Err(not_found(format!("document not found: {}", id))),
        Err(e) => {
            warn!(document_id = %id, error = %e, "document lookup failed");
            Err(internal(e.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::DisabledProvider;
    use docwindow_core::chunk::Chunker;
    use docwindow_core::metadata::{CategoryPattern, MetadataExtractor};
    use docwindow_core::models::SourceFile;
    use docwindow_core::prepare::prepare_document;
    use docwindow_core::search::SearcherSettings;
    use docwindow_core::store::memory::InMemoryStore;
    use docwindow_core::store::IndexSink;

    async fn spawn_app() -> (String, String) {
        let store = InMemoryStore::new();
        let extractor = MetadataExtractor::new(
            vec![CategoryPattern::new("table-context", "table-context")],
            "general",
        );
        let chunker = Chunker::new(1000, 200).unwrap();
        let file = SourceFile {
            relative_path: "table-context/sales/orders.md".to_string(),
            text: "ORDERS table. One row per customer order.".to_string(),
            modified_at: 0,
        };
        let prepared = prepare_document(&file, &extractor, &chunker, None, 0).unwrap();
        let doc_id = prepared.document.document_id.clone();
        store
            .write_document(&prepared.document, &prepared.chunks)
            .await
            .unwrap();

        let searcher = HybridSearcher::new(
            store,
            Arc::new(DisabledProvider),
            SearcherSettings::default(),
        );
        let app = router(Arc::new(searcher));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{}", addr), doc_id)
    }

    #[tokio::test]
    async fn test_health() {
        let (base, _) = spawn_app().await;
        let body: serde_json::Value = reqwest::get(format!("{}/health", base))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["status"], "ok");
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn test_search_with_context() {
        let (base, doc_id) = spawn_app().await;
        let resp = reqwest::Client::new()
            .post(format!("{}/search", base))
            .json(&serde_json::json!({ "query": "orders", "context": true }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);

        let body: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(body["status"]["state"], "lexical_only");
        let results = body["results"].as_array().unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0]["document_id"], doc_id.as_str());
        assert_eq!(results[0]["is_full_document"], true);
    }

    #[tokio::test]
    async fn test_search_without_keywords_is_empty() {
        let (base, _) = spawn_app().await;
        let body: serde_json::Value = reqwest::Client::new()
            .post(format!("{}/search", base))
            .json(&serde_json::json!({ "query": "is it ok" }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["status"]["state"], "complete");
        assert_eq!(body["results"].as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_get_document_and_not_found() {
        let (base, doc_id) = spawn_app().await;

        let found: serde_json::Value = reqwest::get(format!("{}/documents/{}", base, doc_id))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(found["relative_path"], "table-context/sales/orders.md");
        assert_eq!(found["chunks"].as_array().unwrap().len(), 1);

        let resp = reqwest::get(format!("{}/documents/missing", base))
            .await
            .unwrap();
        assert_eq!(resp.status(), 404);
        let body: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(body["error"]["code"], "not_found");
    }
}
