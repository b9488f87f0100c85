//! Browser UI server
//!
//! Serves the single-page UI and a small JSON API. Only the most recent
//! extraction is kept in memory; a new extraction replaces it.

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use pageclean::export::page_file_name;
use pageclean::{ExtractReport, ExtractRequest, Extractor, SourceKind};
use serde::Deserialize;
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::trace::TraceLayer;

const INDEX_HTML: &str = include_str!("page.html");

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    direct: Extractor,
    browser: Extractor,
    latest: Arc<RwLock<Option<ExtractReport>>>,
}

impl AppState {
    /// State with one extractor per selectable source
    pub fn new(direct: Extractor, browser: Extractor) -> Self {
        Self {
            direct,
            browser,
            latest: Arc::new(RwLock::new(None)),
        }
    }

    fn extractor(&self, source: SourceKind) -> &Extractor {
        match source {
            SourceKind::Direct => &self.direct,
            SourceKind::Browser => &self.browser,
        }
    }
}

/// Body of `POST /api/extract`
#[derive(Debug, Deserialize)]
struct ExtractBody {
    #[serde(flatten)]
    request: ExtractRequest,
    #[serde(default)]
    source: SourceKind,
}

#[derive(Debug, Deserialize)]
struct DownloadQuery {
    page: Option<String>,
}

/// Build the router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/health", get(health_handler))
        .route("/api/extract", post(extract_handler))
        .route("/api/download", get(download_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind `addr` and serve until the process exits
pub async fn serve(addr: SocketAddr, state: AppState) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("UI server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, router(state)).await
}

async fn index_handler() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn health_handler() -> impl IntoResponse {
    Json(json!({ "status": "ok", "version": env!("CARGO_PKG_VERSION") }))
}

async fn extract_handler(
    State(state): State<AppState>,
    Json(body): Json<ExtractBody>,
) -> Response {
    tracing::info!(
        url = body.request.url.as_str(),
        mode = %body.request.mode,
        source = %body.source,
        "Extraction requested"
    );

    match state.extractor(body.source).run(body.request).await {
        Ok(report) => {
            let response = Json(&report).into_response();
            *state.latest.write().await = Some(report);
            response
        }
        Err(e) => error_response(StatusCode::BAD_REQUEST, e.kind(), &e.to_string()),
    }
}

async fn download_handler(
    State(state): State<AppState>,
    Query(query): Query<DownloadQuery>,
) -> Response {
    let latest = state.latest.read().await;
    let Some(report) = latest.as_ref() else {
        return error_response(StatusCode::NOT_FOUND, "no_report", "No extraction results yet");
    };

    let page = match &query.page {
        Some(label) => report.page(label),
        None => report.pages.first(),
    };
    let Some(page) = page else {
        return error_response(
            StatusCode::NOT_FOUND,
            "unknown_page",
            &format!("No page labelled '{}'", query.page.unwrap_or_default()),
        );
    };

    let file_name = page_file_name(report, &page.label, &chrono::Local::now());
    (
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", file_name),
            ),
        ],
        page.text(),
    )
        .into_response()
}

fn error_response(status: StatusCode, kind: &str, message: &str) -> Response {
    (status, Json(json!({ "error": message, "kind": kind }))).into_response()
}
