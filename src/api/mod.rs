// src/api/mod.rs
// =============================================================================
// The REST API, built on axum.
//
// Layout:
// - links: CRUD, visits, search
// - categories: list, create, rename, delete, reorder
// - notes: CRUD and reorder
// - tasks: health, preview, import/export, the on-demand link sweep
//
// Every handler returns ApiResult<T>. An AppError coming out of the store or
// the models is turned into a JSON body `{ "error": "..." }` with a status
// that matches the kind of error:
//   Validation -> 400, NotFound -> 404, Conflict -> 409, everything else -> 500
// =============================================================================

mod categories;
mod links;
mod notes;
mod tasks;

use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::Serialize;
use serde_json::json;
use tokio::net::TcpListener;

use crate::checker::{FaviconResolver, LinkValidator};
use crate::error::{AppError, Result};
use crate::models::{Link, LinkId, LinkUpdate};
use crate::store::StoreHandles;

/// Everything a handler needs. Cloned per request, so it's all Arcs.
#[derive(Clone)]
pub struct AppState {
    pub stores: StoreHandles,
    pub resolver: Arc<FaviconResolver>,
    pub validator: Arc<LinkValidator>,
    pub default_icon: Arc<str>,
}

impl AppState {
    // Look up a favicon in the background and store it if one turns up.
    // The request that triggered it doesn't wait.
    pub(crate) fn spawn_favicon_refresh(&self, id: LinkId, url: String) {
        let resolver = self.resolver.clone();
        let links = self.stores.links.clone();

        tokio::spawn(async move {
            let Some(icon) = resolver.resolve(&url).await else {
                return;
            };
            match links.update_fields(id, LinkUpdate::favicon(Some(icon))).await {
                Ok(true) => log::debug!("Stored favicon for link {}", id),
                Ok(false) => log::debug!("Link {} was deleted before its favicon arrived", id),
                Err(e) => log::warn!("Could not store favicon for link {}: {}", id, e),
            }
        });
    }

    pub(crate) fn view(&self, link: Link) -> LinkView {
        LinkView::new(link, &self.default_icon)
    }

    pub(crate) fn views(&self, links: Vec<Link>) -> Vec<LinkView> {
        links.into_iter().map(|l| self.view(l)).collect()
    }
}

/// A link as the API shows it: favicon always filled in, plus the
/// boolean health view older clients expect.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkView {
    #[serde(flatten)]
    link: Link,
    is_valid: Option<bool>,
}

impl LinkView {
    pub fn new(mut link: Link, default_icon: &str) -> Self {
        let favicon = link.favicon_or(default_icon).to_string();
        link.favicon = Some(favicon);
        let is_valid = link.health.is_valid();
        Self { link, is_valid }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(tasks::health))
        // links
        .route("/api/links", post(links::create))
        .route("/api/links/all", get(links::list_all))
        .route("/api/all-links", get(links::list_all))
        // GET treats the segment as a category, PUT/DELETE as a link id
        .route(
            "/api/links/:key",
            get(links::list_by_category)
                .put(links::update)
                .delete(links::delete),
        )
        .route("/api/recent-visits", get(links::recent_visits))
        .route("/api/visit/:id", post(links::visit))
        .route("/api/search", get(links::search))
        // categories
        .route(
            "/api/categories",
            get(categories::list).post(categories::create),
        )
        .route("/api/categories/reorder", post(categories::reorder))
        .route(
            "/api/categories/:name",
            put(categories::rename).delete(categories::delete),
        )
        // notes
        .route("/api/notes", get(notes::list).post(notes::create))
        .route("/api/notes/reorder", post(notes::reorder))
        .route("/api/notes/:id", put(notes::update).delete(notes::delete))
        // tasks
        .route("/api/preview", get(tasks::preview))
        .route("/api/import", post(tasks::import))
        .route("/api/export", get(tasks::export))
        .route("/api/check-links", post(tasks::check_links))
        .with_state(state)
}

/// Bind and serve until the process is stopped.
pub async fn serve(state: AppState, bind: &str) -> Result<()> {
    let listener = TcpListener::bind(bind).await?;
    log::info!("API listening on http://{}", listener.local_addr()?);
    axum::serve(listener, router(state)).await?;
    Ok(())
}

// -----------------------------------------------------------------------------
// Errors
// -----------------------------------------------------------------------------

pub struct ApiError(AppError);

pub type ApiResult<T> = std::result::Result<T, ApiError>;

impl From<AppError> for ApiError {
    fn from(error: AppError) -> Self {
        Self(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            log::error!("Request failed: {}", self.0);
        }
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

// Path segments arrive as strings; ids must be integers.
pub(crate) fn parse_id(kind: &'static str, raw: &str) -> std::result::Result<i64, AppError> {
    raw.trim()
        .parse()
        .map_err(|_| AppError::validation(format!("invalid {kind} id '{raw}'")))
}
