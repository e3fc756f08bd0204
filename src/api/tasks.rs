// src/api/tasks.rs
// =============================================================================
// Endpoints that aren't plain CRUD: health, previews, import/export and the
// on-demand link sweep.
//
// POST /api/check-links waits for the sweep and returns the report.
// With ?background=true it only starts the sweep and answers 202 at once.
// Either way, a sweep that is already running means this one is skipped.
//
// Export hands back the raw stored records (health as a string, favicon
// possibly null) so that the file can be fed straight back into import.
// It is the one listing that does not go through LinkView.
// =============================================================================

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{ApiResult, AppState};
use crate::checker::{PagePreview, SweepOutcome};
use crate::models::Link;
use crate::transfer::{import_links, ImportFile};

#[derive(Debug, Default, Deserialize)]
pub struct PreviewParams {
    #[serde(default)]
    url: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct CheckParams {
    #[serde(default)]
    background: bool,
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn preview(
    State(state): State<AppState>,
    Query(params): Query<PreviewParams>,
) -> Json<PagePreview> {
    Json(state.resolver.preview(&params.url).await)
}

// Raw records, not views: see the note at the top.
pub async fn export(State(state): State<AppState>) -> ApiResult<Json<Vec<Link>>> {
    Ok(Json(state.stores.links.find_all().await?))
}

pub async fn import(
    State(state): State<AppState>,
    Json(file): Json<ImportFile>,
) -> ApiResult<Json<Value>> {
    let summary = import_links(state.stores.links.as_ref(), file.into_entries()).await?;
    for link in &summary.links {
        state.spawn_favicon_refresh(link.id, link.url.clone());
    }
    Ok(Json(json!({
        "message": "links imported",
        "imported": summary.imported,
        "skipped": summary.skipped,
    })))
}

pub async fn check_links(
    State(state): State<AppState>,
    Query(params): Query<CheckParams>,
) -> ApiResult<Response> {
    if params.background {
        // Take the permit here so a second request can't also get "started"
        let Some(permit) = state.validator.guard().try_acquire() else {
            return Ok(Json(SweepOutcome::Skipped).into_response());
        };

        let validator = state.validator.clone();
        tokio::spawn(async move {
            if let Err(e) = validator.run(permit).await {
                log::error!("Background link sweep failed: {}", e);
            }
        });
        return Ok((
            StatusCode::ACCEPTED,
            Json(json!({ "status": "started", "message": "link check started" })),
        )
            .into_response());
    }

    let outcome = state.validator.validate_all().await?;
    Ok(Json(outcome).into_response())
}
