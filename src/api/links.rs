// src/api/links.rs
// =============================================================================
// Link endpoints.
//
// Creating a link, or changing its URL, kicks off a favicon lookup in the
// background. The response goes out immediately with the default icon;
// the real one shows up on the next read.
// =============================================================================

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{parse_id, ApiResult, AppState, LinkView};
use crate::error::AppError;
use crate::models::{LinkHealth, LinkUpdate, NewLink};
use crate::store::RECENT_VISITS_LIMIT;

// All fields optional so a missing one is a 400 from our validation,
// not a deserialization failure.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LinkBody {
    category: Option<String>,
    title: Option<String>,
    url: Option<String>,
    description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    q: String,
}

pub async fn list_all(State(state): State<AppState>) -> ApiResult<Json<Vec<LinkView>>> {
    let links = state.stores.links.find_all().await?;
    Ok(Json(state.views(links)))
}

pub async fn list_by_category(
    State(state): State<AppState>,
    Path(category): Path<String>,
) -> ApiResult<Json<Vec<LinkView>>> {
    let links = if category == "all" {
        state.stores.links.find_all().await?
    } else {
        state.stores.links.find_by_category(&category).await?
    };
    Ok(Json(state.views(links)))
}

pub async fn create(
    State(state): State<AppState>,
    Json(body): Json<LinkBody>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let new_link = NewLink::new(
        body.category.as_deref().unwrap_or_default(),
        body.title.as_deref().unwrap_or_default(),
        body.url.as_deref().unwrap_or_default(),
        body.description.as_deref(),
    )?;

    let link = state.stores.links.insert(new_link).await?;
    log::info!("Added link {} ({})", link.id, link.url);
    state.spawn_favicon_refresh(link.id, link.url.clone());

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "link created", "link": state.view(link) })),
    ))
}

pub async fn update(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Json(body): Json<LinkBody>,
) -> ApiResult<Json<Value>> {
    let id = parse_id("link", &key)?;
    let existing = state
        .stores
        .links
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::not_found("link", id))?;

    let mut edit = LinkUpdate::edit(
        body.title.as_deref().unwrap_or_default(),
        body.url.as_deref().unwrap_or_default(),
        body.description.as_deref(),
        body.category.as_deref(),
    )?;

    // A new URL means the old health verdict and favicon no longer apply
    let url_changed = edit.url.as_deref() != Some(existing.url.as_str());
    if url_changed {
        edit.health = Some(LinkHealth::Unchecked);
        edit.favicon = Some(None);
    }

    if !state.stores.links.update_fields(id, edit).await? {
        return Err(AppError::not_found("link", id).into());
    }
    let link = state
        .stores
        .links
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::not_found("link", id))?;

    if url_changed {
        state.spawn_favicon_refresh(link.id, link.url.clone());
    }
    Ok(Json(json!({ "message": "link updated", "link": state.view(link) })))
}

pub async fn delete(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> ApiResult<Json<Value>> {
    let id = parse_id("link", &key)?;
    if !state.stores.links.delete(id).await? {
        return Err(AppError::not_found("link", id).into());
    }
    log::info!("Deleted link {}", id);
    Ok(Json(json!({ "message": "link deleted" })))
}

pub async fn recent_visits(State(state): State<AppState>) -> ApiResult<Json<Vec<LinkView>>> {
    let links = state.stores.links.recent_visits(RECENT_VISITS_LIMIT).await?;
    Ok(Json(state.views(links)))
}

pub async fn visit(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> ApiResult<Json<Value>> {
    let id = parse_id("link", &key)?;
    if !state.stores.links.record_visit(id).await? {
        return Err(AppError::not_found("link", id).into());
    }
    Ok(Json(json!({ "message": "visit recorded" })))
}

pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> ApiResult<Json<Vec<LinkView>>> {
    let links = state.stores.links.search(params.q.trim()).await?;
    Ok(Json(state.views(links)))
}
