// src/api/notes.rs
// Note endpoints.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{parse_id, ApiResult, AppState};
use crate::error::AppError;
use crate::models::{Note, NoteDraft, NoteId};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct NoteBody {
    title: String,
    content: String,
    tags: Option<String>,
}

impl NoteBody {
    fn draft(&self) -> Result<NoteDraft, AppError> {
        NoteDraft::new(&self.title, &self.content, self.tags.as_deref())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ReorderBody {
    ids: Vec<NoteId>,
}

pub async fn list(State(state): State<AppState>) -> ApiResult<Json<Vec<Note>>> {
    Ok(Json(state.stores.notes.list_notes().await?))
}

pub async fn create(
    State(state): State<AppState>,
    Json(body): Json<NoteBody>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let note = state.stores.notes.create_note(body.draft()?).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "note created", "note": note })),
    ))
}

pub async fn update(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Json(body): Json<NoteBody>,
) -> ApiResult<Json<Value>> {
    let id = parse_id("note", &key)?;
    if !state.stores.notes.update_note(id, body.draft()?).await? {
        return Err(AppError::not_found("note", id).into());
    }
    let note = state
        .stores
        .notes
        .find_note(id)
        .await?
        .ok_or_else(|| AppError::not_found("note", id))?;
    Ok(Json(json!({ "message": "note updated", "note": note })))
}

pub async fn delete(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> ApiResult<Json<Value>> {
    let id = parse_id("note", &key)?;
    if !state.stores.notes.delete_note(id).await? {
        return Err(AppError::not_found("note", id).into());
    }
    Ok(Json(json!({ "message": "note deleted" })))
}

pub async fn reorder(
    State(state): State<AppState>,
    Json(body): Json<ReorderBody>,
) -> ApiResult<Json<Value>> {
    if body.ids.is_empty() {
        return Err(AppError::validation("ids must be a non-empty list").into());
    }
    state.stores.notes.reorder_notes(&body.ids).await?;
    Ok(Json(json!({ "message": "note order updated" })))
}
