// src/api/categories.rs
// Category endpoints. Listings return names only, in display order.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{ApiResult, AppState};
use crate::error::AppError;
use crate::models::SortDirection;

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    #[serde(default)]
    sort: SortDirection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CreateBody {
    category: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RenameBody {
    new_category: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ReorderBody {
    categories: Vec<String>,
}

fn category_name(raw: &str) -> Result<String, AppError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(AppError::validation("category name is required"));
    }
    Ok(name.to_string())
}

pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<Vec<String>>> {
    let categories = state.stores.categories.list_categories(params.sort).await?;
    Ok(Json(categories.into_iter().map(|c| c.name).collect()))
}

pub async fn create(
    State(state): State<AppState>,
    Json(body): Json<CreateBody>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let name = category_name(&body.category)?;
    let category = state.stores.categories.create_category(&name).await?;
    log::info!("Created category '{}'", category.name);
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "category created", "category": category.name })),
    ))
}

pub async fn rename(
    State(state): State<AppState>,
    Path(old): Path<String>,
    Json(body): Json<RenameBody>,
) -> ApiResult<Json<Value>> {
    let new = category_name(&body.new_category)?;
    if !state.stores.categories.rename_category(&old, &new).await? {
        return Err(AppError::not_found("category", old).into());
    }
    log::info!("Renamed category '{}' to '{}'", old, new);
    Ok(Json(json!({ "message": "category renamed" })))
}

pub async fn delete(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<Json<Value>> {
    let removed = state.stores.categories.delete_category(&name).await?;
    log::info!("Deleted category '{}' with {} link(s)", name, removed);
    Ok(Json(
        json!({ "message": "category deleted", "deletedLinks": removed }),
    ))
}

pub async fn reorder(
    State(state): State<AppState>,
    Json(body): Json<ReorderBody>,
) -> ApiResult<Json<Value>> {
    if body.categories.is_empty() {
        return Err(AppError::validation("categories must be a non-empty list").into());
    }
    state
        .stores
        .categories
        .reorder_categories(&body.categories)
        .await?;
    Ok(Json(json!({ "message": "category order updated" })))
}

#[cfg(test)]
mod tests {
    use axum::http::Method;

    use super::super::test_support::{send, state};
    use super::*;

    async fn create_category(state: &AppState, name: &str) -> StatusCode {
        send(
            state,
            Method::POST,
            "/api/categories",
            Some(json!({ "category": name })),
        )
        .await
        .0
    }

    #[tokio::test]
    async fn test_create_and_list_in_display_order() {
        let state = state();
        assert_eq!(create_category(&state, "First").await, StatusCode::CREATED);
        assert_eq!(create_category(&state, "Second").await, StatusCode::CREATED);

        // newest has the highest order, so it comes first by default
        let (_, names) = send(&state, Method::GET, "/api/categories", None).await;
        assert_eq!(names, json!(["Second", "First"]));

        let (_, names) = send(&state, Method::GET, "/api/categories?sort=asc", None).await;
        assert_eq!(names, json!(["First", "Second"]));
    }

    #[tokio::test]
    async fn test_create_duplicate_and_empty() {
        let state = state();
        create_category(&state, "Dev").await;
        assert_eq!(create_category(&state, "Dev").await, StatusCode::CONFLICT);
        assert_eq!(create_category(&state, "  ").await, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_rename_moves_links() {
        let state = state();
        send(
            &state,
            Method::POST,
            "/api/links",
            Some(json!({ "category": "Old", "title": "t", "url": "example.com" })),
        )
        .await;

        let (status, _) = send(
            &state,
            Method::PUT,
            "/api/categories/Old",
            Some(json!({ "newCategory": "New" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (_, links) = send(&state, Method::GET, "/api/links/New", None).await;
        assert_eq!(links.as_array().unwrap().len(), 1);

        let (status, _) = send(
            &state,
            Method::PUT,
            "/api/categories/Missing",
            Some(json!({ "newCategory": "X" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_delete_cascades() {
        let state = state();
        for title in ["a", "b"] {
            send(
                &state,
                Method::POST,
                "/api/links",
                Some(json!({ "category": "Gone", "title": title, "url": "example.com" })),
            )
            .await;
        }

        let (status, body) = send(&state, Method::DELETE, "/api/categories/Gone", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["deletedLinks"], 2);

        let (_, all) = send(&state, Method::GET, "/api/links/all", None).await;
        assert_eq!(all, json!([]));
    }

    #[tokio::test]
    async fn test_reorder() {
        let state = state();
        for name in ["A", "B", "C"] {
            create_category(&state, name).await;
        }

        let (status, _) = send(
            &state,
            Method::POST,
            "/api/categories/reorder",
            Some(json!({ "categories": ["A", "C", "B"] })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (_, names) = send(&state, Method::GET, "/api/categories", None).await;
        assert_eq!(names, json!(["A", "C", "B"]));

        let (status, _) = send(
            &state,
            Method::POST,
            "/api/categories/reorder",
            Some(json!({ "categories": [] })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
