use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

use tunematch_core::friends;
use tunematch_core::models::StatusMessage;
use tunematch_shared::errors::AppResult;
use tunematch_shared::types::{ApiResponse, Viewer};

use crate::events::publisher;
use crate::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct PostStatusRequest {
    pub message: String,
    #[serde(default)]
    #[validate(length(max = 10))]
    pub image_urls: Vec<String>,
}

// --- POST /statuses ---

pub async fn post_status(
    viewer: Viewer,
    State(state): State<Arc<AppState>>,
    Json(req): Json<PostStatusRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<StatusMessage>>)> {
    req.validate()?;
    let status = friends::post_status(state.store.as_ref(), viewer.profile_id, &req.message, req.image_urls)?;
    publisher::publish_status_posted(&state.events, &status).await;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(status))))
}

// --- GET /profiles/:id/statuses ---

pub async fn list_statuses(
    State(state): State<Arc<AppState>>,
    Path(profile_id): Path<i64>,
) -> AppResult<Json<ApiResponse<Vec<StatusMessage>>>> {
    let statuses = friends::statuses_of(state.store.as_ref(), profile_id)?;
    Ok(Json(ApiResponse::ok(statuses)))
}

// --- DELETE /statuses/:id ---

pub async fn delete_status(
    viewer: Viewer,
    State(state): State<Arc<AppState>>,
    Path(status_id): Path<i64>,
) -> AppResult<StatusCode> {
    friends::delete_status(state.store.as_ref(), viewer.profile_id, status_id)?;
    Ok(StatusCode::NO_CONTENT)
}
