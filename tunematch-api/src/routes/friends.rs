use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;
use std::sync::Arc;

use tunematch_core::friends;
use tunematch_core::models::{Profile, StatusMessage};
use tunematch_shared::errors::AppResult;
use tunematch_shared::types::{ApiResponse, Viewer};

use crate::events::publisher;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct AddFriendResponse {
    pub added: bool,
}

// --- GET /friends ---

pub async fn list_friends(
    viewer: Viewer,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<Vec<Profile>>>> {
    let friends = friends::friends_of(state.store.as_ref(), viewer.profile_id)?;
    Ok(Json(ApiResponse::ok(friends)))
}

// --- POST /friends/:id ---

pub async fn add_friend(
    viewer: Viewer,
    State(state): State<Arc<AppState>>,
    Path(friend_id): Path<i64>,
) -> AppResult<Json<ApiResponse<AddFriendResponse>>> {
    let added = friends::add_friend(state.store.as_ref(), viewer.profile_id, friend_id)?;
    if added {
        publisher::publish_friend_added(&state.events, viewer.profile_id, friend_id).await;
    }
    Ok(Json(ApiResponse::ok(AddFriendResponse { added })))
}

// --- GET /friends/suggestions ---

pub async fn suggestions(
    viewer: Viewer,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<Vec<Profile>>>> {
    let profiles = friends::suggestions_for(state.store.as_ref(), viewer.profile_id)?;
    Ok(Json(ApiResponse::ok(profiles)))
}

// --- GET /feed ---

pub async fn news_feed(
    viewer: Viewer,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<Vec<StatusMessage>>>> {
    let feed = friends::news_feed_for(state.store.as_ref(), viewer.profile_id)?;
    Ok(Json(ApiResponse::ok(feed)))
}
