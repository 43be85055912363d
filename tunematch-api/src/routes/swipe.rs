use axum::extract::{Path, State};
use axum::Json;
use std::sync::Arc;

use tunematch_core::models::Match;
use tunematch_core::{ledger, selector, Candidate, LikeOutcome, SwipeCursor};
use tunematch_shared::errors::AppResult;
use tunematch_shared::types::{ApiResponse, Viewer};

use crate::events::publisher;
use crate::AppState;

// --- GET /swipe ---

pub async fn next_candidate(
    viewer: Viewer,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<Candidate>>> {
    let cursor = state.cursors.load(viewer.profile_id).await?;
    let candidate = selector::next_candidate(
        state.store.as_ref(),
        viewer.profile_id,
        cursor,
        state.candidate_options(),
    )?;
    state.cursors.save(viewer.profile_id, candidate.cursor).await?;

    Ok(Json(ApiResponse::ok(candidate)))
}

// --- POST /swipe/like/:id ---

pub async fn like(
    viewer: Viewer,
    State(state): State<Arc<AppState>>,
    Path(receiver_id): Path<i64>,
) -> AppResult<Json<ApiResponse<LikeOutcome>>> {
    let outcome = ledger::record_like(state.store.as_ref(), viewer.profile_id, receiver_id)?;
    publisher::publish_like_outcome(&state.events, &outcome).await;

    let message = outcome.message();
    Ok(Json(ApiResponse::ok_with_message(outcome, message)))
}

// --- POST /swipe/pass/:id ---

pub async fn pass(
    viewer: Viewer,
    State(state): State<Arc<AppState>>,
    Path(profile_id): Path<i64>,
) -> AppResult<Json<ApiResponse<SwipeCursor>>> {
    let cursor = state.cursors.load(viewer.profile_id).await?;
    let cursor = selector::pass(cursor, profile_id);
    state.cursors.save(viewer.profile_id, cursor).await?;

    Ok(Json(ApiResponse::ok(cursor)))
}

// --- GET /matches ---

pub async fn list_matches(
    viewer: Viewer,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<Vec<Match>>>> {
    let matches = ledger::list_mutual_matches(state.store.as_ref(), viewer.profile_id)?;
    Ok(Json(ApiResponse::ok(matches)))
}
