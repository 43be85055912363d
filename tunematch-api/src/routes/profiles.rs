use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;

use tunematch_core::models::{NewProfile, Profile, ProfileDetail, UpdateProfile};
use tunematch_core::profiles::{self, PreferenceSet};
use tunematch_core::store::PreferenceRepo;
use tunematch_shared::errors::{AppError, AppResult};
use tunematch_shared::types::{ApiResponse, Paginated, PaginationParams, Viewer};

use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateProfileRequest {
    #[serde(flatten)]
    pub profile: NewProfile,
    #[serde(default)]
    pub genre_ids: Vec<i64>,
    #[serde(default)]
    pub song_ids: Vec<i64>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    #[serde(flatten)]
    pub changes: UpdateProfile,
    /// When present, replaces the preferred genres.
    pub genre_ids: Option<Vec<i64>>,
    /// When present, replaces the favourite songs.
    pub song_ids: Option<Vec<i64>>,
}

fn ensure_owner(viewer: &Viewer, profile_id: i64) -> AppResult<()> {
    if viewer.profile_id != profile_id {
        return Err(AppError::forbidden("you can only modify your own profile"));
    }
    Ok(())
}

// --- GET /profiles ---

pub async fn list_profiles(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PaginationParams>,
) -> AppResult<Json<ApiResponse<Paginated<Profile>>>> {
    let page = profiles::list_profiles(state.store.as_ref(), &params)?;
    Ok(Json(ApiResponse::ok(page)))
}

// --- POST /profiles ---

pub async fn create_profile(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateProfileRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<Profile>>)> {
    let profile = profiles::create_profile(
        state.store.as_ref(),
        req.profile,
        &req.genre_ids,
        &req.song_ids,
        state.limits(),
    )?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(profile))))
}

// --- GET /profiles/:id ---

pub async fn get_profile(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<ProfileDetail>>> {
    let detail = profiles::profile_detail(state.store.as_ref(), id)?;
    Ok(Json(ApiResponse::ok(detail)))
}

// --- PATCH /profiles/:id ---

pub async fn update_profile(
    viewer: Viewer,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateProfileRequest>,
) -> AppResult<Json<ApiResponse<Profile>>> {
    ensure_owner(&viewer, id)?;
    let store = state.store.as_ref();

    // A partial replacement keeps the side that was not sent.
    let preferences = match (req.genre_ids, req.song_ids) {
        (None, None) => None,
        (genre_ids, song_ids) => {
            let genre_ids = match genre_ids {
                Some(ids) => ids,
                None => store.profile_genres(id)?.into_iter().map(|g| g.id).collect(),
            };
            let song_ids = match song_ids {
                Some(ids) => ids,
                None => store.profile_songs(id)?.into_iter().map(|f| f.song.id).collect(),
            };
            Some(PreferenceSet { genre_ids, song_ids })
        }
    };

    let profile = profiles::update_profile(store, id, req.changes, preferences, state.limits())?;
    Ok(Json(ApiResponse::ok(profile)))
}

// --- DELETE /profiles/:id ---

pub async fn delete_profile(
    viewer: Viewer,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    ensure_owner(&viewer, id)?;
    profiles::delete_profile(state.store.as_ref(), id)?;
    Ok(StatusCode::NO_CONTENT)
}
