use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use std::sync::Arc;

use tunematch_core::models::{FavoriteSong, Genre, ProfileGenre, ProfileSong};
use tunematch_core::preferences;
use tunematch_shared::errors::AppResult;
use tunematch_shared::types::{ApiResponse, Viewer};

use crate::AppState;

// --- GET /me/genres ---

pub async fn my_genres(
    viewer: Viewer,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<Vec<Genre>>>> {
    let genres = preferences::genres_of(state.store.as_ref(), viewer.profile_id)?;
    Ok(Json(ApiResponse::ok(genres)))
}

// --- POST /me/genres/:id ---

pub async fn add_genre(
    viewer: Viewer,
    State(state): State<Arc<AppState>>,
    Path(genre_id): Path<i64>,
) -> AppResult<(StatusCode, Json<ApiResponse<ProfileGenre>>)> {
    let edge = preferences::add_genre(state.store.as_ref(), viewer.profile_id, genre_id, state.limits())?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(edge))))
}

// --- DELETE /me/genres/:id ---

pub async fn remove_genre(
    viewer: Viewer,
    State(state): State<Arc<AppState>>,
    Path(genre_id): Path<i64>,
) -> AppResult<StatusCode> {
    preferences::remove_genre(state.store.as_ref(), viewer.profile_id, genre_id)?;
    Ok(StatusCode::NO_CONTENT)
}

// --- GET /me/songs ---

pub async fn my_songs(
    viewer: Viewer,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<Vec<FavoriteSong>>>> {
    let songs = preferences::songs_of(state.store.as_ref(), viewer.profile_id)?;
    Ok(Json(ApiResponse::ok(songs)))
}

// --- POST /me/songs/:id ---

pub async fn add_song(
    viewer: Viewer,
    State(state): State<Arc<AppState>>,
    Path(song_id): Path<i64>,
) -> AppResult<(StatusCode, Json<ApiResponse<ProfileSong>>)> {
    let edge = preferences::add_song(state.store.as_ref(), viewer.profile_id, song_id, state.limits())?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(edge))))
}

// --- DELETE /me/songs/:id ---

pub async fn remove_song(
    viewer: Viewer,
    State(state): State<Arc<AppState>>,
    Path(song_id): Path<i64>,
) -> AppResult<StatusCode> {
    preferences::remove_song(state.store.as_ref(), viewer.profile_id, song_id)?;
    Ok(StatusCode::NO_CONTENT)
}
