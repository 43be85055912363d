use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;

use tunematch_core::catalog;
use tunematch_core::models::{Genre, GenreOption, NewSong, Song, SongDetail, SongQuery};
use tunematch_shared::errors::AppResult;
use tunematch_shared::types::{ApiResponse, Paginated, PaginationParams};

use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateGenreRequest {
    pub name: String,
}

// --- GET /genres ---

pub async fn genre_options(
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<Vec<GenreOption>>>> {
    let options = catalog::genre_options(state.store.as_ref())?;
    Ok(Json(ApiResponse::ok(options)))
}

// --- POST /genres ---

pub async fn create_genre(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateGenreRequest>,
) -> AppResult<Json<ApiResponse<Genre>>> {
    let genre = catalog::create_genre(state.store.as_ref(), &req.name)?;
    Ok(Json(ApiResponse::ok(genre)))
}

// --- GET /songs?q=&genre_id=&year_from=&year_to=&page=&per_page= ---

pub async fn search_songs(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SongQuery>,
    Query(params): Query<PaginationParams>,
) -> AppResult<Json<ApiResponse<Paginated<Song>>>> {
    let page = catalog::search_songs(state.store.as_ref(), &query, &params)?;
    Ok(Json(ApiResponse::ok(page)))
}

// --- POST /songs ---

pub async fn create_song(
    State(state): State<Arc<AppState>>,
    Json(req): Json<NewSong>,
) -> AppResult<(StatusCode, Json<ApiResponse<Song>>)> {
    let song = catalog::create_song(state.store.as_ref(), req)?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(song))))
}

// --- GET /songs/:id ---

pub async fn song_detail(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<SongDetail>>> {
    let detail = catalog::song_detail(state.store.as_ref(), id)?;
    Ok(Json(ApiResponse::ok(detail)))
}
