use validator::Validate;

use tunematch_shared::errors::{AppError, AppResult, ErrorCode};
use tunematch_shared::types::{Paginated, PaginationParams};

use crate::models::{Genre, GenreOption, NewSong, Song, SongDetail, SongQuery};
use crate::store::{CatalogRepo, Store};

const MAX_GENRE_NAME: usize = 100;

/// Get-or-create a genre by its trimmed name.
pub fn create_genre(store: &dyn Store, name: &str) -> AppResult<Genre> {
    let name = name.trim();
    if name.is_empty() || name.chars().count() > MAX_GENRE_NAME {
        return Err(AppError::Validation(format!(
            "genre name must be between 1 and {MAX_GENRE_NAME} characters"
        )));
    }
    let genre = store.upsert_genre(name)?;
    tracing::debug!(genre_id = genre.id, name = %genre.name, "genre ready");
    Ok(genre)
}

/// Genres as a select-style option list, ordered by name.
pub fn genre_options(store: &dyn Store) -> AppResult<Vec<GenreOption>> {
    Ok(store
        .list_genres()?
        .into_iter()
        .map(|g| GenreOption { value: g.id, label: g.name })
        .collect())
}

pub fn create_song(store: &dyn Store, new: NewSong) -> AppResult<Song> {
    new.validate()?;
    if store.find_genre(new.genre_id)?.is_none() {
        return Err(AppError::new(ErrorCode::GenreNotFound, "genre not found"));
    }
    let song = store.insert_song(&new)?;
    tracing::info!(song_id = song.id, title = %song.title, artist = %song.artist, "song created");
    Ok(song)
}

pub fn song_detail(store: &dyn Store, id: i64) -> AppResult<SongDetail> {
    let song = store
        .find_song(id)?
        .ok_or_else(|| AppError::new(ErrorCode::SongNotFound, "song not found"))?;
    let genre = store
        .find_genre(song.genre_id)?
        .ok_or_else(|| AppError::internal(format!("song {id} references a missing genre")))?;
    let fans = store.song_fans(id)?;
    Ok(SongDetail { song, genre, fans })
}

pub fn search_songs(
    store: &dyn Store,
    query: &SongQuery,
    params: &PaginationParams,
) -> AppResult<Paginated<Song>> {
    if let (Some(from), Some(to)) = (query.year_from, query.year_to) {
        if from > to {
            return Err(AppError::bad_request("year_from must not be after year_to"));
        }
    }
    let (items, total) = store.search_songs(query, params.offset(), params.limit())?;
    Ok(Paginated::new(items, total, params))
}
