use serde::Deserialize;

use tunematch_shared::errors::{AppError, AppResult, ErrorCode};

use crate::models::{FavoriteSong, Genre, ProfileGenre, ProfileSong};
use crate::profiles::ensure_profile;
use crate::store::{CatalogRepo, PreferenceRepo, Store};

pub const DEFAULT_MAX_GENRES: usize = 2;
pub const DEFAULT_MAX_SONGS: usize = 4;

/// Per-profile caps on preference edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct PreferenceLimits {
    pub max_genres: usize,
    pub max_songs: usize,
}

impl Default for PreferenceLimits {
    fn default() -> Self {
        Self {
            max_genres: DEFAULT_MAX_GENRES,
            max_songs: DEFAULT_MAX_SONGS,
        }
    }
}

fn limit_exceeded(kind: &str, limit: usize) -> AppError {
    let noun = if kind == "genre" { "preferred genres" } else { "favourite songs" };
    AppError::with_details(
        ErrorCode::PreferenceLimitExceeded,
        format!("a profile cannot have more than {limit} {noun}"),
        serde_json::json!({ "kind": kind, "limit": limit }),
    )
}

fn ensure_unique(ids: &[i64], kind: &str) -> AppResult<()> {
    for (i, id) in ids.iter().enumerate() {
        if ids[..i].contains(id) {
            return Err(AppError::with_details(
                ErrorCode::DuplicatePreference,
                format!("{kind} {id} is listed more than once"),
                serde_json::json!({ "kind": kind, "id": id }),
            ));
        }
    }
    Ok(())
}

/// Check a full preference set before it is written: caps, duplicates, and
/// that every referenced genre and song exists.
pub(crate) fn check_preference_set(
    store: &dyn Store,
    genre_ids: &[i64],
    song_ids: &[i64],
    limits: PreferenceLimits,
) -> AppResult<()> {
    if genre_ids.len() > limits.max_genres {
        return Err(limit_exceeded("genre", limits.max_genres));
    }
    if song_ids.len() > limits.max_songs {
        return Err(limit_exceeded("song", limits.max_songs));
    }
    ensure_unique(genre_ids, "genre")?;
    ensure_unique(song_ids, "song")?;

    for &genre_id in genre_ids {
        if store.find_genre(genre_id)?.is_none() {
            return Err(AppError::with_details(
                ErrorCode::GenreNotFound,
                "genre not found",
                serde_json::json!({ "id": genre_id }),
            ));
        }
    }
    let found = store.find_songs(song_ids)?;
    if let Some(missing) = song_ids.iter().find(|id| !found.iter().any(|s| s.id == **id)) {
        return Err(AppError::with_details(
            ErrorCode::SongNotFound,
            "song not found",
            serde_json::json!({ "id": missing }),
        ));
    }
    Ok(())
}

pub fn add_genre(
    store: &dyn Store,
    profile_id: i64,
    genre_id: i64,
    limits: PreferenceLimits,
) -> AppResult<ProfileGenre> {
    ensure_profile(store, profile_id)?;
    if store.find_genre(genre_id)?.is_none() {
        return Err(AppError::new(ErrorCode::GenreNotFound, "genre not found"));
    }
    let edge = store.add_profile_genre(profile_id, genre_id, limits.max_genres)?;
    tracing::debug!(profile_id, genre_id, "genre preference added");
    Ok(edge)
}

pub fn add_song(
    store: &dyn Store,
    profile_id: i64,
    song_id: i64,
    limits: PreferenceLimits,
) -> AppResult<ProfileSong> {
    ensure_profile(store, profile_id)?;
    if store.find_song(song_id)?.is_none() {
        return Err(AppError::new(ErrorCode::SongNotFound, "song not found"));
    }
    let edge = store.add_profile_song(profile_id, song_id, limits.max_songs)?;
    tracing::debug!(profile_id, song_id, "favourite song added");
    Ok(edge)
}

/// Fails with `NotFound` when the edge does not exist.
pub fn remove_genre(store: &dyn Store, profile_id: i64, genre_id: i64) -> AppResult<()> {
    if !store.remove_profile_genre(profile_id, genre_id)? {
        return Err(AppError::not_found("genre is not a preference of this profile"));
    }
    Ok(())
}

pub fn remove_song(store: &dyn Store, profile_id: i64, song_id: i64) -> AppResult<()> {
    if !store.remove_profile_song(profile_id, song_id)? {
        return Err(AppError::not_found("song is not a favourite of this profile"));
    }
    Ok(())
}

pub fn genres_of(store: &dyn Store, profile_id: i64) -> AppResult<Vec<Genre>> {
    ensure_profile(store, profile_id)?;
    store.profile_genres(profile_id)
}

pub fn songs_of(store: &dyn Store, profile_id: i64) -> AppResult<Vec<FavoriteSong>> {
    ensure_profile(store, profile_id)?;
    store.profile_songs(profile_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewProfile, NewSong};
    use crate::store::{MemoryStore, ProfileRepo};

    struct Fixture {
        store: MemoryStore,
        profile: i64,
        genres: Vec<i64>,
        songs: Vec<i64>,
    }

    fn fixture() -> Fixture {
        let store = MemoryStore::new();
        let profile = store
            .insert_profile(&NewProfile::new("ada", "ada@example.com"), &[], &[])
            .unwrap()
            .id;
        let genres: Vec<i64> = ["Rock", "Jazz", "Pop"]
            .iter()
            .map(|g| store.upsert_genre(g).unwrap().id)
            .collect();
        let songs = (0..5)
            .map(|i| {
                store
                    .insert_song(&NewSong {
                        title: format!("Song {i}"),
                        artist: "Band".into(),
                        genre_id: genres[0],
                        release_year: 2000 + i,
                        media_url: format!("https://example.com/{i}"),
                    })
                    .unwrap()
                    .id
            })
            .collect();
        Fixture { store, profile, genres, songs }
    }

    #[test]
    fn genre_cap_is_enforced() {
        let f = fixture();
        let limits = PreferenceLimits::default();
        add_genre(&f.store, f.profile, f.genres[0], limits).unwrap();
        add_genre(&f.store, f.profile, f.genres[1], limits).unwrap();
        let err = add_genre(&f.store, f.profile, f.genres[2], limits).unwrap_err();
        assert!(err.is(ErrorCode::PreferenceLimitExceeded));
        assert_eq!(genres_of(&f.store, f.profile).unwrap().len(), 2);
    }

    #[test]
    fn song_cap_and_duplicates() {
        let f = fixture();
        let limits = PreferenceLimits::default();
        for &song in &f.songs[..4] {
            add_song(&f.store, f.profile, song, limits).unwrap();
        }
        let err = add_song(&f.store, f.profile, f.songs[4], limits).unwrap_err();
        assert!(err.is(ErrorCode::PreferenceLimitExceeded));

        remove_song(&f.store, f.profile, f.songs[0]).unwrap();
        let err = add_song(&f.store, f.profile, f.songs[1], limits).unwrap_err();
        assert!(err.is(ErrorCode::DuplicatePreference));
        assert_eq!(songs_of(&f.store, f.profile).unwrap().len(), 3);
    }

    #[test]
    fn unknown_references_are_reported() {
        let f = fixture();
        let limits = PreferenceLimits::default();
        assert!(add_genre(&f.store, f.profile, 999, limits).unwrap_err().is(ErrorCode::GenreNotFound));
        assert!(add_song(&f.store, f.profile, 999, limits).unwrap_err().is(ErrorCode::SongNotFound));
        assert!(add_genre(&f.store, 999, f.genres[0], limits).unwrap_err().is(ErrorCode::ProfileNotFound));
        assert!(remove_genre(&f.store, f.profile, f.genres[0]).unwrap_err().is(ErrorCode::NotFound));
    }

    #[test]
    fn missing_profile_names_the_id() {
        let f = fixture();
        let err = songs_of(&f.store, 999).unwrap_err();
        let AppError::Known { code, details, .. } = err else {
            panic!("expected a known error");
        };
        assert_eq!(code, ErrorCode::ProfileNotFound);
        assert_eq!(details, Some(serde_json::json!({ "id": 999 })));
    }

    #[test]
    fn preference_set_checks_run_before_any_write() {
        let f = fixture();
        let limits = PreferenceLimits { max_genres: 1, max_songs: 4 };
        let err = check_preference_set(&f.store, &f.genres[..2], &[], limits).unwrap_err();
        assert!(err.is(ErrorCode::PreferenceLimitExceeded));
        let err = check_preference_set(&f.store, &[], &[f.songs[0], f.songs[0]], limits).unwrap_err();
        assert!(err.is(ErrorCode::DuplicatePreference));
        let err = check_preference_set(&f.store, &[], &[f.songs[0], 77], limits).unwrap_err();
        assert!(err.is(ErrorCode::SongNotFound));
        check_preference_set(&f.store, &f.genres[..1], &f.songs[..4], limits).unwrap();
    }
}
