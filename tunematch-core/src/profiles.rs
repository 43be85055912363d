use validator::Validate;

use tunematch_shared::errors::{AppError, AppResult, ErrorCode};
use tunematch_shared::types::{Paginated, PaginationParams};

use crate::models::{NewProfile, Profile, ProfileDetail, UpdateProfile};
use crate::preferences::{check_preference_set, PreferenceLimits};
use crate::store::{PreferenceRepo, ProfileRepo, Store};

/// Replacement preference set passed alongside a profile update.
#[derive(Debug, Clone, Default)]
pub struct PreferenceSet {
    pub genre_ids: Vec<i64>,
    pub song_ids: Vec<i64>,
}

pub fn create_profile(
    store: &dyn Store,
    new: NewProfile,
    genre_ids: &[i64],
    song_ids: &[i64],
    limits: PreferenceLimits,
) -> AppResult<Profile> {
    new.validate()?;
    check_preference_set(store, genre_ids, song_ids, limits)?;

    let profile = store.insert_profile(&new, genre_ids, song_ids)?;

    tracing::info!(
        profile_id = profile.id,
        username = %profile.username,
        genres = genre_ids.len(),
        songs = song_ids.len(),
        "profile created"
    );

    Ok(profile)
}

pub fn get_profile(store: &dyn Store, id: i64) -> AppResult<Profile> {
    store.find_profile(id)?.ok_or_else(|| profile_not_found(id))
}

/// `ProfileNotFound` unless a profile with `id` exists.
pub(crate) fn ensure_profile(store: &dyn Store, id: i64) -> AppResult<()> {
    get_profile(store, id).map(|_| ())
}

fn profile_not_found(id: i64) -> AppError {
    AppError::with_details(ErrorCode::ProfileNotFound, "profile not found", serde_json::json!({ "id": id }))
}

pub fn profile_detail(store: &dyn Store, id: i64) -> AppResult<ProfileDetail> {
    let profile = get_profile(store, id)?;
    let genres = store.profile_genres(id)?;
    let songs = store.profile_songs(id)?;
    Ok(ProfileDetail { profile, genres, songs })
}

pub fn list_profiles(store: &dyn Store, params: &PaginationParams) -> AppResult<Paginated<Profile>> {
    let (items, total) = store.list_profiles(params.offset(), params.limit())?;
    Ok(Paginated::new(items, total, params))
}

pub fn update_profile(
    store: &dyn Store,
    id: i64,
    changes: UpdateProfile,
    preferences: Option<PreferenceSet>,
    limits: PreferenceLimits,
) -> AppResult<Profile> {
    changes.validate()?;
    if let Some(set) = &preferences {
        check_preference_set(store, &set.genre_ids, &set.song_ids, limits)?;
    }

    let replacement = preferences
        .as_ref()
        .map(|set| (set.genre_ids.as_slice(), set.song_ids.as_slice()));
    let profile = store
        .update_profile(id, &changes, replacement)?
        .ok_or_else(|| profile_not_found(id))?;

    tracing::info!(
        profile_id = id,
        preferences_replaced = preferences.is_some(),
        "profile updated"
    );

    Ok(profile)
}

pub fn delete_profile(store: &dyn Store, id: i64) -> AppResult<()> {
    if !store.delete_profile(id)? {
        return Err(profile_not_found(id));
    }
    tracing::info!(profile_id = id, "profile deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{CatalogRepo, MemoryStore};

    fn limits() -> PreferenceLimits {
        PreferenceLimits::default()
    }

    #[test]
    fn create_with_preferences_and_read_detail() {
        let store = MemoryStore::new();
        let rock = store.upsert_genre("Rock").unwrap();
        let jazz = store.upsert_genre("Jazz").unwrap();

        let profile = create_profile(
            &store,
            NewProfile::new("ada", "ada@example.com"),
            &[rock.id, jazz.id],
            &[],
            limits(),
        )
        .unwrap();

        let detail = profile_detail(&store, profile.id).unwrap();
        let names: Vec<&str> = detail.genres.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, ["Jazz", "Rock"]);
        assert!(detail.songs.is_empty());
    }

    #[test]
    fn create_rejects_over_cap_without_writing() {
        let store = MemoryStore::new();
        let ids: Vec<i64> = ["Rock", "Jazz", "Pop"]
            .iter()
            .map(|g| store.upsert_genre(g).unwrap().id)
            .collect();

        let err = create_profile(&store, NewProfile::new("ada", "ada@example.com"), &ids, &[], limits())
            .unwrap_err();
        assert!(err.is(ErrorCode::PreferenceLimitExceeded));
        assert_eq!(store.list_profiles(0, 10).unwrap().1, 0);
    }

    #[test]
    fn create_validates_input() {
        let store = MemoryStore::new();
        let err = create_profile(&store, NewProfile::new("ad", "not-an-email"), &[], &[], limits())
            .unwrap_err();
        assert!(err.is(ErrorCode::ValidationError));
    }

    #[test]
    fn list_is_paginated_by_id() {
        let store = MemoryStore::new();
        for i in 0..8 {
            create_profile(&store, NewProfile::new(format!("user{i}"), format!("u{i}@example.com")), &[], &[], limits())
                .unwrap();
        }
        let first = list_profiles(&store, &PaginationParams::default()).unwrap();
        assert_eq!(first.items.len(), 6);
        assert_eq!(first.total, 8);
        assert_eq!(first.total_pages, 2);
        let second = list_profiles(&store, &PaginationParams::new(2, 6)).unwrap();
        assert_eq!(second.items.len(), 2);
        assert!(first.items[5].id < second.items[0].id);
    }

    #[test]
    fn update_replaces_preferences_atomically() {
        let store = MemoryStore::new();
        let rock = store.upsert_genre("Rock").unwrap();
        let jazz = store.upsert_genre("Jazz").unwrap();
        let profile = create_profile(&store, NewProfile::new("ada", "ada@example.com"), &[rock.id], &[], limits())
            .unwrap();

        let changes = UpdateProfile { city: Some("Lyon".into()), ..Default::default() };
        let set = PreferenceSet { genre_ids: vec![jazz.id], song_ids: vec![] };
        let updated = update_profile(&store, profile.id, changes, Some(set), limits()).unwrap();
        assert_eq!(updated.city.as_deref(), Some("Lyon"));

        let genres = store.profile_genres(profile.id).unwrap();
        assert_eq!(genres, vec![jazz]);

        // A rejected replacement leaves the old edges alone.
        let bad = PreferenceSet { genre_ids: vec![rock.id, 404], song_ids: vec![] };
        let err = update_profile(&store, profile.id, UpdateProfile::default(), Some(bad), limits()).unwrap_err();
        assert!(err.is(ErrorCode::GenreNotFound));
        assert_eq!(store.profile_genres(profile.id).unwrap().len(), 1);
    }

    #[test]
    fn missing_profiles_are_reported() {
        let store = MemoryStore::new();
        assert!(get_profile(&store, 1).unwrap_err().is(ErrorCode::ProfileNotFound));
        assert!(delete_profile(&store, 1).unwrap_err().is(ErrorCode::ProfileNotFound));
        let err = update_profile(&store, 1, UpdateProfile::default(), None, limits()).unwrap_err();
        assert!(err.is(ErrorCode::ProfileNotFound));
    }
}
