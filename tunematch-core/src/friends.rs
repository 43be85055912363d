//! Undirected friendships and the status feed built on top of them.

use validator::Validate;

use tunematch_shared::errors::{AppError, AppResult, ErrorCode};

use crate::models::{NewStatusMessage, Profile, StatusMessage};
use crate::profiles::ensure_profile;
use crate::store::{ProfileRepo, SocialRepo, Store};

/// Returns `false` without writing when `a == b` or the pair is already
/// friends in either order.
pub fn add_friend(store: &dyn Store, a: i64, b: i64) -> AppResult<bool> {
    if a == b {
        return Ok(false);
    }
    ensure_profile(store, a)?;
    ensure_profile(store, b)?;

    let added = store.insert_friend(a, b)?;
    if added {
        tracing::info!(profile_id = a, friend_id = b, "friend added");
    }
    Ok(added)
}

pub fn friends_of(store: &dyn Store, profile_id: i64) -> AppResult<Vec<Profile>> {
    ensure_profile(store, profile_id)?;
    let ids = store.friend_ids(profile_id)?;
    store.find_profiles(&ids)
}

/// Everyone who is neither `profile_id` nor already a friend, ordered by id.
pub fn suggestions_for(store: &dyn Store, profile_id: i64) -> AppResult<Vec<Profile>> {
    ensure_profile(store, profile_id)?;
    let mut exclude = store.friend_ids(profile_id)?;
    exclude.push(profile_id);
    store.list_profiles_excluding(&exclude)
}

/// Statuses of the profile and its friends, newest first.
pub fn news_feed_for(store: &dyn Store, profile_id: i64) -> AppResult<Vec<StatusMessage>> {
    ensure_profile(store, profile_id)?;
    let mut authors = store.friend_ids(profile_id)?;
    authors.push(profile_id);
    store.statuses_for(&authors)
}

pub fn post_status(
    store: &dyn Store,
    profile_id: i64,
    message: &str,
    image_urls: Vec<String>,
) -> AppResult<StatusMessage> {
    let new = NewStatusMessage {
        profile_id,
        message: message.trim().to_string(),
        image_urls,
    };
    new.validate()?;
    ensure_profile(store, profile_id)?;

    let status = store.insert_status(&new)?;
    tracing::info!(status_id = status.id, profile_id, "status posted");
    Ok(status)
}

pub fn statuses_of(store: &dyn Store, profile_id: i64) -> AppResult<Vec<StatusMessage>> {
    ensure_profile(store, profile_id)?;
    store.statuses_for(&[profile_id])
}

/// Only the author may delete a status.
pub fn delete_status(store: &dyn Store, profile_id: i64, status_id: i64) -> AppResult<()> {
    let status = store
        .find_status(status_id)?
        .ok_or_else(|| AppError::new(ErrorCode::StatusNotFound, "status not found"))?;
    if status.profile_id != profile_id {
        return Err(AppError::forbidden("only the author can delete this status"));
    }
    store.delete_status(status_id)?;
    tracing::info!(status_id, profile_id, "status deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewProfile;
    use crate::store::MemoryStore;

    fn store_with(n: usize) -> (MemoryStore, Vec<i64>) {
        let store = MemoryStore::new();
        let ids = (0..n)
            .map(|i| {
                store
                    .insert_profile(&NewProfile::new(format!("user{i}"), format!("u{i}@example.com")), &[], &[])
                    .unwrap()
                    .id
            })
            .collect();
        (store, ids)
    }

    fn ids_of(profiles: Vec<Profile>) -> Vec<i64> {
        profiles.into_iter().map(|p| p.id).collect()
    }

    #[test]
    fn friendship_is_symmetric_and_unique() {
        let (store, ids) = store_with(3);
        assert!(add_friend(&store, ids[0], ids[1]).unwrap());
        assert!(!add_friend(&store, ids[0], ids[1]).unwrap());
        assert!(!add_friend(&store, ids[1], ids[0]).unwrap());
        assert!(!add_friend(&store, ids[2], ids[2]).unwrap());

        assert_eq!(ids_of(friends_of(&store, ids[0]).unwrap()), [ids[1]]);
        assert_eq!(ids_of(friends_of(&store, ids[1]).unwrap()), [ids[0]]);
        assert!(friends_of(&store, ids[2]).unwrap().is_empty());
    }

    #[test]
    fn unknown_profiles_cannot_be_friended() {
        let (store, ids) = store_with(1);
        let err = add_friend(&store, ids[0], 50).unwrap_err();
        assert!(err.is(ErrorCode::ProfileNotFound));
        assert!(store.friend_ids(ids[0]).unwrap().is_empty());
    }

    #[test]
    fn suggestions_skip_self_and_friends() {
        let (store, ids) = store_with(4);
        add_friend(&store, ids[2], ids[0]).unwrap();
        assert_eq!(ids_of(suggestions_for(&store, ids[0]).unwrap()), [ids[1], ids[3]]);
    }

    #[test]
    fn feed_holds_own_and_friend_statuses_newest_first() {
        let (store, ids) = store_with(3);
        add_friend(&store, ids[0], ids[1]).unwrap();
        let mine = post_status(&store, ids[0], "first", vec![]).unwrap();
        let theirs = post_status(&store, ids[1], "second", vec![]).unwrap();
        post_status(&store, ids[2], "stranger", vec![]).unwrap();

        let feed: Vec<i64> = news_feed_for(&store, ids[0]).unwrap().into_iter().map(|s| s.id).collect();
        assert_eq!(feed, [theirs.id, mine.id]);
        assert_eq!(statuses_of(&store, ids[2]).unwrap().len(), 1);
    }

    #[test]
    fn blank_status_is_rejected() {
        let (store, ids) = store_with(1);
        let err = post_status(&store, ids[0], "   ", vec![]).unwrap_err();
        assert!(err.is(ErrorCode::ValidationError));
    }

    #[test]
    fn only_the_author_deletes_a_status() {
        let (store, ids) = store_with(2);
        let status = post_status(&store, ids[0], "hello", vec!["https://img.example.com/1.png".into()]).unwrap();

        let err = delete_status(&store, ids[1], status.id).unwrap_err();
        assert!(err.is(ErrorCode::Forbidden));
        delete_status(&store, ids[0], status.id).unwrap();
        let err = delete_status(&store, ids[0], status.id).unwrap_err();
        assert!(err.is(ErrorCode::StatusNotFound));
    }
}
