//! Directional likes and the mutual-match status derived from them.
//!
//! A pair of profiles owns at most one `Match` row. The first like creates it
//! as pending with the liker as sender. A like from the receiver accepts the
//! row whatever its current status; a repeat from the sender changes nothing.

use serde::Serialize;

use tunematch_shared::errors::{AppError, AppResult, ErrorCode};

use crate::models::{Match, MatchStatus};
use crate::profiles::ensure_profile;
use crate::store::{MatchRepo, Store};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", content = "match", rename_all = "snake_case")]
pub enum LikeOutcome {
    /// A new pending row was written.
    Liked(Match),
    /// The stored row was sent by the other party; it is now accepted.
    MutualMatch(Match),
    /// Nothing changed.
    AlreadyLiked(Match),
}

impl LikeOutcome {
    pub fn record(&self) -> &Match {
        match self {
            LikeOutcome::Liked(m) | LikeOutcome::MutualMatch(m) | LikeOutcome::AlreadyLiked(m) => m,
        }
    }

    pub fn into_record(self) -> Match {
        match self {
            LikeOutcome::Liked(m) | LikeOutcome::MutualMatch(m) | LikeOutcome::AlreadyLiked(m) => m,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            LikeOutcome::Liked(_) => "liked",
            LikeOutcome::MutualMatch(_) => "mutual_match",
            LikeOutcome::AlreadyLiked(_) => "already_liked",
        }
    }

    /// Notification text shown to the sender.
    pub fn message(&self) -> &'static str {
        match self {
            LikeOutcome::Liked(_) => "Like sent.",
            LikeOutcome::MutualMatch(_) => "It's a match! You both like each other.",
            LikeOutcome::AlreadyLiked(_) => "You have already liked this profile.",
        }
    }
}

/// Decide what a like from `sender_id` does to the existing row for the pair.
fn apply_to_existing(store: &dyn Store, existing: Match, sender_id: i64) -> AppResult<LikeOutcome> {
    if existing.sender_id == sender_id {
        return Ok(LikeOutcome::AlreadyLiked(existing));
    }
    if existing.status == MatchStatus::Accepted {
        return Ok(LikeOutcome::MutualMatch(existing));
    }

    let accepted = store.update_match_status(existing.id, MatchStatus::Accepted)?;
    tracing::info!(
        match_id = accepted.id,
        sender_id = accepted.sender_id,
        receiver_id = accepted.receiver_id,
        "match accepted"
    );
    Ok(LikeOutcome::MutualMatch(accepted))
}

/// Insert a pending row for a pair that had none at lookup time. A `Conflict`
/// means a concurrent like for the same pair won the insert; the row it wrote
/// is read back once and handled like any existing row.
fn insert_or_resolve(store: &dyn Store, sender_id: i64, receiver_id: i64) -> AppResult<LikeOutcome> {
    match store.insert_pending_match(sender_id, receiver_id) {
        Ok(created) => {
            tracing::debug!(match_id = created.id, sender_id, receiver_id, "like recorded");
            Ok(LikeOutcome::Liked(created))
        }
        Err(err) if err.is(ErrorCode::Conflict) => {
            let existing = store.find_match_between(sender_id, receiver_id)?.ok_or(err)?;
            apply_to_existing(store, existing, sender_id)
        }
        Err(err) => Err(err),
    }
}

pub fn record_like(store: &dyn Store, sender_id: i64, receiver_id: i64) -> AppResult<LikeOutcome> {
    if sender_id == receiver_id {
        return Err(AppError::new(ErrorCode::CannotLikeSelf, "a profile cannot like itself"));
    }
    ensure_profile(store, sender_id)?;
    ensure_profile(store, receiver_id)?;

    let outcome = match store.find_match_between(sender_id, receiver_id)? {
        Some(existing) => apply_to_existing(store, existing, sender_id)?,
        None => insert_or_resolve(store, sender_id, receiver_id)?,
    };

    metrics::counter!("tunematch_likes_total", "outcome" => outcome.label()).increment(1);
    Ok(outcome)
}

/// Accepted rows involving `profile_id`, newest first.
pub fn list_mutual_matches(store: &dyn Store, profile_id: i64) -> AppResult<Vec<Match>> {
    ensure_profile(store, profile_id)?;
    let mut accepted: Vec<Match> = store
        .matches_involving(profile_id)?
        .into_iter()
        .filter(|m| m.status == MatchStatus::Accepted)
        .collect();
    accepted.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
    Ok(accepted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewProfile;
    use crate::store::{MatchRepo, MemoryStore, ProfileRepo};

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

    #[test]
    fn first_like_creates_pending_row() {
        let (store, ids) = store_with(2);
        let outcome = record_like(&store, ids[0], ids[1]).unwrap();
        let LikeOutcome::Liked(row) = outcome else {
            panic!("expected a new pending like");
        };
        assert_eq!(row.status, MatchStatus::Pending);
        assert_eq!((row.sender_id, row.receiver_id), (ids[0], ids[1]));
    }

    #[test]
    fn like_back_accepts_the_existing_row() {
        let (store, ids) = store_with(2);
        let first = record_like(&store, ids[0], ids[1]).unwrap().into_record();
        let outcome = record_like(&store, ids[1], ids[0]).unwrap();

        assert_eq!(outcome.label(), "mutual_match");
        let row = outcome.into_record();
        assert_eq!(row.id, first.id);
        assert_eq!(row.status, MatchStatus::Accepted);
        assert_eq!(store.matches_involving(ids[0]).unwrap().len(), 1);
    }

    #[test]
    fn repeated_like_from_the_sender_changes_nothing() {
        let (store, ids) = store_with(2);
        record_like(&store, ids[0], ids[1]).unwrap();
        let outcome = record_like(&store, ids[0], ids[1]).unwrap();
        assert!(matches!(outcome, LikeOutcome::AlreadyLiked(ref m) if m.status == MatchStatus::Pending));

        record_like(&store, ids[1], ids[0]).unwrap();
        let outcome = record_like(&store, ids[0], ids[1]).unwrap();
        assert!(matches!(outcome, LikeOutcome::AlreadyLiked(ref m) if m.status == MatchStatus::Accepted));
    }

    #[test]
    fn receiver_liking_an_accepted_row_is_still_a_match() {
        let (store, ids) = store_with(2);
        let first = record_like(&store, ids[0], ids[1]).unwrap().into_record();
        record_like(&store, ids[1], ids[0]).unwrap();

        let outcome = record_like(&store, ids[1], ids[0]).unwrap();
        assert_eq!(outcome.label(), "mutual_match");
        let row = outcome.into_record();
        assert_eq!(row.id, first.id);
        assert_eq!(row.status, MatchStatus::Accepted);
    }

    #[test]
    fn rejected_row_is_accepted_when_the_receiver_likes_back() {
        let (store, ids) = store_with(2);
        let row = store.insert_pending_match(ids[0], ids[1]).unwrap();
        store.update_match_status(row.id, MatchStatus::Rejected).unwrap();

        let repeat = record_like(&store, ids[0], ids[1]).unwrap();
        assert!(matches!(repeat, LikeOutcome::AlreadyLiked(ref m) if m.status == MatchStatus::Rejected));

        let outcome = record_like(&store, ids[1], ids[0]).unwrap();
        assert!(matches!(outcome, LikeOutcome::MutualMatch(ref m) if m.id == row.id && m.status == MatchStatus::Accepted));
        assert_eq!(list_mutual_matches(&store, ids[0]).unwrap().len(), 1);
    }

    #[test]
    fn invalid_likes_are_rejected() {
        let (store, ids) = store_with(1);
        assert!(record_like(&store, ids[0], ids[0]).unwrap_err().is(ErrorCode::CannotLikeSelf));
        assert!(record_like(&store, ids[0], 42).unwrap_err().is(ErrorCode::ProfileNotFound));
        assert!(record_like(&store, 42, ids[0]).unwrap_err().is(ErrorCode::ProfileNotFound));
        assert!(store.matches_involving(ids[0]).unwrap().is_empty());
    }

    #[test]
    fn outcomes_have_distinct_messages() {
        let (store, ids) = store_with(2);
        let liked = record_like(&store, ids[0], ids[1]).unwrap();
        let repeat = record_like(&store, ids[0], ids[1]).unwrap();
        let mutual = record_like(&store, ids[1], ids[0]).unwrap();
        assert_ne!(liked.message(), repeat.message());
        assert_ne!(liked.message(), mutual.message());
        assert_ne!(repeat.message(), mutual.message());
    }

    #[test]
    fn mutual_matches_only_lists_accepted_rows_newest_first() {
        let (store, ids) = store_with(4);
        record_like(&store, ids[0], ids[1]).unwrap();
        record_like(&store, ids[1], ids[0]).unwrap();
        record_like(&store, ids[2], ids[0]).unwrap();
        record_like(&store, ids[0], ids[2]).unwrap();
        record_like(&store, ids[0], ids[3]).unwrap();

        let matches = list_mutual_matches(&store, ids[0]).unwrap();
        assert_eq!(matches.len(), 2);
        assert!(matches.iter().all(|m| m.status == MatchStatus::Accepted && m.involves(ids[0])));
        assert!(matches[0].created_at >= matches[1].created_at);
        if matches[0].created_at == matches[1].created_at {
            assert!(matches[0].id > matches[1].id);
        }

        assert!(list_mutual_matches(&store, ids[3]).unwrap().is_empty());
        assert!(list_mutual_matches(&store, 99).unwrap_err().is(ErrorCode::ProfileNotFound));
    }

    #[test]
    fn lost_insert_race_rereads_the_winning_row() {
        let (store, ids) = store_with(2);
        // The rival like lands between our lookup and our insert.
        store.insert_pending_match(ids[1], ids[0]).unwrap();

        let outcome = insert_or_resolve(&store, ids[0], ids[1]).unwrap();
        assert_eq!(outcome.label(), "mutual_match");
        assert_eq!(store.matches_involving(ids[0]).unwrap().len(), 1);

        let repeat = insert_or_resolve(&store, ids[1], ids[0]).unwrap();
        assert_eq!(repeat.label(), "already_liked");
    }
}
