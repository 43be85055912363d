//! Round-robin candidate scan with exclusion and lazy wraparound.
//!
//! Candidates are profiles in ascending id order. The scan starts after the
//! caller's cursor; when nothing is left past it, it restarts from the lowest
//! id once before reporting `NoMoreCandidates`.

use serde::{Deserialize, Serialize};

use tunematch_shared::errors::{AppError, AppResult, ErrorCode};

use crate::models::{MatchStatus, Profile};
use crate::store::{MatchRepo, PreferenceRepo, ProfileRepo, ShownRepo, Store};

/// Id of the last profile shown to (or passed by) a viewer. `0` means the
/// scan starts from the beginning.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwipeCursor {
    pub last_viewed_id: i64,
}

impl SwipeCursor {
    pub const START: SwipeCursor = SwipeCursor { last_viewed_id: 0 };

    pub fn new(last_viewed_id: i64) -> Self {
        Self { last_viewed_id }
    }
}

/// Which match rows remove a profile from the viewer's candidates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExclusionPolicy {
    /// Any row with the viewer, whatever its status or direction.
    #[default]
    AnyMatch,
    /// Accepted rows, plus likes the viewer has sent that are still pending.
    /// Someone who liked the viewer stays visible so the like can be returned.
    Decided,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct CandidateOptions {
    #[serde(default)]
    pub exclusion: ExclusionPolicy,
    /// Only offer profiles sharing at least one preferred genre with the viewer.
    #[serde(default)]
    pub require_genre_overlap: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct Candidate {
    pub profile: Profile,
    /// The caller's cursor after this candidate was presented.
    pub cursor: SwipeCursor,
}

fn excluded_ids(store: &dyn Store, viewer_id: i64, policy: ExclusionPolicy) -> AppResult<Vec<i64>> {
    let mut exclude: Vec<i64> = store
        .matches_involving(viewer_id)?
        .into_iter()
        .filter(|m| match policy {
            ExclusionPolicy::AnyMatch => true,
            ExclusionPolicy::Decided => {
                m.status == MatchStatus::Accepted
                    || (m.status == MatchStatus::Pending && m.sender_id == viewer_id)
            }
        })
        .map(|m| m.counterpart(viewer_id))
        .collect();
    exclude.push(viewer_id);
    exclude.sort_unstable();
    exclude.dedup();
    Ok(exclude)
}

fn no_more_candidates() -> AppError {
    metrics::counter!("tunematch_candidates_total", "result" => "exhausted").increment(1);
    AppError::new(ErrorCode::NoMoreCandidates, "no more profiles to show")
}

/// Present the next candidate for `viewer_id` and log it as shown.
///
/// On `NoMoreCandidates` the caller keeps its cursor as it was.
pub fn next_candidate(
    store: &dyn Store,
    viewer_id: i64,
    cursor: SwipeCursor,
    options: CandidateOptions,
) -> AppResult<Candidate> {
    if store.find_profile(viewer_id)?.is_none() {
        return Err(AppError::new(ErrorCode::ProfileNotFound, "viewer profile not found"));
    }

    let exclude = excluded_ids(store, viewer_id, options.exclusion)?;
    let genre_ids: Option<Vec<i64>> = if options.require_genre_overlap {
        let ids: Vec<i64> = store.profile_genres(viewer_id)?.into_iter().map(|g| g.id).collect();
        if ids.is_empty() {
            return Err(no_more_candidates());
        }
        Some(ids)
    } else {
        None
    };

    let mut result = "found";
    let mut found = store.first_profile_after(cursor.last_viewed_id, &exclude, genre_ids.as_deref())?;
    if found.is_none() && cursor.last_viewed_id > 0 {
        tracing::debug!(viewer_id, cursor = cursor.last_viewed_id, "candidate scan wrapped");
        result = "wrapped";
        found = store.first_profile_after(0, &exclude, genre_ids.as_deref())?;
    }

    let Some(profile) = found else {
        tracing::debug!(viewer_id, excluded = exclude.len(), "no candidates left");
        return Err(no_more_candidates());
    };

    store.record_shown(viewer_id, profile.id)?;
    metrics::counter!("tunematch_candidates_total", "result" => result).increment(1);

    let cursor = SwipeCursor::new(profile.id);
    Ok(Candidate { profile, cursor })
}

/// Skip `profile_id` without writing anything.
pub fn pass(cursor: SwipeCursor, profile_id: i64) -> SwipeCursor {
    tracing::debug!(from = cursor.last_viewed_id, to = profile_id, "candidate passed");
    SwipeCursor::new(profile_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::record_like;
    use crate::models::NewProfile;
    use crate::store::{CatalogRepo, MemoryStore};

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

    fn next_id(store: &MemoryStore, viewer: i64, cursor: SwipeCursor, options: CandidateOptions) -> AppResult<i64> {
        next_candidate(store, viewer, cursor, options).map(|c| c.profile.id)
    }

    #[test]
    fn scans_in_id_order_and_wraps() {
        let (store, ids) = store_with(4);
        let viewer = ids[0];
        let options = CandidateOptions::default();

        let mut cursor = SwipeCursor::START;
        let mut seen = Vec::new();
        for _ in 0..4 {
            let candidate = next_candidate(&store, viewer, cursor, options).unwrap();
            seen.push(candidate.profile.id);
            cursor = candidate.cursor;
        }
        assert_eq!(seen, [ids[1], ids[2], ids[3], ids[1]]);
    }

    #[test]
    fn any_match_excludes_every_status() {
        let (store, ids) = store_with(4);
        let viewer = ids[0];
        record_like(&store, viewer, ids[1]).unwrap();
        record_like(&store, ids[2], viewer).unwrap();

        let got = next_id(&store, viewer, SwipeCursor::START, CandidateOptions::default()).unwrap();
        assert_eq!(got, ids[3]);

        let row = store.find_match_between(viewer, ids[3]).unwrap();
        assert!(row.is_none());
        let rejected = store.insert_pending_match(ids[3], viewer).unwrap();
        store.update_match_status(rejected.id, MatchStatus::Rejected).unwrap();
        let err = next_candidate(&store, viewer, SwipeCursor::new(ids[3]), CandidateOptions::default()).unwrap_err();
        assert!(err.is(ErrorCode::NoMoreCandidates));
    }

    #[test]
    fn decided_policy_keeps_incoming_likes_visible() {
        let (store, ids) = store_with(5);
        let viewer = ids[0];
        record_like(&store, viewer, ids[1]).unwrap(); // outgoing pending
        record_like(&store, ids[2], viewer).unwrap(); // incoming pending
        record_like(&store, ids[3], viewer).unwrap();
        record_like(&store, viewer, ids[3]).unwrap(); // accepted
        let rejected = store.insert_pending_match(viewer, ids[4]).unwrap();
        store.update_match_status(rejected.id, MatchStatus::Rejected).unwrap();

        let options = CandidateOptions { exclusion: ExclusionPolicy::Decided, ..Default::default() };
        let first = next_candidate(&store, viewer, SwipeCursor::START, options).unwrap();
        assert_eq!(first.profile.id, ids[2]);
        let second = next_candidate(&store, viewer, first.cursor, options).unwrap();
        assert_eq!(second.profile.id, ids[4]);
    }

    #[test]
    fn genre_overlap_filters_candidates() {
        let store = MemoryStore::new();
        let rock = store.upsert_genre("Rock").unwrap().id;
        let jazz = store.upsert_genre("Jazz").unwrap().id;
        let viewer = store.insert_profile(&NewProfile::new("viewer", "v@example.com"), &[rock], &[]).unwrap().id;
        store.insert_profile(&NewProfile::new("jazzy", "j@example.com"), &[jazz], &[]).unwrap();
        let rocker = store.insert_profile(&NewProfile::new("rocker", "r@example.com"), &[jazz, rock], &[]).unwrap().id;
        let loner = store.insert_profile(&NewProfile::new("loner", "l@example.com"), &[], &[]).unwrap().id;

        let options = CandidateOptions { require_genre_overlap: true, ..Default::default() };
        assert_eq!(next_id(&store, viewer, SwipeCursor::START, options).unwrap(), rocker);

        // No preferred genres means nobody overlaps.
        let err = next_candidate(&store, loner, SwipeCursor::START, options).unwrap_err();
        assert!(err.is(ErrorCode::NoMoreCandidates));
    }

    #[test]
    fn exhausted_until_a_new_profile_appears() {
        let (store, ids) = store_with(2);
        let viewer = ids[0];
        record_like(&store, viewer, ids[1]).unwrap();

        let cursor = SwipeCursor::new(ids[1]);
        for _ in 0..2 {
            let err = next_candidate(&store, viewer, cursor, CandidateOptions::default()).unwrap_err();
            assert!(err.is(ErrorCode::NoMoreCandidates));
        }

        let newcomer = store.insert_profile(&NewProfile::new("newcomer", "n@example.com"), &[], &[]).unwrap().id;
        assert_eq!(next_id(&store, viewer, cursor, CandidateOptions::default()).unwrap(), newcomer);
    }

    #[test]
    fn presented_candidates_are_logged_once() {
        let (store, ids) = store_with(2);
        let viewer = ids[0];
        for _ in 0..3 {
            next_candidate(&store, viewer, SwipeCursor::START, CandidateOptions::default()).unwrap();
        }
        let shown = store.shown_profiles(viewer).unwrap();
        assert_eq!(shown.len(), 1);
        assert_eq!(shown[0].shown_id, ids[1]);
    }

    #[test]
    fn pass_advances_without_writing() {
        let (store, ids) = store_with(3);
        let viewer = ids[0];
        let cursor = pass(SwipeCursor::START, ids[1]);
        assert_eq!(cursor, SwipeCursor::new(ids[1]));
        assert!(store.matches_involving(viewer).unwrap().is_empty());
        assert!(store.shown_profiles(viewer).unwrap().is_empty());
        assert_eq!(next_id(&store, viewer, cursor, CandidateOptions::default()).unwrap(), ids[2]);
    }

    #[test]
    fn unknown_viewer_is_rejected() {
        let (store, _) = store_with(2);
        let err = next_candidate(&store, 77, SwipeCursor::START, CandidateOptions::default()).unwrap_err();
        assert!(err.is(ErrorCode::ProfileNotFound));
    }
}
