//! Persistence seam for the engines.
//!
//! Every repository method is one atomic unit: implementations either apply
//! the whole write or none of it. Pair uniqueness for matches and friendships
//! is the store's responsibility, not the caller's.

mod memory;
mod pg;

pub use memory::MemoryStore;
pub use pg::PgStore;

use tunematch_shared::errors::AppResult;

use crate::models::{
    FavoriteSong, Genre, Match, MatchStatus, NewProfile, NewSong, NewStatusMessage, Profile,
    ProfileGenre, ProfileSong, ShownProfile, Song, SongQuery, StatusMessage, UpdateProfile,
};

pub trait ProfileRepo {
    /// Insert a profile together with its preference edges. The caller has
    /// already checked caps, duplicates and that the referenced genres and
    /// songs exist.
    fn insert_profile(&self, new: &NewProfile, genre_ids: &[i64], song_ids: &[i64]) -> AppResult<Profile>;

    fn find_profile(&self, id: i64) -> AppResult<Option<Profile>>;

    /// Profiles with the given ids, ordered by id. Unknown ids are skipped.
    fn find_profiles(&self, ids: &[i64]) -> AppResult<Vec<Profile>>;

    /// One page of profiles ordered by id, plus the total count.
    fn list_profiles(&self, offset: u64, limit: u64) -> AppResult<(Vec<Profile>, u64)>;

    /// Every profile whose id is not in `exclude`, ordered by id.
    fn list_profiles_excluding(&self, exclude: &[i64]) -> AppResult<Vec<Profile>>;

    /// Lowest-id profile with `id > after_id` that is not excluded and, when
    /// `genre_ids` is given, prefers at least one of those genres.
    fn first_profile_after(
        &self,
        after_id: i64,
        exclude: &[i64],
        genre_ids: Option<&[i64]>,
    ) -> AppResult<Option<Profile>>;

    /// Apply `changes` and, when given, replace the preference edges with
    /// `(genre_ids, song_ids)`. Returns `None` for an unknown profile.
    fn update_profile(
        &self,
        id: i64,
        changes: &UpdateProfile,
        preferences: Option<(&[i64], &[i64])>,
    ) -> AppResult<Option<Profile>>;

    /// Delete a profile and every row referencing it.
    fn delete_profile(&self, id: i64) -> AppResult<bool>;
}

pub trait CatalogRepo {
    /// Get-or-create by exact name.
    fn upsert_genre(&self, name: &str) -> AppResult<Genre>;
    fn find_genre(&self, id: i64) -> AppResult<Option<Genre>>;
    /// All genres ordered by name.
    fn list_genres(&self) -> AppResult<Vec<Genre>>;
    fn insert_song(&self, new: &NewSong) -> AppResult<Song>;
    fn find_song(&self, id: i64) -> AppResult<Option<Song>>;
    /// Songs with the given ids, ordered by id. Unknown ids are skipped.
    fn find_songs(&self, ids: &[i64]) -> AppResult<Vec<Song>>;
    /// Ordered by release year descending, then id.
    fn search_songs(&self, query: &SongQuery, offset: u64, limit: u64) -> AppResult<(Vec<Song>, u64)>;
    /// Profiles that list the song as a favourite, ordered by id.
    fn song_fans(&self, song_id: i64) -> AppResult<Vec<Profile>>;
}

pub trait PreferenceRepo {
    /// Fails with `PreferenceLimitExceeded` when the profile already holds
    /// `max_genres` edges and with `DuplicatePreference` when the edge exists.
    fn add_profile_genre(&self, profile_id: i64, genre_id: i64, max_genres: usize) -> AppResult<ProfileGenre>;
    fn add_profile_song(&self, profile_id: i64, song_id: i64, max_songs: usize) -> AppResult<ProfileSong>;
    fn remove_profile_genre(&self, profile_id: i64, genre_id: i64) -> AppResult<bool>;
    fn remove_profile_song(&self, profile_id: i64, song_id: i64) -> AppResult<bool>;
    /// Ordered by genre name.
    fn profile_genres(&self, profile_id: i64) -> AppResult<Vec<Genre>>;
    /// Ordered by the time the song was added.
    fn profile_songs(&self, profile_id: i64) -> AppResult<Vec<FavoriteSong>>;
}

pub trait MatchRepo {
    /// The row for the unordered pair `{a, b}`, whichever side sent it.
    fn find_match_between(&self, a: i64, b: i64) -> AppResult<Option<Match>>;
    /// Insert a pending row; fails with `Conflict` when the pair already has one.
    fn insert_pending_match(&self, sender_id: i64, receiver_id: i64) -> AppResult<Match>;
    fn update_match_status(&self, match_id: i64, status: MatchStatus) -> AppResult<Match>;
    fn matches_involving(&self, profile_id: i64) -> AppResult<Vec<Match>>;
}

pub trait ShownRepo {
    /// Idempotent per `(viewer, shown)` pair.
    fn record_shown(&self, viewer_id: i64, shown_id: i64) -> AppResult<()>;
    /// Most recent first.
    fn shown_profiles(&self, viewer_id: i64) -> AppResult<Vec<ShownProfile>>;
}

pub trait SocialRepo {
    /// Insert `(a, b)` unless the pair exists in either order. Returns
    /// whether a row was written.
    fn insert_friend(&self, a: i64, b: i64) -> AppResult<bool>;
    fn friend_ids(&self, profile_id: i64) -> AppResult<Vec<i64>>;
    fn insert_status(&self, new: &NewStatusMessage) -> AppResult<StatusMessage>;
    fn find_status(&self, id: i64) -> AppResult<Option<StatusMessage>>;
    fn delete_status(&self, id: i64) -> AppResult<bool>;
    /// Statuses owned by any of `profile_ids`, newest first.
    fn statuses_for(&self, profile_ids: &[i64]) -> AppResult<Vec<StatusMessage>>;
}

pub trait Store:
    ProfileRepo + CatalogRepo + PreferenceRepo + MatchRepo + ShownRepo + SocialRepo + Send + Sync
{
    /// Short backend name for logs and health output.
    fn backend(&self) -> &'static str;

    fn ping(&self) -> AppResult<()>;
}
