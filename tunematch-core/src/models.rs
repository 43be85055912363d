use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::schema::{
    friends, genres, profile_genres, profile_songs, profiles, shown_profiles, songs,
    status_messages,
};

// --- Profile ---

#[derive(Debug, Clone, PartialEq, Queryable, Identifiable, Serialize, Deserialize)]
#[diesel(table_name = profiles)]
pub struct Profile {
    pub id: i64,
    pub account_id: Option<Uuid>,
    pub username: String,
    pub email: String,
    pub display_name: Option<String>,
    pub city: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub bio: Option<String>,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable, Deserialize, Validate)]
#[diesel(table_name = profiles)]
pub struct NewProfile {
    pub account_id: Option<Uuid>,
    #[validate(length(min = 3, max = 150))]
    pub username: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(max = 100))]
    pub display_name: Option<String>,
    #[validate(length(max = 50))]
    pub city: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub bio: Option<String>,
    #[validate(url)]
    pub image_url: Option<String>,
}

impl NewProfile {
    pub fn new(username: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            account_id: None,
            username: username.into(),
            email: email.into(),
            display_name: None,
            city: None,
            birth_date: None,
            bio: None,
            image_url: None,
        }
    }
}

#[derive(Debug, Clone, Default, AsChangeset, Deserialize, Validate)]
#[diesel(table_name = profiles)]
pub struct UpdateProfile {
    #[validate(length(min = 3, max = 150))]
    pub username: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(max = 100))]
    pub display_name: Option<String>,
    #[validate(length(max = 50))]
    pub city: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub bio: Option<String>,
    #[validate(url)]
    pub image_url: Option<String>,
}

impl UpdateProfile {
    pub fn is_empty(&self) -> bool {
        self.username.is_none()
            && self.email.is_none()
            && self.display_name.is_none()
            && self.city.is_none()
            && self.birth_date.is_none()
            && self.bio.is_none()
            && self.image_url.is_none()
    }

    /// Apply the present fields to an in-memory profile.
    pub fn apply_to(&self, profile: &mut Profile) {
        if let Some(v) = &self.username {
            profile.username = v.clone();
        }
        if let Some(v) = &self.email {
            profile.email = v.clone();
        }
        if let Some(v) = &self.display_name {
            profile.display_name = Some(v.clone());
        }
        if let Some(v) = &self.city {
            profile.city = Some(v.clone());
        }
        if let Some(v) = self.birth_date {
            profile.birth_date = Some(v);
        }
        if let Some(v) = &self.bio {
            profile.bio = Some(v.clone());
        }
        if let Some(v) = &self.image_url {
            profile.image_url = Some(v.clone());
        }
    }
}

// --- Catalog ---

#[derive(Debug, Clone, PartialEq, Eq, Queryable, Identifiable, Serialize, Deserialize)]
#[diesel(table_name = genres)]
pub struct Genre {
    pub id: i64,
    pub name: String,
}

/// One entry of a select-style option list built from the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenreOption {
    pub value: i64,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Queryable, Identifiable, Serialize, Deserialize)]
#[diesel(table_name = songs)]
pub struct Song {
    pub id: i64,
    pub title: String,
    pub artist: String,
    pub genre_id: i64,
    pub release_year: i32,
    pub media_url: String,
}

#[derive(Debug, Clone, Insertable, Deserialize, Validate)]
#[diesel(table_name = songs)]
pub struct NewSong {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(min = 1, max = 200))]
    pub artist: String,
    pub genre_id: i64,
    #[validate(range(min = 1900, max = 2100))]
    pub release_year: i32,
    #[validate(url)]
    pub media_url: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SongQuery {
    /// Case-insensitive substring matched against title or artist.
    pub q: Option<String>,
    pub genre_id: Option<i64>,
    pub year_from: Option<i32>,
    pub year_to: Option<i32>,
}

impl SongQuery {
    /// The trimmed search text, `None` when blank.
    pub fn text(&self) -> Option<&str> {
        self.q.as_deref().map(str::trim).filter(|q| !q.is_empty())
    }

    pub fn matches(&self, song: &Song) -> bool {
        if let Some(q) = self.text() {
            let q = q.to_lowercase();
            if !song.title.to_lowercase().contains(&q) && !song.artist.to_lowercase().contains(&q) {
                return false;
            }
        }
        if self.genre_id.is_some_and(|g| g != song.genre_id) {
            return false;
        }
        if self.year_from.is_some_and(|y| song.release_year < y) {
            return false;
        }
        if self.year_to.is_some_and(|y| song.release_year > y) {
            return false;
        }
        true
    }
}

#[derive(Debug, Serialize)]
pub struct SongDetail {
    pub song: Song,
    pub genre: Genre,
    pub fans: Vec<Profile>,
}

// --- Preference edges ---

#[derive(Debug, Clone, PartialEq, Queryable, Identifiable, Serialize)]
#[diesel(table_name = profile_genres)]
pub struct ProfileGenre {
    pub id: i64,
    pub profile_id: i64,
    pub genre_id: i64,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = profile_genres)]
pub struct NewProfileGenre {
    pub profile_id: i64,
    pub genre_id: i64,
}

#[derive(Debug, Clone, PartialEq, Queryable, Identifiable, Serialize)]
#[diesel(table_name = profile_songs)]
pub struct ProfileSong {
    pub id: i64,
    pub profile_id: i64,
    pub song_id: i64,
    pub added_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = profile_songs)]
pub struct NewProfileSong {
    pub profile_id: i64,
    pub song_id: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FavoriteSong {
    pub song: Song,
    pub added_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ProfileDetail {
    pub profile: Profile,
    pub genres: Vec<Genre>,
    pub songs: Vec<FavoriteSong>,
}

// --- Match ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchStatus {
    Pending,
    Accepted,
    Rejected,
}

impl MatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStatus::Pending => "pending",
            MatchStatus::Accepted => "accepted",
            MatchStatus::Rejected => "rejected",
        }
    }
}

impl std::fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MatchStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(MatchStatus::Pending),
            "accepted" => Ok(MatchStatus::Accepted),
            "rejected" => Ok(MatchStatus::Rejected),
            _ => Err(format!("unknown match status: {s}")),
        }
    }
}

/// Directed like between two profiles. There is at most one row per
/// unordered pair; `sender_id` is whoever liked first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub id: i64,
    pub sender_id: i64,
    pub receiver_id: i64,
    pub status: MatchStatus,
    pub created_at: DateTime<Utc>,
}

impl Match {
    pub fn involves(&self, profile_id: i64) -> bool {
        self.sender_id == profile_id || self.receiver_id == profile_id
    }

    /// The other side of the pair, seen from `profile_id`.
    pub fn counterpart(&self, profile_id: i64) -> i64 {
        if self.sender_id == profile_id {
            self.receiver_id
        } else {
            self.sender_id
        }
    }
}

// --- Shown log ---

#[derive(Debug, Clone, PartialEq, Queryable, Identifiable, Serialize)]
#[diesel(table_name = shown_profiles)]
pub struct ShownProfile {
    pub id: i64,
    pub viewer_id: i64,
    pub shown_id: i64,
    pub shown_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = shown_profiles)]
pub struct NewShownProfile {
    pub viewer_id: i64,
    pub shown_id: i64,
}

// --- Friends ---

#[derive(Debug, Clone, PartialEq, Queryable, Identifiable, Serialize)]
#[diesel(table_name = friends)]
pub struct Friend {
    pub id: i64,
    pub profile1_id: i64,
    pub profile2_id: i64,
    pub created_at: DateTime<Utc>,
}

impl Friend {
    pub fn counterpart(&self, profile_id: i64) -> Option<i64> {
        if self.profile1_id == profile_id {
            Some(self.profile2_id)
        } else if self.profile2_id == profile_id {
            Some(self.profile1_id)
        } else {
            None
        }
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = friends)]
pub struct NewFriend {
    pub profile1_id: i64,
    pub profile2_id: i64,
}

// --- Status messages ---

#[derive(Debug, Clone, PartialEq, Queryable, Identifiable, Serialize, Deserialize)]
#[diesel(table_name = status_messages)]
pub struct StatusMessage {
    pub id: i64,
    pub profile_id: i64,
    pub message: String,
    pub image_urls: Vec<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable, Validate)]
#[diesel(table_name = status_messages)]
pub struct NewStatusMessage {
    pub profile_id: i64,
    #[validate(length(min = 1, max = 5000))]
    pub message: String,
    pub image_urls: Vec<String>,
}

/// Orders an unordered pair so both directions map to the same key.
pub fn canonical_pair(a: i64, b: i64) -> (i64, i64) {
    if a <= b { (a, b) } else { (b, a) }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn song(title: &str, artist: &str, genre_id: i64, year: i32) -> Song {
        Song {
            id: 1,
            title: title.into(),
            artist: artist.into(),
            genre_id,
            release_year: year,
            media_url: "https://youtube.com/watch?v=x".into(),
        }
    }

    #[test]
    fn song_query_matches_title_or_artist_case_insensitive() {
        let s = song("Paranoid Android", "Radiohead", 1, 1997);
        let q = SongQuery { q: Some("  radio ".into()), ..Default::default() };
        assert!(q.matches(&s));
        let q = SongQuery { q: Some("android".into()), ..Default::default() };
        assert!(q.matches(&s));
        let q = SongQuery { q: Some("beatles".into()), ..Default::default() };
        assert!(!q.matches(&s));
    }

    #[test]
    fn song_query_year_bounds_are_inclusive() {
        let s = song("Karma Police", "Radiohead", 1, 1997);
        let q = SongQuery { year_from: Some(1997), year_to: Some(1997), ..Default::default() };
        assert!(q.matches(&s));
        let q = SongQuery { year_from: Some(1998), ..Default::default() };
        assert!(!q.matches(&s));
        let q = SongQuery { genre_id: Some(2), ..Default::default() };
        assert!(!q.matches(&s));
    }

    #[test]
    fn match_status_round_trips_through_text() {
        for status in [MatchStatus::Pending, MatchStatus::Accepted, MatchStatus::Rejected] {
            assert_eq!(status.as_str().parse::<MatchStatus>().unwrap(), status);
        }
        assert!("maybe".parse::<MatchStatus>().is_err());
    }

    #[test]
    fn canonical_pair_ignores_direction() {
        assert_eq!(canonical_pair(9, 2), (2, 9));
        assert_eq!(canonical_pair(2, 9), (2, 9));
    }

    #[test]
    fn update_profile_empty_detection() {
        assert!(UpdateProfile::default().is_empty());
        let update = UpdateProfile { bio: Some("hi".into()), ..Default::default() };
        assert!(!update.is_empty());
    }
}
