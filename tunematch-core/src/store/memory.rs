use chrono::Utc;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tunematch_shared::errors::{AppError, AppResult, ErrorCode};

use super::{CatalogRepo, MatchRepo, PreferenceRepo, ProfileRepo, ShownRepo, SocialRepo, Store};
use crate::models::{
    canonical_pair, FavoriteSong, Friend, Genre, Match, MatchStatus, NewProfile, NewSong,
    NewStatusMessage, Profile, ProfileGenre, ProfileSong, ShownProfile, Song, SongQuery,
    StatusMessage, UpdateProfile,
};

#[derive(Default)]
struct Sequences {
    profile: i64,
    genre: i64,
    song: i64,
    profile_genre: i64,
    profile_song: i64,
    matched: i64,
    shown: i64,
    friend: i64,
    status: i64,
}

fn next(counter: &mut i64) -> i64 {
    *counter += 1;
    *counter
}

#[derive(Default)]
struct Tables {
    seq: Sequences,
    profiles: BTreeMap<i64, Profile>,
    genres: BTreeMap<i64, Genre>,
    songs: BTreeMap<i64, Song>,
    profile_genres: BTreeMap<i64, ProfileGenre>,
    profile_songs: BTreeMap<i64, ProfileSong>,
    matches: BTreeMap<i64, Match>,
    match_pairs: HashMap<(i64, i64), i64>,
    shown: BTreeMap<i64, ShownProfile>,
    friends: BTreeMap<i64, Friend>,
    friend_pairs: HashMap<(i64, i64), i64>,
    statuses: BTreeMap<i64, StatusMessage>,
}

impl Tables {
    fn check_profile_unique(&self, username: &str, email: &str, skip_id: Option<i64>) -> AppResult<()> {
        for p in self.profiles.values().filter(|p| Some(p.id) != skip_id) {
            if p.username == username {
                return Err(AppError::new(ErrorCode::UsernameTaken, "username is already taken"));
            }
            if p.email == email {
                return Err(AppError::new(ErrorCode::EmailTaken, "email is already registered"));
            }
        }
        Ok(())
    }

    fn genre_ids_of(&self, profile_id: i64) -> impl Iterator<Item = i64> + '_ {
        self.profile_genres
            .values()
            .filter(move |e| e.profile_id == profile_id)
            .map(|e| e.genre_id)
    }

    fn replace_preferences(&mut self, profile_id: i64, genre_ids: &[i64], song_ids: &[i64]) {
        self.profile_genres.retain(|_, e| e.profile_id != profile_id);
        self.profile_songs.retain(|_, e| e.profile_id != profile_id);
        for &genre_id in genre_ids {
            let id = next(&mut self.seq.profile_genre);
            self.profile_genres.insert(id, ProfileGenre { id, profile_id, genre_id });
        }
        let now = Utc::now();
        for &song_id in song_ids {
            let id = next(&mut self.seq.profile_song);
            self.profile_songs.insert(id, ProfileSong { id, profile_id, song_id, added_at: now });
        }
    }
}

/// Single-process store; every call holds one lock for its whole duration.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ProfileRepo for MemoryStore {
    fn insert_profile(&self, new: &NewProfile, genre_ids: &[i64], song_ids: &[i64]) -> AppResult<Profile> {
        let mut t = self.tables();
        t.check_profile_unique(&new.username, &new.email, None)?;
        if let Some(account_id) = new.account_id {
            if t.profiles.values().any(|p| p.account_id == Some(account_id)) {
                return Err(AppError::conflict("account already has a profile"));
            }
        }

        let id = next(&mut t.seq.profile);
        let profile = Profile {
            id,
            account_id: new.account_id,
            username: new.username.clone(),
            email: new.email.clone(),
            display_name: new.display_name.clone(),
            city: new.city.clone(),
            birth_date: new.birth_date,
            bio: new.bio.clone(),
            image_url: new.image_url.clone(),
            created_at: Utc::now(),
        };
        t.profiles.insert(id, profile.clone());
        t.replace_preferences(id, genre_ids, song_ids);
        Ok(profile)
    }

    fn find_profile(&self, id: i64) -> AppResult<Option<Profile>> {
        Ok(self.tables().profiles.get(&id).cloned())
    }

    fn find_profiles(&self, ids: &[i64]) -> AppResult<Vec<Profile>> {
        let wanted: HashSet<i64> = ids.iter().copied().collect();
        Ok(self
            .tables()
            .profiles
            .values()
            .filter(|p| wanted.contains(&p.id))
            .cloned()
            .collect())
    }

    fn list_profiles(&self, offset: u64, limit: u64) -> AppResult<(Vec<Profile>, u64)> {
        let t = self.tables();
        let items = t
            .profiles
            .values()
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect();
        Ok((items, t.profiles.len() as u64))
    }

    fn list_profiles_excluding(&self, exclude: &[i64]) -> AppResult<Vec<Profile>> {
        Ok(self
            .tables()
            .profiles
            .values()
            .filter(|p| !exclude.contains(&p.id))
            .cloned()
            .collect())
    }

    fn first_profile_after(
        &self,
        after_id: i64,
        exclude: &[i64],
        genre_ids: Option<&[i64]>,
    ) -> AppResult<Option<Profile>> {
        let t = self.tables();
        let candidate = t
            .profiles
            .range(after_id.saturating_add(1)..)
            .map(|(_, p)| p)
            .filter(|p| !exclude.contains(&p.id))
            .find(|p| match genre_ids {
                Some(wanted) => t.genre_ids_of(p.id).any(|g| wanted.contains(&g)),
                None => true,
            });
        Ok(candidate.cloned())
    }

    fn update_profile(
        &self,
        id: i64,
        changes: &UpdateProfile,
        preferences: Option<(&[i64], &[i64])>,
    ) -> AppResult<Option<Profile>> {
        let mut t = self.tables();
        let Some(mut profile) = t.profiles.get(&id).cloned() else {
            return Ok(None);
        };
        changes.apply_to(&mut profile);
        t.check_profile_unique(&profile.username, &profile.email, Some(id))?;

        t.profiles.insert(id, profile.clone());
        if let Some((genre_ids, song_ids)) = preferences {
            t.replace_preferences(id, genre_ids, song_ids);
        }
        Ok(Some(profile))
    }

    fn delete_profile(&self, id: i64) -> AppResult<bool> {
        let mut t = self.tables();
        if t.profiles.remove(&id).is_none() {
            return Ok(false);
        }
        t.profile_genres.retain(|_, e| e.profile_id != id);
        t.profile_songs.retain(|_, e| e.profile_id != id);
        t.matches.retain(|_, m| !m.involves(id));
        t.match_pairs.retain(|&(a, b), _| a != id && b != id);
        t.shown.retain(|_, s| s.viewer_id != id && s.shown_id != id);
        t.friends.retain(|_, f| f.counterpart(id).is_none());
        t.friend_pairs.retain(|&(a, b), _| a != id && b != id);
        t.statuses.retain(|_, s| s.profile_id != id);
        Ok(true)
    }
}

impl CatalogRepo for MemoryStore {
    fn upsert_genre(&self, name: &str) -> AppResult<Genre> {
        let mut t = self.tables();
        if let Some(existing) = t.genres.values().find(|g| g.name == name) {
            return Ok(existing.clone());
        }
        let id = next(&mut t.seq.genre);
        let genre = Genre { id, name: name.to_string() };
        t.genres.insert(id, genre.clone());
        Ok(genre)
    }

    fn find_genre(&self, id: i64) -> AppResult<Option<Genre>> {
        Ok(self.tables().genres.get(&id).cloned())
    }

    fn list_genres(&self) -> AppResult<Vec<Genre>> {
        let mut genres: Vec<Genre> = self.tables().genres.values().cloned().collect();
        genres.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(genres)
    }

    fn insert_song(&self, new: &NewSong) -> AppResult<Song> {
        let mut t = self.tables();
        if !t.genres.contains_key(&new.genre_id) {
            return Err(AppError::new(ErrorCode::GenreNotFound, "genre not found"));
        }
        let id = next(&mut t.seq.song);
        let song = Song {
            id,
            title: new.title.clone(),
            artist: new.artist.clone(),
            genre_id: new.genre_id,
            release_year: new.release_year,
            media_url: new.media_url.clone(),
        };
        t.songs.insert(id, song.clone());
        Ok(song)
    }

    fn find_song(&self, id: i64) -> AppResult<Option<Song>> {
        Ok(self.tables().songs.get(&id).cloned())
    }

    fn find_songs(&self, ids: &[i64]) -> AppResult<Vec<Song>> {
        Ok(self
            .tables()
            .songs
            .values()
            .filter(|s| ids.contains(&s.id))
            .cloned()
            .collect())
    }

    fn search_songs(&self, query: &SongQuery, offset: u64, limit: u64) -> AppResult<(Vec<Song>, u64)> {
        let mut hits: Vec<Song> = self
            .tables()
            .songs
            .values()
            .filter(|s| query.matches(s))
            .cloned()
            .collect();
        hits.sort_by(|a, b| b.release_year.cmp(&a.release_year).then(a.id.cmp(&b.id)));
        let total = hits.len() as u64;
        let items = hits.into_iter().skip(offset as usize).take(limit as usize).collect();
        Ok((items, total))
    }

    fn song_fans(&self, song_id: i64) -> AppResult<Vec<Profile>> {
        let t = self.tables();
        let fan_ids: HashSet<i64> = t
            .profile_songs
            .values()
            .filter(|e| e.song_id == song_id)
            .map(|e| e.profile_id)
            .collect();
        Ok(t.profiles
            .values()
            .filter(|p| fan_ids.contains(&p.id))
            .cloned()
            .collect())
    }
}

impl PreferenceRepo for MemoryStore {
    fn add_profile_genre(&self, profile_id: i64, genre_id: i64, max_genres: usize) -> AppResult<ProfileGenre> {
        let mut t = self.tables();
        let existing: Vec<i64> = t.genre_ids_of(profile_id).collect();
        if existing.contains(&genre_id) {
            return Err(AppError::new(ErrorCode::DuplicatePreference, "genre is already a preference"));
        }
        if existing.len() >= max_genres {
            return Err(AppError::with_details(
                ErrorCode::PreferenceLimitExceeded,
                format!("a profile cannot have more than {max_genres} preferred genres"),
                serde_json::json!({ "kind": "genre", "limit": max_genres }),
            ));
        }
        let id = next(&mut t.seq.profile_genre);
        let edge = ProfileGenre { id, profile_id, genre_id };
        t.profile_genres.insert(id, edge.clone());
        Ok(edge)
    }

    fn add_profile_song(&self, profile_id: i64, song_id: i64, max_songs: usize) -> AppResult<ProfileSong> {
        let mut t = self.tables();
        let existing: Vec<i64> = t
            .profile_songs
            .values()
            .filter(|e| e.profile_id == profile_id)
            .map(|e| e.song_id)
            .collect();
        if existing.contains(&song_id) {
            return Err(AppError::new(ErrorCode::DuplicatePreference, "song is already a favourite"));
        }
        if existing.len() >= max_songs {
            return Err(AppError::with_details(
                ErrorCode::PreferenceLimitExceeded,
                format!("a profile cannot have more than {max_songs} favourite songs"),
                serde_json::json!({ "kind": "song", "limit": max_songs }),
            ));
        }
        let id = next(&mut t.seq.profile_song);
        let edge = ProfileSong { id, profile_id, song_id, added_at: Utc::now() };
        t.profile_songs.insert(id, edge.clone());
        Ok(edge)
    }

    fn remove_profile_genre(&self, profile_id: i64, genre_id: i64) -> AppResult<bool> {
        let mut t = self.tables();
        let before = t.profile_genres.len();
        t.profile_genres
            .retain(|_, e| !(e.profile_id == profile_id && e.genre_id == genre_id));
        Ok(t.profile_genres.len() != before)
    }

    fn remove_profile_song(&self, profile_id: i64, song_id: i64) -> AppResult<bool> {
        let mut t = self.tables();
        let before = t.profile_songs.len();
        t.profile_songs
            .retain(|_, e| !(e.profile_id == profile_id && e.song_id == song_id));
        Ok(t.profile_songs.len() != before)
    }

    fn profile_genres(&self, profile_id: i64) -> AppResult<Vec<Genre>> {
        let t = self.tables();
        let mut genres: Vec<Genre> = t
            .genre_ids_of(profile_id)
            .filter_map(|id| t.genres.get(&id).cloned())
            .collect();
        genres.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(genres)
    }

    fn profile_songs(&self, profile_id: i64) -> AppResult<Vec<FavoriteSong>> {
        let t = self.tables();
        // Edge ids grow with insertion, so map order is insertion order.
        Ok(t.profile_songs
            .values()
            .filter(|e| e.profile_id == profile_id)
            .filter_map(|e| {
                t.songs.get(&e.song_id).map(|song| FavoriteSong {
                    song: song.clone(),
                    added_at: e.added_at,
                })
            })
            .collect())
    }
}

impl MatchRepo for MemoryStore {
    fn find_match_between(&self, a: i64, b: i64) -> AppResult<Option<Match>> {
        let t = self.tables();
        Ok(t.match_pairs
            .get(&canonical_pair(a, b))
            .and_then(|id| t.matches.get(id))
            .cloned())
    }

    fn insert_pending_match(&self, sender_id: i64, receiver_id: i64) -> AppResult<Match> {
        let mut t = self.tables();
        let pair = canonical_pair(sender_id, receiver_id);
        if t.match_pairs.contains_key(&pair) {
            return Err(AppError::conflict("a match already exists for this pair"));
        }
        let id = next(&mut t.seq.matched);
        let row = Match {
            id,
            sender_id,
            receiver_id,
            status: MatchStatus::Pending,
            created_at: Utc::now(),
        };
        t.matches.insert(id, row.clone());
        t.match_pairs.insert(pair, id);
        Ok(row)
    }

    fn update_match_status(&self, match_id: i64, status: MatchStatus) -> AppResult<Match> {
        let mut t = self.tables();
        let row = t
            .matches
            .get_mut(&match_id)
            .ok_or_else(|| AppError::not_found("match not found"))?;
        row.status = status;
        Ok(row.clone())
    }

    fn matches_involving(&self, profile_id: i64) -> AppResult<Vec<Match>> {
        Ok(self
            .tables()
            .matches
            .values()
            .filter(|m| m.involves(profile_id))
            .cloned()
            .collect())
    }
}

impl ShownRepo for MemoryStore {
    fn record_shown(&self, viewer_id: i64, shown_id: i64) -> AppResult<()> {
        let mut t = self.tables();
        if t.shown.values().any(|s| s.viewer_id == viewer_id && s.shown_id == shown_id) {
            return Ok(());
        }
        let id = next(&mut t.seq.shown);
        t.shown.insert(id, ShownProfile { id, viewer_id, shown_id, shown_at: Utc::now() });
        Ok(())
    }

    fn shown_profiles(&self, viewer_id: i64) -> AppResult<Vec<ShownProfile>> {
        Ok(self
            .tables()
            .shown
            .values()
            .rev()
            .filter(|s| s.viewer_id == viewer_id)
            .cloned()
            .collect())
    }
}

impl SocialRepo for MemoryStore {
    fn insert_friend(&self, a: i64, b: i64) -> AppResult<bool> {
        let mut t = self.tables();
        let pair = canonical_pair(a, b);
        if t.friend_pairs.contains_key(&pair) {
            return Ok(false);
        }
        let id = next(&mut t.seq.friend);
        t.friends.insert(id, Friend { id, profile1_id: a, profile2_id: b, created_at: Utc::now() });
        t.friend_pairs.insert(pair, id);
        Ok(true)
    }

    fn friend_ids(&self, profile_id: i64) -> AppResult<Vec<i64>> {
        Ok(self
            .tables()
            .friends
            .values()
            .filter_map(|f| f.counterpart(profile_id))
            .collect())
    }

    fn insert_status(&self, new: &NewStatusMessage) -> AppResult<StatusMessage> {
        let mut t = self.tables();
        if !t.profiles.contains_key(&new.profile_id) {
            return Err(AppError::new(ErrorCode::ProfileNotFound, "profile not found"));
        }
        let id = next(&mut t.seq.status);
        let status = StatusMessage {
            id,
            profile_id: new.profile_id,
            message: new.message.clone(),
            image_urls: new.image_urls.clone(),
            created_at: Utc::now(),
        };
        t.statuses.insert(id, status.clone());
        Ok(status)
    }

    fn find_status(&self, id: i64) -> AppResult<Option<StatusMessage>> {
        Ok(self.tables().statuses.get(&id).cloned())
    }

    fn delete_status(&self, id: i64) -> AppResult<bool> {
        Ok(self.tables().statuses.remove(&id).is_some())
    }

    fn statuses_for(&self, profile_ids: &[i64]) -> AppResult<Vec<StatusMessage>> {
        let mut feed: Vec<StatusMessage> = self
            .tables()
            .statuses
            .values()
            .filter(|s| profile_ids.contains(&s.profile_id))
            .cloned()
            .collect();
        feed.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(feed)
    }
}

impl Store for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    fn ping(&self) -> AppResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> (MemoryStore, Vec<i64>) {
        let store = MemoryStore::new();
        let ids = ["ada", "bob", "cy"]
            .iter()
            .map(|name| {
                store
                    .insert_profile(&NewProfile::new(*name, format!("{name}@example.com")), &[], &[])
                    .unwrap()
                    .id
            })
            .collect();
        (store, ids)
    }

    #[test]
    fn pair_uniqueness_holds_in_both_directions() {
        let (store, ids) = seeded();
        store.insert_pending_match(ids[0], ids[1]).unwrap();
        let err = store.insert_pending_match(ids[1], ids[0]).unwrap_err();
        assert!(err.is(ErrorCode::Conflict));
        assert_eq!(store.matches_involving(ids[0]).unwrap().len(), 1);
    }

    #[test]
    fn duplicate_username_and_email_are_rejected() {
        let (store, _) = seeded();
        let err = store
            .insert_profile(&NewProfile::new("ada", "other@example.com"), &[], &[])
            .unwrap_err();
        assert!(err.is(ErrorCode::UsernameTaken));
        let err = store
            .insert_profile(&NewProfile::new("dee", "bob@example.com"), &[], &[])
            .unwrap_err();
        assert!(err.is(ErrorCode::EmailTaken));
    }

    #[test]
    fn delete_profile_cascades() {
        let (store, ids) = seeded();
        store.insert_pending_match(ids[0], ids[1]).unwrap();
        store.insert_friend(ids[1], ids[0]).unwrap();
        store.record_shown(ids[1], ids[0]).unwrap();
        store
            .insert_status(&NewStatusMessage {
                profile_id: ids[0],
                message: "hello".into(),
                image_urls: vec![],
            })
            .unwrap();

        assert!(store.delete_profile(ids[0]).unwrap());
        assert!(store.matches_involving(ids[1]).unwrap().is_empty());
        assert!(store.friend_ids(ids[1]).unwrap().is_empty());
        assert!(store.shown_profiles(ids[1]).unwrap().is_empty());
        assert!(store.statuses_for(&[ids[0]]).unwrap().is_empty());
        // The pair key is released with the rows.
        assert!(store.insert_pending_match(ids[1], ids[2]).is_ok());
        assert!(!store.delete_profile(ids[0]).unwrap());
    }

    #[test]
    fn record_shown_is_idempotent() {
        let (store, ids) = seeded();
        store.record_shown(ids[0], ids[1]).unwrap();
        store.record_shown(ids[0], ids[1]).unwrap();
        store.record_shown(ids[0], ids[2]).unwrap();
        let shown = store.shown_profiles(ids[0]).unwrap();
        assert_eq!(shown.len(), 2);
        assert_eq!(shown[0].shown_id, ids[2]);
    }
}
