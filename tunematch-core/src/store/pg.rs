use chrono::{DateTime, Utc};
use diesel::pg::{Pg, PgConnection};
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};

use tunematch_shared::clients::db::{checkout, DbConnection, DbPool};
use tunematch_shared::errors::{AppError, AppResult, ErrorCode};

use super::{CatalogRepo, MatchRepo, PreferenceRepo, ProfileRepo, ShownRepo, SocialRepo, Store};
use crate::models::{
    FavoriteSong, Friend, Genre, Match, MatchStatus, NewFriend, NewProfile, NewProfileGenre,
    NewProfileSong, NewShownProfile, NewSong, NewStatusMessage, Profile, ProfileGenre,
    ProfileSong, ShownProfile, Song, SongQuery, StatusMessage, UpdateProfile,
};
use crate::schema::{
    friends, genres, matches, profile_genres, profile_songs, profiles, shown_profiles, songs,
    status_messages,
};

#[derive(Debug, Queryable)]
struct MatchRow {
    id: i64,
    sender_id: i64,
    receiver_id: i64,
    status: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<MatchRow> for Match {
    type Error = AppError;

    fn try_from(row: MatchRow) -> Result<Self, Self::Error> {
        let status = row
            .status
            .parse::<MatchStatus>()
            .map_err(|e| AppError::internal(format!("corrupt match row {}: {e}", row.id)))?;
        Ok(Match {
            id: row.id,
            sender_id: row.sender_id,
            receiver_id: row.receiver_id,
            status,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = matches)]
struct NewMatchRow<'a> {
    sender_id: i64,
    receiver_id: i64,
    status: &'a str,
}

fn map_profile_violation(err: DieselError) -> AppError {
    if let DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) = &err {
        return match info.constraint_name() {
            Some("profiles_username_key") => {
                AppError::new(ErrorCode::UsernameTaken, "username is already taken")
            }
            Some("profiles_email_key") => {
                AppError::new(ErrorCode::EmailTaken, "email is already registered")
            }
            _ => AppError::conflict("profile already exists"),
        };
    }
    AppError::Database(err)
}

fn map_foreign_key(err: DieselError, code: ErrorCode, message: &str) -> AppError {
    match err {
        DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, _) => {
            AppError::new(code, message)
        }
        other => AppError::Database(other),
    }
}

/// Escape LIKE metacharacters so user text is matched literally.
fn escape_like(text: &str) -> String {
    text.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}

fn filtered_songs(query: &SongQuery) -> songs::BoxedQuery<'static, Pg> {
    let mut q = songs::table.into_boxed();
    if let Some(text) = query.text() {
        let pattern = format!("%{}%", escape_like(text));
        q = q.filter(songs::title.ilike(pattern.clone()).or(songs::artist.ilike(pattern)));
    }
    if let Some(genre_id) = query.genre_id {
        q = q.filter(songs::genre_id.eq(genre_id));
    }
    if let Some(year_from) = query.year_from {
        q = q.filter(songs::release_year.ge(year_from));
    }
    if let Some(year_to) = query.year_to {
        q = q.filter(songs::release_year.le(year_to));
    }
    q
}

fn insert_preferences(
    conn: &mut PgConnection,
    profile_id: i64,
    genre_ids: &[i64],
    song_ids: &[i64],
) -> AppResult<()> {
    let genre_rows: Vec<NewProfileGenre> = genre_ids
        .iter()
        .map(|&genre_id| NewProfileGenre { profile_id, genre_id })
        .collect();
    if !genre_rows.is_empty() {
        diesel::insert_into(profile_genres::table)
            .values(&genre_rows)
            .execute(conn)
            .map_err(|e| map_foreign_key(e, ErrorCode::GenreNotFound, "genre not found"))?;
    }

    let song_rows: Vec<NewProfileSong> = song_ids
        .iter()
        .map(|&song_id| NewProfileSong { profile_id, song_id })
        .collect();
    if !song_rows.is_empty() {
        diesel::insert_into(profile_songs::table)
            .values(&song_rows)
            .execute(conn)
            .map_err(|e| map_foreign_key(e, ErrorCode::SongNotFound, "song not found"))?;
    }
    Ok(())
}

/// Lock the owning profile row so concurrent preference writes for the same
/// profile serialise on the cap check.
fn lock_profile(conn: &mut PgConnection, profile_id: i64) -> AppResult<()> {
    profiles::table
        .find(profile_id)
        .select(profiles::id)
        .for_update()
        .first::<i64>(conn)
        .optional()?
        .map(|_| ())
        .ok_or_else(|| AppError::new(ErrorCode::ProfileNotFound, "profile not found"))
}

/// Postgres-backed store. Multi-row writes run in one transaction and pair
/// uniqueness comes from the unique indexes in the bundled migration.
#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn conn(&self) -> AppResult<DbConnection> {
        checkout(&self.pool)
    }
}

impl ProfileRepo for PgStore {
    fn insert_profile(&self, new: &NewProfile, genre_ids: &[i64], song_ids: &[i64]) -> AppResult<Profile> {
        let mut pooled = self.conn()?;
        let conn: &mut PgConnection = &mut pooled;

        conn.transaction::<_, AppError, _>(|conn| {
            let profile = diesel::insert_into(profiles::table)
                .values(new)
                .get_result::<Profile>(conn)
                .map_err(map_profile_violation)?;
            insert_preferences(conn, profile.id, genre_ids, song_ids)?;
            Ok(profile)
        })
    }

    fn find_profile(&self, id: i64) -> AppResult<Option<Profile>> {
        let mut conn = self.conn()?;
        Ok(profiles::table.find(id).first::<Profile>(&mut conn).optional()?)
    }

    fn find_profiles(&self, ids: &[i64]) -> AppResult<Vec<Profile>> {
        let mut conn = self.conn()?;
        Ok(profiles::table
            .filter(profiles::id.eq_any(ids))
            .order(profiles::id.asc())
            .load::<Profile>(&mut conn)?)
    }

    fn list_profiles(&self, offset: u64, limit: u64) -> AppResult<(Vec<Profile>, u64)> {
        let mut conn = self.conn()?;
        let total: i64 = profiles::table.count().get_result(&mut conn)?;
        let items = profiles::table
            .order(profiles::id.asc())
            .offset(offset as i64)
            .limit(limit as i64)
            .load::<Profile>(&mut conn)?;
        Ok((items, total as u64))
    }

    fn list_profiles_excluding(&self, exclude: &[i64]) -> AppResult<Vec<Profile>> {
        let mut conn = self.conn()?;
        Ok(profiles::table
            .filter(profiles::id.ne_all(exclude))
            .order(profiles::id.asc())
            .load::<Profile>(&mut conn)?)
    }

    fn first_profile_after(
        &self,
        after_id: i64,
        exclude: &[i64],
        genre_ids: Option<&[i64]>,
    ) -> AppResult<Option<Profile>> {
        let mut conn = self.conn()?;
        let mut query = profiles::table
            .filter(profiles::id.gt(after_id))
            .filter(profiles::id.ne_all(exclude.to_vec()))
            .order(profiles::id.asc())
            .into_boxed();

        if let Some(genre_ids) = genre_ids {
            let sharing = profile_genres::table
                .filter(profile_genres::genre_id.eq_any(genre_ids.to_vec()))
                .select(profile_genres::profile_id);
            query = query.filter(profiles::id.eq_any(sharing));
        }

        Ok(query.first::<Profile>(&mut conn).optional()?)
    }

    fn update_profile(
        &self,
        id: i64,
        changes: &UpdateProfile,
        preferences: Option<(&[i64], &[i64])>,
    ) -> AppResult<Option<Profile>> {
        let mut pooled = self.conn()?;
        let conn: &mut PgConnection = &mut pooled;

        conn.transaction::<_, AppError, _>(|conn| {
            let Some(current) = profiles::table
                .find(id)
                .for_update()
                .first::<Profile>(conn)
                .optional()?
            else {
                return Ok(None);
            };

            let profile = if changes.is_empty() {
                current
            } else {
                diesel::update(profiles::table.find(id))
                    .set(changes)
                    .get_result::<Profile>(conn)
                    .map_err(map_profile_violation)?
            };

            if let Some((genre_ids, song_ids)) = preferences {
                diesel::delete(profile_genres::table.filter(profile_genres::profile_id.eq(id)))
                    .execute(conn)?;
                diesel::delete(profile_songs::table.filter(profile_songs::profile_id.eq(id)))
                    .execute(conn)?;
                insert_preferences(conn, id, genre_ids, song_ids)?;
            }

            Ok(Some(profile))
        })
    }

    fn delete_profile(&self, id: i64) -> AppResult<bool> {
        let mut conn = self.conn()?;
        // Child rows go with ON DELETE CASCADE.
        let deleted = diesel::delete(profiles::table.find(id)).execute(&mut conn)?;
        Ok(deleted > 0)
    }
}

impl CatalogRepo for PgStore {
    fn upsert_genre(&self, name: &str) -> AppResult<Genre> {
        let mut conn = self.conn()?;
        diesel::insert_into(genres::table)
            .values(genres::name.eq(name))
            .on_conflict(genres::name)
            .do_nothing()
            .execute(&mut conn)?;
        Ok(genres::table
            .filter(genres::name.eq(name))
            .first::<Genre>(&mut conn)?)
    }

    fn find_genre(&self, id: i64) -> AppResult<Option<Genre>> {
        let mut conn = self.conn()?;
        Ok(genres::table.find(id).first::<Genre>(&mut conn).optional()?)
    }

    fn list_genres(&self) -> AppResult<Vec<Genre>> {
        let mut conn = self.conn()?;
        Ok(genres::table.order(genres::name.asc()).load::<Genre>(&mut conn)?)
    }

    fn insert_song(&self, new: &NewSong) -> AppResult<Song> {
        let mut conn = self.conn()?;
        diesel::insert_into(songs::table)
            .values(new)
            .get_result::<Song>(&mut conn)
            .map_err(|e| map_foreign_key(e, ErrorCode::GenreNotFound, "genre not found"))
    }

    fn find_song(&self, id: i64) -> AppResult<Option<Song>> {
        let mut conn = self.conn()?;
        Ok(songs::table.find(id).first::<Song>(&mut conn).optional()?)
    }

    fn find_songs(&self, ids: &[i64]) -> AppResult<Vec<Song>> {
        let mut conn = self.conn()?;
        Ok(songs::table
            .filter(songs::id.eq_any(ids))
            .order(songs::id.asc())
            .load::<Song>(&mut conn)?)
    }

    fn search_songs(&self, query: &SongQuery, offset: u64, limit: u64) -> AppResult<(Vec<Song>, u64)> {
        let mut conn = self.conn()?;
        let total: i64 = filtered_songs(query).count().get_result(&mut conn)?;
        let items = filtered_songs(query)
            .order((songs::release_year.desc(), songs::id.asc()))
            .offset(offset as i64)
            .limit(limit as i64)
            .load::<Song>(&mut conn)?;
        Ok((items, total as u64))
    }

    fn song_fans(&self, song_id: i64) -> AppResult<Vec<Profile>> {
        let mut conn = self.conn()?;
        let fan_ids = profile_songs::table
            .filter(profile_songs::song_id.eq(song_id))
            .select(profile_songs::profile_id);
        Ok(profiles::table
            .filter(profiles::id.eq_any(fan_ids))
            .order(profiles::id.asc())
            .load::<Profile>(&mut conn)?)
    }
}

impl PreferenceRepo for PgStore {
    fn add_profile_genre(&self, profile_id: i64, genre_id: i64, max_genres: usize) -> AppResult<ProfileGenre> {
        let mut pooled = self.conn()?;
        let conn: &mut PgConnection = &mut pooled;

        conn.transaction::<_, AppError, _>(|conn| {
            lock_profile(conn, profile_id)?;
            let existing: Vec<i64> = profile_genres::table
                .filter(profile_genres::profile_id.eq(profile_id))
                .select(profile_genres::genre_id)
                .load(conn)?;
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
            diesel::insert_into(profile_genres::table)
                .values(&NewProfileGenre { profile_id, genre_id })
                .get_result::<ProfileGenre>(conn)
                .map_err(|e| map_foreign_key(e, ErrorCode::GenreNotFound, "genre not found"))
        })
    }

    fn add_profile_song(&self, profile_id: i64, song_id: i64, max_songs: usize) -> AppResult<ProfileSong> {
        let mut pooled = self.conn()?;
        let conn: &mut PgConnection = &mut pooled;

        conn.transaction::<_, AppError, _>(|conn| {
            lock_profile(conn, profile_id)?;
            let existing: Vec<i64> = profile_songs::table
                .filter(profile_songs::profile_id.eq(profile_id))
                .select(profile_songs::song_id)
                .load(conn)?;
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
            diesel::insert_into(profile_songs::table)
                .values(&NewProfileSong { profile_id, song_id })
                .get_result::<ProfileSong>(conn)
                .map_err(|e| map_foreign_key(e, ErrorCode::SongNotFound, "song not found"))
        })
    }

    fn remove_profile_genre(&self, profile_id: i64, genre_id: i64) -> AppResult<bool> {
        let mut conn = self.conn()?;
        let removed = diesel::delete(
            profile_genres::table
                .filter(profile_genres::profile_id.eq(profile_id))
                .filter(profile_genres::genre_id.eq(genre_id)),
        )
        .execute(&mut conn)?;
        Ok(removed > 0)
    }

    fn remove_profile_song(&self, profile_id: i64, song_id: i64) -> AppResult<bool> {
        let mut conn = self.conn()?;
        let removed = diesel::delete(
            profile_songs::table
                .filter(profile_songs::profile_id.eq(profile_id))
                .filter(profile_songs::song_id.eq(song_id)),
        )
        .execute(&mut conn)?;
        Ok(removed > 0)
    }

    fn profile_genres(&self, profile_id: i64) -> AppResult<Vec<Genre>> {
        let mut conn = self.conn()?;
        Ok(profile_genres::table
            .inner_join(genres::table)
            .filter(profile_genres::profile_id.eq(profile_id))
            .order(genres::name.asc())
            .select(genres::all_columns)
            .load::<Genre>(&mut conn)?)
    }

    fn profile_songs(&self, profile_id: i64) -> AppResult<Vec<FavoriteSong>> {
        let mut conn = self.conn()?;
        let rows = profile_songs::table
            .inner_join(songs::table)
            .filter(profile_songs::profile_id.eq(profile_id))
            .order((profile_songs::added_at.asc(), profile_songs::id.asc()))
            .select((songs::all_columns, profile_songs::added_at))
            .load::<(Song, DateTime<Utc>)>(&mut conn)?;
        Ok(rows
            .into_iter()
            .map(|(song, added_at)| FavoriteSong { song, added_at })
            .collect())
    }
}

impl MatchRepo for PgStore {
    fn find_match_between(&self, a: i64, b: i64) -> AppResult<Option<Match>> {
        let mut conn = self.conn()?;
        matches::table
            .filter(
                matches::sender_id
                    .eq(a)
                    .and(matches::receiver_id.eq(b))
                    .or(matches::sender_id.eq(b).and(matches::receiver_id.eq(a))),
            )
            .first::<MatchRow>(&mut conn)
            .optional()?
            .map(Match::try_from)
            .transpose()
    }

    fn insert_pending_match(&self, sender_id: i64, receiver_id: i64) -> AppResult<Match> {
        let mut conn = self.conn()?;
        let row = diesel::insert_into(matches::table)
            .values(&NewMatchRow {
                sender_id,
                receiver_id,
                status: MatchStatus::Pending.as_str(),
            })
            .on_conflict_do_nothing()
            .get_result::<MatchRow>(&mut conn)
            .optional()
            .map_err(|e| map_foreign_key(e, ErrorCode::ProfileNotFound, "profile not found"))?;

        match row {
            Some(row) => Match::try_from(row),
            None => Err(AppError::conflict("a match already exists for this pair")),
        }
    }

    fn update_match_status(&self, match_id: i64, status: MatchStatus) -> AppResult<Match> {
        let mut conn = self.conn()?;
        diesel::update(matches::table.find(match_id))
            .set(matches::status.eq(status.as_str()))
            .get_result::<MatchRow>(&mut conn)
            .optional()?
            .ok_or_else(|| AppError::not_found("match not found"))
            .and_then(Match::try_from)
    }

    fn matches_involving(&self, profile_id: i64) -> AppResult<Vec<Match>> {
        let mut conn = self.conn()?;
        matches::table
            .filter(matches::sender_id.eq(profile_id).or(matches::receiver_id.eq(profile_id)))
            .order(matches::id.asc())
            .load::<MatchRow>(&mut conn)?
            .into_iter()
            .map(Match::try_from)
            .collect()
    }
}

impl ShownRepo for PgStore {
    fn record_shown(&self, viewer_id: i64, shown_id: i64) -> AppResult<()> {
        let mut conn = self.conn()?;
        diesel::insert_into(shown_profiles::table)
            .values(&NewShownProfile { viewer_id, shown_id })
            .on_conflict((shown_profiles::viewer_id, shown_profiles::shown_id))
            .do_nothing()
            .execute(&mut conn)?;
        Ok(())
    }

    fn shown_profiles(&self, viewer_id: i64) -> AppResult<Vec<ShownProfile>> {
        let mut conn = self.conn()?;
        Ok(shown_profiles::table
            .filter(shown_profiles::viewer_id.eq(viewer_id))
            .order((shown_profiles::shown_at.desc(), shown_profiles::id.desc()))
            .load::<ShownProfile>(&mut conn)?)
    }
}

impl SocialRepo for PgStore {
    fn insert_friend(&self, a: i64, b: i64) -> AppResult<bool> {
        let mut conn = self.conn()?;
        let inserted = diesel::insert_into(friends::table)
            .values(&NewFriend { profile1_id: a, profile2_id: b })
            .on_conflict_do_nothing()
            .execute(&mut conn)
            .map_err(|e| map_foreign_key(e, ErrorCode::ProfileNotFound, "profile not found"))?;
        Ok(inserted == 1)
    }

    fn friend_ids(&self, profile_id: i64) -> AppResult<Vec<i64>> {
        let mut conn = self.conn()?;
        let rows = friends::table
            .filter(friends::profile1_id.eq(profile_id).or(friends::profile2_id.eq(profile_id)))
            .load::<Friend>(&mut conn)?;
        Ok(rows.iter().filter_map(|f| f.counterpart(profile_id)).collect())
    }

    fn insert_status(&self, new: &NewStatusMessage) -> AppResult<StatusMessage> {
        let mut conn = self.conn()?;
        diesel::insert_into(status_messages::table)
            .values(new)
            .get_result::<StatusMessage>(&mut conn)
            .map_err(|e| map_foreign_key(e, ErrorCode::ProfileNotFound, "profile not found"))
    }

    fn find_status(&self, id: i64) -> AppResult<Option<StatusMessage>> {
        let mut conn = self.conn()?;
        Ok(status_messages::table
            .find(id)
            .first::<StatusMessage>(&mut conn)
            .optional()?)
    }

    fn delete_status(&self, id: i64) -> AppResult<bool> {
        let mut conn = self.conn()?;
        let deleted = diesel::delete(status_messages::table.find(id)).execute(&mut conn)?;
        Ok(deleted > 0)
    }

    fn statuses_for(&self, profile_ids: &[i64]) -> AppResult<Vec<StatusMessage>> {
        let mut conn = self.conn()?;
        Ok(status_messages::table
            .filter(status_messages::profile_id.eq_any(profile_ids))
            .order((status_messages::created_at.desc(), status_messages::id.desc()))
            .load::<StatusMessage>(&mut conn)?)
    }
}

impl Store for PgStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    fn ping(&self) -> AppResult<()> {
        let mut conn = self.conn()?;
        diesel::sql_query("SELECT 1").execute(&mut conn)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_metacharacters_are_escaped() {
        assert_eq!(escape_like("100%_rock\\"), "100\\%\\_rock\\\\");
    }

    #[test]
    fn corrupt_status_is_reported() {
        let row = MatchRow {
            id: 4,
            sender_id: 1,
            receiver_id: 2,
            status: "maybe".into(),
            created_at: Utc::now(),
        };
        let err = Match::try_from(row).unwrap_err();
        assert!(err.is(ErrorCode::InternalError));
    }
}
