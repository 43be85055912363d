//! Per-viewer swipe cursors.

use dashmap::DashMap;

use tunematch_core::SwipeCursor;
use tunematch_shared::clients::redis::RedisClient;
use tunematch_shared::errors::{AppError, AppResult};

fn cursor_key(viewer_id: i64) -> String {
    format!("swipe:cursor:{viewer_id}")
}

pub enum CursorStore {
    Memory(DashMap<i64, SwipeCursor>),
    Redis { client: RedisClient, ttl_secs: u64 },
}

impl CursorStore {
    pub fn memory() -> Self {
        CursorStore::Memory(DashMap::new())
    }

    pub fn redis(client: RedisClient, ttl_secs: u64) -> Self {
        CursorStore::Redis { client, ttl_secs }
    }

    pub fn backend(&self) -> &'static str {
        match self {
            CursorStore::Memory(_) => "memory",
            CursorStore::Redis { .. } => "redis",
        }
    }

    /// The viewer's cursor, or the start cursor when none is stored.
    pub async fn load(&self, viewer_id: i64) -> AppResult<SwipeCursor> {
        match self {
            CursorStore::Memory(map) => Ok(map.get(&viewer_id).map(|c| *c).unwrap_or_default()),
            CursorStore::Redis { client, .. } => {
                let raw = client
                    .get(&cursor_key(viewer_id))
                    .await
                    .map_err(|e| AppError::internal(format!("redis get failed: {e}")))?;
                match raw.as_deref().map(str::parse::<i64>) {
                    Some(Ok(last_viewed_id)) => Ok(SwipeCursor::new(last_viewed_id)),
                    Some(Err(_)) => {
                        tracing::warn!(viewer_id, "discarding unreadable swipe cursor");
                        Ok(SwipeCursor::START)
                    }
                    None => Ok(SwipeCursor::START),
                }
            }
        }
    }

    pub async fn save(&self, viewer_id: i64, cursor: SwipeCursor) -> AppResult<()> {
        match self {
            CursorStore::Memory(map) => {
                map.insert(viewer_id, cursor);
                Ok(())
            }
            CursorStore::Redis { client, ttl_secs } => client
                .set(&cursor_key(viewer_id), &cursor.last_viewed_id.to_string(), *ttl_secs)
                .await
                .map_err(|e| AppError::internal(format!("redis set failed: {e}"))),
        }
    }

    pub async fn ping(&self) -> AppResult<()> {
        match self {
            CursorStore::Memory(_) => Ok(()),
            CursorStore::Redis { client, .. } => client
                .ping()
                .await
                .map_err(|e| AppError::internal(format!("redis ping failed: {e}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_cursor_defaults_to_start() {
        let cursors = CursorStore::memory();
        assert_eq!(cursors.load(7).await.unwrap(), SwipeCursor::START);

        cursors.save(7, SwipeCursor::new(12)).await.unwrap();
        assert_eq!(cursors.load(7).await.unwrap().last_viewed_id, 12);
        assert_eq!(cursors.load(8).await.unwrap(), SwipeCursor::START);
    }

    #[test]
    fn keys_are_namespaced_per_viewer() {
        assert_eq!(cursor_key(42), "swipe:cursor:42");
    }
}
