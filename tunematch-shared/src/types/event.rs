use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// RabbitMQ event envelope wrapping all domain events.
///
/// Routing key format: `tunematch.{domain}.{entity}.{action}`
/// Example: `tunematch.swipe.like.sent`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event<T: Serialize> {
    pub id: Uuid,
    pub source: String,
    pub event_type: String,
    pub timestamp: DateTime<Utc>,
    pub correlation_id: Option<Uuid>,
    pub profile_id: Option<i64>,
    pub data: T,
}

impl<T: Serialize> Event<T> {
    pub fn new(source: impl Into<String>, event_type: impl Into<String>, data: T) -> Self {
        Self {
            id: Uuid::now_v7(),
            source: source.into(),
            event_type: event_type.into(),
            timestamp: Utc::now(),
            correlation_id: None,
            profile_id: None,
            data,
        }
    }

    pub fn with_profile(mut self, profile_id: i64) -> Self {
        self.profile_id = Some(profile_id);
        self
    }
}

/// RabbitMQ routing keys
pub mod routing_keys {
    // Swipe events
    pub const SWIPE_LIKE_SENT: &str = "tunematch.swipe.like.sent";
    pub const SWIPE_MATCH_ACCEPTED: &str = "tunematch.swipe.match.accepted";

    // Social events
    pub const SOCIAL_FRIEND_ADDED: &str = "tunematch.social.friend.added";
    pub const SOCIAL_STATUS_POSTED: &str = "tunematch.social.status.posted";
}

/// Event data payloads
pub mod payloads {
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct LikeSent {
        pub match_id: i64,
        pub sender_id: i64,
        pub receiver_id: i64,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct MatchAccepted {
        pub match_id: i64,
        pub sender_id: i64,
        pub receiver_id: i64,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct FriendAdded {
        pub profile_id: i64,
        pub friend_id: i64,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct StatusPosted {
        pub status_id: i64,
        pub profile_id: i64,
        pub preview: String,
    }
}
