use serde::Serialize;

use tunematch_core::models::{Match, StatusMessage};
use tunematch_core::LikeOutcome;
use tunematch_shared::clients::rabbitmq::RabbitMQClient;
use tunematch_shared::types::event::{payloads, routing_keys, Event};

const SOURCE: &str = "tunematch-api";
const PREVIEW_CHARS: usize = 80;

/// Where domain events go. Failures are logged and never surface to callers.
pub enum EventPublisher {
    Log,
    RabbitMq(RabbitMQClient),
}

impl EventPublisher {
    pub fn backend(&self) -> &'static str {
        match self {
            EventPublisher::Log => "log",
            EventPublisher::RabbitMq(_) => "rabbitmq",
        }
    }

    async fn publish<T: Serialize>(&self, routing_key: &str, event: Event<T>) {
        match self {
            EventPublisher::Log => {
                tracing::debug!(
                    routing_key = %routing_key,
                    event_id = %event.id,
                    profile_id = ?event.profile_id,
                    "event (not published)"
                );
            }
            EventPublisher::RabbitMq(client) => {
                if let Err(e) = client.publish(routing_key, &event).await {
                    tracing::error!(error = %e, routing_key = %routing_key, "failed to publish event");
                }
            }
        }
    }
}

/// `like.sent` for a new like, `match.accepted` when it completed a pair.
/// Repeated likes publish nothing.
pub async fn publish_like_outcome(events: &EventPublisher, outcome: &LikeOutcome) {
    match outcome {
        LikeOutcome::Liked(m) => publish_like_sent(events, m).await,
        LikeOutcome::MutualMatch(m) => publish_match_accepted(events, m).await,
        LikeOutcome::AlreadyLiked(_) => {}
    }
}

pub async fn publish_like_sent(events: &EventPublisher, row: &Match) {
    let event = Event::new(
        SOURCE,
        routing_keys::SWIPE_LIKE_SENT,
        payloads::LikeSent {
            match_id: row.id,
            sender_id: row.sender_id,
            receiver_id: row.receiver_id,
        },
    )
    .with_profile(row.sender_id);

    events.publish(routing_keys::SWIPE_LIKE_SENT, event).await;
}

pub async fn publish_match_accepted(events: &EventPublisher, row: &Match) {
    let event = Event::new(
        SOURCE,
        routing_keys::SWIPE_MATCH_ACCEPTED,
        payloads::MatchAccepted {
            match_id: row.id,
            sender_id: row.sender_id,
            receiver_id: row.receiver_id,
        },
    )
    .with_profile(row.receiver_id);

    events.publish(routing_keys::SWIPE_MATCH_ACCEPTED, event).await;
}

pub async fn publish_friend_added(events: &EventPublisher, profile_id: i64, friend_id: i64) {
    let event = Event::new(
        SOURCE,
        routing_keys::SOCIAL_FRIEND_ADDED,
        payloads::FriendAdded { profile_id, friend_id },
    )
    .with_profile(profile_id);

    events.publish(routing_keys::SOCIAL_FRIEND_ADDED, event).await;
}

pub async fn publish_status_posted(events: &EventPublisher, status: &StatusMessage) {
    let event = Event::new(
        SOURCE,
        routing_keys::SOCIAL_STATUS_POSTED,
        payloads::StatusPosted {
            status_id: status.id,
            profile_id: status.profile_id,
            preview: status.message.chars().take(PREVIEW_CHARS).collect(),
        },
    )
    .with_profile(status.profile_id);

    events.publish(routing_keys::SOCIAL_STATUS_POSTED, event).await;
}
