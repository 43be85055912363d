use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use tunematch_core::{CandidateOptions, MemoryStore, PreferenceLimits, Store};
use tunematch_shared::middleware::metrics_middleware;

pub mod config;
pub mod cursors;
pub mod events;
pub mod routes;

use config::AppConfig;
use cursors::CursorStore;
use events::EventPublisher;

pub struct AppState {
    pub store: Arc<dyn Store>,
    pub config: AppConfig,
    pub cursors: CursorStore,
    pub events: EventPublisher,
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// Everything in-process: memory store, memory cursors, logged events.
    pub fn in_memory(config: AppConfig) -> Self {
        Self {
            store: Arc::new(MemoryStore::new()),
            config,
            cursors: CursorStore::memory(),
            events: EventPublisher::Log,
            metrics: None,
        }
    }

    pub fn limits(&self) -> PreferenceLimits {
        self.config.preference_limits()
    }

    pub fn candidate_options(&self) -> CandidateOptions {
        self.config.candidate_options()
    }
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/metrics", get(routes::health::metrics))
        // Profiles
        .route("/profiles", get(routes::profiles::list_profiles).post(routes::profiles::create_profile))
        .route(
            "/profiles/:id",
            get(routes::profiles::get_profile)
                .patch(routes::profiles::update_profile)
                .delete(routes::profiles::delete_profile),
        )
        .route("/profiles/:id/statuses", get(routes::statuses::list_statuses))
        // Catalog
        .route("/genres", get(routes::catalog::genre_options).post(routes::catalog::create_genre))
        .route("/songs", get(routes::catalog::search_songs).post(routes::catalog::create_song))
        .route("/songs/:id", get(routes::catalog::song_detail))
        // Viewer preferences
        .route("/me/genres", get(routes::preferences::my_genres))
        .route(
            "/me/genres/:id",
            post(routes::preferences::add_genre).delete(routes::preferences::remove_genre),
        )
        .route("/me/songs", get(routes::preferences::my_songs))
        .route(
            "/me/songs/:id",
            post(routes::preferences::add_song).delete(routes::preferences::remove_song),
        )
        // Swipe
        .route("/swipe", get(routes::swipe::next_candidate))
        .route("/swipe/like/:id", post(routes::swipe::like))
        .route("/swipe/pass/:id", post(routes::swipe::pass))
        .route("/matches", get(routes::swipe::list_matches))
        // Social
        .route("/friends", get(routes::friends::list_friends))
        .route("/friends/suggestions", get(routes::friends::suggestions))
        .route("/friends/:id", post(routes::friends::add_friend))
        .route("/feed", get(routes::friends::news_feed))
        .route("/statuses", post(routes::statuses::post_status))
        .route("/statuses/:id", axum::routing::delete(routes::statuses::delete_status))
        .route_layer(axum::middleware::from_fn(metrics_middleware))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
