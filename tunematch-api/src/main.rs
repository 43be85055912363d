use std::sync::Arc;

use tunematch_api::config::AppConfig;
use tunematch_api::cursors::CursorStore;
use tunematch_api::events::EventPublisher;
use tunematch_api::{build_router, AppState};
use tunematch_core::{MemoryStore, PgStore, Store};
use tunematch_shared::clients::db::create_pool;
use tunematch_shared::clients::rabbitmq::RabbitMQClient;
use tunematch_shared::clients::redis::RedisClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tunematch_shared::middleware::init_tracing("tunematch-api");

    let config = AppConfig::load()?;
    let port = config.port;

    let store: Arc<dyn Store> = match &config.database_url {
        Some(url) => Arc::new(PgStore::new(create_pool(url, config.db_pool_size)?)),
        None => {
            tracing::warn!("no database_url configured, data lives in memory only");
            Arc::new(MemoryStore::new())
        }
    };

    let cursors = match &config.redis_url {
        Some(url) => CursorStore::redis(RedisClient::connect(url).await?, config.cursor_ttl_secs),
        None => CursorStore::memory(),
    };

    let events = match &config.rabbitmq_url {
        Some(url) => EventPublisher::RabbitMq(RabbitMQClient::connect(url).await?),
        None => EventPublisher::Log,
    };

    let metrics = if config.metrics_enabled {
        Some(tunematch_shared::middleware::init_metrics()?)
    } else {
        None
    };

    tracing::info!(
        store = store.backend(),
        cursors = cursors.backend(),
        events = events.backend(),
        exclusion = ?config.exclusion_policy,
        "backends selected"
    );

    let state = Arc::new(AppState { store, config, cursors, events, metrics });
    let app = build_router(state);

    let addr = format!("0.0.0.0:{port}");
    tracing::info!(addr = %addr, "tunematch-api starting");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
