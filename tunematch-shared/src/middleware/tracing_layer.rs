use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global subscriber. JSON output is used when
/// `TUNEMATCH_ENV=production`, human-readable output otherwise.
pub fn init_tracing(service_name: &str) {
    let crate_target = service_name.replace('-', "_");
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "info,{crate_target}=debug,tunematch_core=debug,tower_http=debug"
        ))
    });

    let is_production = std::env::var("TUNEMATCH_ENV")
        .map(|v| v == "production")
        .unwrap_or(false);

    let result = if is_production {
        let json_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(json_layer)
            .try_init()
    } else {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_file(true)
            .with_line_number(true);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()
    };

    match result {
        Ok(()) => tracing::info!(service = service_name, "tracing initialized"),
        Err(e) => tracing::warn!(error = %e, "global subscriber already installed"),
    }
}
