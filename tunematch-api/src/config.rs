use serde::Deserialize;

use tunematch_core::{CandidateOptions, ExclusionPolicy, PreferenceLimits};

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    /// In-memory store when unset.
    #[serde(default)]
    pub database_url: Option<String>,
    #[serde(default = "default_db_pool_size")]
    pub db_pool_size: u32,
    /// Swipe cursors are kept in-process when unset.
    #[serde(default)]
    pub redis_url: Option<String>,
    /// Events are only logged when unset.
    #[serde(default)]
    pub rabbitmq_url: Option<String>,
    #[serde(default = "default_cursor_ttl")]
    pub cursor_ttl_secs: u64,
    #[serde(default = "default_max_genres")]
    pub max_genres: usize,
    #[serde(default = "default_max_songs")]
    pub max_songs: usize,
    #[serde(default)]
    pub exclusion_policy: ExclusionPolicy,
    #[serde(default)]
    pub require_genre_overlap: bool,
    #[serde(default = "default_metrics_enabled")]
    pub metrics_enabled: bool,
}

fn default_port() -> u16 { 3010 }
fn default_db_pool_size() -> u32 { 10 }
fn default_cursor_ttl() -> u64 { 86_400 }
fn default_max_genres() -> usize { 2 }
fn default_max_songs() -> usize { 4 }
fn default_metrics_enabled() -> bool { true }

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            database_url: None,
            db_pool_size: default_db_pool_size(),
            redis_url: None,
            rabbitmq_url: None,
            cursor_ttl_secs: default_cursor_ttl(),
            max_genres: default_max_genres(),
            max_songs: default_max_songs(),
            exclusion_policy: ExclusionPolicy::default(),
            require_genre_overlap: false,
            metrics_enabled: default_metrics_enabled(),
        }
    }
}

impl AppConfig {
    /// Read `TUNEMATCH_API__*` environment variables, e.g.
    /// `TUNEMATCH_API__DATABASE_URL` or `TUNEMATCH_API__EXCLUSION_POLICY=decided`.
    pub fn load() -> anyhow::Result<Self> {
        let config = config::Config::builder()
            .add_source(
                config::Environment::with_prefix("TUNEMATCH_API")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;
        Ok(config.try_deserialize()?)
    }

    pub fn preference_limits(&self) -> PreferenceLimits {
        PreferenceLimits {
            max_genres: self.max_genres,
            max_songs: self.max_songs,
        }
    }

    pub fn candidate_options(&self) -> CandidateOptions {
        CandidateOptions {
            exclusion: self.exclusion_policy,
            require_genre_overlap: self.require_genre_overlap,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_source_falls_back_to_defaults() {
        let config: AppConfig = config::Config::builder()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert_eq!(config.port, 3010);
        assert!(config.database_url.is_none());
        assert_eq!(config.preference_limits(), PreferenceLimits::default());
        assert_eq!(config.candidate_options(), CandidateOptions::default());
    }

    #[test]
    fn overrides_are_applied() {
        let config: AppConfig = config::Config::builder()
            .set_override("exclusion_policy", "decided")
            .unwrap()
            .set_override("max_genres", 3)
            .unwrap()
            .set_override("require_genre_overlap", true)
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert_eq!(config.exclusion_policy, ExclusionPolicy::Decided);
        assert_eq!(config.max_genres, 3);
        assert!(config.candidate_options().require_genre_overlap);
    }
}
