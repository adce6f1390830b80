use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use crate::models::{MatchPolicy, ScoringWeights};

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub embedding: EmbeddingSettings,
    #[serde(default)]
    pub cache: CacheSettings,
    #[serde(default)]
    pub catalog: CatalogSettings,
    #[serde(default)]
    pub scoring: ScoringSettings,
    #[serde(default)]
    pub matching: MatchingSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: Option<u32>,
    pub min_connections: Option<u32>,
    pub acquire_timeout_secs: Option<u64>,
    pub idle_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingSettings {
    pub endpoint: String,
    pub api_key: Option<String>,
    #[serde(default = "default_dimension")]
    pub dimension: usize,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_dimension() -> usize { 768 }
fn default_timeout_secs() -> u64 { 30 }

/// Redis is optional; without it embeddings are not cached
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CacheSettings {
    pub redis_url: Option<String>,
    pub ttl_secs: Option<u64>,
    pub l1_cache_size: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CatalogSource {
    #[default]
    Postgres,
    File,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogSettings {
    #[serde(default)]
    pub source: CatalogSource,
    /// JSON catalog path, required when `source = "file"`
    pub path: Option<PathBuf>,
    #[serde(default = "default_refresh_secs")]
    pub refresh_secs: u64,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            source: CatalogSource::default(),
            path: None,
            refresh_secs: default_refresh_secs(),
        }
    }
}

fn default_refresh_secs() -> u64 { 600 }

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScoringSettings {
    #[serde(default)]
    pub weights: WeightsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WeightsConfig {
    #[serde(default = "default_interest_weight")]
    pub interest: f64,
    #[serde(default = "default_grade_weight")]
    pub grade: f64,
    #[serde(default = "default_rating_weight")]
    pub rating: f64,
}

impl Default for WeightsConfig {
    fn default() -> Self {
        Self {
            interest: default_interest_weight(),
            grade: default_grade_weight(),
            rating: default_rating_weight(),
        }
    }
}

fn default_interest_weight() -> f64 { 0.7 }
fn default_grade_weight() -> f64 { 0.3 }
fn default_rating_weight() -> f64 { 0.3 }

impl From<&WeightsConfig> for ScoringWeights {
    fn from(config: &WeightsConfig) -> Self {
        Self {
            interest: config.interest,
            grade: config.grade,
            rating: config.rating,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MatchingSettings {
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    #[serde(default = "default_exact_limit")]
    pub exact_limit: usize,
    #[serde(default = "default_fallback_limit")]
    pub fallback_limit: usize,
    #[serde(default = "default_top_schools")]
    pub top_schools: usize,
}

impl Default for MatchingSettings {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            exact_limit: default_exact_limit(),
            fallback_limit: default_fallback_limit(),
            top_schools: default_top_schools(),
        }
    }
}

fn default_threshold() -> f64 { 0.4 }
fn default_exact_limit() -> usize { 10 }
fn default_fallback_limit() -> usize { 6 }
fn default_top_schools() -> usize { 5 }

impl From<&MatchingSettings> for MatchPolicy {
    fn from(settings: &MatchingSettings) -> Self {
        Self {
            threshold: settings.threshold,
            exact_limit: settings.exact_limit,
            fallback_limit: settings.fallback_limit,
            top_schools: settings.top_schools,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "json".to_string() }

impl Settings {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values in the struct
    /// 2. Configuration file (config/default.toml)
    /// 3. Local overrides (config/local.toml)
    /// 4. Environment variables (prefixed with PROGRAM_MATCH__)
    pub fn load() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // e.g., PROGRAM_MATCH__SERVER__PORT -> server.port
            .add_source(
                Environment::with_prefix("PROGRAM_MATCH")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        apply_env_overrides(settings)?.try_deserialize()
    }

    /// Load configuration from a custom path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(
                Environment::with_prefix("PROGRAM_MATCH")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize()
    }

    pub fn scoring_weights(&self) -> ScoringWeights {
        ScoringWeights::from(&self.scoring.weights)
    }

    pub fn match_policy(&self) -> MatchPolicy {
        MatchPolicy::from(&self.matching)
    }
}

/// Conventional unprefixed variables take precedence when set
fn apply_env_overrides(settings: Config) -> Result<Config, ConfigError> {
    use std::env;

    let mut builder = Config::builder().add_source(settings);

    if let Ok(database_url) = env::var("DATABASE_URL") {
        builder = builder.set_override("database.url", database_url)?;
    }
    if let Ok(redis_url) = env::var("REDIS_URL") {
        builder = builder.set_override("cache.redis_url", redis_url)?;
    }
    if let Ok(api_key) = env::var("EMBEDDING_API_KEY") {
        builder = builder.set_override("embedding.api_key", api_key)?;
    }

    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_weights() {
        let weights = ScoringWeights::from(&WeightsConfig::default());
        assert_eq!(weights, ScoringWeights::default());
        assert_eq!(weights.interest, 0.7);
        assert_eq!(weights.grade, 0.3);
        assert_eq!(weights.rating, 0.3);
    }

    #[test]
    fn test_default_matching() {
        let policy = MatchPolicy::from(&MatchingSettings::default());
        assert_eq!(policy, MatchPolicy::default());
    }

    #[test]
    fn test_default_logging() {
        let logging = LoggingSettings::default();
        assert_eq!(logging.level, "info");
        assert_eq!(logging.format, "json");
    }

    #[test]
    fn test_minimal_config_deserializes() {
        let settings: Settings = Config::builder()
            .set_override("server.host", "127.0.0.1").unwrap()
            .set_override("server.port", 8080).unwrap()
            .set_override("database.url", "postgres://localhost/test").unwrap()
            .set_override("embedding.endpoint", "http://localhost:8001/embed").unwrap()
            .set_override("catalog.source", "file").unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(settings.embedding.dimension, 768);
        assert_eq!(settings.catalog.source, CatalogSource::File);
        assert_eq!(settings.catalog.refresh_secs, 600);
        assert!(settings.cache.redis_url.is_none());
        assert_eq!(settings.match_policy().threshold, 0.4);
    }
}
