//! Settings structures for Underfoot configuration

use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

/// Main settings structure loaded from settings.yml
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub outgoing: OutgoingSettings,
    pub cache: CacheSettings,
    pub scoring: ScoringSettings,
    pub query: QuerySettings,
    pub providers: Vec<ProviderConfig>,
    pub openai: Option<OpenAiSettings>,
    pub supabase: Option<SupabaseSettings>,
    pub geoapify: Option<GeoapifySettings>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerSettings::default(),
            outgoing: OutgoingSettings::default(),
            cache: CacheSettings::default(),
            scoring: ScoringSettings::default(),
            query: QuerySettings::default(),
            providers: default_providers(),
            openai: None,
            supabase: None,
            geoapify: None,
        }
    }
}

impl Settings {
    /// Load settings from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let settings: Settings = serde_yaml::from_str(&content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reject values that would produce zero TTLs, zero intervals or
    /// unusable timeouts
    pub fn validate(&self) -> Result<()> {
        ensure_seconds("outgoing.request_timeout", self.outgoing.request_timeout)?;
        ensure_seconds("outgoing.max_request_timeout", self.outgoing.max_request_timeout)?;
        for provider in &self.providers {
            if let Some(timeout) = provider.timeout {
                ensure_seconds(&format!("providers.{}.timeout", provider.name), timeout)?;
            }
        }

        let cache = &self.cache;
        ensure_seconds("cache.embedding_timeout", cache.embedding_timeout)?;
        let positive = [
            ("cache.default_ttl_minutes", cache.default_ttl_minutes),
            ("cache.popular_ttl_minutes", cache.popular_ttl_minutes),
            ("cache.location_ttl_hours", cache.location_ttl_hours),
            ("cache.cleanup_interval_hours", cache.cleanup_interval_hours),
            ("cache.memory_sweep_interval_secs", cache.memory_sweep_interval_secs),
            ("cache.memory_capacity", cache.memory_capacity),
        ];
        for (name, value) in positive {
            ensure!(value > 0, "{} must be greater than zero", name);
        }
        ensure!(
            (0.0..=1.0).contains(&cache.similarity_threshold),
            "cache.similarity_threshold must be between 0 and 1, got {}",
            cache.similarity_threshold
        );
        Ok(())
    }

    /// Overlay secrets and server overrides from the environment
    pub fn merge_env(&mut self) {
        if let Ok(val) = std::env::var("UNDERFOOT_PORT") {
            if let Ok(port) = val.parse() {
                self.server.port = port;
            }
        }
        if let Ok(val) = std::env::var("UNDERFOOT_BIND_ADDRESS") {
            self.server.bind_address = val;
        }
        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            self.openai.get_or_insert_with(OpenAiSettings::default).api_key = key;
        }
        if let Ok(key) = std::env::var("GEOAPIFY_API_KEY") {
            self.geoapify
                .get_or_insert_with(GeoapifySettings::default)
                .api_key = key;
        }
        if let (Ok(url), Ok(key)) = (
            std::env::var("SUPABASE_URL"),
            std::env::var("SUPABASE_SERVICE_ROLE_KEY"),
        ) {
            self.supabase = Some(SupabaseSettings { url, api_key: key });
        }

        let provider_keys = [("serpapi", "SERPAPI_KEY"), ("eventbrite", "EVENTBRITE_TOKEN")];
        for (provider, var) in provider_keys {
            if let Ok(key) = std::env::var(var) {
                if let Some(config) = self.providers.iter_mut().find(|p| p.provider == provider) {
                    config.api_key = Some(key);
                }
            }
        }
    }

    /// Get provider config by name
    pub fn get_provider(&self, name: &str) -> Option<&ProviderConfig> {
        self.providers.iter().find(|p| p.name == name)
    }

    /// Get all enabled providers
    pub fn enabled_providers(&self) -> Vec<&ProviderConfig> {
        self.providers.iter().filter(|p| !p.disabled).collect()
    }
}

/// Server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Server port
    pub port: u16,
    /// Bind address
    pub bind_address: String,
    /// Expose the /api/cache administrative routes
    pub admin_routes: bool,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            port: 3000,
            bind_address: "127.0.0.1".to_string(),
            admin_routes: true,
        }
    }
}

/// Outgoing request settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutgoingSettings {
    /// Default request timeout in seconds
    pub request_timeout: f64,
    /// Upper bound for any per-provider timeout
    pub max_request_timeout: f64,
    /// User agent sent with every outgoing request
    pub user_agent: String,
    /// Pool max idle connections per host
    pub pool_maxsize: usize,
    /// Extra headers to send
    pub extra_headers: HashMap<String, String>,
}

impl Default for OutgoingSettings {
    fn default() -> Self {
        Self {
            request_timeout: 15.0,
            max_request_timeout: 30.0,
            user_agent: "Underfoot/1.0 (Travel Discovery Bot)".to_string(),
            pool_maxsize: 20,
            extra_headers: HashMap::new(),
        }
    }
}

impl OutgoingSettings {
    pub fn default_timeout(&self) -> Duration {
        seconds_or(self.request_timeout, 15.0)
    }

    pub fn max_timeout(&self) -> Duration {
        seconds_or(self.max_request_timeout, 30.0)
    }
}

/// Cache hierarchy tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Minimum similarity for a semantic hit
    pub similarity_threshold: f32,
    /// Number of semantic candidates requested from the store
    pub max_cache_results: usize,
    /// TTL for ordinary queries
    pub default_ttl_minutes: u64,
    /// TTL for queries whose query or location has been popular before
    pub popular_ttl_minutes: u64,
    /// Access count at which a query or location counts as popular
    pub popularity_threshold: u64,
    /// TTL for resolved locations
    pub location_ttl_hours: u64,
    /// Timeout for a single embedding call, in seconds
    pub embedding_timeout: f64,
    /// Number of popular queries inspected per warming pass
    pub warmup_batch_size: usize,
    /// Delay before a warming pass starts
    pub warmup_delay_ms: u64,
    /// Pause between warming checks
    pub warmup_step_ms: u64,
    /// Minimum access count for a query to be considered for warming
    pub warmup_min_access: u64,
    /// Interval of the persistent cleanup sweep
    pub cleanup_interval_hours: u64,
    /// Interval of the memory-tier purge
    pub memory_sweep_interval_secs: u64,
    /// Total persistent rows above which eviction kicks in
    pub max_cache_size: u64,
    /// Rows deleted per eviction pass
    pub eviction_batch_size: usize,
    /// Rows with fewer accesses than this are eviction candidates
    pub eviction_max_access: u64,
    /// Rows untouched for this many days are eviction candidates
    pub eviction_stale_days: i64,
    /// Capacity of the in-process memory tier
    pub memory_capacity: u64,
    /// Lookups slower than this are logged
    pub slow_lookup_ms: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.85,
            max_cache_results: 5,
            default_ttl_minutes: 30,
            popular_ttl_minutes: 120,
            popularity_threshold: 5,
            location_ttl_hours: 24,
            embedding_timeout: 5.0,
            warmup_batch_size: 5,
            warmup_delay_ms: 1000,
            warmup_step_ms: 100,
            warmup_min_access: 2,
            cleanup_interval_hours: 6,
            memory_sweep_interval_secs: 300,
            max_cache_size: 10_000,
            eviction_batch_size: 100,
            eviction_max_access: 2,
            eviction_stale_days: 7,
            memory_capacity: 10_000,
            slow_lookup_ms: 1000,
        }
    }
}

impl CacheSettings {
    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_minutes * 60)
    }

    pub fn popular_ttl(&self) -> Duration {
        Duration::from_secs(self.popular_ttl_minutes * 60)
    }

    pub fn location_ttl(&self) -> Duration {
        Duration::from_secs(self.location_ttl_hours * 3600)
    }

    pub fn embedding_timeout(&self) -> Duration {
        seconds_or(self.embedding_timeout, 5.0)
    }
}

fn ensure_seconds(name: &str, value: f64) -> Result<()> {
    ensure!(
        value.is_finite() && value > 0.0,
        "{} must be a positive number of seconds, got {}",
        name,
        value
    );
    Ok(())
}

/// Seconds as a duration, or `fallback` when the value is not a positive
/// finite number
pub(crate) fn seconds_or(value: f64, fallback: f64) -> Duration {
    match Duration::try_from_secs_f64(value) {
        Ok(duration) if !duration.is_zero() => duration,
        _ => Duration::from_secs_f64(fallback),
    }
}

/// Scoring weights and categorization limits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringSettings {
    pub relevance_weight: f64,
    pub distance_weight: f64,
    pub app_fit_weight: f64,
    /// Radius (miles) separating primary from nearby results
    pub core_radius_mi: f64,
    pub max_primary: usize,
    pub max_nearby: usize,
    /// Primary is topped up from nearby until it holds this many
    pub min_primary: usize,
}

impl Default for ScoringSettings {
    fn default() -> Self {
        Self {
            relevance_weight: 0.5,
            distance_weight: 0.2,
            app_fit_weight: 0.3,
            core_radius_mi: 15.0,
            max_primary: 5,
            max_nearby: 2,
            min_primary: 3,
        }
    }
}

/// Free-text parsing confidence defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QuerySettings {
    /// Confidence reported for a successful model parse
    pub llm_confidence: f64,
    /// Confidence reported by the keyword/regex fallback
    pub heuristic_confidence: f64,
    /// Intent used when no intent keyword is recognised
    pub default_intent: String,
}

impl Default for QuerySettings {
    fn default() -> Self {
        Self {
            llm_confidence: 0.9,
            heuristic_confidence: 0.6,
            default_intent: "hidden gems".to_string(),
        }
    }
}

/// Individual content provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Provider name (unique identifier)
    pub name: String,
    /// Provider implementation to use
    pub provider: String,
    /// Whether provider is disabled
    pub disabled: bool,
    /// Custom timeout for this provider, in seconds
    pub timeout: Option<f64>,
    /// API key or bearer token if required
    pub api_key: Option<String>,
    /// Override of the provider's base URL
    pub base_url: Option<String>,
    /// Maximum results requested
    pub limit: u32,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            provider: String::new(),
            disabled: false,
            timeout: None,
            api_key: None,
            base_url: None,
            limit: 10,
        }
    }
}

/// OpenAI-compatible API settings (chat + embeddings)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiSettings {
    pub api_key: String,
    pub base_url: String,
    pub chat_model: String,
    pub embedding_model: String,
    /// Compose replies with the chat model instead of the template
    pub compose_responses: bool,
}

impl Default for OpenAiSettings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.openai.com/v1".to_string(),
            chat_model: "gpt-4o-mini".to_string(),
            embedding_model: "text-embedding-ada-002".to_string(),
            compose_responses: true,
        }
    }
}

/// Supabase (PostgREST) connection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupabaseSettings {
    pub url: String,
    pub api_key: String,
}

/// Geoapify geocoder settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeoapifySettings {
    pub api_key: String,
    pub base_url: String,
}

impl Default for GeoapifySettings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.geoapify.com/v1/geocode/search".to_string(),
        }
    }
}

/// Default provider configurations
fn default_providers() -> Vec<ProviderConfig> {
    vec![
        ProviderConfig {
            name: "serpapi".to_string(),
            provider: "serpapi".to_string(),
            ..Default::default()
        },
        ProviderConfig {
            name: "reddit".to_string(),
            provider: "reddit".to_string(),
            limit: 25,
            ..Default::default()
        },
        ProviderConfig {
            name: "eventbrite".to_string(),
            provider: "eventbrite".to_string(),
            limit: 20,
            ..Default::default()
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.server.port, 3000);
        assert_eq!(settings.providers.len(), 3);
        assert_eq!(settings.cache.similarity_threshold, 0.85);
        assert_eq!(settings.cache.default_ttl(), Duration::from_secs(30 * 60));
        assert_eq!(settings.cache.popular_ttl(), Duration::from_secs(120 * 60));
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = r#"
cache:
  similarity_threshold: 0.9
  warmup_batch_size: 3
scoring:
  core_radius_mi: 10
providers:
  - name: reddit
    provider: reddit
    timeout: 4.5
"#;
        let settings: Settings = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(settings.cache.similarity_threshold, 0.9);
        assert_eq!(settings.cache.warmup_batch_size, 3);
        assert_eq!(settings.cache.default_ttl_minutes, 30);
        assert_eq!(settings.scoring.core_radius_mi, 10.0);
        assert_eq!(settings.scoring.relevance_weight, 0.5);
        assert_eq!(settings.providers.len(), 1);
        assert_eq!(settings.providers[0].timeout, Some(4.5));
        assert_eq!(settings.providers[0].limit, 10);
    }

    #[test]
    fn test_validate_rejects_zero_and_negative_values() {
        assert!(Settings::default().validate().is_ok());

        let mut settings = Settings::default();
        settings.cache.default_ttl_minutes = 0;
        let err = settings.validate().unwrap_err();
        assert!(err.to_string().contains("cache.default_ttl_minutes"));

        let mut settings = Settings::default();
        settings.cache.memory_sweep_interval_secs = 0;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.outgoing.request_timeout = -1.0;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.cache.embedding_timeout = f64::NAN;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.providers[0].timeout = Some(0.0);
        let err = settings.validate().unwrap_err();
        assert!(err.to_string().contains("providers.serpapi.timeout"));
    }

    #[test]
    fn test_from_file_validates() {
        let path = std::env::temp_dir().join(format!("underfoot-{}.yml", uuid::Uuid::new_v4()));
        std::fs::write(&path, "cache:\n  cleanup_interval_hours: 0\n").unwrap();
        let result = Settings::from_file(&path);
        std::fs::remove_file(&path).unwrap();

        let err = result.unwrap_err();
        assert!(err.to_string().contains("cache.cleanup_interval_hours"));
    }

    #[test]
    fn test_bad_timeouts_fall_back_instead_of_panicking() {
        let mut settings = Settings::default();
        settings.outgoing.request_timeout = -3.0;
        settings.outgoing.max_request_timeout = f64::INFINITY;
        settings.cache.embedding_timeout = 0.0;

        assert_eq!(settings.outgoing.default_timeout(), Duration::from_secs(15));
        assert_eq!(settings.outgoing.max_timeout(), Duration::from_secs(30));
        assert_eq!(settings.cache.embedding_timeout(), Duration::from_secs(5));
        assert_eq!(seconds_or(2.5, 1.0), Duration::from_millis(2500));
    }

    #[test]
    fn test_provider_lookup() {
        let settings = Settings::default();
        let reddit = settings.get_provider("reddit");
        assert!(reddit.is_some());
        assert_eq!(reddit.unwrap().limit, 25);
        assert_eq!(settings.enabled_providers().len(), 3);
    }
}
