//! Configuration types for channel-scout

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, time::Duration};

/// Largest channel batch the YouTube Data API accepts in one `channels.list` call
pub const PROVIDER_MAX_BATCH: usize = 50;

/// Main configuration for ChannelHarvester
///
/// Fields are organized into logical sub-configs:
/// - [`youtube`](YoutubeConfig) - upstream API access
/// - [`rate_limit`](RateLimitConfig) - request budgets and backoff
/// - [`retry`](RetryConfig) - transient failure retries
/// - [`cache`](CacheConfig) - channel cache backing store
/// - [`tasks`](TaskConfig) - task admission and enrichment limits
/// - [`server`](ServerIntegrationConfig) - REST API
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Upstream content API settings
    #[serde(default)]
    pub youtube: YoutubeConfig,

    /// Request budgets shared by every task
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Retry policy for transient upstream failures
    #[serde(default)]
    pub retry: RetryConfig,

    /// Channel cache settings
    #[serde(default)]
    pub cache: CacheConfig,

    /// Task limits
    #[serde(default)]
    pub tasks: TaskConfig,

    /// API and external server integration
    #[serde(default)]
    pub server: ServerIntegrationConfig,
}

impl Config {
    /// Build a configuration from environment variables on top of the defaults
    ///
    /// Recognized variables:
    /// - `YOUTUBE_API_KEY`, `YOUTUBE_API_BASE_URL`
    /// - `REDIS_URL`, or `REDIS_HOST` / `REDIS_PORT` / `REDIS_PASSWORD` / `REDIS_DB`
    /// - `PORT` (API listens on 0.0.0.0:PORT)
    /// - `MAX_ACTIVE_TASKS`, `REQUESTS_PER_MINUTE`, `REQUESTS_PER_DAY`
    pub fn from_env() -> Result<Self> {
        let mut config = Config::default();

        if let Some(key) = env_var("YOUTUBE_API_KEY") {
            config.youtube.api_key = key;
        }
        if let Some(base_url) = env_var("YOUTUBE_API_BASE_URL") {
            config.youtube.base_url = base_url;
        }

        config.cache.redis_url = redis_url_from_env();

        if let Some(port) = env_var("PORT") {
            let port: u16 = port
                .parse()
                .map_err(|_| Error::config("PORT", format!("invalid port '{port}'")))?;
            config.server.api.bind_address = SocketAddr::from(([0, 0, 0, 0], port));
        }
        if let Some(limit) = env_parse::<usize>("MAX_ACTIVE_TASKS")? {
            config.tasks.max_active_tasks = limit;
        }
        if let Some(rpm) = env_parse::<u32>("REQUESTS_PER_MINUTE")? {
            config.rate_limit.requests_per_minute = rpm;
        }
        if let Some(rpd) = env_parse::<u32>("REQUESTS_PER_DAY")? {
            config.rate_limit.requests_per_day = rpd;
        }

        config.validate()?;
        Ok(config)
    }

    /// Check the configuration for values the engine cannot work with
    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.youtube.base_url).map_err(|e| {
            Error::config(
                "youtube.base_url",
                format!("invalid URL '{}': {}", self.youtube.base_url, e),
            )
        })?;

        if !(1..=PROVIDER_MAX_BATCH).contains(&self.youtube.search_page_size) {
            return Err(Error::config(
                "youtube.search_page_size",
                format!("must be between 1 and {PROVIDER_MAX_BATCH}"),
            ));
        }
        if !(1..=PROVIDER_MAX_BATCH).contains(&self.tasks.detail_batch_size) {
            return Err(Error::config(
                "tasks.detail_batch_size",
                format!("must be between 1 and {PROVIDER_MAX_BATCH}"),
            ));
        }
        if self.rate_limit.requests_per_minute == 0 {
            return Err(Error::config(
                "rate_limit.requests_per_minute",
                "must be greater than zero",
            ));
        }
        if self.rate_limit.requests_per_day == 0 {
            return Err(Error::config(
                "rate_limit.requests_per_day",
                "must be greater than zero",
            ));
        }
        if self.tasks.max_active_tasks == 0 {
            return Err(Error::config(
                "tasks.max_active_tasks",
                "must be greater than zero",
            ));
        }
        if self.tasks.max_target_count == 0 {
            return Err(Error::config(
                "tasks.max_target_count",
                "must be greater than zero",
            ));
        }
        if self.tasks.max_discovered_channels == 0 {
            return Err(Error::config(
                "tasks.max_discovered_channels",
                "must be greater than zero",
            ));
        }
        let multiplier = self.retry.backoff_multiplier;
        if !(multiplier.is_finite() && multiplier > 0.0) {
            return Err(Error::config(
                "retry.backoff_multiplier",
                format!("must be a positive number, got {multiplier}"),
            ));
        }
        Ok(())
    }
}

/// YouTube Data API access
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct YoutubeConfig {
    /// API key (never logged)
    #[serde(default)]
    pub api_key: String,

    /// API root (default: "https://www.googleapis.com/youtube/v3")
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout (default: 10 seconds)
    #[serde(default = "default_request_timeout", with = "duration_serde")]
    pub request_timeout: Duration,

    /// Results per search page (default: 20)
    #[serde(default = "default_search_page_size")]
    pub search_page_size: usize,
}

impl Default for YoutubeConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_base_url(),
            request_timeout: default_request_timeout(),
            search_page_size: default_search_page_size(),
        }
    }
}

/// Request budgets and pacing for the shared rate governor
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Upstream requests allowed per rolling minute (default: 100)
    #[serde(default = "default_requests_per_minute")]
    pub requests_per_minute: u32,

    /// Upstream requests allowed per rolling day (default: 10000)
    #[serde(default = "default_requests_per_day")]
    pub requests_per_day: u32,

    /// Minimum spacing between requests before backoff (default: 200 ms)
    #[serde(default = "default_base_delay", with = "millis_serde")]
    pub base_delay: Duration,

    /// Cap on the backoff exponent after consecutive failures (default: 5)
    #[serde(default = "default_max_backoff_exponent")]
    pub max_backoff_exponent: u32,

    /// Extra pause after the provider reports quota or rate exhaustion (default: 90 seconds)
    #[serde(default = "default_quota_cooldown", with = "duration_serde")]
    pub quota_cooldown: Duration,

    /// Quota cooldowns tolerated for one call before the task fails (default: 5)
    #[serde(default = "default_max_quota_retries")]
    pub max_quota_retries: u32,

    /// Fraction of the daily budget after which a quota warning is reported (default: 0.8)
    #[serde(default = "default_quota_warning_ratio")]
    pub quota_warning_ratio: f64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_minute: default_requests_per_minute(),
            requests_per_day: default_requests_per_day(),
            base_delay: default_base_delay(),
            max_backoff_exponent: default_max_backoff_exponent(),
            quota_cooldown: default_quota_cooldown(),
            max_quota_retries: default_max_quota_retries(),
            quota_warning_ratio: default_quota_warning_ratio(),
        }
    }
}

/// Retry configuration for transient failures
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (default: 3)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Initial delay before first retry (default: 1 second)
    #[serde(default = "default_initial_delay", with = "duration_serde")]
    pub initial_delay: Duration,

    /// Maximum delay between retries (default: 30 seconds)
    #[serde(default = "default_max_delay", with = "duration_serde")]
    pub max_delay: Duration,

    /// Multiplier for exponential backoff (default: 2.0)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Add random jitter to delays (default: true)
    #[serde(default = "default_true")]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay: default_initial_delay(),
            max_delay: default_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: true,
        }
    }
}

/// Channel cache configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Redis connection URL; `None` keeps the cache in-process only
    #[serde(default)]
    pub redis_url: Option<String>,

    /// Entry lifetime (default: 24 hours)
    #[serde(default = "default_cache_ttl", with = "duration_serde")]
    pub ttl: Duration,

    /// Prefix for every Redis key (default: "yt")
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,

    /// How long to wait for the backing store before degrading (default: 2 seconds)
    #[serde(default = "default_connect_timeout", with = "duration_serde")]
    pub connect_timeout: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            redis_url: None,
            ttl: default_cache_ttl(),
            key_prefix: default_key_prefix(),
            connect_timeout: default_connect_timeout(),
        }
    }
}

/// Task admission and enrichment limits
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TaskConfig {
    /// Running tasks allowed at once (default: 10)
    #[serde(default = "default_max_active_tasks")]
    pub max_active_tasks: usize,

    /// Largest target count a task may request (default: 5000)
    #[serde(default = "default_max_target_count")]
    pub max_target_count: usize,

    /// Channels per detail lookup, kept below the provider max to save quota (default: 25)
    #[serde(default = "default_detail_batch_size")]
    pub detail_batch_size: usize,

    /// Discovered channel ceiling per task, counted regardless of filter outcome (default: 2000)
    #[serde(default = "default_max_discovered_channels")]
    pub max_discovered_channels: usize,
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self {
            max_active_tasks: default_max_active_tasks(),
            max_target_count: default_max_target_count(),
            detail_batch_size: default_detail_batch_size(),
            max_discovered_channels: default_max_discovered_channels(),
        }
    }
}

/// API and external server integration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ServerIntegrationConfig {
    /// REST API configuration
    #[serde(default)]
    pub api: ApiConfig,
}

/// REST API configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Address to bind to (default: 0.0.0.0:5432)
    #[serde(default = "default_bind_address")]
    pub bind_address: SocketAddr,

    /// Enable CORS for browser access (default: true)
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// Allowed CORS origins (default: ["*"])
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// Enable Swagger UI at /swagger-ui (default: true)
    #[serde(default = "default_true")]
    pub swagger_ui: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            cors_enabled: true,
            cors_origins: default_cors_origins(),
            swagger_ui: true,
        }
    }
}

// Default value functions
fn default_base_url() -> String {
    "https://www.googleapis.com/youtube/v3".into()
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_search_page_size() -> usize {
    20
}

fn default_requests_per_minute() -> u32 {
    100
}

fn default_requests_per_day() -> u32 {
    10_000
}

fn default_base_delay() -> Duration {
    Duration::from_millis(200)
}

fn default_max_backoff_exponent() -> u32 {
    5
}

fn default_quota_cooldown() -> Duration {
    Duration::from_secs(90)
}

fn default_max_quota_retries() -> u32 {
    5
}

fn default_quota_warning_ratio() -> f64 {
    0.8
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(30)
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_cache_ttl() -> Duration {
    Duration::from_secs(24 * 60 * 60)
}

fn default_key_prefix() -> String {
    "yt".into()
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(2)
}

fn default_max_active_tasks() -> usize {
    10
}

fn default_max_target_count() -> usize {
    5000
}

fn default_detail_batch_size() -> usize {
    25
}

fn default_max_discovered_channels() -> usize {
    2000
}

fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 5432))
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".into()]
}

fn default_true() -> bool {
    true
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Result<Option<T>> {
    match env_var(name) {
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| Error::config(name, format!("invalid value '{raw}'"))),
        None => Ok(None),
    }
}

fn redis_url_from_env() -> Option<String> {
    if let Some(url) = env_var("REDIS_URL") {
        return Some(url);
    }
    let host = env_var("REDIS_HOST")?;
    let port = env_var("REDIS_PORT").unwrap_or_else(|| "6379".into());
    let db = env_var("REDIS_DB").unwrap_or_else(|| "0".into());
    Some(match env_var("REDIS_PASSWORD") {
        Some(password) => format!("redis://:{password}@{host}:{port}/{db}"),
        None => format!("redis://{host}:{port}/{db}"),
    })
}

// Duration serialization helper
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

// Millisecond Duration serialization helper (sub-second pacing values)
mod millis_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
