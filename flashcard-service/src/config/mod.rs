use secrecy::SecretString;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Default Gemini model used for flashcard extraction and chat.
const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Default Gemini REST endpoint (without API version).
const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com";

/// Default upper bound on an uploaded media file (100MB).
const DEFAULT_MAX_UPLOAD_BYTES: usize = 100 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct FlashcardConfig {
    pub common: core_config::Config,
    pub gemini: GeminiSettings,
    pub media: MediaConfig,
    pub gateway: GatewayConfig,
    pub session: SessionConfig,
}

#[derive(Debug, Clone)]
pub struct GeminiSettings {
    /// Read once at startup. An empty key is accepted and only fails on the
    /// first provider call.
    pub api_key: SecretString,
    pub model: String,
    pub api_base: String,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct MediaConfig {
    /// Directory that holds uploads while they are sent to the provider.
    pub temp_dir: PathBuf,
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Total attempts for a conversation request, first try included.
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub poll_interval_ms: u64,
    pub poll_max_attempts: u32,
}

impl GatewayConfig {
    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff_ms: 1_000,
            poll_interval_ms: 2_000,
            poll_max_attempts: 150,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Upper bound on sessions held in memory.
    pub max_sessions: usize,
    /// Sessions untouched for longer than this are evicted.
    pub idle_ttl_secs: u64,
}

impl SessionConfig {
    pub fn idle_ttl(&self) -> Duration {
        Duration::from_secs(self.idle_ttl_secs)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_sessions: 10_000,
            idle_ttl_secs: 24 * 60 * 60,
        }
    }
}

impl FlashcardConfig {
    pub fn load() -> Result<Self, AppError> {
        let common_config = core_config::Config::load()?;
        let is_prod = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string()) == "prod";
        let gateway_defaults = GatewayConfig::default();
        let session_defaults = SessionConfig::default();

        Ok(FlashcardConfig {
            common: common_config,
            gemini: GeminiSettings {
                api_key: SecretString::new(get_env("GEMINI_API_KEY", Some(""), is_prod)?),
                model: get_env("GEMINI_MODEL", Some(DEFAULT_MODEL), is_prod)?,
                api_base: get_env("GEMINI_API_BASE", Some(DEFAULT_API_BASE), is_prod)?,
                request_timeout_secs: parse_env("GEMINI_REQUEST_TIMEOUT_SECS", 120)?,
            },
            media: MediaConfig {
                temp_dir: env::var("MEDIA_TEMP_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| env::temp_dir()),
                max_upload_bytes: parse_env(
                    "MEDIA_MAX_UPLOAD_BYTES",
                    DEFAULT_MAX_UPLOAD_BYTES,
                )?,
            },
            gateway: GatewayConfig {
                max_attempts: parse_env(
                    "GATEWAY_MAX_ATTEMPTS",
                    gateway_defaults.max_attempts,
                )?,
                initial_backoff_ms: parse_env(
                    "GATEWAY_INITIAL_BACKOFF_MS",
                    gateway_defaults.initial_backoff_ms,
                )?,
                poll_interval_ms: parse_env(
                    "GATEWAY_POLL_INTERVAL_MS",
                    gateway_defaults.poll_interval_ms,
                )?,
                poll_max_attempts: parse_env(
                    "GATEWAY_POLL_MAX_ATTEMPTS",
                    gateway_defaults.poll_max_attempts,
                )?,
            },
            session: SessionConfig {
                max_sessions: parse_env("SESSION_MAX_ENTRIES", session_defaults.max_sessions)?,
                idle_ttl_secs: parse_env(
                    "SESSION_IDLE_TTL_SECS",
                    session_defaults.idle_ttl_secs,
                )?,
            },
        })
    }
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required in production but not set",
                    key
                )))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required but not set",
                    key
                )))
            }
        }
    }
}

/// Numeric settings fall back to their default in every environment; a value
/// that is set but unparsable is a configuration error.
fn parse_env<T>(key: &str, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(val) => val.trim().parse().map_err(|e: T::Err| {
            AppError::ConfigError(anyhow::anyhow!("{} has invalid value '{}': {}", key, val, e))
        }),
        Err(_) => Ok(default),
    }
}
