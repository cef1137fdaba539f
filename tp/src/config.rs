//! TripPlanner configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main TripPlanner configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// LLM provider configuration
    pub llm: LlmConfig,

    /// Planning loop thresholds and bounds
    pub planner: PlannerConfig,

    /// Travel data gateway limits
    pub gateway: GatewayConfig,

    /// Storage configuration
    pub storage: StorageConfig,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR); CLI flag wins over this
    #[serde(rename = "log-level")]
    pub log_level: Option<String>,
}

impl Config {
    /// Validate configuration before use
    ///
    /// Call this early in startup to fail fast with clear error messages.
    pub fn validate(&self) -> Result<()> {
        if self.planner.confidence_threshold_medium > self.planner.confidence_threshold_high {
            return Err(eyre::eyre!(
                "confidence-threshold-medium ({}) must not exceed confidence-threshold-high ({})",
                self.planner.confidence_threshold_medium,
                self.planner.confidence_threshold_high
            ));
        }
        Ok(())
    }

    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .tripplanner.yml
        let local_config = PathBuf::from(".tripplanner.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/tripplanner/tripplanner.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("tripplanner").join("tripplanner.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        // No config file found, use defaults
        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Best-effort read of just the configured log level
    ///
    /// Runs before logging is initialized, so load failures read as `None`
    /// here; the real `load` reports them once logging is up.
    pub fn load_log_level(config_path: Option<&PathBuf>) -> Option<String> {
        Self::load(config_path).ok().and_then(|config| config.log_level)
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// LLM provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider name (currently only "anthropic" supported)
    pub provider: String,

    /// Model identifier
    pub model: String,

    /// Environment variable containing the API key
    #[serde(rename = "api-key-env")]
    pub api_key_env: String,

    /// API base URL
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Maximum tokens per response
    #[serde(rename = "max-tokens")]
    pub max_tokens: u32,

    /// Request timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "anthropic".to_string(),
            model: "claude-sonnet-4-20250514".to_string(),
            api_key_env: "ANTHROPIC_API_KEY".to_string(),
            base_url: "https://api.anthropic.com".to_string(),
            max_tokens: 4096,
            timeout_ms: 60_000,
        }
    }
}

impl LlmConfig {
    /// Read the API key from the configured environment variable
    pub fn get_api_key(&self) -> Result<String> {
        std::env::var(&self.api_key_env)
            .context(format!("LLM API key not found. Set the {} environment variable.", self.api_key_env))
    }
}

/// Planning loop thresholds and bounds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Maximum regeneration attempts on medium confidence
    #[serde(rename = "max-retries")]
    pub max_retries: u32,

    /// Overall score at or above which an itinerary finalizes
    #[serde(rename = "confidence-threshold-high")]
    pub confidence_threshold_high: f64,

    /// Overall score at or above which a retry is worthwhile
    #[serde(rename = "confidence-threshold-medium")]
    pub confidence_threshold_medium: f64,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            confidence_threshold_high: 0.8,
            confidence_threshold_medium: 0.6,
        }
    }
}

/// Travel data gateway limits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Per-call timeout in milliseconds
    #[serde(rename = "request-timeout-ms")]
    pub request_timeout_ms: u64,

    /// Maximum POIs fetched per category
    #[serde(rename = "poi-limit")]
    pub poi_limit: usize,

    /// How many activity preferences get their own POI lookup
    #[serde(rename = "max-poi-categories")]
    pub max_poi_categories: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: 10_000,
            poi_limit: 5,
            max_poi_categories: 3,
        }
    }
}

impl GatewayConfig {
    /// Per-call timeout as a Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory for SessionStore data
    #[serde(rename = "sessionstore-dir")]
    pub sessionstore_dir: String,

    /// Record TTL in days (expiry is a store policy, not a planner concern)
    #[serde(rename = "ttl-days")]
    pub ttl_days: u32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        // Use XDG data directory (~/.local/share/tripplanner on Linux)
        let sessionstore_dir = dirs::data_dir()
            .map(|d| d.join("tripplanner").join("sessions"))
            .unwrap_or_else(|| PathBuf::from(".sessionstore"))
            .to_string_lossy()
            .into_owned();

        Self {
            sessionstore_dir,
            ttl_days: 30,
        }
    }
}

impl StorageConfig {
    /// TTL in seconds for the session store
    pub fn ttl_secs(&self) -> i64 {
        self.ttl_days as i64 * 24 * 60 * 60
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.llm.provider, "anthropic");
        assert_eq!(config.planner.max_retries, 3);
        assert_eq!(config.planner.confidence_threshold_high, 0.8);
        assert_eq!(config.planner.confidence_threshold_medium, 0.6);
        assert_eq!(config.gateway.poi_limit, 5);
        assert_eq!(config.storage.ttl_days, 30);
    }

    #[test]
    fn test_validate_rejects_inverted_thresholds() {
        let mut config = Config::default();
        config.planner.confidence_threshold_medium = 0.9;

        assert!(config.validate().is_err());
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_deserialize_config() {
        let yaml = r#"
log-level: debug

llm:
  provider: anthropic
  model: claude-opus-4
  api-key-env: MY_API_KEY
  max-tokens: 8192
  timeout-ms: 30000

planner:
  max-retries: 5
  confidence-threshold-high: 0.9
  confidence-threshold-medium: 0.5

gateway:
  request-timeout-ms: 2000
  poi-limit: 3
"#;

        let config: Config = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.llm.model, "claude-opus-4");
        assert_eq!(config.llm.api_key_env, "MY_API_KEY");
        assert_eq!(config.planner.max_retries, 5);
        assert_eq!(config.planner.confidence_threshold_high, 0.9);
        assert_eq!(config.gateway.request_timeout_ms, 2000);
        assert_eq!(config.gateway.poi_limit, 3);
        assert_eq!(config.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let yaml = r#"
planner:
  max-retries: 1
"#;

        let config: Config = serde_yaml::from_str(yaml).unwrap();

        // Specified value
        assert_eq!(config.planner.max_retries, 1);

        // Defaults for unspecified
        assert_eq!(config.llm.provider, "anthropic");
        assert_eq!(config.planner.confidence_threshold_high, 0.8);
        assert_eq!(config.gateway.max_poi_categories, 3);
    }
}
