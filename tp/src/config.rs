//! TripPlanner configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main TripPlanner configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Travel backend configuration
    pub api: ApiConfig,

    /// Storage configuration
    pub storage: StorageConfig,

    /// Log level used when `--log-level` is not given
    #[serde(rename = "log-level")]
    pub log_level: Option<String>,
}

impl Config {
    /// Validate configuration before use
    ///
    /// Call this early in startup to fail fast with clear error messages.
    pub fn validate(&self) -> Result<()> {
        let base_url = self.api.base_url.trim();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(eyre::eyre!(
                "api.base-url must be an http(s) URL, got '{}'",
                self.api.base_url
            ));
        }
        if self.api.timeout_ms == 0 {
            return Err(eyre::eyre!("api.timeout-ms must be greater than zero"));
        }
        if !self.api.endpoints.subscription_status.contains(EMAIL_PLACEHOLDER) {
            return Err(eyre::eyre!(
                "api.endpoints.subscription-status must contain {}",
                EMAIL_PLACEHOLDER
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

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// Placeholder substituted with the user's email in the subscription path
pub const EMAIL_PLACEHOLDER: &str = "{email}";

/// Travel backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Backend base URL
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Request timeout in milliseconds
    ///
    /// Applies to the whole planning stream, so it must cover a full agent run.
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,

    /// Endpoint paths, relative to the base URL
    pub endpoints: EndpointsConfig,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            timeout_ms: 300_000,
            endpoints: EndpointsConfig::default(),
        }
    }
}

impl ApiConfig {
    /// Join an endpoint path onto the base URL
    pub fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Subscription status URL for `email`
    ///
    /// Each path segment is percent-encoded, so `/`, `?` or `#` in the
    /// address stay inside its segment.
    pub fn subscription_url(&self, email: &str) -> Result<reqwest::Url> {
        let mut url = reqwest::Url::parse(&self.base_url).context(format!("Invalid base URL: {}", self.base_url))?;
        url.path_segments_mut()
            .map_err(|()| eyre::eyre!("Base URL cannot carry a path: {}", self.base_url))?
            .pop_if_empty()
            .extend(
                self.endpoints
                    .subscription_status
                    .split('/')
                    .filter(|segment| !segment.is_empty())
                    .map(|segment| segment.replace(EMAIL_PLACEHOLDER, email)),
            );
        Ok(url)
    }
}

/// Backend endpoint paths
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointsConfig {
    #[serde(rename = "plan-stream")]
    pub plan_stream: String,

    #[serde(rename = "plan-legacy")]
    pub plan_legacy: String,

    #[serde(rename = "multi-city-plan-stream")]
    pub multi_city_plan_stream: String,

    #[serde(rename = "multi-city-plan-legacy")]
    pub multi_city_plan_legacy: String,

    #[serde(rename = "flight-search")]
    pub flight_search: String,

    #[serde(rename = "hotel-search")]
    pub hotel_search: String,

    #[serde(rename = "multi-city-flight-search")]
    pub multi_city_flight_search: String,

    #[serde(rename = "multi-city-hotel-search")]
    pub multi_city_hotel_search: String,

    pub bookings: String,

    /// Must contain `{email}`
    #[serde(rename = "subscription-status")]
    pub subscription_status: String,
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            plan_stream: "/planner/plan_trip/stream".to_string(),
            plan_legacy: "/planner/plan_trip".to_string(),
            multi_city_plan_stream: "/planner/plan_multi_city/stream".to_string(),
            multi_city_plan_legacy: "/planner/plan_multi_city".to_string(),
            flight_search: "/flights/search".to_string(),
            hotel_search: "/hotels/search".to_string(),
            multi_city_flight_search: "/flights/search_multi_city".to_string(),
            multi_city_hotel_search: "/hotels/search_multi_city".to_string(),
            bookings: "/bookings".to_string(),
            subscription_status: "/stripe/subscription-status/{email}".to_string(),
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Where the last submitted trip form is kept between runs
    #[serde(rename = "form-state-path")]
    pub form_state_path: Option<String>,
}

impl StorageConfig {
    /// Resolved form-state path, expanding `~/`
    pub fn form_state_path(&self) -> PathBuf {
        match &self.form_state_path {
            Some(p) if p.starts_with("~/") => dirs::home_dir()
                .map(|home| home.join(&p[2..]))
                .unwrap_or_else(|| PathBuf::from(p)),
            Some(p) => PathBuf::from(p),
            None => dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("tripplanner")
                .join("form_state.json"),
        }
    }
}
