use crate::updater::schedule::Cadence;
use scraper::Selector;
use serde::Deserialize;
use std::fs;
use std::net::{IpAddr, SocketAddr};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid selector for {field}: {reason}")]
    InvalidSelector { field: String, reason: String },
    #[error("invalid cache schedule: {0}")]
    InvalidSchedule(String),
    #[error("invalid server address: {0}")]
    InvalidAddress(String),
}

/// Selectors for the electoral-unit counts.
#[derive(Debug, Clone, Deserialize)]
pub struct CollegeRules {
    pub biden: String,
    pub trump: String,
    #[serde(default)]
    pub remaining: Option<String>,
}

/// Selectors for the popular-vote counts.
#[derive(Debug, Clone, Deserialize)]
pub struct PopularRules {
    pub biden: String,
    pub trump: String,
    /// Length of the label in front of the number, in characters.
    #[serde(default = "default_label_chars")]
    pub label_chars: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemoteConfig {
    pub url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    pub college: CollegeRules,
    pub popular: PopularRules,
    pub regions: String,
    #[serde(default = "default_region_attribute")]
    pub region_attribute: String,
    #[serde(default = "default_fill_attribute")]
    pub fill_attribute: String,
    pub updated: String,
}

impl RemoteConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Every configured selector, keyed by the field it feeds.
    pub fn selectors(&self) -> Vec<(&'static str, &str)> {
        let mut selectors = vec![
            ("college.biden", self.college.biden.as_str()),
            ("college.trump", self.college.trump.as_str()),
            ("popular.biden", self.popular.biden.as_str()),
            ("popular.trump", self.popular.trump.as_str()),
            ("regions", self.regions.as_str()),
            ("updated", self.updated.as_str()),
        ];
        if let Some(remaining) = &self.college.remaining {
            selectors.push(("college.remaining", remaining.as_str()));
        }
        selectors
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub address: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub remote: RemoteConfig,
    pub cache_schedule: String,
    #[serde(default = "default_freshness_ms")]
    pub freshness_ms: u64,
    pub server: ServerConfig,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl AppConfig {
    pub fn from_json_str(content: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks everything that would otherwise only fail once the service is up.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, selector) in self.remote.selectors() {
            compile_selector(field, selector)?;
        }
        self.cadence()?;
        self.bind_addr()?;
        Ok(())
    }

    pub fn cadence(&self) -> Result<Cadence, ConfigError> {
        Cadence::parse(&self.cache_schedule).map_err(|e| ConfigError::InvalidSchedule(e.to_string()))
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip: IpAddr = self
            .server
            .address
            .parse()
            .map_err(|_| ConfigError::InvalidAddress(self.server.address.clone()))?;
        Ok(SocketAddr::new(ip, self.server.port))
    }

    pub fn freshness(&self) -> Duration {
        Duration::from_millis(self.freshness_ms)
    }
}

pub fn compile_selector(field: &str, selector: &str) -> Result<Selector, ConfigError> {
    Selector::parse(selector).map_err(|e| ConfigError::InvalidSelector {
        field: field.to_string(),
        reason: e.to_string(),
    })
}

pub fn load_config(path: impl AsRef<Path>) -> Result<AppConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    AppConfig::from_json_str(&content)
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_user_agent() -> String {
    format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
}

fn default_label_chars() -> usize {
    11
}

fn default_region_attribute() -> String {
    "data-n".to_string()
}

fn default_fill_attribute() -> String {
    "fill".to_string()
}

fn default_freshness_ms() -> u64 {
    5000
}

fn default_log_level() -> String {
    "info".to_string()
}
