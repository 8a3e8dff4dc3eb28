use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use super::ConfigLoader;

pub const DEFAULT_FOOTBALL_API_URL: &str = "https://api.sportmonks.com/v3/football/";
pub const DEFAULT_CORE_API_URL: &str = "https://api.sportmonks.com/v3/core/";
pub const TOKEN_PLACEHOLDER: &str = "your_api_token_here";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub api_token: String,
    #[serde(default = "default_football_api_url")]
    pub football_api_url: String,
    #[serde(default = "default_core_api_url")]
    pub core_api_url: String,
    #[serde(default)]
    pub database_path: Option<String>,
    #[serde(default)]
    pub http: HttpSettings,
    #[serde(default)]
    pub sync: SyncSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    pub timeout_secs: u64,
    pub requests_per_minute: u32,
    /// Retries for transient transport failures (timeouts, 429, 5xx).
    pub max_retries: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncSettings {
    /// An entity type is refreshed once its last sync is at least this old.
    pub interval_days: u32,
    /// Ceiling on concurrent per-id fetches within one entity type.
    pub max_in_flight: usize,
    /// Leagues whose `sub_type` differs are dropped before saving. `None` keeps all.
    pub league_sub_type: Option<String>,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            requests_per_minute: 50,
            max_retries: 3,
        }
    }
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            interval_days: 7,
            max_in_flight: 16,
            league_sub_type: Some("domestic".to_string()),
        }
    }
}

impl HttpSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl SyncSettings {
    pub fn interval(&self) -> chrono::Duration {
        chrono::Duration::days(i64::from(self.interval_days))
    }
}

fn default_football_api_url() -> String {
    DEFAULT_FOOTBALL_API_URL.to_string()
}

fn default_core_api_url() -> String {
    DEFAULT_CORE_API_URL.to_string()
}

impl AppConfig {
    pub fn template() -> Self {
        Self {
            api_token: TOKEN_PLACEHOLDER.to_string(),
            football_api_url: default_football_api_url(),
            core_api_url: default_core_api_url(),
            database_path: None,
            http: HttpSettings::default(),
            sync: SyncSettings::default(),
        }
    }

    pub fn validate(&self) -> crate::Result<()> {
        use crate::Error;

        if self.api_token.trim().is_empty() || self.api_token == TOKEN_PLACEHOLDER {
            return Err(Error::Validation("API token is required".to_string()));
        }

        for (name, url) in [
            ("football_api_url", &self.football_api_url),
            ("core_api_url", &self.core_api_url),
        ] {
            if url.trim().is_empty() {
                return Err(Error::Validation(format!("{} is required", name)));
            }
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(Error::Validation(format!(
                    "{} must be an http(s) URL, got '{}'",
                    name, url
                )));
            }
        }

        if let Some(true) = self.database_path.as_ref().map(|p| p.trim().is_empty()) {
            return Err(Error::Validation("Database path must not be empty".to_string()));
        }

        if self.sync.interval_days == 0 {
            return Err(Error::Validation(
                "sync.interval_days must be at least 1".to_string(),
            ));
        }

        if self.sync.max_in_flight == 0 {
            return Err(Error::Validation(
                "sync.max_in_flight must be at least 1".to_string(),
            ));
        }

        if self.http.requests_per_minute == 0 {
            return Err(Error::Validation(
                "http.requests_per_minute must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    pub fn database_path(&self) -> crate::Result<PathBuf> {
        match self.database_path.as_deref() {
            Some(path) => Ok(PathBuf::from(path)),
            None => ConfigLoader::get_default_database_path(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> AppConfig {
        AppConfig {
            api_token: "secret".to_string(),
            ..AppConfig::template()
        }
    }

    #[test]
    fn template_is_rejected_until_token_is_set() {
        assert!(AppConfig::template().validate().is_err());
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn rejects_non_http_urls_and_zero_limits() {
        let mut config = valid();
        config.core_api_url = "ftp://example.com".to_string();
        assert!(config.validate().is_err());

        let mut config = valid();
        config.sync.interval_days = 0;
        assert!(config.validate().is_err());

        let mut config = valid();
        config.sync.max_in_flight = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_sections_fall_back_to_defaults() {
        let config: AppConfig = serde_json::from_str(r#"{"api_token":"abc"}"#).unwrap();
        assert_eq!(config.football_api_url, DEFAULT_FOOTBALL_API_URL);
        assert_eq!(config.sync.interval_days, 7);
        assert_eq!(config.sync.league_sub_type.as_deref(), Some("domestic"));
        assert_eq!(config.http.timeout(), Duration::from_secs(30));

        let partial: AppConfig =
            serde_json::from_str(r#"{"api_token":"abc","sync":{"interval_days":3}}"#).unwrap();
        assert_eq!(partial.sync.interval(), chrono::Duration::days(3));
        assert_eq!(partial.sync.max_in_flight, 16);
    }
}
