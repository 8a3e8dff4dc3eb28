use super::models::AppConfig;
use crate::{Error, Result};
use config::{Config, Environment, File, FileFormat};
use directories::ProjectDirs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Environment variables with this prefix override file values,
/// e.g. `FOOTBALL_SYNC_API_TOKEN` or `FOOTBALL_SYNC_HTTP__TIMEOUT_SECS`.
pub const ENV_PREFIX: &str = "FOOTBALL_SYNC";

pub struct ConfigLoader;

impl ConfigLoader {
    fn project_dirs() -> Result<ProjectDirs> {
        ProjectDirs::from("com", "football-sync", "football-sync")
            .ok_or_else(|| Error::Other("Could not determine user directories".to_string()))
    }

    pub fn get_default_config_path() -> Result<PathBuf> {
        Ok(Self::project_dirs()?.config_dir().join("config.json"))
    }

    pub fn ensure_config_dir() -> Result<PathBuf> {
        let project_dirs = Self::project_dirs()?;
        let config_dir = project_dirs.config_dir();
        std::fs::create_dir_all(config_dir)?;

        Ok(config_dir.to_path_buf())
    }

    pub fn get_default_database_path() -> Result<PathBuf> {
        Ok(Self::project_dirs()?.data_dir().join("football.db"))
    }

    pub fn resolve_path(path: Option<&str>) -> Result<PathBuf> {
        match path {
            Some(path) => Ok(PathBuf::from(path)),
            None => Self::get_default_config_path(),
        }
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
        Self::load_with_environment(path.as_ref(), Self::environment())
    }

    /// `FOOTBALL_SYNC_` strips the prefix; `__` then splits nested keys.
    fn environment() -> Environment {
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
    }

    fn load_with_environment(path: &Path, environment: Environment) -> Result<AppConfig> {
        debug!("Loading configuration from: {}", path.display());

        if !path.exists() {
            return Err(Error::Other(format!(
                "Configuration file {} not found. Run 'football-sync init' first.",
                path.display()
            )));
        }

        let settings = Config::builder()
            .add_source(File::from(path).format(FileFormat::Json).required(true))
            .add_source(environment)
            .build()?;
        let config: AppConfig = settings.try_deserialize()?;

        config.validate()?;

        info!("Configuration loaded successfully from {}", path.display());
        debug!(
            "config: football api {}, core api {}, interval {} days",
            config.football_api_url, config.core_api_url, config.sync.interval_days
        );

        Ok(config)
    }

    pub fn write_template<P: AsRef<Path>>(path: P, force: bool) -> Result<()> {
        let path = path.as_ref();

        if path.exists() && !force {
            return Err(Error::Other(format!(
                "Config file {} already exists. Use --force to overwrite.",
                path.display()
            )));
        }

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let config_json = serde_json::to_string_pretty(&AppConfig::template())?;
        std::fs::write(path, config_json)?;
        info!("Configuration template written to {}", path.display());

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_round_trips_through_loader_once_token_is_set() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        ConfigLoader::write_template(&path, false).unwrap();
        assert!(ConfigLoader::write_template(&path, false).is_err());

        // The untouched template carries the placeholder token.
        assert!(ConfigLoader::load_from_file(&path).is_err());

        let mut config = AppConfig::template();
        config.api_token = "token-123".to_string();
        config.sync.interval_days = 3;
        std::fs::write(&path, serde_json::to_string(&config).unwrap()).unwrap();

        let loaded = ConfigLoader::load_from_file(&path).unwrap();
        assert_eq!(loaded.api_token, "token-123");
        assert_eq!(loaded.sync.interval_days, 3);
    }

    #[test]
    fn missing_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let result = ConfigLoader::load_from_file(dir.path().join("nope.json"));
        assert!(matches!(result, Err(Error::Other(_))));
    }

    #[test]
    fn environment_overrides_file_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = AppConfig::template();
        config.api_token = "file-token".to_string();
        std::fs::write(&path, serde_json::to_string(&config).unwrap()).unwrap();

        let vars = config::Map::from([
            ("FOOTBALL_SYNC_API_TOKEN".to_string(), "env-token".to_string()),
            ("FOOTBALL_SYNC_HTTP__TIMEOUT_SECS".to_string(), "5".to_string()),
            ("UNRELATED_API_TOKEN".to_string(), "ignored".to_string()),
        ]);
        let environment = ConfigLoader::environment().source(Some(vars));

        let loaded = ConfigLoader::load_with_environment(&path, environment).unwrap();
        assert_eq!(loaded.api_token, "env-token");
        assert_eq!(loaded.http.timeout_secs, 5);
        assert_eq!(loaded.sync.interval_days, config.sync.interval_days);
    }
}
