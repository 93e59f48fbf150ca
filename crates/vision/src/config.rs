use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::preprocess::ResizePolicy;
use crate::providers::FoodFlag;

/// Default run-config file name, looked up in the working directory and then
/// in the platform config directory.
pub const CONFIG_FILE_NAME: &str = "mealscan.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {}: {source}", path.display())]
    Read { path: PathBuf, source: std::io::Error },
    #[error("Failed to parse secrets file {}: {source}", path.display())]
    SecretsParse { path: PathBuf, source: serde_json::Error },
    #[error("Failed to parse config file {}: {source}", path.display())]
    ConfigParse { path: PathBuf, source: toml::de::Error },
    #[error("Missing secret: {0}")]
    MissingSecret(String),
    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// Settings for a scan run. Every field has a default, so an empty or absent
/// file is a valid configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// JSON file holding provider credentials and endpoint URLs.
    pub secrets_file: PathBuf,
    /// Where the aggregated JSON is written; stdout when unset.
    pub output: Option<PathBuf>,
    /// Per-request timeout for every provider call.
    pub timeout_secs: u64,
    pub resize: ResizeConfig,
    pub food: FoodConfig,
    pub server: ServerConfig,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            secrets_file: PathBuf::from("secrets.json"),
            output: None,
            timeout_secs: 30,
            resize: ResizeConfig::default(),
            food: FoodConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResizeMode {
    #[default]
    Minimum,
    Square,
    Off,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResizeConfig {
    pub mode: ResizeMode,
    /// Minimum length of the longer side (`minimum` mode).
    pub long_edge: u32,
    /// Minimum length of the shorter side (`minimum` mode).
    pub short_edge: u32,
    /// Output side length (`square` mode).
    pub edge: u32,
}

impl Default for ResizeConfig {
    fn default() -> Self {
        Self { mode: ResizeMode::Minimum, long_edge: 1080, short_edge: 720, edge: 1440 }
    }
}

impl ResizeConfig {
    pub fn policy(&self) -> ResizePolicy {
        match self.mode {
            ResizeMode::Minimum => ResizePolicy::Minimum {
                long_edge: self.long_edge,
                short_edge: self.short_edge,
            },
            ResizeMode::Square => ResizePolicy::Square { edge: self.edge },
            ResizeMode::Off => ResizePolicy::Off,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FoodConfig {
    pub flag: FoodFlag,
    /// Treat a failed food-recognition call as "no regions" instead of
    /// aborting the run.
    pub tolerate_failure: bool,
}

impl Default for FoodConfig {
    fn default() -> Self {
        Self { flag: FoodFlag::All, tolerate_failure: true }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Largest accepted upload, in bytes.
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: "0.0.0.0".to_string(), port: 5000, max_upload_bytes: 20 * 1024 * 1024 }
    }
}

impl RunConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn from_toml(raw: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(raw)
            .map_err(|source| ConfigError::ConfigParse { path: path.to_path_buf(), source })
    }

    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        let config = Self::from_toml(&raw, path)?;
        tracing::info!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    /// Resolve the config: an explicit path must exist; otherwise the first of
    /// `./mealscan.toml` and `<config dir>/mealscan.toml` that exists; otherwise
    /// defaults.
    pub async fn discover(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load(path).await;
        }
        for candidate in candidate_paths() {
            if tokio::fs::try_exists(&candidate).await.unwrap_or(false) {
                return Self::load(&candidate).await;
            }
        }
        tracing::debug!("No config file found; using defaults");
        Ok(Self::default())
    }
}

fn candidate_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(CONFIG_FILE_NAME)];
    if let Some(dirs) = directories::ProjectDirs::from("com", "mealscan", "mealscan") {
        paths.push(dirs.config_dir().join(CONFIG_FILE_NAME));
    }
    paths
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_is_all_defaults() {
        let c = RunConfig::from_toml("", Path::new("mealscan.toml")).unwrap();
        assert_eq!(c.secrets_file, PathBuf::from("secrets.json"));
        assert!(c.output.is_none());
        assert_eq!(c.timeout(), Duration::from_secs(30));
        assert_eq!(c.resize.policy(), ResizePolicy::Minimum { long_edge: 1080, short_edge: 720 });
        assert_eq!(c.food.flag, FoodFlag::All);
        assert!(c.food.tolerate_failure);
        assert_eq!(c.server.port, 5000);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let raw = r#"
            secrets_file = "/etc/mealscan/secrets.json"
            output = "result.json"

            [resize]
            mode = "square"

            [food]
            flag = "CALORIE"
            tolerate_failure = false
        "#;
        let c = RunConfig::from_toml(raw, Path::new("mealscan.toml")).unwrap();
        assert_eq!(c.output, Some(PathBuf::from("result.json")));
        assert_eq!(c.resize.policy(), ResizePolicy::Square { edge: 1440 });
        assert_eq!(c.food.flag, FoodFlag::Calorie);
        assert!(!c.food.tolerate_failure);
        assert_eq!(c.timeout_secs, 30);
    }

    #[test]
    fn resize_off_maps_to_off_policy() {
        let c = RunConfig::from_toml("[resize]\nmode = \"off\"", Path::new("x.toml")).unwrap();
        assert_eq!(c.resize.policy(), ResizePolicy::Off);
    }

    #[test]
    fn bad_toml_reports_path() {
        let err = RunConfig::from_toml("timeout_secs = \"soon\"", Path::new("bad.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::ConfigParse { ref path, .. } if path == Path::new("bad.toml")));
    }

    #[tokio::test]
    async fn explicit_missing_path_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(matches!(RunConfig::discover(Some(&missing)).await, Err(ConfigError::Read { .. })));
    }

    #[tokio::test]
    async fn explicit_path_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mealscan.toml");
        std::fs::write(&path, "timeout_secs = 5\n").unwrap();
        let c = RunConfig::discover(Some(&path)).await.unwrap();
        assert_eq!(c.timeout_secs, 5);
    }
}
