use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use crate::config::ConfigError;

/// Key names in the secrets file.
pub mod keys {
    pub const OCR_INVOKE_URL: &str = "CLOVA_OCR_Invoke_URL";
    pub const OCR_SECRET_KEY: &str = "naver_secret_key";
    pub const FOOD_CLIENT_ID: &str = "kt_client_id";
    pub const FOOD_CLIENT_SECRET: &str = "kt_client_secret";
    pub const FOOD_CLIENT_KEY: &str = "kt_client_key";
    /// Optional override for the food-recognition endpoint.
    pub const FOOD_URL: &str = "kt_food_url";
    pub const DETECTION_URL: &str = "Object_Detection_URL";
}

/// Flat credential bundle, loaded once and handed to each adapter.
///
/// `Debug` lists key names only so values never reach the logs.
#[derive(Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct Secrets(BTreeMap<String, serde_json::Value>);

impl Secrets {
    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = match tokio::fs::read_to_string(path).await {
            Ok(raw) => raw,
            Err(source) => {
                tracing::error!(path = %path.display(), error = %source, "Failed to read secrets file");
                return Err(ConfigError::Read { path: path.to_path_buf(), source });
            }
        };
        let secrets = Self::from_json(&raw).map_err(|source| {
            tracing::error!(path = %path.display(), error = %source, "Failed to parse secrets file");
            ConfigError::SecretsParse { path: path.to_path_buf(), source }
        })?;
        tracing::debug!(path = %path.display(), keys = secrets.0.len(), "Loaded secrets");
        Ok(secrets)
    }

    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// The value stored under `key`, if it is present and a string.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|v| v.as_str())
    }

    pub fn require(&self, key: &str) -> Result<&str, ConfigError> {
        self.get(key).ok_or_else(|| {
            tracing::error!("Set the {key} entry in the secrets file");
            ConfigError::MissingSecret(key.to_string())
        })
    }
}

impl std::fmt::Debug for Secrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.0.keys()).finish()
    }
}
