use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use mealscan_core::{FoodData, FoodResponse};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{decode, http_client, send, FoodRecognizer, ImageUpload, ProviderError};
use crate::config::ConfigError;
use crate::secrets::{keys, Secrets};
use crate::sign::{auth_timestamp, sign};

const PROVIDER: &str = "food";

pub const DEFAULT_FOOD_URL: &str = "https://aiapi.genielabs.ai/kt/vision/food";

/// Which nutrition block the provider attaches to each prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FoodFlag {
    #[default]
    All,
    Unselected,
    Calorie,
    Natrium,
}

#[derive(Serialize)]
struct Metadata {
    flag: FoodFlag,
}

/// Food recognition over the GenieLabs vision API, authenticated with an
/// HMAC signature of `client_id:timestamp`.
pub struct KtFood {
    client: Client,
    endpoint: String,
    client_id: String,
    client_secret: String,
    client_key: String,
    flag: FoodFlag,
}

impl KtFood {
    pub fn new(
        endpoint: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        client_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            client: http_client(timeout)?,
            endpoint: endpoint.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            client_key: client_key.into(),
            flag: FoodFlag::All,
        })
    }

    pub fn from_secrets(secrets: &Secrets, timeout: Duration) -> Result<Self, ConfigError> {
        Self::new(
            secrets.get(keys::FOOD_URL).unwrap_or(DEFAULT_FOOD_URL),
            secrets.require(keys::FOOD_CLIENT_ID)?,
            secrets.require(keys::FOOD_CLIENT_SECRET)?,
            secrets.require(keys::FOOD_CLIENT_KEY)?,
            timeout,
        )
    }

    pub fn with_flag(mut self, flag: FoodFlag) -> Self {
        self.flag = flag;
        self
    }
}

#[async_trait]
impl FoodRecognizer for KtFood {
    async fn recognize(&self, image: &ImageUpload) -> Result<FoodData, ProviderError> {
        let timestamp = auth_timestamp(Utc::now());
        let signature = sign(&self.client_id, &self.client_secret, &timestamp)
            .ok_or(ProviderError::Signing { provider: PROVIDER })?;

        let metadata = serde_json::to_string(&Metadata { flag: self.flag })
            .map_err(|source| ProviderError::Encode { provider: PROVIDER, source })?;
        let form = reqwest::multipart::Form::new()
            .text("metadata", metadata)
            .part("media", image.part(PROVIDER)?);

        tracing::debug!(file = %image.file_name, flag = ?self.flag, "Sending image to food recognition");
        let request = self
            .client
            .post(&self.endpoint)
            .header("Accept", "*/*")
            .header("x-client-key", &self.client_key)
            .header("x-client-signature", signature)
            .header("x-auth-timestamp", timestamp)
            .multipart(form);

        let body = send(PROVIDER, request).await?;
        let response: FoodResponse = decode(PROVIDER, &body)?;
        tracing::info!(code = ?response.code, entries = response.data.len(), "Food recognition finished");
        Ok(response.data)
    }
}
