use std::time::Duration;
use anyhow::Result;
use async_trait::async_trait;
use log::error;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::app_config::{ProviderKind, TranslationConfig};
use crate::errors::{ProviderError, SyncError};
use crate::providers::{ProviderGateway, ProviderRequest, SyncGateway, SyncPayload, Translation};

/// HTTP gateway speaking the uniform translation contract
///
/// Vendor-specific wire formats live behind each configured endpoint; this
/// client only knows the shared request/result shape. The provider entry
/// selected by `provider_id` supplies endpoint, credential, and timeout.
pub struct HttpProviderGateway {
    /// HTTP client for gateway requests
    client: Client,

    /// Provider entries from the engine configuration
    config: TranslationConfig,
}

/// Uniform translation request body
#[derive(Debug, Serialize)]
struct TranslationRequestBody<'a> {
    word: &'a str,
    sentence: &'a str,
    target_lang: &'a str,

    /// Model name for AI-backed providers
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
}

/// Uniform translation response body
#[derive(Debug, Deserialize)]
struct TranslationResponseBody {
    success: bool,

    /// Translated word when `success`
    #[serde(default)]
    translation: Option<String>,

    /// Translated sentence when the vendor provides one
    #[serde(default)]
    sentence_translation: Option<String>,

    /// Vendor error message when not `success`
    #[serde(default)]
    error: Option<String>,
}

impl HttpProviderGateway {
    /// Create a new gateway over the configured provider entries
    pub fn new(config: TranslationConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    fn endpoint_for(&self, kind: ProviderKind) -> Result<Url, ProviderError> {
        let entry = self
            .config
            .get_provider_config(kind)
            .ok_or_else(|| ProviderError::RequestFailed(format!("no config entry for {}", kind)))?;

        Url::parse(&entry.endpoint)
            .map_err(|e| ProviderError::RequestFailed(format!("bad endpoint for {}: {}", kind, e)))
    }
}

#[async_trait]
impl ProviderGateway for HttpProviderGateway {
    async fn submit(&self, request: &ProviderRequest) -> Result<Translation, ProviderError> {
        let kind = request.provider_id;
        let entry = self
            .config
            .get_provider_config(kind)
            .ok_or_else(|| ProviderError::RequestFailed(format!("no config entry for {}", kind)))?;

        if kind.requires_api_key() && entry.api_key.is_empty() {
            return Err(ProviderError::MissingCredential(kind.to_string()));
        }

        let url = self.endpoint_for(kind)?;
        let body = TranslationRequestBody {
            word: &request.word,
            sentence: &request.sentence,
            target_lang: &request.target_lang,
            model: (!entry.model.is_empty()).then_some(entry.model.as_str()),
        };

        let mut builder = self
            .client
            .post(url)
            .timeout(Duration::from_secs(entry.timeout_secs))
            .json(&body);
        if !entry.api_key.is_empty() {
            builder = builder.header("Authorization", format!("Bearer {}", entry.api_key));
        }

        let response = builder
            .send()
            .await
            .map_err(|e| ProviderError::ConnectionError(e.to_string()))?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(ProviderError::RateLimitExceeded(format!(
                "{} asked to back off",
                kind
            )));
        }
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "failed to read error response".to_string());
            error!("{} gateway error ({}): {}", kind, status, message);
            return Err(ProviderError::ApiError {
                status_code: status.as_u16(),
                message,
            });
        }

        let parsed = response
            .json::<TranslationResponseBody>()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))?;

        if !parsed.success {
            let message = parsed.error.unwrap_or_else(|| "unspecified vendor error".to_string());
            return Err(ProviderError::ApiError {
                status_code: status.as_u16(),
                message,
            });
        }

        let word = parsed
            .translation
            .ok_or_else(|| ProviderError::ParseError("response missing translation".to_string()))?;

        Ok(Translation {
            word,
            sentence: parsed.sentence_translation,
        })
    }
}

/// HTTP gateway for account-sync attempts
pub struct HttpSyncGateway {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl HttpSyncGateway {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_default(),
            endpoint: endpoint.into(),
            api_key: api_key.into(),
        }
    }
}

#[async_trait]
impl SyncGateway for HttpSyncGateway {
    async fn attempt_sync(&self, payload: &SyncPayload) -> Result<(), SyncError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&serde_json::json!({
                "profile": payload.profile_name,
                "settings": payload.settings,
            }))
            .send()
            .await
            .map_err(|e| SyncError::Gateway(e.to_string()))?;

        let status = response.status();
        match status.as_u16() {
            200..=299 => Ok(()),
            401 | 403 => {
                let message = response.text().await.unwrap_or_default();
                Err(SyncError::Authentication(message))
            }
            429 => Err(SyncError::RateLimited("sync backend asked to back off".to_string())),
            _ => {
                let message = response.text().await.unwrap_or_default();
                error!("sync gateway error ({}): {}", status, message);
                Err(SyncError::Gateway(format!("{}: {}", status, message)))
            }
        }
    }
}
