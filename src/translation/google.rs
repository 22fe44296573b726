//! Google Cloud Translation (v2 REST) client

use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::{TranslateError, Translation, TranslationConfig, Translator};

/// Default v2 endpoint
pub const DEFAULT_ENDPOINT: &str = "https://translation.googleapis.com/language/translate/v2";

#[derive(Debug, Serialize)]
struct TranslateRequest<'a> {
    q: &'a str,
    target: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    source: Option<&'a str>,
    format: &'static str,
}

#[derive(Debug, Deserialize)]
struct TranslateResponse {
    data: TranslateData,
}

#[derive(Debug, Deserialize)]
struct TranslateData {
    #[serde(default)]
    translations: Vec<TranslatedText>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TranslatedText {
    translated_text: String,
    detected_source_language: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Google Cloud Translation client authenticated with an API key
pub struct GoogleTranslator {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    source_language: Option<String>,
}

impl GoogleTranslator {
    /// Create a client from translation settings
    pub fn new(config: &TranslationConfig, api_key: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key,
            source_language: config.source_language.clone(),
        })
    }
}

#[async_trait::async_trait]
impl Translator for GoogleTranslator {
    async fn translate(&self, text: &str, target: &str) -> Result<Translation, TranslateError> {
        let request = TranslateRequest {
            q: text,
            target,
            source: self.source_language.as_deref(),
            format: "text",
        };

        let response = self
            .client
            .post(&self.endpoint)
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(error_from_status(status, &body));
        }

        let body = response.text().await?;
        let translation = parse_response(&body, target)?;

        debug!(
            "Translated {} chars ({:?} -> {})",
            text.chars().count(),
            translation.detected_source,
            target
        );

        Ok(translation)
    }

    fn name(&self) -> &str {
        "google"
    }
}

/// Parse a successful response body
fn parse_response(body: &str, target: &str) -> Result<Translation, TranslateError> {
    let parsed: TranslateResponse =
        serde_json::from_str(body).map_err(|e| TranslateError::Api {
            status: 200,
            message: format!("Malformed response: {}", e),
        })?;

    let first = parsed
        .data
        .translations
        .into_iter()
        .next()
        .ok_or(TranslateError::EmptyResponse)?;

    Ok(Translation {
        text: first.translated_text,
        target: target.to_string(),
        detected_source: first.detected_source_language,
        provider: "google".to_string(),
    })
}

/// Map a non-success HTTP status to an error
fn error_from_status(status: StatusCode, body: &str) -> TranslateError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => TranslateError::Authentication,
        StatusCode::TOO_MANY_REQUESTS => TranslateError::RateLimited,
        _ => {
            let message = serde_json::from_str::<ErrorResponse>(body)
                .map(|e| e.error.message)
                .unwrap_or_else(|_| body.trim().to_string());
            TranslateError::Api {
                status: status.as_u16(),
                message,
            }
        }
    }
}
