//! Translation Layer
//!
//! Sends recognized text to a translation provider. Providers are explicitly
//! constructed and handed to the worker, so tests can swap in stubs.

pub mod google;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::info;

pub use google::GoogleTranslator;

/// Environment variable consulted when no API key is configured
pub const API_KEY_ENV: &str = "GOOGLE_TRANSLATE_API_KEY";

/// Translation provider interface
#[async_trait::async_trait]
pub trait Translator: Send + Sync {
    /// Translate text into the target language
    async fn translate(&self, text: &str, target: &str) -> Result<Translation, TranslateError>;

    /// Provider name for logs
    fn name(&self) -> &str;
}

/// A finished translation
#[derive(Debug, Clone, PartialEq)]
pub struct Translation {
    pub text: String,
    pub target: String,
    /// Source language as detected by the provider, if reported
    pub detected_source: Option<String>,
    pub provider: String,
}

#[derive(Debug, thiserror::Error)]
pub enum TranslateError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Authentication error")]
    Authentication,

    #[error("Rate limit exceeded")]
    RateLimited,

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Provider returned no translation")]
    EmptyResponse,
}

/// Which translation provider to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TranslationProvider {
    /// Google Cloud Translation (v2 REST)
    #[default]
    Google,
    /// Return the recognized text unchanged
    Passthrough,
}

/// Translation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslationConfig {
    pub provider: TranslationProvider,
    /// Target language code
    pub target_language: String,
    /// Source language code; detected by the provider when unset
    pub source_language: Option<String>,
    /// API key; falls back to the GOOGLE_TRANSLATE_API_KEY environment variable
    pub api_key: Option<String>,
    /// REST endpoint
    pub endpoint: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            provider: TranslationProvider::Google,
            target_language: "en-US".to_string(),
            source_language: None,
            api_key: None,
            endpoint: google::DEFAULT_ENDPOINT.to_string(),
            timeout_secs: 10,
        }
    }
}

/// Returns the text unchanged; used for offline runs
#[derive(Debug, Clone, Default)]
pub struct PassthroughTranslator;

#[async_trait::async_trait]
impl Translator for PassthroughTranslator {
    async fn translate(&self, text: &str, target: &str) -> Result<Translation, TranslateError> {
        Ok(Translation {
            text: text.to_string(),
            target: target.to_string(),
            detected_source: None,
            provider: self.name().to_string(),
        })
    }

    fn name(&self) -> &str {
        "passthrough"
    }
}

/// Build the configured translator
pub fn build_translator(config: &TranslationConfig) -> Result<Box<dyn Translator>> {
    let translator: Box<dyn Translator> = match config.provider {
        TranslationProvider::Google => {
            let api_key = config
                .api_key
                .clone()
                .filter(|k| !k.is_empty())
                .or_else(|| std::env::var(API_KEY_ENV).ok().filter(|k| !k.is_empty()))
                .ok_or_else(|| {
                    anyhow::anyhow!(
                        "No Google Translate API key: set translation.api_key or {}",
                        API_KEY_ENV
                    )
                })?;
            Box::new(GoogleTranslator::new(config, api_key)?)
        }
        TranslationProvider::Passthrough => Box::new(PassthroughTranslator),
    };

    info!(
        "Translation provider: {} (target: {})",
        translator.name(),
        config.target_language
    );

    Ok(translator)
}
