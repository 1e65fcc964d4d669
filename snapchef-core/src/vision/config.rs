//! Provider configuration from environment variables.

use std::env;
use thiserror::Error;

/// Default Gemini REST API base URL.
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default Gemini model.
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";

/// Default local chat completions endpoint (LM Studio's default port).
pub const DEFAULT_LOCAL_LLM_URL: &str = "http://localhost:1234/v1/chat/completions";

/// Default local vision model.
pub const DEFAULT_LOCAL_LLM_MODEL: &str = "gemma-3-12b-it:2";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),
}

/// Gemini provider configuration.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
}

impl GeminiConfig {
    /// Load configuration from environment variables.
    ///
    /// Required:
    /// - `GEMINI_API_KEY`
    ///
    /// Optional:
    /// - `SNAPCHEF_GEMINI_MODEL` (default: "gemini-1.5-flash")
    /// - `SNAPCHEF_GEMINI_BASE_URL` (default: the public v1beta endpoint)
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = env::var("GEMINI_API_KEY")
            .map_err(|_| ConfigError::MissingEnvVar("GEMINI_API_KEY".to_string()))?;

        let model =
            env::var("SNAPCHEF_GEMINI_MODEL").unwrap_or_else(|_| DEFAULT_GEMINI_MODEL.to_string());

        let base_url = env::var("SNAPCHEF_GEMINI_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_GEMINI_BASE_URL.to_string());

        Ok(Self {
            api_key,
            model,
            base_url,
        })
    }
}

/// Local OpenAI-compatible provider configuration.
#[derive(Debug, Clone)]
pub struct LocalLlmConfig {
    pub url: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for LocalLlmConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_LOCAL_LLM_URL.to_string(),
            model: DEFAULT_LOCAL_LLM_MODEL.to_string(),
            temperature: 1.0,
            max_tokens: 1024,
        }
    }
}

impl LocalLlmConfig {
    /// Load configuration from environment variables. Nothing is required.
    ///
    /// - `SNAPCHEF_LOCAL_LLM_URL` (default: "http://localhost:1234/v1/chat/completions")
    /// - `SNAPCHEF_LOCAL_LLM_MODEL` (default: "gemma-3-12b-it:2")
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            url: env::var("SNAPCHEF_LOCAL_LLM_URL").unwrap_or(defaults.url),
            model: env::var("SNAPCHEF_LOCAL_LLM_MODEL").unwrap_or(defaults.model),
            ..defaults
        }
    }
}
