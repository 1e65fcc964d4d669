//! Vision-language model providers.
//!
//! This module provides a trait-based abstraction over the models that look at an
//! uploaded photo and either judge whether it shows food or write a recipe for it.
//!
//! Two production providers exist:
//! - `GeminiProvider`: Google's hosted Gemini API
//! - `LocalProvider`: any OpenAI-compatible chat completions endpoint (LM Studio,
//!   llama.cpp server, ...) running a vision model
//!
//! `FakeVisionProvider` is a scriptable stand-in for tests.
//!
//! # Configuration
//!
//! - `GEMINI_API_KEY` (required for Gemini)
//! - `SNAPCHEF_GEMINI_MODEL` (optional): defaults to "gemini-1.5-flash"
//! - `SNAPCHEF_GEMINI_BASE_URL` (optional)
//! - `SNAPCHEF_LOCAL_LLM_URL` (optional): chat completions URL of the local server
//! - `SNAPCHEF_LOCAL_LLM_MODEL` (optional): defaults to "gemma-3-12b-it:2"

mod config;
mod fake;
mod gemini;
mod local;
pub mod parse;
pub mod prompts;

pub use config::{ConfigError, GeminiConfig, LocalLlmConfig};
pub use fake::FakeVisionProvider;
pub use gemini::GeminiProvider;
pub use local::LocalProvider;

use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

use crate::types::{is_food_description, RecipeDraft};

/// Error type for vision model calls.
#[derive(Debug, Error)]
pub enum VisionError {
    #[error("Request to model failed: {0}")]
    Transport(String),

    #[error("Model API returned error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Model returned an empty response")]
    EmptyResponse,

    #[error("Malformed model output: {reason}")]
    MalformedOutput { reason: String, raw: String },
}

impl From<reqwest::Error> for VisionError {
    fn from(err: reqwest::Error) -> Self {
        VisionError::Transport(err.to_string())
    }
}

/// A provider's judgment of one image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoodVerdict {
    pub is_food: bool,
    pub description: String,
}

impl FoodVerdict {
    /// Build a verdict from the model's free text. The flag always comes from
    /// [`is_food_description`] so a live answer agrees with the same answer read back
    /// from the store later. A blank answer is [`VisionError::EmptyResponse`]: it
    /// carries no verdict and must never be stored.
    pub fn from_answer(answer: impl Into<String>) -> Result<Self, VisionError> {
        let description = non_blank(answer.into())?;
        Ok(Self {
            is_food: is_food_description(&description),
            description,
        })
    }
}

/// Treat whitespace-only model text as no answer at all.
pub(crate) fn non_blank(text: String) -> Result<String, VisionError> {
    if text.trim().is_empty() {
        Err(VisionError::EmptyResponse)
    } else {
        Ok(text)
    }
}

/// Trait for vision model providers.
///
/// Implementations must be thread-safe; one instance serves every request.
#[async_trait]
pub trait VisionProvider: Send + Sync + fmt::Debug {
    /// Judge whether the image shows food, with a short free-text description.
    async fn classify(&self, image: &[u8]) -> Result<FoodVerdict, VisionError>;

    /// Write a recipe for the dish in the image. Empty `dietary_preference` or
    /// `cuisine` means no constraint.
    async fn generate_recipe(
        &self,
        image: &[u8],
        dietary_preference: &str,
        cuisine: &str,
    ) -> Result<RecipeDraft, VisionError>;

    /// Provider name (e.g., "gemini", "local", "fake").
    fn provider_name(&self) -> &'static str;

    /// Model name (e.g., "gemini-1.5-flash").
    fn model_name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verdict_from_answer() {
        let verdict = FoodVerdict::from_answer("No cake detected here").unwrap();
        assert!(!verdict.is_food);
        assert_eq!(verdict.description, "No cake detected here");

        assert!(FoodVerdict::from_answer("A delicious pasta dish").unwrap().is_food);
    }

    #[test]
    fn test_blank_answer_is_empty_response() {
        assert!(matches!(
            FoodVerdict::from_answer(""),
            Err(VisionError::EmptyResponse)
        ));
        assert!(matches!(
            FoodVerdict::from_answer("  \n\t"),
            Err(VisionError::EmptyResponse)
        ));
    }
}
