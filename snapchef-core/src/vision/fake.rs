//! Fake vision provider for testing.
//!
//! Returns scripted answers without network access and counts how often each
//! operation was called, so tests can assert that a cache hit skipped the model.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use super::parse::parse_recipe_in_text;
use super::{FoodVerdict, VisionError, VisionProvider};
use crate::types::RecipeDraft;

/// A fake vision provider for testing.
#[derive(Debug)]
pub struct FakeVisionProvider {
    description: String,
    recipe_response: String,
    delay: Option<Duration>,
    fail_with: Option<String>,
    classify_calls: AtomicUsize,
    generate_calls: AtomicUsize,
    /// (dietary_preference, cuisine) of every generate call, in order.
    generate_args: Mutex<Vec<(String, String)>>,
}

impl Default for FakeVisionProvider {
    fn default() -> Self {
        Self {
            description: "A plate of food".to_string(),
            recipe_response: r#"{"title":"Fake Recipe","ingredients":{"Flour":"2 cups"},"instructions":["Mix ingredients"],"shopping_cart":{"Flour":"2 cups"},"cuisine":"","dietary_preference":"","cooking_time":"10 minutes","servings":"2"}"#.to_string(),
            delay: None,
            fail_with: None,
            classify_calls: AtomicUsize::new(0),
            generate_calls: AtomicUsize::new(0),
            generate_args: Mutex::new(Vec::new()),
        }
    }
}

impl FakeVisionProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Description returned by `classify`; its "no" prefix decides the flag.
    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    /// Raw model text returned by `generate_recipe`, parsed like a real response.
    pub fn with_recipe_response(mut self, response: &str) -> Self {
        self.recipe_response = response.to_string();
        self
    }

    /// Sleep before answering, to exercise deadlines.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Fail every call with a transport error.
    pub fn failing(mut self, message: &str) -> Self {
        self.fail_with = Some(message.to_string());
        self
    }

    pub fn classify_calls(&self) -> usize {
        self.classify_calls.load(Ordering::SeqCst)
    }

    pub fn generate_calls(&self) -> usize {
        self.generate_calls.load(Ordering::SeqCst)
    }

    pub fn generate_args(&self) -> Vec<(String, String)> {
        self.generate_args
            .lock()
            .map(|args| args.clone())
            .unwrap_or_default()
    }

    async fn respond(&self) -> Result<(), VisionError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.fail_with {
            Some(message) => Err(VisionError::Transport(message.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl VisionProvider for FakeVisionProvider {
    async fn classify(&self, _image: &[u8]) -> Result<FoodVerdict, VisionError> {
        self.classify_calls.fetch_add(1, Ordering::SeqCst);
        self.respond().await?;
        FoodVerdict::from_answer(self.description.clone())
    }

    async fn generate_recipe(
        &self,
        _image: &[u8],
        dietary_preference: &str,
        cuisine: &str,
    ) -> Result<RecipeDraft, VisionError> {
        self.generate_calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut args) = self.generate_args.lock() {
            args.push((dietary_preference.to_string(), cuisine.to_string()));
        }
        self.respond().await?;

        let mut draft = parse_recipe_in_text(&self.recipe_response)?;
        draft.apply_requested(dietary_preference, cuisine);
        Ok(draft)
    }

    fn provider_name(&self) -> &'static str {
        "fake"
    }

    fn model_name(&self) -> &str {
        "fake-model"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fake_classify_counts_calls() {
        let provider = FakeVisionProvider::new().with_description("NO a blue umbrella");
        let verdict = provider.classify(b"img").await.unwrap();
        assert!(!verdict.is_food);
        assert_eq!(provider.classify_calls(), 1);
        assert_eq!(provider.generate_calls(), 0);
    }

    #[tokio::test]
    async fn test_fake_generate_records_arguments() {
        let provider = FakeVisionProvider::new();
        let draft = provider.generate_recipe(b"img", "vegan", "").await.unwrap();
        assert_eq!(draft.title, "Fake Recipe");
        assert_eq!(draft.dietary_preference, "vegan");
        assert_eq!(
            provider.generate_args(),
            vec![("vegan".to_string(), String::new())]
        );
    }

    #[tokio::test]
    async fn test_fake_failure() {
        let provider = FakeVisionProvider::new().failing("boom");
        let err = provider.classify(b"img").await.unwrap_err();
        assert!(matches!(err, VisionError::Transport(m) if m == "boom"));
    }

    #[tokio::test]
    async fn test_fake_malformed_response() {
        let provider = FakeVisionProvider::new().with_recipe_response("no recipe here");
        let err = provider.generate_recipe(b"img", "", "").await.unwrap_err();
        assert!(matches!(err, VisionError::MalformedOutput { .. }));
    }
}
