//! Durable storage for classifications and recipes, keyed by image fingerprint.
//!
//! The pipeline only sees the [`RecipeStore`] trait. `MemoryStore` lives here; the
//! PostgreSQL implementation lives in the server crate next to its schema.

mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::fingerprint::ImageFingerprint;
use crate::types::{Classification, Recipe, RecipeFilter};

/// Every write is a single upsert keyed by fingerprint; there are no multi-step
/// transactions. Implementations must be safe to share between requests.
#[async_trait]
pub trait RecipeStore: Send + Sync {
    async fn get_classification(
        &self,
        fingerprint: &ImageFingerprint,
    ) -> Result<Option<Classification>, StoreError>;

    async fn save_classification(
        &self,
        fingerprint: &ImageFingerprint,
        description: &str,
    ) -> Result<(), StoreError>;

    async fn get_recipe(&self, fingerprint: &ImageFingerprint)
        -> Result<Option<Recipe>, StoreError>;

    /// Insert or overwrite the recipe with the same fingerprint.
    async fn save_recipe(&self, recipe: &Recipe) -> Result<(), StoreError>;

    async fn list_recipes(&self, filter: &RecipeFilter) -> Result<Vec<Recipe>, StoreError>;

    /// Store base64-encoded image data for later retrieval.
    async fn save_image_data(
        &self,
        fingerprint: &ImageFingerprint,
        encoded: &str,
    ) -> Result<(), StoreError>;

    async fn get_image_data(&self, fingerprint: &ImageFingerprint)
        -> Result<Option<String>, StoreError>;
}
