//! In-memory store, for tests and for running without a database.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::RwLock;

use super::RecipeStore;
use crate::error::StoreError;
use crate::fingerprint::ImageFingerprint;
use crate::types::{Classification, Recipe, RecipeFilter};

#[derive(Debug, Default)]
pub struct MemoryStore {
    classifications: RwLock<HashMap<ImageFingerprint, String>>,
    recipes: RwLock<HashMap<ImageFingerprint, Recipe>>,
    image_data: RwLock<HashMap<ImageFingerprint, String>>,
    fail_classification_reads: AtomicBool,
    fail_recipe_reads: AtomicBool,
    fail_classification_writes: AtomicBool,
    fail_recipe_writes: AtomicBool,
    recipe_writes: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every `get_classification` fail.
    pub fn fail_classification_reads(&self, fail: bool) {
        self.fail_classification_reads.store(fail, Ordering::SeqCst);
    }

    /// Make every `get_recipe` fail.
    pub fn fail_recipe_reads(&self, fail: bool) {
        self.fail_recipe_reads.store(fail, Ordering::SeqCst);
    }

    /// Make every `save_classification` fail, to exercise the swallow path.
    pub fn fail_classification_writes(&self, fail: bool) {
        self.fail_classification_writes.store(fail, Ordering::SeqCst);
    }

    /// Make every `save_recipe` fail.
    pub fn fail_recipe_writes(&self, fail: bool) {
        self.fail_recipe_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of successful `save_recipe` calls.
    pub fn recipe_writes(&self) -> usize {
        self.recipe_writes.load(Ordering::SeqCst)
    }

    pub fn recipe_count(&self) -> usize {
        self.recipes.read().map(|r| r.len()).unwrap_or(0)
    }
}

fn poisoned<T>(_: T) -> StoreError {
    StoreError::Database("memory store lock poisoned".to_string())
}

#[async_trait]
impl RecipeStore for MemoryStore {
    async fn get_classification(
        &self,
        fingerprint: &ImageFingerprint,
    ) -> Result<Option<Classification>, StoreError> {
        if self.fail_classification_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Database("classification reads disabled".to_string()));
        }
        let classifications = self.classifications.read().map_err(poisoned)?;
        Ok(classifications
            .get(fingerprint)
            .map(|description| Classification::new(fingerprint.clone(), description.clone())))
    }

    async fn save_classification(
        &self,
        fingerprint: &ImageFingerprint,
        description: &str,
    ) -> Result<(), StoreError> {
        if self.fail_classification_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Database(
                "classification writes disabled".to_string(),
            ));
        }
        self.classifications
            .write()
            .map_err(poisoned)?
            .insert(fingerprint.clone(), description.to_string());
        Ok(())
    }

    async fn get_recipe(
        &self,
        fingerprint: &ImageFingerprint,
    ) -> Result<Option<Recipe>, StoreError> {
        if self.fail_recipe_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Database("recipe reads disabled".to_string()));
        }
        Ok(self.recipes.read().map_err(poisoned)?.get(fingerprint).cloned())
    }

    async fn save_recipe(&self, recipe: &Recipe) -> Result<(), StoreError> {
        if self.fail_recipe_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Database("recipe writes disabled".to_string()));
        }
        self.recipes
            .write()
            .map_err(poisoned)?
            .insert(recipe.fingerprint.clone(), recipe.clone());
        self.recipe_writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn list_recipes(&self, filter: &RecipeFilter) -> Result<Vec<Recipe>, StoreError> {
        let recipes = self.recipes.read().map_err(poisoned)?;
        let mut matching: Vec<Recipe> = recipes
            .values()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        matching.sort_by(|a, b| a.fingerprint.cmp(&b.fingerprint));
        Ok(matching)
    }

    async fn save_image_data(
        &self,
        fingerprint: &ImageFingerprint,
        encoded: &str,
    ) -> Result<(), StoreError> {
        self.image_data
            .write()
            .map_err(poisoned)?
            .insert(fingerprint.clone(), encoded.to_string());
        Ok(())
    }

    async fn get_image_data(
        &self,
        fingerprint: &ImageFingerprint,
    ) -> Result<Option<String>, StoreError> {
        Ok(self
            .image_data
            .read()
            .map_err(poisoned)?
            .get(fingerprint)
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint::fingerprint;
    use crate::types::RecipeDraft;

    fn recipe(bytes: &[u8], title: &str, cuisine: &str, diet: &str) -> Recipe {
        RecipeDraft {
            title: title.to_string(),
            cuisine: cuisine.to_string(),
            dietary_preference: diet.to_string(),
            ..Default::default()
        }
        .into_recipe(fingerprint(bytes), "")
    }

    #[tokio::test]
    async fn test_save_recipe_upserts() {
        let store = MemoryStore::new();
        store.save_recipe(&recipe(b"a", "First", "", "")).await.unwrap();
        store.save_recipe(&recipe(b"a", "Second", "", "")).await.unwrap();

        let stored = store.get_recipe(&fingerprint(b"a")).await.unwrap().unwrap();
        assert_eq!(stored.title, "Second");
        assert_eq!(store.recipe_count(), 1);
        assert_eq!(store.recipe_writes(), 2);
    }

    #[tokio::test]
    async fn test_list_recipes_filters() {
        let store = MemoryStore::new();
        store.save_recipe(&recipe(b"a", "A", "Italian", "Vegan")).await.unwrap();
        store.save_recipe(&recipe(b"b", "B", "italian", "keto")).await.unwrap();
        store.save_recipe(&recipe(b"c", "C", "thai", "vegan")).await.unwrap();

        let all = store.list_recipes(&RecipeFilter::default()).await.unwrap();
        assert_eq!(all.len(), 3);

        let italian = store
            .list_recipes(&RecipeFilter::new(Some("ITALIAN"), None))
            .await
            .unwrap();
        assert_eq!(italian.len(), 2);

        let both = store
            .list_recipes(&RecipeFilter::new(Some("italian"), Some("vegan")))
            .await
            .unwrap();
        assert_eq!(both.len(), 1);
        assert_eq!(both[0].title, "A");
    }

    #[tokio::test]
    async fn test_classification_round_trip_and_failure() {
        let store = MemoryStore::new();
        let fp = fingerprint(b"a");
        assert!(store.get_classification(&fp).await.unwrap().is_none());

        store.save_classification(&fp, "NO a shoe").await.unwrap();
        let stored = store.get_classification(&fp).await.unwrap().unwrap();
        assert!(!stored.is_food());

        store.fail_classification_writes(true);
        assert!(store.save_classification(&fp, "pizza").await.is_err());
    }
}
