use std::sync::Arc;

use tokio::time::Instant;

use super::within;
use crate::error::{ResolveError, Stage};
use crate::fingerprint::ImageFingerprint;
use crate::store::RecipeStore;
use crate::types::is_food_description;
use crate::vision::VisionProvider;

/// Result of classifying one image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassificationOutcome {
    pub is_food: bool,
    pub description: String,
    /// True when the description came from the store rather than the model.
    pub cached: bool,
}

/// Decides food / not food for a fingerprint, asking the model only on a miss.
pub struct ClassificationResolver {
    provider: Arc<dyn VisionProvider>,
    store: Arc<dyn RecipeStore>,
}

impl ClassificationResolver {
    pub fn new(provider: Arc<dyn VisionProvider>, store: Arc<dyn RecipeStore>) -> Self {
        Self { provider, store }
    }

    pub async fn resolve(
        &self,
        fingerprint: &ImageFingerprint,
        image: &[u8],
        deadline: Instant,
    ) -> Result<ClassificationOutcome, ResolveError> {
        let stage = Stage::Classification;

        // A blank description holds no verdict; ask the model again.
        let stored = within(deadline, stage, self.store.get_classification(fingerprint))
            .await??
            .filter(|c| !c.description.trim().is_empty());

        if let Some(stored) = stored {
            tracing::info!(image_hash = %fingerprint, "Image metadata found in store");
            return Ok(ClassificationOutcome {
                is_food: is_food_description(&stored.description),
                description: stored.description,
                cached: true,
            });
        }

        tracing::info!(
            image_hash = %fingerprint,
            provider = self.provider.provider_name(),
            model = self.provider.model_name(),
            "Image metadata not found, classifying with model"
        );

        let verdict = within(deadline, stage, self.provider.classify(image)).await??;
        let is_food = is_food_description(&verdict.description);
        if is_food != verdict.is_food {
            tracing::warn!(
                image_hash = %fingerprint,
                provider = self.provider.provider_name(),
                "Provider food flag disagrees with its description, using description"
            );
        }

        // Losing the metadata only costs a repeat model call next time.
        let saved = within(
            deadline,
            stage,
            self.store.save_classification(fingerprint, &verdict.description),
        )
        .await
        .and_then(|result| result.map_err(ResolveError::from));
        if let Err(e) = saved {
            tracing::warn!(image_hash = %fingerprint, error = %e, "Failed to save image metadata");
        }

        Ok(ClassificationOutcome {
            is_food,
            description: verdict.description,
            cached: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::fingerprint::fingerprint;
    use crate::store::MemoryStore;
    use crate::vision::{FakeVisionProvider, VisionError};
    use std::time::Duration;

    fn deadline() -> Instant {
        Instant::now() + Duration::from_secs(45)
    }

    #[tokio::test]
    async fn test_miss_calls_model_and_persists() {
        let provider = Arc::new(FakeVisionProvider::new().with_description("A delicious pasta dish"));
        let store = Arc::new(MemoryStore::new());
        let resolver = ClassificationResolver::new(provider.clone(), store.clone());
        let fp = fingerprint(b"pasta");

        let outcome = resolver.resolve(&fp, b"pasta", deadline()).await.unwrap();

        assert!(outcome.is_food);
        assert!(!outcome.cached);
        assert_eq!(provider.classify_calls(), 1);
        let stored = store.get_classification(&fp).await.unwrap().unwrap();
        assert_eq!(stored.description, "A delicious pasta dish");
    }

    #[tokio::test]
    async fn test_hit_skips_model() {
        let provider = Arc::new(FakeVisionProvider::new());
        let store = Arc::new(MemoryStore::new());
        let fp = fingerprint(b"cake");
        store
            .save_classification(&fp, "No cake detected here")
            .await
            .unwrap();

        let resolver = ClassificationResolver::new(provider.clone(), store);
        let outcome = resolver.resolve(&fp, b"cake", deadline()).await.unwrap();

        assert!(!outcome.is_food);
        assert!(outcome.cached);
        assert_eq!(outcome.description, "No cake detected here");
        assert_eq!(provider.classify_calls(), 0);
    }

    #[tokio::test]
    async fn test_blank_stored_description_is_a_miss() {
        let provider = Arc::new(FakeVisionProvider::new().with_description("NO a red shoe"));
        let store = Arc::new(MemoryStore::new());
        let fp = fingerprint(b"shoe");
        store.save_classification(&fp, "  ").await.unwrap();

        let resolver = ClassificationResolver::new(provider.clone(), store.clone());
        let outcome = resolver.resolve(&fp, b"shoe", deadline()).await.unwrap();

        assert!(!outcome.is_food);
        assert!(!outcome.cached);
        assert_eq!(provider.classify_calls(), 1);
        let stored = store.get_classification(&fp).await.unwrap().unwrap();
        assert_eq!(stored.description, "NO a red shoe");
    }

    #[tokio::test]
    async fn test_blank_model_answer_is_not_persisted() {
        let provider = Arc::new(FakeVisionProvider::new().with_description(""));
        let store = Arc::new(MemoryStore::new());
        let resolver = ClassificationResolver::new(provider, store.clone());
        let fp = fingerprint(b"blank");

        let err = resolver.resolve(&fp, b"blank", deadline()).await.unwrap_err();

        assert!(matches!(err, ResolveError::Model(VisionError::EmptyResponse)));
        assert!(store.get_classification(&fp).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_read_failure_is_fatal() {
        let provider = Arc::new(FakeVisionProvider::new());
        let store = Arc::new(MemoryStore::new());
        store.fail_classification_reads(true);
        let resolver = ClassificationResolver::new(provider.clone(), store);

        let err = resolver
            .resolve(&fingerprint(b"x"), b"x", deadline())
            .await
            .unwrap_err();

        assert!(matches!(err, ResolveError::Persistence(StoreError::Database(_))));
        assert_eq!(provider.classify_calls(), 0);
    }

    #[tokio::test]
    async fn test_save_failure_is_swallowed() {
        let provider = Arc::new(FakeVisionProvider::new());
        let store = Arc::new(MemoryStore::new());
        store.fail_classification_writes(true);
        let resolver = ClassificationResolver::new(provider, store.clone());
        let fp = fingerprint(b"soup");

        let outcome = resolver.resolve(&fp, b"soup", deadline()).await.unwrap();

        assert!(outcome.is_food);
        assert!(store.get_classification(&fp).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_model_failure_is_fatal() {
        let provider = Arc::new(FakeVisionProvider::new().failing("unreachable"));
        let resolver = ClassificationResolver::new(provider, Arc::new(MemoryStore::new()));

        let err = resolver
            .resolve(&fingerprint(b"x"), b"x", deadline())
            .await
            .unwrap_err();
        assert!(matches!(err, ResolveError::Model(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_model_times_out() {
        let provider =
            Arc::new(FakeVisionProvider::new().with_delay(Duration::from_secs(60)));
        let store = Arc::new(MemoryStore::new());
        let resolver = ClassificationResolver::new(provider, store.clone());
        let fp = fingerprint(b"x");

        let err = resolver.resolve(&fp, b"x", deadline()).await.unwrap_err();

        assert!(matches!(
            err,
            ResolveError::Timeout {
                stage: Stage::Classification
            }
        ));
        assert!(store.get_classification(&fp).await.unwrap().is_none());
    }
}
