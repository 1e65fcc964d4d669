use std::sync::Arc;

use super::within;
use crate::error::{ResolveError, Stage, StoreError};
use crate::fingerprint::ImageFingerprint;
use crate::image::{ArchiveKind, ImageArchive};
use crate::store::RecipeStore;
use crate::types::{GenerationRequest, Recipe};
use crate::vision::VisionProvider;

/// Result of resolving a recipe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipeOutcome {
    pub recipe: Recipe,
    /// True when the recipe came from the store rather than the model.
    pub cached: bool,
}

/// Resolves the recipe for a fingerprint, generating and persisting it on a miss.
///
/// The cache key is the fingerprint alone: a hit is returned as stored, whatever
/// dietary preference or cuisine the new request asked for.
pub struct RecipeResolver {
    provider: Arc<dyn VisionProvider>,
    store: Arc<dyn RecipeStore>,
    archive: Arc<dyn ImageArchive>,
}

impl RecipeResolver {
    pub fn new(
        provider: Arc<dyn VisionProvider>,
        store: Arc<dyn RecipeStore>,
        archive: Arc<dyn ImageArchive>,
    ) -> Self {
        Self {
            provider,
            store,
            archive,
        }
    }

    pub async fn resolve(
        &self,
        fingerprint: &ImageFingerprint,
        request: &GenerationRequest,
    ) -> Result<RecipeOutcome, ResolveError> {
        let stage = Stage::Recipe;
        let deadline = request.deadline;

        if let Some(recipe) = within(deadline, stage, self.store.get_recipe(fingerprint)).await?? {
            tracing::info!(image_hash = %fingerprint, "Recipe found in store");
            return Ok(RecipeOutcome {
                recipe,
                cached: true,
            });
        }

        tracing::info!(
            image_hash = %fingerprint,
            provider = self.provider.provider_name(),
            model = self.provider.model_name(),
            dietary_preference = %request.dietary_preference,
            cuisine = %request.cuisine,
            "Recipe not found, generating with model"
        );

        let draft = within(
            deadline,
            stage,
            self.provider.generate_recipe(
                &request.image,
                &request.dietary_preference,
                &request.cuisine,
            ),
        )
        .await??;

        let image_path = within(
            deadline,
            stage,
            self.archive
                .archive(fingerprint, &request.image, ArchiveKind::Recipe),
        )
        .await?
        .map_err(StoreError::from)?;

        let recipe = draft.into_recipe(fingerprint.clone(), image_path);

        within(deadline, stage, self.store.save_recipe(&recipe)).await??;

        tracing::info!(image_hash = %fingerprint, title = %recipe.title, "Recipe generated and saved");

        Ok(RecipeOutcome {
            recipe,
            cached: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint::fingerprint;
    use crate::image::MemoryArchive;
    use crate::store::MemoryStore;
    use crate::vision::FakeVisionProvider;
    use std::time::Duration;

    fn request(image: &[u8], dietary_preference: &str) -> GenerationRequest {
        GenerationRequest::new(image.to_vec(), dietary_preference, "", Duration::from_secs(45))
    }

    #[tokio::test]
    async fn test_miss_generates_archives_and_saves() {
        let provider = Arc::new(FakeVisionProvider::new().with_recipe_response(
            r#"{"title":"X","ingredients":{"Egg":"2"},"instructions":["Boil"],"shopping_cart":{"Egg":"2"},"cuisine":"French"}"#,
        ));
        let store = Arc::new(MemoryStore::new());
        let archive = Arc::new(MemoryArchive::new());
        let resolver = RecipeResolver::new(provider.clone(), store.clone(), archive.clone());
        let fp = fingerprint(b"egg");

        let outcome = resolver.resolve(&fp, &request(b"egg", "")).await.unwrap();

        assert!(!outcome.cached);
        assert_eq!(outcome.recipe.fingerprint, fp);
        assert_eq!(outcome.recipe.title, "X");
        assert_eq!(outcome.recipe.cuisine, "french");
        assert_eq!(outcome.recipe.image_path, format!("memory://recipes/{}", fp));
        assert_eq!(store.get_recipe(&fp).await.unwrap(), Some(outcome.recipe));
        assert_eq!(archive.archived(), vec![(fp, ArchiveKind::Recipe)]);
    }

    #[tokio::test]
    async fn test_hit_ignores_request_preferences() {
        let provider = Arc::new(FakeVisionProvider::new());
        let store = Arc::new(MemoryStore::new());
        let resolver =
            RecipeResolver::new(provider.clone(), store, Arc::new(MemoryArchive::new()));
        let fp = fingerprint(b"salad");

        let first = resolver.resolve(&fp, &request(b"salad", "vegan")).await.unwrap();
        let second = resolver.resolve(&fp, &request(b"salad", "keto")).await.unwrap();

        assert!(second.cached);
        assert_eq!(second.recipe, first.recipe);
        assert_eq!(second.recipe.dietary_preference, "vegan");
        assert_eq!(provider.generate_calls(), 1);
    }

    #[tokio::test]
    async fn test_save_failure_is_fatal() {
        let store = Arc::new(MemoryStore::new());
        store.fail_recipe_writes(true);
        let resolver = RecipeResolver::new(
            Arc::new(FakeVisionProvider::new()),
            store,
            Arc::new(MemoryArchive::new()),
        );

        let err = resolver
            .resolve(&fingerprint(b"x"), &request(b"x", ""))
            .await
            .unwrap_err();
        assert!(matches!(err, ResolveError::Persistence(StoreError::Database(_))));
    }

    #[tokio::test]
    async fn test_archive_failure_is_fatal_and_nothing_saved() {
        let store = Arc::new(MemoryStore::new());
        let resolver = RecipeResolver::new(
            Arc::new(FakeVisionProvider::new()),
            store.clone(),
            Arc::new(MemoryArchive::failing()),
        );

        let err = resolver
            .resolve(&fingerprint(b"x"), &request(b"x", ""))
            .await
            .unwrap_err();
        assert!(matches!(err, ResolveError::Persistence(StoreError::Archive(_))));
        assert_eq!(store.recipe_count(), 0);
    }

    #[tokio::test]
    async fn test_malformed_output_saves_nothing() {
        let store = Arc::new(MemoryStore::new());
        let resolver = RecipeResolver::new(
            Arc::new(FakeVisionProvider::new().with_recipe_response("Sorry, no recipe today.")),
            store.clone(),
            Arc::new(MemoryArchive::new()),
        );

        let err = resolver
            .resolve(&fingerprint(b"x"), &request(b"x", ""))
            .await
            .unwrap_err();
        assert!(matches!(err, ResolveError::MalformedOutput(_)));
        assert_eq!(store.recipe_writes(), 0);
    }
}
