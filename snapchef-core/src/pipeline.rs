//! The resolution pipeline: fingerprint, classify, then resolve a recipe.
//!
//! ```text
//! Start -> Classifying -> Rejected
//!                      -> Classified -> Resolving -> RecipeReady
//! (any stage)          -> Failed
//! ```
//!
//! Both stages share one deadline set when the request arrives. Nothing is retried.
//! Concurrent requests for the same image are not de-duplicated: both may miss the
//! cache, both call the model, and the later write wins.

use std::sync::Arc;
use std::time::Duration;

use base64::{engine::general_purpose::STANDARD, Engine};
use tokio::time::Instant;

use crate::error::{ResolveError, Stage, StoreError};
use crate::fingerprint::ImageFingerprint;
use crate::image::{ArchiveKind, ImageArchive};
use crate::resolve::{within, ClassificationResolver, RecipeResolver};
use crate::store::RecipeStore;
use crate::types::{GenerationRequest, Recipe, RecipeDraft, RecipeFilter};
use crate::vision::{FoodVerdict, VisionProvider};

/// Budget for classification plus recipe resolution.
pub const RESOLVE_TIMEOUT: Duration = Duration::from_secs(45);

/// Budget for plain store reads.
pub const LOOKUP_TIMEOUT: Duration = Duration::from_secs(5);

/// Terminal outcome of a successful pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The image is not food. No recipe was looked up or generated.
    Rejected {
        fingerprint: ImageFingerprint,
        description: String,
    },
    /// A recipe is available, from the store or freshly generated.
    Ready { recipe: Recipe, cached: bool },
}

/// Entry point used by the HTTP layer. Cheap to share behind an `Arc`.
pub struct ResolutionPipeline {
    provider: Arc<dyn VisionProvider>,
    store: Arc<dyn RecipeStore>,
    archive: Arc<dyn ImageArchive>,
    classifier: ClassificationResolver,
    recipes: RecipeResolver,
    resolve_timeout: Duration,
    lookup_timeout: Duration,
}

impl ResolutionPipeline {
    pub fn new(
        provider: Arc<dyn VisionProvider>,
        store: Arc<dyn RecipeStore>,
        archive: Arc<dyn ImageArchive>,
    ) -> Self {
        Self {
            classifier: ClassificationResolver::new(provider.clone(), store.clone()),
            recipes: RecipeResolver::new(provider.clone(), store.clone(), archive.clone()),
            provider,
            store,
            archive,
            resolve_timeout: RESOLVE_TIMEOUT,
            lookup_timeout: LOOKUP_TIMEOUT,
        }
    }

    /// Override the classify+generate budget.
    pub fn with_resolve_timeout(mut self, timeout: Duration) -> Self {
        self.resolve_timeout = timeout;
        self
    }

    /// Override the budget for store reads.
    pub fn with_lookup_timeout(mut self, timeout: Duration) -> Self {
        self.lookup_timeout = timeout;
        self
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.provider_name()
    }

    /// Run the full pipeline for one uploaded image.
    pub async fn run(
        &self,
        image: Vec<u8>,
        dietary_preference: &str,
        cuisine: &str,
    ) -> Result<Resolution, ResolveError> {
        let request =
            GenerationRequest::new(image, dietary_preference, cuisine, self.resolve_timeout);
        let fingerprint = ImageFingerprint::of(&request.image);

        let classification = self
            .classifier
            .resolve(&fingerprint, &request.image, request.deadline)
            .await?;

        tracing::info!(
            image_hash = %fingerprint,
            is_food = classification.is_food,
            cached = classification.cached,
            "classification produced"
        );

        if !classification.is_food {
            self.archive_rejected(&fingerprint, &request.image, request.deadline)
                .await;
            tracing::info!(image_hash = %fingerprint, "image rejected");
            return Ok(Resolution::Rejected {
                fingerprint,
                description: classification.description,
            });
        }

        let outcome = self.recipes.resolve(&fingerprint, &request).await?;

        tracing::info!(
            image_hash = %fingerprint,
            cached = outcome.cached,
            "recipe produced"
        );

        Ok(Resolution::Ready {
            recipe: outcome.recipe,
            cached: outcome.cached,
        })
    }

    /// Best effort, bounded by the request deadline: a failure or timeout here never
    /// changes the outcome.
    async fn archive_rejected(
        &self,
        fingerprint: &ImageFingerprint,
        image: &[u8],
        deadline: Instant,
    ) {
        let archived = within(
            deadline,
            Stage::Classification,
            self.archive.archive(fingerprint, image, ArchiveKind::Rejected),
        )
        .await
        .and_then(|result| result.map_err(|e| ResolveError::from(StoreError::from(e))));

        match archived {
            Ok(path) => tracing::debug!(image_hash = %fingerprint, path = %path, "Archived non-food image"),
            Err(e) => {
                tracing::warn!(image_hash = %fingerprint, error = %e, "Failed to archive non-food image")
            }
        }
    }

    fn lookup_deadline(&self) -> Instant {
        Instant::now() + self.lookup_timeout
    }

    /// Fetch a stored recipe.
    pub async fn lookup_recipe(
        &self,
        fingerprint: &ImageFingerprint,
    ) -> Result<Option<Recipe>, ResolveError> {
        let recipe =
            within(self.lookup_deadline(), Stage::Lookup, self.store.get_recipe(fingerprint))
                .await??;
        Ok(recipe)
    }

    /// List stored recipes matching the filter.
    pub async fn list_recipes(&self, filter: &RecipeFilter) -> Result<Vec<Recipe>, ResolveError> {
        let recipes =
            within(self.lookup_deadline(), Stage::Lookup, self.store.list_recipes(filter))
                .await??;
        Ok(recipes)
    }

    /// Fetch the stored classification description for an image.
    pub async fn lookup_description(
        &self,
        fingerprint: &ImageFingerprint,
    ) -> Result<Option<String>, ResolveError> {
        let classification = within(
            self.lookup_deadline(),
            Stage::Lookup,
            self.store.get_classification(fingerprint),
        )
        .await??;
        Ok(classification.map(|c| c.description))
    }

    /// Store the image base64-encoded, keyed by its fingerprint.
    pub async fn store_image_data(&self, image: &[u8]) -> Result<ImageFingerprint, ResolveError> {
        let fingerprint = ImageFingerprint::of(image);
        let encoded = STANDARD.encode(image);
        let deadline = Instant::now() + self.resolve_timeout;

        within(
            deadline,
            Stage::Lookup,
            self.store.save_image_data(&fingerprint, &encoded),
        )
        .await??;

        Ok(fingerprint)
    }

    /// Fetch base64 image data stored by [`Self::store_image_data`].
    pub async fn lookup_image_data(
        &self,
        fingerprint: &ImageFingerprint,
    ) -> Result<Option<String>, ResolveError> {
        let data = within(
            self.lookup_deadline(),
            Stage::Lookup,
            self.store.get_image_data(fingerprint),
        )
        .await??;
        Ok(data)
    }

    /// Classify without consulting or updating the store.
    pub async fn preview_classification(&self, image: &[u8]) -> Result<FoodVerdict, ResolveError> {
        let deadline = Instant::now() + self.resolve_timeout;
        let verdict =
            within(deadline, Stage::Classification, self.provider.classify(image)).await??;
        Ok(verdict)
    }

    /// Generate a recipe without consulting or updating the store.
    pub async fn preview_recipe(
        &self,
        image: &[u8],
        dietary_preference: &str,
        cuisine: &str,
    ) -> Result<RecipeDraft, ResolveError> {
        let deadline = Instant::now() + self.resolve_timeout;
        let draft = within(
            deadline,
            Stage::Recipe,
            self.provider
                .generate_recipe(image, dietary_preference, cuisine),
        )
        .await??;
        Ok(draft)
    }
}
