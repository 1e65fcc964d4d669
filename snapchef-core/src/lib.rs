pub mod error;
pub mod fingerprint;
pub mod image;
pub mod pipeline;
pub mod resolve;
pub mod store;
pub mod types;
pub mod vision;

pub use error::{ErrorKind, ResolveError, Stage, StoreError};
pub use fingerprint::{fingerprint, ImageFingerprint, InvalidFingerprint};
pub use image::{ArchiveError, ArchiveKind, DiskImageArchive, ImageArchive, MemoryArchive};
pub use pipeline::{Resolution, ResolutionPipeline, LOOKUP_TIMEOUT, RESOLVE_TIMEOUT};
pub use store::{MemoryStore, RecipeStore};
pub use types::{
    is_food_description, Classification, GenerationRequest, Recipe, RecipeDraft, RecipeFilter,
};
pub use vision::{
    FakeVisionProvider, FoodVerdict, GeminiProvider, LocalProvider, VisionError, VisionProvider,
};
