use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::fingerprint::ImageFingerprint;

/// Decide whether a classification description describes food.
///
/// The description is trimmed and lowercased; anything starting with "no" is not
/// food. Classifications store only the description, so this is the one place the
/// food flag is derived, for cached and freshly generated classifications alike.
pub fn is_food_description(description: &str) -> bool {
    !description.trim().to_lowercase().starts_with("no")
}

/// A persisted food/not-food judgment for an image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub fingerprint: ImageFingerprint,
    pub description: String,
}

impl Classification {
    pub fn new(fingerprint: ImageFingerprint, description: impl Into<String>) -> Self {
        Self {
            fingerprint,
            description: description.into(),
        }
    }

    pub fn is_food(&self) -> bool {
        is_food_description(&self.description)
    }
}

/// A recipe as stored and served.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Recipe {
    #[serde(rename = "image_hash")]
    pub fingerprint: ImageFingerprint,
    pub title: String,
    pub ingredients: BTreeMap<String, String>,
    pub instructions: Vec<String>,
    pub shopping_cart: BTreeMap<String, String>,
    pub cuisine: String,
    pub dietary_preference: String,
    pub cooking_time: String,
    pub servings: String,
    pub image_path: String,
}

/// A generated recipe that has not yet been tied to an image.
///
/// Providers produce drafts; the recipe resolver turns them into [`Recipe`]s once it
/// knows the fingerprint and where the image was archived.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct RecipeDraft {
    pub title: String,
    pub ingredients: BTreeMap<String, String>,
    pub instructions: Vec<String>,
    pub shopping_cart: BTreeMap<String, String>,
    pub cuisine: String,
    pub dietary_preference: String,
    pub cooking_time: String,
    pub servings: String,
}

impl RecipeDraft {
    /// Build the stored recipe. Cuisine and dietary preference are lowercased here
    /// and nowhere else.
    pub fn into_recipe(self, fingerprint: ImageFingerprint, image_path: impl Into<String>) -> Recipe {
        Recipe {
            fingerprint,
            title: self.title,
            ingredients: self.ingredients,
            instructions: self.instructions,
            shopping_cart: self.shopping_cart,
            cuisine: self.cuisine.to_lowercase(),
            dietary_preference: self.dietary_preference.to_lowercase(),
            cooking_time: self.cooking_time,
            servings: self.servings,
            image_path: image_path.into(),
        }
    }

    /// Overwrite the model's self-reported cuisine and dietary preference with the
    /// values the caller asked for, when they asked for any.
    pub fn apply_requested(&mut self, dietary_preference: &str, cuisine: &str) {
        if !dietary_preference.trim().is_empty() {
            self.dietary_preference = dietary_preference.trim().to_string();
        }
        if !cuisine.trim().is_empty() {
            self.cuisine = cuisine.trim().to_string();
        }
    }
}

/// Optional filters for listing recipes. Both set means both must match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipeFilter {
    pub cuisine: Option<String>,
    pub dietary_preference: Option<String>,
}

impl RecipeFilter {
    /// Build a filter from raw query values. Empty values mean "no constraint", and
    /// values are lowercased to match how recipes are stored.
    pub fn new(cuisine: Option<&str>, dietary_preference: Option<&str>) -> Self {
        fn normalize(value: Option<&str>) -> Option<String> {
            value
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_lowercase)
        }

        Self {
            cuisine: normalize(cuisine),
            dietary_preference: normalize(dietary_preference),
        }
    }

    pub fn matches(&self, recipe: &Recipe) -> bool {
        self.cuisine.as_deref().is_none_or(|c| recipe.cuisine == c)
            && self
                .dietary_preference
                .as_deref()
                .is_none_or(|d| recipe.dietary_preference == d)
    }
}

/// Everything needed to generate a recipe for one upload. Never persisted.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub image: Vec<u8>,
    pub dietary_preference: String,
    pub cuisine: String,
    pub deadline: Instant,
}

impl GenerationRequest {
    pub fn new(
        image: Vec<u8>,
        dietary_preference: impl Into<String>,
        cuisine: impl Into<String>,
        budget: Duration,
    ) -> Self {
        Self {
            image,
            dietary_preference: dietary_preference.into(),
            cuisine: cuisine.into(),
            deadline: Instant::now() + budget,
        }
    }
}
