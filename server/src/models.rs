use std::collections::BTreeMap;

use diesel::prelude::*;
use snapchef_core::{ImageFingerprint, Recipe, StoreError};

#[derive(Queryable, Selectable, Insertable, AsChangeset, Debug)]
#[diesel(table_name = crate::schema::recipes)]
#[diesel(primary_key(image_hash))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct RecipeRow {
    pub image_hash: String,
    pub title: String,
    pub ingredients: serde_json::Value,
    pub instructions: serde_json::Value,
    pub shopping_cart: serde_json::Value,
    pub cuisine: String,
    pub dietary_preference: String,
    pub cooking_time: String,
    pub servings: String,
    pub image_path: String,
}

impl RecipeRow {
    pub fn from_recipe(recipe: &Recipe) -> Result<Self, StoreError> {
        Ok(Self {
            image_hash: recipe.fingerprint.to_string(),
            title: recipe.title.clone(),
            ingredients: to_json(&recipe.ingredients)?,
            instructions: to_json(&recipe.instructions)?,
            shopping_cart: to_json(&recipe.shopping_cart)?,
            cuisine: recipe.cuisine.clone(),
            dietary_preference: recipe.dietary_preference.clone(),
            cooking_time: recipe.cooking_time.clone(),
            servings: recipe.servings.clone(),
            image_path: recipe.image_path.clone(),
        })
    }

    pub fn into_recipe(self) -> Result<Recipe, StoreError> {
        let fingerprint = ImageFingerprint::parse(&self.image_hash)
            .map_err(|e| StoreError::Corrupt(format!("{}: {}", self.image_hash, e)))?;

        Ok(Recipe {
            fingerprint,
            title: self.title,
            ingredients: from_json::<BTreeMap<String, String>>(self.ingredients, "ingredients")?,
            instructions: from_json::<Vec<String>>(self.instructions, "instructions")?,
            shopping_cart: from_json::<BTreeMap<String, String>>(
                self.shopping_cart,
                "shopping_cart",
            )?,
            cuisine: self.cuisine,
            dietary_preference: self.dietary_preference,
            cooking_time: self.cooking_time,
            servings: self.servings,
            image_path: self.image_path,
        })
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<serde_json::Value, StoreError> {
    serde_json::to_value(value).map_err(|e| StoreError::Corrupt(e.to_string()))
}

fn from_json<T: serde::de::DeserializeOwned>(
    value: serde_json::Value,
    column: &str,
) -> Result<T, StoreError> {
    serde_json::from_value(value)
        .map_err(|e| StoreError::Corrupt(format!("Invalid {} column: {}", column, e)))
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::image_metadata)]
pub struct NewImageMetadata<'a> {
    pub image_hash: &'a str,
    pub description: &'a str,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::image_data)]
pub struct NewImageData<'a> {
    pub image_hash: &'a str,
    #[diesel(column_name = data)]
    pub image_data: &'a str,
}
