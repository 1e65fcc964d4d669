//! PostgreSQL implementation of [`RecipeStore`].
//!
//! Diesel is synchronous, so every call checks out a pooled connection on the
//! blocking thread pool. A query that outlives the caller's deadline keeps running
//! to completion; only the awaiting future is dropped.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel::upsert::excluded;
use snapchef_core::{Classification, ImageFingerprint, Recipe, RecipeFilter, RecipeStore, StoreError};

use crate::db::DbPool;
use crate::models::{NewImageData, NewImageMetadata, RecipeRow};
use crate::schema::{image_data, image_metadata, recipes};

#[derive(Clone)]
pub struct PgRecipeStore {
    pool: DbPool,
}

impl PgRecipeStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn run<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&mut PgConnection) -> Result<T, StoreError> + Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool
                .get()
                .map_err(|e| StoreError::Database(format!("Failed to get DB connection: {}", e)))?;
            f(&mut conn)
        })
        .await
        .map_err(|e| StoreError::Database(format!("Database task failed: {}", e)))?
    }
}

fn db_error(e: diesel::result::Error) -> StoreError {
    StoreError::Database(e.to_string())
}

#[async_trait]
impl RecipeStore for PgRecipeStore {
    async fn get_classification(
        &self,
        fingerprint: &ImageFingerprint,
    ) -> Result<Option<Classification>, StoreError> {
        let fingerprint = fingerprint.clone();
        self.run(move |conn| {
            let description: Option<String> = image_metadata::table
                .find(fingerprint.as_str())
                .select(image_metadata::description)
                .first(conn)
                .optional()
                .map_err(db_error)?;
            Ok(description.map(|d| Classification::new(fingerprint, d)))
        })
        .await
    }

    async fn save_classification(
        &self,
        fingerprint: &ImageFingerprint,
        description: &str,
    ) -> Result<(), StoreError> {
        let fingerprint = fingerprint.clone();
        let description = description.to_string();
        self.run(move |conn| {
            diesel::insert_into(image_metadata::table)
                .values(&NewImageMetadata {
                    image_hash: fingerprint.as_str(),
                    description: &description,
                })
                .on_conflict(image_metadata::image_hash)
                .do_update()
                .set(image_metadata::description.eq(excluded(image_metadata::description)))
                .execute(conn)
                .map_err(db_error)?;
            Ok(())
        })
        .await
    }

    async fn get_recipe(&self, fingerprint: &ImageFingerprint) -> Result<Option<Recipe>, StoreError> {
        let fingerprint = fingerprint.clone();
        self.run(move |conn| {
            let row: Option<RecipeRow> = recipes::table
                .find(fingerprint.as_str())
                .select(RecipeRow::as_select())
                .first(conn)
                .optional()
                .map_err(db_error)?;
            row.map(RecipeRow::into_recipe).transpose()
        })
        .await
    }

    async fn save_recipe(&self, recipe: &Recipe) -> Result<(), StoreError> {
        let row = RecipeRow::from_recipe(recipe)?;
        self.run(move |conn| {
            diesel::insert_into(recipes::table)
                .values(&row)
                .on_conflict(recipes::image_hash)
                .do_update()
                .set(&row)
                .execute(conn)
                .map_err(db_error)?;
            Ok(())
        })
        .await
    }

    async fn list_recipes(&self, filter: &RecipeFilter) -> Result<Vec<Recipe>, StoreError> {
        let filter = filter.clone();
        self.run(move |conn| {
            let mut query = recipes::table
                .select(RecipeRow::as_select())
                .order(recipes::image_hash.asc())
                .into_boxed();
            if let Some(cuisine) = filter.cuisine {
                query = query.filter(recipes::cuisine.eq(cuisine));
            }
            if let Some(dietary_preference) = filter.dietary_preference {
                query = query.filter(recipes::dietary_preference.eq(dietary_preference));
            }

            let rows: Vec<RecipeRow> = query.load(conn).map_err(db_error)?;
            rows.into_iter().map(RecipeRow::into_recipe).collect()
        })
        .await
    }

    async fn save_image_data(
        &self,
        fingerprint: &ImageFingerprint,
        encoded: &str,
    ) -> Result<(), StoreError> {
        let fingerprint = fingerprint.clone();
        let encoded = encoded.to_string();
        self.run(move |conn| {
            diesel::insert_into(image_data::table)
                .values(&NewImageData {
                    image_hash: fingerprint.as_str(),
                    image_data: &encoded,
                })
                .on_conflict(image_data::image_hash)
                .do_update()
                .set(image_data::data.eq(excluded(image_data::data)))
                .execute(conn)
                .map_err(db_error)?;
            Ok(())
        })
        .await
    }

    async fn get_image_data(&self, fingerprint: &ImageFingerprint) -> Result<Option<String>, StoreError> {
        let fingerprint = fingerprint.clone();
        self.run(move |conn| {
            image_data::table
                .find(fingerprint.as_str())
                .select(image_data::data)
                .first(conn)
                .optional()
                .map_err(db_error)
        })
        .await
    }
}
