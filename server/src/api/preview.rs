//! Uncached local-model endpoints. Nothing here reads or writes the store.

use axum::extract::{Multipart, Query, State};
use axum::routing::post;
use axum::{Json, Router};
use serde::Serialize;
use snapchef_core::RecipeDraft;
use utoipa::{OpenApi, ToSchema};

use super::upload::{read_image, ImageUploadRequest, PreferenceParams};
use super::{ApiError, ErrorResponse};
use crate::AppState;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct IsFoodResponse {
    pub is_food: bool,
    pub description: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/is-food", post(is_food))
        .route("/recipe-finder-local", post(recipe_finder_local))
}

#[utoipa::path(
    post,
    path = "/is-food",
    tag = "preview",
    request_body(content_type = "multipart/form-data", content = ImageUploadRequest),
    responses(
        (status = 200, description = "Local model verdict", body = IsFoodResponse),
        (status = 400, description = "Missing file", body = ErrorResponse),
        (status = 500, description = "Model failure", body = ErrorResponse)
    )
)]
pub async fn is_food(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<IsFoodResponse>, ApiError> {
    let upload = read_image(&mut multipart).await?;
    let verdict = state.local.preview_classification(&upload.data).await?;

    Ok(Json(IsFoodResponse {
        is_food: verdict.is_food,
        description: verdict.description,
    }))
}

#[utoipa::path(
    post,
    path = "/recipe-finder-local",
    tag = "preview",
    params(PreferenceParams),
    request_body(content_type = "multipart/form-data", content = ImageUploadRequest),
    responses(
        (status = 200, description = "Generated recipe, not persisted", body = RecipeDraft),
        (status = 400, description = "Missing file", body = ErrorResponse),
        (status = 500, description = "Model failure", body = ErrorResponse)
    )
)]
pub async fn recipe_finder_local(
    State(state): State<AppState>,
    Query(params): Query<PreferenceParams>,
    mut multipart: Multipart,
) -> Result<Json<RecipeDraft>, ApiError> {
    let upload = read_image(&mut multipart).await?;
    let draft = state
        .local
        .preview_recipe(&upload.data, params.dietary_preference(), params.cuisine())
        .await?;
    Ok(Json(draft))
}

#[derive(OpenApi)]
#[openapi(paths(is_food, recipe_finder_local), components(schemas(IsFoodResponse)))]
pub struct ApiDoc;
