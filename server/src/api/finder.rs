use axum::extract::{Multipart, Query, State};
use axum::routing::post;
use axum::{Json, Router};
use serde::Serialize;
use snapchef_core::{Recipe, Resolution, ResolutionPipeline};
use utoipa::{OpenApi, ToSchema};

use super::upload::{read_image, ImageUploadRequest, PreferenceParams};
use super::{ApiError, ErrorResponse};
use crate::AppState;

pub const NOT_FOOD_MESSAGE: &str = "Pixel Chef says: It doesn't look like food. We're here to help you whip up amazing dishes from your ingredients. Just snap a pic of your culinary creations (or ingredients!) and let's get cooking!";

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct NotFoodResponse {
    pub message: String,
}

/// Either the recipe for the photo or a note that it is not food.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(untagged)]
pub enum FinderResponse {
    Recipe(Recipe),
    NotFood(NotFoodResponse),
}

impl From<Resolution> for FinderResponse {
    fn from(resolution: Resolution) -> Self {
        match resolution {
            Resolution::Ready { recipe, .. } => FinderResponse::Recipe(recipe),
            Resolution::Rejected { .. } => FinderResponse::NotFood(NotFoodResponse {
                message: NOT_FOOD_MESSAGE.to_string(),
            }),
        }
    }
}

/// Routes for /recipefinder (remote model) and /v2/recipefinder (local model)
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/recipefinder", post(find_recipe))
        .route("/v2/recipefinder", post(find_recipe_local))
}

async fn resolve_upload(
    pipeline: &ResolutionPipeline,
    params: &PreferenceParams,
    multipart: &mut Multipart,
) -> Result<Json<FinderResponse>, ApiError> {
    let upload = read_image(multipart).await?;
    upload.require_image_extension()?;

    tracing::debug!(
        provider = pipeline.provider_name(),
        file_name = upload.file_name.as_deref().unwrap_or(""),
        bytes = upload.data.len(),
        "Resolving uploaded image"
    );

    let resolution = pipeline
        .run(upload.data, params.dietary_preference(), params.cuisine())
        .await?;
    Ok(Json(resolution.into()))
}

#[utoipa::path(
    post,
    path = "/recipefinder",
    tag = "recipefinder",
    params(PreferenceParams),
    request_body(content_type = "multipart/form-data", content = ImageUploadRequest),
    responses(
        (status = 200, description = "Recipe for the photo, or a not-food message", body = FinderResponse),
        (status = 400, description = "Missing file or unsupported file type", body = ErrorResponse),
        (status = 408, description = "Deadline exceeded", body = ErrorResponse),
        (status = 500, description = "Model or storage failure", body = ErrorResponse)
    )
)]
pub async fn find_recipe(
    State(state): State<AppState>,
    Query(params): Query<PreferenceParams>,
    mut multipart: Multipart,
) -> Result<Json<FinderResponse>, ApiError> {
    resolve_upload(&state.remote, &params, &mut multipart).await
}

#[utoipa::path(
    post,
    path = "/v2/recipefinder",
    tag = "recipefinder",
    params(PreferenceParams),
    request_body(content_type = "multipart/form-data", content = ImageUploadRequest),
    responses(
        (status = 200, description = "Recipe for the photo, or a not-food message", body = FinderResponse),
        (status = 400, description = "Missing file or unsupported file type", body = ErrorResponse),
        (status = 408, description = "Deadline exceeded", body = ErrorResponse),
        (status = 500, description = "Model or storage failure", body = ErrorResponse)
    )
)]
pub async fn find_recipe_local(
    State(state): State<AppState>,
    Query(params): Query<PreferenceParams>,
    mut multipart: Multipart,
) -> Result<Json<FinderResponse>, ApiError> {
    resolve_upload(&state.local, &params, &mut multipart).await
}

#[derive(OpenApi)]
#[openapi(
    paths(find_recipe, find_recipe_local),
    components(schemas(FinderResponse, NotFoodResponse, ImageUploadRequest))
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;
    use snapchef_core::fingerprint;

    #[test]
    fn test_rejected_serializes_as_message() {
        let response = FinderResponse::from(Resolution::Rejected {
            fingerprint: fingerprint(b"desk"),
            description: "No food, just a desk".to_string(),
        });
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json, serde_json::json!({ "message": NOT_FOOD_MESSAGE }));
    }

    #[test]
    fn test_ready_serializes_as_recipe() {
        let recipe = snapchef_core::RecipeDraft {
            title: "Soup".to_string(),
            ..Default::default()
        }
        .into_recipe(fingerprint(b"soup"), "images/soup.jpg");
        let response = FinderResponse::from(Resolution::Ready {
            recipe,
            cached: true,
        });
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["title"], "Soup");
        assert_eq!(json["image_hash"], fingerprint(b"soup").as_str());
        assert!(json.get("message").is_none());
    }
}
