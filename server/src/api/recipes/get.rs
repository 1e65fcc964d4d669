use crate::api::{ApiError, ErrorResponse};
use crate::AppState;
use axum::extract::{Path, State};
use axum::Json;
use snapchef_core::{ImageFingerprint, Recipe};

#[utoipa::path(
    get,
    path = "/recipes/{image_hash}",
    tag = "recipes",
    params(
        ("image_hash" = String, Path, description = "SHA-256 of the uploaded image, hex encoded")
    ),
    responses(
        (status = 200, description = "Recipe details", body = Recipe),
        (status = 404, description = "Recipe not found", body = ErrorResponse),
        (status = 408, description = "Lookup timed out", body = ErrorResponse)
    )
)]
pub async fn get_recipe(
    State(state): State<AppState>,
    Path(image_hash): Path<String>,
) -> Result<Json<Recipe>, ApiError> {
    let not_found = || ApiError::NotFound("Recipe not found".to_string());

    // A malformed hash cannot match any stored recipe.
    let fingerprint = ImageFingerprint::parse(&image_hash).map_err(|_| not_found())?;

    state
        .remote
        .lookup_recipe(&fingerprint)
        .await?
        .map(Json)
        .ok_or_else(not_found)
}
