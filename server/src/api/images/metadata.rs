use crate::api::{ApiError, ErrorResponse};
use crate::AppState;
use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;
use snapchef_core::ImageFingerprint;
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DescriptionResponse {
    /// The model's description of the image, as stored at classification time
    pub description: String,
}

#[utoipa::path(
    get,
    path = "/image-metadata/{image_hash}",
    tag = "images",
    params(
        ("image_hash" = String, Path, description = "SHA-256 of the uploaded image, hex encoded")
    ),
    responses(
        (status = 200, description = "Stored classification description", body = DescriptionResponse),
        (status = 404, description = "No description for this image", body = ErrorResponse),
        (status = 408, description = "Lookup timed out", body = ErrorResponse)
    )
)]
pub async fn get_description(
    State(state): State<AppState>,
    Path(image_hash): Path<String>,
) -> Result<Json<DescriptionResponse>, ApiError> {
    let not_found = || ApiError::NotFound("Description not found for this image hash".to_string());
    let fingerprint = ImageFingerprint::parse(&image_hash).map_err(|_| not_found())?;

    let description = state
        .remote
        .lookup_description(&fingerprint)
        .await?
        .filter(|d| !d.is_empty())
        .ok_or_else(not_found)?;

    Ok(Json(DescriptionResponse { description }))
}
