use crate::api::upload::{read_image, ImageUploadRequest};
use crate::api::{ApiError, ErrorResponse};
use crate::AppState;
use axum::extract::{Multipart, Path, State};
use axum::Json;
use serde::Serialize;
use snapchef_core::ImageFingerprint;
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct EncodeImageResponse {
    #[schema(value_type = String)]
    pub image_hash: ImageFingerprint,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ImageDataResponse {
    #[schema(value_type = String)]
    pub image_hash: ImageFingerprint,
    /// Standard base64 of the original upload
    pub image_data: String,
}

#[utoipa::path(
    post,
    path = "/imageencoder",
    tag = "images",
    request_body(content_type = "multipart/form-data", content = ImageUploadRequest),
    responses(
        (status = 200, description = "Image stored", body = EncodeImageResponse),
        (status = 400, description = "Missing file or unsupported file type", body = ErrorResponse),
        (status = 500, description = "Storage failure", body = ErrorResponse)
    )
)]
pub async fn encode_image(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<EncodeImageResponse>, ApiError> {
    let upload = read_image(&mut multipart).await?;
    upload.require_image_extension()?;

    let image_hash = state.remote.store_image_data(&upload.data).await?;
    tracing::info!(image_hash = %image_hash, bytes = upload.data.len(), "Stored image data");

    Ok(Json(EncodeImageResponse { image_hash }))
}

#[utoipa::path(
    get,
    path = "/imageencoder/{image_hash}",
    tag = "images",
    params(
        ("image_hash" = String, Path, description = "SHA-256 of the uploaded image, hex encoded")
    ),
    responses(
        (status = 200, description = "Stored base64 image data", body = ImageDataResponse),
        (status = 404, description = "No image stored under this hash", body = ErrorResponse),
        (status = 408, description = "Lookup timed out", body = ErrorResponse)
    )
)]
pub async fn get_image_data(
    State(state): State<AppState>,
    Path(image_hash): Path<String>,
) -> Result<Json<ImageDataResponse>, ApiError> {
    let not_found = || ApiError::NotFound("Image not found".to_string());
    let image_hash = ImageFingerprint::parse(&image_hash).map_err(|_| not_found())?;

    let image_data = state
        .remote
        .lookup_image_data(&image_hash)
        .await?
        .ok_or_else(not_found)?;

    Ok(Json(ImageDataResponse {
        image_hash,
        image_data,
    }))
}
