pub mod encoder;
pub mod metadata;

use crate::AppState;
use axum::routing::{get, post};
use axum::Router;
use utoipa::OpenApi;

/// Routes for stored image descriptions and base64 image data
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/image-metadata/{image_hash}", get(metadata::get_description))
        .route("/imageencoder", post(encoder::encode_image))
        .route("/imageencoder/{image_hash}", get(encoder::get_image_data))
}

#[derive(OpenApi)]
#[openapi(
    paths(
        metadata::get_description,
        encoder::encode_image,
        encoder::get_image_data,
    ),
    components(schemas(
        metadata::DescriptionResponse,
        encoder::EncodeImageResponse,
        encoder::ImageDataResponse,
    ))
)]
pub struct ApiDoc;
