//! Multipart image uploads shared by the finder and preview endpoints.

use std::path::Path;

use axum::extract::multipart::MultipartError;
use axum::extract::Multipart;
use axum::http::StatusCode;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use super::ApiError;

/// Largest accepted request body.
pub const MAX_UPLOAD_SIZE: usize = 10 * 1024 * 1024;

const ALLOWED_EXTENSIONS: [&str; 3] = ["jpeg", "jpg", "png"];

pub const INVALID_FILE_TYPE: &str =
    "Invalid file type. Only JPEG, JPG, and PNG images are allowed.";

#[derive(ToSchema)]
#[allow(dead_code)]
pub struct ImageUploadRequest {
    #[schema(value_type = String, format = Binary)]
    pub file: Vec<u8>,
}

/// Optional generation preferences passed as query parameters.
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct PreferenceParams {
    /// e.g. "vegan", "keto"
    pub dietary_preference: Option<String>,
    /// e.g. "italian", "thai"
    pub cuisine: Option<String>,
}

impl PreferenceParams {
    pub fn dietary_preference(&self) -> &str {
        self.dietary_preference.as_deref().unwrap_or("")
    }

    pub fn cuisine(&self) -> &str {
        self.cuisine.as_deref().unwrap_or("")
    }
}

/// The `file` part of a multipart body.
#[derive(Debug)]
pub struct ImageUpload {
    pub file_name: Option<String>,
    pub data: Vec<u8>,
}

impl ImageUpload {
    /// Reject anything not named like a JPEG or PNG.
    pub fn require_image_extension(&self) -> Result<(), ApiError> {
        if has_image_extension(self.file_name.as_deref().unwrap_or("")) {
            Ok(())
        } else {
            Err(ApiError::BadRequest(INVALID_FILE_TYPE.to_string()))
        }
    }
}

fn has_image_extension(file_name: &str) -> bool {
    Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ALLOWED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

pub async fn read_image(multipart: &mut Multipart) -> Result<ImageUpload, ApiError> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().map(str::to_string);
        let data = field.bytes().await.map_err(multipart_error)?;
        if data.is_empty() {
            return Err(ApiError::BadRequest("Uploaded file is empty".to_string()));
        }
        return Ok(ImageUpload {
            file_name,
            data: data.to_vec(),
        });
    }

    Err(ApiError::BadRequest("No file provided".to_string()))
}

fn multipart_error(e: MultipartError) -> ApiError {
    tracing::warn!("Multipart read error: {}", e);
    let message = if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        format!("File too large. Maximum size is {} bytes", MAX_UPLOAD_SIZE)
    } else {
        format!("Failed to read multipart data: {}", e.body_text())
    };
    ApiError::Upload {
        status: e.status(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_extensions() {
        assert!(has_image_extension("dinner.jpg"));
        assert!(has_image_extension("dinner.JPEG"));
        assert!(has_image_extension("a.b.png"));
        assert!(!has_image_extension("dinner.gif"));
        assert!(!has_image_extension("jpg"));
        assert!(!has_image_extension(""));
    }

    #[test]
    fn test_missing_file_name_is_rejected() {
        let upload = ImageUpload {
            file_name: None,
            data: vec![1],
        };
        let err = upload.require_image_extension().unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), INVALID_FILE_TYPE);
    }

    #[test]
    fn test_preferences_default_to_empty() {
        let params = PreferenceParams::default();
        assert_eq!(params.dietary_preference(), "");
        assert_eq!(params.cuisine(), "");
    }
}
