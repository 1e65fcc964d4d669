pub mod finder;
pub mod images;
pub mod preview;
pub mod recipes;
pub mod upload;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use snapchef_core::{ErrorKind, Recipe, RecipeDraft, ResolveError};
use thiserror::Error;
use utoipa::{OpenApi, ToSchema};

/// Shared error response used by all endpoints
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

/// Errors a handler can return; each maps to one status code.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{message}")]
    Upload { status: StatusCode, message: String },

    #[error(transparent)]
    Resolve(#[from] ResolveError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Upload { status, .. } => *status,
            ApiError::Resolve(e) => match e.kind() {
                ErrorKind::Timeout => StatusCode::REQUEST_TIMEOUT,
                ErrorKind::Model | ErrorKind::MalformedModelOutput | ErrorKind::Persistence => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if let ApiError::Resolve(e) = &self {
            if status.is_server_error() {
                tracing::error!(kind = ?e.kind(), error = %e, "Resolution failed");
            } else {
                tracing::warn!(kind = ?e.kind(), error = %e, "Resolution failed");
            }
        }
        (
            status,
            Json(ErrorResponse {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

/// Generate the complete OpenAPI spec by merging all module specs
pub fn openapi() -> utoipa::openapi::OpenApi {
    #[derive(OpenApi)]
    #[openapi(
        info(title = "SnapChef", description = "Recipes from food photographs"),
        components(schemas(ErrorResponse, Recipe, RecipeDraft))
    )]
    struct BaseApi;

    let mut spec = BaseApi::openapi();

    let modules: Vec<utoipa::openapi::OpenApi> = vec![
        finder::ApiDoc::openapi(),
        recipes::ApiDoc::openapi(),
        images::ApiDoc::openapi(),
        preview::ApiDoc::openapi(),
    ];

    for module_spec in modules {
        spec.paths.paths.extend(module_spec.paths.paths);

        if let Some(module_components) = module_spec.components {
            if let Some(spec_components) = spec.components.as_mut() {
                spec_components.schemas.extend(module_components.schemas);
            }
        }
    }

    spec
}

#[cfg(test)]
mod tests {
    use super::*;
    use snapchef_core::{Stage, StoreError, VisionError};

    #[test]
    fn test_timeout_maps_to_request_timeout() {
        let err = ApiError::from(ResolveError::Timeout {
            stage: Stage::Recipe,
        });
        assert_eq!(err.status(), StatusCode::REQUEST_TIMEOUT);
    }

    #[test]
    fn test_other_resolve_errors_map_to_server_error() {
        let errors = [
            ResolveError::Model(VisionError::EmptyResponse),
            ResolveError::MalformedOutput("no object".to_string()),
            ResolveError::Persistence(StoreError::Database("down".to_string())),
        ];
        for e in errors {
            assert_eq!(ApiError::from(e).status(), StatusCode::INTERNAL_SERVER_ERROR);
        }
    }

    #[test]
    fn test_client_errors() {
        assert_eq!(
            ApiError::BadRequest("bad".to_string()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::NotFound("missing".to_string()).status(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_openapi_lists_every_route() {
        let spec = openapi();
        for path in [
            "/recipefinder",
            "/v2/recipefinder",
            "/recipes",
            "/recipes/{image_hash}",
            "/image-metadata/{image_hash}",
            "/imageencoder",
            "/imageencoder/{image_hash}",
            "/is-food",
            "/recipe-finder-local",
        ] {
            assert!(spec.paths.paths.contains_key(path), "missing {}", path);
        }
    }
}
