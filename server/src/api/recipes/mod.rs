pub mod get;
pub mod list;

use crate::AppState;
use axum::routing::get;
use axum::Router;
use utoipa::OpenApi;

/// Returns the router for /recipes endpoints
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/recipes", get(list::list_recipes))
        .route("/recipes/{image_hash}", get(get::get_recipe))
}

#[derive(OpenApi)]
#[openapi(paths(list::list_recipes, get::get_recipe))]
pub struct ApiDoc;
