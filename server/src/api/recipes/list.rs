use crate::api::{ApiError, ErrorResponse};
use crate::AppState;
use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use snapchef_core::{Recipe, RecipeFilter};
use utoipa::IntoParams;

#[derive(Debug, Deserialize, IntoParams)]
pub struct ListRecipesParams {
    /// Only recipes with this cuisine (case-insensitive)
    pub cuisine: Option<String>,
    /// Only recipes with this dietary preference (case-insensitive)
    pub dietary_preference: Option<String>,
}

#[utoipa::path(
    get,
    path = "/recipes",
    tag = "recipes",
    params(ListRecipesParams),
    responses(
        (status = 200, description = "Stored recipes matching every given filter", body = Vec<Recipe>),
        (status = 408, description = "Lookup timed out", body = ErrorResponse),
        (status = 500, description = "Storage failure", body = ErrorResponse)
    )
)]
pub async fn list_recipes(
    State(state): State<AppState>,
    Query(params): Query<ListRecipesParams>,
) -> Result<Json<Vec<Recipe>>, ApiError> {
    let filter = RecipeFilter::new(
        params.cuisine.as_deref(),
        params.dietary_preference.as_deref(),
    );
    let recipes = state.remote.list_recipes(&filter).await?;
    Ok(Json(recipes))
}
