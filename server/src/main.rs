mod api;
mod config;
mod db;
mod models;
mod schema;
mod store;
mod telemetry;

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue, Method};
use axum::Router;
use snapchef_core::{
    DiskImageArchive, GeminiProvider, ImageArchive, LocalProvider, RecipeStore, ResolutionPipeline,
};
use std::env;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::store::PgRecipeStore;

/// Application state shared across all handlers. Both pipelines share one store and
/// one image archive; they differ only in the vision model behind them.
#[derive(Clone)]
pub struct AppState {
    pub remote: Arc<ResolutionPipeline>,
    pub local: Arc<ResolutionPipeline>,
}

fn cors_layer(origin: &str) -> CorsLayer {
    let origin = match origin.parse::<HeaderValue>() {
        Ok(origin) => origin,
        Err(_) => {
            tracing::warn!(origin, "Invalid CORS origin, falling back to default");
            HeaderValue::from_static(config::DEFAULT_CORS_ORIGIN)
        }
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::ORIGIN, header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::CONTENT_LENGTH])
        .allow_credentials(true)
        .max_age(Duration::from_secs(12 * 60 * 60))
}

fn build_router(state: AppState, config: &ServerConfig, image_dir: &std::path::Path) -> Router {
    Router::new()
        .merge(api::finder::router())
        .merge(api::recipes::router())
        .merge(api::images::router())
        .merge(api::preview::router())
        .nest_service("/images", ServeDir::new(image_dir))
        .with_state(state)
        .layer(DefaultBodyLimit::max(api::upload::MAX_UPLOAD_SIZE))
        .layer(cors_layer(&config.cors_origin))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(telemetry::request_span)
                .on_request(())
                .on_response(telemetry::record_response)
                .on_failure(telemetry::record_failure),
        )
}

#[tokio::main]
async fn main() {
    // Check for --openapi flag to dump spec and exit
    if env::args().any(|arg| arg == "--openapi") {
        let spec = api::openapi()
            .to_pretty_json()
            .expect("Failed to serialize OpenAPI spec");
        println!("{}", spec);
        return;
    }

    telemetry::init();

    let config = ServerConfig::from_env().expect("Invalid server configuration");
    let pool = db::create_pool(&config.database_url).expect("Failed to set up database");

    let http = reqwest::Client::new();
    let gemini = GeminiProvider::from_env(http.clone()).expect("Invalid Gemini configuration");
    let local = LocalProvider::from_env(http);

    let disk_archive = DiskImageArchive::from_env();
    let image_dir = disk_archive.root().to_path_buf();

    let store: Arc<dyn RecipeStore> = Arc::new(PgRecipeStore::new(pool));
    let archive: Arc<dyn ImageArchive> = Arc::new(disk_archive);

    let state = AppState {
        remote: Arc::new(ResolutionPipeline::new(
            Arc::new(gemini),
            store.clone(),
            archive.clone(),
        )),
        local: Arc::new(ResolutionPipeline::new(Arc::new(local), store, archive)),
    };

    let app = build_router(state, &config, &image_dir);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("Failed to bind listener");

    tracing::info!(
        addr = %config.bind_addr,
        image_dir = %image_dir.display(),
        "Server listening"
    );

    axum::serve(listener, app).await.expect("Server error");
}
