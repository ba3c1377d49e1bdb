mod cloudinary;
mod config;
mod error;
mod models;
mod routes;

use axum::{extract::State, routing::get, Json, Router};
use cloudinary::MediaClient;
use config::Config;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

#[derive(Clone)]
pub struct AppState {
    pub media: MediaClient,
    pub folder: String,
}

async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    let media_api = state.media.ping().await.is_ok();
    Json(serde_json::json!({ "status": "ok", "media_api": media_api }))
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    dotenvy::dotenv().ok();
    let config = Config::from_env();

    let media = MediaClient::new(&config);

    let state = AppState {
        media,
        folder: config.folder.clone(),
    };

    let mut app = Router::new()
        .route("/api/health", get(health))
        .merge(routes::api_router())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Optionally serve the prebuilt gallery UI.
    if let Some(static_dir) = config.static_dir.as_deref() {
        app = app.fallback_service(ServeDir::new(static_dir));
    }

    let addr = format!("{}:{}", config.host, config.port);
    tracing::info!("listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
