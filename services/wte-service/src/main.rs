mod config;
mod gemini;
mod google;
mod routes;

use axum::{
    Json, Router,
    http::StatusCode,
    routing::{get, post},
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use wte_api_types::ErrorResponse;

use crate::config::ServiceConfig;
use crate::gemini::{Categorizer, GeminiCategorizer};
use crate::google::{GoogleMapsClient, PlaceSearch};

#[derive(Debug, Serialize)]
struct HealthResponse {
    service: &'static str,
    status: &'static str,
}

#[derive(Debug, Serialize)]
struct VersionResponse {
    service: &'static str,
    version: &'static str,
}

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ErrorResponse>)>;

#[derive(Clone)]
struct AppState {
    places: Arc<dyn PlaceSearch>,
    categorizer: Arc<dyn Categorizer>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = ServiceConfig::from_env()?;
    let http = reqwest::Client::new();

    let state = AppState {
        places: Arc::new(GoogleMapsClient::new(
            http.clone(),
            config.google_maps_api_key.clone(),
            &config.google_maps_base_url,
            config.language.clone(),
        )),
        categorizer: Arc::new(GeminiCategorizer::new(
            http,
            config.gemini_api_key.clone(),
            config.gemini_model.clone(),
            &config.gemini_base_url,
        )),
    };

    let app = build_router(state);

    info!("wte-service listening on {}", config.bind_addr);
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/version", get(version))
        .route("/api/find_places", post(routes::find_places))
        .route("/api/categorize_places", post(routes::categorize_places))
        .route("/api/place_details", get(routes::place_details))
        .route("/api/geocode", get(routes::geocode))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        service: "wte-service",
        status: "ok",
    })
}

async fn version() -> Json<VersionResponse> {
    Json(VersionResponse {
        service: "wte-service",
        version: env!("CARGO_PKG_VERSION"),
    })
}

fn bad_request(message: &str) -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: message.to_owned(),
        }),
    )
}

fn not_found(message: &str) -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            error: message.to_owned(),
        }),
    )
}

fn internal_error(err: impl std::fmt::Display) -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: err.to_string(),
        }),
    )
}
