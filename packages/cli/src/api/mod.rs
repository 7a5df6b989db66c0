// ABOUTME: HTTP router for the render service
// ABOUTME: Wires dataset, orchestrator, and config into axum routes with CORS and request tracing

use crate::config::Config;
use animbox_dataset::PromptDataset;
use animbox_sandbox::RenderOrchestrator;
use axum::{
    http::{HeaderValue, Method},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

pub mod generate;
pub mod health;
pub mod prompts;

/// Shared, read-only state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub dataset: Arc<PromptDataset>,
    pub orchestrator: Arc<RenderOrchestrator>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(dataset: PromptDataset, orchestrator: RenderOrchestrator, config: Config) -> Self {
        Self {
            dataset: Arc::new(dataset),
            orchestrator: Arc::new(orchestrator),
            config: Arc::new(config),
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(state.config.cors_origin.as_deref());

    Router::new()
        .route("/api", get(health::api_info))
        .route("/api/health", get(health::health_check))
        .route("/prompts", get(prompts::list_prompts))
        .route("/code", post(prompts::get_code))
        .route("/generate", post(generate::generate_video))
        .route("/generate/random", get(generate::generate_random_video))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn cors_layer(origin: Option<&str>) -> CorsLayer {
    let Some(origin) = origin else {
        return CorsLayer::permissive();
    };

    match origin.parse::<HeaderValue>() {
        Ok(origin) => CorsLayer::new()
            .allow_origin(origin)
            .allow_methods([Method::GET, Method::POST])
            .allow_headers(Any),
        Err(_) => {
            warn!("Ignoring unparseable CORS origin {:?}, allowing any", origin);
            CorsLayer::permissive()
        }
    }
}
