// ABOUTME: Animbox service library: configuration, HTTP router, and startup wiring
// ABOUTME: Builds the sandbox provider and dataset from config and serves the render API

use animbox_config::{constants, defaults};
use animbox_dataset::PromptDataset;
use animbox_sandbox::{
    DockerConfig, DockerProvider, E2BConfig, E2BProvider, Provider, ProviderResult,
    RenderOrchestrator,
};
use anyhow::Context;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

pub mod api;
pub mod config;
pub mod error;

#[cfg(test)]
mod tests;

use api::AppState;
use config::{Config, ProviderKind};

/// Install the global tracing subscriber; `RUST_LOG` overrides the default filter
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env(constants::RUST_LOG)
                .unwrap_or_else(|_| EnvFilter::new(defaults::LOG_FILTER)),
        )
        .with_target(false)
        .compact()
        .init();
}

/// Construct the session backend selected by config
pub fn build_provider(config: &Config) -> ProviderResult<Arc<dyn Provider>> {
    match config.provider {
        ProviderKind::E2B => {
            let mut e2b = E2BConfig::new(config.e2b_api_key.clone().unwrap_or_default());
            e2b.api_url = config.e2b_api_url.clone();
            e2b.domain = config.e2b_domain.clone();
            e2b.template = config.e2b_template.clone();
            e2b.sandbox_timeout_secs = config.e2b_sandbox_timeout_secs;
            Ok(Arc::new(E2BProvider::new(e2b)?))
        }
        ProviderKind::Docker => {
            let docker = DockerConfig {
                image: config.docker_image.clone(),
                ..Default::default()
            };
            Ok(Arc::new(DockerProvider::new(docker)?))
        }
    }
}

pub async fn run_server(config: Config) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .with_context(|| format!("Invalid listen address {}:{}", config.host, config.port))?;

    let dataset = PromptDataset::load(&config.dataset_path).with_context(|| {
        format!("Failed to load dataset {}", config.dataset_path.display())
    })?;
    let provider = build_provider(&config).context("Failed to configure sandbox provider")?;
    let orchestrator = RenderOrchestrator::new(provider);

    info!(
        "Serving {} prompts with the {} provider",
        dataset.len(),
        orchestrator.provider_name()
    );

    let app = api::create_router(AppState::new(dataset, orchestrator, config));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
