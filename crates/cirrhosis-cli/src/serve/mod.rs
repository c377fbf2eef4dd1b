//! HTTP prediction service.
//!
//! The model bundle is loaded once before the listener is bound and then
//! shared read-only by every request.
pub mod error;
pub mod handlers;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::routing::post;
use axum::Router;
use tokio::net::TcpListener;

use cirrhosis_classifiers::bundle::ModelBundle;

pub use error::{ServeError, ServeResult};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub bundle: Arc<ModelBundle>,
}

impl AppState {
    pub fn new(bundle: ModelBundle) -> Self {
        AppState {
            bundle: Arc::new(bundle),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServeConfig {
    pub model_path: PathBuf,
    pub host: String,
    pub port: u16,
}

impl Default for ServeConfig {
    fn default() -> Self {
        ServeConfig {
            model_path: PathBuf::from("best_cirrhosis_model.json"),
            host: "127.0.0.1".to_string(),
            port: 5000,
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/predict", post(handlers::predict))
        .with_state(state)
}

/// Bind the configured host, which may be a name such as `localhost`.
pub async fn bind(config: &ServeConfig) -> Result<TcpListener> {
    TcpListener::bind((config.host.as_str(), config.port))
        .await
        .with_context(|| format!("Failed to bind {}:{}", config.host, config.port))
}

/// Load the bundle, bind and serve until the process is stopped.
pub async fn run(config: &ServeConfig) -> Result<()> {
    let bundle = ModelBundle::load(&config.model_path)
        .with_context(|| format!("Failed to load model bundle {:?}", config.model_path))?;
    log::info!(
        "Loaded '{}' ({} features: {})",
        bundle.model_name,
        bundle.feature_names().len(),
        bundle.feature_names().join(", ")
    );

    let app = create_router(AppState::new(bundle));

    let listener = bind(config).await?;
    log::info!(
        "Serving predictions on http://{}/predict",
        listener.local_addr().context("Listener has no local address")?
    );

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
