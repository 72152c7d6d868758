use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use churn_predictor::app::create_router;
use churn_predictor::config::{Config, LoadFailurePolicy};
use churn_predictor::handlers::AppState;
use churn_predictor::model_store::{self, ModelHandle};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Main entry point for the application.
///
/// This function initializes the application, including:
/// - Logging and tracing.
/// - Configuration loading.
/// - Loading and schema-checking the model artifact.
/// - HTTP routes and middleware (CORS, body limit, rate limiting).
///
/// It then starts the Axum server.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "churn_predictor=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;

    // Load the model once; handlers only ever see a read-only handle
    let model_path = model_store::resolve_model_path(&config.model_path);
    let model = match model_store::load_model(&model_path, config.schema) {
        Ok(loaded) => {
            tracing::info!(
                "✓ Model ready: {} ({}, {} schema)",
                loaded.info.name,
                loaded.info.kind,
                config.schema
            );
            ModelHandle::Ready(loaded)
        }
        Err(e) => match config.on_load_failure {
            LoadFailurePolicy::Halt => {
                tracing::error!("Failed to load model artifact: {}", e);
                return Err(e).context("model artifact could not be loaded, refusing to start");
            }
            LoadFailurePolicy::ServeError => {
                tracing::error!(
                    "Failed to load model artifact: {}. Serving error page, predictions disabled",
                    e
                );
                ModelHandle::unavailable(e.to_string())
            }
        },
    };

    // Build application state
    let app_state = Arc::new(AppState::new(config.clone(), model));
    let app = create_router(app_state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
