use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::handlers::{self, AppState};
use crate::models::{
    FieldDescriptor, HealthResponse, ModelStatus, ModelSummary, PredictionResponse,
    SchemaResponse,
};
use crate::schema::{ColumnType, SchemaVariant};

/// Form and JSON bodies are tiny; anything larger is rejected.
const MAX_BODY_BYTES: usize = 64 * 1024;

#[derive(OpenApi)]
#[openapi(
    paths(handlers::health, handlers::predict, handlers::schema),
    components(schemas(
        PredictionResponse,
        ModelSummary,
        SchemaResponse,
        FieldDescriptor,
        HealthResponse,
        ModelStatus,
        SchemaVariant,
        ColumnType
    )),
    info(title = "Telco Churn Predictor", description = "Churn prediction form and JSON API")
)]
pub struct ApiDoc;

/// Builds the application router.
///
/// Prediction routes sit behind the body size limit and, when configured, a
/// per-IP rate limit. `/health` and the docs bypass both.
pub fn create_router(state: Arc<AppState>) -> Router {
    let prediction_routes = Router::new()
        .route("/", get(handlers::index))
        .route("/predict", post(handlers::submit_form))
        .route("/api/v1/predict", post(handlers::predict))
        .route("/api/v1/schema", get(handlers::schema));

    let prediction_routes = match state.config.rate_limit {
        Some(limit) => {
            // The builder takes the refill interval, not a rate.
            let governor_conf = GovernorConfigBuilder::default()
                .per_nanosecond(limit.replenish_interval_ns())
                .burst_size(limit.burst)
                .key_extractor(SmartIpKeyExtractor)
                .finish();

            match governor_conf {
                Some(conf) => prediction_routes.layer(GovernorLayer {
                    config: Arc::new(conf),
                }),
                None => {
                    tracing::warn!("Invalid rate limit configuration, rate limiting disabled");
                    prediction_routes
                }
            }
        }
        None => prediction_routes,
    };

    let prediction_routes = prediction_routes.layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES));

    Router::new()
        .route("/health", get(handlers::health))
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(prediction_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
