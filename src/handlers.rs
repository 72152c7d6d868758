use crate::collector::{CollectedInputs, InputCollector};
use crate::config::Config;
use crate::errors::{AppError, ResultExt};
use crate::inference::{assemble_record, PredictionOutcome};
use crate::model_store::{LoadedModel, ModelHandle};
use crate::models::*;
use crate::render::{self, FormPage, FormValues};
use crate::schema::{FieldKind, SchemaVariant};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    Form, Json,
};
use chrono::Utc;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// Shared application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Config,
    /// The model loaded at startup, or the reason it is missing.
    pub model: ModelHandle,
}

impl AppState {
    pub fn new(config: Config, model: ModelHandle) -> Self {
        Self { config, model }
    }

    fn schema(&self) -> SchemaVariant {
        self.config.schema
    }

    /// The loaded model, or `ModelUnavailable` when startup loading failed.
    pub fn loaded_model(&self) -> Result<&LoadedModel, AppError> {
        match &self.model {
            ModelHandle::Ready(model) => Ok(model),
            ModelHandle::Unavailable { reason } => Err(AppError::ModelUnavailable(reason.clone())),
        }
    }
}

/// Assembles the record and runs inference once.
fn run_prediction(
    model: &LoadedModel,
    inputs: &CollectedInputs,
    request_id: Uuid,
) -> Result<(CustomerRecord, PredictionOutcome), AppError> {
    let record = assemble_record(inputs);
    let outcome = model.predictor.invoke(&record)?;

    tracing::info!(
        %request_id,
        schema = %record.schema(),
        verdict = outcome.class.label(),
        probability = %outcome.probability_text(),
        "Prediction complete"
    );

    Ok((record, outcome))
}

fn unavailable_response(state: &AppState, reason: &str) -> Response {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Html(render::unavailable_page(
            &state.config.app_title,
            state.schema(),
            reason,
        )),
    )
        .into_response()
}

/// Health check endpoint.
///
/// Reports 200 even when the model is unavailable so the error state can be
/// inspected.
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service status", body = HealthResponse))
)]
pub async fn health(State(state): State<Arc<AppState>>) -> (StatusCode, Json<HealthResponse>) {
    let model = match &state.model {
        ModelHandle::Ready(loaded) => ModelStatus {
            ready: true,
            name: Some(loaded.info.name.clone()),
            fingerprint: Some(loaded.fingerprint.clone()),
            reason: None,
        },
        ModelHandle::Unavailable { reason } => ModelStatus {
            ready: false,
            name: None,
            fingerprint: None,
            reason: Some(reason.clone()),
        },
    };

    (
        StatusCode::OK,
        Json(HealthResponse {
            status: if model.ready { "healthy" } else { "degraded" }.to_string(),
            service: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            schema: state.schema(),
            model,
        }),
    )
}

/// GET /
///
/// Renders the form with every control at its default.
pub async fn index(State(state): State<Arc<AppState>>) -> Response {
    let loaded = match &state.model {
        ModelHandle::Ready(loaded) => loaded,
        ModelHandle::Unavailable { reason } => return unavailable_response(&state, reason),
    };

    let values = FormValues::defaults(state.schema());
    Html(render::form_page(&FormPage {
        title: &state.config.app_title,
        schema: state.schema(),
        values: &values,
        outcome: None,
        error: None,
        model_name: Some(loaded.info.name.as_str()),
    }))
    .into_response()
}

/// POST /predict
///
/// Form trigger. Re-renders the form with the submitted values and either the
/// prediction result or the error that prevented it.
pub async fn submit_form(
    State(state): State<Arc<AppState>>,
    Form(raw): Form<HashMap<String, String>>,
) -> Response {
    let loaded = match &state.model {
        ModelHandle::Ready(loaded) => loaded,
        ModelHandle::Unavailable { reason } => {
            tracing::warn!("Form submitted while model is unavailable");
            return unavailable_response(&state, reason);
        }
    };

    let request_id = Uuid::new_v4();
    let values = FormValues::from_submission(state.schema(), &raw);

    let result = InputCollector::new(state.schema())
        .collect_form(&raw)
        .map_err(AppError::from)
        .and_then(|inputs| run_prediction(loaded, &inputs, request_id));

    let (status, outcome, error) = match result {
        Ok((_record, outcome)) => (StatusCode::OK, Some(outcome), None),
        Err(e) => {
            match &e {
                AppError::InvalidInput(input) => {
                    tracing::warn!(%request_id, "Rejected form input: {}", input)
                }
                other => tracing::error!(%request_id, "Form prediction failed: {}", other),
            }
            (e.status(), None, Some(e.user_message()))
        }
    };

    let html = render::form_page(&FormPage {
        title: &state.config.app_title,
        schema: state.schema(),
        values: &values,
        outcome: outcome.as_ref(),
        error: error.as_deref(),
        model_name: Some(loaded.info.name.as_str()),
    });

    (status, Html(html)).into_response()
}

/// POST /api/v1/predict
///
/// JSON counterpart of the form. Omitted fields keep their defaults.
#[utoipa::path(
    post,
    path = "/api/v1/predict",
    request_body(
        content = serde_json::Value,
        description = "Object mapping field names to values",
        content_type = "application/json"
    ),
    responses(
        (status = 200, description = "Prediction result", body = PredictionResponse),
        (status = 400, description = "Malformed JSON, or a field value out of range or not an allowed choice"),
        (status = 500, description = "The model failed"),
        (status = 503, description = "The model could not be loaded at startup")
    )
)]
pub async fn predict(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Map<String, Value>>, JsonRejection>,
) -> Result<Json<PredictionResponse>, AppError> {
    let loaded = state.loaded_model()?;
    let Json(body) = payload.map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;
    let request_id = Uuid::new_v4();
    tracing::debug!(%request_id, "POST /api/v1/predict - {} field(s) supplied", body.len());

    let inputs = InputCollector::new(state.schema())
        .collect_json(&body)
        .with_context(|| format!("collecting JSON body for request {}", request_id))?;
    let (record, outcome) = run_prediction(loaded, &inputs, request_id)?;

    Ok(Json(PredictionResponse {
        request_id,
        schema: record.schema(),
        verdict: outcome.class.verdict().to_string(),
        label: outcome.class.label().to_string(),
        churn: outcome.class.is_churn(),
        churn_probability: outcome.churn_probability,
        probability_text: outcome.probability_text(),
        probability_percent: outcome.probability_percent(),
        model: loaded.summary(),
        predicted_at: Utc::now(),
        record,
    }))
}

/// GET /api/v1/schema
///
/// Describes the active form controls.
#[utoipa::path(
    get,
    path = "/api/v1/schema",
    responses((status = 200, description = "Active field table", body = SchemaResponse))
)]
pub async fn schema(State(state): State<Arc<AppState>>) -> Json<SchemaResponse> {
    let fields = state
        .schema()
        .fields()
        .iter()
        .map(|field| {
            let (kind, min, max, default) = match field.kind {
                FieldKind::Integer { min, max, default } => {
                    ("integer", Some(min as f64), Some(max as f64), json!(default))
                }
                FieldKind::Float { min, max, default } => {
                    ("float", Some(min), Some(max), json!(default))
                }
                FieldKind::Choice { choices } => ("choice", None, None, json!(choices[0])),
                FieldKind::Flag => ("flag", None, None, json!(field.default_text())),
            };

            FieldDescriptor {
                name: field.name.to_string(),
                label: field.label.to_string(),
                section: field.section.title().to_string(),
                kind: kind.to_string(),
                column_type: field.column_type(),
                min,
                max,
                default,
                choices: field.choices().iter().map(|c| c.to_string()).collect(),
            }
        })
        .collect();

    Json(SchemaResponse {
        schema: state.schema(),
        fields,
        model: state.model.ready().map(LoadedModel::summary),
    })
}
