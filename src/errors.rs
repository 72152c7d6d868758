use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::fmt;

use crate::collector::InputError;
use crate::inference::InferenceError;

/// Application-specific error types.
#[derive(Debug, Clone)]
pub enum AppError {
    /// Malformed request that never reached the collector.
    BadRequest(String),
    /// A field value outside its control's range or choices.
    InvalidInput(InputError),
    /// The model failed to load at startup.
    ModelUnavailable(String),
    /// The model raised an error or returned an unusable result.
    Inference(InferenceError),
    /// Error with context chain for better debugging.
    WithContext {
        /// The underlying source of the error.
        source: Box<AppError>,
        /// Additional context message.
        context: String,
    },
}

impl AppError {
    /// HTTP status for this error, following the context chain.
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) | AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::ModelUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Inference(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::WithContext { source, .. } => source.status(),
        }
    }

    /// Message suitable for showing to the user.
    pub fn user_message(&self) -> String {
        match self {
            AppError::BadRequest(msg) => msg.clone(),
            AppError::InvalidInput(e) => e.to_string(),
            AppError::ModelUnavailable(reason) => {
                format!("The prediction model is not available: {}", reason)
            }
            AppError::Inference(e) => format!("Prediction failed: {}", e),
            AppError::WithContext { source, .. } => source.user_message(),
        }
    }
}

impl fmt::Display for AppError {
    /// Formats the error for display.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            AppError::InvalidInput(e) => write!(f, "Invalid input: {}", e),
            AppError::ModelUnavailable(reason) => write!(f, "Model unavailable: {}", reason),
            AppError::Inference(e) => write!(f, "Inference error: {}", e),
            AppError::WithContext { source, context } => {
                write!(f, "{}: {}", context, source)
            }
        }
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    /// Converts the error into an HTTP response.
    ///
    /// Maps each error variant to an appropriate HTTP status code and JSON body.
    /// Logs errors appropriately based on their severity.
    fn into_response(self) -> Response {
        match &self {
            AppError::BadRequest(msg) => tracing::warn!("Bad request: {}", msg),
            AppError::InvalidInput(e) => tracing::warn!("Rejected input: {}", e),
            AppError::ModelUnavailable(reason) => {
                tracing::warn!("Prediction refused, model unavailable: {}", reason)
            }
            AppError::Inference(e) => tracing::error!("Inference error: {}", e),
            AppError::WithContext { source, context } => {
                tracing::debug!("Error context: {}", context);
                // The source logs at its own severity
                return source.clone().into_response();
            }
        }

        let mut body = json!({
            "error": self.user_message(),
        });
        if let AppError::InvalidInput(e) = &self {
            body["field"] = json!(e.field());
        }

        (self.status(), Json(body)).into_response()
    }
}

impl From<InputError> for AppError {
    fn from(err: InputError) -> Self {
        AppError::InvalidInput(err)
    }
}

impl From<InferenceError> for AppError {
    fn from(err: InferenceError) -> Self {
        AppError::Inference(err)
    }
}

/// Extension trait for adding context to errors.
/// Similar to `anyhow::Context` but for our `AppError` type.
pub trait ResultExt<T> {
    /// Add context to an error.
    fn context(self, context: impl Into<String>) -> Result<T, AppError>;

    /// Add context lazily (only evaluated on error).
    fn with_context<F>(self, f: F) -> Result<T, AppError>
    where
        F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
    E: Into<AppError>,
{
    fn context(self, context: impl Into<String>) -> Result<T, AppError> {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(e.into()),
            context: context.into(),
        })
    }

    fn with_context<F>(self, f: F) -> Result<T, AppError>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(e.into()),
            context: f(),
        })
    }
}
