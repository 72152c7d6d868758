//! Record assembly and the two-step inference call.

use std::fmt;
use std::sync::Arc;

use crate::classifier::{ChurnModel, ModelError};
use crate::collector::{CollectedInputs, FieldInput};
use crate::models::{CustomerRecord, FieldValue};
use crate::schema::{FieldKind, SchemaVariant};

/// Builds the model input from the collected field values.
///
/// Values are copied verbatim in schema order. `SeniorCitizen` is the one
/// derived column: "Yes" is stored as 1 and "No" as 0.
pub fn assemble_record(inputs: &CollectedInputs) -> CustomerRecord {
    let columns = inputs
        .iter()
        .map(|(spec, input)| {
            let value = match (spec.kind, input) {
                (FieldKind::Flag, FieldInput::Choice(choice)) => {
                    FieldValue::Integer(if *choice == "Yes" { 1 } else { 0 })
                }
                (_, FieldInput::Integer(v)) => FieldValue::Integer(*v),
                (_, FieldInput::Float(v)) => FieldValue::Float(*v),
                (_, FieldInput::Choice(choice)) => FieldValue::Text((*choice).to_string()),
            };
            (spec.name, value)
        })
        .collect();

    CustomerRecord::new(inputs.schema(), columns)
}

/// Predicted class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChurnClass {
    Stay,
    Churn,
}

impl ChurnClass {
    /// Human readable verdict.
    pub fn verdict(self) -> &'static str {
        match self {
            ChurnClass::Stay => "likely to stay",
            ChurnClass::Churn => "likely to churn",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ChurnClass::Stay => "No Churn",
            ChurnClass::Churn => "Churn",
        }
    }

    pub fn is_churn(self) -> bool {
        self == ChurnClass::Churn
    }
}

/// Verdict and churn probability from a single `invoke` call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PredictionOutcome {
    pub class: ChurnClass,
    /// Probability of class 1 as reported by `predict_proba`.
    pub churn_probability: f64,
}

impl PredictionOutcome {
    /// Churn probability with exactly two decimal places.
    pub fn probability_text(&self) -> String {
        format!("{:.2}", self.churn_probability)
    }

    /// Churn probability on a 0-100 scale, truncated.
    pub fn probability_percent(&self) -> u8 {
        (self.churn_probability * 100.0).floor().clamp(0.0, 100.0) as u8
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum InferenceError {
    /// The model itself failed.
    Model(ModelError),
    /// `predict` returned something other than 0 or 1.
    UnexpectedClass(u8),
    /// `predict_proba` did not return a probability for class 1.
    MissingProbability { returned: usize },
    /// The class-1 probability is not a number in [0, 1].
    InvalidProbability(f64),
    /// The record was assembled for a different schema.
    SchemaMismatch {
        expected: SchemaVariant,
        actual: SchemaVariant,
    },
}

impl fmt::Display for InferenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InferenceError::Model(e) => write!(f, "model failed: {}", e),
            InferenceError::UnexpectedClass(class) => {
                write!(f, "model returned class {}, expected 0 or 1", class)
            }
            InferenceError::MissingProbability { returned } => write!(
                f,
                "model returned {} class probabilities, expected 2",
                returned
            ),
            InferenceError::InvalidProbability(p) => {
                write!(f, "model returned churn probability {}", p)
            }
            InferenceError::SchemaMismatch { expected, actual } => write!(
                f,
                "record uses the {} schema but the model expects {}",
                actual, expected
            ),
        }
    }
}

impl std::error::Error for InferenceError {}

impl From<ModelError> for InferenceError {
    fn from(err: ModelError) -> Self {
        InferenceError::Model(err)
    }
}

/// Read-only handle used to score records.
#[derive(Clone)]
pub struct Predictor {
    model: Arc<dyn ChurnModel>,
    schema: SchemaVariant,
}

impl Predictor {
    pub fn new(model: Arc<dyn ChurnModel>, schema: SchemaVariant) -> Self {
        Self { model, schema }
    }

    pub fn schema(&self) -> SchemaVariant {
        self.schema
    }

    pub fn model(&self) -> &Arc<dyn ChurnModel> {
        &self.model
    }

    /// Classifies the record, then reads its class-1 probability.
    ///
    /// Calls `predict` once and `predict_proba` once. The verdict comes from
    /// `predict`; the probability is only displayed.
    pub fn invoke(&self, record: &CustomerRecord) -> Result<PredictionOutcome, InferenceError> {
        if record.schema() != self.schema {
            return Err(InferenceError::SchemaMismatch {
                expected: self.schema,
                actual: record.schema(),
            });
        }

        let class = match self.model.predict(record)? {
            0 => ChurnClass::Stay,
            1 => ChurnClass::Churn,
            other => return Err(InferenceError::UnexpectedClass(other)),
        };

        let proba = self.model.predict_proba(record)?;
        let churn_probability = *proba.get(1).ok_or(InferenceError::MissingProbability {
            returned: proba.len(),
        })?;

        if !(0.0..=1.0).contains(&churn_probability) {
            return Err(InferenceError::InvalidProbability(churn_probability));
        }

        Ok(PredictionOutcome {
            class,
            churn_probability,
        })
    }
}

impl fmt::Debug for Predictor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Predictor")
            .field("model", &self.model.info().name)
            .field("schema", &self.schema)
            .finish()
    }
}
