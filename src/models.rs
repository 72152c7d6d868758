use chrono::{DateTime, Utc};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::schema::{ColumnType, SchemaVariant};

// ============ Record Models ============

/// A single cell of a customer record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl FieldValue {
    pub fn column_type(&self) -> ColumnType {
        match self {
            FieldValue::Integer(_) => ColumnType::Integer,
            FieldValue::Float(_) => ColumnType::Float,
            FieldValue::Text(_) => ColumnType::String,
        }
    }

    /// Numeric view of the value; `None` for text.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Integer(v) => Some(*v as f64),
            FieldValue::Float(v) => Some(*v),
            FieldValue::Text(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Integer(v) => write!(f, "{}", v),
            FieldValue::Float(v) => write!(f, "{}", crate::schema::format_float(*v)),
            FieldValue::Text(s) => f.write_str(s),
        }
    }
}

/// One prediction request, shaped like the table the model was trained on.
///
/// Columns keep schema order. The record is built per trigger and dropped once
/// the result has been rendered.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomerRecord {
    schema: SchemaVariant,
    columns: Vec<(&'static str, FieldValue)>,
}

impl CustomerRecord {
    pub fn new(schema: SchemaVariant, columns: Vec<(&'static str, FieldValue)>) -> Self {
        Self { schema, columns }
    }

    pub fn schema(&self) -> SchemaVariant {
        self.schema
    }

    /// Returns the value stored under `column`.
    pub fn get(&self, column: &str) -> Option<&FieldValue> {
        self.columns
            .iter()
            .find(|(name, _)| *name == column)
            .map(|(_, value)| value)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.columns.iter().map(|(name, _)| *name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &FieldValue)> + '_ {
        self.columns.iter().map(|(name, value)| (*name, value))
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl Serialize for CustomerRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for (name, value) in &self.columns {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

// ============ API Models ============

/// Identifies the model that produced a prediction.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ModelSummary {
    /// Name declared in the artifact.
    pub name: String,
    /// Estimator kind (e.g., "logistic_regression").
    pub kind: String,
    /// SHA-256 of the artifact bytes (hex encoded).
    pub fingerprint: String,
}

/// Response of `POST /api/v1/predict`.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PredictionResponse {
    /// Per-request identifier, also present in the logs.
    pub request_id: Uuid,
    /// Schema the record was assembled with.
    pub schema: SchemaVariant,
    /// Human readable verdict ("likely to churn" / "likely to stay").
    pub verdict: String,
    /// Short label ("Churn" / "No Churn").
    pub label: String,
    /// Class predicted by the model: true when class 1.
    pub churn: bool,
    /// Probability of class 1.
    pub churn_probability: f64,
    /// Churn probability with two decimal places.
    pub probability_text: String,
    /// Churn probability on a 0-100 scale.
    pub probability_percent: u8,
    pub model: ModelSummary,
    pub predicted_at: DateTime<Utc>,
    /// The record that was submitted to the model.
    #[schema(value_type = Object)]
    pub record: CustomerRecord,
}

/// Describes one form control.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct FieldDescriptor {
    pub name: String,
    pub label: String,
    pub section: String,
    /// "integer", "float", "choice" or "flag".
    pub kind: String,
    /// Type of the record column the value is stored in.
    pub column_type: ColumnType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[schema(value_type = Object)]
    pub default: serde_json::Value,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<String>,
}

/// Response of `GET /api/v1/schema`.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SchemaResponse {
    pub schema: SchemaVariant,
    pub fields: Vec<FieldDescriptor>,
    /// Present when a model is loaded.
    pub model: Option<ModelSummary>,
}

/// Model status reported by the health check.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ModelStatus {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
    /// Why the model is unavailable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Response of `GET /health`.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub schema: SchemaVariant,
    pub model: ModelStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_serializes_in_column_order() {
        let record = CustomerRecord::new(
            SchemaVariant::Reduced,
            vec![
                ("tenure", FieldValue::Integer(0)),
                ("MonthlyCharges", FieldValue::Float(0.0)),
                ("TotalCharges", FieldValue::Float(10000.0)),
            ],
        );

        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(
            json,
            r#"{"tenure":0,"MonthlyCharges":0.0,"TotalCharges":10000.0}"#
        );
    }

    #[test]
    fn test_record_lookup() {
        let record = CustomerRecord::new(
            SchemaVariant::Full,
            vec![("gender", FieldValue::Text("Female".to_string()))],
        );

        assert_eq!(record.get("gender").and_then(|v| v.as_str()), Some("Female"));
        assert!(record.get("tenure").is_none());
        assert_eq!(record.len(), 1);
    }

    #[test]
    fn test_field_value_display() {
        assert_eq!(FieldValue::Integer(12).to_string(), "12");
        assert_eq!(FieldValue::Float(70.0).to_string(), "70.0");
        assert_eq!(FieldValue::Float(70.25).to_string(), "70.25");
        assert_eq!(FieldValue::Text("DSL".into()).to_string(), "DSL");
    }
}
