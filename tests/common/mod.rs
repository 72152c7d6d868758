//! Shared helpers for integration tests.
#![allow(dead_code)]

use churn_predictor::classifier::{ChurnModel, InputColumn, ModelError, ModelInfo};
use churn_predictor::config::Config;
use churn_predictor::models::CustomerRecord;
use churn_predictor::schema::SchemaVariant;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Path to one of the sample artifacts shipped in `models/`.
pub fn sample_model(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("models").join(name)
}

/// Config for router tests: no rate limiting, chosen schema.
pub fn test_config(schema: SchemaVariant) -> Config {
    Config {
        schema,
        rate_limit: None,
        ..Config::default()
    }
}

/// Model with a fixed answer that counts and records every call.
pub struct CountingModel {
    schema: SchemaVariant,
    class: u8,
    proba: Vec<f64>,
    pub predict_calls: AtomicUsize,
    pub proba_calls: AtomicUsize,
    pub seen: Mutex<Vec<CustomerRecord>>,
}

impl CountingModel {
    pub fn new(schema: SchemaVariant, class: u8, proba: Vec<f64>) -> Self {
        Self {
            schema,
            class,
            proba,
            predict_calls: AtomicUsize::new(0),
            proba_calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn predict_count(&self) -> usize {
        self.predict_calls.load(Ordering::SeqCst)
    }

    pub fn proba_count(&self) -> usize {
        self.proba_calls.load(Ordering::SeqCst)
    }

    pub fn records(&self) -> Vec<CustomerRecord> {
        self.seen.lock().unwrap().clone()
    }
}

impl ChurnModel for CountingModel {
    fn predict(&self, record: &CustomerRecord) -> Result<u8, ModelError> {
        self.predict_calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(record.clone());
        Ok(self.class)
    }

    fn predict_proba(&self, _record: &CustomerRecord) -> Result<Vec<f64>, ModelError> {
        self.proba_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.proba.clone())
    }

    fn input_columns(&self) -> Vec<InputColumn> {
        self.schema
            .fields()
            .iter()
            .map(|f| InputColumn {
                name: f.name.to_string(),
                column_type: f.column_type(),
            })
            .collect()
    }

    fn info(&self) -> ModelInfo {
        ModelInfo {
            name: "counting".to_string(),
            kind: "test".to_string(),
            description: None,
        }
    }
}

/// Model whose scoring always fails.
pub struct FailingModel;

impl ChurnModel for FailingModel {
    fn predict(&self, _record: &CustomerRecord) -> Result<u8, ModelError> {
        Err(ModelError::MissingColumn("customerID".to_string()))
    }

    fn predict_proba(&self, _record: &CustomerRecord) -> Result<Vec<f64>, ModelError> {
        Err(ModelError::MissingColumn("customerID".to_string()))
    }

    fn input_columns(&self) -> Vec<InputColumn> {
        SchemaVariant::Reduced
            .fields()
            .iter()
            .map(|f| InputColumn {
                name: f.name.to_string(),
                column_type: f.column_type(),
            })
            .collect()
    }

    fn info(&self) -> ModelInfo {
        ModelInfo {
            name: "failing".to_string(),
            kind: "test".to_string(),
            description: None,
        }
    }
}
