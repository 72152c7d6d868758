//! Churn classifier contract and the JSON model artifact that implements it.
//!
//! A model exposes two operations over a [`CustomerRecord`]: `predict` returns
//! the class (1 means "will churn") and `predict_proba` returns `[p0, p1]`.
//!
//! The artifact is a JSON document:
//!
//! ```json
//! {
//!   "name": "telco-churn-logreg",
//!   "input_columns": [{"name": "tenure", "type": "integer"}, ...],
//!   "estimator": {"kind": "logistic_regression", "intercept": -0.4, ...}
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;

use crate::models::{CustomerRecord, FieldValue};
use crate::schema::ColumnType;

/// Errors raised by a model, either while validating an artifact or while
/// scoring a record.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelError {
    /// The record has no value for a column the model reads.
    MissingColumn(String),
    /// The record value has the wrong type for the column.
    ColumnType { column: String, expected: ColumnType },
    /// The artifact is structurally inconsistent.
    InvalidArtifact(String),
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelError::MissingColumn(column) => {
                write!(f, "record has no value for column '{}'", column)
            }
            ModelError::ColumnType { column, expected } => {
                write!(f, "column '{}' must hold a {} value", column, expected)
            }
            ModelError::InvalidArtifact(msg) => write!(f, "invalid model artifact: {}", msg),
        }
    }
}

impl std::error::Error for ModelError {}

/// A column the model expects in its input record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputColumn {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
}

/// Descriptive metadata about a loaded model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelInfo {
    pub name: String,
    pub kind: String,
    pub description: Option<String>,
}

/// Binary churn classifier.
///
/// Implementations are immutable once constructed and are shared across
/// requests behind an `Arc`.
pub trait ChurnModel: Send + Sync {
    /// Class label for the record: 0 (stay) or 1 (churn).
    fn predict(&self, record: &CustomerRecord) -> Result<u8, ModelError>;

    /// Class probabilities for the record, indexed by class.
    fn predict_proba(&self, record: &CustomerRecord) -> Result<Vec<f64>, ModelError>;

    /// Columns the model was trained on.
    fn input_columns(&self) -> Vec<InputColumn>;

    fn info(&self) -> ModelInfo;
}

// ============ Artifact ============

/// Serialized classifier loaded from disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub input_columns: Vec<InputColumn>,
    pub estimator: Estimator,
}

/// Supported estimators, tagged by `kind`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Estimator {
    LogisticRegression(LogisticRegression),
    DecisionTree(DecisionTree),
}

impl Estimator {
    pub fn kind(&self) -> &'static str {
        match self {
            Estimator::LogisticRegression(_) => "logistic_regression",
            Estimator::DecisionTree(_) => "decision_tree",
        }
    }
}

/// Logistic regression over standardized numeric columns and one-hot
/// encoded categorical columns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticRegression {
    pub intercept: f64,
    #[serde(default)]
    pub numeric: Vec<NumericTerm>,
    #[serde(default)]
    pub categorical: Vec<CategoricalTerm>,
}

/// Contributes `coef * (x - mean) / scale`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NumericTerm {
    pub column: String,
    #[serde(default)]
    pub mean: f64,
    #[serde(default = "unit_scale")]
    pub scale: f64,
    pub coef: f64,
}

fn unit_scale() -> f64 {
    1.0
}

/// Contributes the coefficient of the matching category. Unknown categories
/// contribute nothing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoricalTerm {
    pub column: String,
    pub categories: BTreeMap<String, f64>,
}

/// Binary decision tree stored as a flat node list; node 0 is the root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    pub nodes: Vec<TreeNode>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TreeNode {
    /// Goes left when `x <= threshold` (numeric) or when the value is one of
    /// `categories` (categorical).
    Split {
        column: String,
        #[serde(default)]
        threshold: Option<f64>,
        #[serde(default)]
        categories: Option<Vec<String>>,
        left: usize,
        right: usize,
    },
    /// Training sample counts per class.
    Leaf { counts: Vec<f64> },
}

impl ModelArtifact {
    /// Parses an artifact from JSON bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    /// Checks the artifact's internal consistency.
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.name.trim().is_empty() {
            return Err(invalid("name cannot be empty"));
        }

        let mut seen = HashSet::new();
        for column in &self.input_columns {
            if !seen.insert(column.name.as_str()) {
                return Err(invalid(format!("column '{}' is declared twice", column.name)));
            }
        }

        match &self.estimator {
            Estimator::LogisticRegression(lr) => self.validate_logistic(lr),
            Estimator::DecisionTree(tree) => self.validate_tree(tree),
        }
    }

    fn column_type(&self, name: &str) -> Result<ColumnType, ModelError> {
        self.input_columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.column_type)
            .ok_or_else(|| invalid(format!("column '{}' is not declared in input_columns", name)))
    }

    fn validate_logistic(&self, lr: &LogisticRegression) -> Result<(), ModelError> {
        if !lr.intercept.is_finite() {
            return Err(invalid("intercept must be finite"));
        }

        for term in &lr.numeric {
            if !self.column_type(&term.column)?.is_numeric() {
                return Err(invalid(format!(
                    "numeric term references non-numeric column '{}'",
                    term.column
                )));
            }
            if !term.scale.is_finite() || term.scale == 0.0 {
                return Err(invalid(format!(
                    "scale for column '{}' must be finite and non-zero",
                    term.column
                )));
            }
            if !term.mean.is_finite() || !term.coef.is_finite() {
                return Err(invalid(format!(
                    "mean and coef for column '{}' must be finite",
                    term.column
                )));
            }
        }

        for term in &lr.categorical {
            if self.column_type(&term.column)? != ColumnType::String {
                return Err(invalid(format!(
                    "categorical term references non-string column '{}'",
                    term.column
                )));
            }
            if term.categories.values().any(|c| !c.is_finite()) {
                return Err(invalid(format!(
                    "coefficients for column '{}' must be finite",
                    term.column
                )));
            }
        }

        Ok(())
    }

    fn validate_tree(&self, tree: &DecisionTree) -> Result<(), ModelError> {
        if tree.nodes.is_empty() {
            return Err(invalid("decision tree has no nodes"));
        }

        for (index, node) in tree.nodes.iter().enumerate() {
            match node {
                TreeNode::Split {
                    column,
                    threshold,
                    categories,
                    left,
                    right,
                } => {
                    let column_type = self.column_type(column)?;
                    match (threshold, categories) {
                        (Some(t), None) => {
                            if !column_type.is_numeric() {
                                return Err(invalid(format!(
                                    "node {} splits non-numeric column '{}' on a threshold",
                                    index, column
                                )));
                            }
                            if !t.is_finite() {
                                return Err(invalid(format!("node {} threshold must be finite", index)));
                            }
                        }
                        (None, Some(_)) => {
                            if column_type != ColumnType::String {
                                return Err(invalid(format!(
                                    "node {} splits non-string column '{}' on categories",
                                    index, column
                                )));
                            }
                        }
                        _ => {
                            return Err(invalid(format!(
                                "node {} needs exactly one of threshold or categories",
                                index
                            )))
                        }
                    }
                    for child in [left, right] {
                        if *child >= tree.nodes.len() {
                            return Err(invalid(format!(
                                "node {} points to missing node {}",
                                index, child
                            )));
                        }
                    }
                }
                TreeNode::Leaf { counts } => {
                    if counts.len() != 2 {
                        return Err(invalid(format!(
                            "leaf {} must have 2 class counts, has {}",
                            index,
                            counts.len()
                        )));
                    }
                    if counts.iter().any(|c| !c.is_finite() || *c < 0.0) {
                        return Err(invalid(format!("leaf {} has a negative count", index)));
                    }
                    if counts.iter().sum::<f64>() <= 0.0 {
                        return Err(invalid(format!("leaf {} has no samples", index)));
                    }
                }
            }
        }

        // Every node must be reached at most once from the root.
        let mut visited = vec![false; tree.nodes.len()];
        let mut stack = vec![0usize];
        while let Some(index) = stack.pop() {
            if visited[index] {
                return Err(invalid(format!("node {} is reachable more than once", index)));
            }
            visited[index] = true;
            if let TreeNode::Split { left, right, .. } = &tree.nodes[index] {
                stack.push(*left);
                stack.push(*right);
            }
        }

        Ok(())
    }
}

fn invalid(msg: impl Into<String>) -> ModelError {
    ModelError::InvalidArtifact(msg.into())
}

fn numeric_value(record: &CustomerRecord, column: &str) -> Result<f64, ModelError> {
    record
        .get(column)
        .ok_or_else(|| ModelError::MissingColumn(column.to_string()))?
        .as_f64()
        .ok_or_else(|| ModelError::ColumnType {
            column: column.to_string(),
            expected: ColumnType::Float,
        })
}

fn text_value<'r>(record: &'r CustomerRecord, column: &str) -> Result<&'r str, ModelError> {
    match record.get(column) {
        Some(FieldValue::Text(s)) => Ok(s),
        Some(_) => Err(ModelError::ColumnType {
            column: column.to_string(),
            expected: ColumnType::String,
        }),
        None => Err(ModelError::MissingColumn(column.to_string())),
    }
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

/// Index of the larger probability; ties go to class 0.
fn argmax(proba: &[f64]) -> u8 {
    if proba[1] > proba[0] {
        1
    } else {
        0
    }
}

impl LogisticRegression {
    fn decision_function(&self, record: &CustomerRecord) -> Result<f64, ModelError> {
        let mut z = self.intercept;

        for term in &self.numeric {
            let x = numeric_value(record, &term.column)?;
            z += term.coef * (x - term.mean) / term.scale;
        }

        for term in &self.categorical {
            let value = text_value(record, &term.column)?;
            z += term.categories.get(value).copied().unwrap_or(0.0);
        }

        Ok(z)
    }

    fn predict_proba(&self, record: &CustomerRecord) -> Result<Vec<f64>, ModelError> {
        let p1 = sigmoid(self.decision_function(record)?);
        Ok(vec![1.0 - p1, p1])
    }
}

impl DecisionTree {
    fn leaf_counts(&self, record: &CustomerRecord) -> Result<&[f64], ModelError> {
        let mut index = 0usize;

        // Validation rejects cycles; the bound keeps an unvalidated tree from spinning.
        for _ in 0..=self.nodes.len() {
            match &self.nodes[index] {
                TreeNode::Leaf { counts } => return Ok(counts.as_slice()),
                TreeNode::Split {
                    column,
                    threshold,
                    categories,
                    left,
                    right,
                } => {
                    let go_left = match (threshold, categories) {
                        (Some(t), _) => numeric_value(record, column)? <= *t,
                        (None, Some(set)) => {
                            let value = text_value(record, column)?;
                            set.iter().any(|c| c == value)
                        }
                        (None, None) => {
                            return Err(invalid(format!("node {} has no split rule", index)))
                        }
                    };
                    index = if go_left { *left } else { *right };
                }
            }
        }

        Err(invalid("decision tree traversal did not reach a leaf"))
    }

    fn predict_proba(&self, record: &CustomerRecord) -> Result<Vec<f64>, ModelError> {
        let counts = self.leaf_counts(record)?;
        let total: f64 = counts.iter().sum();
        Ok(counts.iter().map(|c| c / total).collect())
    }
}

/// [`ChurnModel`] backed by a validated [`ModelArtifact`].
#[derive(Debug, Clone)]
pub struct ArtifactModel {
    artifact: ModelArtifact,
}

impl ArtifactModel {
    /// Wraps an artifact after validating it.
    pub fn new(artifact: ModelArtifact) -> Result<Self, ModelError> {
        artifact.validate()?;
        Ok(Self { artifact })
    }

    pub fn artifact(&self) -> &ModelArtifact {
        &self.artifact
    }
}

impl ChurnModel for ArtifactModel {
    fn predict(&self, record: &CustomerRecord) -> Result<u8, ModelError> {
        let proba = self.predict_proba(record)?;
        Ok(argmax(&proba))
    }

    fn predict_proba(&self, record: &CustomerRecord) -> Result<Vec<f64>, ModelError> {
        match &self.artifact.estimator {
            Estimator::LogisticRegression(lr) => lr.predict_proba(record),
            Estimator::DecisionTree(tree) => tree.predict_proba(record),
        }
    }

    fn input_columns(&self) -> Vec<InputColumn> {
        self.artifact.input_columns.clone()
    }

    fn info(&self) -> ModelInfo {
        ModelInfo {
            name: self.artifact.name.clone(),
            kind: self.artifact.estimator.kind().to_string(),
            description: self.artifact.description.clone(),
        }
    }
}
