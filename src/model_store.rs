//! Loading the model artifact at startup.
//!
//! The artifact is read once, fingerprinted, validated and matched against the
//! configured schema before the server starts accepting requests.

use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::classifier::{ArtifactModel, ChurnModel, InputColumn, ModelArtifact, ModelError, ModelInfo};
use crate::inference::Predictor;
use crate::models::ModelSummary;
use crate::schema::SchemaVariant;

/// Why the model could not be loaded.
#[derive(Debug)]
pub enum ModelLoadError {
    /// The file is missing or unreadable.
    Io { path: PathBuf, source: std::io::Error },
    /// The file is not a valid artifact document.
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    /// The artifact is inconsistent.
    Invalid(ModelError),
    /// The artifact was trained on a different set of columns.
    SchemaMismatch {
        schema: SchemaVariant,
        missing: Vec<String>,
        unexpected: Vec<String>,
        mistyped: Vec<String>,
    },
}

impl fmt::Display for ModelLoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelLoadError::Io { path, source } => {
                write!(f, "cannot read model file {}: {}", path.display(), source)
            }
            ModelLoadError::Parse { path, source } => {
                write!(f, "cannot parse model file {}: {}", path.display(), source)
            }
            ModelLoadError::Invalid(e) => write!(f, "{}", e),
            ModelLoadError::SchemaMismatch {
                schema,
                missing,
                unexpected,
                mistyped,
            } => {
                write!(f, "model does not match the {} schema", schema)?;
                if !missing.is_empty() {
                    write!(f, "; missing columns: {}", missing.join(", "))?;
                }
                if !unexpected.is_empty() {
                    write!(f, "; unexpected columns: {}", unexpected.join(", "))?;
                }
                if !mistyped.is_empty() {
                    write!(f, "; wrong column types: {}", mistyped.join(", "))?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ModelLoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ModelLoadError::Io { source, .. } => Some(source),
            ModelLoadError::Parse { source, .. } => Some(source),
            ModelLoadError::Invalid(e) => Some(e),
            ModelLoadError::SchemaMismatch { .. } => None,
        }
    }
}

/// Resolves a configured model path.
///
/// Absolute paths are returned unchanged. Relative paths are tried against the
/// working directory, then against the directory of the running executable.
/// When neither exists the working-directory candidate is returned so that the
/// load error names it.
pub fn resolve_model_path(path: &Path) -> PathBuf {
    if path.is_absolute() || path.exists() {
        return path.to_path_buf();
    }

    let beside_exe = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(path)));

    match beside_exe {
        Some(candidate) if candidate.exists() => candidate,
        _ => path.to_path_buf(),
    }
}

/// Compares the model's expected columns with the schema's fields.
///
/// Order does not matter; names and column types must match exactly.
pub fn check_schema(columns: &[InputColumn], schema: SchemaVariant) -> Result<(), ModelLoadError> {
    let fields = schema.fields();
    let declared: HashSet<&str> = columns.iter().map(|c| c.name.as_str()).collect();

    let missing: Vec<String> = fields
        .iter()
        .filter(|f| !declared.contains(f.name))
        .map(|f| f.name.to_string())
        .collect();

    let mut unexpected = Vec::new();
    let mut mistyped = Vec::new();
    for column in columns {
        match schema.field(&column.name) {
            None => unexpected.push(column.name.clone()),
            Some(spec) if spec.column_type() != column.column_type => mistyped.push(format!(
                "{} (model: {}, form: {})",
                column.name,
                column.column_type,
                spec.column_type()
            )),
            Some(_) => {}
        }
    }

    if missing.is_empty() && unexpected.is_empty() && mistyped.is_empty() {
        Ok(())
    } else {
        Err(ModelLoadError::SchemaMismatch {
            schema,
            missing,
            unexpected,
            mistyped,
        })
    }
}

/// SHA-256 of the artifact bytes, hex encoded.
pub fn fingerprint(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// A model that passed the schema check, ready to score records.
#[derive(Clone, Debug)]
pub struct LoadedModel {
    pub predictor: Predictor,
    pub info: ModelInfo,
    pub fingerprint: String,
    /// Where the artifact came from; `None` for models built in process.
    pub source: Option<PathBuf>,
}

impl LoadedModel {
    /// Wraps an already constructed model after checking it against `schema`.
    pub fn new(
        model: Arc<dyn ChurnModel>,
        schema: SchemaVariant,
        fingerprint: String,
    ) -> Result<Self, ModelLoadError> {
        check_schema(&model.input_columns(), schema)?;
        let info = model.info();

        Ok(Self {
            predictor: Predictor::new(model, schema),
            info,
            fingerprint,
            source: None,
        })
    }

    pub fn summary(&self) -> ModelSummary {
        ModelSummary {
            name: self.info.name.clone(),
            kind: self.info.kind.clone(),
            fingerprint: self.fingerprint.clone(),
        }
    }
}

/// Parses, validates and schema-checks artifact bytes.
pub fn load_model_from_bytes(bytes: &[u8], schema: SchemaVariant) -> Result<LoadedModel, ModelLoadError> {
    let artifact = ModelArtifact::from_slice(bytes).map_err(|source| ModelLoadError::Parse {
        path: PathBuf::from("<memory>"),
        source,
    })?;
    let model = ArtifactModel::new(artifact).map_err(ModelLoadError::Invalid)?;
    LoadedModel::new(Arc::new(model), schema, fingerprint(bytes))
}

/// Reads the artifact at `path` and prepares it for the given schema.
pub fn load_model(path: &Path, schema: SchemaVariant) -> Result<LoadedModel, ModelLoadError> {
    let bytes = std::fs::read(path).map_err(|source| ModelLoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let mut loaded = load_model_from_bytes(&bytes, schema).map_err(|e| match e {
        ModelLoadError::Parse { source, .. } => ModelLoadError::Parse {
            path: path.to_path_buf(),
            source,
        },
        other => other,
    })?;
    loaded.source = Some(path.to_path_buf());

    tracing::info!(
        path = %path.display(),
        model = %loaded.info.name,
        kind = %loaded.info.kind,
        fingerprint = %loaded.fingerprint,
        schema = %schema,
        "Model artifact loaded"
    );

    Ok(loaded)
}

/// The model as seen by request handlers.
#[derive(Clone, Debug)]
pub enum ModelHandle {
    Ready(LoadedModel),
    /// Loading failed at startup; no inference is performed.
    Unavailable { reason: String },
}

impl ModelHandle {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        ModelHandle::Unavailable {
            reason: reason.into(),
        }
    }

    pub fn ready(&self) -> Option<&LoadedModel> {
        match self {
            ModelHandle::Ready(model) => Some(model),
            ModelHandle::Unavailable { .. } => None,
        }
    }
}
