//! Utility to inspect a model artifact and check it against both form schemas.
//!
//! Usage: `inspect_model [path]` (defaults to `MODEL_PATH` or `model.json`).

use churn_predictor::classifier::{ArtifactModel, ChurnModel, ModelArtifact};
use churn_predictor::collector::InputCollector;
use churn_predictor::inference::{assemble_record, Predictor};
use churn_predictor::model_store::{check_schema, fingerprint, resolve_model_path};
use churn_predictor::schema::SchemaVariant;
use dotenvy::dotenv;
use std::path::PathBuf;
use std::sync::Arc;

/// Main entry point for the model inspection utility.
///
/// Prints the artifact metadata and declared columns, reports which schema the
/// artifact matches, and scores the default record for each matching schema.
fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("MODEL_PATH").ok())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("model.json"));
    let path = resolve_model_path(&path);

    let bytes = std::fs::read(&path)
        .map_err(|e| anyhow::anyhow!("cannot read {}: {}", path.display(), e))?;
    let artifact = ModelArtifact::from_slice(&bytes)
        .map_err(|e| anyhow::anyhow!("cannot parse {}: {}", path.display(), e))?;
    let model = Arc::new(ArtifactModel::new(artifact)?);
    let info = model.info();

    println!("Model artifact: {}", path.display());
    println!("- name: {}", info.name);
    println!("- kind: {}", info.kind);
    if let Some(description) = &info.description {
        println!("- description: {}", description);
    }
    println!("- sha256: {}", fingerprint(&bytes));
    println!();

    println!("Declared input columns:");
    for column in model.input_columns() {
        println!("  - {}: {}", column.name, column.column_type);
    }
    println!();

    for schema in [SchemaVariant::Full, SchemaVariant::Reduced] {
        match check_schema(&model.input_columns(), schema) {
            Ok(()) => {
                let predictor = Predictor::new(model.clone(), schema);
                let record = assemble_record(&InputCollector::new(schema).defaults());
                match predictor.invoke(&record) {
                    Ok(outcome) => println!(
                        "{} schema: OK, default record -> {} (churn probability {})",
                        schema,
                        outcome.class.label(),
                        outcome.probability_text()
                    ),
                    Err(e) => println!("{} schema: OK, default record failed: {}", schema, e),
                }
            }
            Err(e) => println!("{} schema: {}", schema, e),
        }
    }

    Ok(())
}
