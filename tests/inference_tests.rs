/// Tests for record assembly, the inference call and model loading
/// Uses a counting mock model and the sample artifacts under models/
mod common;

use churn_predictor::collector::InputCollector;
use churn_predictor::inference::{assemble_record, ChurnClass, InferenceError};
use churn_predictor::model_store::{load_model, LoadedModel, ModelLoadError};
use churn_predictor::models::FieldValue;
use churn_predictor::schema::SchemaVariant;
use common::{sample_model, CountingModel, FailingModel};
use std::collections::HashMap;
use std::sync::Arc;

fn form(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[cfg(test)]
mod record_assembly_tests {
    use super::*;

    #[test]
    fn test_default_full_record() {
        let inputs = InputCollector::new(SchemaVariant::Full).defaults();
        let record = assemble_record(&inputs);

        assert_eq!(record.len(), 19);
        assert_eq!(record.get("tenure"), Some(&FieldValue::Integer(12)));
        assert_eq!(record.get("MonthlyCharges"), Some(&FieldValue::Float(70.0)));
        assert_eq!(record.get("TotalCharges"), Some(&FieldValue::Float(800.0)));
        assert_eq!(record.get("SeniorCitizen"), Some(&FieldValue::Integer(1)));
        assert_eq!(
            record.get("Contract"),
            Some(&FieldValue::Text("Month-to-month".to_string()))
        );
    }

    #[test]
    fn test_default_reduced_record() {
        let inputs = InputCollector::new(SchemaVariant::Reduced).defaults();
        let record = assemble_record(&inputs);

        let columns: Vec<&str> = record.column_names().collect();
        assert_eq!(columns, vec!["tenure", "MonthlyCharges", "TotalCharges"]);
        assert!(record.get("SeniorCitizen").is_none());
    }

    #[test]
    fn test_zero_boundary_is_kept() {
        let collector = InputCollector::new(SchemaVariant::Reduced);
        let inputs = collector
            .collect_form(&form(&[
                ("tenure", "0"),
                ("MonthlyCharges", "0.0"),
                ("TotalCharges", "0.0"),
            ]))
            .unwrap();
        let record = assemble_record(&inputs);

        assert_eq!(record.get("tenure"), Some(&FieldValue::Integer(0)));
        assert_eq!(record.get("MonthlyCharges"), Some(&FieldValue::Float(0.0)));
        assert_eq!(record.get("TotalCharges"), Some(&FieldValue::Float(0.0)));
    }

    #[test]
    fn test_max_boundary_is_kept() {
        let collector = InputCollector::new(SchemaVariant::Full);
        let inputs = collector
            .collect_form(&form(&[
                ("tenure", "100"),
                ("MonthlyCharges", "200.0"),
                ("TotalCharges", "10000.0"),
            ]))
            .unwrap();
        let record = assemble_record(&inputs);

        assert_eq!(record.get("tenure"), Some(&FieldValue::Integer(100)));
        assert_eq!(record.get("MonthlyCharges"), Some(&FieldValue::Float(200.0)));
        assert_eq!(record.get("TotalCharges"), Some(&FieldValue::Float(10000.0)));
    }

    #[test]
    fn test_values_past_the_range_are_rejected_not_clamped() {
        let collector = InputCollector::new(SchemaVariant::Full);

        for (field, value) in [
            ("tenure", "101"),
            ("tenure", "-1"),
            ("MonthlyCharges", "200.01"),
            ("TotalCharges", "-0.5"),
        ] {
            let err = collector.collect_form(&form(&[(field, value)])).unwrap_err();
            assert_eq!(err.field(), field);
        }
    }
}

#[cfg(test)]
mod invocation_tests {
    use super::*;

    #[test]
    fn test_default_inputs_end_to_end() {
        let model = Arc::new(CountingModel::new(SchemaVariant::Full, 0, vec![0.63, 0.37]));
        let loaded =
            LoadedModel::new(model.clone(), SchemaVariant::Full, "test".to_string()).unwrap();

        let inputs = InputCollector::new(SchemaVariant::Full).defaults();
        let record = assemble_record(&inputs);
        let outcome = loaded.predictor.invoke(&record).unwrap();

        assert_eq!(model.predict_count(), 1);
        assert_eq!(model.proba_count(), 1);
        assert_eq!(model.records(), vec![record]);
        assert_eq!(outcome.class, ChurnClass::Stay);
        assert_eq!(outcome.probability_text(), "0.37");
        assert_eq!(outcome.class.verdict(), "likely to stay");
    }

    #[test]
    fn test_identical_inputs_give_identical_results() {
        let loaded = load_model(&sample_model("model.json"), SchemaVariant::Full).unwrap();
        let collector = InputCollector::new(SchemaVariant::Full);
        let raw = form(&[("tenure", "3"), ("InternetService", "Fiber optic")]);

        let first = loaded
            .predictor
            .invoke(&assemble_record(&collector.collect_form(&raw).unwrap()))
            .unwrap();
        let second = loaded
            .predictor
            .invoke(&assemble_record(&collector.collect_form(&raw).unwrap()))
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(first.probability_text(), second.probability_text());
    }

    #[test]
    fn test_model_failure_is_returned_not_raised() {
        let loaded =
            LoadedModel::new(Arc::new(FailingModel), SchemaVariant::Reduced, "x".to_string())
                .unwrap();
        let record = assemble_record(&InputCollector::new(SchemaVariant::Reduced).defaults());

        let err = loaded.predictor.invoke(&record).unwrap_err();
        assert!(matches!(err, InferenceError::Model(_)));
        assert!(err.to_string().contains("customerID"));
    }

    #[test]
    fn test_mock_must_match_schema() {
        let model = Arc::new(CountingModel::new(SchemaVariant::Reduced, 0, vec![1.0, 0.0]));
        let result = LoadedModel::new(model.clone(), SchemaVariant::Full, "x".to_string());

        assert!(matches!(result, Err(ModelLoadError::SchemaMismatch { .. })));
        assert_eq!(model.predict_count(), 0);
    }
}

#[cfg(test)]
mod sample_artifact_tests {
    use super::*;

    #[test]
    fn test_full_sample_scores_default_record() {
        let loaded = load_model(&sample_model("model.json"), SchemaVariant::Full).unwrap();
        assert_eq!(loaded.info.kind, "logistic_regression");
        assert_eq!(loaded.fingerprint.len(), 64);

        let record = assemble_record(&InputCollector::new(SchemaVariant::Full).defaults());
        let outcome = loaded.predictor.invoke(&record).unwrap();

        assert_eq!(outcome.probability_text(), "0.47");
        assert_eq!(outcome.class, ChurnClass::Stay);
    }

    #[test]
    fn test_full_sample_separates_risk_profiles() {
        let loaded = load_model(&sample_model("model.json"), SchemaVariant::Full).unwrap();
        let collector = InputCollector::new(SchemaVariant::Full);

        let risky = collector
            .collect_form(&form(&[
                ("tenure", "1"),
                ("MonthlyCharges", "95"),
                ("TotalCharges", "95"),
                ("SeniorCitizen", "No"),
                ("InternetService", "Fiber optic"),
                ("OnlineSecurity", "No"),
                ("TechSupport", "No"),
            ]))
            .unwrap();
        let outcome = loaded.predictor.invoke(&assemble_record(&risky)).unwrap();
        assert_eq!(outcome.class, ChurnClass::Churn);
        assert_eq!(outcome.probability_text(), "0.87");

        let loyal = collector
            .collect_form(&form(&[
                ("tenure", "70"),
                ("TotalCharges", "5000"),
                ("Contract", "Two year"),
                ("PaymentMethod", "Credit card (automatic)"),
            ]))
            .unwrap();
        let outcome = loaded.predictor.invoke(&assemble_record(&loyal)).unwrap();
        assert_eq!(outcome.class, ChurnClass::Stay);
        assert_eq!(outcome.probability_text(), "0.02");
    }

    #[test]
    fn test_reduced_sample_tree() {
        let loaded = load_model(&sample_model("model_reduced.json"), SchemaVariant::Reduced).unwrap();
        assert_eq!(loaded.info.kind, "decision_tree");

        // tenure 12 <= 16.5, MonthlyCharges 70 > 68.35 -> leaf [496, 947]
        let record = assemble_record(&InputCollector::new(SchemaVariant::Reduced).defaults());
        let outcome = loaded.predictor.invoke(&record).unwrap();
        assert_eq!(outcome.class, ChurnClass::Churn);
        assert_eq!(outcome.probability_text(), "0.66");
        assert_eq!(outcome.probability_percent(), 65);
    }

    #[test]
    fn test_samples_reject_the_other_schema() {
        let err = load_model(&sample_model("model_reduced.json"), SchemaVariant::Full).unwrap_err();
        assert!(err.to_string().contains("missing columns"));

        let err = load_model(&sample_model("model.json"), SchemaVariant::Reduced).unwrap_err();
        assert!(err.to_string().contains("unexpected columns"));
    }
}

#[cfg(test)]
mod load_failure_tests {
    use super::*;

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().expect("tmpdir");
        let path = dir.path().join("model.json");

        let err = load_model(&path, SchemaVariant::Full).unwrap_err();
        assert!(matches!(err, ModelLoadError::Io { .. }));
        assert!(err.to_string().contains("model.json"));
    }

    #[test]
    fn test_corrupt_file() {
        let dir = tempfile::tempdir().expect("tmpdir");
        let path = dir.path().join("model.json");
        std::fs::write(&path, b"\x80\x04\x95 pickled bytes").expect("write");

        let err = load_model(&path, SchemaVariant::Full).unwrap_err();
        assert!(matches!(err, ModelLoadError::Parse { .. }));
    }

    #[test]
    fn test_inconsistent_artifact() {
        let dir = tempfile::tempdir().expect("tmpdir");
        let path = dir.path().join("model.json");
        std::fs::write(
            &path,
            r#"{
                "name": "broken",
                "input_columns": [
                    {"name": "tenure", "type": "integer"},
                    {"name": "MonthlyCharges", "type": "float"},
                    {"name": "TotalCharges", "type": "float"}
                ],
                "estimator": {
                    "kind": "logistic_regression",
                    "intercept": 0.0,
                    "numeric": [{"column": "Contract", "coef": 1.0}]
                }
            }"#,
        )
        .expect("write");

        let err = load_model(&path, SchemaVariant::Reduced).unwrap_err();
        assert!(matches!(err, ModelLoadError::Invalid(_)));
        assert!(err.to_string().contains("Contract"));
    }

    #[test]
    fn test_copied_artifact_loads_with_same_fingerprint() {
        let dir = tempfile::tempdir().expect("tmpdir");
        let path = dir.path().join("copy.json");
        std::fs::copy(sample_model("model_reduced.json"), &path).expect("copy");

        let original = load_model(&sample_model("model_reduced.json"), SchemaVariant::Reduced).unwrap();
        let copy = load_model(&path, SchemaVariant::Reduced).unwrap();
        assert_eq!(original.fingerprint, copy.fingerprint);
        assert_eq!(copy.source.as_deref(), Some(path.as_path()));
    }
}
