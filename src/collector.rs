//! Input collection for the churn form.
//!
//! Reads the current value of every declared field from a form submission or a
//! JSON body. Fields that were not supplied keep their defaults. Values outside
//! a control's range or choice list are rejected, never clamped.

use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;

use crate::schema::{FieldKind, FieldSpec, SchemaVariant};

/// A validated field value, before any record transform.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldInput {
    Integer(i64),
    Float(f64),
    /// One of the field's declared choices.
    Choice(&'static str),
}

impl fmt::Display for FieldInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldInput::Integer(v) => write!(f, "{}", v),
            FieldInput::Float(v) => write!(f, "{}", crate::schema::format_float(*v)),
            FieldInput::Choice(c) => f.write_str(c),
        }
    }
}

/// Reasons a submitted value is refused.
#[derive(Debug, Clone, PartialEq)]
pub enum InputError {
    /// The control was submitted empty.
    Empty { field: &'static str },
    /// Text that does not parse as a number.
    NotANumber { field: &'static str, value: String },
    /// A fractional value for a whole-number control.
    NotAnInteger { field: &'static str, value: String },
    /// A number outside the control's closed range.
    OutOfRange {
        field: &'static str,
        value: String,
        min: String,
        max: String,
    },
    /// A string that is not one of the declared choices.
    InvalidChoice {
        field: &'static str,
        value: String,
        choices: &'static [&'static str],
    },
    /// A JSON value of the wrong type (e.g. a number for a choice).
    WrongType {
        field: &'static str,
        expected: &'static str,
    },
}

impl InputError {
    pub fn field(&self) -> &'static str {
        match self {
            InputError::Empty { field }
            | InputError::NotANumber { field, .. }
            | InputError::NotAnInteger { field, .. }
            | InputError::OutOfRange { field, .. }
            | InputError::InvalidChoice { field, .. }
            | InputError::WrongType { field, .. } => field,
        }
    }
}

impl fmt::Display for InputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputError::Empty { field } => write!(f, "{} is required", field),
            InputError::NotANumber { field, value } => {
                write!(f, "{} must be a number, got '{}'", field, value)
            }
            InputError::NotAnInteger { field, value } => {
                write!(f, "{} must be a whole number, got '{}'", field, value)
            }
            InputError::OutOfRange {
                field,
                value,
                min,
                max,
            } => write!(
                f,
                "{} must be between {} and {}, got {}",
                field, min, max, value
            ),
            InputError::InvalidChoice {
                field,
                value,
                choices,
            } => write!(
                f,
                "{} must be one of [{}], got '{}'",
                field,
                choices.join(", "),
                value
            ),
            InputError::WrongType { field, expected } => {
                write!(f, "{} must be {}", field, expected)
            }
        }
    }
}

impl std::error::Error for InputError {}

/// Current values of every field of one schema.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectedInputs {
    schema: SchemaVariant,
    values: Vec<(&'static FieldSpec, FieldInput)>,
}

impl CollectedInputs {
    pub fn schema(&self) -> SchemaVariant {
        self.schema
    }

    /// Read accessor for a single field.
    pub fn get(&self, name: &str) -> Option<&FieldInput> {
        self.values
            .iter()
            .find(|(spec, _)| spec.name == name)
            .map(|(_, value)| value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static FieldSpec, &FieldInput)> + '_ {
        self.values.iter().map(|(spec, value)| (*spec, value))
    }
}

/// Raw value as it arrived on the wire.
enum RawValue<'a> {
    Text(&'a str),
    Json(&'a Value),
}

/// Gathers field values for one schema variant.
#[derive(Debug, Clone, Copy)]
pub struct InputCollector {
    schema: SchemaVariant,
}

impl InputCollector {
    pub fn new(schema: SchemaVariant) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> SchemaVariant {
        self.schema
    }

    /// Every field at its default value.
    pub fn defaults(&self) -> CollectedInputs {
        let values = self
            .schema
            .fields()
            .iter()
            .map(|spec| (spec, default_input(spec)))
            .collect();

        CollectedInputs {
            schema: self.schema,
            values,
        }
    }

    /// Collects values from a url-encoded form submission.
    pub fn collect_form(&self, raw: &HashMap<String, String>) -> Result<CollectedInputs, InputError> {
        self.collect_with(|name| raw.get(name).map(|s| RawValue::Text(s.as_str())))
    }

    /// Collects values from a JSON object. Numbers may be sent as JSON numbers
    /// or as strings; choices must be strings.
    pub fn collect_json(&self, raw: &Map<String, Value>) -> Result<CollectedInputs, InputError> {
        self.collect_with(|name| match raw.get(name) {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(RawValue::Text(s.as_str())),
            Some(other) => Some(RawValue::Json(other)),
        })
    }

    fn collect_with<'a, F>(&self, lookup: F) -> Result<CollectedInputs, InputError>
    where
        F: Fn(&str) -> Option<RawValue<'a>>,
    {
        let mut values = Vec::with_capacity(self.schema.fields().len());

        for spec in self.schema.fields() {
            let value = match lookup(spec.name) {
                None => default_input(spec),
                Some(raw) => parse_field(spec, raw)?,
            };
            values.push((spec, value));
        }

        Ok(CollectedInputs {
            schema: self.schema,
            values,
        })
    }
}

fn default_input(spec: &'static FieldSpec) -> FieldInput {
    match spec.kind {
        FieldKind::Integer { default, .. } => FieldInput::Integer(default),
        FieldKind::Float { default, .. } => FieldInput::Float(default),
        FieldKind::Choice { .. } | FieldKind::Flag => FieldInput::Choice(spec.choices()[0]),
    }
}

fn parse_field(spec: &'static FieldSpec, raw: RawValue<'_>) -> Result<FieldInput, InputError> {
    match spec.kind {
        FieldKind::Integer { min, max, .. } => {
            let value = match raw {
                RawValue::Text(text) => parse_integer_text(spec.name, text)?,
                RawValue::Json(Value::Number(n)) => match n.as_i64() {
                    Some(v) => v,
                    None => {
                        return Err(InputError::NotAnInteger {
                            field: spec.name,
                            value: n.to_string(),
                        })
                    }
                },
                RawValue::Json(_) => {
                    return Err(InputError::WrongType {
                        field: spec.name,
                        expected: "a whole number",
                    })
                }
            };

            if value < min || value > max {
                return Err(InputError::OutOfRange {
                    field: spec.name,
                    value: value.to_string(),
                    min: min.to_string(),
                    max: max.to_string(),
                });
            }
            Ok(FieldInput::Integer(value))
        }
        FieldKind::Float { min, max, .. } => {
            let value = match raw {
                RawValue::Text(text) => parse_float_text(spec.name, text)?,
                RawValue::Json(Value::Number(n)) => match n.as_f64() {
                    Some(v) => v,
                    None => {
                        return Err(InputError::NotANumber {
                            field: spec.name,
                            value: n.to_string(),
                        })
                    }
                },
                RawValue::Json(_) => {
                    return Err(InputError::WrongType {
                        field: spec.name,
                        expected: "a number",
                    })
                }
            };

            // NaN fails both comparisons, so test containment rather than exclusion.
            if !(value >= min && value <= max) {
                return Err(InputError::OutOfRange {
                    field: spec.name,
                    value: value.to_string(),
                    min: crate::schema::format_float(min),
                    max: crate::schema::format_float(max),
                });
            }
            Ok(FieldInput::Float(value))
        }
        FieldKind::Choice { .. } | FieldKind::Flag => {
            let text = match raw {
                RawValue::Text(text) => text,
                RawValue::Json(_) => {
                    return Err(InputError::WrongType {
                        field: spec.name,
                        expected: "a string",
                    })
                }
            };

            let choices = spec.choices();
            choices
                .iter()
                .copied()
                .find(|choice| *choice == text)
                .map(FieldInput::Choice)
                .ok_or_else(|| InputError::InvalidChoice {
                    field: spec.name,
                    value: text.to_string(),
                    choices,
                })
        }
    }
}

fn parse_integer_text(field: &'static str, text: &str) -> Result<i64, InputError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(InputError::Empty { field });
    }

    trimmed.parse::<i64>().map_err(|_| {
        if trimmed.parse::<f64>().is_ok() {
            InputError::NotAnInteger {
                field,
                value: trimmed.to_string(),
            }
        } else {
            InputError::NotANumber {
                field,
                value: trimmed.to_string(),
            }
        }
    })
}

fn parse_float_text(field: &'static str, text: &str) -> Result<f64, InputError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(InputError::Empty { field });
    }

    match trimmed.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(InputError::NotANumber {
            field,
            value: trimmed.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn form(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_missing_fields_keep_defaults() {
        let collector = InputCollector::new(SchemaVariant::Full);
        let inputs = collector.collect_form(&HashMap::new()).unwrap();

        assert_eq!(inputs, collector.defaults());
        assert_eq!(inputs.get("tenure"), Some(&FieldInput::Integer(12)));
        assert_eq!(inputs.get("MonthlyCharges"), Some(&FieldInput::Float(70.0)));
        assert_eq!(inputs.get("PaymentMethod"), Some(&FieldInput::Choice("Electronic check")));
    }

    #[test]
    fn test_empty_numeric_is_rejected() {
        let collector = InputCollector::new(SchemaVariant::Reduced);
        let err = collector.collect_form(&form(&[("tenure", " ")])).unwrap_err();
        assert_eq!(err, InputError::Empty { field: "tenure" });
    }

    #[test]
    fn test_fractional_tenure_is_rejected() {
        let collector = InputCollector::new(SchemaVariant::Reduced);
        let err = collector.collect_form(&form(&[("tenure", "12.5")])).unwrap_err();
        assert!(matches!(err, InputError::NotAnInteger { field: "tenure", .. }));
    }

    #[test]
    fn test_nan_is_rejected() {
        let collector = InputCollector::new(SchemaVariant::Reduced);
        let err = collector
            .collect_form(&form(&[("MonthlyCharges", "NaN")]))
            .unwrap_err();
        assert!(matches!(err, InputError::NotANumber { .. }));
    }

    #[test]
    fn test_choice_is_case_sensitive() {
        let collector = InputCollector::new(SchemaVariant::Full);
        let err = collector.collect_form(&form(&[("gender", "male")])).unwrap_err();
        assert_eq!(err.field(), "gender");
        assert!(err.to_string().contains("Male, Female"));
    }

    #[test]
    fn test_json_types() {
        let collector = InputCollector::new(SchemaVariant::Full);
        let body = json!({"tenure": 30, "TotalCharges": "1500.5", "Contract": "Two year"});
        let inputs = collector.collect_json(body.as_object().unwrap()).unwrap();

        assert_eq!(inputs.get("tenure"), Some(&FieldInput::Integer(30)));
        assert_eq!(inputs.get("TotalCharges"), Some(&FieldInput::Float(1500.5)));
        assert_eq!(inputs.get("Contract"), Some(&FieldInput::Choice("Two year")));

        let body = json!({"Partner": true});
        let err = collector.collect_json(body.as_object().unwrap()).unwrap_err();
        assert_eq!(
            err,
            InputError::WrongType {
                field: "Partner",
                expected: "a string"
            }
        );
    }

    #[test]
    fn test_json_float_for_integer_field() {
        let collector = InputCollector::new(SchemaVariant::Reduced);
        let body = json!({"tenure": 12.5});
        let err = collector.collect_json(body.as_object().unwrap()).unwrap_err();
        assert!(matches!(err, InputError::NotAnInteger { .. }));
    }
}
