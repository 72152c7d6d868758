//! Declared input schema for the churn form.
//!
//! Two schema variants are supported. The `Full` variant carries the complete
//! customer profile (19 fields); `Reduced` keeps only the three billing numbers.
//! Field order here is the column order of the assembled record.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

/// Choices for every Yes/No control.
pub const YES_NO: &[&str] = &["Yes", "No"];

const YES_NO_INTERNET: &[&str] = &["Yes", "No", "No internet service"];

/// Which field table is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SchemaVariant {
    /// Full 19-field customer profile.
    Full,
    /// Tenure and charges only.
    Reduced,
}

impl SchemaVariant {
    /// Returns the declared fields, in record order.
    pub fn fields(self) -> &'static [FieldSpec] {
        match self {
            SchemaVariant::Full => FULL_FIELDS,
            SchemaVariant::Reduced => REDUCED_FIELDS,
        }
    }

    /// Looks up a single field by its record name.
    pub fn field(self, name: &str) -> Option<&'static FieldSpec> {
        self.fields().iter().find(|f| f.name == name)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SchemaVariant::Full => "full",
            SchemaVariant::Reduced => "reduced",
        }
    }
}

impl fmt::Display for SchemaVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SchemaVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "full" => Ok(SchemaVariant::Full),
            "reduced" => Ok(SchemaVariant::Reduced),
            other => Err(format!(
                "unknown schema variant '{}' (expected 'full' or 'reduced')",
                other
            )),
        }
    }
}

/// Value type of a record column, as the model sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Integer,
    Float,
    String,
}

impl ColumnType {
    pub fn is_numeric(self) -> bool {
        matches!(self, ColumnType::Integer | ColumnType::Float)
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColumnType::Integer => "integer",
            ColumnType::Float => "float",
            ColumnType::String => "string",
        };
        f.write_str(name)
    }
}

/// Form section a field is rendered in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    CustomerInformation,
    EntertainmentBilling,
}

impl Section {
    pub const ALL: [Section; 2] = [Section::CustomerInformation, Section::EntertainmentBilling];

    pub fn title(self) -> &'static str {
        match self {
            Section::CustomerInformation => "Customer Information",
            Section::EntertainmentBilling => "Entertainment & Billing",
        }
    }
}

/// Control kind and its constraints.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldKind {
    /// Whole number within a closed range.
    Integer { min: i64, max: i64, default: i64 },
    /// Decimal number within a closed range.
    Float { min: f64, max: f64, default: f64 },
    /// One of a fixed, ordered set of strings. The first entry is the default.
    Choice { choices: &'static [&'static str] },
    /// Yes/No control stored in the record as 1/0.
    Flag,
}

/// One labeled control of the form.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldSpec {
    /// Record column name.
    pub name: &'static str,
    /// Human readable label.
    pub label: &'static str,
    pub section: Section,
    pub kind: FieldKind,
}

impl FieldSpec {
    /// The allowed choices for categorical controls; empty for numbers.
    pub fn choices(&self) -> &'static [&'static str] {
        match self.kind {
            FieldKind::Choice { choices } => choices,
            FieldKind::Flag => YES_NO,
            FieldKind::Integer { .. } | FieldKind::Float { .. } => &[],
        }
    }

    /// Column type of the value that lands in the record.
    pub fn column_type(&self) -> ColumnType {
        match self.kind {
            FieldKind::Integer { .. } | FieldKind::Flag => ColumnType::Integer,
            FieldKind::Float { .. } => ColumnType::Float,
            FieldKind::Choice { .. } => ColumnType::String,
        }
    }

    /// Default value rendered the way a form control shows it.
    pub fn default_text(&self) -> String {
        match self.kind {
            FieldKind::Integer { default, .. } => default.to_string(),
            FieldKind::Float { default, .. } => format_float(default),
            FieldKind::Choice { choices } => choices[0].to_string(),
            FieldKind::Flag => YES_NO[0].to_string(),
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self.kind, FieldKind::Integer { .. } | FieldKind::Float { .. })
    }
}

/// Formats a float so whole numbers keep one decimal place ("70.0").
pub fn format_float(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{:.1}", value)
    } else {
        value.to_string()
    }
}

const TENURE: FieldSpec = FieldSpec {
    name: "tenure",
    label: "Tenure (months)",
    section: Section::CustomerInformation,
    kind: FieldKind::Integer {
        min: 0,
        max: 100,
        default: 12,
    },
};

const MONTHLY_CHARGES: FieldSpec = FieldSpec {
    name: "MonthlyCharges",
    label: "Monthly Charges",
    section: Section::EntertainmentBilling,
    kind: FieldKind::Float {
        min: 0.0,
        max: 200.0,
        default: 70.0,
    },
};

const TOTAL_CHARGES: FieldSpec = FieldSpec {
    name: "TotalCharges",
    label: "Total Charges",
    section: Section::EntertainmentBilling,
    kind: FieldKind::Float {
        min: 0.0,
        max: 10000.0,
        default: 800.0,
    },
};

const fn choice(
    name: &'static str,
    label: &'static str,
    section: Section,
    choices: &'static [&'static str],
) -> FieldSpec {
    FieldSpec {
        name,
        label,
        section,
        kind: FieldKind::Choice { choices },
    }
}

static FULL_FIELDS: &[FieldSpec] = &[
    TENURE,
    MONTHLY_CHARGES,
    TOTAL_CHARGES,
    choice("gender", "Gender", Section::CustomerInformation, &["Male", "Female"]),
    FieldSpec {
        name: "SeniorCitizen",
        label: "Senior Citizen",
        section: Section::CustomerInformation,
        kind: FieldKind::Flag,
    },
    choice("Partner", "Partner", Section::CustomerInformation, YES_NO),
    choice("Dependents", "Dependents", Section::CustomerInformation, YES_NO),
    choice("PhoneService", "Phone Service", Section::CustomerInformation, YES_NO),
    choice(
        "MultipleLines",
        "Multiple Lines",
        Section::CustomerInformation,
        &["Yes", "No", "No phone service"],
    ),
    choice(
        "InternetService",
        "Internet Service",
        Section::CustomerInformation,
        &["DSL", "Fiber optic", "No"],
    ),
    choice(
        "OnlineSecurity",
        "Online Security",
        Section::CustomerInformation,
        YES_NO_INTERNET,
    ),
    choice(
        "OnlineBackup",
        "Online Backup",
        Section::CustomerInformation,
        YES_NO_INTERNET,
    ),
    choice(
        "DeviceProtection",
        "Device Protection",
        Section::CustomerInformation,
        YES_NO_INTERNET,
    ),
    choice(
        "TechSupport",
        "Tech Support",
        Section::CustomerInformation,
        YES_NO_INTERNET,
    ),
    choice(
        "StreamingTV",
        "Streaming TV",
        Section::EntertainmentBilling,
        YES_NO_INTERNET,
    ),
    choice(
        "StreamingMovies",
        "Streaming Movies",
        Section::EntertainmentBilling,
        YES_NO_INTERNET,
    ),
    choice(
        "Contract",
        "Contract",
        Section::EntertainmentBilling,
        &["Month-to-month", "One year", "Two year"],
    ),
    choice(
        "PaperlessBilling",
        "Paperless Billing",
        Section::EntertainmentBilling,
        YES_NO,
    ),
    choice(
        "PaymentMethod",
        "Payment Method",
        Section::EntertainmentBilling,
        &[
            "Electronic check",
            "Mailed check",
            "Bank transfer (automatic)",
            "Credit card (automatic)",
        ],
    ),
];

static REDUCED_FIELDS: &[FieldSpec] = &[TENURE, MONTHLY_CHARGES, TOTAL_CHARGES];
