use serde::{Deserialize, Serialize};

use super::catalog::TrialType;

/// Declared input kind for a form field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    Number,
    Select,
}

/// Option values arrive on the wire as JSON numbers or strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    Number(f64),
    Text(String),
}

impl OptionValue {
    /// Loose comparison against a raw form value, matching how the form
    /// round-trips numeric option values through string inputs.
    pub fn matches_raw(&self, raw: &str) -> bool {
        match self {
            OptionValue::Number(n) => raw.trim().parse::<f64>().map_or(false, |parsed| parsed == *n),
            OptionValue::Text(text) => text == raw,
        }
    }
}

/// One selectable option: either a bare label or an explicit value/label pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionSpec {
    Pair { value: OptionValue, label: String },
    Plain(String),
}

impl OptionSpec {
    pub fn label(&self) -> &str {
        match self {
            OptionSpec::Pair { label, .. } => label,
            OptionSpec::Plain(label) => label,
        }
    }
}

/// Ordered description of one data point in a trial's intake schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    pub label: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<OptionSpec>>,
}

fn number(name: &str, label: &str, min: f64, max: f64) -> FieldSpec {
    FieldSpec {
        name: name.to_string(),
        label: label.to_string(),
        field_type: FieldType::Number,
        required: true,
        min: Some(min),
        max: Some(max),
        step: None,
        options: None,
    }
}

fn decimal(name: &str, label: &str, min: f64, max: f64) -> FieldSpec {
    FieldSpec {
        step: Some(0.1),
        ..number(name, label, min, max)
    }
}

fn choice(name: &str, label: &str, labels: &[&str]) -> FieldSpec {
    FieldSpec {
        name: name.to_string(),
        label: label.to_string(),
        field_type: FieldType::Select,
        required: true,
        min: None,
        max: None,
        step: None,
        options: Some(
            labels
                .iter()
                .map(|label| OptionSpec::Plain((*label).to_string()))
                .collect(),
        ),
    }
}

fn coded_choice(name: &str, label: &str, pairs: &[(f64, &str)]) -> FieldSpec {
    FieldSpec {
        options: Some(
            pairs
                .iter()
                .map(|(value, label)| OptionSpec::Pair {
                    value: OptionValue::Number(*value),
                    label: (*label).to_string(),
                })
                .collect(),
        ),
        ..choice(name, label, &[])
    }
}

fn yes_no(name: &str, label: &str) -> FieldSpec {
    coded_choice(name, label, &[(0.0, "No"), (1.0, "Yes")])
}

/// Canonical, ordered field table for a trial type.
///
/// This is the single source of truth shared by the bundled evaluation
/// service, the CSV templates, and the test fixtures; clients still receive
/// it over the schema-fetch operation rather than reading it directly.
pub fn fields_for(trial: TrialType) -> Vec<FieldSpec> {
    match trial {
        TrialType::Hypertension => vec![
            number("age", "Age", 18.0, 100.0),
            choice("gender", "Gender", &["Male", "Female"]),
            decimal("bmi", "BMI", 10.0, 60.0),
            number("glucose", "Blood Glucose (mg/dL)", 50.0, 500.0),
            number("lifestyle_risk", "Lifestyle Risk (0-10)", 0.0, 10.0),
            number("stress_level", "Stress Level (0-10)", 0.0, 10.0),
            number("systolic_bp", "Systolic BP (mmHg)", 80.0, 240.0),
            number("diastolic_bp", "Diastolic BP (mmHg)", 40.0, 140.0),
            number("cholesterol_total", "Total Cholesterol (mg/dL)", 100.0, 400.0),
            number("comorbidities", "Comorbidities Count", 0.0, 10.0),
            choice("consent", "Consent", &["Yes", "No"]),
        ],
        TrialType::Arthritis => vec![
            number("age", "Age", 18.0, 100.0),
            decimal("years_since_diagnosis", "Years Since Diagnosis", 0.0, 80.0),
            number("tender_joint_count", "Tender Joint Count", 0.0, 100.0),
            number("swollen_joint_count", "Swollen Joint Count", 0.0, 100.0),
            number("crp_level", "CRP Level (mg/L)", 0.0, 300.0),
            number("patient_pain_score", "Pain Score (0-10)", 0.0, 10.0),
            number("egfr", "eGFR", 0.0, 200.0),
            yes_no("on_biologic_dmards", "On Biologic DMARDs"),
            yes_no("has_hepatitis", "Has Hepatitis"),
        ],
        TrialType::Migraine => vec![
            number("age", "Age", 18.0, 80.0),
            number("migraine_frequency", "Migraine Frequency (per month)", 0.0, 30.0),
            number("previous_medication_failures", "Previous Medication Failures", 0.0, 10.0),
            number("liver_enzyme_level", "Liver Enzyme Level", 0.0, 500.0),
            yes_no("has_aura", "Has Aura"),
            yes_no("chronic_kidney_disease", "Chronic Kidney Disease"),
            yes_no("on_anticoagulants", "On Anticoagulants"),
            yes_no("sleep_disorder", "Sleep Disorder"),
            yes_no("depression", "Depression"),
            number("caffeine_intake", "Caffeine Intake (cups/day)", 0.0, 20.0),
        ],
        TrialType::Phase1 => vec![
            number("age", "Age", 18.0, 80.0),
            coded_choice("sex", "Sex", &[(0.0, "Male"), (1.0, "Female")]),
            decimal("weight_kg", "Weight (kg)", 30.0, 250.0),
            decimal("height_cm", "Height (cm)", 120.0, 220.0),
            decimal("bmi", "BMI", 10.0, 60.0),
            number("cohort", "Cohort", 1.0, 10.0),
            number("alt", "ALT", 0.0, 500.0),
            number("creatinine", "Creatinine (mg/dL)", 0.0, 20.0),
            number("sbp", "SBP (mmHg)", 80.0, 240.0),
            number("dbp", "DBP (mmHg)", 40.0, 140.0),
            number("hr", "Heart Rate (bpm)", 30.0, 220.0),
            decimal("temp_c", "Temperature (°C)", 30.0, 45.0),
            yes_no("adverse_event", "Adverse Event"),
        ],
    }
}

/// Ticket identifying one schema request; only the newest ticket may apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchemaTicket {
    trial: TrialType,
    generation: u64,
}

impl SchemaTicket {
    pub fn trial(&self) -> TrialType {
        self.trial
    }
}

/// How a late-arriving response was reconciled against the current selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseDisposition {
    Applied,
    Discarded,
}

/// Holds the single active schema slot and the request-generation counter
/// that makes last-selection-wins deterministic rather than timing-dependent.
#[derive(Debug, Default)]
pub struct SchemaResolver {
    generation: u64,
    active: Option<(TrialType, Vec<FieldSpec>)>,
}

impl SchemaResolver {
    /// Start a new schema request, superseding any request still in flight.
    pub fn begin(&mut self, trial: TrialType) -> SchemaTicket {
        self.generation += 1;
        self.active = None;
        SchemaTicket {
            trial,
            generation: self.generation,
        }
    }

    pub fn is_current(&self, ticket: SchemaTicket) -> bool {
        ticket.generation == self.generation
    }

    /// Install a response's schema unless the ticket was superseded.
    pub fn apply(&mut self, ticket: SchemaTicket, fields: Vec<FieldSpec>) -> ResponseDisposition {
        if !self.is_current(ticket) {
            tracing::debug!(trial = %ticket.trial, "discarding superseded schema response");
            return ResponseDisposition::Discarded;
        }
        self.active = Some((ticket.trial, fields));
        ResponseDisposition::Applied
    }

    /// Drop the active schema and orphan any in-flight request.
    pub fn invalidate(&mut self) {
        self.generation += 1;
        self.active = None;
    }

    pub fn trial(&self) -> Option<TrialType> {
        self.active.as_ref().map(|(trial, _)| *trial)
    }

    pub fn schema(&self) -> Option<&[FieldSpec]> {
        self.active.as_ref().map(|(_, fields)| fields.as_slice())
    }
}
