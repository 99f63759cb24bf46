use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use metrics_exporter_prometheus::PrometheusHandle;
use trial_screening::screening::{
    fields_for, validate, AnalyticsSummary, ApplicationDraft, BulkFile, BulkResultSet,
    BulkRowOutcome, Eligibility, EligibilityOutcome, FieldSpec, FieldType, GatewayError,
    RowEligibility, SessionContext, SubmissionGateway, SubmittedRecord, SubmittedValue,
    TrialAnalytics, TrialType,
};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Debug, Default, Clone, Copy)]
struct Tally {
    eligible: u64,
    ineligible: u64,
}

/// Stub evaluation service: schemas come from the canonical field tables,
/// verdicts from a deterministic stand-in for the production models, and
/// patient ids from a process-wide sequence. Outcomes are tallied so the
/// analytics endpoint has something truthful to report.
pub struct ScreeningServiceState {
    patient_sequence: AtomicI64,
    tallies: Mutex<BTreeMap<TrialType, Tally>>,
}

impl Default for ScreeningServiceState {
    fn default() -> Self {
        Self {
            patient_sequence: AtomicI64::new(1),
            tallies: Mutex::new(BTreeMap::new()),
        }
    }
}

impl ScreeningServiceState {
    fn next_patient_id(&self) -> i64 {
        self.patient_sequence.fetch_add(1, Ordering::Relaxed)
    }

    fn record_outcome(&self, trial: TrialType, eligibility: Eligibility) {
        let mut tallies = self.tallies.lock().expect("tally mutex poisoned");
        let tally = tallies.entry(trial).or_default();
        match eligibility {
            Eligibility::Eligible => tally.eligible += 1,
            Eligibility::Ineligible => tally.ineligible += 1,
        }
    }

    pub fn analytics(&self) -> AnalyticsSummary {
        let tallies = self.tallies.lock().expect("tally mutex poisoned");
        let summary = TrialType::ALL
            .iter()
            .filter_map(|trial| {
                tallies.get(trial).map(|tally| TrialAnalytics {
                    trial_type: *trial,
                    total_applications: tally.eligible + tally.ineligible,
                    eligible: tally.eligible,
                    ineligible: tally.ineligible,
                })
            })
            .collect();
        AnalyticsSummary {
            summary,
            last_updated: chrono::Utc::now(),
        }
    }

    /// Evaluate one applicant. Validation failures are returned as the
    /// per-field messages the API surfaces under `details`.
    pub fn evaluate_application(
        &self,
        trial: TrialType,
        features: &BTreeMap<String, String>,
    ) -> Result<EligibilityOutcome, Vec<String>> {
        let schema = fields_for(trial);
        let mut draft = ApplicationDraft::for_schema(&schema);
        for field in &schema {
            if let Some(value) = features.get(&field.name) {
                draft
                    .set(&field.name, value.clone())
                    .expect("draft was built from this schema");
            }
        }

        let report = validate(&schema, &draft);
        if !report.is_clean() {
            return Err(report
                .violations()
                .iter()
                .map(|violation| violation.message())
                .collect());
        }

        let eligibility = predict_eligibility(trial, features);
        self.record_outcome(trial, eligibility);
        Ok(EligibilityOutcome {
            patient_id: self.next_patient_id(),
            trial_type: trial,
            eligibility,
            message: format!(
                "Application submitted successfully. You are {}.",
                eligibility.label().to_lowercase()
            ),
        })
    }

    /// Evaluate a whole cohort file. Malformed rows become `Error` entries
    /// without sinking the job; the per-row list is capped at 100 while the
    /// counts cover every row.
    pub fn process_cohort(&self, trial: TrialType, bytes: &[u8]) -> Result<BulkResultSet, String> {
        let schema = fields_for(trial);
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(bytes);
        let headers = reader
            .headers()
            .map_err(|err| format!("could not read CSV header: {err}"))?
            .clone();

        let mut results: Vec<BulkRowOutcome> = Vec::new();
        let mut eligible = 0u32;
        let mut ineligible = 0u32;
        let mut errors = 0u32;

        for (index, record) in reader.records().enumerate() {
            let row = index as u32 + 1;
            let outcome = record
                .map_err(|err| format!("could not parse row: {err}"))
                .and_then(|record| row_features(&schema, &headers, &record));

            match outcome {
                Ok(features) => {
                    let eligibility = predict_eligibility(trial, &features);
                    self.record_outcome(trial, eligibility);
                    match eligibility {
                        Eligibility::Eligible => eligible += 1,
                        Eligibility::Ineligible => ineligible += 1,
                    }
                    results.push(BulkRowOutcome {
                        row,
                        patient_id: Some(self.next_patient_id()),
                        eligibility: match eligibility {
                            Eligibility::Eligible => RowEligibility::Eligible,
                            Eligibility::Ineligible => RowEligibility::Ineligible,
                        },
                        error: None,
                    });
                }
                Err(message) => {
                    errors += 1;
                    results.push(BulkRowOutcome {
                        row,
                        patient_id: None,
                        eligibility: RowEligibility::Error,
                        error: Some(message),
                    });
                }
            }
        }

        let total_processed = eligible + ineligible + errors;
        results.truncate(BulkResultSet::DISPLAY_ROW_CAP);
        Ok(BulkResultSet {
            total_processed,
            eligible,
            ineligible,
            errors,
            results,
        })
    }
}

/// Pull one row's cells into a name → value map; blank number cells default
/// to 0, everything else to the empty string.
fn row_features(
    schema: &[FieldSpec],
    headers: &csv::StringRecord,
    record: &csv::StringRecord,
) -> Result<BTreeMap<String, String>, String> {
    let mut features = BTreeMap::new();
    for field in schema {
        let position = headers
            .iter()
            .position(|header| header == field.name)
            .ok_or_else(|| format!("Missing required field: {}", field.name))?;
        let cell = record.get(position).unwrap_or("").trim();

        let value = if cell.is_empty() {
            match field.field_type {
                FieldType::Number => "0".to_string(),
                _ => String::new(),
            }
        } else {
            if field.field_type == FieldType::Number && cell.parse::<f64>().is_err() {
                return Err(format!("could not convert string to float: '{cell}'"));
            }
            cell.to_string()
        };
        features.insert(field.name.clone(), value);
    }
    Ok(features)
}

/// Deterministic stand-in for the production eligibility models, so demos
/// and tests are stable. The real computation is out of scope.
fn predict_eligibility(trial: TrialType, features: &BTreeMap<String, String>) -> Eligibility {
    let num = |name: &str| -> f64 {
        features
            .get(name)
            .and_then(|value| value.trim().parse::<f64>().ok())
            .unwrap_or(0.0)
    };
    let flag = |name: &str| num(name) >= 1.0;

    let eligible = match trial {
        TrialType::Hypertension => {
            let consented = features
                .get("consent")
                .map_or(false, |value| value.eq_ignore_ascii_case("yes"));
            consented
                && (num("systolic_bp") >= 130.0 || num("diastolic_bp") >= 85.0)
                && num("comorbidities") <= 3.0
        }
        TrialType::Arthritis => {
            num("tender_joint_count") + num("swollen_joint_count") >= 6.0
                && !flag("has_hepatitis")
                && num("egfr") >= 30.0
        }
        TrialType::Migraine => {
            num("migraine_frequency") >= 4.0
                && !flag("chronic_kidney_disease")
                && !flag("on_anticoagulants")
        }
        TrialType::Phase1 => {
            let age = num("age");
            (18.0..=55.0).contains(&age)
                && !flag("adverse_event")
                && num("alt") <= 100.0
                && num("creatinine") <= 2.0
        }
    };

    if eligible {
        Eligibility::Eligible
    } else {
        Eligibility::Ineligible
    }
}

/// Render a submitted value the way a form input would carry it.
pub(crate) fn submitted_value_to_string(value: &SubmittedValue) -> String {
    match value {
        SubmittedValue::Number(n) if n.fract() == 0.0 && n.is_finite() && n.abs() < 1e15 => {
            format!("{}", *n as i64)
        }
        SubmittedValue::Number(n) => n.to_string(),
        SubmittedValue::Text(text) => text.clone(),
    }
}

/// In-process gateway over the stub service, used by the offline demo.
pub struct LocalEvaluationGateway {
    state: Arc<ScreeningServiceState>,
}

impl LocalEvaluationGateway {
    pub fn new(state: Arc<ScreeningServiceState>) -> Self {
        Self { state }
    }
}

#[async_trait]
impl SubmissionGateway for LocalEvaluationGateway {
    async fn fetch_schema(&self, trial: TrialType) -> Result<Vec<FieldSpec>, GatewayError> {
        Ok(fields_for(trial))
    }

    async fn submit_application(
        &self,
        trial: TrialType,
        record: &SubmittedRecord,
        _session: &SessionContext,
    ) -> Result<EligibilityOutcome, GatewayError> {
        let features = record
            .iter()
            .map(|(name, value)| (name.clone(), submitted_value_to_string(value)))
            .collect();
        self.state
            .evaluate_application(trial, &features)
            .map_err(|details| GatewayError::Service {
                status: 400,
                message: format!("Validation failed: {}", details.join("; ")),
            })
    }

    async fn submit_cohort(
        &self,
        trial: TrialType,
        file: &BulkFile,
    ) -> Result<BulkResultSet, GatewayError> {
        self.state
            .process_cohort(trial, &file.bytes)
            .map_err(|message| GatewayError::Service {
                status: 400,
                message,
            })
    }

    async fn fetch_analytics(&self) -> Result<AnalyticsSummary, GatewayError> {
        Ok(self.state.analytics())
    }
}
