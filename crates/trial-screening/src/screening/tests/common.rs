use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::screening::catalog::TrialType;
use crate::screening::coerce::SubmittedRecord;
use crate::screening::gateway::{
    AnalyticsSummary, BulkFile, BulkResultSet, BulkRowOutcome, Eligibility, EligibilityOutcome,
    GatewayError, RowEligibility, SubmissionGateway,
};
use crate::screening::schema::{fields_for, FieldSpec};
use crate::screening::session::SessionContext;
use crate::screening::single::{SingleApplicationController, SinglePhase};

/// Scripted gateway: queued responses are served in order, and every call is
/// counted so tests can assert that no request crossed the boundary.
#[derive(Default)]
pub(super) struct FakeGateway {
    schema_responses: Mutex<VecDeque<Result<Vec<FieldSpec>, GatewayError>>>,
    apply_responses: Mutex<VecDeque<Result<EligibilityOutcome, GatewayError>>>,
    cohort_responses: Mutex<VecDeque<Result<BulkResultSet, GatewayError>>>,
    pub(super) schema_calls: AtomicUsize,
    pub(super) apply_calls: AtomicUsize,
    pub(super) cohort_calls: AtomicUsize,
    pub(super) last_username: Mutex<Option<String>>,
    pub(super) last_record: Mutex<Option<SubmittedRecord>>,
}

impl FakeGateway {
    pub(super) fn push_schema(&self, response: Result<Vec<FieldSpec>, GatewayError>) {
        self.schema_responses
            .lock()
            .expect("fake gateway mutex poisoned")
            .push_back(response);
    }

    pub(super) fn push_apply(&self, response: Result<EligibilityOutcome, GatewayError>) {
        self.apply_responses
            .lock()
            .expect("fake gateway mutex poisoned")
            .push_back(response);
    }

    pub(super) fn push_cohort(&self, response: Result<BulkResultSet, GatewayError>) {
        self.cohort_responses
            .lock()
            .expect("fake gateway mutex poisoned")
            .push_back(response);
    }
}

#[async_trait]
impl SubmissionGateway for FakeGateway {
    async fn fetch_schema(&self, trial: TrialType) -> Result<Vec<FieldSpec>, GatewayError> {
        self.schema_calls.fetch_add(1, Ordering::SeqCst);
        self.schema_responses
            .lock()
            .expect("fake gateway mutex poisoned")
            .pop_front()
            .unwrap_or_else(|| Ok(fields_for(trial)))
    }

    async fn submit_application(
        &self,
        trial: TrialType,
        record: &SubmittedRecord,
        session: &SessionContext,
    ) -> Result<EligibilityOutcome, GatewayError> {
        self.apply_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_username.lock().expect("fake gateway mutex poisoned") =
            session.username.clone();
        *self.last_record.lock().expect("fake gateway mutex poisoned") = Some(record.clone());
        self.apply_responses
            .lock()
            .expect("fake gateway mutex poisoned")
            .pop_front()
            .unwrap_or_else(|| Ok(eligible_outcome(trial)))
    }

    async fn submit_cohort(
        &self,
        trial: TrialType,
        _file: &BulkFile,
    ) -> Result<BulkResultSet, GatewayError> {
        self.cohort_calls.fetch_add(1, Ordering::SeqCst);
        self.cohort_responses
            .lock()
            .expect("fake gateway mutex poisoned")
            .pop_front()
            .unwrap_or_else(|| Ok(cohort_results(trial, 3, 2, 1, 0)))
    }

    async fn fetch_analytics(&self) -> Result<AnalyticsSummary, GatewayError> {
        Ok(AnalyticsSummary {
            summary: Vec::new(),
            last_updated: chrono::Utc::now(),
        })
    }
}

pub(super) fn eligible_outcome(trial: TrialType) -> EligibilityOutcome {
    EligibilityOutcome {
        patient_id: 17,
        trial_type: trial,
        eligibility: Eligibility::Eligible,
        message: "Application submitted successfully. You are eligible.".to_string(),
    }
}

pub(super) fn cohort_results(
    _trial: TrialType,
    eligible: u32,
    ineligible: u32,
    errors: u32,
    extra_rows: u32,
) -> BulkResultSet {
    let total = eligible + ineligible + errors + extra_rows;
    let results = (1..=total)
        .map(|row| BulkRowOutcome {
            row,
            patient_id: Some(i64::from(row)),
            eligibility: if row <= eligible {
                RowEligibility::Eligible
            } else if row <= eligible + ineligible {
                RowEligibility::Ineligible
            } else {
                RowEligibility::Error
            },
            error: None,
        })
        .collect();
    BulkResultSet {
        total_processed: total,
        eligible,
        ineligible,
        errors: errors + extra_rows,
        results,
    }
}

pub(super) fn unavailable() -> GatewayError {
    GatewayError::Transport("connection refused".to_string())
}

pub(super) fn csv_file(name: &str, content: &str) -> BulkFile {
    BulkFile::new(name, Some("text/csv".to_string()), content.as_bytes().to_vec())
}

/// Controller already sitting in `Ready` with the hypertension schema.
pub(super) async fn ready_hypertension_controller(
    gateway: &FakeGateway,
) -> SingleApplicationController {
    let mut controller = SingleApplicationController::new(SessionContext::anonymous());
    let phase = controller
        .select_and_load(gateway, TrialType::Hypertension)
        .await
        .expect("selection is valid from the initial phase");
    assert_eq!(phase, SinglePhase::Ready);
    controller
}

/// In-range values for every hypertension field.
pub(super) fn fill_valid_hypertension(controller: &mut SingleApplicationController) {
    let values = [
        ("age", "45"),
        ("gender", "Male"),
        ("bmi", "26.5"),
        ("glucose", "95"),
        ("lifestyle_risk", "1"),
        ("stress_level", "7"),
        ("systolic_bp", "140"),
        ("diastolic_bp", "85"),
        ("cholesterol_total", "220"),
        ("comorbidities", "1"),
        ("consent", "Yes"),
    ];
    for (name, value) in values {
        controller
            .edit_field(name, value)
            .expect("field exists in the hypertension schema");
    }
}
