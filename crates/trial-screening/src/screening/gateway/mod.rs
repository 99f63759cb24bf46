mod http;

pub use http::HttpGateway;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::catalog::TrialType;
use super::coerce::SubmittedRecord;
use super::schema::FieldSpec;
use super::session::SessionContext;

/// Verdict the evaluation service returns for one applicant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Eligibility {
    Eligible,
    Ineligible,
}

impl Eligibility {
    pub const fn label(self) -> &'static str {
        match self {
            Eligibility::Eligible => "Eligible",
            Eligibility::Ineligible => "Ineligible",
        }
    }
}

/// Outcome of one single-applicant evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EligibilityOutcome {
    pub patient_id: i64,
    pub trial_type: TrialType,
    pub eligibility: Eligibility,
    pub message: String,
}

/// Per-row verdict inside a bulk result; error rows carry a message and
/// never sink the job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RowEligibility {
    Eligible,
    Ineligible,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkRowOutcome {
    pub row: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_id: Option<i64>,
    pub eligibility: RowEligibility,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Tabulated outcome of a cohort upload. The counts always cover the full
/// job; `results` is capped for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkResultSet {
    pub total_processed: u32,
    pub eligible: u32,
    pub ineligible: u32,
    pub errors: u32,
    pub results: Vec<BulkRowOutcome>,
}

impl BulkResultSet {
    /// At most this many per-row entries are kept for display.
    pub const DISPLAY_ROW_CAP: usize = 100;

    pub fn truncate_for_display(&mut self) {
        self.results.truncate(Self::DISPLAY_ROW_CAP);
    }
}

/// Cohort file handed to the bulk entry point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkFile {
    pub name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl BulkFile {
    pub fn new(name: impl Into<String>, content_type: Option<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            content_type,
            bytes,
        }
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// Lowercased extension including the dot, when the name has one.
    pub fn extension(&self) -> Option<String> {
        self.name
            .rfind('.')
            .map(|idx| self.name[idx..].to_ascii_lowercase())
    }
}

/// Per-trial aggregate row for dashboards (boundary only, outside the core).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialAnalytics {
    pub trial_type: TrialType,
    pub total_applications: u64,
    pub eligible: u64,
    pub ineligible: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsSummary {
    pub summary: Vec<TrialAnalytics>,
    pub last_updated: DateTime<Utc>,
}

/// Failures crossing the network boundary.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("evaluation service rejected the request ({status}): {message}")]
    Service { status: u16, message: String },
    #[error("could not reach the evaluation service: {0}")]
    Transport(String),
    #[error("evaluation service returned an unreadable payload: {0}")]
    Decode(String),
}

/// Network boundary shared by both controllers.
///
/// Each operation is a single asynchronous call with no implicit retry. The
/// schema fetch is idempotent; the two submission operations are not, so the
/// controllers' single-flight discipline is the only protection against
/// duplicate evaluation records.
#[async_trait]
pub trait SubmissionGateway: Send + Sync {
    /// Fetch the ordered field schema for a trial type.
    async fn fetch_schema(&self, trial: TrialType) -> Result<Vec<FieldSpec>, GatewayError>;

    /// Submit one coerced applicant record for evaluation.
    async fn submit_application(
        &self,
        trial: TrialType,
        record: &SubmittedRecord,
        session: &SessionContext,
    ) -> Result<EligibilityOutcome, GatewayError>;

    /// Submit a cohort file; the service evaluates every row synchronously.
    async fn submit_cohort(
        &self,
        trial: TrialType,
        file: &BulkFile,
    ) -> Result<BulkResultSet, GatewayError>;

    /// Fetch aggregate per-trial counts for dashboards.
    async fn fetch_analytics(&self) -> Result<AnalyticsSummary, GatewayError>;
}
