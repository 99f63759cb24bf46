//! Dynamic-schema intake and validation pipeline for clinical-trial
//! eligibility screening.
//!
//! Two independent entry points share the same building blocks: the
//! single-applicant controller walks one person through a trial-specific
//! form, and the bulk controller pushes a whole cohort file through the
//! evaluation service. Both validate locally before anything crosses the
//! network boundary, and both reconcile late or superseded responses with
//! explicit generation tickets instead of arrival timing.

pub mod bulk;
pub mod catalog;
pub mod coerce;
pub mod draft;
pub mod gateway;
pub mod schema;
pub mod session;
pub mod single;
pub mod template;
pub mod validate;

#[cfg(test)]
mod tests;

pub use bulk::{
    gate_file, BulkIntakeController, BulkIntakeError, BulkPhase, FileGateError, UploadAttempt,
    UploadDisposition, UploadTicket, MAX_UPLOAD_BYTES,
};
pub use catalog::{TrialMetadata, TrialType, UnknownTrialType};
pub use coerce::{coerce, SubmittedRecord, SubmittedValue};
pub use draft::{ApplicationDraft, UnknownDraftField};
pub use gateway::{
    AnalyticsSummary, BulkFile, BulkResultSet, BulkRowOutcome, Eligibility, EligibilityOutcome,
    GatewayError, HttpGateway, RowEligibility, SubmissionGateway, TrialAnalytics,
};
pub use schema::{
    fields_for, FieldSpec, FieldType, OptionSpec, OptionValue, ResponseDisposition, SchemaResolver,
    SchemaTicket,
};
pub use session::{SessionContext, SessionRole};
pub use single::{
    IntakeStateError, PreparedSubmission, SingleApplicationController, SinglePhase,
    SubmissionDisposition, SubmitAttempt, SubmitBlocked, SubmitTicket,
};
pub use template::{template_columns, template_csv, template_file_name};
pub use validate::{validate, ValidationReport, Violation, ViolationReason};
