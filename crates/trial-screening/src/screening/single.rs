use super::catalog::TrialType;
use super::coerce::{coerce, SubmittedRecord};
use super::draft::ApplicationDraft;
use super::gateway::{EligibilityOutcome, GatewayError, SubmissionGateway};
use super::schema::{FieldSpec, ResponseDisposition, SchemaResolver, SchemaTicket};
use super::session::SessionContext;
use super::validate::{validate, ValidationReport};

/// Where the single-applicant state machine currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinglePhase {
    NoTrialSelected,
    SchemaLoading,
    Ready,
    Submitting,
    ResultShown,
    Failed,
}

/// Misuse of the state machine; distinct from errors the machine absorbs
/// into its own `Failed` phase.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IntakeStateError {
    #[error("a submission is already in flight")]
    SubmissionInFlight,
    #[error("no editable form is active (phase {phase:?})")]
    NotEditing { phase: SinglePhase },
    #[error("nothing to submit (phase {phase:?})")]
    NotReady { phase: SinglePhase },
    #[error("field {0:?} is not part of the active schema")]
    UnknownField(String),
}

/// Ticket identifying one submission attempt; a reset orphans it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmitTicket(u64);

/// A validated, coerced record ready to cross the network boundary.
#[derive(Debug)]
pub struct PreparedSubmission {
    pub ticket: SubmitTicket,
    pub trial: TrialType,
    pub record: SubmittedRecord,
}

/// Why a submit attempt did not produce a prepared submission.
#[derive(Debug)]
pub enum SubmitBlocked {
    /// Single-flight guard: an attempt while one is pending is a no-op.
    AlreadyInFlight,
    NotReady { phase: SinglePhase },
    Validation(ValidationReport),
}

/// What one complete submit attempt amounted to.
#[derive(Debug)]
pub enum SubmitAttempt {
    Accepted(EligibilityOutcome),
    Rejected(ValidationReport),
    Failed(GatewayError),
    AlreadyInFlight,
    /// The controller was reset while the call was pending; the response
    /// was ignored.
    Discarded,
}

/// How a submission response was reconciled against the machine.
#[derive(Debug)]
pub enum SubmissionDisposition {
    Accepted(EligibilityOutcome),
    Failed(GatewayError),
    Discarded,
}

/// State machine coordinating trial selection, schema loading, field
/// editing, validation, submission, and result display for one applicant.
///
/// Transitions are split into synchronous steps that hand out generation
/// tickets and async drivers that combine them with a gateway call, so stale
/// responses are discarded deterministically rather than by arrival timing.
pub struct SingleApplicationController {
    session: SessionContext,
    phase: SinglePhase,
    resolver: SchemaResolver,
    draft: ApplicationDraft,
    outcome: Option<EligibilityOutcome>,
    notice: Option<String>,
    submit_generation: u64,
}

impl SingleApplicationController {
    pub fn new(session: SessionContext) -> Self {
        Self {
            session,
            phase: SinglePhase::NoTrialSelected,
            resolver: SchemaResolver::default(),
            draft: ApplicationDraft::default(),
            outcome: None,
            notice: None,
            submit_generation: 0,
        }
    }

    pub fn phase(&self) -> SinglePhase {
        self.phase
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    pub fn trial(&self) -> Option<TrialType> {
        self.resolver.trial()
    }

    pub fn schema(&self) -> Option<&[FieldSpec]> {
        self.resolver.schema()
    }

    pub fn draft(&self) -> &ApplicationDraft {
        &self.draft
    }

    pub fn outcome(&self) -> Option<&EligibilityOutcome> {
        self.outcome.as_ref()
    }

    /// Pending user-facing notice from the most recent failed attempt.
    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    /// Select a trial type, discarding any prior draft and result and
    /// superseding a schema load still in flight.
    pub fn select_trial(&mut self, trial: TrialType) -> Result<SchemaTicket, IntakeStateError> {
        if self.phase == SinglePhase::Submitting {
            return Err(IntakeStateError::SubmissionInFlight);
        }
        self.draft = ApplicationDraft::default();
        self.outcome = None;
        self.notice = None;
        self.phase = SinglePhase::SchemaLoading;
        Ok(self.resolver.begin(trial))
    }

    /// Reconcile a schema response. Responses for a superseded selection are
    /// discarded and never overwrite the current trial's state.
    pub fn apply_schema(
        &mut self,
        ticket: SchemaTicket,
        result: Result<Vec<FieldSpec>, GatewayError>,
    ) -> ResponseDisposition {
        if !self.resolver.is_current(ticket) {
            return ResponseDisposition::Discarded;
        }

        match result {
            Ok(fields) => {
                self.resolver.apply(ticket, fields);
                let schema = self.resolver.schema().unwrap_or_default();
                self.draft = ApplicationDraft::for_schema(schema);
                self.phase = SinglePhase::Ready;
            }
            Err(err) => {
                tracing::warn!(trial = %ticket.trial(), %err, "schema load failed");
                self.notice = Some("Failed to load form fields".to_string());
                self.phase = SinglePhase::Failed;
            }
        }
        ResponseDisposition::Applied
    }

    /// Select a trial and load its schema in one step.
    pub async fn select_and_load<G: SubmissionGateway>(
        &mut self,
        gateway: &G,
        trial: TrialType,
    ) -> Result<SinglePhase, IntakeStateError> {
        let ticket = self.select_trial(trial)?;
        let result = gateway.fetch_schema(trial).await;
        self.apply_schema(ticket, result);
        Ok(self.phase)
    }

    /// Overwrite exactly one draft entry; the schema is untouched.
    pub fn edit_field(
        &mut self,
        name: &str,
        value: impl Into<String>,
    ) -> Result<(), IntakeStateError> {
        if self.phase != SinglePhase::Ready {
            return Err(IntakeStateError::NotEditing { phase: self.phase });
        }
        self.draft
            .set(name, value)
            .map_err(|err| IntakeStateError::UnknownField(err.0))
    }

    /// Validate and coerce the draft. Violations keep the machine in
    /// `Ready` with a notice and issue no network call; a clean pass moves
    /// it to `Submitting` and hands back the record to send.
    pub fn prepare_submission(&mut self) -> Result<PreparedSubmission, SubmitBlocked> {
        match self.phase {
            SinglePhase::Submitting => return Err(SubmitBlocked::AlreadyInFlight),
            SinglePhase::Ready => {}
            phase => return Err(SubmitBlocked::NotReady { phase }),
        }

        let schema = self.resolver.schema().unwrap_or_default();
        let report = validate(schema, &self.draft);
        if !report.is_clean() {
            self.notice = report.notice();
            return Err(SubmitBlocked::Validation(report));
        }

        let trial = self
            .resolver
            .trial()
            .expect("Ready phase always has an active trial");
        let record = coerce(schema, &self.draft);

        self.submit_generation += 1;
        self.notice = None;
        self.phase = SinglePhase::Submitting;
        Ok(PreparedSubmission {
            ticket: SubmitTicket(self.submit_generation),
            trial,
            record,
        })
    }

    /// Reconcile a submission response. A response orphaned by reset is
    /// ignored; failures keep the draft intact for a retry from `Ready`.
    pub fn apply_submission(
        &mut self,
        ticket: SubmitTicket,
        result: Result<EligibilityOutcome, GatewayError>,
    ) -> SubmissionDisposition {
        if ticket.0 != self.submit_generation || self.phase != SinglePhase::Submitting {
            tracing::debug!("discarding orphaned submission response");
            return SubmissionDisposition::Discarded;
        }

        match result {
            Ok(outcome) => {
                self.outcome = Some(outcome.clone());
                self.phase = SinglePhase::ResultShown;
                SubmissionDisposition::Accepted(outcome)
            }
            Err(err) => {
                self.notice = Some("Failed to submit application".to_string());
                self.phase = SinglePhase::Failed;
                SubmissionDisposition::Failed(err)
            }
        }
    }

    /// Run one complete submit attempt against the gateway.
    pub async fn submit<G: SubmissionGateway>(
        &mut self,
        gateway: &G,
    ) -> Result<SubmitAttempt, IntakeStateError> {
        let prepared = match self.prepare_submission() {
            Ok(prepared) => prepared,
            Err(SubmitBlocked::AlreadyInFlight) => return Ok(SubmitAttempt::AlreadyInFlight),
            Err(SubmitBlocked::Validation(report)) => return Ok(SubmitAttempt::Rejected(report)),
            Err(SubmitBlocked::NotReady { phase }) => {
                return Err(IntakeStateError::NotReady { phase })
            }
        };

        let result = gateway
            .submit_application(prepared.trial, &prepared.record, &self.session)
            .await;

        Ok(match self.apply_submission(prepared.ticket, result) {
            SubmissionDisposition::Accepted(outcome) => SubmitAttempt::Accepted(outcome),
            SubmissionDisposition::Failed(err) => SubmitAttempt::Failed(err),
            SubmissionDisposition::Discarded => SubmitAttempt::Discarded,
        })
    }

    /// Dismiss a failure notice, returning to the most recent retryable
    /// point: the form when a schema is loaded, trial selection otherwise.
    pub fn acknowledge_error(&mut self) {
        if self.phase != SinglePhase::Failed {
            return;
        }
        self.notice = None;
        self.phase = if self.resolver.schema().is_some() {
            SinglePhase::Ready
        } else {
            SinglePhase::NoTrialSelected
        };
    }

    /// Discard trial type, schema, draft, and result, returning to
    /// `NoTrialSelected`. Any response still in flight is orphaned.
    pub fn reset(&mut self) {
        self.resolver.invalidate();
        self.submit_generation += 1;
        self.draft = ApplicationDraft::default();
        self.outcome = None;
        self.notice = None;
        self.phase = SinglePhase::NoTrialSelected;
    }
}
