use super::catalog::TrialType;
use super::gateway::{BulkFile, BulkResultSet, GatewayError, SubmissionGateway};
use super::template;

/// Where the bulk-intake state machine currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkPhase {
    NoTrialType,
    TrialTypeChosen,
    FileChosen,
    Uploading,
    ResultsShown,
}

/// Declared MIME types the upload gate accepts.
const ACCEPTED_MIME_TYPES: [&str; 3] = [
    "text/csv",
    "application/vnd.ms-excel",
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
];

/// File extensions the upload gate accepts.
const ACCEPTED_EXTENSIONS: [&str; 3] = [".csv", ".xls", ".xlsx"];

/// Upload size ceiling: 10 MiB.
pub const MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

/// Client-only file-gate failures; the controller state never changes on
/// these and another file can be chosen immediately.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FileGateError {
    #[error("please select a CSV or Excel file")]
    UnsupportedFormat {
        name: String,
        content_type: Option<String>,
    },
    #[error("file size must be less than 10MB")]
    TooLarge { size: u64 },
}

/// Misuse or gate failures raised by the bulk intake machine.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BulkIntakeError {
    #[error("please select a trial type")]
    TrialTypeNotChosen,
    #[error("please select a file to upload")]
    FileNotChosen,
    #[error("an upload is already in progress")]
    UploadInFlight,
    #[error("results are on screen; start over to upload another file")]
    ResultsPending,
    #[error("no results are on screen yet")]
    NoResults,
    #[error(transparent)]
    Gate(#[from] FileGateError),
}

/// Ticket identifying one upload attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadTicket(u64);

/// How an upload response was reconciled against the machine.
#[derive(Debug)]
pub enum UploadDisposition {
    Completed(BulkResultSet),
    Failed(GatewayError),
    Discarded,
}

/// What one complete upload attempt amounted to.
#[derive(Debug)]
pub enum UploadAttempt {
    Completed(BulkResultSet),
    Failed(GatewayError),
    AlreadyInFlight,
    Discarded,
}

/// Local acceptance gate shared by drag-and-drop and manual browse: a file
/// passes when either its declared MIME type or its extension is accepted,
/// and its size is within the ceiling.
pub fn gate_file(file: &BulkFile) -> Result<(), FileGateError> {
    let mime_ok = file
        .content_type
        .as_deref()
        .map_or(false, |declared| ACCEPTED_MIME_TYPES.contains(&declared));
    let extension_ok = file
        .extension()
        .map_or(false, |ext| ACCEPTED_EXTENSIONS.contains(&ext.as_str()));

    if !mime_ok && !extension_ok {
        return Err(FileGateError::UnsupportedFormat {
            name: file.name.clone(),
            content_type: file.content_type.clone(),
        });
    }
    if file.size() > MAX_UPLOAD_BYTES {
        return Err(FileGateError::TooLarge { size: file.size() });
    }
    Ok(())
}

/// State machine coordinating trial-type selection, file acceptance,
/// upload, and tabulated per-row result display for a cohort file.
pub struct BulkIntakeController {
    phase: BulkPhase,
    trial: Option<TrialType>,
    file: Option<BulkFile>,
    results: Option<BulkResultSet>,
    notice: Option<String>,
    upload_generation: u64,
}

impl Default for BulkIntakeController {
    fn default() -> Self {
        Self::new()
    }
}

impl BulkIntakeController {
    pub fn new() -> Self {
        Self {
            phase: BulkPhase::NoTrialType,
            trial: None,
            file: None,
            results: None,
            notice: None,
            upload_generation: 0,
        }
    }

    pub fn phase(&self) -> BulkPhase {
        self.phase
    }

    pub fn trial(&self) -> Option<TrialType> {
        self.trial
    }

    pub fn file(&self) -> Option<&BulkFile> {
        self.file.as_ref()
    }

    pub fn results(&self) -> Option<&BulkResultSet> {
        self.results.as_ref()
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    /// Choose (or re-choose) the trial type. Allowed any time before an
    /// upload starts; an already-chosen file is kept.
    pub fn choose_trial(&mut self, trial: TrialType) -> Result<(), BulkIntakeError> {
        match self.phase {
            BulkPhase::Uploading => return Err(BulkIntakeError::UploadInFlight),
            BulkPhase::ResultsShown => return Err(BulkIntakeError::ResultsPending),
            BulkPhase::NoTrialType => self.phase = BulkPhase::TrialTypeChosen,
            BulkPhase::TrialTypeChosen | BulkPhase::FileChosen => {}
        }
        self.trial = Some(trial);
        Ok(())
    }

    /// Run the acceptance gate and take the file. A rejected file leaves the
    /// current state untouched apart from the notice.
    pub fn accept_file(&mut self, file: BulkFile) -> Result<(), BulkIntakeError> {
        match self.phase {
            BulkPhase::NoTrialType => return Err(BulkIntakeError::TrialTypeNotChosen),
            BulkPhase::Uploading => return Err(BulkIntakeError::UploadInFlight),
            BulkPhase::ResultsShown => return Err(BulkIntakeError::ResultsPending),
            BulkPhase::TrialTypeChosen | BulkPhase::FileChosen => {}
        }

        if let Err(gate) = gate_file(&file) {
            self.notice = Some(gate.to_string());
            return Err(gate.into());
        }

        self.file = Some(file);
        self.notice = None;
        self.phase = BulkPhase::FileChosen;
        Ok(())
    }

    /// Drop a chosen file without touching the trial type.
    pub fn remove_file(&mut self) {
        if self.phase == BulkPhase::FileChosen {
            self.file = None;
            self.phase = BulkPhase::TrialTypeChosen;
        }
    }

    /// CSV template for the chosen trial type; a read-only side action that
    /// never changes controller state.
    pub fn template_csv(&self) -> Result<String, BulkIntakeError> {
        let trial = self.trial.ok_or(BulkIntakeError::TrialTypeNotChosen)?;
        Ok(template::template_csv(trial))
    }

    /// Start an upload: only valid with both a trial type and a file, and
    /// with no upload already in flight.
    pub fn begin_upload(&mut self) -> Result<(UploadTicket, TrialType), BulkIntakeError> {
        match self.phase {
            BulkPhase::Uploading => return Err(BulkIntakeError::UploadInFlight),
            BulkPhase::ResultsShown => return Err(BulkIntakeError::ResultsPending),
            BulkPhase::NoTrialType => return Err(BulkIntakeError::TrialTypeNotChosen),
            BulkPhase::TrialTypeChosen => return Err(BulkIntakeError::FileNotChosen),
            BulkPhase::FileChosen => {}
        }
        let trial = self.trial.ok_or(BulkIntakeError::TrialTypeNotChosen)?;
        if self.file.is_none() {
            return Err(BulkIntakeError::FileNotChosen);
        }

        self.upload_generation += 1;
        self.notice = None;
        self.phase = BulkPhase::Uploading;
        Ok((UploadTicket(self.upload_generation), trial))
    }

    /// Reconcile an upload response. Failures return the machine to
    /// `FileChosen` so the same file can be retried or replaced; the per-row
    /// display is capped while the counts keep covering the whole job.
    pub fn apply_upload(
        &mut self,
        ticket: UploadTicket,
        result: Result<BulkResultSet, GatewayError>,
    ) -> UploadDisposition {
        if ticket.0 != self.upload_generation || self.phase != BulkPhase::Uploading {
            tracing::debug!("discarding orphaned upload response");
            return UploadDisposition::Discarded;
        }

        match result {
            Ok(mut results) => {
                results.truncate_for_display();
                self.results = Some(results.clone());
                self.phase = BulkPhase::ResultsShown;
                UploadDisposition::Completed(results)
            }
            Err(err) => {
                self.notice = Some("Failed to upload file".to_string());
                self.phase = BulkPhase::FileChosen;
                UploadDisposition::Failed(err)
            }
        }
    }

    /// Run one complete upload attempt against the gateway.
    pub async fn upload<G: SubmissionGateway>(
        &mut self,
        gateway: &G,
    ) -> Result<UploadAttempt, BulkIntakeError> {
        let (ticket, trial) = match self.begin_upload() {
            Ok(started) => started,
            Err(BulkIntakeError::UploadInFlight) => return Ok(UploadAttempt::AlreadyInFlight),
            Err(err) => return Err(err),
        };

        let file = self.file.as_ref().expect("upload began with a file");
        let result = gateway.submit_cohort(trial, file).await;

        Ok(match self.apply_upload(ticket, result) {
            UploadDisposition::Completed(results) => UploadAttempt::Completed(results),
            UploadDisposition::Failed(err) => UploadAttempt::Failed(err),
            UploadDisposition::Discarded => UploadAttempt::Discarded,
        })
    }

    /// "Upload another file": discard trial type, file, and results. Only
    /// valid once results are on screen.
    pub fn start_over(&mut self) -> Result<(), BulkIntakeError> {
        if self.phase != BulkPhase::ResultsShown {
            return Err(BulkIntakeError::NoResults);
        }
        self.upload_generation += 1;
        self.trial = None;
        self.file = None;
        self.results = None;
        self.notice = None;
        self.phase = BulkPhase::NoTrialType;
        Ok(())
    }
}
