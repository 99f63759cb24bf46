use std::fmt::Display;
use std::fs;

use trial_screening::config::AppConfig;
use trial_screening::screening::{
    template_csv, template_file_name, BulkFile, BulkIntakeController, BulkResultSet,
    EligibilityOutcome, HttpGateway, RowEligibility, SessionContext, SessionRole,
    SingleApplicationController, SubmissionGateway, SubmitAttempt, UploadAttempt,
};

use crate::cli::{AnalyticsArgs, ApplyArgs, BulkArgs, TemplateArgs};
use crate::error::AppError;

pub(crate) fn usage(err: impl Display) -> AppError {
    AppError::Usage(err.to_string())
}

fn gateway_for(service_url: Option<String>) -> Result<HttpGateway, AppError> {
    let mut config = AppConfig::load()?;
    if let Some(url) = service_url {
        config.service.base_url = url;
    }
    Ok(HttpGateway::new(&config.service)?)
}

pub(crate) async fn run_apply(args: ApplyArgs) -> Result<(), AppError> {
    let gateway = gateway_for(args.service_url)?;
    let session = match args.username {
        Some(username) => SessionContext::for_user(username, SessionRole::Patient),
        None => SessionContext::anonymous(),
    };

    let mut controller = SingleApplicationController::new(session);
    let ticket = controller.select_trial(args.trial).map_err(usage)?;
    let schema = gateway.fetch_schema(args.trial).await?;
    controller.apply_schema(ticket, Ok(schema));

    for pair in &args.fields {
        let (name, value) = pair
            .split_once('=')
            .ok_or_else(|| usage(format!("expected NAME=VALUE, got {pair:?}")))?;
        if let Err(err) = controller.edit_field(name, value) {
            let known: Vec<&str> = controller
                .schema()
                .unwrap_or_default()
                .iter()
                .map(|field| field.name.as_str())
                .collect();
            return Err(usage(format!("{err}; known fields: {}", known.join(", "))));
        }
    }

    match controller.submit(&gateway).await.map_err(usage)? {
        SubmitAttempt::Accepted(outcome) => {
            print_outcome(&outcome);
            Ok(())
        }
        SubmitAttempt::Rejected(report) => {
            for violation in report.violations() {
                eprintln!("  - {}", violation.message());
            }
            Err(usage("the application did not pass local validation"))
        }
        SubmitAttempt::Failed(err) => Err(AppError::Gateway(err)),
        other => Err(usage(format!("unexpected submission state: {other:?}"))),
    }
}

pub(crate) async fn run_bulk(args: BulkArgs) -> Result<(), AppError> {
    let gateway = gateway_for(args.service_url)?;
    let bytes = fs::read(&args.file)?;
    let name = args
        .file
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("cohort.csv")
        .to_string();
    let content_type = mime_guess::from_path(&args.file)
        .first_raw()
        .map(str::to_string);

    let mut controller = BulkIntakeController::new();
    controller.choose_trial(args.trial).map_err(usage)?;
    controller
        .accept_file(BulkFile::new(name, content_type, bytes))
        .map_err(usage)?;

    match controller.upload(&gateway).await.map_err(usage)? {
        UploadAttempt::Completed(results) => {
            print_bulk_results(&results);
            Ok(())
        }
        UploadAttempt::Failed(err) => Err(AppError::Gateway(err)),
        other => Err(usage(format!("unexpected upload state: {other:?}"))),
    }
}

pub(crate) fn run_template(args: TemplateArgs) -> Result<(), AppError> {
    let template = template_csv(args.trial);
    match args.out {
        Some(path) => {
            fs::write(&path, template)?;
            println!("wrote {} to {}", template_file_name(args.trial), path.display());
        }
        None => print!("{template}"),
    }
    Ok(())
}

pub(crate) async fn run_analytics(args: AnalyticsArgs) -> Result<(), AppError> {
    let gateway = gateway_for(args.service_url)?;
    let analytics = gateway.fetch_analytics().await?;

    println!("{:<14} {:>8} {:>10} {:>12}", "trial", "total", "eligible", "ineligible");
    for row in &analytics.summary {
        println!(
            "{:<14} {:>8} {:>10} {:>12}",
            row.trial_type, row.total_applications, row.eligible, row.ineligible
        );
    }
    println!("last updated: {}", analytics.last_updated.to_rfc3339());
    Ok(())
}

pub(crate) fn print_outcome(outcome: &EligibilityOutcome) {
    println!("Patient ID:  #{}", outcome.patient_id);
    println!("Trial type:  {}", outcome.trial_type);
    println!("Eligibility: {}", outcome.eligibility.label());
    println!("{}", outcome.message);
}

pub(crate) fn print_bulk_results(results: &BulkResultSet) {
    println!(
        "processed {} rows: {} eligible, {} ineligible, {} errors",
        results.total_processed, results.eligible, results.ineligible, results.errors
    );

    if results.results.is_empty() {
        return;
    }
    println!("{:<6} {:<12} {:<12} status", "row", "patient", "eligibility");
    for row in &results.results {
        let patient = row
            .patient_id
            .map(|id| format!("#{id}"))
            .unwrap_or_else(|| "N/A".to_string());
        let status = row.error.as_deref().unwrap_or("Processed");
        let eligibility = match row.eligibility {
            RowEligibility::Eligible => "Eligible",
            RowEligibility::Ineligible => "Ineligible",
            RowEligibility::Error => "Error",
        };
        println!("{:<6} {:<12} {:<12} {status}", row.row, patient, eligibility);
    }
    if results.results.len() < results.total_processed as usize {
        println!(
            "(showing the first {} of {} rows)",
            results.results.len(),
            results.total_processed
        );
    }
}
