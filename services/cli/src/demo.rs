use std::sync::Arc;

use trial_screening::screening::{
    template_csv, BulkFile, BulkIntakeController, SessionContext, SessionRole,
    SingleApplicationController, SubmissionGateway, SubmitAttempt, TrialType, UploadAttempt,
};

use crate::cli::DemoArgs;
use crate::commands::{print_bulk_results, print_outcome, usage};
use crate::error::AppError;
use crate::infra::{LocalEvaluationGateway, ScreeningServiceState};

/// End-to-end walk through both intake flows against the in-process stub
/// service; nothing touches the network.
pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let trial = args.trial.unwrap_or(TrialType::Hypertension);
    let state = Arc::new(ScreeningServiceState::default());
    let gateway = LocalEvaluationGateway::new(state);

    let template = template_csv(trial);
    let mut lines = template.lines();
    let header: Vec<&str> = lines.next().unwrap_or("").split(',').collect();
    let example: Vec<&str> = lines.next().unwrap_or("").split(',').collect();

    println!("=== Single applicant intake: {} ===", trial.metadata().name);
    let session = SessionContext::for_user("demo-user", SessionRole::Patient);
    let mut single = SingleApplicationController::new(session);
    single
        .select_and_load(&gateway, trial)
        .await
        .map_err(usage)?;

    for (name, value) in header.iter().zip(&example) {
        single.edit_field(name, *value).map_err(usage)?;
        println!("  {name} = {value}");
    }

    match single.submit(&gateway).await.map_err(usage)? {
        SubmitAttempt::Accepted(outcome) => print_outcome(&outcome),
        other => return Err(usage(format!("demo submission did not complete: {other:?}"))),
    }

    println!();
    println!("=== Bulk cohort intake: {} ===", trial.metadata().name);
    let cohort = demo_cohort(&template, &example);
    let mut bulk = BulkIntakeController::new();
    bulk.choose_trial(trial).map_err(usage)?;
    bulk.accept_file(BulkFile::new(
        "demo_cohort.csv",
        Some("text/csv".to_string()),
        cohort.into_bytes(),
    ))
    .map_err(usage)?;

    match bulk.upload(&gateway).await.map_err(usage)? {
        UploadAttempt::Completed(results) => print_bulk_results(&results),
        other => return Err(usage(format!("demo upload did not complete: {other:?}"))),
    }

    println!();
    println!("=== Aggregate counts ===");
    let analytics = gateway.fetch_analytics().await?;
    for row in &analytics.summary {
        println!(
            "  {}: {} screened, {} eligible, {} ineligible",
            row.trial_type, row.total_applications, row.eligible, row.ineligible
        );
    }

    Ok(())
}

/// Build a small cohort from the template's example row: a handful of
/// age-shifted copies plus one deliberately malformed row.
fn demo_cohort(template: &str, example: &[&str]) -> String {
    let mut content = String::from(template);

    for offset in [2u32, 9, 23, 31] {
        let mut row: Vec<String> = example.iter().map(|cell| (*cell).to_string()).collect();
        if let Some(age) = row.first_mut() {
            let base = age.parse::<u32>().unwrap_or(40);
            *age = (base + offset).to_string();
        }
        content.push_str(&row.join(","));
        content.push('\n');
    }

    let mut malformed: Vec<String> = example.iter().map(|cell| (*cell).to_string()).collect();
    if let Some(age) = malformed.first_mut() {
        *age = "not-a-number".to_string();
    }
    content.push_str(&malformed.join(","));
    content.push('\n');

    content
}
