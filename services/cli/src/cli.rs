use std::path::PathBuf;
use std::str::FromStr;

use clap::{Args, Parser, Subcommand};
use trial_screening::screening::TrialType;

use crate::error::AppError;
use crate::{commands, demo, server};

#[derive(Parser, Debug)]
#[command(
    name = "Trial Screening Console",
    about = "Run the clinical-trial screening intake pipeline from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the stub evaluation service (default command)
    Serve(ServeArgs),
    /// Submit one screening application against a running service
    Apply(ApplyArgs),
    /// Upload a cohort file for bulk screening
    Bulk(BulkArgs),
    /// Write the CSV upload template for a trial type
    Template(TemplateArgs),
    /// Print aggregate screening counts
    Analytics(AnalyticsArgs),
    /// Walk both intake flows against the in-process stub service
    Demo(DemoArgs),
}

fn parse_trial(raw: &str) -> Result<TrialType, String> {
    TrialType::from_str(raw).map_err(|err| err.to_string())
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the evaluation service
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the evaluation service
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

#[derive(Args, Debug)]
pub(crate) struct ApplyArgs {
    /// Trial type to apply for (hypertension, arthritis, migraine, phase1)
    #[arg(long, value_parser = parse_trial)]
    pub(crate) trial: TrialType,
    /// Field values as name=value pairs (repeatable)
    #[arg(long = "field", value_name = "NAME=VALUE")]
    pub(crate) fields: Vec<String>,
    /// Username attached to the application
    #[arg(long)]
    pub(crate) username: Option<String>,
    /// Override the configured evaluation service URL
    #[arg(long)]
    pub(crate) service_url: Option<String>,
}

#[derive(Args, Debug)]
pub(crate) struct BulkArgs {
    /// Trial type the cohort file targets
    #[arg(long, value_parser = parse_trial)]
    pub(crate) trial: TrialType,
    /// Cohort file to upload (CSV, XLS, or XLSX, up to 10 MiB)
    pub(crate) file: PathBuf,
    /// Override the configured evaluation service URL
    #[arg(long)]
    pub(crate) service_url: Option<String>,
}

#[derive(Args, Debug)]
pub(crate) struct TemplateArgs {
    /// Trial type to render the template for
    #[arg(long, value_parser = parse_trial)]
    pub(crate) trial: TrialType,
    /// Destination path; prints to stdout when omitted
    #[arg(long)]
    pub(crate) out: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub(crate) struct AnalyticsArgs {
    /// Override the configured evaluation service URL
    #[arg(long)]
    pub(crate) service_url: Option<String>,
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Trial type the demo walks through (defaults to hypertension)
    #[arg(long, value_parser = parse_trial)]
    pub(crate) trial: Option<TrialType>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Apply(args) => commands::run_apply(args).await,
        Command::Bulk(args) => commands::run_bulk(args).await,
        Command::Template(args) => commands::run_template(args),
        Command::Analytics(args) => commands::run_analytics(args).await,
        Command::Demo(args) => demo::run_demo(args).await,
    }
}
