mod cli;
mod commands;
mod demo;
mod error;
mod infra;
mod routes;
mod server;

pub use error::AppError;
pub use infra::{LocalEvaluationGateway, ScreeningServiceState};
pub use routes::evaluation_router;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
