mod cli;
mod demo;
mod generate;
mod infra;
mod report;

use swt_placement::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
