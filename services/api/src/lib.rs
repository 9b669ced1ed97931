mod cli;
mod infra;
mod routes;
mod server;
mod simulate;

use style_quiz::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
