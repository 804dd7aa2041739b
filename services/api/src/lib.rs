mod cli;
mod demo;
mod infra;
mod simulate;

use rental_booking::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
