use crate::demo::{run_demo, run_quote, DemoArgs, QuoteArgs};
use crate::simulate::{run_simulation, SimulateArgs};
use clap::{Parser, Subcommand};
use rental_booking::config::AppConfig;
use rental_booking::error::AppError;
use rental_booking::telemetry;
use tracing::debug;

#[derive(Parser, Debug)]
#[command(
    name = "rental-booking",
    about = "Exercise the vehicle reservation engine from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Walk one vehicle through create, conflict, confirm, cancel, and rebook (default command)
    Demo(DemoArgs),
    /// Price a rental window without booking it
    Quote(QuoteArgs),
    /// Race concurrent renters against a small fleet and verify no windows overlap
    Simulate(SimulateArgs),
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;
    debug!(environment = ?config.environment, "configuration loaded");

    let command = cli
        .command
        .unwrap_or_else(|| Command::Demo(DemoArgs::default()));

    match command {
        Command::Demo(args) => run_demo(args, &config.booking).await,
        Command::Quote(args) => run_quote(args),
        Command::Simulate(args) => run_simulation(args, &config.booking).await,
    }
}
