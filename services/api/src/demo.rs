use crate::infra::{demo_fleet, fleet_owner, midnight, parse_date, parse_instant, print_json};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use clap::Args;
use rental_booking::booking::lifecycle::{quote, validate_window};
use rental_booking::booking::{
    BookingError, CrossContextFacade, InMemoryReservationStore, InMemoryVehicleDirectory, Money,
    Reservation, ReservationCoordinator, ReservationQueries, ReservationWindow, UserId,
};
use rental_booking::config::BookingConfig;
use rental_booking::error::AppError;
use serde::Serialize;
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// First rental day (YYYY-MM-DD). Defaults to a week from today.
    #[arg(long, value_parser = parse_date)]
    pub(crate) start: Option<NaiveDate>,
    /// Daily rate of the demo vehicle in minor currency units.
    #[arg(long, default_value_t = 20)]
    pub(crate) daily_rate: u64,
    /// Emit the transcript as JSON instead of text.
    #[arg(long)]
    pub(crate) json: bool,
}

impl Default for DemoArgs {
    fn default() -> Self {
        Self {
            start: None,
            daily_rate: 20,
            json: false,
        }
    }
}

#[derive(Args, Debug)]
pub(crate) struct QuoteArgs {
    /// Daily rate in minor currency units.
    #[arg(long)]
    pub(crate) daily_rate: u64,
    /// Window start (RFC 3339 or YYYY-MM-DD).
    #[arg(long, value_parser = parse_instant)]
    pub(crate) start: DateTime<Utc>,
    /// Window end, exclusive (RFC 3339 or YYYY-MM-DD).
    #[arg(long, value_parser = parse_instant)]
    pub(crate) end: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
struct DemoStep {
    action: String,
    outcome: StepOutcome,
}

#[derive(Debug, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
enum StepOutcome {
    Ok {
        reservation_id: String,
        status: &'static str,
        total_price: Money,
    },
    Refused {
        error: String,
    },
}

impl StepOutcome {
    fn from_result(result: &Result<Reservation, BookingError>) -> Self {
        match result {
            Ok(reservation) => StepOutcome::Ok {
                reservation_id: reservation.id.0.clone(),
                status: reservation.status.label(),
                total_price: reservation.total_price,
            },
            Err(err) => StepOutcome::Refused {
                error: err.to_string(),
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct DemoTranscript {
    vehicle: String,
    daily_rate: Money,
    steps: Vec<DemoStep>,
    active_reservation_mid_window: Option<String>,
}

pub(crate) async fn run_demo(args: DemoArgs, config: &BookingConfig) -> Result<(), AppError> {
    let start = args
        .start
        .map(midnight)
        .unwrap_or_else(|| midnight(Utc::now().date_naive()) + Duration::days(7));
    let day = |offset: i64| start + Duration::days(offset);

    let fleet = demo_fleet(&[args.daily_rate]);
    let vehicle = fleet[0].resource_id.clone();
    let store = Arc::new(InMemoryReservationStore::new());
    let directory = Arc::new(InMemoryVehicleDirectory::with_vehicles(fleet));
    let coordinator = ReservationCoordinator::new(store.clone(), directory, config);
    let facade = CrossContextFacade::new(store);

    let owner = fleet_owner();
    let first_renter = UserId("renter-1".to_string());
    let second_renter = UserId("renter-2".to_string());
    let mut steps = Vec::new();

    let first = coordinator
        .create(
            &vehicle,
            &first_renter,
            ReservationWindow::new(day(0), day(3)),
        )
        .await;
    steps.push(step("renter-1 books days 0-3", &first));
    let first = first?;

    let overlapping = coordinator
        .create(
            &vehicle,
            &second_renter,
            ReservationWindow::new(day(1), day(2)),
        )
        .await;
    steps.push(step("renter-2 books days 1-2", &overlapping));

    let confirmed = coordinator.confirm(&first.id, &owner).await;
    steps.push(step("owner confirms renter-1", &confirmed));
    confirmed?;

    let active = facade
        .find_active_reservation_at(&vehicle, day(1) + Duration::hours(12))
        .map_err(BookingError::from)?
        .map(|reservation| reservation.id.0);

    let repeat = coordinator.confirm(&first.id, &owner).await;
    steps.push(step("owner confirms renter-1 again", &repeat));

    let canceled = coordinator.cancel(&first.id, &first_renter).await;
    steps.push(step("renter-1 cancels", &canceled));
    canceled?;

    let rebooked = coordinator
        .create(
            &vehicle,
            &second_renter,
            ReservationWindow::new(day(1), day(2)),
        )
        .await;
    steps.push(step("renter-2 books days 1-2 again", &rebooked));

    let empty = coordinator
        .create(
            &vehicle,
            &second_renter,
            ReservationWindow::new(day(5), day(5)),
        )
        .await;
    steps.push(step("renter-2 books an empty window", &empty));

    let transcript = DemoTranscript {
        vehicle: vehicle.0.clone(),
        daily_rate: Money(args.daily_rate),
        steps,
        active_reservation_mid_window: active,
    };

    if args.json {
        return print_json(&transcript);
    }

    println!(
        "Reservation demo for {} at {} per day",
        transcript.vehicle, transcript.daily_rate
    );
    for DemoStep { action, outcome } in &transcript.steps {
        match outcome {
            StepOutcome::Ok {
                reservation_id,
                status,
                total_price,
            } => println!("  {action:<32} ok       {status:<9} price={total_price} id={reservation_id}"),
            StepOutcome::Refused { error } => println!("  {action:<32} refused  {error}"),
        }
    }
    if let Some(id) = &transcript.active_reservation_mid_window {
        println!("  telemetry lookup on day 1 found active reservation {id}");
    }
    Ok(())
}

fn step(action: &str, result: &Result<Reservation, BookingError>) -> DemoStep {
    DemoStep {
        action: action.to_string(),
        outcome: StepOutcome::from_result(result),
    }
}

#[derive(Debug, Serialize)]
struct QuoteView {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    billable_days: u64,
    total_price: Money,
}

pub(crate) fn run_quote(args: QuoteArgs) -> Result<(), AppError> {
    let window = ReservationWindow::new(args.start, args.end);
    validate_window(window).map_err(BookingError::from)?;
    let total_price = quote(Money(args.daily_rate), window).map_err(BookingError::from)?;

    print_json(&QuoteView {
        start: window.start,
        end: window.end,
        billable_days: window.billable_days(),
        total_price,
    })
}
