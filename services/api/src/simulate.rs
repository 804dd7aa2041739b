use crate::infra::{demo_fleet, midnight, print_json};
use chrono::{Duration, Utc};
use clap::Args;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rental_booking::booking::{
    ErrorKind, InMemoryReservationStore, InMemoryVehicleDirectory, ReservationCoordinator,
    ReservationStore, ReservationWindow, ResourceId, UserId,
};
use rental_booking::config::BookingConfig;
use rental_booking::error::AppError;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

#[derive(Args, Debug)]
pub(crate) struct SimulateArgs {
    /// Number of vehicles in the simulated fleet.
    #[arg(long, default_value_t = 3)]
    pub(crate) vehicles: usize,
    /// Number of concurrent booking requests.
    #[arg(long, default_value_t = 64)]
    pub(crate) requests: usize,
    /// Requests pick start days within this many days from now.
    #[arg(long, default_value_t = 21)]
    pub(crate) horizon_days: i64,
    /// Seed for the request generator.
    #[arg(long, default_value_t = 7)]
    pub(crate) seed: u64,
}

#[derive(Debug, Default, Serialize)]
struct SimulationReport {
    requests: usize,
    created: usize,
    outcomes: BTreeMap<String, usize>,
    overlapping_pairs: usize,
}

pub(crate) async fn run_simulation(
    args: SimulateArgs,
    config: &BookingConfig,
) -> Result<(), AppError> {
    let vehicles = args.vehicles.max(1);
    let horizon = args.horizon_days.max(1);
    let rates: Vec<u64> = (0..vehicles as u64).map(|slot| 20 + slot * 5).collect();
    let fleet = demo_fleet(&rates);
    let resource_ids: Vec<ResourceId> = fleet.iter().map(|v| v.resource_id.clone()).collect();

    let store = Arc::new(InMemoryReservationStore::new());
    let directory = Arc::new(InMemoryVehicleDirectory::with_vehicles(fleet));
    let coordinator = Arc::new(ReservationCoordinator::new(
        store.clone(),
        directory,
        config,
    ));

    let origin = midnight(Utc::now().date_naive());
    let mut rng = StdRng::seed_from_u64(args.seed);
    let mut handles = Vec::with_capacity(args.requests);
    for request in 0..args.requests {
        let resource_id = resource_ids[rng.gen_range(0..resource_ids.len())].clone();
        let start = origin + Duration::hours(rng.gen_range(0..horizon * 24));
        let end = start + Duration::hours(rng.gen_range(1..=96));
        let requester = UserId(format!("renter-{request:03}"));
        let coordinator = coordinator.clone();
        handles.push(tokio::spawn(async move {
            coordinator
                .create(&resource_id, &requester, ReservationWindow::new(start, end))
                .await
        }));
    }

    let mut report = SimulationReport {
        requests: args.requests,
        ..SimulationReport::default()
    };
    for handle in handles {
        let label = match handle.await {
            Ok(Ok(_)) => {
                report.created += 1;
                "created".to_string()
            }
            Ok(Err(err)) => outcome_label(err.kind()).to_string(),
            Err(join_error) => format!("task_failed: {join_error}"),
        };
        *report.outcomes.entry(label).or_default() += 1;
    }

    for resource_id in &resource_ids {
        let active: Vec<ReservationWindow> = store
            .by_resource(resource_id)
            .map_err(rental_booking::booking::BookingError::from)?
            .into_iter()
            .filter(|record| record.reservation.is_active())
            .map(|record| record.reservation.window)
            .collect();
        for (i, left) in active.iter().enumerate() {
            report.overlapping_pairs += active[i + 1..]
                .iter()
                .filter(|right| left.overlaps(right))
                .count();
        }
    }

    info!(
        created = report.created,
        overlapping_pairs = report.overlapping_pairs,
        "simulation finished"
    );
    print_json(&report)
}

fn outcome_label(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::Conflict => "conflict",
        ErrorKind::Busy => "busy",
        ErrorKind::NotFound => "not_found",
        ErrorKind::ResourceUnavailable => "resource_unavailable",
        ErrorKind::Forbidden => "forbidden",
        ErrorKind::InvalidTransition => "invalid_transition",
        ErrorKind::InvalidWindow => "invalid_window",
        ErrorKind::Transient => "transient",
    }
}
