//! End-to-end booking scenarios driven through the public coordinator and facade.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, TimeZone, Utc};
use rental_booking::booking::{
    BookingError, CrossContextFacade, ErrorKind, FixedClock, InMemoryReservationStore,
    InMemoryVehicleDirectory, LifecycleError, ListingStatus, Money, ReservationCoordinator,
    ReservationQueries, ReservationStatus, ReservationWindow, ResourceId, ResourceSnapshot,
    UserId,
};
use rental_booking::config::BookingConfig;

fn day(offset: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 11, 3, 0, 0, 0)
        .single()
        .expect("valid timestamp")
        + Duration::days(offset)
}

fn window(start: i64, end: i64) -> ReservationWindow {
    ReservationWindow::new(day(start), day(end))
}

fn vehicle_x() -> ResourceId {
    ResourceId("vehicle-x".to_string())
}

fn owner() -> UserId {
    UserId("owner".to_string())
}

fn renter(name: &str) -> UserId {
    UserId(name.to_string())
}

struct Platform {
    coordinator: Arc<ReservationCoordinator<InMemoryReservationStore, InMemoryVehicleDirectory>>,
    facade: CrossContextFacade<InMemoryReservationStore>,
    clock: Arc<FixedClock>,
}

fn platform(daily_rate: u64) -> Platform {
    let store = Arc::new(InMemoryReservationStore::new());
    let directory = Arc::new(InMemoryVehicleDirectory::with_vehicles([ResourceSnapshot {
        resource_id: vehicle_x(),
        owner_id: Some(owner()),
        daily_rate: Money(daily_rate),
        status: ListingStatus::Available,
    }]));
    let clock = Arc::new(FixedClock::new(day(-2)));
    let config = BookingConfig {
        lock_timeout: StdDuration::from_secs(2),
    };
    let coordinator = Arc::new(ReservationCoordinator::with_clock(
        store.clone(),
        directory,
        &config,
        clock.clone(),
    ));
    let facade = CrossContextFacade::with_clock(store, clock.clone());
    Platform {
        coordinator,
        facade,
        clock,
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn booking_conflict_confirm_cancel_and_rebook() {
    let Platform { coordinator, .. } = platform(20);

    let res1 = coordinator
        .create(&vehicle_x(), &renter("renter1"), window(0, 3))
        .await
        .expect("first booking");
    assert_eq!(res1.total_price, Money(60));
    assert_eq!(res1.status, ReservationStatus::Pending);

    let racing = {
        let coordinator = coordinator.clone();
        tokio::spawn(async move {
            coordinator
                .create(&vehicle_x(), &renter("renter2"), window(1, 2))
                .await
        })
    };
    let err = racing
        .await
        .expect("task joins")
        .expect_err("overlap refused");
    assert_eq!(err.kind(), ErrorKind::Conflict);

    let confirmed = coordinator
        .confirm(&res1.id, &owner())
        .await
        .expect("owner confirms");
    assert_eq!(confirmed.status, ReservationStatus::Confirmed);

    let canceled = coordinator
        .cancel(&res1.id, &renter("renter1"))
        .await
        .expect("renter cancels");
    assert_eq!(canceled.status, ReservationStatus::Canceled);

    let rebooked = coordinator
        .create(&vehicle_x(), &renter("renter2"), window(1, 2))
        .await
        .expect("freed slot can be booked");
    assert_eq!(rebooked.status, ReservationStatus::Pending);
}

#[tokio::test]
async fn equal_start_and_end_is_invalid() {
    let Platform { coordinator, .. } = platform(20);
    let err = coordinator
        .create(&vehicle_x(), &renter("renter1"), window(1, 1))
        .await
        .expect_err("empty window");
    assert!(matches!(
        err,
        BookingError::Lifecycle(LifecycleError::InvalidWindow { .. })
    ));
}

#[tokio::test]
async fn second_confirm_reports_current_status() {
    let Platform { coordinator, .. } = platform(20);
    let reservation = coordinator
        .create(&vehicle_x(), &renter("renter1"), window(0, 1))
        .await
        .expect("booking");
    coordinator
        .confirm(&reservation.id, &owner())
        .await
        .expect("confirm");

    match coordinator.confirm(&reservation.id, &owner()).await {
        Err(BookingError::Lifecycle(LifecycleError::InvalidTransition { current, .. })) => {
            assert_eq!(current, ReservationStatus::Confirmed)
        }
        other => panic!("expected invalid transition, got {other:?}"),
    }
}

#[tokio::test]
async fn pricing_rounds_partial_days_up() {
    let Platform { coordinator, .. } = platform(50);

    let two_days = coordinator
        .create(&vehicle_x(), &renter("renter1"), window(0, 2))
        .await
        .expect("two day booking");
    assert_eq!(two_days.total_price, Money(100));

    let thirty_hours = ReservationWindow::new(day(10), day(10) + Duration::hours(30));
    let rounded = coordinator
        .create(&vehicle_x(), &renter("renter1"), thirty_hours)
        .await
        .expect("thirty hour booking");
    assert_eq!(rounded.total_price, Money(100));

    let one_hour = ReservationWindow::new(day(20), day(20) + Duration::hours(1));
    let minimum = coordinator
        .create(&vehicle_x(), &renter("renter1"), one_hour)
        .await
        .expect("one hour booking");
    assert_eq!(minimum.total_price, Money(50));
}

#[tokio::test]
async fn reviews_and_telemetry_see_reservation_state_through_the_facade() {
    let Platform {
        coordinator,
        facade,
        clock,
    } = platform(20);

    let reservation = coordinator
        .create(&vehicle_x(), &renter("renter1"), window(0, 3))
        .await
        .expect("booking");

    clock.set(day(1));
    let active = facade
        .find_active_reservation_at(&vehicle_x(), day(1))
        .expect("telemetry lookup");
    assert_eq!(active.map(|found| found.id), Some(reservation.id.clone()));
    assert!(!facade
        .has_completed_reservation(&renter("renter1"), &vehicle_x())
        .expect("review gate"));

    coordinator
        .confirm(&reservation.id, &owner())
        .await
        .expect("confirm");
    clock.set(day(4));
    assert!(facade
        .has_completed_reservation(&renter("renter1"), &vehicle_x())
        .expect("review gate"));
    assert!(facade
        .find_active_reservation_at(&vehicle_x(), day(4))
        .expect("telemetry lookup")
        .is_none());

    assert_eq!(
        facade.list_by_owner(&owner()).expect("owner page").len(),
        1
    );
}
