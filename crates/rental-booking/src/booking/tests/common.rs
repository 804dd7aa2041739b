use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::booking::domain::{
    ListingStatus, Money, Reservation, ReservationId, ReservationWindow, ResourceId,
    ResourceSnapshot, UserId,
};
use crate::booking::repository::{
    DirectoryError, ReservationRecord, ReservationStore, StoreError, VehicleDirectory,
};
use crate::booking::{
    FixedClock, InMemoryReservationStore, InMemoryVehicleDirectory, ReservationCoordinator,
};
use crate::config::BookingConfig;

pub(super) type MemoryCoordinator =
    ReservationCoordinator<InMemoryReservationStore, InMemoryVehicleDirectory>;

pub(super) fn day(offset: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 9, 1, 10, 0, 0)
        .single()
        .expect("valid timestamp")
        + Duration::days(offset)
}

pub(super) fn window(start: i64, end: i64) -> ReservationWindow {
    ReservationWindow::new(day(start), day(end))
}

pub(super) fn car() -> ResourceId {
    ResourceId("car-x".to_string())
}

pub(super) fn owner() -> UserId {
    UserId("owner-1".to_string())
}

pub(super) fn renter(n: u8) -> UserId {
    UserId(format!("renter-{n}"))
}

pub(super) fn vehicle(resource_id: ResourceId, daily_rate: u64) -> ResourceSnapshot {
    ResourceSnapshot {
        resource_id,
        owner_id: Some(owner()),
        daily_rate: Money(daily_rate),
        status: ListingStatus::Available,
    }
}

pub(super) fn booking_config() -> BookingConfig {
    BookingConfig {
        lock_timeout: StdDuration::from_millis(100),
    }
}

pub(super) struct Harness {
    pub(super) coordinator: Arc<MemoryCoordinator>,
    pub(super) store: Arc<InMemoryReservationStore>,
    pub(super) directory: Arc<InMemoryVehicleDirectory>,
    pub(super) clock: Arc<FixedClock>,
}

pub(super) fn harness() -> Harness {
    harness_with(booking_config())
}

pub(super) fn harness_with(config: BookingConfig) -> Harness {
    let store = Arc::new(InMemoryReservationStore::new());
    let directory = Arc::new(InMemoryVehicleDirectory::with_vehicles([vehicle(car(), 20)]));
    let clock = Arc::new(FixedClock::new(day(-7)));
    let coordinator = Arc::new(ReservationCoordinator::with_clock(
        store.clone(),
        directory.clone(),
        &config,
        clock.clone(),
    ));
    Harness {
        coordinator,
        store,
        directory,
        clock,
    }
}

pub(super) struct UnavailableStore;

impl ReservationStore for UnavailableStore {
    fn insert(&self, _reservation: Reservation) -> Result<ReservationRecord, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn update(
        &self,
        _reservation: Reservation,
        _expected_version: u64,
    ) -> Result<ReservationRecord, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn fetch(&self, _id: &ReservationId) -> Result<Option<ReservationRecord>, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn by_resource(&self, _resource_id: &ResourceId) -> Result<Vec<ReservationRecord>, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn by_requester(&self, _requester_id: &UserId) -> Result<Vec<ReservationRecord>, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn by_owner(&self, _owner_id: &UserId) -> Result<Vec<ReservationRecord>, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn active(&self) -> Result<Vec<ReservationRecord>, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn delete_all_for_resource(&self, _resource_id: &ResourceId) -> Result<usize, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }
}

pub(super) struct OfflineDirectory;

impl VehicleDirectory for OfflineDirectory {
    fn snapshot(
        &self,
        _resource_id: &ResourceId,
    ) -> Result<Option<ResourceSnapshot>, DirectoryError> {
        Err(DirectoryError::Unavailable("listings service timeout".to_string()))
    }
}

/// Delegates to an in-memory store but stalls inside `insert`, i.e. while the resource
/// lock is held.
pub(super) struct SlowInsertStore {
    pub(super) inner: InMemoryReservationStore,
    pub(super) delay: StdDuration,
}

impl ReservationStore for SlowInsertStore {
    fn insert(&self, reservation: Reservation) -> Result<ReservationRecord, StoreError> {
        std::thread::sleep(self.delay);
        self.inner.insert(reservation)
    }

    fn update(
        &self,
        reservation: Reservation,
        expected_version: u64,
    ) -> Result<ReservationRecord, StoreError> {
        self.inner.update(reservation, expected_version)
    }

    fn fetch(&self, id: &ReservationId) -> Result<Option<ReservationRecord>, StoreError> {
        self.inner.fetch(id)
    }

    fn by_resource(&self, resource_id: &ResourceId) -> Result<Vec<ReservationRecord>, StoreError> {
        self.inner.by_resource(resource_id)
    }

    fn by_requester(&self, requester_id: &UserId) -> Result<Vec<ReservationRecord>, StoreError> {
        self.inner.by_requester(requester_id)
    }

    fn by_owner(&self, owner_id: &UserId) -> Result<Vec<ReservationRecord>, StoreError> {
        self.inner.by_owner(owner_id)
    }

    fn active(&self) -> Result<Vec<ReservationRecord>, StoreError> {
        self.inner.active()
    }

    fn delete_all_for_resource(&self, resource_id: &ResourceId) -> Result<usize, StoreError> {
        self.inner.delete_all_for_resource(resource_id)
    }
}

/// Reads succeed; every insert fails as if the database dropped the connection mid-write.
pub(super) struct FailingInsertStore {
    pub(super) inner: InMemoryReservationStore,
}

impl ReservationStore for FailingInsertStore {
    fn insert(&self, _reservation: Reservation) -> Result<ReservationRecord, StoreError> {
        Err(StoreError::Unavailable("connection reset during insert".to_string()))
    }

    fn update(
        &self,
        reservation: Reservation,
        expected_version: u64,
    ) -> Result<ReservationRecord, StoreError> {
        self.inner.update(reservation, expected_version)
    }

    fn fetch(&self, id: &ReservationId) -> Result<Option<ReservationRecord>, StoreError> {
        self.inner.fetch(id)
    }

    fn by_resource(&self, resource_id: &ResourceId) -> Result<Vec<ReservationRecord>, StoreError> {
        self.inner.by_resource(resource_id)
    }

    fn by_requester(&self, requester_id: &UserId) -> Result<Vec<ReservationRecord>, StoreError> {
        self.inner.by_requester(requester_id)
    }

    fn by_owner(&self, owner_id: &UserId) -> Result<Vec<ReservationRecord>, StoreError> {
        self.inner.by_owner(owner_id)
    }

    fn active(&self) -> Result<Vec<ReservationRecord>, StoreError> {
        self.inner.active()
    }

    fn delete_all_for_resource(&self, resource_id: &ResourceId) -> Result<usize, StoreError> {
        self.inner.delete_all_for_resource(resource_id)
    }
}
