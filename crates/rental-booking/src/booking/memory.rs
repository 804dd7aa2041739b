//! In-process collaborators used by the service binary, the demo, and tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::domain::{Reservation, ReservationId, ResourceId, ResourceSnapshot, UserId};
use super::repository::{
    DirectoryError, ReservationRecord, ReservationStore, StoreError, VehicleDirectory,
};

#[derive(Debug, Default, Clone)]
pub struct InMemoryReservationStore {
    records: Arc<Mutex<HashMap<ReservationId, ReservationRecord>>>,
}

impl InMemoryReservationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.lock().expect("store mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn select<F>(&self, predicate: F) -> Vec<ReservationRecord>
    where
        F: Fn(&Reservation) -> bool,
    {
        let guard = self.records.lock().expect("store mutex poisoned");
        let mut selected: Vec<ReservationRecord> = guard
            .values()
            .filter(|record| predicate(&record.reservation))
            .cloned()
            .collect();
        selected.sort_by(|a, b| {
            b.reservation
                .created_at
                .cmp(&a.reservation.created_at)
                .then_with(|| a.reservation.id.cmp(&b.reservation.id))
        });
        selected
    }
}

impl ReservationStore for InMemoryReservationStore {
    fn insert(&self, reservation: Reservation) -> Result<ReservationRecord, StoreError> {
        let mut guard = self.records.lock().expect("store mutex poisoned");
        if guard.contains_key(&reservation.id) {
            return Err(StoreError::Duplicate(reservation.id));
        }
        let record = ReservationRecord::new(reservation);
        guard.insert(record.reservation.id.clone(), record.clone());
        Ok(record)
    }

    fn update(
        &self,
        reservation: Reservation,
        expected_version: u64,
    ) -> Result<ReservationRecord, StoreError> {
        let mut guard = self.records.lock().expect("store mutex poisoned");
        let stored = guard
            .get_mut(&reservation.id)
            .ok_or_else(|| StoreError::NotFound(reservation.id.clone()))?;

        if stored.version != expected_version {
            return Err(StoreError::VersionConflict {
                id: reservation.id,
                expected: expected_version,
                found: stored.version,
            });
        }

        stored.reservation = reservation;
        stored.version += 1;
        Ok(stored.clone())
    }

    fn fetch(&self, id: &ReservationId) -> Result<Option<ReservationRecord>, StoreError> {
        let guard = self.records.lock().expect("store mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn by_resource(&self, resource_id: &ResourceId) -> Result<Vec<ReservationRecord>, StoreError> {
        Ok(self.select(|reservation| &reservation.resource_id == resource_id))
    }

    fn by_requester(&self, requester_id: &UserId) -> Result<Vec<ReservationRecord>, StoreError> {
        Ok(self.select(|reservation| &reservation.requester_id == requester_id))
    }

    fn by_owner(&self, owner_id: &UserId) -> Result<Vec<ReservationRecord>, StoreError> {
        Ok(self.select(|reservation| &reservation.resource_owner_id == owner_id))
    }

    fn active(&self) -> Result<Vec<ReservationRecord>, StoreError> {
        Ok(self.select(Reservation::is_active))
    }

    fn delete_all_for_resource(&self, resource_id: &ResourceId) -> Result<usize, StoreError> {
        let mut guard = self.records.lock().expect("store mutex poisoned");
        let before = guard.len();
        guard.retain(|_, record| &record.reservation.resource_id != resource_id);
        Ok(before - guard.len())
    }
}

#[derive(Debug, Default, Clone)]
pub struct InMemoryVehicleDirectory {
    vehicles: Arc<Mutex<HashMap<ResourceId, ResourceSnapshot>>>,
}

impl InMemoryVehicleDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_vehicles<I>(vehicles: I) -> Self
    where
        I: IntoIterator<Item = ResourceSnapshot>,
    {
        let directory = Self::default();
        for vehicle in vehicles {
            directory.upsert(vehicle);
        }
        directory
    }

    pub fn upsert(&self, snapshot: ResourceSnapshot) {
        self.vehicles
            .lock()
            .expect("directory mutex poisoned")
            .insert(snapshot.resource_id.clone(), snapshot);
    }

    pub fn remove(&self, resource_id: &ResourceId) -> Option<ResourceSnapshot> {
        self.vehicles
            .lock()
            .expect("directory mutex poisoned")
            .remove(resource_id)
    }
}

impl VehicleDirectory for InMemoryVehicleDirectory {
    fn snapshot(&self, resource_id: &ResourceId) -> Result<Option<ResourceSnapshot>, DirectoryError> {
        let guard = self.vehicles.lock().expect("directory mutex poisoned");
        Ok(guard.get(resource_id).cloned())
    }
}
