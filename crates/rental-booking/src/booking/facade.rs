//! Read-only reservation queries offered to the reviews and telemetry contexts.
//!
//! Other contexts depend on [`ReservationQueries`] only; nothing here can write.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::clock::{Clock, SystemClock};
use super::domain::{Reservation, ResourceId, UserId};
use super::repository::{ReservationStore, StoreError};

pub trait ReservationQueries: Send + Sync {
    /// The active reservation on `resource_id` whose window contains `timestamp`.
    fn find_active_reservation_at(
        &self,
        resource_id: &ResourceId,
        timestamp: DateTime<Utc>,
    ) -> Result<Option<Reservation>, StoreError>;

    /// A confirmed reservation by `requester_id` on `resource_id` that has already ended.
    fn has_completed_reservation(
        &self,
        requester_id: &UserId,
        resource_id: &ResourceId,
    ) -> Result<bool, StoreError>;

    fn list_by_requester(&self, requester_id: &UserId) -> Result<Vec<Reservation>, StoreError>;

    fn list_by_owner(&self, owner_id: &UserId) -> Result<Vec<Reservation>, StoreError>;
}

pub struct CrossContextFacade<S> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
}

impl<S> CrossContextFacade<S>
where
    S: ReservationStore + 'static,
{
    pub fn new(store: Arc<S>) -> Self {
        Self::with_clock(store, Arc::new(SystemClock))
    }

    pub fn with_clock(store: Arc<S>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }
}

impl<S> ReservationQueries for CrossContextFacade<S>
where
    S: ReservationStore + 'static,
{
    fn find_active_reservation_at(
        &self,
        resource_id: &ResourceId,
        timestamp: DateTime<Utc>,
    ) -> Result<Option<Reservation>, StoreError> {
        let found = self
            .store
            .by_resource(resource_id)?
            .into_iter()
            .map(|record| record.reservation)
            .filter(|reservation| reservation.is_active() && reservation.window.contains(timestamp))
            .min_by(|a, b| {
                a.window
                    .start
                    .cmp(&b.window.start)
                    .then_with(|| a.id.cmp(&b.id))
            });
        Ok(found)
    }

    fn has_completed_reservation(
        &self,
        requester_id: &UserId,
        resource_id: &ResourceId,
    ) -> Result<bool, StoreError> {
        let now = self.clock.now();
        Ok(self
            .store
            .by_requester(requester_id)?
            .iter()
            .any(|record| {
                &record.reservation.resource_id == resource_id
                    && record.reservation.is_completed(now)
            }))
    }

    fn list_by_requester(&self, requester_id: &UserId) -> Result<Vec<Reservation>, StoreError> {
        Ok(self
            .store
            .by_requester(requester_id)?
            .into_iter()
            .map(|record| record.reservation)
            .collect())
    }

    fn list_by_owner(&self, owner_id: &UserId) -> Result<Vec<Reservation>, StoreError> {
        Ok(self
            .store
            .by_owner(owner_id)?
            .into_iter()
            .map(|record| record.reservation)
            .collect())
    }
}
