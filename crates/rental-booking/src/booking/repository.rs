use serde::{Deserialize, Serialize};

use super::domain::{Reservation, ReservationId, ResourceId, ResourceSnapshot, UserId};

/// Stored reservation row with its optimistic-lock counter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationRecord {
    pub reservation: Reservation,
    pub version: u64,
}

impl ReservationRecord {
    pub const INITIAL_VERSION: u64 = 1;

    pub fn new(reservation: Reservation) -> Self {
        Self {
            reservation,
            version: Self::INITIAL_VERSION,
        }
    }
}

/// Durable log of reservations, queried by resource, requester, and owner.
pub trait ReservationStore: Send + Sync {
    /// Persist a new reservation at [`ReservationRecord::INITIAL_VERSION`].
    fn insert(&self, reservation: Reservation) -> Result<ReservationRecord, StoreError>;
    /// Replace the stored row when its version still equals `expected_version`.
    fn update(
        &self,
        reservation: Reservation,
        expected_version: u64,
    ) -> Result<ReservationRecord, StoreError>;
    fn fetch(&self, id: &ReservationId) -> Result<Option<ReservationRecord>, StoreError>;
    fn by_resource(&self, resource_id: &ResourceId) -> Result<Vec<ReservationRecord>, StoreError>;
    fn by_requester(&self, requester_id: &UserId) -> Result<Vec<ReservationRecord>, StoreError>;
    fn by_owner(&self, owner_id: &UserId) -> Result<Vec<ReservationRecord>, StoreError>;
    /// Every `PENDING` or `CONFIRMED` reservation across all resources.
    fn active(&self) -> Result<Vec<ReservationRecord>, StoreError>;
    /// Cascade used when the listings context deletes a resource.
    fn delete_all_for_resource(&self, resource_id: &ResourceId) -> Result<usize, StoreError>;
}

/// Error enumeration for reservation store failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("reservation {0} already exists")]
    Duplicate(ReservationId),
    #[error("reservation {0} not found")]
    NotFound(ReservationId),
    #[error("reservation {id} was modified concurrently (expected version {expected}, found {found})")]
    VersionConflict {
        id: ReservationId,
        expected: u64,
        found: u64,
    },
    #[error("reservation store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Failures a caller may retry after re-reading current state.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            StoreError::VersionConflict { .. } | StoreError::Unavailable(_)
        )
    }
}

/// Read-only view into the listings context.
pub trait VehicleDirectory: Send + Sync {
    fn snapshot(&self, resource_id: &ResourceId) -> Result<Option<ResourceSnapshot>, DirectoryError>;
}

/// Vehicle directory lookup failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DirectoryError {
    #[error("vehicle directory unavailable: {0}")]
    Unavailable(String),
}
