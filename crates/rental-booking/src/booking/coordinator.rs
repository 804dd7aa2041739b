use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::availability::AvailabilityIndex;
use super::clock::{Clock, SystemClock};
use super::domain::{
    Reservation, ReservationId, ReservationStatus, ReservationWindow, ResourceId, UserId,
};
use super::lifecycle::{validate_window, LifecycleError, ReservationLifecycle};
use super::locks::{LockTimeout, ResourceGuard, ResourceLocks};
use super::repository::{
    DirectoryError, ReservationRecord, ReservationStore, StoreError, VehicleDirectory,
};
use crate::config::BookingConfig;

/// Coarse classification callers use to map failures onto their own status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    ResourceUnavailable,
    Conflict,
    Forbidden,
    InvalidTransition,
    InvalidWindow,
    Busy,
    Transient,
}

/// Error raised by the reservation coordinator.
#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("resource {0} not found")]
    ResourceNotFound(ResourceId),
    #[error("reservation {0} not found")]
    ReservationNotFound(ReservationId),
    #[error("resource {resource_id} already has an active reservation overlapping {window}")]
    Conflict {
        resource_id: ResourceId,
        window: ReservationWindow,
        conflicting: Vec<ReservationId>,
    },
    #[error("user {actor} may not {action} reservation {reservation_id}")]
    Forbidden {
        reservation_id: ReservationId,
        actor: UserId,
        action: &'static str,
    },
    #[error(transparent)]
    Busy(#[from] LockTimeout),
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
    #[error(transparent)]
    Store(#[from] StoreError),
    /// The store failed while inserting; the row may or may not exist.
    #[error("reservation insert failed: {0}")]
    Insert(#[source] StoreError),
    #[error(transparent)]
    Directory(#[from] DirectoryError),
}

impl BookingError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BookingError::ResourceNotFound(_) | BookingError::ReservationNotFound(_) => {
                ErrorKind::NotFound
            }
            BookingError::Conflict { .. } => ErrorKind::Conflict,
            BookingError::Forbidden { .. } => ErrorKind::Forbidden,
            BookingError::Busy(_) => ErrorKind::Busy,
            BookingError::Lifecycle(err) => match err {
                LifecycleError::InvalidWindow { .. } | LifecycleError::PriceOverflow { .. } => {
                    ErrorKind::InvalidWindow
                }
                LifecycleError::ResourceUnavailable { .. } | LifecycleError::MissingOwner { .. } => {
                    ErrorKind::ResourceUnavailable
                }
                LifecycleError::InvalidTransition { .. } => ErrorKind::InvalidTransition,
            },
            BookingError::Store(err) | BookingError::Insert(err) => match err {
                StoreError::NotFound(_) => ErrorKind::NotFound,
                StoreError::Duplicate(_) => ErrorKind::Conflict,
                StoreError::VersionConflict { .. } | StoreError::Unavailable(_) => {
                    ErrorKind::Transient
                }
            },
            BookingError::Directory(DirectoryError::Unavailable(_)) => ErrorKind::Transient,
        }
    }

    /// Lock timeouts and transient failures may be retried by the caller, except a failed
    /// insert: `create` carries no idempotency key, so a retry could book twice.
    pub fn is_retryable(&self) -> bool {
        match self {
            BookingError::Insert(_) => false,
            _ => matches!(self.kind(), ErrorKind::Busy | ErrorKind::Transient),
        }
    }
}

/// Owner- or requester-initiated status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StatusChange {
    Confirm,
    Reject,
    Cancel,
}

impl StatusChange {
    const fn target(self) -> ReservationStatus {
        match self {
            StatusChange::Confirm => ReservationStatus::Confirmed,
            StatusChange::Reject => ReservationStatus::Rejected,
            StatusChange::Cancel => ReservationStatus::Canceled,
        }
    }

    const fn verb(self) -> &'static str {
        match self {
            StatusChange::Confirm => "confirm",
            StatusChange::Reject => "reject",
            StatusChange::Cancel => "cancel",
        }
    }

    fn authorized(self, reservation: &Reservation, actor: &UserId) -> bool {
        match self {
            StatusChange::Confirm | StatusChange::Reject => &reservation.resource_owner_id == actor,
            StatusChange::Cancel => &reservation.requester_id == actor,
        }
    }
}

/// Orchestrates reservation creation and status changes under per-resource exclusivity.
pub struct ReservationCoordinator<S, D> {
    store: Arc<S>,
    directory: Arc<D>,
    index: AvailabilityIndex,
    locks: ResourceLocks,
    lifecycle: ReservationLifecycle,
    clock: Arc<dyn Clock>,
    lock_timeout: Duration,
}

impl<S, D> ReservationCoordinator<S, D>
where
    S: ReservationStore + 'static,
    D: VehicleDirectory + 'static,
{
    pub fn new(store: Arc<S>, directory: Arc<D>, config: &BookingConfig) -> Self {
        Self::with_clock(store, directory, config, Arc::new(SystemClock))
    }

    pub fn with_clock(
        store: Arc<S>,
        directory: Arc<D>,
        config: &BookingConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            directory,
            index: AvailabilityIndex::new(),
            locks: ResourceLocks::new(),
            lifecycle: ReservationLifecycle,
            clock,
            lock_timeout: config.lock_timeout,
        }
    }

    /// Rebuild the availability index from the store's active reservations.
    ///
    /// Optional warm-up: resources the index has not seen are loaded from the store the
    /// first time their lock is taken. It replaces the index wholesale, so run it before
    /// serving requests.
    pub fn hydrate(&self) -> Result<usize, BookingError> {
        let records = self.store.active()?;
        let count = self
            .index
            .rebuild(records.iter().map(|record| &record.reservation));
        info!(active_reservations = count, "availability index hydrated");
        Ok(count)
    }

    /// Book `resource_id` for `window` on behalf of `requester_id`.
    #[tracing::instrument(skip(self))]
    pub async fn create(
        &self,
        resource_id: &ResourceId,
        requester_id: &UserId,
        window: ReservationWindow,
    ) -> Result<Reservation, BookingError> {
        validate_window(window)?;

        // Snapshot fetch stays outside the resource lock.
        let snapshot = self
            .directory
            .snapshot(resource_id)?
            .ok_or_else(|| BookingError::ResourceNotFound(resource_id.clone()))?;

        let _guard = self.lock_indexed(resource_id).await?;

        let conflicting = self.index.conflicts(resource_id, &window);
        if !conflicting.is_empty() {
            warn!(%resource_id, %window, ?conflicting, "reservation window conflicts");
            return Err(BookingError::Conflict {
                resource_id: resource_id.clone(),
                window,
                conflicting,
            });
        }

        let reservation =
            self.lifecycle
                .create(&snapshot, requester_id.clone(), window, self.clock.now())?;
        let record = self.store.insert(reservation).map_err(BookingError::Insert)?;
        self.index.register(&record.reservation);

        info!(
            reservation_id = %record.reservation.id,
            total_price = %record.reservation.total_price,
            "reservation created"
        );
        Ok(record.reservation)
    }

    #[tracing::instrument(skip(self))]
    pub async fn confirm(
        &self,
        reservation_id: &ReservationId,
        acting_owner_id: &UserId,
    ) -> Result<Reservation, BookingError> {
        self.change_status(reservation_id, acting_owner_id, StatusChange::Confirm)
            .await
    }

    /// Reject a pending reservation, freeing its window.
    #[tracing::instrument(skip(self))]
    pub async fn reject(
        &self,
        reservation_id: &ReservationId,
        acting_owner_id: &UserId,
    ) -> Result<Reservation, BookingError> {
        self.change_status(reservation_id, acting_owner_id, StatusChange::Reject)
            .await
    }

    /// Cancel a pending or confirmed reservation, freeing its window.
    #[tracing::instrument(skip(self))]
    pub async fn cancel(
        &self,
        reservation_id: &ReservationId,
        acting_requester_id: &UserId,
    ) -> Result<Reservation, BookingError> {
        self.change_status(reservation_id, acting_requester_id, StatusChange::Cancel)
            .await
    }

    pub fn get(&self, reservation_id: &ReservationId) -> Result<Reservation, BookingError> {
        Ok(self.load(reservation_id)?.reservation)
    }

    /// Whether `window` is free on `resource_id`, observed under the resource lock.
    pub async fn is_available(
        &self,
        resource_id: &ResourceId,
        window: ReservationWindow,
    ) -> Result<bool, BookingError> {
        validate_window(window)?;
        let _guard = self.lock_indexed(resource_id).await?;
        Ok(!self.index.has_overlap(resource_id, &window))
    }

    /// Active windows currently held on `resource_id`, ordered by start.
    pub async fn active_windows(
        &self,
        resource_id: &ResourceId,
    ) -> Result<Vec<(ReservationId, ReservationWindow)>, BookingError> {
        let _guard = self.lock_indexed(resource_id).await?;
        Ok(self.index.active_windows(resource_id))
    }

    /// Delete every reservation for a resource removed from the listings context.
    #[tracing::instrument(skip(self))]
    pub async fn purge_resource(&self, resource_id: &ResourceId) -> Result<usize, BookingError> {
        let guard = self.acquire(resource_id).await?;
        let removed = self.store.delete_all_for_resource(resource_id)?;
        let released = self.index.clear_resource(resource_id);
        drop(guard);

        let pruned = self.locks.prune();
        info!(%resource_id, removed, released, pruned, "resource reservations purged");
        Ok(removed)
    }

    async fn change_status(
        &self,
        reservation_id: &ReservationId,
        actor: &UserId,
        change: StatusChange,
    ) -> Result<Reservation, BookingError> {
        let resource_id = self.load(reservation_id)?.reservation.resource_id;
        let _guard = self.lock_indexed(&resource_id).await?;

        // Re-read under the lock so the version check sees the latest committed row.
        let record = self.load(reservation_id)?;
        if !change.authorized(&record.reservation, actor) {
            warn!(%reservation_id, %actor, action = change.verb(), "status change forbidden");
            return Err(BookingError::Forbidden {
                reservation_id: reservation_id.clone(),
                actor: actor.clone(),
                action: change.verb(),
            });
        }

        let next = self
            .lifecycle
            .transition(&record.reservation, change.target())?;
        let stored = self.store.update(next, record.version)?;
        if !stored.reservation.is_active() {
            self.index.release(&stored.reservation);
        }

        info!(
            %reservation_id,
            from = %record.reservation.status,
            to = %stored.reservation.status,
            version = stored.version,
            "reservation status changed"
        );
        Ok(stored.reservation)
    }

    fn load(&self, reservation_id: &ReservationId) -> Result<ReservationRecord, BookingError> {
        self.store
            .fetch(reservation_id)?
            .ok_or_else(|| BookingError::ReservationNotFound(reservation_id.clone()))
    }

    /// Number of resources with a lock slot in the table.
    pub fn tracked_resources(&self) -> usize {
        self.locks.len()
    }

    /// Take the resource lock and make sure the index reflects the store for it.
    async fn lock_indexed(&self, resource_id: &ResourceId) -> Result<ResourceGuard, BookingError> {
        let guard = self.acquire(resource_id).await?;
        if !self.index.is_loaded(resource_id) {
            let records = self.store.by_resource(resource_id)?;
            let active = self.index.load_resource(
                resource_id,
                records.iter().map(|record| &record.reservation),
            );
            debug!(%resource_id, active, "availability loaded from store");
        }
        Ok(guard)
    }

    async fn acquire(&self, resource_id: &ResourceId) -> Result<ResourceGuard, BookingError> {
        debug!(%resource_id, timeout = ?self.lock_timeout, "acquiring resource lock");
        self.locks
            .acquire(resource_id, self.lock_timeout)
            .await
            .map_err(|timeout| {
                warn!(%resource_id, waited = ?timeout.waited, "resource lock busy");
                BookingError::Busy(timeout)
            })
    }
}
