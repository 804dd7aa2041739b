//! Reservation lifecycle and availability coordination for the booking context.
//!
//! [`ReservationCoordinator`] is the write path: it checks a window against the
//! [`AvailabilityIndex`] and persists through a [`ReservationStore`] while holding a
//! per-resource lock. Other contexts read through [`CrossContextFacade`].

pub mod availability;
pub mod clock;
pub mod coordinator;
pub mod domain;
pub mod facade;
pub mod lifecycle;
pub mod locks;
pub mod memory;
pub mod repository;

#[cfg(test)]
mod tests;

pub use availability::AvailabilityIndex;
pub use clock::{Clock, FixedClock, SystemClock};
pub use coordinator::{BookingError, ErrorKind, ReservationCoordinator};
pub use domain::{
    ListingStatus, Money, Reservation, ReservationId, ReservationStatus, ReservationWindow,
    ResourceId, ResourceSnapshot, UserId,
};
pub use facade::{CrossContextFacade, ReservationQueries};
pub use lifecycle::{LifecycleError, ReservationLifecycle};
pub use locks::{LockTimeout, ResourceLocks};
pub use memory::{InMemoryReservationStore, InMemoryVehicleDirectory};
pub use repository::{
    DirectoryError, ReservationRecord, ReservationStore, StoreError, VehicleDirectory,
};
