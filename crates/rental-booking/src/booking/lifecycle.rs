use chrono::{DateTime, Utc};

use super::domain::{
    ListingStatus, Money, Reservation, ReservationId, ReservationStatus, ReservationWindow,
    ResourceId, ResourceSnapshot, UserId,
};

/// Validation errors raised while creating or transitioning a reservation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LifecycleError {
    #[error("reservation window {window} must start before it ends")]
    InvalidWindow { window: ReservationWindow },
    #[error("resource {resource_id} is {} and cannot take new reservations", status.label())]
    ResourceUnavailable {
        resource_id: ResourceId,
        status: ListingStatus,
    },
    #[error("resource {resource_id} has no known owner")]
    MissingOwner { resource_id: ResourceId },
    #[error("total price overflows for rate {daily_rate} over {days} days")]
    PriceOverflow { daily_rate: Money, days: u64 },
    #[error("cannot move reservation from {current} to {requested}")]
    InvalidTransition {
        current: ReservationStatus,
        requested: ReservationStatus,
    },
}

/// State machine governing a single reservation.
///
/// `PENDING -> CONFIRMED | REJECTED` and `PENDING | CONFIRMED -> CANCELED`. Actor checks
/// (owner for confirm/reject, requester for cancel) belong to the coordinator.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReservationLifecycle;

impl ReservationLifecycle {
    pub fn create(
        &self,
        snapshot: &ResourceSnapshot,
        requester_id: UserId,
        window: ReservationWindow,
        now: DateTime<Utc>,
    ) -> Result<Reservation, LifecycleError> {
        validate_window(window)?;

        if snapshot.status != ListingStatus::Available {
            return Err(LifecycleError::ResourceUnavailable {
                resource_id: snapshot.resource_id.clone(),
                status: snapshot.status,
            });
        }

        let owner = snapshot
            .owner_id
            .clone()
            .filter(|owner| !owner.0.trim().is_empty())
            .ok_or_else(|| LifecycleError::MissingOwner {
                resource_id: snapshot.resource_id.clone(),
            })?;

        let total_price = quote(snapshot.daily_rate, window)?;

        Ok(Reservation {
            id: ReservationId::generate(),
            resource_id: snapshot.resource_id.clone(),
            requester_id,
            resource_owner_id: owner,
            window,
            total_price,
            status: ReservationStatus::Pending,
            created_at: now,
        })
    }

    pub fn transition(
        &self,
        reservation: &Reservation,
        target: ReservationStatus,
    ) -> Result<Reservation, LifecycleError> {
        if !is_allowed(reservation.status, target) {
            return Err(LifecycleError::InvalidTransition {
                current: reservation.status,
                requested: target,
            });
        }

        let mut next = reservation.clone();
        next.status = target;
        Ok(next)
    }
}

pub fn validate_window(window: ReservationWindow) -> Result<(), LifecycleError> {
    if window.is_well_formed() {
        Ok(())
    } else {
        Err(LifecycleError::InvalidWindow { window })
    }
}

/// `daily_rate * max(1, ceil(days))`.
pub fn quote(daily_rate: Money, window: ReservationWindow) -> Result<Money, LifecycleError> {
    let days = window.billable_days();
    daily_rate
        .checked_mul(days)
        .ok_or(LifecycleError::PriceOverflow { daily_rate, days })
}

pub const fn is_allowed(current: ReservationStatus, target: ReservationStatus) -> bool {
    use ReservationStatus::*;
    matches!(
        (current, target),
        (Pending, Confirmed) | (Pending, Rejected) | (Pending, Canceled) | (Confirmed, Canceled)
    )
}
