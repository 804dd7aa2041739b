use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier wrapper for reservations.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ReservationId(pub String);

impl ReservationId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl fmt::Display for ReservationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a rentable vehicle owned by the listings context.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ResourceId(pub String);

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a platform user, either a renter or a vehicle owner.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Monetary amount in minor currency units.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Money(pub u64);

impl Money {
    pub fn checked_mul(self, factor: u64) -> Option<Money> {
        self.0.checked_mul(factor).map(Money)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Half-open interval `[start, end)` a reservation claims on a resource.
///
/// Construction does not validate ordering; the lifecycle rejects empty or inverted
/// windows so the error surfaces with the rest of the booking validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReservationWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl ReservationWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    pub fn is_well_formed(&self) -> bool {
        self.start < self.end
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    pub fn overlaps(&self, other: &ReservationWindow) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant < self.end
    }

    /// Whole days billed for the window, rounded up with a one-day minimum.
    ///
    /// Any fraction of a day counts, down to the nanosecond.
    pub fn billable_days(&self) -> u64 {
        const NANOS_PER_DAY: i128 = 86_400 * 1_000_000_000;
        let duration = self.duration();
        let nanos = match duration.num_nanoseconds() {
            Some(nanos) => i128::from(nanos),
            None => i128::from(duration.num_milliseconds()) * 1_000_000,
        };
        let days = (nanos.max(0) + NANOS_PER_DAY - 1) / NANOS_PER_DAY;
        u64::try_from(days).unwrap_or(u64::MAX).max(1)
    }
}

impl fmt::Display for ReservationWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start.to_rfc3339(), self.end.to_rfc3339())
    }
}

/// Listing status reported by the vehicle directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingStatus {
    Available,
    Rented,
    Maintenance,
}

impl ListingStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ListingStatus::Available => "available",
            ListingStatus::Rented => "rented",
            ListingStatus::Maintenance => "maintenance",
        }
    }
}

/// Read-only view of a vehicle taken from the listings context at booking time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceSnapshot {
    pub resource_id: ResourceId,
    pub owner_id: Option<UserId>,
    pub daily_rate: Money,
    pub status: ListingStatus,
}

/// Lifecycle status of a reservation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReservationStatus {
    Pending,
    Confirmed,
    Rejected,
    Canceled,
}

impl ReservationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ReservationStatus::Pending => "PENDING",
            ReservationStatus::Confirmed => "CONFIRMED",
            ReservationStatus::Rejected => "REJECTED",
            ReservationStatus::Canceled => "CANCELED",
        }
    }

    /// Active reservations hold their window against overlapping bookings.
    pub const fn is_active(self) -> bool {
        matches!(
            self,
            ReservationStatus::Pending | ReservationStatus::Confirmed
        )
    }
}

impl fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A renter's claim on a resource for a window of time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: ReservationId,
    pub resource_id: ResourceId,
    pub requester_id: UserId,
    pub resource_owner_id: UserId,
    pub window: ReservationWindow,
    pub total_price: Money,
    pub status: ReservationStatus,
    pub created_at: DateTime<Utc>,
}

impl Reservation {
    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    /// Confirmed and fully in the past relative to `now`.
    pub fn is_completed(&self, now: DateTime<Utc>) -> bool {
        self.status == ReservationStatus::Confirmed && self.window.end < now
    }
}
