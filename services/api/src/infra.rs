use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rental_booking::booking::{ListingStatus, Money, ResourceId, ResourceSnapshot, UserId};
use std::io::Write;

use rental_booking::error::AppError;
use serde::Serialize;

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

/// Accepts RFC 3339 timestamps or bare dates (midnight UTC).
pub(crate) fn parse_instant(raw: &str) -> Result<DateTime<Utc>, String> {
    let trimmed = raw.trim();
    if let Ok(instant) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(instant.with_timezone(&Utc));
    }
    parse_date(trimmed)
        .map(midnight)
        .map_err(|_| format!("failed to parse '{raw}' as RFC 3339 or YYYY-MM-DD"))
}

pub(crate) fn midnight(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

pub(crate) fn fleet_owner() -> UserId {
    UserId("owner-demo".to_string())
}

/// Vehicles listed by the demo owner, one per daily rate.
pub(crate) fn demo_fleet(rates: &[u64]) -> Vec<ResourceSnapshot> {
    rates
        .iter()
        .enumerate()
        .map(|(slot, rate)| ResourceSnapshot {
            resource_id: ResourceId(format!("vehicle-{:02}", slot + 1)),
            owner_id: Some(fleet_owner()),
            daily_rate: Money(*rate),
            status: ListingStatus::Available,
        })
        .collect()
}

pub(crate) fn print_json<T: Serialize>(value: &T) -> Result<(), AppError> {
    let rendered = serde_json::to_string_pretty(value)?;
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    writeln!(out, "{rendered}")?;
    Ok(())
}
