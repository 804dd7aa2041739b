use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};

use super::domain::{Reservation, ReservationId, ReservationWindow, ResourceId};

type WindowKey = (DateTime<Utc>, ReservationId);

/// Active windows for a single resource ordered by start.
#[derive(Debug, Default)]
struct ResourceWindows {
    by_start: BTreeMap<WindowKey, DateTime<Utc>>,
}

impl ResourceWindows {
    /// Entries whose start precedes `window.end` and whose end is past `window.start`.
    ///
    /// Rows loaded from the store may overlap each other, so every candidate below
    /// `window.end` is checked.
    fn overlapping<'a>(
        &'a self,
        window: &'a ReservationWindow,
    ) -> impl Iterator<Item = &'a ReservationId> + 'a {
        self.by_start
            .range(..(window.end, ReservationId(String::new())))
            .rev()
            .filter(move |(_, end)| window.start < **end)
            .map(|((_, id), _)| id)
    }

    fn from_active<'a, I>(reservations: I) -> Self
    where
        I: IntoIterator<Item = &'a Reservation>,
    {
        let mut windows = Self::default();
        for reservation in reservations.into_iter().filter(|r| r.is_active()) {
            windows.insert(reservation.id.clone(), reservation.window);
        }
        windows
    }

    fn len(&self) -> usize {
        self.by_start.len()
    }

    fn insert(&mut self, id: ReservationId, window: ReservationWindow) {
        self.by_start.insert((window.start, id), window.end);
    }

    fn remove(&mut self, id: &ReservationId, window: &ReservationWindow) -> bool {
        self.by_start.remove(&(window.start, id.clone())).is_some()
    }
}

/// Per-resource index of active (`PENDING`/`CONFIRMED`) reservation windows.
///
/// A resource is present once its windows were loaded from the store, even when it
/// currently holds none. Callers serialize writers per resource; the internal mutex only
/// keeps the map itself consistent across resources.
#[derive(Debug, Default)]
pub struct AvailabilityIndex {
    resources: Mutex<HashMap<ResourceId, ResourceWindows>>,
}

impl AvailabilityIndex {
    pub fn new() -> Self {
        Self::default()
    }

    fn resources(&self) -> MutexGuard<'_, HashMap<ResourceId, ResourceWindows>> {
        self.resources
            .lock()
            .expect("availability index mutex poisoned")
    }

    pub fn is_loaded(&self, resource_id: &ResourceId) -> bool {
        self.resources().contains_key(resource_id)
    }

    /// Replace the windows of one resource with the active reservations given.
    pub fn load_resource<'a, I>(&self, resource_id: &ResourceId, reservations: I) -> usize
    where
        I: IntoIterator<Item = &'a Reservation>,
    {
        let windows = ResourceWindows::from_active(
            reservations
                .into_iter()
                .filter(|reservation| &reservation.resource_id == resource_id),
        );
        let count = windows.len();
        self.resources().insert(resource_id.clone(), windows);
        count
    }

    pub fn has_overlap(&self, resource_id: &ResourceId, window: &ReservationWindow) -> bool {
        self.resources()
            .get(resource_id)
            .map(|windows| windows.overlapping(window).next().is_some())
            .unwrap_or(false)
    }

    /// Reservation ids whose active window overlaps `window`, latest start first.
    pub fn conflicts(
        &self,
        resource_id: &ResourceId,
        window: &ReservationWindow,
    ) -> Vec<ReservationId> {
        self.resources()
            .get(resource_id)
            .map(|windows| windows.overlapping(window).cloned().collect())
            .unwrap_or_default()
    }

    pub fn register(&self, reservation: &Reservation) {
        self.resources()
            .entry(reservation.resource_id.clone())
            .or_default()
            .insert(reservation.id.clone(), reservation.window);
    }

    /// Returns `false` when the window was not present.
    pub fn release(&self, reservation: &Reservation) -> bool {
        self.resources()
            .get_mut(&reservation.resource_id)
            .map(|windows| windows.remove(&reservation.id, &reservation.window))
            .unwrap_or(false)
    }

    /// Forget a resource entirely; it counts as unloaded afterwards.
    pub fn clear_resource(&self, resource_id: &ResourceId) -> usize {
        self.resources()
            .remove(resource_id)
            .map(|windows| windows.len())
            .unwrap_or(0)
    }

    /// Replace the whole index with the active reservations in `reservations`.
    pub fn rebuild<'a, I>(&self, reservations: I) -> usize
    where
        I: IntoIterator<Item = &'a Reservation>,
    {
        let mut grouped: HashMap<ResourceId, Vec<&Reservation>> = HashMap::new();
        for reservation in reservations {
            grouped
                .entry(reservation.resource_id.clone())
                .or_default()
                .push(reservation);
        }
        let rebuilt: HashMap<ResourceId, ResourceWindows> = grouped
            .into_iter()
            .map(|(resource_id, rows)| (resource_id, ResourceWindows::from_active(rows)))
            .collect();
        let count = rebuilt.values().map(ResourceWindows::len).sum();
        *self.resources() = rebuilt;
        count
    }

    /// Active windows for `resource_id` ordered by start.
    pub fn active_windows(
        &self,
        resource_id: &ResourceId,
    ) -> Vec<(ReservationId, ReservationWindow)> {
        self.resources()
            .get(resource_id)
            .map(|windows| {
                windows
                    .by_start
                    .iter()
                    .map(|((start, id), end)| (id.clone(), ReservationWindow::new(*start, *end)))
                    .collect()
            })
            .unwrap_or_default()
    }
}
