use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use super::domain::ResourceId;

/// Held while a resource's reservations are checked or mutated.
///
/// Dropping the guard releases the resource.
#[derive(Debug)]
pub struct ResourceGuard {
    resource_id: ResourceId,
    _guard: OwnedMutexGuard<()>,
}

impl ResourceGuard {
    pub fn resource_id(&self) -> &ResourceId {
        &self.resource_id
    }
}

impl Drop for ResourceGuard {
    fn drop(&mut self) {
        tracing::trace!(resource_id = %self.resource_id, "released resource lock");
    }
}

/// The lock could not be taken before the deadline elapsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("timed out after {waited:?} waiting for resource {resource_id}")]
pub struct LockTimeout {
    pub resource_id: ResourceId,
    pub waited: Duration,
}

/// Keyed table of per-resource async mutexes.
///
/// Acquisition order on a single resource is FIFO, which gives every operation on that
/// resource a total order. Distinct resources never contend.
#[derive(Debug, Default)]
pub struct ResourceLocks {
    table: Mutex<HashMap<ResourceId, Arc<AsyncMutex<()>>>>,
}

impl ResourceLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, resource_id: &ResourceId) -> Arc<AsyncMutex<()>> {
        let mut table = self.table.lock().expect("lock table mutex poisoned");
        table
            .entry(resource_id.clone())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }

    pub async fn acquire(
        &self,
        resource_id: &ResourceId,
        deadline: Duration,
    ) -> Result<ResourceGuard, LockTimeout> {
        let slot = self.slot(resource_id);
        match tokio::time::timeout(deadline, slot.lock_owned()).await {
            Ok(guard) => {
                tracing::trace!(resource_id = %resource_id, "acquired resource lock");
                Ok(ResourceGuard {
                    resource_id: resource_id.clone(),
                    _guard: guard,
                })
            }
            Err(_) => Err(LockTimeout {
                resource_id: resource_id.clone(),
                waited: deadline,
            }),
        }
    }

    /// Drop table entries nobody holds or waits on.
    pub fn prune(&self) -> usize {
        let mut table = self.table.lock().expect("lock table mutex poisoned");
        let before = table.len();
        table.retain(|_, slot| Arc::strong_count(slot) > 1);
        before - table.len()
    }

    pub fn len(&self) -> usize {
        self.table.lock().expect("lock table mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
