//! Shared store of known interaction zones.
//!
//! The registry is the single source of truth for what is currently on
//! screen. Perception writes to it, the tracker and planner read from it.
//! All mutation happens under one writer lock, so readers always observe a
//! complete update rather than a half-applied batch.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use anyhow::{bail, Result};

use crate::core::geometry::Point;
use crate::core::zone::{Zone, ZonePatch};

#[derive(Debug, Default)]
pub struct ZoneRegistry {
    zones: RwLock<HashMap<String, Zone>>,
}

impl ZoneRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // A poisoned lock still holds coherent data: every critical section
    // below finishes its mutation before any call that could panic.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Zone>> {
        self.zones.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Zone>> {
        self.zones.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add a zone, replacing any existing zone with the same id.
    pub fn register(&self, zone: Zone) -> Result<()> {
        zone.validate()?;
        self.write().insert(zone.id.clone(), zone);
        Ok(())
    }

    /// Add a batch of zones under a single writer lock.
    ///
    /// Validation runs up front; an invalid zone anywhere in the batch
    /// leaves the registry unchanged.
    pub fn register_many(&self, zones: Vec<Zone>) -> Result<usize> {
        for zone in &zones {
            zone.validate()?;
        }
        let count = zones.len();
        let mut map = self.write();
        for zone in zones {
            map.insert(zone.id.clone(), zone);
        }
        Ok(count)
    }

    /// Apply a partial update to an existing zone.
    pub fn update(&self, id: &str, patch: &ZonePatch) -> Result<()> {
        let mut map = self.write();
        let Some(existing) = map.get(id) else {
            bail!("zone not found: {id}");
        };
        let mut updated = existing.clone();
        patch.apply(&mut updated);
        updated.validate()?;
        map.insert(id.to_string(), updated);
        Ok(())
    }

    pub fn remove(&self, id: &str) -> Option<Zone> {
        self.write().remove(id)
    }

    pub fn get(&self, id: &str) -> Option<Zone> {
        self.read().get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.read().contains_key(id)
    }

    pub fn clear(&self) {
        self.write().clear();
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// All zones, ordered by id for stable output.
    pub fn snapshot(&self) -> Vec<Zone> {
        let mut zones: Vec<Zone> = self.read().values().cloned().collect();
        zones.sort_by(|a, b| a.id.cmp(&b.id));
        zones
    }

    /// Swap the whole registry for a freshly perceived set of zones.
    ///
    /// Validates every incoming zone before touching the map, so a bad
    /// batch never destroys the previous state. Returns the new count.
    pub fn replace_all(&self, zones: Vec<Zone>) -> Result<usize> {
        for zone in &zones {
            zone.validate()?;
        }
        let count = zones.len();
        let mut map = self.write();
        map.clear();
        for zone in zones {
            map.insert(zone.id.clone(), zone);
        }
        Ok(count)
    }

    /// Remove zones not seen for longer than `max_age` and return them.
    ///
    /// A zone seen exactly `max_age` ago survives.
    pub fn expire_stale(&self, now: Duration, max_age: Duration) -> Vec<Zone> {
        let mut map = self.write();
        let stale: Vec<String> = map
            .values()
            .filter(|zone| now.saturating_sub(zone.last_seen) > max_age)
            .map(|zone| zone.id.clone())
            .collect();
        stale.into_iter().filter_map(|id| map.remove(&id)).collect()
    }

    /// Refresh a zone's last-seen time. Returns false for unknown ids.
    pub fn touch(&self, id: &str, now: Duration) -> bool {
        self.modify(id, |zone| zone.last_seen = now)
    }

    /// All zones containing `point`, smallest area first so the most
    /// specific zone wins when zones nest. Ties break on id.
    pub fn find_at_point(&self, point: Point) -> Vec<Zone> {
        let mut hits: Vec<Zone> = self
            .read()
            .values()
            .filter(|zone| zone.bounds.contains(point))
            .cloned()
            .collect();
        hits.sort_by(|a, b| {
            a.bounds
                .area()
                .cmp(&b.bounds.area())
                .then_with(|| a.id.cmp(&b.id))
        });
        hits
    }

    /// In-place edit of one zone. The closure must keep the zone valid.
    pub(crate) fn modify(&self, id: &str, f: impl FnOnce(&mut Zone)) -> bool {
        let mut map = self.write();
        match map.get_mut(id) {
            Some(zone) => {
                f(zone);
                true
            }
            None => false,
        }
    }
}
