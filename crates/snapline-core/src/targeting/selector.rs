use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::settings::SharedSettings;
use crate::sync::SnapshotCell;
use crate::targeting::select_target;
use crate::world::{EntityRecord, WorldSnapshot};

/// The published selection result.
///
/// Holds a copy of the entity, so it stays valid after the snapshot it came
/// from is replaced.
#[derive(Debug, Clone, Default)]
pub struct CurrentTarget {
    inner: Arc<Mutex<Option<EntityRecord>>>,
}

impl CurrentTarget {
    pub fn get(&self) -> Option<EntityRecord> {
        self.inner.lock().clone()
    }

    pub fn set(&self, target: Option<EntityRecord>) {
        *self.inner.lock() = target;
    }
}

/// Polling loop state for target selection.
pub struct TargetSelector {
    world: Arc<SnapshotCell<WorldSnapshot>>,
    settings: SharedSettings,
    neutral_faction: u32,
    current: CurrentTarget,
    last_address: Option<u64>,
}

impl TargetSelector {
    pub fn new(
        world: Arc<SnapshotCell<WorldSnapshot>>,
        settings: SharedSettings,
        neutral_faction: u32,
    ) -> Self {
        Self {
            world,
            settings,
            neutral_faction,
            current: CurrentTarget::default(),
            last_address: None,
        }
    }

    pub fn current(&self) -> CurrentTarget {
        self.current.clone()
    }

    pub fn cycle(&mut self) -> Option<EntityRecord> {
        let settings = self.settings.current();
        let snapshot = self.world.load();

        let target = if settings.targeting.enabled {
            select_target(&snapshot, &settings, self.neutral_faction).cloned()
        } else {
            None
        };

        let address = target.as_ref().map(|t| t.address);
        if address != self.last_address {
            match &target {
                Some(t) => debug!(
                    "Target {:#x} ({}, {:.1}m)",
                    t.address, t.category, t.distance
                ),
                None => debug!("Target lost"),
            }
            self.last_address = address;
        }

        self.current.set(target.clone());
        target
    }
}
