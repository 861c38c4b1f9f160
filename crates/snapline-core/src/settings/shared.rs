use std::sync::Arc;

use crate::settings::Settings;
use crate::sync::SnapshotCell;

/// Read-mostly settings view shared by all components.
///
/// Components take [`SharedSettings::current`] once per cycle and work from
/// that value; the configuration side publishes whole new values.
#[derive(Debug, Clone, Default)]
pub struct SharedSettings {
    cell: Arc<SnapshotCell<Settings>>,
}

impl SharedSettings {
    pub fn new(settings: Settings) -> Self {
        Self {
            cell: Arc::new(SnapshotCell::new(settings)),
        }
    }

    pub fn current(&self) -> Arc<Settings> {
        self.cell.load()
    }

    pub fn replace(&self, settings: Settings) {
        self.cell.publish(settings);
    }

    /// Publish a modified copy of the current settings.
    pub fn update(&self, f: impl FnOnce(&mut Settings)) {
        let mut next = Settings::clone(&self.current());
        f(&mut next);
        self.replace(next);
    }
}
