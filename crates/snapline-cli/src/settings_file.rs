//! Settings file tracking: initial load and reload on modification.

use snapline_core::settings::{Settings, load_settings, save_settings};
use snapline_core::SharedSettings;
use std::fs;
use std::path::PathBuf;
use std::time::SystemTime;
use tracing::{info, warn};

pub struct SettingsFile {
    path: PathBuf,
    modified: Option<SystemTime>,
}

impl SettingsFile {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            modified: None,
        }
    }

    /// Load the file, writing defaults first if it does not exist.
    pub fn load(&mut self) -> Settings {
        match load_settings(&self.path) {
            Ok(settings) => {
                info!("Loaded settings from {:?}", self.path);
                self.modified = self.modified_time();
                settings
            }
            Err(e) if e.is_not_found() => {
                let settings = Settings::default();
                match save_settings(&self.path, &settings) {
                    Ok(()) => info!("Wrote default settings to {:?}", self.path),
                    Err(e) => warn!("Failed to write default settings: {}", e),
                }
                self.modified = self.modified_time();
                settings
            }
            Err(e) => {
                warn!("Failed to load settings: {}, using defaults", e);
                Settings::default()
            }
        }
    }

    /// Publish the file's contents if it changed since the last load.
    ///
    /// Returns `true` when new settings were published.
    pub fn reload_into(&mut self, shared: &SharedSettings) -> bool {
        let modified = self.modified_time();
        if modified.is_none() || modified == self.modified {
            return false;
        }

        match load_settings(&self.path) {
            Ok(settings) => {
                self.modified = modified;
                shared.replace(settings);
                info!("Reloaded settings from {:?}", self.path);
                true
            }
            Err(e) => {
                warn!("Failed to reload settings: {}", e);
                false
            }
        }
    }

    fn modified_time(&self) -> Option<SystemTime> {
        fs::metadata(&self.path).and_then(|m| m.modified()).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use snapline_core::TargetingMode;
    use std::time::Duration;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_gets_defaults_written() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.txt");

        let mut file = SettingsFile::new(path.clone());
        assert_eq!(file.load(), Settings::default());
        assert!(path.exists());
    }

    #[test]
    fn test_reload_after_change() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.txt");
        fs::write(&path, "targeting.mode=fov\n").unwrap();

        let mut file = SettingsFile::new(path.clone());
        let shared = SharedSettings::new(file.load());
        assert_eq!(shared.current().targeting.mode, TargetingMode::Fov);
        assert!(!file.reload_into(&shared));

        // make sure the timestamp moves on coarse filesystems
        std::thread::sleep(Duration::from_millis(20));
        fs::write(&path, "targeting.mode=health\n").unwrap();
        let later = SystemTime::now() + Duration::from_secs(5);
        fs::File::options()
            .write(true)
            .open(&path)
            .unwrap()
            .set_modified(later)
            .unwrap();

        assert!(file.reload_into(&shared));
        assert_eq!(shared.current().targeting.mode, TargetingMode::Health);
    }
}
