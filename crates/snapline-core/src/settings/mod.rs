//! Process-wide settings consumed by every component.
//!
//! Every key has a default, so a missing or partial settings file never
//! blocks the core.

mod shared;
mod store;

use std::time::Duration;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};
use tracing::warn;

use crate::error::{Error, Result};

pub use shared::SharedSettings;
pub use store::{load_settings, parse_settings, save_settings, serialize_settings};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub esp: EspSettings,
    pub targeting: TargetingSettings,
    pub harvester: HarvesterSettings,
    pub redirect: RedirectSettings,
    pub world: WorldSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EspSettings {
    pub enabled: bool,
    /// Entities farther than this are left out of the snapshot
    pub max_distance: f32,
    pub show_distance: bool,
    /// Also consider own-faction entities
    pub show_team: bool,
    pub show_infantry: bool,
    pub show_powered_armor: bool,
    pub show_ground_vehicles: bool,
    pub show_air_vehicles: bool,
    pub show_turrets: bool,
    pub show_others: bool,
    /// Track bullets for tracer display
    pub bullets: bool,
}

impl Default for EspSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            max_distance: 500.0,
            show_distance: true,
            show_team: false,
            show_infantry: true,
            show_powered_armor: true,
            show_ground_vehicles: true,
            show_air_vehicles: true,
            show_turrets: true,
            show_others: false,
            bullets: false,
        }
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum TargetingMode {
    /// Closest to the screen center
    Fov,
    /// Inside the FOV radius, then nearest in world space
    #[default]
    SmartFov,
    Distance,
    /// Lowest current health
    Health,
    /// Entity whose name matches `target_name`
    Name,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetingSettings {
    pub enabled: bool,
    pub mode: TargetingMode,
    pub max_distance: f32,
    /// Screen-space radius around the center, in pixels
    pub fov: f32,
    /// Allow own-faction targets
    pub target_team: bool,
    pub target_name: String,
    pub ignore_powered_armor: bool,
    pub ignore_vehicles: bool,
}

impl Default for TargetingSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            mode: TargetingMode::SmartFov,
            max_distance: 300.0,
            fov: 150.0,
            target_team: false,
            target_name: String::new(),
            ignore_powered_armor: true,
            ignore_vehicles: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarvesterSettings {
    /// Zero a bullet's speed the first time it is seen
    pub freeze_on_sight: bool,
    pub bullet_ttl_ms: u64,
    /// Queue entries drained per consumer cycle
    pub batch_size: usize,
}

impl HarvesterSettings {
    pub fn bullet_ttl(&self) -> Duration {
        Duration::from_millis(self.bullet_ttl_ms)
    }
}

impl Default for HarvesterSettings {
    fn default() -> Self {
        Self {
            freeze_on_sight: false,
            bullet_ttl_ms: 5000,
            batch_size: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RedirectSettings {
    pub enabled: bool,
    /// Aim at the head rather than the entity origin
    pub target_head: bool,
}

impl Default for RedirectSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            target_head: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldSettings {
    /// Validity window of the cached view matrix
    pub matrix_cache_ms: u64,
}

impl WorldSettings {
    pub fn matrix_cache(&self) -> Duration {
        Duration::from_millis(self.matrix_cache_ms)
    }
}

impl Default for WorldSettings {
    fn default() -> Self {
        Self {
            matrix_cache_ms: 100,
        }
    }
}

/// What the harvester and the redirect engine may do to live bullets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum BulletMode {
    Off,
    Freeze,
    Redirect,
}

impl Settings {
    /// Resolve the bullet manipulation mode.
    ///
    /// Freeze and redirect write conflicting speeds to the same bullet, so
    /// enabling both is rejected instead of picking one.
    pub fn bullet_mode(&self) -> Result<BulletMode> {
        match (self.harvester.freeze_on_sight, self.redirect.enabled) {
            (true, true) => Err(Error::ConflictingBulletModes),
            (true, false) => Ok(BulletMode::Freeze),
            (false, true) => Ok(BulletMode::Redirect),
            (false, false) => Ok(BulletMode::Off),
        }
    }

    /// Whether anything consumes the bullet snapshot.
    pub fn bullets_wanted(&self) -> bool {
        self.esp.bullets || self.harvester.freeze_on_sight || self.redirect.enabled
    }
}

/// Tracks [`Settings::bullet_mode`] across cycles for one component.
///
/// Yields `None` while freeze and redirect are both enabled and warns once
/// each time that conflict starts.
#[derive(Debug, Default)]
pub struct BulletModeWatch {
    conflicted: bool,
}

impl BulletModeWatch {
    pub fn check(&mut self, settings: &Settings, component: &str) -> Option<BulletMode> {
        match settings.bullet_mode() {
            Ok(mode) => {
                self.conflicted = false;
                Some(mode)
            }
            Err(e) => {
                if !self.conflicted {
                    warn!("{}: {}, bullet writes suspended", component, e);
                    self.conflicted = true;
                }
                None
            }
        }
    }
}
