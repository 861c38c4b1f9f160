use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::offset::HostConstants;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EntityCategory {
    Infantry,
    PoweredArmor,
    GroundVehicle,
    AirVehicle,
    Turret,
    Other,
    #[default]
    Unknown,
}

impl EntityCategory {
    /// Whether objects of this category carry health and shield fields
    pub fn has_vitals(self) -> bool {
        matches!(
            self,
            Self::Infantry
                | Self::PoweredArmor
                | Self::GroundVehicle
                | Self::AirVehicle
                | Self::Turret
        )
    }

    pub fn is_vehicle(self) -> bool {
        matches!(self, Self::GroundVehicle | Self::AirVehicle)
    }

    /// Aim point for an object of this category standing at `position`.
    pub fn head_position(self, position: Vec3, constants: &HostConstants) -> Vec3 {
        match self {
            Self::Infantry => position + Vec3::Y * constants.infantry_head_height,
            Self::PoweredArmor => position + Vec3::Y * constants.powered_armor_head_height,
            _ => position,
        }
    }
}

/// One world object as observed during a single production cycle.
///
/// Records are built fresh every cycle and never mutated once published.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityRecord {
    /// Object address in the host, used as identity within one snapshot
    pub address: u64,
    pub category: EntityCategory,
    pub type_id: u32,
    pub position: Vec3,
    pub head_position: Vec3,
    pub view_angle: f32,
    pub faction: u32,
    pub health: f32,
    pub health_max: f32,
    pub shield: f32,
    pub shield_max: f32,
    pub distance: f32,
    pub screen_position: Option<Vec2>,
    pub head_screen_position: Option<Vec2>,
    pub alive: bool,
    pub name: String,
}

impl EntityRecord {
    pub fn health_percent(&self) -> f32 {
        ratio(self.health, self.health_max)
    }

    pub fn shield_percent(&self) -> f32 {
        ratio(self.shield, self.shield_max)
    }

    pub fn is_on_screen(&self) -> bool {
        self.screen_position.is_some()
    }
}

fn ratio(current: f32, max: f32) -> f32 {
    if max > 0.0 && current.is_finite() {
        (current / max).clamp(0.0, 1.0)
    } else {
        0.0
    }
}
