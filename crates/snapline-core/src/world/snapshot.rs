use std::time::{Duration, Instant};

use glam::{Vec2, Vec3};

use crate::math::{ScreenSize, ViewMatrix, world_to_screen};
use crate::world::EntityRecord;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocalPlayer {
    /// Zero when the local player could not be resolved this cycle
    pub address: u64,
    pub position: Vec3,
    pub yaw: f32,
    pub pitch: f32,
    pub is_shooting: bool,
    pub faction: u32,
}

/// Immutable view of the world produced by one cycle.
#[derive(Debug, Clone)]
pub struct WorldSnapshot {
    /// Increases by one with every publication; 0 is the empty startup value
    pub generation: u64,
    pub captured_at: Instant,
    pub production_time: Duration,
    pub local: LocalPlayer,
    pub entities: Vec<EntityRecord>,
    pub view_matrix: ViewMatrix,
    pub screen: ScreenSize,
}

impl WorldSnapshot {
    pub fn empty(screen: ScreenSize) -> Self {
        Self {
            generation: 0,
            captured_at: Instant::now(),
            production_time: Duration::ZERO,
            local: LocalPlayer::default(),
            entities: Vec::new(),
            view_matrix: ViewMatrix::default(),
            screen,
        }
    }

    pub fn world_to_screen(&self, world: Vec3) -> Option<Vec2> {
        world_to_screen(world, &self.view_matrix, self.screen)
    }

    pub fn entity(&self, address: u64) -> Option<&EntityRecord> {
        self.entities.iter().find(|e| e.address == address)
    }

    pub fn age(&self) -> Duration {
        self.captured_at.elapsed()
    }
}

impl Default for WorldSnapshot {
    fn default() -> Self {
        Self::empty(ScreenSize::default())
    }
}
