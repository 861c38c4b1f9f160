use std::time::{Duration, Instant};

use glam::{Vec2, Vec3};

use crate::math::{ScreenSize, ViewMatrix, world_to_screen};

/// Tracer length behind the bullet, in units of its direction vector
pub const TRACER_LENGTH: f32 = 2.5;

/// One projectile observed in the host.
///
/// `address` identifies the host object only while it is alive and younger
/// than the TTL. The host recycles bullet slots, and a slot reused inside
/// one TTL window is indistinguishable from the original bullet.
#[derive(Debug, Clone, PartialEq)]
pub struct BulletRecord {
    pub address: u64,
    pub first_seen: Instant,
    pub position: Vec3,
    pub start_position: Vec3,
    pub direction: Vec3,
    pub speed: f32,
    pub alive: bool,
    pub checksum: u32,
    /// Speed is pinned by the freeze path
    pub frozen: bool,
    pub tracer_start: Option<Vec2>,
    pub tracer_end: Option<Vec2>,
}

impl BulletRecord {
    pub fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.first_seen)
    }

    pub fn is_expired(&self, now: Instant, ttl: Duration) -> bool {
        self.age(now) > ttl
    }

    pub fn tracer_origin(&self) -> Vec3 {
        self.position - self.direction * TRACER_LENGTH
    }

    pub fn project_tracer(&mut self, matrix: &ViewMatrix, screen: ScreenSize) {
        self.tracer_start = world_to_screen(self.tracer_origin(), matrix, screen);
        self.tracer_end = world_to_screen(self.position, matrix, screen);
    }

    /// Either end of the tracer is on screen.
    pub fn is_tracer_visible(&self) -> bool {
        self.tracer_start.is_some() || self.tracer_end.is_some()
    }
}

#[derive(Debug, Clone, Default)]
pub struct BulletSnapshot {
    pub generation: u64,
    pub bullets: Vec<BulletRecord>,
    /// Size of the frozen set at publication
    pub frozen: usize,
}

impl BulletSnapshot {
    pub fn get(&self, address: u64) -> Option<&BulletRecord> {
        self.bullets.iter().find(|b| b.address == address)
    }

    pub fn len(&self) -> usize {
        self.bullets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bullets.is_empty()
    }
}
