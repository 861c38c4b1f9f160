//! Vector types and the world-to-screen transform.
//!
//! World space is Y-up. Vectors are `glam` types so they can be read
//! straight out of process memory (`bytemuck::Pod`).

mod projection;

pub use glam::{Mat4, Vec2, Vec3, Vec4};
pub use projection::{ScreenSize, ViewMatrix, world_to_screen};

/// Unit vector in the horizontal plane for a yaw angle (radians).
///
/// Yaw 0 faces +Z; positive yaw turns towards +X.
pub fn horizontal_direction(yaw: f32) -> Vec3 {
    Vec3::new(yaw.sin(), 0.0, yaw.cos()).normalize_or_zero()
}
