use std::f32::consts::FRAC_PI_2;

use glam::Vec3;

use crate::math::horizontal_direction;
use crate::offset::HostConstants;
use crate::world::EntityRecord;

/// Point a redirected bullet should hit.
///
/// The head position already carries the per-category head rule; the body
/// fallback is the entity origin.
pub fn aim_point(target: &EntityRecord, target_head: bool) -> Vec3 {
    if target_head {
        target.head_position
    } else {
        target.position
    }
}

/// Where to place the bullet: just in front of the aim point, along the
/// target's facing.
pub fn placement(aim: Vec3, target_yaw: f32, constants: &HostConstants) -> Vec3 {
    let angle = target_yaw + constants.rotation_offset - FRAC_PI_2;
    aim + horizontal_direction(angle) * constants.redirect_lead
}

/// Unit vector from the placed bullet to the aim point.
pub fn heading(from: Vec3, aim: Vec3) -> Vec3 {
    (aim - from).normalize_or_zero()
}
