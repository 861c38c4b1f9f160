//! Bullet redirection: synthetic trajectory toward the current target.

mod engine;
mod trajectory;

pub use engine::{RedirectEngine, RedirectOutcome, RedirectStats};
pub use trajectory::{aim_point, heading, placement};
