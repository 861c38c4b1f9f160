//! Picks at most one entity from the world snapshot each cycle.

mod policy;
mod selector;

pub use policy::{is_eligible, select_target};
pub use selector::{CurrentTarget, TargetSelector};
