mod cell;
mod signal;
mod worker;

pub use cell::SnapshotCell;
pub use signal::{Signal, StartupPolicy};
pub use worker::{DEFAULT_GRACE, LoopOptions, LoopState, Worker};
