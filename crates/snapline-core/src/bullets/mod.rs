//! Short-lived projectile tracking.
//!
//! A collector loop watches the host's current-bullet slot and queues new
//! addresses; a consumer loop reads them, expires them by liveness and TTL
//! and publishes a [`BulletSnapshot`].

mod harvester;
mod record;

pub use harvester::{BulletCollector, BulletConsumer, BulletHarvester, FrozenBullets, QUEUE_CAPACITY};
pub use record::{BulletRecord, BulletSnapshot, TRACER_LENGTH};
