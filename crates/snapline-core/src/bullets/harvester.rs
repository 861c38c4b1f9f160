use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use crossbeam_channel::{Receiver, Sender, TrySendError};
use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::bullets::{BulletRecord, BulletSnapshot};
use crate::memory::MemoryReader;
use crate::offset::OffsetsCollection;
use crate::settings::{BulletMode, BulletModeWatch, SharedSettings};
use crate::sync::SnapshotCell;
use crate::world::WorldSnapshot;

/// Bullet addresses waiting for the consumer
pub const QUEUE_CAPACITY: usize = 256;

/// Bullets whose motion fields are owned by the freeze path.
///
/// Has its own lock, independent of the bullet snapshot.
#[derive(Debug, Clone, Default)]
pub struct FrozenBullets {
    inner: Arc<Mutex<HashSet<u64>>>,
}

impl FrozenBullets {
    /// Returns `true` if the address was not frozen yet.
    pub fn insert(&self, address: u64) -> bool {
        self.inner.lock().insert(address)
    }

    pub fn remove(&self, address: u64) -> bool {
        self.inner.lock().remove(&address)
    }

    pub fn contains(&self, address: u64) -> bool {
        self.inner.lock().contains(&address)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    fn members(&self) -> Vec<u64> {
        self.inner.lock().iter().copied().collect()
    }
}

/// The two loops of the harvester plus their shared state.
pub struct BulletHarvester {
    pub collector: BulletCollector,
    pub consumer: BulletConsumer,
}

impl BulletHarvester {
    pub fn new(
        reader: MemoryReader,
        offsets: Arc<OffsetsCollection>,
        settings: SharedSettings,
        world: Arc<SnapshotCell<WorldSnapshot>>,
    ) -> Self {
        let (sender, receiver) = crossbeam_channel::bounded(QUEUE_CAPACITY);
        let frozen = FrozenBullets::default();

        Self {
            collector: BulletCollector {
                reader: reader.clone(),
                offsets: Arc::clone(&offsets),
                settings: settings.clone(),
                queue: sender,
                frozen: frozen.clone(),
                last_enqueued: 0,
                modes: BulletModeWatch::default(),
            },
            consumer: BulletConsumer {
                reader,
                offsets,
                settings,
                queue: receiver,
                frozen,
                world,
                back: Vec::new(),
                generation: 0,
                published: Arc::new(SnapshotCell::default()),
            },
        }
    }

    pub fn frozen(&self) -> FrozenBullets {
        self.collector.frozen.clone()
    }

    pub fn snapshots(&self) -> Arc<SnapshotCell<BulletSnapshot>> {
        self.consumer.snapshots()
    }
}

/// High-frequency loop watching the host's current-bullet slot.
pub struct BulletCollector {
    reader: MemoryReader,
    offsets: Arc<OffsetsCollection>,
    settings: SharedSettings,
    queue: Sender<u64>,
    frozen: FrozenBullets,
    last_enqueued: u64,
    modes: BulletModeWatch,
}

impl BulletCollector {
    pub fn cycle(&mut self) {
        let settings = self.settings.current();
        if !settings.bullets_wanted() {
            return;
        }

        let Ok(address) = self
            .offsets
            .current_bullet
            .resolve(&self.reader)
            .and_then(|slot| self.reader.read_u64(slot))
        else {
            return;
        };
        if address == 0 || address == self.last_enqueued {
            return;
        }

        let fields = &self.offsets.bullet;
        if !self
            .reader
            .read_bool(address + fields.is_alive)
            .unwrap_or(false)
        {
            return;
        }

        if self.modes.check(&settings, "bullet collector") == Some(BulletMode::Freeze)
            && self.frozen.insert(address)
        {
            if let Err(e) = self.reader.write(address + fields.speed, 0.0f32) {
                debug!("Freeze of bullet {:#x} failed: {}", address, e);
                self.frozen.remove(address);
            }
        }

        match self.queue.try_send(address) {
            Ok(()) => {
                trace!("queued bullet {:#x}", address);
                self.last_enqueued = address;
            }
            // consumer is behind; the slot is looked at again next cycle
            Err(TrySendError::Full(_)) => {}
            Err(TrySendError::Disconnected(_)) => {}
        }
    }
}

/// Drains the queue, maintains the bullet set and publishes it.
pub struct BulletConsumer {
    reader: MemoryReader,
    offsets: Arc<OffsetsCollection>,
    settings: SharedSettings,
    queue: Receiver<u64>,
    frozen: FrozenBullets,
    world: Arc<SnapshotCell<WorldSnapshot>>,
    back: Vec<BulletRecord>,
    generation: u64,
    published: Arc<SnapshotCell<BulletSnapshot>>,
}

impl BulletConsumer {
    pub fn snapshots(&self) -> Arc<SnapshotCell<BulletSnapshot>> {
        Arc::clone(&self.published)
    }

    pub fn cycle(&mut self) -> Arc<BulletSnapshot> {
        let settings = self.settings.current();
        let world = self.world.load();
        let now = Instant::now();

        for record in &mut self.back {
            refresh(&self.reader, &self.offsets, record);
        }

        for address in self.queue.try_iter().take(settings.harvester.batch_size) {
            if self.back.iter().any(|b| b.address == address) {
                continue;
            }
            if let Some(record) = read_bullet(&self.reader, &self.offsets, address, now) {
                self.back.push(record);
            }
        }

        let ttl = settings.harvester.bullet_ttl();
        self.back.retain(|b| b.alive && !b.is_expired(now, ttl));
        self.reap_frozen();

        for record in &mut self.back {
            record.frozen = self.frozen.contains(record.address);
            record.project_tracer(&world.view_matrix, world.screen);
        }

        self.generation += 1;
        let snapshot = Arc::new(BulletSnapshot {
            generation: self.generation,
            bullets: self.back.clone(),
            frozen: self.frozen.len(),
        });
        self.published.publish_arc(Arc::clone(&snapshot));
        snapshot
    }

    /// Drop frozen addresses whose object is gone. Liveness is read outside
    /// the frozen-set lock.
    fn reap_frozen(&self) {
        let is_alive = self.offsets.bullet.is_alive;
        for address in self.frozen.members() {
            if !self
                .reader
                .read_bool(address + is_alive)
                .unwrap_or(false)
            {
                self.frozen.remove(address);
            }
        }
    }
}

/// Full read of a newly seen bullet; `None` unless it reports alive.
fn read_bullet(
    reader: &MemoryReader,
    offsets: &OffsetsCollection,
    address: u64,
    now: Instant,
) -> Option<BulletRecord> {
    let fields = &offsets.bullet;
    if !reader.read_bool(address + fields.is_alive).ok()? {
        return None;
    }

    let mut record = BulletRecord {
        address,
        first_seen: now,
        position: Default::default(),
        start_position: reader
            .read_vec3(address + fields.start_position)
            .unwrap_or_default(),
        direction: Default::default(),
        speed: 0.0,
        alive: true,
        checksum: 0,
        frozen: false,
        tracer_start: None,
        tracer_end: None,
    };
    refresh(reader, offsets, &mut record);
    Some(record)
}

/// Re-read the fields that change while a bullet flies. An unreadable
/// liveness flag counts as dead.
fn refresh(reader: &MemoryReader, offsets: &OffsetsCollection, record: &mut BulletRecord) {
    let fields = &offsets.bullet;
    let address = record.address;

    record.alive = reader
        .read_bool(address + fields.is_alive)
        .unwrap_or(false);
    if !record.alive {
        return;
    }

    record.position = reader
        .read_vec3(address + fields.position)
        .unwrap_or(record.position);
    record.direction = reader
        .read_vec3(address + fields.direction)
        .unwrap_or(record.direction);
    record.speed = reader
        .read_f32(address + fields.speed)
        .unwrap_or(record.speed);
    record.checksum = reader
        .read_u32(address + fields.checksum)
        .unwrap_or(record.checksum);
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use glam::Vec3;

    use super::*;
    use crate::fixture::FakeWorld;
    use crate::settings::Settings;

    fn harvester(world: &FakeWorld, configure: impl FnOnce(&mut Settings)) -> BulletHarvester {
        let mut settings = Settings::default();
        settings.esp.bullets = true;
        configure(&mut settings);
        BulletHarvester::new(
            world.reader.clone(),
            Arc::clone(&world.offsets),
            SharedSettings::new(settings),
            Arc::new(SnapshotCell::default()),
        )
    }

    fn fire_and_collect(world: &FakeWorld, harvester: &mut BulletHarvester, address: u64) {
        world.fire(address);
        harvester.collector.cycle();
    }

    #[test]
    fn test_bullet_lifecycle() {
        let mut world = FakeWorld::new();
        let bullet = world.add_bullet(Vec3::new(1.0, 2.0, 3.0), Vec3::Z, 450.0);
        let mut harvester = harvester(&world, |_| {});

        fire_and_collect(&world, &mut harvester, bullet);
        let snapshot = harvester.consumer.cycle();
        let record = snapshot.get(bullet).unwrap();
        assert_eq!(record.position, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(record.speed, 450.0);
        assert!(!record.frozen);

        world.set_bullet_alive(bullet, false);
        assert!(harvester.consumer.cycle().is_empty());
        assert!(harvester.snapshots().load().is_empty());
    }

    #[test]
    fn test_live_fields_follow_the_host() {
        let mut world = FakeWorld::new();
        let bullet = world.add_bullet(Vec3::ZERO, Vec3::X, 100.0);
        let mut harvester = harvester(&world, |_| {});

        fire_and_collect(&world, &mut harvester, bullet);
        harvester.consumer.cycle();

        world.mock.poke(bullet + 0x10, [7.0f32, 0.0, 0.0, 1.0]);
        let snapshot = harvester.consumer.cycle();
        assert_eq!(snapshot.get(bullet).unwrap().position.x, 7.0);
    }

    #[test]
    fn test_expired_bullets_are_dropped() {
        let mut world = FakeWorld::new();
        let bullet = world.add_bullet(Vec3::ZERO, Vec3::Z, 100.0);
        let mut harvester = harvester(&world, |s| s.harvester.bullet_ttl_ms = 1);

        fire_and_collect(&world, &mut harvester, bullet);
        assert_eq!(harvester.consumer.cycle().len(), 1);

        std::thread::sleep(Duration::from_millis(5));
        assert!(harvester.consumer.cycle().is_empty());
    }

    #[test]
    fn test_duplicate_and_dead_addresses_are_skipped() {
        let mut world = FakeWorld::new();
        let a = world.add_bullet(Vec3::ZERO, Vec3::Z, 100.0);
        let b = world.add_bullet(Vec3::ZERO, Vec3::Z, 100.0);
        let dead = world.add_bullet(Vec3::ZERO, Vec3::Z, 100.0);
        world.set_bullet_alive(dead, false);
        let mut harvester = harvester(&world, |_| {});

        fire_and_collect(&world, &mut harvester, a);
        // same slot value twice is queued once
        harvester.collector.cycle();
        fire_and_collect(&world, &mut harvester, b);
        fire_and_collect(&world, &mut harvester, a);
        fire_and_collect(&world, &mut harvester, dead);

        let snapshot = harvester.consumer.cycle();
        assert_eq!(snapshot.len(), 2);
        assert!(snapshot.get(dead).is_none());
    }

    #[test]
    fn test_batch_size_limits_each_cycle() {
        let mut world = FakeWorld::new();
        let bullets: Vec<u64> = (0..3)
            .map(|_| world.add_bullet(Vec3::ZERO, Vec3::Z, 100.0))
            .collect();
        let mut harvester = harvester(&world, |s| s.harvester.batch_size = 2);

        for &bullet in &bullets {
            fire_and_collect(&world, &mut harvester, bullet);
        }

        assert_eq!(harvester.consumer.cycle().len(), 2);
        assert_eq!(harvester.consumer.cycle().len(), 3);
    }

    #[test]
    fn test_freeze_on_first_sight() {
        let mut world = FakeWorld::new();
        let a = world.add_bullet(Vec3::ZERO, Vec3::Z, 300.0);
        let b = world.add_bullet(Vec3::ZERO, Vec3::Z, 300.0);
        let mut harvester = harvester(&world, |s| s.harvester.freeze_on_sight = true);
        let frozen = harvester.frozen();

        fire_and_collect(&world, &mut harvester, a);
        assert_eq!(world.bullet_speed(a), 0.0);
        assert!(frozen.contains(a));

        fire_and_collect(&world, &mut harvester, b);
        fire_and_collect(&world, &mut harvester, a);
        let speed_writes = world
            .mock
            .writes()
            .iter()
            .filter(|(address, _)| *address == a + 0x3C)
            .count();
        assert_eq!(speed_writes, 1);

        let snapshot = harvester.consumer.cycle();
        assert!(snapshot.get(a).unwrap().frozen);
        assert_eq!(snapshot.frozen, 2);

        world.set_bullet_alive(a, false);
        harvester.consumer.cycle();
        assert!(!frozen.contains(a));
        assert_eq!(frozen.len(), 1);
    }

    #[test]
    fn test_conflicting_modes_suspend_freeze() {
        let mut world = FakeWorld::new();
        let bullet = world.add_bullet(Vec3::ZERO, Vec3::Z, 300.0);
        let mut harvester = harvester(&world, |s| {
            s.harvester.freeze_on_sight = true;
            s.redirect.enabled = true;
        });

        fire_and_collect(&world, &mut harvester, bullet);
        assert!(world.mock.writes().is_empty());
        assert!(harvester.frozen().is_empty());
        assert_eq!(harvester.consumer.cycle().len(), 1);
    }

    #[test]
    fn test_idle_when_nothing_wants_bullets() {
        let mut world = FakeWorld::new();
        let bullet = world.add_bullet(Vec3::ZERO, Vec3::Z, 300.0);
        let mut harvester = harvester(&world, |s| s.esp.bullets = false);

        fire_and_collect(&world, &mut harvester, bullet);
        assert!(harvester.consumer.cycle().is_empty());
    }
}
