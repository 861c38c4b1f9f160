//! Application context: owns every background loop and the state they
//! share, and tears them down in reverse start order.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::bullets::{BulletHarvester, BulletSnapshot};
use crate::error::Result;
use crate::math::ScreenSize;
use crate::memory::MemoryReader;
use crate::offset::OffsetsCollection;
use crate::redirect::{RedirectEngine, RedirectStats};
use crate::settings::SharedSettings;
use crate::sync::{
    DEFAULT_GRACE, LoopOptions, LoopState, Signal, SnapshotCell, StartupPolicy, Worker,
};
use crate::targeting::{CurrentTarget, TargetSelector};
use crate::world::{EntityRecord, WorldProducer, WorldSnapshot};

/// Configuration for the application context
#[derive(Debug, Clone, Copy)]
pub struct ContextConfig {
    /// Viewport used for screen projection
    pub screen: ScreenSize,
    /// Readiness wait and pacing shared by all loops
    pub loops: LoopOptions,
    /// How long teardown waits for each loop
    pub grace: Duration,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            screen: ScreenSize::default(),
            loops: LoopOptions::default(),
            grace: DEFAULT_GRACE,
        }
    }
}

impl ContextConfig {
    pub fn builder() -> ContextConfigBuilder {
        ContextConfigBuilder::default()
    }
}

/// Builder for ContextConfig
#[derive(Debug, Clone, Default)]
pub struct ContextConfigBuilder {
    screen: Option<ScreenSize>,
    startup: Option<StartupPolicy>,
    cadence: Option<Duration>,
    grace: Option<Duration>,
}

impl ContextConfigBuilder {
    pub fn screen(mut self, width: f32, height: f32) -> Self {
        self.screen = Some(ScreenSize::new(width, height));
        self
    }

    pub fn startup(mut self, max_attempts: u32, interval: Duration) -> Self {
        self.startup = Some(StartupPolicy {
            max_attempts,
            interval,
        });
        self
    }

    /// Pause between cycles; zero (the default) only yields
    pub fn cadence(mut self, cadence: Duration) -> Self {
        self.cadence = Some(cadence);
        self
    }

    pub fn grace(mut self, grace: Duration) -> Self {
        self.grace = Some(grace);
        self
    }

    pub fn build(self) -> ContextConfig {
        let default = ContextConfig::default();
        ContextConfig {
            screen: self.screen.unwrap_or(default.screen),
            loops: LoopOptions {
                startup: self.startup.unwrap_or(default.loops.startup),
                cadence: self.cadence.unwrap_or(default.loops.cadence),
            },
            grace: self.grace.unwrap_or(default.grace),
        }
    }
}

/// Every component of one attachment, owned in one place.
pub struct AppContext {
    reader: MemoryReader,
    offsets: Arc<OffsetsCollection>,
    settings: SharedSettings,
    readiness: Arc<Signal>,
    world: Arc<SnapshotCell<WorldSnapshot>>,
    bullets: Arc<SnapshotCell<BulletSnapshot>>,
    target: CurrentTarget,
    redirect_stats: Arc<RedirectStats>,
    workers: Vec<Worker>,
    grace: Duration,
}

impl AppContext {
    /// Build all components and spawn their loops.
    ///
    /// Loops wait on `readiness` before their first cycle. Bullet loops are
    /// only started when the offsets table describes bullets.
    pub fn start(
        reader: MemoryReader,
        offsets: OffsetsCollection,
        settings: SharedSettings,
        readiness: Arc<Signal>,
        config: ContextConfig,
    ) -> Result<Self> {
        let offsets = Arc::new(offsets);

        let mut producer = WorldProducer::new(
            reader.clone(),
            Arc::clone(&offsets),
            settings.clone(),
            config.screen,
        );
        let world = producer.snapshots();

        let harvester = BulletHarvester::new(
            reader.clone(),
            Arc::clone(&offsets),
            settings.clone(),
            Arc::clone(&world),
        );
        let bullets = harvester.snapshots();
        let frozen = harvester.frozen();
        let BulletHarvester {
            mut collector,
            mut consumer,
        } = harvester;

        let mut selector = TargetSelector::new(
            Arc::clone(&world),
            settings.clone(),
            offsets.constants.neutral_faction,
        );
        let target = selector.current();

        let mut redirect = RedirectEngine::new(
            reader.clone(),
            Arc::clone(&offsets),
            settings.clone(),
            target.clone(),
            Arc::clone(&bullets),
            frozen,
        );
        let redirect_stats = redirect.stats();

        let mut context = Self {
            reader,
            offsets: Arc::clone(&offsets),
            settings,
            readiness: Arc::clone(&readiness),
            world,
            bullets,
            target,
            redirect_stats,
            workers: Vec::new(),
            grace: config.grace,
        };

        let spawn = |name: &str, cycle: Box<dyn FnMut() + Send>| {
            Worker::spawn(name, Arc::clone(&readiness), config.loops, cycle)
        };

        context.workers.push(spawn(
            "snapline-world",
            Box::new(move || {
                producer.cycle();
            }),
        )?);
        if offsets.has_bullet_offsets() {
            context.workers.push(spawn(
                "snapline-bullet-collector",
                Box::new(move || collector.cycle()),
            )?);
            context.workers.push(spawn(
                "snapline-bullet-consumer",
                Box::new(move || {
                    consumer.cycle();
                }),
            )?);
        } else {
            warn!("Offsets have no bullet fields, bullet tracking and redirect disabled");
        }
        context.workers.push(spawn(
            "snapline-targeting",
            Box::new(move || {
                selector.cycle();
            }),
        )?);
        if offsets.has_bullet_offsets() {
            context.workers.push(spawn(
                "snapline-redirect",
                Box::new(move || {
                    redirect.cycle();
                }),
            )?);
        }

        info!(
            "Started {} loops for pid {} (offsets {})",
            context.workers.len(),
            context.reader.process_id(),
            context.offsets.version
        );
        Ok(context)
    }

    pub fn reader(&self) -> &MemoryReader {
        &self.reader
    }

    pub fn offsets(&self) -> &OffsetsCollection {
        &self.offsets
    }

    pub fn settings(&self) -> &SharedSettings {
        &self.settings
    }

    pub fn readiness(&self) -> &Signal {
        &self.readiness
    }

    pub fn world_snapshot(&self) -> Arc<WorldSnapshot> {
        self.world.load()
    }

    pub fn bullet_snapshot(&self) -> Arc<BulletSnapshot> {
        self.bullets.load()
    }

    pub fn current_target(&self) -> Option<EntityRecord> {
        self.target.get()
    }

    pub fn redirect_stats(&self) -> &RedirectStats {
        &self.redirect_stats
    }

    pub fn loop_states(&self) -> Vec<(&str, LoopState)> {
        self.workers.iter().map(|w| (w.name(), w.state())).collect()
    }

    /// All loops have stopped, e.g. after a startup timeout.
    pub fn is_stopped(&self) -> bool {
        self.workers.iter().all(|w| w.state() == LoopState::Stopped)
    }

    /// Stop every loop, newest first.
    pub fn shutdown(&mut self) {
        while let Some(mut worker) = self.workers.pop() {
            worker.stop(self.grace);
        }
    }
}

impl Drop for AppContext {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use std::thread;
    use std::time::Instant;

    use glam::Vec3;

    use super::*;
    use crate::fixture::{FakeEntity, FakeWorld};
    use crate::settings::{Settings, TargetingMode};

    fn config() -> ContextConfig {
        ContextConfig::builder()
            .startup(400, Duration::from_millis(5))
            .cadence(Duration::from_millis(1))
            .grace(Duration::from_secs(1))
            .build()
    }

    fn start(world: &FakeWorld, settings: Settings) -> AppContext {
        let readiness = Arc::new(Signal::new());
        readiness.set();
        AppContext::start(
            world.reader.clone(),
            OffsetsCollection::clone(&world.offsets),
            SharedSettings::new(settings),
            readiness,
            config(),
        )
        .unwrap()
    }

    fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if condition() {
                return true;
            }
            thread::sleep(Duration::from_millis(2));
        }
        false
    }

    #[test]
    fn test_entity_appears_with_distance() {
        let mut world = FakeWorld::new();
        world.set_local(Vec3::ZERO, 0.0);
        let target = world.add_entity(FakeEntity {
            position: Vec3::new(10.0, 0.0, 0.0),
            ..Default::default()
        });

        let context = start(&world, Settings::default());
        assert!(wait_until(|| context.world_snapshot().entity(target).is_some()));

        let snapshot = context.world_snapshot();
        let record = snapshot.entity(target).unwrap();
        assert!((record.distance - 10.0).abs() < 1e-4);
        assert_eq!(context.loop_states().len(), 5);
    }

    #[test]
    fn test_bullet_added_then_removed() {
        let mut world = FakeWorld::new();
        let bullet = world.add_bullet(Vec3::ZERO, Vec3::Z, 300.0);
        let mut settings = Settings::default();
        settings.esp.bullets = true;

        let context = start(&world, settings);
        world.fire(bullet);
        assert!(wait_until(|| context.bullet_snapshot().get(bullet).is_some()));

        world.set_bullet_alive(bullet, false);
        assert!(wait_until(|| context.bullet_snapshot().is_empty()));
    }

    #[test]
    fn test_no_target_no_writes() {
        let mut world = FakeWorld::new();
        let bullet = world.add_bullet(Vec3::ZERO, Vec3::Z, 300.0);
        let mut settings = Settings::default();
        settings.redirect.enabled = true;

        let context = start(&world, settings);
        world.fire(bullet);
        assert!(wait_until(|| context.bullet_snapshot().get(bullet).is_some()));
        thread::sleep(Duration::from_millis(30));

        assert!(context.current_target().is_none());
        assert!(world.mock.writes().is_empty());
    }

    #[test]
    fn test_bullet_redirected_into_target() {
        let mut world = FakeWorld::new();
        world.add_entity(FakeEntity {
            position: Vec3::new(10.0, 0.0, 0.0),
            ..Default::default()
        });
        let bullet = world.add_bullet(Vec3::ZERO, Vec3::Z, 300.0);
        let mut settings = Settings::default();
        settings.redirect.enabled = true;
        settings.targeting.mode = TargetingMode::Distance;

        let context = start(&world, settings);
        world.fire(bullet);

        assert!(wait_until(|| world.bullet_speed(bullet) == 600.0));
        assert!(context.current_target().is_some());
        assert!(world.bullet_position(bullet).distance(Vec3::new(10.0, 1.6, 0.0)) < 0.51);
    }

    #[test]
    fn test_loops_wait_for_readiness() {
        let mut world = FakeWorld::new();
        world.add_entity(FakeEntity::default());
        let readiness = Arc::new(Signal::new());

        let mut context = AppContext::start(
            world.reader.clone(),
            OffsetsCollection::clone(&world.offsets),
            SharedSettings::default(),
            Arc::clone(&readiness),
            config(),
        )
        .unwrap();

        thread::sleep(Duration::from_millis(30));
        assert_eq!(context.world_snapshot().generation, 0);
        assert!(
            context
                .loop_states()
                .iter()
                .all(|(_, state)| *state == LoopState::Attaching)
        );

        readiness.set();
        assert!(wait_until(|| context.world_snapshot().generation > 0));

        context.shutdown();
        assert!(context.is_stopped());
    }

    #[test]
    fn test_startup_timeout_stops_all_loops() {
        let world = FakeWorld::new();
        let config = ContextConfig::builder()
            .startup(2, Duration::from_millis(5))
            .build();

        let context = AppContext::start(
            world.reader.clone(),
            OffsetsCollection::clone(&world.offsets),
            SharedSettings::default(),
            Arc::new(Signal::new()),
            config,
        )
        .unwrap();

        assert!(wait_until(|| context.is_stopped()));
        assert_eq!(context.world_snapshot().generation, 0);
    }

    #[test]
    fn test_without_bullet_offsets_only_world_and_targeting_run() {
        let world = FakeWorld::new();
        let mut offsets = OffsetsCollection::clone(&world.offsets);
        offsets.current_bullet = Default::default();

        let readiness = Arc::new(Signal::new());
        let context = AppContext::start(
            world.reader.clone(),
            offsets,
            SharedSettings::default(),
            readiness,
            config(),
        )
        .unwrap();

        let names: Vec<&str> = context.loop_states().iter().map(|(n, _)| *n).collect();
        assert_eq!(names, vec!["snapline-world", "snapline-targeting"]);
    }
}
