use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use glam::Vec3;
use tracing::debug;

use crate::bullets::{BulletSnapshot, FrozenBullets};
use crate::error::Result;
use crate::memory::{Checksum, MemoryReader, PositionBlock};
use crate::offset::OffsetsCollection;
use crate::redirect::{aim_point, heading, placement};
use crate::settings::{BulletMode, BulletModeWatch, SharedSettings};
use crate::sync::SnapshotCell;
use crate::targeting::CurrentTarget;

/// Running totals, readable from any thread.
#[derive(Debug, Default)]
pub struct RedirectStats {
    pub redirected: AtomicU64,
    pub failed: AtomicU64,
}

/// Result of one engine cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RedirectOutcome {
    pub redirected: usize,
    pub failed: usize,
    pub skipped_frozen: usize,
}

/// Rewrites tracked bullets so they fly into the current target.
pub struct RedirectEngine {
    reader: MemoryReader,
    offsets: Arc<OffsetsCollection>,
    settings: SharedSettings,
    target: CurrentTarget,
    bullets: Arc<SnapshotCell<BulletSnapshot>>,
    frozen: FrozenBullets,
    checksum: Checksum,
    modes: BulletModeWatch,
    stats: Arc<RedirectStats>,
}

impl RedirectEngine {
    pub fn new(
        reader: MemoryReader,
        offsets: Arc<OffsetsCollection>,
        settings: SharedSettings,
        target: CurrentTarget,
        bullets: Arc<SnapshotCell<BulletSnapshot>>,
        frozen: FrozenBullets,
    ) -> Self {
        let checksum = Checksum::new(offsets.constants.checksum_seed);
        Self {
            reader,
            offsets,
            settings,
            target,
            bullets,
            frozen,
            checksum,
            modes: BulletModeWatch::default(),
            stats: Arc::new(RedirectStats::default()),
        }
    }

    pub fn stats(&self) -> Arc<RedirectStats> {
        Arc::clone(&self.stats)
    }

    pub fn cycle(&mut self) -> RedirectOutcome {
        let mut outcome = RedirectOutcome::default();

        let settings = self.settings.current();
        if self.modes.check(&settings, "redirect") != Some(BulletMode::Redirect) {
            return outcome;
        }
        let Some(target) = self.target.get() else {
            return outcome;
        };

        let constants = &self.offsets.constants;
        let aim = aim_point(&target, settings.redirect.target_head);
        let position = placement(aim, target.view_angle, constants);
        let direction = heading(position, aim);

        let bullets = self.bullets.load();
        for bullet in &bullets.bullets {
            if self.frozen.contains(bullet.address) {
                outcome.skipped_frozen += 1;
                continue;
            }

            match self.redirect(bullet.address, position, direction) {
                Ok(()) => outcome.redirected += 1,
                Err(e) => {
                    debug!("Redirect of bullet {:#x} aborted: {}", bullet.address, e);
                    outcome.failed += 1;
                }
            }
        }

        self.stats
            .redirected
            .fetch_add(outcome.redirected as u64, Ordering::Relaxed);
        self.stats
            .failed
            .fetch_add(outcome.failed as u64, Ordering::Relaxed);
        outcome
    }

    /// Position block, then its checksum, then direction and speed. Stops
    /// at the first failed write.
    fn redirect(&self, address: u64, position: Vec3, direction: Vec3) -> Result<()> {
        let fields = &self.offsets.bullet;
        let block = PositionBlock::from(position);

        self.reader.write(address + fields.position, block)?;
        self.reader.write(
            address + fields.checksum,
            self.checksum.compute(bytemuck::bytes_of(&block)),
        )?;
        self.reader.write_vec3(address + fields.direction, direction)?;
        self.reader.write(
            address + fields.speed,
            self.offsets.constants.redirect_speed,
        )?;
        Ok(())
    }
}
