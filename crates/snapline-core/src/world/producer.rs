use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use glam::{Vec2, Vec3};
use tracing::{debug, trace};

use crate::math::{ScreenSize, ViewMatrix, world_to_screen};
use crate::memory::MemoryReader;
use crate::offset::OffsetsCollection;
use crate::settings::{Settings, SharedSettings};
use crate::sync::SnapshotCell;
use crate::world::{EntityCategory, EntityRecord, LocalPlayer, WorldSnapshot};

/// Longest entity name read from the host
const MAX_NAME_LEN: usize = 64;

/// View matrix with a short validity window.
#[derive(Debug, Default)]
struct MatrixCache {
    matrix: ViewMatrix,
    refreshed_at: Option<Instant>,
}

/// Builds world snapshots from process memory and publishes them.
///
/// Owned by the producer thread; consumers only see the [`SnapshotCell`].
pub struct WorldProducer {
    reader: MemoryReader,
    offsets: Arc<OffsetsCollection>,
    settings: SharedSettings,
    screen: ScreenSize,
    categories: HashMap<u32, EntityCategory>,
    matrix: MatrixCache,
    generation: u64,
    published: Arc<SnapshotCell<WorldSnapshot>>,
}

impl WorldProducer {
    pub fn new(
        reader: MemoryReader,
        offsets: Arc<OffsetsCollection>,
        settings: SharedSettings,
        screen: ScreenSize,
    ) -> Self {
        let categories = offsets.category_table();
        Self {
            reader,
            offsets,
            settings,
            screen,
            categories,
            matrix: MatrixCache::default(),
            generation: 0,
            published: Arc::new(SnapshotCell::new(WorldSnapshot::empty(screen))),
        }
    }

    pub fn snapshots(&self) -> Arc<SnapshotCell<WorldSnapshot>> {
        Arc::clone(&self.published)
    }

    /// Run one production cycle and publish the result.
    pub fn cycle(&mut self) -> Arc<WorldSnapshot> {
        let started = Instant::now();
        let settings = self.settings.current();

        self.refresh_matrix(&settings);
        let local = self.read_local_player();
        let entities = self.read_entities(&local, &settings);

        self.generation += 1;
        let snapshot = Arc::new(WorldSnapshot {
            generation: self.generation,
            captured_at: Instant::now(),
            production_time: started.elapsed(),
            local,
            entities,
            view_matrix: self.matrix.matrix,
            screen: self.screen,
        });

        trace!(
            "world #{}: {} entities in {:?}",
            snapshot.generation,
            snapshot.entities.len(),
            snapshot.production_time
        );
        self.published.publish_arc(Arc::clone(&snapshot));
        snapshot
    }

    fn refresh_matrix(&mut self, settings: &Settings) {
        if let Some(at) = self.matrix.refreshed_at
            && at.elapsed() < settings.world.matrix_cache()
        {
            return;
        }

        let read = self
            .offsets
            .camera
            .resolve(&self.reader)
            .and_then(|address| self.reader.read::<ViewMatrix>(address));

        match read {
            Ok(matrix) => {
                self.matrix.matrix = matrix;
                self.matrix.refreshed_at = Some(Instant::now());
            }
            // keep the previous matrix and retry next cycle
            Err(e) => debug!("View matrix unavailable: {}", e),
        }
    }

    fn read_local_player(&self) -> LocalPlayer {
        let address = match self.offsets.local_player.resolve(&self.reader) {
            Ok(address) => address,
            Err(e) => {
                debug!("Local player unavailable: {}", e);
                return LocalPlayer::default();
            }
        };

        let fields = &self.offsets.player;
        let [yaw, pitch] = self
            .reader
            .read::<[f32; 2]>(address + fields.view_angles)
            .unwrap_or_default();

        LocalPlayer {
            address,
            position: self
                .reader
                .read_vec3(address + fields.position)
                .unwrap_or_default(),
            yaw,
            pitch,
            is_shooting: self
                .reader
                .read_bool(address + fields.is_shooting)
                .unwrap_or_default(),
            faction: self
                .reader
                .read_u32(address + fields.faction)
                .unwrap_or_default(),
        }
    }

    fn read_entities(&self, local: &LocalPlayer, settings: &Settings) -> Vec<EntityRecord> {
        let list = match self.offsets.entity_list.resolve(&self.reader) {
            Ok(list) => list,
            Err(e) => {
                debug!("Entity list unavailable: {}", e);
                return Vec::new();
            }
        };

        let layout = &self.offsets.list;
        let count = match self.reader.read_u32(list + layout.count) {
            Ok(count) => (count as usize).min(layout.max_entities),
            Err(e) => {
                debug!("Entity count unavailable: {}", e);
                return Vec::new();
            }
        };

        let mut entities = Vec::with_capacity(count);
        for index in 0..count {
            let slot = list + layout.entries + index as u64 * layout.stride;
            let address = match self.reader.read_u64(slot) {
                Ok(0) | Err(_) => continue,
                Ok(address) => address,
            };

            let Some(record) = self.read_entity(address, local) else {
                continue;
            };
            if record.distance > settings.esp.max_distance {
                continue;
            }
            entities.push(record);
        }

        entities
    }

    /// `None` only when the existence flag is unreadable or clear; any
    /// other failed field reads as zero.
    fn read_entity(&self, address: u64, local: &LocalPlayer) -> Option<EntityRecord> {
        let fields = &self.offsets.entity;
        let reader = &self.reader;
        let constants = &self.offsets.constants;

        if !reader.read_bool(address + fields.exists).ok()? {
            return None;
        }

        let type_id = reader.read_u32(address + fields.type_id).unwrap_or_default();
        let category = self
            .categories
            .get(&type_id)
            .copied()
            .unwrap_or(EntityCategory::Unknown);

        let position = reader
            .read_vec3(address + fields.position)
            .unwrap_or_default();
        let head_position = category.head_position(position, constants);

        let mut record = EntityRecord {
            address,
            category,
            type_id,
            position,
            head_position,
            view_angle: reader
                .read_f32(address + fields.view_angle)
                .unwrap_or_default(),
            faction: reader.read_u32(address + fields.faction).unwrap_or_default(),
            distance: local.position.distance(position),
            screen_position: self.project(position),
            head_screen_position: self.project(head_position),
            alive: true,
            ..Default::default()
        };

        if category.has_vitals() {
            let read = |offset: u64| reader.read_f32(address + offset).unwrap_or_default();
            record.health = read(fields.health);
            record.health_max = read(fields.health_max);
            record.shield = read(fields.shield);
            record.shield_max = read(fields.shield_max);
            record.alive = record.health > 0.0;
        }

        if let Some(alive) = fields.alive {
            record.alive = reader.read_bool(address + alive).unwrap_or_default();
        }

        if fields.name != 0 {
            record.name = reader
                .read_string(address + fields.name, MAX_NAME_LEN)
                .unwrap_or_default();
        }

        Some(record)
    }

    fn project(&self, world: Vec3) -> Option<Vec2> {
        world_to_screen(world, &self.matrix.matrix, self.screen)
    }
}
