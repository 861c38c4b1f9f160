use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::memory::MemoryReader;
use crate::offset::OffsetSignatureEntry;
use crate::world::EntityCategory;

/// Static address plus optional pointer chain.
///
/// `base` is relative to the main module. With an empty chain the path
/// names a static location; otherwise it is followed with
/// [`MemoryReader::resolve_pointer_chain`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PointerPath {
    pub base: u64,
    pub chain: Vec<u64>,
}

impl PointerPath {
    pub fn is_set(&self) -> bool {
        self.base != 0
    }

    pub fn resolve(&self, reader: &MemoryReader) -> Result<u64> {
        let absolute = reader.base_address().wrapping_add(self.base);
        if self.chain.is_empty() {
            Ok(absolute)
        } else {
            reader.resolve_pointer_chain(absolute, &self.chain)
        }
    }
}

/// Local player object fields
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerFields {
    pub position: u64,
    /// Yaw, pitch as two f32
    pub view_angles: u64,
    pub is_shooting: u64,
    pub faction: u64,
}

/// Entity list header: a count and an inline array of object pointers
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EntityListLayout {
    pub count: u64,
    pub entries: u64,
    pub stride: u64,
    pub max_entities: usize,
}

impl Default for EntityListLayout {
    fn default() -> Self {
        Self {
            count: 0,
            entries: 8,
            stride: 8,
            max_entities: 2048,
        }
    }
}

/// Per-entity object fields
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EntityFields {
    /// One-byte existence flag; a failed read skips the entity
    pub exists: u64,
    pub type_id: u64,
    pub position: u64,
    /// Yaw as f32
    pub view_angle: u64,
    pub faction: u64,
    pub health: u64,
    pub health_max: u64,
    pub shield: u64,
    pub shield_max: u64,
    /// Host runtime string
    pub name: u64,
    /// One-byte liveness flag; when absent, liveness is derived from health
    pub alive: Option<u64>,
}

/// Projectile object fields
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BulletFields {
    /// 16-byte position block (x, y, z, w)
    pub position: u64,
    pub start_position: u64,
    pub direction: u64,
    pub speed: u64,
    pub is_alive: u64,
    pub checksum: u64,
}

/// Numeric constants tied to the host build
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConstants {
    pub checksum_seed: u32,
    pub infantry_head_height: f32,
    pub powered_armor_head_height: f32,
    /// Correction between the host's yaw zero and world +Z
    pub rotation_offset: f32,
    pub redirect_speed: f32,
    /// Distance in front of the aim point where a redirected bullet is placed
    pub redirect_lead: f32,
    /// Faction id exempt from team filtering
    pub neutral_faction: u32,
    pub pattern_scan_size: usize,
}

impl Default for HostConstants {
    fn default() -> Self {
        Self {
            checksum_seed: 0,
            infantry_head_height: 1.6,
            powered_armor_head_height: 2.2,
            rotation_offset: 0.0,
            redirect_speed: 600.0,
            redirect_lead: 0.5,
            neutral_faction: 0,
            pattern_scan_size: 256 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityTypeEntry {
    pub id: u32,
    pub category: EntityCategory,
    #[serde(default)]
    pub name: String,
}

/// Everything needed to locate host data for one host build.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OffsetsCollection {
    pub version: String,
    /// Resolves to the view matrix
    pub camera: PointerPath,
    /// Resolves to the local player object
    pub local_player: PointerPath,
    /// Resolves to the entity list header
    pub entity_list: PointerPath,
    /// Resolves to the slot holding the most recently fired bullet
    pub current_bullet: PointerPath,
    pub player: PlayerFields,
    pub list: EntityListLayout,
    pub entity: EntityFields,
    pub bullet: BulletFields,
    pub constants: HostConstants,
    pub entity_types: Vec<EntityTypeEntry>,
    pub signatures: Vec<OffsetSignatureEntry>,
}

impl OffsetsCollection {
    /// Enough is known to run the world producer.
    pub fn is_valid(&self) -> bool {
        !self.version.is_empty()
            && self.camera.is_set()
            && self.local_player.is_set()
            && self.entity_list.is_set()
    }

    pub fn has_bullet_offsets(&self) -> bool {
        self.current_bullet.is_set() && self.bullet.is_alive != 0
    }

    pub fn category_table(&self) -> HashMap<u32, EntityCategory> {
        self.entity_types
            .iter()
            .map(|entry| (entry.id, entry.category))
            .collect()
    }

    pub(crate) fn path_mut(&mut self, name: &str) -> Option<&mut PointerPath> {
        match name {
            "camera" => Some(&mut self.camera),
            "local_player" => Some(&mut self.local_player),
            "entity_list" => Some(&mut self.entity_list),
            "current_bullet" => Some(&mut self.current_bullet),
            _ => None,
        }
    }
}
