//! A small simulated host built on [`MockMemory`], shared by the producer,
//! harvester, targeting, redirect and context tests.

use std::sync::Arc;

use glam::Vec3;

use crate::math::ViewMatrix;
use crate::memory::layout::string::RawString;
use crate::memory::{MemoryReader, MockMemory, MockMemoryBuilder, Protection};
use crate::offset::{
    BulletFields, EntityFields, EntityListLayout, EntityTypeEntry, OffsetsCollection,
    PlayerFields, PointerPath,
};
use crate::world::EntityCategory;

pub const MODULE_BASE: u64 = 0x1_4000_0000;
pub const HEAP: u64 = 0x2_0000_0000;

const LOCAL_PLAYER: u64 = HEAP;
const ENTITY_LIST: u64 = HEAP + 0x1000;
const FIRST_ENTITY: u64 = HEAP + 0x1_0000;
const ENTITY_SIZE: u64 = 0x400;
const FIRST_BULLET: u64 = HEAP + 0x8_0000;
const BULLET_SIZE: u64 = 0x100;

pub struct FakeEntity {
    pub category: EntityCategory,
    pub position: Vec3,
    pub faction: u32,
    pub health: f32,
    pub health_max: f32,
    pub name: &'static str,
}

impl Default for FakeEntity {
    fn default() -> Self {
        Self {
            category: EntityCategory::Infantry,
            position: Vec3::ZERO,
            faction: 2,
            health: 100.0,
            health_max: 100.0,
            name: "",
        }
    }
}

pub struct FakeWorld {
    pub mock: Arc<MockMemory>,
    pub reader: MemoryReader,
    pub offsets: Arc<OffsetsCollection>,
    entity_count: u32,
    bullet_count: u64,
}

impl FakeWorld {
    pub fn new() -> Self {
        let offsets = Arc::new(offsets());
        let mock = MockMemoryBuilder::new()
            .region(MODULE_BASE, 0x1_0000, Protection::READWRITE)
            .region(HEAP, 0x10_0000, Protection::READWRITE)
            .write_u64(MODULE_BASE + 0x2000, LOCAL_PLAYER)
            .write_u64(MODULE_BASE + 0x3000, ENTITY_LIST)
            .write_bytes(
                MODULE_BASE + 0x1000,
                bytemuck::bytes_of(&ViewMatrix::IDENTITY),
            )
            .write_u32(LOCAL_PLAYER + 0x2C, 1)
            .build();
        let reader = MemoryReader::new(mock.clone(), MODULE_BASE);

        Self {
            mock,
            reader,
            offsets,
            entity_count: 0,
            bullet_count: 0,
        }
    }

    pub fn set_local(&self, position: Vec3, yaw: f32) {
        self.mock.poke(LOCAL_PLAYER + 0x10, position.to_array());
        self.mock.poke(LOCAL_PLAYER + 0x20, [yaw, 0.0f32]);
    }

    pub fn local_address(&self) -> u64 {
        LOCAL_PLAYER
    }

    pub fn set_matrix(&self, matrix: ViewMatrix) {
        self.mock.poke(MODULE_BASE + 0x1000, matrix);
    }

    /// Append an entity to the list and return its address.
    pub fn add_entity(&mut self, entity: FakeEntity) -> u64 {
        let address = FIRST_ENTITY + self.entity_count as u64 * ENTITY_SIZE;
        let type_id = match entity.category {
            EntityCategory::Infantry => 1u32,
            EntityCategory::PoweredArmor => 2,
            EntityCategory::GroundVehicle => 3,
            EntityCategory::AirVehicle => 4,
            EntityCategory::Turret => 5,
            EntityCategory::Other => 6,
            EntityCategory::Unknown => 99,
        };

        self.mock.poke(address + 0x08, 1u8);
        self.mock.poke(address + 0x0C, type_id);
        self.mock.poke(address + 0x10, entity.position.to_array());
        self.mock.poke(address + 0x20, entity.faction);
        self.mock.poke(address + 0x24, entity.health);
        self.mock.poke(address + 0x28, entity.health_max);

        let mut data = [0u8; 16];
        let len = entity.name.len().min(15);
        data[..len].copy_from_slice(&entity.name.as_bytes()[..len]);
        self.mock.poke(
            address + 0x40,
            RawString {
                data,
                length: len as u64,
                capacity: 15,
            },
        );

        self.mock.poke(
            ENTITY_LIST + 8 + self.entity_count as u64 * 8,
            address,
        );
        self.entity_count += 1;
        self.mock.poke(ENTITY_LIST, self.entity_count);
        address
    }

    pub fn set_entity_exists(&self, address: u64, exists: bool) {
        self.mock.poke(address + 0x08, exists as u8);
    }

    pub fn set_entity_health(&self, address: u64, health: f32) {
        self.mock.poke(address + 0x24, health);
    }

    /// Create a live bullet object (not yet in the current-bullet slot).
    pub fn add_bullet(&mut self, position: Vec3, direction: Vec3, speed: f32) -> u64 {
        let address = FIRST_BULLET + self.bullet_count * BULLET_SIZE;
        self.bullet_count += 1;

        self.mock.poke(address + 0x10, position.extend(1.0).to_array());
        self.mock.poke(address + 0x20, position.to_array());
        self.mock.poke(address + 0x30, direction.to_array());
        self.mock.poke(address + 0x3C, speed);
        self.mock.poke(address + 0x40, 1u8);
        address
    }

    /// Point the host's current-bullet slot at `address` (0 clears it).
    pub fn fire(&self, address: u64) {
        self.mock.poke(MODULE_BASE + 0x4000, address);
    }

    pub fn set_bullet_alive(&self, address: u64, alive: bool) {
        self.mock.poke(address + 0x40, alive as u8);
    }

    pub fn bullet_speed(&self, address: u64) -> f32 {
        self.mock.peek(address + 0x3C)
    }

    pub fn bullet_position(&self, address: u64) -> Vec3 {
        Vec3::from_array(self.mock.peek(address + 0x10))
    }

    pub fn bullet_direction(&self, address: u64) -> Vec3 {
        Vec3::from_array(self.mock.peek(address + 0x30))
    }

    pub fn bullet_checksum(&self, address: u64) -> u32 {
        self.mock.peek(address + 0x44)
    }
}

fn offsets() -> OffsetsCollection {
    let types = [
        (1, EntityCategory::Infantry),
        (2, EntityCategory::PoweredArmor),
        (3, EntityCategory::GroundVehicle),
        (4, EntityCategory::AirVehicle),
        (5, EntityCategory::Turret),
        (6, EntityCategory::Other),
    ];

    OffsetsCollection {
        version: "fixture".to_string(),
        camera: PointerPath {
            base: 0x1000,
            chain: vec![],
        },
        local_player: PointerPath {
            base: 0x2000,
            chain: vec![0],
        },
        entity_list: PointerPath {
            base: 0x3000,
            chain: vec![0],
        },
        current_bullet: PointerPath {
            base: 0x4000,
            chain: vec![],
        },
        player: PlayerFields {
            position: 0x10,
            view_angles: 0x20,
            is_shooting: 0x28,
            faction: 0x2C,
        },
        list: EntityListLayout {
            count: 0,
            entries: 8,
            stride: 8,
            max_entities: 64,
        },
        entity: EntityFields {
            exists: 0x08,
            type_id: 0x0C,
            position: 0x10,
            view_angle: 0x1C,
            faction: 0x20,
            health: 0x24,
            health_max: 0x28,
            shield: 0x2C,
            shield_max: 0x30,
            name: 0x40,
            alive: None,
        },
        bullet: BulletFields {
            position: 0x10,
            start_position: 0x20,
            direction: 0x30,
            speed: 0x3C,
            is_alive: 0x40,
            checksum: 0x44,
        },
        entity_types: types
            .into_iter()
            .map(|(id, category)| EntityTypeEntry {
                id,
                category,
                name: category.to_string(),
            })
            .collect(),
        ..Default::default()
    }
}
