//! Integrity code the host attaches to projectile positions.
//!
//! CRC-32C (Castagnoli, reflected polynomial `0x82F63B78`): the register
//! starts at the inverted seed and the result is inverted again. The host
//! computes it with the SSE4.2 `crc32` instruction over little-endian
//! qwords, which is bit-identical to this byte-wise table form.

use bytemuck::{Pod, Zeroable};
use glam::Vec3;

const CASTAGNOLI_REFLECTED: u32 = 0x82F6_3B78;

const TABLE: [u32; 256] = build_table();

const fn build_table() -> [u32; 256] {
    let mut table = [0u32; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = i as u32;
        let mut bit = 0;
        while bit < 8 {
            crc = if crc & 1 != 0 {
                (crc >> 1) ^ CASTAGNOLI_REFLECTED
            } else {
                crc >> 1
            };
            bit += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

/// Seeded CRC-32C hasher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Checksum {
    seed: u32,
}

impl Checksum {
    pub fn new(seed: u32) -> Self {
        Self { seed }
    }

    pub fn seed(&self) -> u32 {
        self.seed
    }

    pub fn compute(&self, bytes: &[u8]) -> u32 {
        let mut crc = !self.seed;
        for &byte in bytes {
            crc = TABLE[((crc ^ byte as u32) & 0xFF) as usize] ^ (crc >> 8);
        }
        !crc
    }

    /// Checksum of a position block as the host stores it.
    pub fn position(&self, position: Vec3) -> u32 {
        self.compute(bytemuck::bytes_of(&PositionBlock::from(position)))
    }
}

/// 16-byte SIMD-width position: x, y, z and W pinned to 1.0.
///
/// The host hashes all four lanes, so W must be 1.0 for the code to match.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct PositionBlock {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl From<Vec3> for PositionBlock {
    fn from(v: Vec3) -> Self {
        Self {
            x: v.x,
            y: v.y,
            z: v.z,
            w: 1.0,
        }
    }
}
