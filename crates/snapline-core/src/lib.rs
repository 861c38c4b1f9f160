//! # snapline-core
//!
//! Core library for reading a live game world out of another process.
//!
//! This crate provides:
//! - Validated process memory access (typed reads/writes, pointer chains,
//!   pattern scanning, host string layouts, position checksums)
//! - A world snapshot producer publishing immutable snapshots
//! - A bullet harvester tracking short-lived projectiles
//! - Target selection and bullet redirection loops
//! - World-to-screen projection

pub mod bullets;
pub mod context;
pub mod error;
pub mod math;
pub mod memory;
pub mod offset;
pub mod prelude;
pub mod redirect;
pub mod settings;
pub mod sync;
pub mod targeting;
pub mod world;

#[cfg(test)]
mod fixture;

pub use bullets::{BulletHarvester, BulletRecord, BulletSnapshot, FrozenBullets};
pub use context::{AppContext, ContextConfig, ContextConfigBuilder};
pub use error::{Error, Result};
pub use math::{ScreenSize, ViewMatrix, world_to_screen};
pub use memory::{
    Checksum, MemoryBackend, MemoryReader, ProcessDescriptor, ProcessHandle, Protection,
};
pub use offset::{
    CodeSignature, OffsetSignatureEntry, OffsetsCollection, PointerPath, apply_signatures,
    load_offsets, save_offsets,
};
pub use redirect::{RedirectEngine, RedirectOutcome};
pub use settings::{
    BulletMode, Settings, SharedSettings, TargetingMode, load_settings, save_settings,
};
pub use sync::{LoopState, Signal, SnapshotCell, StartupPolicy};
pub use targeting::{CurrentTarget, TargetSelector, select_target};
pub use world::{EntityCategory, EntityRecord, LocalPlayer, WorldProducer, WorldSnapshot};
