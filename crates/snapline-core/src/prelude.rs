//! Prelude module for convenient imports
//!
//! ```ignore
//! use snapline_core::prelude::*;
//! ```

// Application
pub use crate::context::{AppContext, ContextConfig};
pub use crate::settings::{Settings, SharedSettings, TargetingMode};
pub use crate::sync::Signal;

// Error handling
pub use crate::error::{Error, Result};

// Process access
pub use crate::memory::{MemoryReader, ProcessDescriptor};
pub use crate::offset::OffsetsCollection;

// Snapshot types
pub use crate::bullets::{BulletRecord, BulletSnapshot};
pub use crate::math::{ScreenSize, Vec2, Vec3, ViewMatrix, world_to_screen};
pub use crate::world::{EntityCategory, EntityRecord, LocalPlayer, WorldSnapshot};
