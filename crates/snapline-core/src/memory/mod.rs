mod backend;
pub mod checksum;
pub mod layout;
mod process;
mod reader;
mod region;

#[cfg(test)]
pub mod mock;

pub use backend::MemoryBackend;
pub use checksum::{Checksum, PositionBlock};
pub use process::*;
pub use reader::{MemoryReader, pattern_from_mask};
pub use region::{MemoryRegion, Protection, RegionState, region_at};

#[cfg(test)]
pub use mock::{MockMemory, MockMemoryBuilder};
