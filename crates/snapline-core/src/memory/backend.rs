use crate::error::Result;
use crate::memory::MemoryRegion;

/// Raw access to an address space.
///
/// Implementations issue the access without any validation;
/// [`MemoryReader`](crate::memory::MemoryReader) checks every range
/// against [`query`](Self::query) before calling into the backend.
pub trait MemoryBackend: Send + Sync {
    /// Region containing `address`, including free gaps between mappings.
    fn query(&self, address: u64) -> Option<MemoryRegion>;

    fn read_raw(&self, address: u64, buf: &mut [u8]) -> Result<()>;

    fn write_raw(&self, address: u64, bytes: &[u8]) -> Result<()>;

    fn process_id(&self) -> u32;
}
