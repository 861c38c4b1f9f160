//! In-memory address space for tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use bytemuck::Pod;
use parking_lot::Mutex;

use crate::error::{Error, Result};
use crate::memory::{MemoryBackend, MemoryRegion, Protection, region_at};

struct MockRegion {
    base: u64,
    protection: Protection,
    data: Vec<u8>,
}

impl MockRegion {
    fn end(&self) -> u64 {
        self.base + self.data.len() as u64
    }
}

/// Simulated process memory.
///
/// Backend accesses are not validated here (the reader does that), but they
/// still fail on addresses outside every region, like a real OS call would.
pub struct MockMemory {
    regions: Mutex<Vec<MockRegion>>,
    writes: Mutex<Vec<(u64, Vec<u8>)>>,
    raw_reads: AtomicUsize,
}

impl MockMemory {
    /// Change memory behind the reader's back, as the host would.
    pub fn poke<T: Pod>(&self, address: u64, value: T) {
        self.store(address, bytemuck::bytes_of(&value))
            .expect("poke outside mock regions");
    }

    pub fn peek<T: Pod>(&self, address: u64) -> T {
        let mut value = T::zeroed();
        self.load(address, bytemuck::bytes_of_mut(&mut value))
            .expect("peek outside mock regions");
        value
    }

    /// Every `write_raw` call issued through the backend, in order.
    pub fn writes(&self) -> Vec<(u64, Vec<u8>)> {
        self.writes.lock().clone()
    }

    pub fn clear_writes(&self) {
        self.writes.lock().clear();
    }

    pub fn raw_read_count(&self) -> usize {
        self.raw_reads.load(Ordering::SeqCst)
    }

    fn load(&self, address: u64, buf: &mut [u8]) -> Result<()> {
        let regions = self.regions.lock();
        for (i, byte) in buf.iter_mut().enumerate() {
            let at = address + i as u64;
            let region = regions
                .iter()
                .find(|r| at >= r.base && at < r.end())
                .ok_or(Error::MemoryReadFailed {
                    address: at,
                    message: "no mock region".to_string(),
                })?;
            *byte = region.data[(at - region.base) as usize];
        }
        Ok(())
    }

    fn store(&self, address: u64, bytes: &[u8]) -> Result<()> {
        let mut regions = self.regions.lock();
        for (i, byte) in bytes.iter().enumerate() {
            let at = address + i as u64;
            let region = regions
                .iter_mut()
                .find(|r| at >= r.base && at < r.end())
                .ok_or(Error::MemoryWriteFailed {
                    address: at,
                    message: "no mock region".to_string(),
                })?;
            let base = region.base;
            region.data[(at - base) as usize] = *byte;
        }
        Ok(())
    }
}

impl MemoryBackend for MockMemory {
    fn query(&self, address: u64) -> Option<MemoryRegion> {
        let regions = self.regions.lock();
        let map: Vec<MemoryRegion> = regions
            .iter()
            .map(|r| MemoryRegion::committed(r.base, r.data.len() as u64, r.protection))
            .collect();
        region_at(&map, address)
    }

    fn read_raw(&self, address: u64, buf: &mut [u8]) -> Result<()> {
        self.raw_reads.fetch_add(1, Ordering::SeqCst);
        self.load(address, buf)
    }

    fn write_raw(&self, address: u64, bytes: &[u8]) -> Result<()> {
        self.store(address, bytes)?;
        self.writes.lock().push((address, bytes.to_vec()));
        Ok(())
    }

    fn process_id(&self) -> u32 {
        4242
    }
}

/// Builder for [`MockMemory`].
#[derive(Default)]
pub struct MockMemoryBuilder {
    regions: Vec<MockRegion>,
    initial: Vec<(u64, Vec<u8>)>,
}

impl MockMemoryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a committed, zero-filled region. Regions must not overlap.
    pub fn region(mut self, base: u64, size: usize, protection: Protection) -> Self {
        self.regions.push(MockRegion {
            base,
            protection,
            data: vec![0u8; size],
        });
        self
    }

    pub fn write_bytes(mut self, address: u64, bytes: &[u8]) -> Self {
        self.initial.push((address, bytes.to_vec()));
        self
    }

    pub fn write_u32(self, address: u64, value: u32) -> Self {
        self.write_bytes(address, &value.to_le_bytes())
    }

    pub fn write_u64(self, address: u64, value: u64) -> Self {
        self.write_bytes(address, &value.to_le_bytes())
    }

    pub fn write_f32(self, address: u64, value: f32) -> Self {
        self.write_bytes(address, &value.to_le_bytes())
    }

    pub fn write_vec3(self, address: u64, value: [f32; 3]) -> Self {
        self.write_bytes(address, bytemuck::bytes_of(&value))
    }

    pub fn build(mut self) -> Arc<MockMemory> {
        self.regions.sort_by_key(|r| r.base);
        let memory = MockMemory {
            regions: Mutex::new(self.regions),
            writes: Mutex::new(Vec::new()),
            raw_reads: AtomicUsize::new(0),
        };
        for (address, bytes) in &self.initial {
            memory
                .store(*address, bytes)
                .expect("initial write outside mock regions");
        }
        Arc::new(memory)
    }
}
