//! Attaching to a target process.
//!
//! When running inside the host, "attach" opens the current process and
//! finds its main module; the accessor contract is the same either way.

#[cfg(target_os = "linux")]
mod linux;
#[cfg(target_os = "windows")]
mod win32;

#[cfg(target_os = "linux")]
use linux as platform;
#[cfg(target_os = "windows")]
use win32 as platform;

use crate::error::Result;
#[cfg(not(any(target_os = "windows", target_os = "linux")))]
use crate::error::Error;
use crate::memory::{MemoryBackend, MemoryRegion};

/// How to find the process to attach to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessDescriptor {
    /// Executable name, e.g. `game_x64.exe`
    pub name: String,
    /// Use the calling process instead of searching by name
    pub current_process: bool,
}

impl ProcessDescriptor {
    pub fn by_name(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            current_process: false,
        }
    }

    pub fn current(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            current_process: true,
        }
    }
}

/// OS handle to an attached process plus its main-module base.
pub struct ProcessHandle {
    pub pid: u32,
    pub base_address: u64,
    pub name: String,
    #[cfg(any(target_os = "windows", target_os = "linux"))]
    inner: platform::Process,
}

impl std::fmt::Debug for ProcessHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessHandle")
            .field("pid", &self.pid)
            .field("base_address", &format_args!("{:#x}", self.base_address))
            .field("name", &self.name)
            .finish()
    }
}

impl ProcessHandle {
    #[cfg(any(target_os = "windows", target_os = "linux"))]
    pub fn attach(descriptor: &ProcessDescriptor) -> Result<Self> {
        let (inner, pid, base_address) = platform::Process::open(descriptor)?;
        Ok(Self {
            pid,
            base_address,
            name: descriptor.name.clone(),
            inner,
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux")))]
    pub fn attach(_descriptor: &ProcessDescriptor) -> Result<Self> {
        Err(Error::UnsupportedPlatform)
    }

    /// Search by name only, the common case for an external tool.
    pub fn find_and_open(name: &str) -> Result<Self> {
        Self::attach(&ProcessDescriptor::by_name(name))
    }
}

#[cfg(any(target_os = "windows", target_os = "linux"))]
impl MemoryBackend for ProcessHandle {
    fn query(&self, address: u64) -> Option<MemoryRegion> {
        self.inner.query(address)
    }

    fn read_raw(&self, address: u64, buf: &mut [u8]) -> Result<()> {
        self.inner.read(address, buf)
    }

    fn write_raw(&self, address: u64, bytes: &[u8]) -> Result<()> {
        self.inner.write(address, bytes)
    }

    fn process_id(&self) -> u32 {
        self.pid
    }
}

#[cfg(not(any(target_os = "windows", target_os = "linux")))]
impl MemoryBackend for ProcessHandle {
    fn query(&self, _address: u64) -> Option<MemoryRegion> {
        None
    }

    fn read_raw(&self, _address: u64, _buf: &mut [u8]) -> Result<()> {
        Err(Error::UnsupportedPlatform)
    }

    fn write_raw(&self, _address: u64, _bytes: &[u8]) -> Result<()> {
        Err(Error::UnsupportedPlatform)
    }

    fn process_id(&self) -> u32 {
        self.pid
    }
}
