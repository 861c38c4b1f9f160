//! Memory map model shared by every backend.

/// Page protection flags, using the Windows `PAGE_*` encoding.
///
/// Other backends translate their native permissions into this form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Protection(pub u32);

impl Protection {
    pub const NOACCESS: Self = Self(0x01);
    pub const READONLY: Self = Self(0x02);
    pub const READWRITE: Self = Self(0x04);
    pub const WRITECOPY: Self = Self(0x08);
    pub const EXECUTE: Self = Self(0x10);
    pub const EXECUTE_READ: Self = Self(0x20);
    pub const EXECUTE_READWRITE: Self = Self(0x40);
    pub const EXECUTE_WRITECOPY: Self = Self(0x80);
    pub const GUARD: Self = Self(0x100);

    const READ_MASK: u32 = Self::READONLY.0
        | Self::READWRITE.0
        | Self::WRITECOPY.0
        | Self::EXECUTE_READ.0
        | Self::EXECUTE_READWRITE.0
        | Self::EXECUTE_WRITECOPY.0;

    const WRITE_MASK: u32 = Self::READWRITE.0
        | Self::WRITECOPY.0
        | Self::EXECUTE_READWRITE.0
        | Self::EXECUTE_WRITECOPY.0;

    pub fn is_readable(&self) -> bool {
        !self.is_guarded() && self.0 & Self::READ_MASK != 0
    }

    pub fn is_writable(&self) -> bool {
        !self.is_guarded() && self.0 & Self::WRITE_MASK != 0
    }

    pub fn is_guarded(&self) -> bool {
        self.0 & Self::GUARD.0 != 0
    }

    /// Build from `r`/`w`/`x` permission bits.
    pub fn from_rwx(read: bool, write: bool, execute: bool) -> Self {
        match (read, write, execute) {
            (true, true, true) => Self::EXECUTE_READWRITE,
            (true, true, false) => Self::READWRITE,
            (true, false, true) => Self::EXECUTE_READ,
            (true, false, false) => Self::READONLY,
            (false, _, true) => Self::EXECUTE,
            _ => Self::NOACCESS,
        }
    }
}

impl From<u32> for Protection {
    fn from(val: u32) -> Self {
        Self(val)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionState {
    Committed,
    Reserved,
    Free,
}

/// One contiguous range with uniform state and protection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryRegion {
    pub base: u64,
    pub size: u64,
    pub state: RegionState,
    pub protection: Protection,
}

impl MemoryRegion {
    pub fn committed(base: u64, size: u64, protection: Protection) -> Self {
        Self {
            base,
            size,
            state: RegionState::Committed,
            protection,
        }
    }

    pub fn end(&self) -> u64 {
        self.base.saturating_add(self.size)
    }

    pub fn contains(&self, address: u64) -> bool {
        address >= self.base && address < self.end()
    }

    pub fn is_readable(&self) -> bool {
        self.state == RegionState::Committed && self.protection.is_readable()
    }

    pub fn is_writable(&self) -> bool {
        self.state == RegionState::Committed && self.protection.is_writable()
    }
}

/// Look up `address` in a list of mapped regions sorted by base.
///
/// Addresses between mappings resolve to a `Free` region spanning the gap,
/// so callers walking a range always make progress.
pub fn region_at(regions: &[MemoryRegion], address: u64) -> Option<MemoryRegion> {
    let idx = regions.partition_point(|r| r.end() <= address);
    match regions.get(idx) {
        Some(region) if region.contains(address) => Some(*region),
        Some(next) => Some(MemoryRegion {
            base: address,
            size: next.base - address,
            state: RegionState::Free,
            protection: Protection::NOACCESS,
        }),
        None if address < u64::MAX => Some(MemoryRegion {
            base: address,
            size: u64::MAX - address,
            state: RegionState::Free,
            protection: Protection::NOACCESS,
        }),
        None => None,
    }
}
