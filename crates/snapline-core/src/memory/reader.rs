use std::fmt;
use std::sync::Arc;

use bytemuck::Pod;
use glam::Vec3;
use tracing::info;

use crate::error::{Error, Result};
use crate::memory::layout::string::{MAX_INLINE_LEN, RawString};
use crate::memory::{MemoryBackend, ProcessDescriptor, ProcessHandle, RegionState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Access {
    Read,
    Write,
}

impl Access {
    fn as_str(self) -> &'static str {
        match self {
            Access::Read => "read",
            Access::Write => "write",
        }
    }
}

/// Validated access to an attached address space.
///
/// Every read and write is checked against the memory map first: the whole
/// range must be committed and carry a suitable protection, otherwise the
/// call fails without touching memory. Cloning is cheap and every worker
/// thread holds its own clone.
#[derive(Clone)]
pub struct MemoryReader {
    backend: Arc<dyn MemoryBackend>,
    base_address: u64,
}

impl fmt::Debug for MemoryReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryReader")
            .field("pid", &self.backend.process_id())
            .field("base_address", &format_args!("{:#x}", self.base_address))
            .finish()
    }
}

impl MemoryReader {
    pub fn new(backend: Arc<dyn MemoryBackend>, base_address: u64) -> Self {
        Self {
            backend,
            base_address,
        }
    }

    /// Attach to a process and wrap it in a validated reader.
    pub fn attach(descriptor: &ProcessDescriptor) -> Result<Self> {
        let handle = ProcessHandle::attach(descriptor)?;
        info!(
            "Attached to {} (pid {}, base: {:#x})",
            handle.name, handle.pid, handle.base_address
        );
        let base_address = handle.base_address;
        Ok(Self::new(Arc::new(handle), base_address))
    }

    pub fn base_address(&self) -> u64 {
        self.base_address
    }

    pub fn process_id(&self) -> u32 {
        self.backend.process_id()
    }

    /// Whether the main module is still mapped (the process is alive).
    pub fn is_alive(&self) -> bool {
        self.read_bytes(self.base_address, 4).is_ok()
    }

    pub fn is_valid_address(&self, address: u64) -> bool {
        self.validate(address, 1, Access::Read).is_ok()
    }

    fn validate(&self, address: u64, len: usize, access: Access) -> Result<()> {
        let unmapped = || Error::UnmappedAddress { address, len };
        if address == 0 || len == 0 {
            return Err(unmapped());
        }
        let end = address.checked_add(len as u64).ok_or_else(unmapped)?;

        let mut cursor = address;
        while cursor < end {
            let region = self.backend.query(cursor).ok_or_else(unmapped)?;
            if region.state != RegionState::Committed || !region.contains(cursor) {
                return Err(unmapped());
            }
            let allowed = match access {
                Access::Read => region.is_readable(),
                Access::Write => region.is_writable(),
            };
            if !allowed {
                return Err(Error::ProtectionDenied {
                    address,
                    len,
                    access: access.as_str(),
                });
            }
            cursor = region.end();
        }
        Ok(())
    }

    pub fn read_into(&self, address: u64, buf: &mut [u8]) -> Result<()> {
        self.validate(address, buf.len(), Access::Read)?;
        self.backend.read_raw(address, buf)
    }

    pub fn read_bytes(&self, address: u64, len: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; len];
        self.read_into(address, &mut buf)?;
        Ok(buf)
    }

    pub fn read<T: Pod>(&self, address: u64) -> Result<T> {
        let mut value = T::zeroed();
        self.read_into(address, bytemuck::bytes_of_mut(&mut value))?;
        Ok(value)
    }

    pub fn read_u32(&self, address: u64) -> Result<u32> {
        self.read(address)
    }

    pub fn read_u64(&self, address: u64) -> Result<u64> {
        self.read(address)
    }

    pub fn read_i32(&self, address: u64) -> Result<i32> {
        self.read(address)
    }

    pub fn read_f32(&self, address: u64) -> Result<f32> {
        self.read(address)
    }

    /// One-byte boolean (any non-zero value is true).
    pub fn read_bool(&self, address: u64) -> Result<bool> {
        Ok(self.read::<u8>(address)? != 0)
    }

    pub fn read_vec3(&self, address: u64) -> Result<Vec3> {
        let [x, y, z] = self.read::<[f32; 3]>(address)?;
        Ok(Vec3::new(x, y, z))
    }

    pub fn write_bytes(&self, address: u64, bytes: &[u8]) -> Result<()> {
        self.validate(address, bytes.len(), Access::Write)?;
        self.backend.write_raw(address, bytes)
    }

    pub fn write<T: Pod>(&self, address: u64, value: T) -> Result<()> {
        self.write_bytes(address, bytemuck::bytes_of(&value))
    }

    pub fn write_vec3(&self, address: u64, value: Vec3) -> Result<()> {
        self.write(address, value.to_array())
    }

    /// Follow a pointer chain.
    ///
    /// Dereferences `base`, then for every offset but the last adds it and
    /// dereferences again. The last offset is added without dereferencing.
    /// A null or unreadable pointer at any step fails the whole chain.
    pub fn resolve_pointer_chain(&self, base: u64, offsets: &[u64]) -> Result<u64> {
        let Some((last, steps)) = offsets.split_last() else {
            return Err(Error::InvalidOffset("empty pointer chain".to_string()));
        };

        let broken = |step: usize, address: u64| Error::PointerChainBroken { step, address };

        let mut current = self.read_u64(base).map_err(|_| broken(0, base))?;
        if current == 0 {
            return Err(broken(0, base));
        }

        for (i, offset) in steps.iter().enumerate() {
            let address = current
                .checked_add(*offset)
                .ok_or_else(|| broken(i + 1, current))?;
            current = self.read_u64(address).map_err(|_| broken(i + 1, address))?;
            if current == 0 {
                return Err(broken(i + 1, address));
            }
        }

        current
            .checked_add(*last)
            .ok_or_else(|| broken(offsets.len(), current))
    }

    /// Read a host runtime string, inline or heap-backed.
    ///
    /// The layout is chosen from the capacity field; only the matching read
    /// is attempted. At most `max_len` bytes are returned.
    pub fn read_string(&self, address: u64, max_len: usize) -> Result<String> {
        let raw: RawString = self.read(address)?;
        let length = usize::try_from(raw.length).unwrap_or(usize::MAX);

        let bytes = if raw.is_inline() {
            let n = length.min(MAX_INLINE_LEN).min(max_len);
            raw.data[..n].to_vec()
        } else {
            let n = length.min(max_len);
            if n == 0 {
                return Ok(String::new());
            }
            self.read_bytes(raw.heap_pointer(), n)?
        };

        let text = String::from_utf8_lossy(&bytes);
        Ok(text.trim_end_matches('\0').to_string())
    }

    /// Find the first match of a byte pattern (`None` = wildcard).
    ///
    /// Only readable regions inside `start..start + len` are searched;
    /// unmapped holes split the range.
    pub fn scan(&self, start: u64, len: usize, pattern: &[Option<u8>]) -> Result<u64> {
        if pattern.is_empty() {
            return Err(Error::InvalidPattern("pattern is empty".to_string()));
        }

        let end = start.saturating_add(len as u64);
        let mut cursor = start;

        while cursor < end {
            let Some(region) = self.backend.query(cursor) else {
                break;
            };
            let mut segment_end = region.end().min(end);
            if segment_end <= cursor {
                break;
            }

            if region.is_readable() {
                while segment_end < end {
                    match self.backend.query(segment_end) {
                        Some(next) if next.is_readable() && next.end() > segment_end => {
                            segment_end = next.end().min(end);
                        }
                        _ => break,
                    }
                }

                if let Ok(bytes) = self.read_bytes(cursor, (segment_end - cursor) as usize)
                    && let Some(pos) = find_masked(&bytes, pattern)
                {
                    return Ok(cursor + pos as u64);
                }
            }

            cursor = segment_end;
        }

        Err(Error::PatternNotFound { start, len })
    }

    /// Pattern scan with a separate mask (`x` = must match, `?` = any byte).
    pub fn scan_pattern(&self, start: u64, len: usize, pattern: &[u8], mask: &str) -> Result<u64> {
        let masked = pattern_from_mask(pattern, mask)?;
        self.scan(start, len, &masked)
    }
}

/// Combine raw bytes and an `x`/`?` mask into a wildcard pattern.
pub fn pattern_from_mask(pattern: &[u8], mask: &str) -> Result<Vec<Option<u8>>> {
    if pattern.is_empty() || pattern.len() != mask.len() {
        return Err(Error::InvalidPattern(format!(
            "pattern length {} does not match mask length {}",
            pattern.len(),
            mask.len()
        )));
    }

    pattern
        .iter()
        .zip(mask.chars())
        .map(|(byte, m)| match m {
            'x' | 'X' => Ok(Some(*byte)),
            '?' => Ok(None),
            other => Err(Error::InvalidPattern(format!("invalid mask character '{}'", other))),
        })
        .collect()
}

/// Offset of the first match, anchored on the first concrete byte.
fn find_masked(haystack: &[u8], pattern: &[Option<u8>]) -> Option<usize> {
    if pattern.len() > haystack.len() {
        return None;
    }
    let last_start = haystack.len() - pattern.len();

    let Some(anchor_idx) = pattern.iter().position(Option::is_some) else {
        return Some(0);
    };
    let anchor = pattern[anchor_idx]?;

    let mut from = anchor_idx;
    while let Some(rel) = memchr::memchr(anchor, &haystack[from..]) {
        let hit = from + rel;
        let start = hit - anchor_idx;
        if start > last_start {
            return None;
        }
        let window = &haystack[start..start + pattern.len()];
        if window
            .iter()
            .zip(pattern)
            .all(|(b, p)| p.is_none_or(|expected| expected == *b))
        {
            return Some(start);
        }
        from = hit + 1;
    }
    None
}
