//! procfs backend: `/proc/<pid>/maps` for the memory map, `/proc/<pid>/mem`
//! for access.

use std::fs::{self, File, OpenOptions};
use std::os::unix::fs::FileExt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::debug;

use crate::error::{Error, Result};
use crate::memory::{MemoryRegion, Protection, ProcessDescriptor, region_at};

/// How long a parsed memory map is reused before `maps` is read again
const MAP_REFRESH: Duration = Duration::from_millis(250);

struct MapCache {
    loaded_at: Instant,
    regions: Vec<MemoryRegion>,
}

pub(super) struct Process {
    pid: u32,
    mem: File,
    map: Mutex<Option<MapCache>>,
}

impl Process {
    pub(super) fn open(descriptor: &ProcessDescriptor) -> Result<(Self, u32, u64)> {
        let pid = if descriptor.current_process {
            std::process::id()
        } else {
            find_pid_by_name(&descriptor.name)?
        };

        let mem_path = proc_path(pid, "mem");
        let mem = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&mem_path)
            .or_else(|e| {
                debug!("Opening {:?} read-write failed ({}), retrying read-only", mem_path, e);
                File::open(&mem_path)
            })
            .map_err(|e| Error::ProcessOpenFailed(format!("{}: {}", mem_path.display(), e)))?;

        let process = Self {
            pid,
            mem,
            map: Mutex::new(None),
        };
        let base = process.main_module_base()?;
        Ok((process, pid, base))
    }

    fn main_module_base(&self) -> Result<u64> {
        let exe = fs::read_link(proc_path(self.pid, "exe")).ok();
        let content = fs::read_to_string(proc_path(self.pid, "maps"))?;

        let mut first = None;
        for line in content.lines() {
            let Some((region, path)) = parse_maps_line(line) else {
                continue;
            };
            first.get_or_insert(region.base);
            if let (Some(exe), Some(path)) = (&exe, path)
                && Path::new(path) == exe.as_path()
            {
                return Ok(region.base);
            }
        }

        first.ok_or_else(|| Error::ProcessOpenFailed(format!("pid {} has no mappings", self.pid)))
    }

    fn regions(&self) -> Option<Vec<MemoryRegion>> {
        let mut cache = self.map.lock();
        if let Some(cached) = cache.as_ref()
            && cached.loaded_at.elapsed() < MAP_REFRESH
        {
            return Some(cached.regions.clone());
        }

        let content = fs::read_to_string(proc_path(self.pid, "maps")).ok()?;
        let regions: Vec<MemoryRegion> = content
            .lines()
            .filter_map(parse_maps_line)
            .map(|(region, _)| region)
            .collect();
        *cache = Some(MapCache {
            loaded_at: Instant::now(),
            regions: regions.clone(),
        });
        Some(regions)
    }

    pub(super) fn query(&self, address: u64) -> Option<MemoryRegion> {
        let regions = self.regions()?;
        region_at(&regions, address)
    }

    pub(super) fn read(&self, address: u64, buf: &mut [u8]) -> Result<()> {
        self.mem
            .read_exact_at(buf, address)
            .map_err(|e| Error::MemoryReadFailed {
                address,
                message: e.to_string(),
            })
    }

    pub(super) fn write(&self, address: u64, bytes: &[u8]) -> Result<()> {
        self.mem
            .write_all_at(bytes, address)
            .map_err(|e| Error::MemoryWriteFailed {
                address,
                message: e.to_string(),
            })
    }
}

fn proc_path(pid: u32, entry: &str) -> PathBuf {
    PathBuf::from(format!("/proc/{}/{}", pid, entry))
}

fn find_pid_by_name(name: &str) -> Result<u32> {
    // comm is truncated to 15 bytes, so compare against the exe name too
    let wanted = name.trim();
    for entry in fs::read_dir("/proc")? {
        let Ok(entry) = entry else { continue };
        let Some(pid) = entry.file_name().to_str().and_then(|s| s.parse::<u32>().ok()) else {
            continue;
        };

        let comm = fs::read_to_string(proc_path(pid, "comm")).unwrap_or_default();
        let exe_name = fs::read_link(proc_path(pid, "exe"))
            .ok()
            .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()));

        if comm.trim() == wanted || exe_name.as_deref() == Some(wanted) {
            return Ok(pid);
        }
    }
    Err(Error::ProcessNotFound(name.to_string()))
}

/// Parse `start-end perms offset dev inode [path]`.
fn parse_maps_line(line: &str) -> Option<(MemoryRegion, Option<&str>)> {
    let mut fields = line.split_whitespace();
    let range = fields.next()?;
    let perms = fields.next()?.as_bytes();
    let path = fields.nth(3);

    let (start, end) = range.split_once('-')?;
    let start = u64::from_str_radix(start, 16).ok()?;
    let end = u64::from_str_radix(end, 16).ok()?;
    if end <= start || perms.len() < 3 {
        return None;
    }

    let protection = Protection::from_rwx(perms[0] == b'r', perms[1] == b'w', perms[2] == b'x');
    Some((MemoryRegion::committed(start, end - start, protection), path))
}
