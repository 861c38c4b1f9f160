//! Win32 backend: Toolhelp snapshots for discovery, `VirtualQueryEx` for the
//! memory map, `ReadProcessMemory`/`WriteProcessMemory` for access.

use std::ffi::c_void;
use std::mem::size_of;

use windows::Win32::Foundation::{CloseHandle, HANDLE};
use windows::Win32::System::Diagnostics::Debug::{ReadProcessMemory, WriteProcessMemory};
use windows::Win32::System::Diagnostics::ToolHelp::{
    CreateToolhelp32Snapshot, MODULEENTRY32W, Module32FirstW, PROCESSENTRY32W, Process32FirstW,
    Process32NextW, TH32CS_SNAPMODULE, TH32CS_SNAPMODULE32, TH32CS_SNAPPROCESS,
};
use windows::Win32::System::Memory::{
    MEM_COMMIT, MEM_RESERVE, MEMORY_BASIC_INFORMATION, VirtualQueryEx,
};
use windows::Win32::System::Threading::{
    GetCurrentProcess, GetCurrentProcessId, OpenProcess, PROCESS_QUERY_INFORMATION,
    PROCESS_VM_OPERATION, PROCESS_VM_READ, PROCESS_VM_WRITE,
};

use crate::error::{Error, Result};
use crate::memory::{MemoryRegion, Protection, ProcessDescriptor, RegionState};

pub(super) struct Process {
    handle: HANDLE,
    /// The pseudo-handle of the current process must not be closed
    owned: bool,
}

// SAFETY: a process HANDLE is a kernel object reference that may be used from
// any thread; the Win32 memory APIs used here are thread-safe.
unsafe impl Send for Process {}
unsafe impl Sync for Process {}

impl Process {
    pub(super) fn open(descriptor: &ProcessDescriptor) -> Result<(Self, u32, u64)> {
        let (process, pid) = if descriptor.current_process {
            // SAFETY: both calls have no preconditions.
            let (handle, pid) = unsafe { (GetCurrentProcess(), GetCurrentProcessId()) };
            (
                Self {
                    handle,
                    owned: false,
                },
                pid,
            )
        } else {
            let pid = find_pid_by_name(&descriptor.name)?;
            // SAFETY: OpenProcess has no memory-safety preconditions.
            let handle = unsafe {
                OpenProcess(
                    PROCESS_QUERY_INFORMATION
                        | PROCESS_VM_READ
                        | PROCESS_VM_WRITE
                        | PROCESS_VM_OPERATION,
                    false,
                    pid,
                )
            }
            .map_err(|e| Error::ProcessOpenFailed(format!("pid {}: {}", pid, e)))?;
            (
                Self {
                    handle,
                    owned: true,
                },
                pid,
            )
        };

        let base = main_module_base(pid)?;
        Ok((process, pid, base))
    }

    pub(super) fn query(&self, address: u64) -> Option<MemoryRegion> {
        let mut mbi = MEMORY_BASIC_INFORMATION::default();
        // SAFETY: mbi is a valid out-buffer of the size we pass.
        let written = unsafe {
            VirtualQueryEx(
                self.handle,
                Some(address as *const c_void),
                &mut mbi,
                size_of::<MEMORY_BASIC_INFORMATION>(),
            )
        };
        if written == 0 {
            return None;
        }

        let state = if mbi.State == MEM_COMMIT {
            RegionState::Committed
        } else if mbi.State == MEM_RESERVE {
            RegionState::Reserved
        } else {
            RegionState::Free
        };

        Some(MemoryRegion {
            base: mbi.BaseAddress as u64,
            size: mbi.RegionSize as u64,
            state,
            protection: Protection(mbi.Protect.0),
        })
    }

    pub(super) fn read(&self, address: u64, buf: &mut [u8]) -> Result<()> {
        let mut read = 0usize;
        // SAFETY: buf is a valid writable buffer of buf.len() bytes.
        unsafe {
            ReadProcessMemory(
                self.handle,
                address as *const c_void,
                buf.as_mut_ptr().cast(),
                buf.len(),
                Some(&mut read),
            )
        }
        .map_err(|e| Error::MemoryReadFailed {
            address,
            message: e.to_string(),
        })?;

        if read != buf.len() {
            return Err(Error::MemoryReadFailed {
                address,
                message: format!("short read ({} of {} bytes)", read, buf.len()),
            });
        }
        Ok(())
    }

    pub(super) fn write(&self, address: u64, bytes: &[u8]) -> Result<()> {
        let mut written = 0usize;
        // SAFETY: bytes is a valid readable buffer of bytes.len() bytes.
        unsafe {
            WriteProcessMemory(
                self.handle,
                address as *const c_void,
                bytes.as_ptr().cast(),
                bytes.len(),
                Some(&mut written),
            )
        }
        .map_err(|e| Error::MemoryWriteFailed {
            address,
            message: e.to_string(),
        })?;

        if written != bytes.len() {
            return Err(Error::MemoryWriteFailed {
                address,
                message: format!("short write ({} of {} bytes)", written, bytes.len()),
            });
        }
        Ok(())
    }
}

impl Drop for Process {
    fn drop(&mut self) {
        if self.owned {
            // SAFETY: the handle came from OpenProcess and is closed once.
            unsafe {
                let _ = CloseHandle(self.handle);
            }
        }
    }
}

fn wide_to_string(wide: &[u16]) -> String {
    let len = wide.iter().position(|&c| c == 0).unwrap_or(wide.len());
    String::from_utf16_lossy(&wide[..len])
}

fn find_pid_by_name(name: &str) -> Result<u32> {
    // SAFETY: snapshot creation has no preconditions.
    let snapshot = unsafe { CreateToolhelp32Snapshot(TH32CS_SNAPPROCESS, 0) }
        .map_err(|e| Error::ProcessOpenFailed(format!("process snapshot: {}", e)))?;

    let mut entry = PROCESSENTRY32W {
        dwSize: size_of::<PROCESSENTRY32W>() as u32,
        ..Default::default()
    };

    let mut found = None;
    // SAFETY: entry is initialized with the correct dwSize.
    let mut ok = unsafe { Process32FirstW(snapshot, &mut entry) }.is_ok();
    while ok {
        if wide_to_string(&entry.szExeFile).eq_ignore_ascii_case(name) {
            found = Some(entry.th32ProcessID);
            break;
        }
        // SAFETY: same entry buffer, same snapshot.
        ok = unsafe { Process32NextW(snapshot, &mut entry) }.is_ok();
    }

    // SAFETY: snapshot handle is owned here and closed once.
    unsafe {
        let _ = CloseHandle(snapshot);
    }

    found.ok_or_else(|| Error::ProcessNotFound(name.to_string()))
}

/// Base of the first module in the process, which is the executable.
fn main_module_base(pid: u32) -> Result<u64> {
    // SAFETY: snapshot creation has no preconditions.
    let snapshot =
        unsafe { CreateToolhelp32Snapshot(TH32CS_SNAPMODULE | TH32CS_SNAPMODULE32, pid) }
            .map_err(|e| Error::ProcessOpenFailed(format!("module snapshot: {}", e)))?;

    let mut entry = MODULEENTRY32W {
        dwSize: size_of::<MODULEENTRY32W>() as u32,
        ..Default::default()
    };

    // SAFETY: entry is initialized with the correct dwSize.
    let result = unsafe { Module32FirstW(snapshot, &mut entry) };

    // SAFETY: snapshot handle is owned here and closed once.
    unsafe {
        let _ = CloseHandle(snapshot);
    }

    result.map_err(|e| Error::ProcessOpenFailed(format!("main module of pid {}: {}", pid, e)))?;
    Ok(entry.modBaseAddr as u64)
}
