use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Process not found: {0}")]
    ProcessNotFound(String),

    #[error("Failed to open process: {0}")]
    ProcessOpenFailed(String),

    #[error("Process memory access is not supported on this platform")]
    UnsupportedPlatform,

    #[error("Address range {address:#x}+{len} is not mapped")]
    UnmappedAddress { address: u64, len: usize },

    #[error("Address range {address:#x}+{len} does not allow {access}")]
    ProtectionDenied {
        address: u64,
        len: usize,
        access: &'static str,
    },

    #[error("Failed to read process memory at address {address:#x}: {message}")]
    MemoryReadFailed { address: u64, message: String },

    #[error("Failed to write process memory at address {address:#x}: {message}")]
    MemoryWriteFailed { address: u64, message: String },

    #[error("Pointer chain broken at step {step} (address {address:#x})")]
    PointerChainBroken { step: usize, address: u64 },

    #[error("Pattern not found in {start:#x}+{len}")]
    PatternNotFound { start: u64, len: usize },

    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),

    #[error("Invalid offset: {0}")]
    InvalidOffset(String),

    #[error("Host did not signal readiness after {attempts} attempts")]
    StartupTimeout { attempts: u32 },

    #[error("Bullet freeze and bullet redirect are both enabled")]
    ConflictingBulletModes,

    #[error("Invalid setting '{key}': {message}")]
    InvalidSetting { key: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Check if this error is a "file not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::Io(e) if e.kind() == std::io::ErrorKind::NotFound)
    }

    /// Whether the failure came from validating or touching target memory.
    ///
    /// These are "value unavailable this cycle" conditions and are never fatal.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Error::UnmappedAddress { .. }
                | Error::ProtectionDenied { .. }
                | Error::MemoryReadFailed { .. }
                | Error::MemoryWriteFailed { .. }
                | Error::PointerChainBroken { .. }
        )
    }
}
