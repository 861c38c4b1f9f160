use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::memory::MemoryReader;
use crate::offset::OffsetsCollection;

/// Code pattern whose RIP-relative operand points at a wanted address.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeSignature {
    pub pattern: String,
    /// Start of the referencing instruction, relative to the match
    pub instr_offset: usize,
    /// Position of the 32-bit displacement, relative to the instruction
    pub disp_offset: usize,
    pub instr_len: usize,
    #[serde(default)]
    pub deref: bool,
    #[serde(default)]
    pub addend: i64,
}

impl CodeSignature {
    pub fn pattern_bytes(&self) -> Result<Vec<Option<u8>>> {
        parse_pattern(&self.pattern)
    }

    /// Scan the main module and decode the referenced absolute address.
    pub fn resolve(&self, reader: &MemoryReader, scan_size: usize) -> Result<u64> {
        let pattern = self.pattern_bytes()?;
        let hit = reader.scan(reader.base_address(), scan_size, &pattern)?;

        let instr = hit + self.instr_offset as u64;
        let disp = reader.read_i32(instr + self.disp_offset as u64)?;
        let next = instr + self.instr_len as u64;
        let mut target = next.wrapping_add_signed(disp as i64);

        if self.deref {
            target = reader.read_u64(target)?;
        }
        Ok(target.wrapping_add_signed(self.addend))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OffsetSignatureEntry {
    /// `camera`, `local_player`, `entity_list` or `current_bullet`
    pub name: String,
    pub signatures: Vec<CodeSignature>,
}

/// Replace static bases with addresses found by signature.
///
/// The first signature of an entry that resolves wins. Entries that fail
/// keep their table value. Returns the number of bases updated.
pub fn apply_signatures(offsets: &mut OffsetsCollection, reader: &MemoryReader) -> usize {
    let scan_size = offsets.constants.pattern_scan_size;
    let module_base = reader.base_address();
    let entries = offsets.signatures.clone();
    let mut applied = 0;

    for entry in &entries {
        let Some(path) = offsets.path_mut(&entry.name) else {
            warn!("Unknown signature entry '{}'", entry.name);
            continue;
        };

        let resolved = entry
            .signatures
            .iter()
            .find_map(|sig| match sig.resolve(reader, scan_size) {
                Ok(addr) => Some((addr, sig)),
                Err(e) => {
                    debug!("  {}: signature {} failed: {}", entry.name, sig.pattern, e);
                    None
                }
            });

        match resolved {
            Some((addr, sig)) => {
                path.base = addr.wrapping_sub(module_base);
                debug!(
                    "  {}: 0x{:X} (signature: {})",
                    entry.name, path.base, sig.pattern
                );
                applied += 1;
            }
            None => warn!(
                "No signature matched for {}, keeping base 0x{:X}",
                entry.name, path.base
            ),
        }
    }

    applied
}

pub fn parse_pattern(pattern: &str) -> Result<Vec<Option<u8>>> {
    let mut bytes = Vec::new();
    for token in pattern.split_whitespace() {
        if token == "??" || token == "?" {
            bytes.push(None);
            continue;
        }

        let value = u8::from_str_radix(token, 16).map_err(|e| {
            Error::InvalidPattern(format!("Invalid signature token '{}': {}", token, e))
        })?;
        bytes.push(Some(value));
    }

    if bytes.is_empty() {
        return Err(Error::InvalidPattern("Signature pattern is empty".to_string()));
    }

    Ok(bytes)
}

pub fn format_pattern(bytes: &[Option<u8>]) -> String {
    bytes
        .iter()
        .map(|b| match b {
            Some(value) => format!("{:02X}", value),
            None => "??".to_string(),
        })
        .collect::<Vec<_>>()
        .join(" ")
}
