use std::fs;
use std::path::Path;

use tracing::info;

use crate::error::{Error, Result};
use crate::offset::OffsetsCollection;

/// Load an offsets table from JSON.
///
/// A table missing the version or one of the world pointers is rejected;
/// bullet offsets are optional.
pub fn load_offsets<P: AsRef<Path>>(path: P) -> Result<OffsetsCollection> {
    let content = fs::read_to_string(&path)?;
    let offsets: OffsetsCollection = serde_json::from_str(&content)?;

    if !offsets.is_valid() {
        return Err(Error::InvalidOffset(format!(
            "{}: version, camera, local_player and entity_list are required",
            path.as_ref().display()
        )));
    }

    info!(
        "Loaded offsets {} ({} entity types, {} signature entries)",
        offsets.version,
        offsets.entity_types.len(),
        offsets.signatures.len()
    );
    Ok(offsets)
}

pub fn save_offsets<P: AsRef<Path>>(path: P, offsets: &OffsetsCollection) -> Result<()> {
    let content = serde_json::to_string_pretty(offsets)?;
    fs::write(path, content)?;
    Ok(())
}
