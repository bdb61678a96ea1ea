//! ResultSet sink: the enriched records, replaced as one JSON array.

use std::path::Path;

use tracing::{info, instrument};

use creatorlens_shared::{CreatorLensError, EnrichedRecord, Result};

use crate::write_json_atomic;

/// Replace the ResultSet file at `path` with `records`, as a JSON array.
#[instrument(skip_all, fields(path = %path.display(), records = records.len()))]
pub fn write_result_set(path: &Path, records: &[EnrichedRecord]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| CreatorLensError::io(parent, e))?;
    }

    write_json_atomic(path, records)?;
    info!("result set written");
    Ok(())
}
