//! On-disk persistence for CreatorLens.
//!
//! - [`ContentCache`] keeps one `{username}-casts.json` file per creator. A
//!   present entry is always treated as fresh; clearing it is an operator action.
//! - [`write_result_set`] replaces the ResultSet file in one step.
//!
//! Both write through a temp file and rename, so a file is either fully
//! present or absent.

mod cache;
mod results;

use std::path::Path;

use creatorlens_shared::{CreatorLensError, Result};

pub use cache::ContentCache;
pub use results::write_result_set;

/// Serialize `data` as pretty JSON into `path` via a sibling temp file.
fn write_json_atomic<T: serde::Serialize + ?Sized>(path: &Path, data: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(data).map_err(|e| {
        CreatorLensError::validation(format!("JSON serialization failed: {e}"))
    })?;

    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| CreatorLensError::validation(format!("not a file path: {}", path.display())))?;
    let temp = path.with_file_name(format!(".{file_name}.tmp"));

    std::fs::write(&temp, json).map_err(|e| CreatorLensError::io(&temp, e))?;
    std::fs::rename(&temp, path).map_err(|e| CreatorLensError::io(path, e))?;

    tracing::debug!(path = %path.display(), "wrote JSON file");
    Ok(())
}
