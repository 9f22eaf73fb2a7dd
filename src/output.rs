use std::fs;

use camino::Utf8Path;

use crate::error::AssetError;

/// Narrow seam for per-job progress lines; terminal rendering stays
/// outside the core.
pub trait ProgressSink: Sync {
    fn event(&self, message: &str);
}

/// Prints every event, one line each; the default for the CLI.
pub struct StdoutSink;

impl ProgressSink for StdoutSink {
    fn event(&self, message: &str) {
        println!("{message}");
    }
}

/// Swallows events; used where output would only be noise.
pub struct NullSink;

impl ProgressSink for NullSink {
    fn event(&self, _message: &str) {}
}

/// Writes a pretty-printed JSON dump, temp name first, then rename.
pub fn write_json_dump(path: &Utf8Path, value: &serde_json::Value) -> Result<(), AssetError> {
    let content = serde_json::to_vec_pretty(value)
        .map_err(|err| AssetError::Filesystem(err.to_string()))?;
    let tmp_path = path.with_extension("json.tmp");
    fs::write(tmp_path.as_std_path(), &content)
        .map_err(|err| AssetError::Filesystem(err.to_string()))?;
    fs::rename(tmp_path.as_std_path(), path.as_std_path())
        .map_err(|err| AssetError::Filesystem(err.to_string()))?;
    Ok(())
}
