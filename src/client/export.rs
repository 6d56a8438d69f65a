use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;

use super::state::ViewState;

/// Write the `components` of the current result as indented JSON to
/// `analysis_<unix-millis>.json` inside `dir`.
pub fn export_components(state: &ViewState, dir: &Path) -> Result<PathBuf> {
    let result = state
        .result
        .as_ref()
        .context("Nothing to export: run an analysis first")?;

    let path = dir.join(format!("analysis_{}.json", Utc::now().timestamp_millis()));
    {
        let staged = serde_json::to_string_pretty(&result.components)?;
        std::fs::write(&path, staged.as_bytes())
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }

    Ok(path)
}
