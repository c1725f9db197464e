//! Built-in test scenario, written to disk when the configured scenario
//! file is missing.

use std::path::Path;

use tracing::info;

use crate::error::EngineError;

/// YAML of the built-in two-year test scenario.
pub const TEST_SCENARIO: &str = include_str!("../scenarios/test_scenario.yaml");

/// Make sure a scenario file exists at `path`.
///
/// Returns `true` if the built-in scenario was written.
///
/// # Errors
///
/// Returns [`EngineError::ScenarioMissing`] if the file is absent and
/// `bootstrap` is false, or [`EngineError::Write`] if it cannot be created.
pub fn ensure_scenario(path: &Path, bootstrap: bool) -> Result<bool, EngineError> {
    if path.exists() {
        return Ok(false);
    }
    if !bootstrap {
        return Err(EngineError::ScenarioMissing {
            path: path.to_path_buf(),
        });
    }

    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|source| EngineError::Write {
            path: dir.to_path_buf(),
            source,
        })?;
    }
    std::fs::write(path, TEST_SCENARIO).map_err(|source| EngineError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    info!(path = %path.display(), "Built-in test scenario written");
    Ok(true)
}
