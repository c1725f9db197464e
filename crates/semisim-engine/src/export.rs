//! Result export.
//!
//! A finished run produces two files in the results directory:
//!
//! - `<scenario>_yearly_results_<stamp>.<ext>` -- year → category → records
//! - `<scenario>_trajectories_<stamp>.<ext>` -- category → entity → points
//!
//! `<stamp>` is a `%Y%m%d_%H%M%S` timestamp so repeated runs never
//! overwrite each other.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use semisim_core::ExportFormat;
use semisim_types::{SimulationResults, Trajectories};
use serde::Serialize;
use tracing::info;

use crate::error::EngineError;

/// Timestamp format appended to result file names.
pub const STAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Paths of the files written by [`write_all`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exported {
    /// Year-keyed snapshots.
    pub yearly_results: PathBuf,
    /// Per-entity trajectories.
    pub trajectories: PathBuf,
}

/// Render a value in the given format.
///
/// # Errors
///
/// Returns [`EngineError::Serialize`] if the serializer rejects the value.
pub fn render<T: Serialize>(
    value: &T,
    format: ExportFormat,
    what: &'static str,
) -> Result<String, EngineError> {
    match format {
        ExportFormat::Yaml => serde_yml::to_string(value).map_err(|e| EngineError::Serialize {
            what,
            message: e.to_string(),
        }),
        ExportFormat::Json => {
            serde_json::to_string_pretty(value).map_err(|e| EngineError::Serialize {
                what,
                message: e.to_string(),
            })
        }
    }
}

/// File name for one export.
pub fn file_name(scenario: &str, kind: &str, stamp: &str, format: ExportFormat) -> String {
    format!("{scenario}_{kind}_{stamp}.{}", format.extension())
}

/// Write yearly results and trajectories under `dir`, creating it if needed.
///
/// # Errors
///
/// Returns [`EngineError::Serialize`] or [`EngineError::Write`].
pub fn write_all(
    dir: &Path,
    scenario: &str,
    format: ExportFormat,
    at: DateTime<Utc>,
    results: &SimulationResults,
    trajectories: &Trajectories,
) -> Result<Exported, EngineError> {
    std::fs::create_dir_all(dir).map_err(|source| EngineError::Write {
        path: dir.to_path_buf(),
        source,
    })?;
    let stamp = at.format(STAMP_FORMAT).to_string();

    let yearly_results = dir.join(file_name(scenario, "yearly_results", &stamp, format));
    write_file(&yearly_results, &render(results, format, "yearly results")?)?;

    let trajectories_path = dir.join(file_name(scenario, "trajectories", &stamp, format));
    write_file(&trajectories_path, &render(trajectories, format, "trajectories")?)?;

    info!(
        yearly_results = %yearly_results.display(),
        trajectories = %trajectories_path.display(),
        format = format.extension(),
        "Results exported"
    );
    Ok(Exported {
        yearly_results,
        trajectories: trajectories_path,
    })
}

fn write_file(path: &Path, contents: &str) -> Result<(), EngineError> {
    std::fs::write(path, contents).map_err(|source| EngineError::Write {
        path: path.to_path_buf(),
        source,
    })
}
