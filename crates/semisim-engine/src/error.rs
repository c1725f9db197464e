//! Error types for the engine binary.
//!
//! [`EngineError`] wraps every failure mode of a run so that `main` can
//! propagate with `?`.

use std::path::PathBuf;

/// Top-level error for the engine binary.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: semisim_core::ConfigError,
    },

    /// The scenario document could not be read or parsed.
    #[error("scenario error: {source}")]
    Scenario {
        /// The underlying scenario error.
        #[from]
        source: semisim_core::ScenarioError,
    },

    /// The scenario file does not exist and bootstrapping is disabled.
    #[error("scenario file not found: {}", path.display())]
    ScenarioMissing {
        /// Path that was looked up.
        path: PathBuf,
    },

    /// Loading, initialization, or a year step failed.
    #[error("simulation error: {source}")]
    Simulation {
        /// The underlying manager error.
        #[from]
        source: semisim_core::ManagerError,
    },

    /// A file could not be written.
    #[error("failed to write {}: {source}", path.display())]
    Write {
        /// Target path.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Results could not be serialized.
    #[error("failed to serialize {what}: {message}")]
    Serialize {
        /// What was being serialized.
        what: &'static str,
        /// Description of the serializer failure.
        message: String,
    },
}
