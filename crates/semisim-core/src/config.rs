//! Engine configuration loaded from `semisim.yaml`.
//!
//! The file controls which scenario is run, where scenarios are read from,
//! where results are written, and how logs are emitted. Every field has a
//! default, so an empty or missing file yields a working configuration.
//! A handful of environment variables override the file (see
//! [`EngineConfig::apply_env_overrides`]).
//!
//! Scenario-wide model constants are not configured here; they live in each
//! scenario's `global_parameters`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Overrides [`RunConfig::scenario`].
pub const ENV_SCENARIO: &str = "SEMISIM_SCENARIO";
/// Overrides [`RunConfig::results_dir`].
pub const ENV_RESULTS_DIR: &str = "SEMISIM_RESULTS_DIR";
/// Overrides [`LoggingConfig::level`].
pub const ENV_LOG_LEVEL: &str = "SEMISIM_LOG_LEVEL";

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// What to run and where files live.
    #[serde(default)]
    pub run: RunConfig,

    /// Log output settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl EngineConfig {
    /// Load configuration from a YAML file, then apply environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config = Self::parse(&contents)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a YAML string. No overrides are applied.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yml::from_str(yaml)?;
        Ok(config)
    }

    /// Apply overrides from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary key lookup.
    pub fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(val) = lookup(ENV_SCENARIO) {
            self.run.scenario = val;
        }
        if let Some(val) = lookup(ENV_RESULTS_DIR) {
            self.run.results_dir = PathBuf::from(val);
        }
        if let Some(val) = lookup(ENV_LOG_LEVEL) {
            self.logging.level = val;
        }
    }

    /// Path of the YAML file for the configured scenario.
    pub fn scenario_path(&self) -> PathBuf {
        self.run
            .scenarios_dir
            .join(format!("{}.yaml", self.run.scenario))
    }
}

/// Run selection and file locations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Scenario name; the file read is `<scenarios_dir>/<scenario>.yaml`.
    #[serde(default = "default_scenario")]
    pub scenario: String,

    /// Directory holding scenario files.
    #[serde(default = "default_scenarios_dir")]
    pub scenarios_dir: PathBuf,

    /// Directory results are written to.
    #[serde(default = "default_results_dir")]
    pub results_dir: PathBuf,

    /// Serialization format of the result files.
    #[serde(default)]
    pub export_format: ExportFormat,

    /// Write the built-in test scenario when the scenario file is missing.
    #[serde(default = "default_true")]
    pub bootstrap_missing_scenario: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            scenario: default_scenario(),
            scenarios_dir: default_scenarios_dir(),
            results_dir: default_results_dir(),
            export_format: ExportFormat::default(),
            bootstrap_missing_scenario: true,
        }
    }
}

/// Result file format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// YAML documents.
    #[default]
    Yaml,
    /// Pretty-printed JSON.
    Json,
}

impl ExportFormat {
    /// File extension without the dot.
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Yaml => "yaml",
            Self::Json => "json",
        }
    }
}

/// Log output settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_scenario() -> String {
    "test_scenario".to_owned()
}

fn default_scenarios_dir() -> PathBuf {
    PathBuf::from("config/scenarios")
}

fn default_results_dir() -> PathBuf {
    PathBuf::from("results")
}

const fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_owned()
}
