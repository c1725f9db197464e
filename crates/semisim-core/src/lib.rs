//! Entity model, module contract, and year-stepped scheduler for semisim.
//!
//! This crate owns the simulation loop: a [`SimulationManager`] loads a
//! scenario into an [`EntityRegistry`], initializes an ordered list of
//! [`Module`]s, and steps them through every year of the scenario,
//! capturing one snapshot per year.
//!
//! # Modules
//!
//! - [`calendar`] -- Validated, inclusive year range.
//! - [`config`] -- Engine configuration loaded from `semisim.yaml`.
//! - [`entity`] -- Entities with attribute storage and per-year history.
//! - [`kind`] -- The closed set of entity kinds and their typed fields.
//! - [`manager`] -- Lifecycle phases and the year loop.
//! - [`module`] -- The [`Module`] trait and the per-year [`YearContext`].
//! - [`registry`] -- Entity arena, categories, and module write scopes.
//! - [`scenario`] -- Scenario documents and the partial-load policy.
//! - [`snapshot`] -- Year-end snapshots of the registry.
//! - [`trajectory`] -- Per-entity regrouping of the results.

pub mod calendar;
pub mod config;
pub mod entity;
pub mod kind;
pub mod manager;
pub mod module;
pub mod registry;
pub mod scenario;
pub mod snapshot;
pub mod trajectory;

pub use calendar::{CalendarError, YearRange};
pub use config::{ConfigError, EngineConfig, ExportFormat, LoggingConfig, RunConfig};
pub use entity::{Entity, EntityError};
pub use kind::{ConstructionError, EntityKind};
pub use manager::{ManagerError, RunPhase, SimulationManager};
pub use module::{Module, ModuleError, YearContext};
pub use registry::{CategoryKinds, EntityHandle, EntityRegistry, RegistryError, RegistryView};
pub use scenario::{LoadDiagnostic, LoadReport, ScenarioDocument, ScenarioError, ScenarioLoader};
