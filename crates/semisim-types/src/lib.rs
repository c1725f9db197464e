//! Shared type definitions for the semisim scenario engine.
//!
//! This crate is the single source of truth for the data that flows between
//! the engine, the domain modules, and the external reporting collaborators.
//!
//! # Modules
//!
//! - [`value`] -- Dynamically-typed attribute values and their flattened
//!   scalar form used in snapshots.
//! - [`ids`] -- String-backed entity identifier.
//! - [`enums`] -- Entity kinds, company types, and policy types.
//! - [`params`] -- Scenario-wide global parameters with typed lookups.
//! - [`records`] -- Year snapshots, result logs, and per-entity trajectories.

pub mod enums;
pub mod ids;
pub mod params;
pub mod records;
pub mod value;

/// A simulation year. Years are plain calendar integers (e.g. 2025).
pub type Year = i32;

/// Attribute names owned by snapshot and trajectory records themselves.
///
/// Entities may never store an attribute under one of these names, since the
/// flattened records would then carry duplicate keys.
pub const RESERVED_ATTRIBUTES: [&str; 3] = ["model_id", "name", "year"];

// Re-export all public types at crate root for convenience.
pub use enums::{CompanyType, EntityKindTag, PolicyType, UnknownVariant};
pub use ids::EntityId;
pub use params::GlobalParameters;
pub use records::{
    SimulationResults, SnapshotRecord, Trajectories, TrajectoryPoint, YearSnapshot,
};
pub use value::{ScalarValue, Value};
