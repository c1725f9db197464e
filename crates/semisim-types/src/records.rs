//! Result records produced by a simulation run.
//!
//! A completed run yields one [`YearSnapshot`] per simulated year, keyed by
//! year in [`SimulationResults`]. Each snapshot holds one flat
//! [`SnapshotRecord`] per entity, grouped by category. For reporting, the
//! same data is reshaped into [`Trajectories`]: per category, per entity, an
//! ascending-year sequence of [`TrajectoryPoint`]s.
//!
//! Both shapes serialize to human-readable YAML or JSON with `model_id` and
//! `name` (and `year` for trajectory points) followed by the entity's
//! attributes at the same level.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::Year;
use crate::value::ScalarValue;

/// The flattened state of one entity at the end of a year step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotRecord {
    /// The entity's id.
    pub model_id: String,
    /// The entity's display name.
    pub name: String,
    /// Every attribute, flattened to a scalar.
    #[serde(flatten)]
    pub attributes: BTreeMap<String, ScalarValue>,
}

/// All entity records for one year, grouped by category name.
pub type YearSnapshot = BTreeMap<String, Vec<SnapshotRecord>>;

/// The full result log of a run: one snapshot per completed year.
pub type SimulationResults = BTreeMap<Year, YearSnapshot>;

/// One entity's state in one year, as it appears in a trajectory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryPoint {
    /// The year this point was recorded.
    pub year: Year,
    /// The entity's id.
    pub model_id: String,
    /// The entity's display name.
    pub name: String,
    /// Every attribute, flattened to a scalar.
    #[serde(flatten)]
    pub attributes: BTreeMap<String, ScalarValue>,
}

impl TrajectoryPoint {
    /// Build a trajectory point from a snapshot record taken in `year`.
    pub fn from_record(year: Year, record: &SnapshotRecord) -> Self {
        Self {
            year,
            model_id: record.model_id.clone(),
            name: record.name.clone(),
            attributes: record.attributes.clone(),
        }
    }
}

/// Per-entity trajectories: category, then entity id, then ascending years.
pub type Trajectories = BTreeMap<String, BTreeMap<String, Vec<TrajectoryPoint>>>;
