//! Reshape year-keyed results into per-entity trajectories.

use semisim_types::{SimulationResults, Trajectories, TrajectoryPoint};

/// Regroup `results` by category and entity id.
///
/// Every snapshot record becomes exactly one [`TrajectoryPoint`]. Points are
/// in ascending year order; years in which an entity has no record are
/// simply absent from its trajectory.
pub fn to_trajectories(results: &SimulationResults) -> Trajectories {
    let mut trajectories = Trajectories::new();
    for (&year, snapshot) in results {
        for (category, records) in snapshot {
            let by_entity = trajectories.entry(category.clone()).or_default();
            for record in records {
                by_entity
                    .entry(record.model_id.clone())
                    .or_default()
                    .push(TrajectoryPoint::from_record(year, record));
            }
        }
    }
    trajectories
}
