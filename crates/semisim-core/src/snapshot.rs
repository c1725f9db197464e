//! Year-end snapshots of the registry.

use semisim_types::{SnapshotRecord, YearSnapshot};

use crate::registry::EntityRegistry;

/// Flatten every entity into a [`YearSnapshot`].
///
/// Categories appear in name order, entities in configuration order. The
/// registry is not modified, so capturing twice yields equal snapshots.
pub fn capture(registry: &EntityRegistry) -> YearSnapshot {
    registry
        .categories()
        .map(|category| {
            let records = registry
                .entities(category)
                .map(|(_, entity)| SnapshotRecord {
                    model_id: entity.id().as_str().to_owned(),
                    name: entity.display_name().to_owned(),
                    attributes: entity
                        .attributes()
                        .iter()
                        .map(|(name, value)| (name.clone(), value.to_scalar()))
                        .collect(),
                })
                .collect();
            (category.to_owned(), records)
        })
        .collect()
}
