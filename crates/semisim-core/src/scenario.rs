//! Scenario documents and the partial-load policy that turns them into entities.
//!
//! A scenario is a YAML document:
//!
//! ```yaml
//! scenario_name: baseline
//! start_year: 2025
//! end_year: 2030
//! global_parameters:
//!   price_sensitivity_to_gap: 0.01
//! models_initial_state:
//!   regions:
//!     - model_id: USA
//!       name: United States
//!       initial_attributes:
//!         gdp_trillion_usd: 25.0
//! ```
//!
//! Loading never fails as a whole because of one bad record. Each record is
//! validated on its own; rejected records are skipped and reported as a
//! [`LoadDiagnostic`] in the returned [`LoadReport`].

use std::collections::BTreeMap;
use std::path::Path;

use semisim_types::{EntityId, EntityKindTag, GlobalParameters, Value, Year};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::entity::Entity;
use crate::registry::{CategoryKinds, EntityRegistry, RegistryError};

/// Record key holding the entity id.
pub const MODEL_ID: &str = "model_id";
/// Record key holding the display name.
pub const NAME: &str = "name";
/// Record key holding the attribute mapping.
pub const INITIAL_ATTRIBUTES: &str = "initial_attributes";

/// Errors that can occur when reading a scenario document.
#[derive(Debug, thiserror::Error)]
pub enum ScenarioError {
    /// Failed to read the scenario file from disk.
    #[error("failed to read scenario file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse scenario YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },
}

impl From<serde_yml::Error> for ScenarioError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// A parsed scenario document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioDocument {
    /// Optional name carried inside the document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scenario_name: Option<String>,

    /// First simulated year.
    #[serde(default = "default_start_year", alias = "simulation_start_year")]
    pub start_year: Year,

    /// Last simulated year (inclusive).
    #[serde(default = "default_end_year", alias = "simulation_end_year")]
    pub end_year: Year,

    /// Scenario-wide constants.
    #[serde(default)]
    pub global_parameters: GlobalParameters,

    /// Entity records per category. Kept untyped so each record can be
    /// validated individually.
    #[serde(default)]
    pub models_initial_state: BTreeMap<String, Value>,
}

impl Default for ScenarioDocument {
    fn default() -> Self {
        Self {
            scenario_name: None,
            start_year: default_start_year(),
            end_year: default_end_year(),
            global_parameters: GlobalParameters::new(),
            models_initial_state: BTreeMap::new(),
        }
    }
}

impl ScenarioDocument {
    /// Load a scenario from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`ScenarioError::Io`] if the file cannot be read, or
    /// [`ScenarioError::Yaml`] if the content is not a valid scenario.
    pub fn from_file(path: &Path) -> Result<Self, ScenarioError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse a scenario from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ScenarioError::Yaml`] if the string is not a valid scenario.
    pub fn parse(yaml: &str) -> Result<Self, ScenarioError> {
        let doc: Self = serde_yml::from_str(yaml)?;
        Ok(doc)
    }
}

const fn default_start_year() -> Year {
    2025
}

const fn default_end_year() -> Year {
    2040
}

/// A non-fatal problem found while loading one record or category.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoadDiagnostic {
    /// A record lacks `model_id` or `name`, or has it empty.
    #[error("{category}[{index}]: missing `{field}`, record skipped")]
    MissingField {
        /// Category of the record.
        category: String,
        /// Position of the record in its category.
        index: usize,
        /// The missing key.
        field: &'static str,
    },

    /// A record or category has a value of the wrong shape.
    #[error("{category}[{index}]: invalid `{field}` ({reason}), record skipped")]
    InvalidField {
        /// Category of the record.
        category: String,
        /// Position of the record in its category.
        index: usize,
        /// The offending key.
        field: String,
        /// What was wrong with it.
        reason: String,
    },

    /// No entity kind is registered for the category name.
    #[error("no entity kind for category `{category}`, category skipped")]
    UnknownCategory {
        /// The unmapped category name.
        category: String,
    },

    /// A record reuses an id already taken in its category.
    #[error("{category}: duplicate id {id}, later record skipped")]
    DuplicateId {
        /// Category of the record.
        category: String,
        /// The repeated id.
        id: EntityId,
    },

    /// The entity kind rejected the record's attributes.
    #[error("{category}/{id}: invalid `{field}` ({reason}), entity skipped")]
    Construction {
        /// Category of the record.
        category: String,
        /// Id of the rejected entity.
        id: EntityId,
        /// The offending attribute.
        field: String,
        /// What was wrong with it.
        reason: String,
    },
}

/// Outcome of loading a scenario into a registry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Number of entities built per category.
    pub entity_counts: BTreeMap<String, usize>,
    /// Every record or category that was skipped. Categories are visited in
    /// name order; records within a category in document order.
    pub diagnostics: Vec<LoadDiagnostic>,
}

impl LoadReport {
    /// Total number of entities built.
    pub fn total_entities(&self) -> usize {
        self.entity_counts.values().sum()
    }

    /// Whether every record loaded.
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }

    fn push(&mut self, diagnostic: LoadDiagnostic) {
        warn!(%diagnostic, "Scenario record rejected");
        self.diagnostics.push(diagnostic);
    }
}

/// Builds entities from scenario records.
#[derive(Debug, Clone, Default)]
pub struct ScenarioLoader {
    kinds: CategoryKinds,
}

impl ScenarioLoader {
    /// Create a loader with the given category mapping.
    pub const fn new(kinds: CategoryKinds) -> Self {
        Self { kinds }
    }

    /// Populate `registry` from `doc`'s records.
    ///
    /// Every mapped category in the document is declared, even when none of
    /// its records survive. Each skipped record is logged and reported.
    pub fn load(&self, doc: &ScenarioDocument, registry: &mut EntityRegistry) -> LoadReport {
        let mut report = LoadReport::default();

        for (raw_category, records) in &doc.models_initial_state {
            let Some((category, kind)) = self.kinds.resolve(raw_category) else {
                report.push(LoadDiagnostic::UnknownCategory {
                    category: raw_category.clone(),
                });
                continue;
            };
            registry.add_category(category, kind);

            let records = match records {
                Value::List(records) => records.as_slice(),
                Value::Null => &[],
                other => {
                    report.push(LoadDiagnostic::InvalidField {
                        category: category.to_owned(),
                        index: 0,
                        field: category.to_owned(),
                        reason: format!("expected sequence, found {}", other.type_name()),
                    });
                    continue;
                }
            };

            let mut loaded = 0_usize;
            for (index, record) in records.iter().enumerate() {
                let entity = match build_entity(category, index, kind, record) {
                    Ok(entity) => entity,
                    Err(diagnostic) => {
                        report.push(diagnostic);
                        continue;
                    }
                };
                let id = entity.id().clone();
                match registry.insert(category, entity) {
                    Ok(_) => loaded = loaded.saturating_add(1),
                    Err(RegistryError::DuplicateId { .. }) => {
                        report.push(LoadDiagnostic::DuplicateId {
                            category: category.to_owned(),
                            id,
                        });
                    }
                    Err(e @ RegistryError::KindMismatch { .. }) => {
                        report.push(LoadDiagnostic::Construction {
                            category: category.to_owned(),
                            id,
                            field: "kind".to_owned(),
                            reason: e.to_string(),
                        });
                    }
                }
            }

            let count = report
                .entity_counts
                .entry(category.to_owned())
                .or_default();
            *count = count.saturating_add(loaded);
            info!(category, kind = %kind, count = loaded, "Category loaded");
        }

        report
    }
}

fn build_entity(
    category: &str,
    index: usize,
    kind: EntityKindTag,
    record: &Value,
) -> Result<Entity, LoadDiagnostic> {
    let invalid = |field: &str, reason: String| LoadDiagnostic::InvalidField {
        category: category.to_owned(),
        index,
        field: field.to_owned(),
        reason,
    };

    let Some(fields) = record.as_map() else {
        return Err(invalid(
            "record",
            format!("expected mapping, found {}", record.type_name()),
        ));
    };

    let required = |field: &'static str| -> Result<String, LoadDiagnostic> {
        match fields.get(field) {
            None | Some(Value::Null) => Err(LoadDiagnostic::MissingField {
                category: category.to_owned(),
                index,
                field,
            }),
            Some(Value::Text(s)) if s.is_empty() => Err(LoadDiagnostic::MissingField {
                category: category.to_owned(),
                index,
                field,
            }),
            Some(Value::Text(s)) => Ok(s.clone()),
            Some(other) => Err(invalid(
                field,
                format!("expected string, found {}", other.type_name()),
            )),
        }
    };
    let id = required(MODEL_ID)?;
    let name = required(NAME)?;

    let mut attributes = match fields.get(INITIAL_ATTRIBUTES) {
        None | Some(Value::Null) => BTreeMap::new(),
        Some(Value::Map(attrs)) => attrs.clone(),
        Some(other) => {
            return Err(invalid(
                INITIAL_ATTRIBUTES,
                format!("expected mapping, found {}", other.type_name()),
            ));
        }
    };
    for (key, value) in fields {
        if key == MODEL_ID || key == NAME || key == INITIAL_ATTRIBUTES {
            continue;
        }
        attributes
            .entry(key.clone())
            .or_insert_with(|| value.clone());
    }

    Entity::new(kind, id.as_str(), name, attributes).map_err(|e| LoadDiagnostic::Construction {
        category: category.to_owned(),
        id: EntityId::new(id.as_str()),
        field: e.field,
        reason: e.reason,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use semisim_types::CompanyType;

    use super::*;
    use crate::registry::{COMPANIES, REGIONS, TECHNOLOGY_NODES};

    fn load(yaml: &str) -> (EntityRegistry, LoadReport) {
        let doc = ScenarioDocument::parse(yaml).unwrap();
        let mut registry = EntityRegistry::new();
        let report = ScenarioLoader::default().load(&doc, &mut registry);
        (registry, report)
    }

    #[test]
    fn years_default_when_absent() {
        let doc = ScenarioDocument::parse("global_parameters: {}\n").unwrap();
        assert_eq!(doc.start_year, 2025);
        assert_eq!(doc.end_year, 2040);
    }

    #[test]
    fn alternate_year_spelling_is_accepted() {
        let doc =
            ScenarioDocument::parse("simulation_start_year: 2024\nsimulation_end_year: 2026\n")
                .unwrap();
        assert_eq!((doc.start_year, doc.end_year), (2024, 2026));
    }

    #[test]
    fn record_without_model_id_is_skipped() {
        let (registry, report) = load(
            "models_initial_state:\n  regions:\n    - name: Nowhere\n    - model_id: USA\n      name: USA\n",
        );
        assert_eq!(registry.count(REGIONS), 1);
        assert_eq!(
            report.diagnostics,
            [LoadDiagnostic::MissingField {
                category: REGIONS.to_owned(),
                index: 0,
                field: MODEL_ID,
            }]
        );
    }

    #[test]
    fn empty_name_counts_as_missing() {
        let (_, report) =
            load("models_initial_state:\n  regions:\n    - model_id: X\n      name: ''\n");
        assert!(matches!(
            report.diagnostics.first(),
            Some(LoadDiagnostic::MissingField { field: NAME, .. })
        ));
    }

    #[test]
    fn unknown_category_is_reported_and_skipped() {
        let (registry, report) =
            load("models_initial_state:\n  fabs:\n    - model_id: F1\n      name: Fab\n");
        assert!(registry.is_empty());
        assert!(matches!(
            report.diagnostics.first(),
            Some(LoadDiagnostic::UnknownCategory { category }) if category == "fabs"
        ));
    }

    #[test]
    fn duplicate_id_keeps_first_record() {
        let (registry, report) = load(
            "models_initial_state:\n  regions:\n    - {model_id: USA, name: First}\n    - {model_id: USA, name: Second}\n",
        );
        let handle = registry.find(REGIONS, "USA").unwrap();
        assert_eq!(registry.get(handle).unwrap().display_name(), "First");
        assert_eq!(report.entity_counts.get(REGIONS), Some(&1));
        assert!(matches!(
            report.diagnostics.first(),
            Some(LoadDiagnostic::DuplicateId { .. })
        ));
    }

    #[test]
    fn bad_policy_year_is_a_construction_diagnostic() {
        let (registry, report) = load(
            "models_initial_state:\n  policies:\n    - model_id: P1\n      name: P\n      initial_attributes:\n        start_year: soon\n",
        );
        assert_eq!(registry.len(), 0);
        assert!(matches!(
            report.diagnostics.first(),
            Some(LoadDiagnostic::Construction { field, .. }) if field == "start_year"
        ));
    }

    #[test]
    fn top_level_extras_fold_into_attributes() {
        let (registry, report) = load(
            "models_initial_state:\n  companies:\n    - model_id: C1\n      name: C\n      company_type: Foundry\n      headquarters: Taipei\n      initial_attributes:\n        headquarters: Hsinchu\n",
        );
        assert!(report.is_clean());
        let company = registry
            .get(registry.find(COMPANIES, "C1").unwrap())
            .unwrap();
        assert_eq!(company.kind().company_type(), Some(CompanyType::Foundry));
        assert_eq!(company.get("headquarters"), Some(&Value::from("Hsinchu")));
    }

    #[test]
    fn alias_category_loads_into_canonical_name() {
        let (registry, _) =
            load("models_initial_state:\n  tech_nodes:\n    - {model_id: 3nm, name: 3nm}\n");
        assert!(registry.find(TECHNOLOGY_NODES, "3nm").is_some());
    }

    #[test]
    fn alias_and_canonical_spelling_share_one_namespace() {
        let (registry, report) = load(
            "models_initial_state:\n  technology_nodes:\n    - {model_id: n3, name: Second}\n  tech_nodes:\n    - {model_id: n3, name: First}\n",
        );
        assert_eq!(registry.count(TECHNOLOGY_NODES), 1);
        let handle = registry.find(TECHNOLOGY_NODES, "n3").unwrap();
        assert_eq!(registry.get(handle).unwrap().display_name(), "First");
        assert_eq!(
            report.diagnostics,
            [LoadDiagnostic::DuplicateId {
                category: TECHNOLOGY_NODES.to_owned(),
                id: EntityId::new("n3"),
            }]
        );
    }

    #[test]
    fn diagnostics_follow_category_name_order() {
        let (_, report) = load(
            "models_initial_state:\n  regions:\n    - name: No id\n  companies:\n    - model_id: C1\n    - name: No id\n",
        );
        assert_eq!(
            report.diagnostics,
            [
                LoadDiagnostic::MissingField {
                    category: COMPANIES.to_owned(),
                    index: 0,
                    field: NAME,
                },
                LoadDiagnostic::MissingField {
                    category: COMPANIES.to_owned(),
                    index: 1,
                    field: MODEL_ID,
                },
                LoadDiagnostic::MissingField {
                    category: REGIONS.to_owned(),
                    index: 0,
                    field: MODEL_ID,
                },
            ]
        );
    }

    #[test]
    fn empty_category_is_declared() {
        let (registry, report) = load("models_initial_state:\n  policies: []\n");
        assert_eq!(registry.categories().collect::<Vec<_>>(), ["policies"]);
        assert_eq!(report.total_entities(), 0);
    }

    #[test]
    fn non_mapping_initial_attributes_is_invalid() {
        let (_, report) = load(
            "models_initial_state:\n  regions:\n    - {model_id: X, name: X, initial_attributes: [1, 2]}\n",
        );
        assert!(matches!(
            report.diagnostics.first(),
            Some(LoadDiagnostic::InvalidField { field, .. }) if field == INITIAL_ATTRIBUTES
        ));
    }
}
