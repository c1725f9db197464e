//! Entities: identified bags of attributes with a per-year change log.
//!
//! An [`Entity`] is created once from a scenario record and lives for the
//! whole run. Its attribute storage is private; the only write path is
//! [`Entity::set`] (and [`Entity::update`], which goes through `set`), so
//! every change lands in the history under the year it was made.
//!
//! # History policy
//!
//! `history[year][name]` is present if and only if `name` was written during
//! `year`. Several writes to the same attribute in one year overwrite each
//! other: only the year's last value is retained, which is what downstream
//! reporting expects to see.

use std::collections::BTreeMap;

use semisim_types::{
    EntityId, EntityKindTag, GlobalParameters, RESERVED_ATTRIBUTES, Value, Year,
};

use crate::kind::{ConstructionError, EntityKind};

/// Wafer-start demand per node, grown yearly by end markets.
pub const DEMAND_KWPM: &str = "base_demand_wafer_starts_kwpm";
/// Per-node growth rates applied to [`DEMAND_KWPM`].
pub const DEMAND_GROWTH_KWPM: &str = "annual_growth_rate_kwpm";
/// Total end-market demand in billions of USD.
pub const DEMAND_USD: &str = "total_semiconductor_demand_billion_usd";
/// Growth rate applied to [`DEMAND_USD`].
pub const DEMAND_GROWTH_USD: &str = "annual_growth_rate_demand_usd";
/// Technology readiness level of a node (1-9).
pub const MATURITY_TRL: &str = "maturity_trl";
/// TRL at which a node counts as commercialized.
pub const COMMERCIALIZATION_TRL_THRESHOLD: &str = "commercialization_trl_threshold";
/// Year a node first reached its commercialization threshold.
pub const YEAR_COMMERCIALIZED: &str = "year_commercialized";
/// Whether a policy is in force in the current year.
pub const IS_ACTIVE: &str = "is_active";

/// Threshold used when neither the node nor the scenario sets one.
const DEFAULT_COMMERCIALIZATION_TRL: f64 = 7.0;

/// Errors raised by the entity write path.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EntityError {
    /// The attribute name is owned by snapshot records (`model_id`, `name`, `year`).
    #[error("attribute `{attribute}` on {entity} is reserved")]
    ReservedAttribute {
        /// The entity that was written.
        entity: EntityId,
        /// The reserved name.
        attribute: String,
    },

    /// The value does not fit a typed field of the entity's kind.
    #[error("invalid value for `{field}` on {entity}: {reason}")]
    FieldType {
        /// The entity that was written.
        entity: EntityId,
        /// The typed field.
        field: String,
        /// Why the value was rejected.
        reason: String,
    },
}

/// A simulated actor with identity and time-varying attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    id: EntityId,
    display_name: String,
    kind: EntityKind,
    attributes: BTreeMap<String, Value>,
    history: BTreeMap<Year, BTreeMap<String, Value>>,
}

impl Entity {
    /// Build an entity of kind `tag` from its initial attributes.
    ///
    /// Initial attributes are not recorded in the history: history only
    /// tracks writes made during year steps.
    ///
    /// # Errors
    ///
    /// Returns [`ConstructionError`] if an attribute uses a reserved name or
    /// does not match the shape the kind requires.
    pub fn new(
        tag: EntityKindTag,
        id: impl Into<EntityId>,
        display_name: impl Into<String>,
        mut attributes: BTreeMap<String, Value>,
    ) -> Result<Self, ConstructionError> {
        let id = id.into();
        if let Some(reserved) = RESERVED_ATTRIBUTES
            .iter()
            .find(|name| attributes.contains_key(**name))
        {
            return Err(ConstructionError {
                field: (*reserved).to_owned(),
                reason: "reserved attribute name".to_owned(),
            });
        }
        let kind = EntityKind::from_attributes(tag, &id, &mut attributes)?;
        Ok(Self {
            id,
            display_name: display_name.into(),
            kind,
            attributes,
            history: BTreeMap::new(),
        })
    }

    /// The entity's id, unique within its category.
    pub const fn id(&self) -> &EntityId {
        &self.id
    }

    /// Human-readable name.
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Kind-specific typed state.
    pub const fn kind(&self) -> &EntityKind {
        &self.kind
    }

    /// The kind tag.
    pub const fn tag(&self) -> EntityKindTag {
        self.kind.tag()
    }

    /// Current value of an attribute; `None` when it was never set.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    /// Value an attribute held after `year`'s updates.
    ///
    /// Falls back to the current value when the attribute was not written
    /// during `year`.
    pub fn get_at(&self, name: &str, year: Year) -> Option<&Value> {
        self.history
            .get(&year)
            .and_then(|changes| changes.get(name))
            .or_else(|| self.get(name))
    }

    /// Current numeric value of an attribute.
    pub fn get_f64(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(Value::as_f64)
    }

    /// Write an attribute during `year`.
    ///
    /// Updates the current value and records `history[year][name]`,
    /// replacing any earlier write to the same attribute in that year.
    ///
    /// # Errors
    ///
    /// Returns [`EntityError::ReservedAttribute`] for `model_id`, `name`, and
    /// `year`, and [`EntityError::FieldType`] when the value does not fit a
    /// typed field of the entity's kind. The entity is unchanged on error.
    pub fn set(
        &mut self,
        name: &str,
        value: impl Into<Value>,
        year: Year,
    ) -> Result<(), EntityError> {
        if RESERVED_ATTRIBUTES.contains(&name) {
            return Err(EntityError::ReservedAttribute {
                entity: self.id.clone(),
                attribute: name.to_owned(),
            });
        }
        let value = value.into();
        self.kind
            .absorb(name, &value)
            .map_err(|e| EntityError::FieldType {
                entity: self.id.clone(),
                field: e.field,
                reason: e.reason,
            })?;
        self.history
            .entry(year)
            .or_default()
            .insert(name.to_owned(), value.clone());
        self.attributes.insert(name.to_owned(), value);
        Ok(())
    }

    /// Whether `name` was written during `year`.
    pub fn written_in(&self, year: Year, name: &str) -> bool {
        self.history
            .get(&year)
            .is_some_and(|changes| changes.contains_key(name))
    }

    /// All current attributes, in name order.
    pub const fn attributes(&self) -> &BTreeMap<String, Value> {
        &self.attributes
    }

    /// The per-year change log.
    pub const fn history(&self) -> &BTreeMap<Year, BTreeMap<String, Value>> {
        &self.history
    }

    /// Whether the entity is an active policy in `year`; `None` for
    /// non-policy entities.
    pub fn is_active(&self, year: Year) -> Option<bool> {
        self.kind.as_policy().map(|policy| policy.is_active(year))
    }

    /// Apply the kind's own evolution rules for `year`.
    ///
    /// Safe to call any number of times within a year: every rule either
    /// recomputes from current state or runs at most once per year.
    ///
    /// - Regions and companies: no intrinsic evolution.
    /// - Technology nodes: stamp `year_commercialized` once `maturity_trl`
    ///   reaches the commercialization threshold.
    /// - End markets: compound demand by its growth rates, once per year.
    /// - Policies: refresh `is_active` from the activity window.
    ///
    /// # Errors
    ///
    /// Propagates [`EntityError`] from the write path.
    pub fn update(&mut self, year: Year, params: &GlobalParameters) -> Result<(), EntityError> {
        match self.kind.tag() {
            EntityKindTag::Region | EntityKindTag::Company => Ok(()),
            EntityKindTag::TechnologyNode => self.mark_commercialization(year, params),
            EntityKindTag::EndMarket => self.grow_demand(year),
            EntityKindTag::Policy => self.refresh_activity(year),
        }
    }

    fn mark_commercialization(
        &mut self,
        year: Year,
        params: &GlobalParameters,
    ) -> Result<(), EntityError> {
        let Some(trl) = self.get_f64(MATURITY_TRL) else {
            return Ok(());
        };
        let threshold = self.get_f64(COMMERCIALIZATION_TRL_THRESHOLD).unwrap_or_else(|| {
            params.f64_or(COMMERCIALIZATION_TRL_THRESHOLD, DEFAULT_COMMERCIALIZATION_TRL)
        });
        let stamped = self.get(YEAR_COMMERCIALIZED).is_some_and(|v| !v.is_null());
        if trl >= threshold && !stamped {
            self.set(YEAR_COMMERCIALIZED, year, year)?;
        }
        Ok(())
    }

    fn grow_demand(&mut self, year: Year) -> Result<(), EntityError> {
        if !self.written_in(year, DEMAND_KWPM) {
            let grown = match (
                self.get(DEMAND_KWPM).and_then(Value::as_map),
                self.get(DEMAND_GROWTH_KWPM).and_then(Value::as_map),
            ) {
                (Some(demand), Some(rates)) => Some(
                    demand
                        .iter()
                        .map(|(node, current)| {
                            let next = current.as_f64().map_or_else(
                                || current.clone(),
                                |d| {
                                    let rate =
                                        rates.get(node).and_then(Value::as_f64).unwrap_or(0.0);
                                    Value::Float(d * (1.0 + rate))
                                },
                            );
                            (node.clone(), next)
                        })
                        .collect::<BTreeMap<_, _>>(),
                ),
                _ => None,
            };
            if let Some(grown) = grown {
                self.set(DEMAND_KWPM, grown, year)?;
            }
        }

        if !self.written_in(year, DEMAND_USD) {
            if let (Some(current), Some(rate)) =
                (self.get_f64(DEMAND_USD), self.get_f64(DEMAND_GROWTH_USD))
            {
                self.set(DEMAND_USD, current * (1.0 + rate), year)?;
            }
        }
        Ok(())
    }

    fn refresh_activity(&mut self, year: Year) -> Result<(), EntityError> {
        let Some(active) = self.is_active(year) else {
            return Ok(());
        };
        if self.get(IS_ACTIVE).and_then(Value::as_bool) != Some(active) {
            self.set(IS_ACTIVE, active, year)?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::kind::{END_YEAR, START_YEAR};

    fn region(attrs: &[(&str, Value)]) -> Entity {
        let attributes = attrs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), v.clone()))
            .collect();
        Entity::new(EntityKindTag::Region, "usa", "USA", attributes).unwrap()
    }

    fn entity(tag: EntityKindTag, attrs: &[(&str, Value)]) -> Entity {
        let attributes = attrs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), v.clone()))
            .collect();
        Entity::new(tag, "e", "E", attributes).unwrap()
    }

    #[test]
    fn set_then_get_reflects_write() {
        let mut e = region(&[("gdp", Value::Int(100))]);
        e.set("gdp", 110, 2025).unwrap();
        assert_eq!(e.get("gdp"), Some(&Value::Int(110)));
        assert_eq!(e.get_at("gdp", 2025), Some(&Value::Int(110)));
    }

    #[test]
    fn current_value_is_latest_write_regardless_of_year() {
        let mut e = region(&[]);
        e.set("gdp", 120, 2026).unwrap();
        e.set("gdp", 110, 2025).unwrap();
        assert_eq!(e.get("gdp"), Some(&Value::Int(110)));
        assert_eq!(e.get_at("gdp", 2026), Some(&Value::Int(120)));
    }

    #[test]
    fn unwritten_year_falls_back_to_current() {
        let mut e = region(&[("gdp", Value::Int(100))]);
        assert_eq!(e.get_at("gdp", 2025), Some(&Value::Int(100)));
        e.set("gdp", 105, 2026).unwrap();
        assert_eq!(e.get_at("gdp", 2025), Some(&Value::Int(105)));
        assert!(!e.written_in(2025, "gdp"));
        assert!(e.written_in(2026, "gdp"));
    }

    #[test]
    fn missing_attribute_is_absent_not_an_error() {
        let e = region(&[]);
        assert_eq!(e.get("nothing"), None);
        assert_eq!(e.get_at("nothing", 2030), None);
    }

    #[test]
    fn last_write_in_a_year_wins() {
        let mut e = region(&[]);
        e.set("fab_count", 20, 2025).unwrap();
        e.set("fab_count", 21, 2025).unwrap();
        e.set("fab_count", 22, 2025).unwrap();
        let year = e.history().get(&2025).unwrap();
        assert_eq!(year.len(), 1);
        assert_eq!(year.get("fab_count"), Some(&Value::Int(22)));
    }

    #[test]
    fn history_only_records_written_attributes() {
        let mut e = region(&[("gdp", Value::Int(1)), ("labor_cost", Value::Int(2))]);
        e.set("gdp", 3, 2025).unwrap();
        let year = e.history().get(&2025).unwrap();
        assert!(year.contains_key("gdp"));
        assert!(!year.contains_key("labor_cost"));
        assert!(e.history().get(&2026).is_none());
    }

    #[test]
    fn reserved_names_are_rejected() {
        let mut e = region(&[]);
        let err = e.set("name", "Other", 2025).err().unwrap();
        assert!(matches!(err, EntityError::ReservedAttribute { .. }));
        assert!(e.history().is_empty());

        let mut attrs = BTreeMap::new();
        attrs.insert("year".to_owned(), Value::Int(1));
        let err = Entity::new(EntityKindTag::Region, "x", "X", attrs).err().unwrap();
        assert_eq!(err.field, "year");
    }

    #[test]
    fn ill_typed_write_to_typed_field_leaves_entity_unchanged() {
        let mut p = entity(EntityKindTag::Policy, &[(START_YEAR, Value::Int(2025))]);
        let err = p.set(START_YEAR, "later", 2025).err().unwrap();
        assert!(matches!(err, EntityError::FieldType { ref field, .. } if field == START_YEAR));
        assert_eq!(p.get(START_YEAR), Some(&Value::Int(2025)));
        assert!(p.history().is_empty());
    }

    #[test]
    fn policy_activity_follows_window() {
        let mut p = entity(
            EntityKindTag::Policy,
            &[
                ("policy_type", Value::from("InvestmentIncentive")),
                (START_YEAR, Value::Int(2025)),
                (END_YEAR, Value::Int(2028)),
            ],
        );
        assert_eq!(p.is_active(2024), Some(false));
        assert_eq!(p.is_active(2025), Some(true));
        assert_eq!(p.is_active(2028), Some(true));
        assert_eq!(p.is_active(2029), Some(false));

        p.set(END_YEAR, 2026, 2025).unwrap();
        assert_eq!(p.is_active(2027), Some(false));
    }

    #[test]
    fn non_policy_has_no_activity() {
        assert_eq!(region(&[]).is_active(2025), None);
    }

    #[test]
    fn policy_update_is_idempotent() {
        let params = GlobalParameters::new();
        let mut p = entity(EntityKindTag::Policy, &[(START_YEAR, Value::Int(2026))]);
        p.update(2025, &params).unwrap();
        p.update(2025, &params).unwrap();
        assert_eq!(p.get(IS_ACTIVE), Some(&Value::Bool(false)));
        p.update(2026, &params).unwrap();
        assert_eq!(p.get(IS_ACTIVE), Some(&Value::Bool(true)));
        p.update(2027, &params).unwrap();
        assert!(!p.written_in(2027, IS_ACTIVE));
    }

    #[test]
    fn node_commercialization_is_stamped_once() {
        let params = GlobalParameters::new();
        let mut n = entity(
            EntityKindTag::TechnologyNode,
            &[
                (MATURITY_TRL, Value::Float(7.5)),
                (YEAR_COMMERCIALIZED, Value::Null),
            ],
        );
        n.update(2025, &params).unwrap();
        n.update(2026, &params).unwrap();
        assert_eq!(n.get(YEAR_COMMERCIALIZED), Some(&Value::Int(2025)));
    }

    #[test]
    fn node_below_threshold_is_not_stamped() {
        let params = GlobalParameters::new();
        let mut n = entity(
            EntityKindTag::TechnologyNode,
            &[
                (MATURITY_TRL, Value::Int(6)),
                (COMMERCIALIZATION_TRL_THRESHOLD, Value::Int(8)),
            ],
        );
        n.update(2025, &params).unwrap();
        assert_eq!(n.get(YEAR_COMMERCIALIZED), None);
    }

    #[test]
    fn end_market_grows_once_per_year() {
        let params = GlobalParameters::new();
        let demand: BTreeMap<String, Value> = [("3nm".to_owned(), Value::Int(10))].into();
        let rates: BTreeMap<String, Value> = [("3nm".to_owned(), Value::Float(0.5))].into();
        let mut m = entity(
            EntityKindTag::EndMarket,
            &[
                (DEMAND_KWPM, Value::Map(demand)),
                (DEMAND_GROWTH_KWPM, Value::Map(rates)),
                (DEMAND_USD, Value::Float(100.0)),
                (DEMAND_GROWTH_USD, Value::Float(0.1)),
            ],
        );
        m.update(2025, &params).unwrap();
        m.update(2025, &params).unwrap();
        let node = m
            .get(DEMAND_KWPM)
            .and_then(Value::as_map)
            .and_then(|d| d.get("3nm"))
            .and_then(Value::as_f64);
        assert_eq!(node, Some(15.0));
        let usd = m.get_f64(DEMAND_USD).unwrap();
        assert!((usd - 110.0).abs() < 1e-9);

        m.update(2026, &params).unwrap();
        let node = m
            .get(DEMAND_KWPM)
            .and_then(Value::as_map)
            .and_then(|d| d.get("3nm"))
            .and_then(Value::as_f64);
        assert_eq!(node, Some(22.5));
    }

    #[test]
    fn region_update_changes_nothing() {
        let mut e = region(&[("gdp", Value::Int(100))]);
        e.update(2025, &GlobalParameters::new()).unwrap();
        assert!(e.history().is_empty());
    }
}
