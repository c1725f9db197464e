//! Entity kinds: the closed set of simulated actors.
//!
//! Every entity carries an open attribute map plus one [`EntityKind`] variant
//! holding the few well-known fields the engine itself relies on (a company's
//! type, a policy's activity window). Those fields are parsed from the
//! attribute map at construction and kept in sync on every write, so a
//! malformed `start_year` is rejected up front instead of surfacing as a
//! silent mismatch mid-run.

use std::collections::BTreeMap;

use semisim_types::{CompanyType, EntityId, EntityKindTag, PolicyType, Value, Year};
use tracing::warn;

/// Attribute holding a company's [`CompanyType`].
pub const COMPANY_TYPE: &str = "company_type";
/// Attribute holding a policy's [`PolicyType`].
pub const POLICY_TYPE: &str = "policy_type";
/// First year a policy is in force (inclusive, optional).
pub const START_YEAR: &str = "start_year";
/// Last year a policy is in force (inclusive, optional).
pub const END_YEAR: &str = "end_year";

/// A configuration value does not match the shape its entity kind requires.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("field `{field}`: {reason}")]
pub struct ConstructionError {
    /// The offending attribute name.
    pub field: String,
    /// What was wrong with it.
    pub reason: String,
}

impl ConstructionError {
    fn new(field: &str, reason: impl Into<String>) -> Self {
        Self {
            field: field.to_owned(),
            reason: reason.into(),
        }
    }
}

/// Kind-specific typed state of an entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityKind {
    /// A geographical or political region.
    Region(Region),
    /// A company.
    Company(Company),
    /// A manufacturing technology node.
    TechnologyNode(TechnologyNode),
    /// A downstream end market.
    EndMarket(EndMarket),
    /// A policy instrument.
    Policy(Policy),
}

/// Typed fields of a region. Regions are fully described by open attributes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Region;

/// Typed fields of a company.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Company {
    /// Business model; `None` when the scenario left it unset.
    pub company_type: Option<CompanyType>,
}

/// Typed fields of a technology node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TechnologyNode;

/// Typed fields of an end market.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EndMarket;

/// Typed fields of a policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Policy {
    /// Instrument category; `None` when the scenario left it unset.
    pub policy_type: Option<PolicyType>,
    /// Years during which the policy is in force.
    pub window: ActivityWindow,
}

impl Policy {
    /// Whether the policy is in force in `year`.
    pub const fn is_active(&self, year: Year) -> bool {
        self.window.contains(year)
    }
}

/// Inclusive year window; an absent bound is unbounded on that side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActivityWindow {
    /// First year in force, if bounded.
    pub start: Option<Year>,
    /// Last year in force, if bounded.
    pub end: Option<Year>,
}

impl ActivityWindow {
    /// `start <= year <= end`, treating a missing bound as open.
    pub const fn contains(&self, year: Year) -> bool {
        let after_start = match self.start {
            Some(start) => year >= start,
            None => true,
        };
        let before_end = match self.end {
            Some(end) => year <= end,
            None => true,
        };
        after_start && before_end
    }
}

impl EntityKind {
    /// Parse the typed fields for `tag` out of an entity's initial attributes.
    ///
    /// Missing `company_type` / `policy_type` are tolerated with a warning and
    /// recorded as explicit nulls so every company and policy exposes the
    /// attribute.
    ///
    /// # Errors
    ///
    /// Returns [`ConstructionError`] naming the field whose value has the
    /// wrong shape.
    pub fn from_attributes(
        tag: EntityKindTag,
        id: &EntityId,
        attributes: &mut BTreeMap<String, Value>,
    ) -> Result<Self, ConstructionError> {
        match tag {
            EntityKindTag::Region => Ok(Self::Region(Region)),
            EntityKindTag::TechnologyNode => Ok(Self::TechnologyNode(TechnologyNode)),
            EntityKindTag::EndMarket => Ok(Self::EndMarket(EndMarket)),
            EntityKindTag::Company => {
                if !attributes.contains_key(COMPANY_TYPE) {
                    warn!(entity = %id, "Company has no company_type attribute");
                    attributes.insert(COMPANY_TYPE.to_owned(), Value::Null);
                }
                let company_type = attributes
                    .get(COMPANY_TYPE)
                    .map_or(Ok(None), parse_company_type)?;
                Ok(Self::Company(Company { company_type }))
            }
            EntityKindTag::Policy => {
                if !attributes.contains_key(POLICY_TYPE) {
                    warn!(entity = %id, "Policy has no policy_type attribute");
                    attributes.insert(POLICY_TYPE.to_owned(), Value::Null);
                }
                let policy_type = attributes
                    .get(POLICY_TYPE)
                    .map_or(Ok(None), parse_policy_type)?;
                let start = attributes
                    .get(START_YEAR)
                    .map_or(Ok(None), |v| parse_year(START_YEAR, v))?;
                let end = attributes
                    .get(END_YEAR)
                    .map_or(Ok(None), |v| parse_year(END_YEAR, v))?;
                Ok(Self::Policy(Policy {
                    policy_type,
                    window: ActivityWindow { start, end },
                }))
            }
        }
    }

    /// The kind tag of this variant.
    pub const fn tag(&self) -> EntityKindTag {
        match self {
            Self::Region(_) => EntityKindTag::Region,
            Self::Company(_) => EntityKindTag::Company,
            Self::TechnologyNode(_) => EntityKindTag::TechnologyNode,
            Self::EndMarket(_) => EntityKindTag::EndMarket,
            Self::Policy(_) => EntityKindTag::Policy,
        }
    }

    /// The company type, for companies that declared one.
    pub const fn company_type(&self) -> Option<CompanyType> {
        match self {
            Self::Company(company) => company.company_type,
            _ => None,
        }
    }

    /// The typed policy fields, for policies.
    pub const fn as_policy(&self) -> Option<&Policy> {
        match self {
            Self::Policy(policy) => Some(policy),
            _ => None,
        }
    }

    /// Mirror a write to attribute `name` into the typed fields.
    ///
    /// Writes to attributes this kind does not own are accepted unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`ConstructionError`] if `value` does not fit the typed field;
    /// the typed state is left untouched in that case.
    pub(crate) fn absorb(&mut self, name: &str, value: &Value) -> Result<(), ConstructionError> {
        match (self, name) {
            (Self::Company(company), COMPANY_TYPE) => {
                company.company_type = parse_company_type(value)?;
            }
            (Self::Policy(policy), POLICY_TYPE) => {
                policy.policy_type = parse_policy_type(value)?;
            }
            (Self::Policy(policy), START_YEAR) => {
                policy.window.start = parse_year(START_YEAR, value)?;
            }
            (Self::Policy(policy), END_YEAR) => {
                policy.window.end = parse_year(END_YEAR, value)?;
            }
            _ => {}
        }
        Ok(())
    }
}

fn parse_company_type(value: &Value) -> Result<Option<CompanyType>, ConstructionError> {
    match value {
        Value::Null => Ok(None),
        Value::Text(s) => s
            .parse::<CompanyType>()
            .map(Some)
            .map_err(|e| ConstructionError::new(COMPANY_TYPE, e.to_string())),
        other => Err(ConstructionError::new(
            COMPANY_TYPE,
            format!("expected string, found {}", other.type_name()),
        )),
    }
}

fn parse_policy_type(value: &Value) -> Result<Option<PolicyType>, ConstructionError> {
    match value {
        Value::Null => Ok(None),
        Value::Text(s) => s
            .parse::<PolicyType>()
            .map(Some)
            .map_err(|e| ConstructionError::new(POLICY_TYPE, e.to_string())),
        other => Err(ConstructionError::new(
            POLICY_TYPE,
            format!("expected string, found {}", other.type_name()),
        )),
    }
}

fn parse_year(field: &str, value: &Value) -> Result<Option<Year>, ConstructionError> {
    match value {
        Value::Null => Ok(None),
        Value::Int(i) => Year::try_from(*i)
            .map(Some)
            .map_err(|e| ConstructionError::new(field, format!("year {i} is out of range: {e}"))),
        other => Err(ConstructionError::new(
            field,
            format!("expected integer year, found {}", other.type_name()),
        )),
    }
}
