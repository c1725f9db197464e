//! Enumeration types for the semisim scenario engine.
//!
//! The entity kind set is closed and known at compile time. Company and
//! policy types are parsed from the strings used in scenario documents
//! (`"Foundry"`, `"R&DGrant"`, ...) and serialize back to the same spelling.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Error returned when a string does not name a known enum variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {expected}: {found:?}")]
pub struct UnknownVariant {
    /// The enum that was being parsed.
    pub expected: &'static str,
    /// The offending input.
    pub found: String,
}

/// Generates `as_str` and [`FromStr`] for an enum whose variants map to
/// fixed configuration spellings.
macro_rules! string_enum {
    ($name:ident, $label:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// The spelling used in scenario documents.
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    other => Err(UnknownVariant {
                        expected: $label,
                        found: other.to_owned(),
                    }),
                }
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Entity kinds
// ---------------------------------------------------------------------------

/// The closed set of entity kinds the engine can construct.
///
/// Each scenario category (`regions`, `companies`, ...) maps to exactly one
/// kind; the mapping itself lives in the core crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKindTag {
    /// A geographical or political region.
    Region,
    /// A company in the semiconductor ecosystem.
    Company,
    /// A manufacturing technology node (e.g. 3nm).
    TechnologyNode,
    /// A downstream end market (e.g. automotive).
    EndMarket,
    /// A governmental or inter-governmental policy.
    Policy,
}

string_enum!(EntityKindTag, "entity kind", {
    Region => "region",
    Company => "company",
    TechnologyNode => "technology_node",
    EndMarket => "end_market",
    Policy => "policy",
});

// ---------------------------------------------------------------------------
// Company types
// ---------------------------------------------------------------------------

/// Business model of a company.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CompanyType {
    /// Contract manufacturer operating fabs for others.
    Foundry,
    /// Design-only company without manufacturing.
    Fabless,
    /// Integrated device manufacturer: designs and fabricates.
    #[serde(rename = "IDM")]
    Idm,
    /// Supplier of fab equipment.
    EquipmentSupplier,
    /// Outsourced assembly and test provider.
    #[serde(rename = "OSAT")]
    Osat,
    /// Consulting firm serving the industry.
    Consultancy,
    /// Supplier of wafers, chemicals, and other materials.
    MaterialsSupplier,
}

string_enum!(CompanyType, "company type", {
    Foundry => "Foundry",
    Fabless => "Fabless",
    Idm => "IDM",
    EquipmentSupplier => "EquipmentSupplier",
    Osat => "OSAT",
    Consultancy => "Consultancy",
    MaterialsSupplier => "MaterialsSupplier",
});

impl CompanyType {
    /// Whether companies of this type own manufacturing capacity.
    pub const fn operates_fabs(self) -> bool {
        matches!(self, Self::Foundry | Self::Idm)
    }
}

// ---------------------------------------------------------------------------
// Policy types
// ---------------------------------------------------------------------------

/// Category of a policy instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PolicyType {
    /// Grants or subsidies for investment (e.g. CHIPS Act funding).
    InvestmentIncentive,
    /// Restrictions on exporting technology or equipment.
    ExportControl,
    /// Tariffs on traded goods.
    TradeTariff,
    /// Funding for research programs.
    #[serde(rename = "R&DGrant")]
    RdGrant,
    /// Workforce training programs.
    TalentDevelopment,
    /// Changes to intellectual-property regimes.
    #[serde(rename = "IPProtectionLaw")]
    IpProtectionLaw,
    /// Screening of foreign investment.
    NationalSecurityReview,
}

string_enum!(PolicyType, "policy type", {
    InvestmentIncentive => "InvestmentIncentive",
    ExportControl => "ExportControl",
    TradeTariff => "TradeTariff",
    RdGrant => "R&DGrant",
    TalentDevelopment => "TalentDevelopment",
    IpProtectionLaw => "IPProtectionLaw",
    NationalSecurityReview => "NationalSecurityReview",
});
