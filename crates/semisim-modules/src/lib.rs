//! Semiconductor-industry modules for the semisim scenario engine.
//!
//! Each module implements [`semisim_core::Module`] and captures the
//! categories it writes at initialization. [`standard_modules`] returns
//! them in their canonical execution order, which is observable in the
//! results: later modules see the writes of earlier ones within a year.
//!
//! # Modules
//!
//! - [`geopolitical`] -- Policy activity, incentive funding, export controls.
//! - [`capacity_demand`] -- Supply/demand gap per node and wafer prices.
//! - [`tech_evolution`] -- Technology readiness progression.
//! - [`industry_structure`] -- Fab capacity shares.
//! - [`consulting_market`] -- Consultancy capability growth.
//! - [`national_ecosystem`] -- Regional talent pools.

pub mod attrs;
pub mod capacity_demand;
pub mod consulting_market;
pub mod geopolitical;
pub mod industry_structure;
pub mod national_ecosystem;
pub mod tech_evolution;

use semisim_core::Module;

pub use capacity_demand::CapacityDemandModule;
pub use consulting_market::ConsultingMarketModule;
pub use geopolitical::GeopoliticalModule;
pub use industry_structure::IndustryStructureModule;
pub use national_ecosystem::NationalEcosystemModule;
pub use tech_evolution::TechEvolutionModule;

/// Every module, in execution order: `GEO`, `CAPDEM`, `TECHEVO`, `INDSTR`,
/// `CONSULT`, `NATECO`.
pub fn standard_modules() -> Vec<Box<dyn Module>> {
    vec![
        Box::new(GeopoliticalModule::new()),
        Box::new(CapacityDemandModule::new()),
        Box::new(TechEvolutionModule::new()),
        Box::new(IndustryStructureModule::new()),
        Box::new(ConsultingMarketModule::new()),
        Box::new(NationalEcosystemModule::new()),
    ]
}
