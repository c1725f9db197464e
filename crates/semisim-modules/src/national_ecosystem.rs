//! National ecosystems: regional talent pools.

use semisim_core::registry::{COMPANIES, REGIONS};
use semisim_core::{EntityRegistry, Module, ModuleError, RegistryView, YearContext};
use semisim_types::{GlobalParameters, Year};

use crate::attrs;

/// Module id.
pub const ID: &str = "NATECO";

/// Skilled engineers available in a region.
pub const TALENT_POOL: &str = "talent_pool_skilled_engineers";
/// Yearly semiconductor graduates of a region.
pub const GRADUATES: &str = "annual_semiconductor_graduates";
/// Yearly net migration of skilled engineers into a region.
pub const NET_INFLOW: &str = "net_talent_inflow_skilled_engineers_annual";
/// Fallback relative talent growth when a region has no flow data.
pub const TALENT_GROWTH_RATE: &str = "talent_growth_rate";

/// Grows each region's talent pool.
///
/// Regions that declare graduates or net inflow add both; others grow by
/// the global `talent_growth_rate`, if set.
#[derive(Debug, Default)]
pub struct NationalEcosystemModule {
    view: RegistryView,
}

impl NationalEcosystemModule {
    /// Create the module. It captures its scope at initialization.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Module for NationalEcosystemModule {
    fn id(&self) -> &str {
        ID
    }

    fn name(&self) -> &str {
        "National Ecosystem Development"
    }

    fn initialize(
        &mut self,
        registry: &EntityRegistry,
        params: &GlobalParameters,
    ) -> Result<(), ModuleError> {
        attrs::param(params, TALENT_GROWTH_RATE)?;
        self.view = registry.view([REGIONS, COMPANIES]);
        Ok(())
    }

    fn execute_year_step(
        &mut self,
        _year: Year,
        ctx: &mut YearContext<'_>,
    ) -> Result<(), ModuleError> {
        let growth_rate = attrs::param(ctx.global_parameters(), TALENT_GROWTH_RATE)?;
        let regions = self.view.handles(REGIONS).to_vec();
        for &handle in &regions {
            let region = ctx.entity_mut(&self.view, handle)?;
            let Some(talent) = attrs::number(region, TALENT_POOL)? else {
                continue;
            };
            let graduates = attrs::number(region, GRADUATES)?;
            let inflow = attrs::number(region, NET_INFLOW)?;
            let next = if graduates.is_some() || inflow.is_some() {
                talent + graduates.unwrap_or(0.0) + inflow.unwrap_or(0.0)
            } else if let Some(rate) = growth_rate {
                talent * (1.0 + rate)
            } else {
                continue;
            };
            ctx.set(&self.view, handle, TALENT_POOL, next)?;
        }

        ctx.update_all(&self.view, &regions)?;
        let companies = self.view.handles(COMPANIES).to_vec();
        ctx.update_all(&self.view, &companies)?;
        Ok(())
    }
}
