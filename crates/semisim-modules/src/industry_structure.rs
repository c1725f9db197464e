//! Industry structure: each fab operator's share of total fab capacity.

use semisim_core::registry::{COMPANIES, REGIONS};
use semisim_core::{EntityHandle, EntityRegistry, Module, ModuleError, RegistryView, YearContext};
use semisim_types::{GlobalParameters, Year};
use tracing::debug;

use crate::attrs;
use crate::capacity_demand::FAB_CAPACITY;

/// Module id.
pub const ID: &str = "INDSTR";

/// Fraction of all foundry and IDM capacity held by a company.
pub const CAPACITY_SHARE: &str = "capacity_share";

/// Recomputes `capacity_share` for every foundry and IDM.
///
/// Nothing is written in a year where total capacity is zero.
#[derive(Debug, Default)]
pub struct IndustryStructureModule {
    view: RegistryView,
}

impl IndustryStructureModule {
    /// Create the module. It captures its scope at initialization.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Module for IndustryStructureModule {
    fn id(&self) -> &str {
        ID
    }

    fn name(&self) -> &str {
        "Industry Structure"
    }

    fn initialize(
        &mut self,
        registry: &EntityRegistry,
        _params: &GlobalParameters,
    ) -> Result<(), ModuleError> {
        self.view = registry.view([COMPANIES, REGIONS]);
        Ok(())
    }

    fn execute_year_step(
        &mut self,
        year: Year,
        ctx: &mut YearContext<'_>,
    ) -> Result<(), ModuleError> {
        let mut capacities: Vec<(EntityHandle, f64)> = Vec::new();
        for &handle in self.view.handles(COMPANIES) {
            let Some(company) = ctx.entity(handle) else {
                continue;
            };
            if !company.kind().company_type().is_some_and(|t| t.operates_fabs()) {
                continue;
            }
            let capacity = attrs::number_map(company, FAB_CAPACITY)?
                .as_ref()
                .map_or(0.0, attrs::total);
            capacities.push((handle, capacity));
        }

        let total: f64 = capacities.iter().map(|(_, c)| c).sum();
        if total > 0.0 {
            for (handle, capacity) in capacities {
                ctx.set(&self.view, handle, CAPACITY_SHARE, capacity / total)?;
            }
        } else {
            debug!(year, "No fab capacity, shares left unchanged");
        }

        let companies = self.view.handles(COMPANIES).to_vec();
        ctx.update_all(&self.view, &companies)?;
        let regions = self.view.handles(REGIONS).to_vec();
        ctx.update_all(&self.view, &regions)?;
        Ok(())
    }
}
