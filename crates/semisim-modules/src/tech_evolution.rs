//! Technology maturation: nodes climb the readiness scale each year.

use semisim_core::entity::MATURITY_TRL;
use semisim_core::registry::{COMPANIES, REGIONS, TECHNOLOGY_NODES};
use semisim_core::{EntityRegistry, Module, ModuleError, RegistryView, YearContext};
use semisim_types::{GlobalParameters, Year};

use crate::attrs;

/// Module id.
pub const ID: &str = "TECHEVO";

/// TRL gained per year.
pub const RD_EFFECTIVENESS: &str = "rd_effectiveness_factor";

/// Highest technology readiness level.
pub const MAX_TRL: f64 = 9.0;

const DEFAULT_RD_EFFECTIVENESS: f64 = 0.1;

/// Advances `maturity_trl` of every node by `rd_effectiveness_factor`,
/// capped at [`MAX_TRL`], then lets nodes record their commercialization.
#[derive(Debug, Default)]
pub struct TechEvolutionModule {
    view: RegistryView,
}

impl TechEvolutionModule {
    /// Create the module. It captures its scope at initialization.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Module for TechEvolutionModule {
    fn id(&self) -> &str {
        ID
    }

    fn name(&self) -> &str {
        "Technology Evolution"
    }

    fn initialize(
        &mut self,
        registry: &EntityRegistry,
        params: &GlobalParameters,
    ) -> Result<(), ModuleError> {
        attrs::param(params, RD_EFFECTIVENESS)?;
        self.view = registry.view([TECHNOLOGY_NODES, COMPANIES, REGIONS]);
        Ok(())
    }

    fn execute_year_step(
        &mut self,
        _year: Year,
        ctx: &mut YearContext<'_>,
    ) -> Result<(), ModuleError> {
        let step =
            attrs::param_or(ctx.global_parameters(), RD_EFFECTIVENESS, DEFAULT_RD_EFFECTIVENESS)?;

        let nodes = self.view.handles(TECHNOLOGY_NODES).to_vec();
        for &handle in &nodes {
            let node = ctx.entity_mut(&self.view, handle)?;
            if let Some(trl) = attrs::number(node, MATURITY_TRL)? {
                if trl < MAX_TRL {
                    ctx.set(&self.view, handle, MATURITY_TRL, (trl + step).min(MAX_TRL))?;
                }
            }
            ctx.update(&self.view, handle)?;
        }

        let companies = self.view.handles(COMPANIES).to_vec();
        ctx.update_all(&self.view, &companies)?;
        let regions = self.view.handles(REGIONS).to_vec();
        ctx.update_all(&self.view, &regions)?;
        Ok(())
    }
}
