//! Consulting market: consultancies build geopolitical expertise when
//! clients prioritise supply security.

use semisim_core::registry::{COMPANIES, EntityRegistry};
use semisim_core::{Module, ModuleError, RegistryView, YearContext};
use semisim_types::{CompanyType, GlobalParameters, Value, Year};
use tracing::debug;

use crate::attrs;

/// Module id.
pub const ID: &str = "CONSULT";

/// Global mapping of client priorities.
pub const CLIENT_NEED_SHIFT: &str = "client_need_shift";
/// Key of [`CLIENT_NEED_SHIFT`] read by this module.
pub const SUPPLY_SECURITY: &str = "supply_security";
/// Score raised on each consultancy.
pub const GEOPOLITICAL_EXPERTISE: &str = "geopolitical_expertise_score";
/// Yearly score increase.
pub const CAPABILITY_GROWTH: &str = "consulting_capability_growth";

/// Supply-security priority above which consultancies invest.
pub const SUPPLY_SECURITY_THRESHOLD: f64 = 0.6;

const DEFAULT_CAPABILITY_GROWTH: f64 = 0.1;

/// Evolves consultancies, the only companies this module may write.
#[derive(Debug, Default)]
pub struct ConsultingMarketModule {
    view: RegistryView,
}

impl ConsultingMarketModule {
    /// Create the module. It captures its scope at initialization.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of consultancies captured at initialization.
    pub fn consultancies(&self) -> usize {
        self.view.len()
    }
}

fn supply_security(params: &GlobalParameters) -> Result<Option<f64>, ModuleError> {
    let Some(shift) = params.map(CLIENT_NEED_SHIFT) else {
        return Ok(None);
    };
    match shift.get(SUPPLY_SECURITY) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value
            .as_f64()
            .map(Some)
            .ok_or_else(|| ModuleError::InvalidParameter {
                name: format!("{CLIENT_NEED_SHIFT}.{SUPPLY_SECURITY}"),
                reason: format!("expected number, found {}", value.type_name()),
            }),
    }
}

impl Module for ConsultingMarketModule {
    fn id(&self) -> &str {
        ID
    }

    fn name(&self) -> &str {
        "Consulting Market Evolution"
    }

    fn initialize(
        &mut self,
        registry: &EntityRegistry,
        _params: &GlobalParameters,
    ) -> Result<(), ModuleError> {
        let consultancies = registry
            .entities(COMPANIES)
            .filter(|(_, c)| c.kind().company_type() == Some(CompanyType::Consultancy))
            .map(|(h, _)| h);
        self.view = RegistryView::from_handles(COMPANIES, consultancies);
        debug!(consultancies = self.view.len(), "Consulting module initialized");
        Ok(())
    }

    fn execute_year_step(
        &mut self,
        year: Year,
        ctx: &mut YearContext<'_>,
    ) -> Result<(), ModuleError> {
        let handles = self.view.handles(COMPANIES).to_vec();
        let priority = supply_security(ctx.global_parameters())?;
        if priority.is_some_and(|p| p > SUPPLY_SECURITY_THRESHOLD) {
            let growth = attrs::param_or(
                ctx.global_parameters(),
                CAPABILITY_GROWTH,
                DEFAULT_CAPABILITY_GROWTH,
            )?;
            for &handle in &handles {
                let consultancy = ctx.entity_mut(&self.view, handle)?;
                if let Some(score) = attrs::number(consultancy, GEOPOLITICAL_EXPERTISE)? {
                    ctx.set(&self.view, handle, GEOPOLITICAL_EXPERTISE, score + growth)?;
                }
            }
            debug!(
                year,
                consultancies = handles.len(),
                "Consultancies adapted to supply-security demand"
            );
        }
        ctx.update_all(&self.view, &handles)
    }
}
