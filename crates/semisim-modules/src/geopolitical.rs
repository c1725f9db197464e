//! Geopolitical dynamics: policy activity, incentive funding, export controls.
//!
//! Each year the module:
//!
//! 1. Refreshes every policy's `is_active` flag from its activity window.
//! 2. Disburses active `InvestmentIncentive` policies. A policy pays out
//!    `annual_disbursement_billion_usd` (capped by what is left of
//!    `total_funding_billion_usd`), converts it to wafer capacity per node
//!    with `node_investment_distribution` and `kwpm_per_billion_invested`,
//!    and adds that capacity to `capacity_by_node_kwpm` of its target
//!    regions. The capacity is split evenly between the regions that
//!    resolve, so each region receives a share rather than the full amount.
//!    Funds are only charged when some capacity lands: a policy with no
//!    resolvable target region or no node distribution disburses nothing
//!    that year.
//! 3. Sets `export_control_pressure` on every region named by an
//!    `ExportControl` policy: the summed `enforcement_level_score` of the
//!    policies active this year.
//! 4. Runs the update rules of regions and companies.

use std::collections::BTreeMap;

use semisim_core::registry::{COMPANIES, POLICIES, REGIONS};
use semisim_core::{EntityHandle, EntityRegistry, Module, ModuleError, RegistryView, YearContext};
use semisim_types::{GlobalParameters, PolicyType, Year};
use tracing::debug;

use crate::attrs;

/// Module id.
pub const ID: &str = "GEO";

const TOTAL_FUNDING: &str = "total_funding_billion_usd";
const ANNUAL_DISBURSEMENT: &str = "annual_disbursement_billion_usd";
const DISBURSED_TO_DATE: &str = "funding_disbursed_to_date_billion_usd";
const NODE_DISTRIBUTION: &str = "node_investment_distribution";
const KWPM_PER_BILLION: &str = "kwpm_per_billion_invested";
const TARGET_REGIONS: &str = "target_region_ids";
const TARGET_ENTITIES: &str = "target_entity_ids";
const REGION_CAPACITY: &str = "capacity_by_node_kwpm";
const AFFECTED_REGIONS: &str = "affected_regions";
const ENFORCEMENT: &str = "enforcement_level_score";
const EXPORT_PRESSURE: &str = "export_control_pressure";

const DEFAULT_KWPM_PER_BILLION: f64 = 1.0;

/// Capacity one incentive policy adds this year.
struct Disbursement {
    policy: EntityHandle,
    amount: f64,
    regions: Vec<EntityHandle>,
    capacity_by_node: BTreeMap<String, f64>,
}

/// Simulates reshoring incentives and export controls.
#[derive(Debug, Default)]
pub struct GeopoliticalModule {
    view: RegistryView,
}

impl GeopoliticalModule {
    /// Create the module. It captures its scope at initialization.
    pub fn new() -> Self {
        Self::default()
    }

    fn plan_disbursement(
        ctx: &YearContext<'_>,
        policy: EntityHandle,
        year: Year,
    ) -> Result<Option<Disbursement>, ModuleError> {
        let registry = ctx.registry();
        let Some(entity) = registry.get(policy) else {
            return Ok(None);
        };
        let Some(typed) = entity.kind().as_policy() else {
            return Ok(None);
        };
        if typed.policy_type != Some(PolicyType::InvestmentIncentive) || !typed.is_active(year) {
            return Ok(None);
        }

        let Some(annual) = attrs::number(entity, ANNUAL_DISBURSEMENT)? else {
            return Ok(None);
        };
        let disbursed = attrs::number(entity, DISBURSED_TO_DATE)?.unwrap_or(0.0);
        let amount = match attrs::number(entity, TOTAL_FUNDING)? {
            Some(total) => annual.min(total - disbursed),
            None => annual,
        };
        if amount <= 0.0 {
            return Ok(None);
        }

        let distribution = match attrs::number_map(entity, NODE_DISTRIBUTION)? {
            Some(map) => map,
            None => global_distribution(ctx.global_parameters())?,
        };
        let kwpm_per_billion = match attrs::number(entity, KWPM_PER_BILLION)? {
            Some(rate) => rate,
            None => attrs::param_or(
                ctx.global_parameters(),
                KWPM_PER_BILLION,
                DEFAULT_KWPM_PER_BILLION,
            )?,
        };

        let mut target_ids = attrs::string_list(entity, TARGET_REGIONS)?;
        if target_ids.is_empty() {
            target_ids = attrs::string_list(entity, TARGET_ENTITIES)?;
        }
        let regions: Vec<_> = target_ids
            .iter()
            .filter_map(|id| registry.find(REGIONS, id))
            .collect();
        let region_count = match u32::try_from(regions.len()) {
            Ok(n) if n > 0 => n,
            _ => {
                debug!(policy = %entity.id(), year, "No target region found, nothing disbursed");
                return Ok(None);
            }
        };
        if distribution.is_empty() {
            debug!(policy = %entity.id(), year, "No node distribution, nothing disbursed");
            return Ok(None);
        }

        let per_region = amount * kwpm_per_billion / f64::from(region_count);
        let capacity_by_node = distribution
            .into_iter()
            .map(|(node, share)| (node, per_region * share))
            .collect();

        Ok(Some(Disbursement {
            policy,
            amount,
            regions,
            capacity_by_node,
        }))
    }

    fn apply_disbursement(
        &self,
        ctx: &mut YearContext<'_>,
        plan: Disbursement,
    ) -> Result<(), ModuleError> {
        for &region in &plan.regions {
            let entity = ctx.entity_mut(&self.view, region)?;
            let mut capacity = attrs::number_map(entity, REGION_CAPACITY)?.unwrap_or_default();
            for (node, added) in &plan.capacity_by_node {
                let slot = capacity.entry(node.clone()).or_insert(0.0);
                *slot += added;
            }
            ctx.set(&self.view, region, REGION_CAPACITY, capacity)?;
        }

        let policy = ctx.entity_mut(&self.view, plan.policy)?;
        let disbursed = attrs::number(policy, DISBURSED_TO_DATE)?.unwrap_or(0.0);
        ctx.set(&self.view, plan.policy, DISBURSED_TO_DATE, disbursed + plan.amount)?;
        debug!(
            policy = %plan.policy,
            amount = plan.amount,
            regions = plan.regions.len(),
            "Incentive disbursed"
        );
        Ok(())
    }

    fn export_pressure(
        registry: &EntityRegistry,
        policies: &[EntityHandle],
        year: Year,
    ) -> Result<BTreeMap<EntityHandle, f64>, ModuleError> {
        let mut pressure = BTreeMap::new();
        for &handle in policies {
            let Some(entity) = registry.get(handle) else {
                continue;
            };
            let Some(typed) = entity.kind().as_policy() else {
                continue;
            };
            if typed.policy_type != Some(PolicyType::ExportControl) {
                continue;
            }
            let score = if typed.is_active(year) {
                attrs::number(entity, ENFORCEMENT)?.unwrap_or(0.0)
            } else {
                0.0
            };
            for id in attrs::string_list(entity, AFFECTED_REGIONS)? {
                if let Some(region) = registry.find(REGIONS, &id) {
                    *pressure.entry(region).or_insert(0.0) += score;
                }
            }
        }
        Ok(pressure)
    }
}

fn global_distribution(params: &GlobalParameters) -> Result<BTreeMap<String, f64>, ModuleError> {
    let Some(map) = params.map(NODE_DISTRIBUTION) else {
        return Ok(BTreeMap::new());
    };
    map.iter()
        .map(|(node, share)| {
            share
                .as_f64()
                .map(|s| (node.clone(), s))
                .ok_or_else(|| ModuleError::InvalidParameter {
                    name: NODE_DISTRIBUTION.to_owned(),
                    reason: format!("share for `{node}` is not a number"),
                })
        })
        .collect()
}

impl Module for GeopoliticalModule {
    fn id(&self) -> &str {
        ID
    }

    fn name(&self) -> &str {
        "Geopolitical Dynamics"
    }

    fn initialize(
        &mut self,
        registry: &EntityRegistry,
        _params: &GlobalParameters,
    ) -> Result<(), ModuleError> {
        self.view = registry.view([REGIONS, COMPANIES, POLICIES]);
        debug!(
            regions = self.view.handles(REGIONS).len(),
            companies = self.view.handles(COMPANIES).len(),
            policies = self.view.handles(POLICIES).len(),
            "Geopolitical module initialized"
        );
        Ok(())
    }

    fn execute_year_step(
        &mut self,
        year: Year,
        ctx: &mut YearContext<'_>,
    ) -> Result<(), ModuleError> {
        let policies = self.view.handles(POLICIES).to_vec();
        ctx.update_all(&self.view, &policies)?;

        for &policy in &policies {
            if let Some(plan) = Self::plan_disbursement(ctx, policy, year)? {
                self.apply_disbursement(ctx, plan)?;
            }
        }

        let pressure = Self::export_pressure(ctx.registry(), &policies, year)?;
        for (region, value) in pressure {
            ctx.set(&self.view, region, EXPORT_PRESSURE, value)?;
        }

        let regions = self.view.handles(REGIONS).to_vec();
        ctx.update_all(&self.view, &regions)?;
        let companies = self.view.handles(COMPANIES).to_vec();
        ctx.update_all(&self.view, &companies)?;
        Ok(())
    }
}
