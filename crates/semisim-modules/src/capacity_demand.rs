//! Capacity/demand balance per technology node and the resulting wafer prices.
//!
//! Demand per node is the sum of `base_demand_wafer_starts_kwpm` over all
//! end markets. Supply per node is the sum of `fab_capacity_kwpm_by_node`
//! over companies that operate fabs (foundries and IDMs). The gap is
//! `supply - demand`; a node's `average_price_per_wafer_usd` moves against
//! it by `price_sensitivity_to_gap` per kWPM and never goes below zero.

use std::collections::BTreeMap;

use semisim_core::registry::{COMPANIES, END_MARKETS, TECHNOLOGY_NODES};
use semisim_core::{EntityRegistry, Module, ModuleError, RegistryView, YearContext};
use semisim_types::{GlobalParameters, Year};
use tracing::debug;

use crate::attrs;

/// Module id.
pub const ID: &str = "CAPDEM";

/// End-market demand per node, in thousand wafer starts per month.
pub const MARKET_DEMAND: &str = "base_demand_wafer_starts_kwpm";
/// Company fab capacity per node, in thousand wafer starts per month.
pub const FAB_CAPACITY: &str = "fab_capacity_kwpm_by_node";
/// Average wafer price of a technology node.
pub const WAFER_PRICE: &str = "average_price_per_wafer_usd";
/// Supply minus demand recorded on each technology node.
pub const SUPPLY_DEMAND_GAP: &str = "supply_demand_gap_kwpm";
/// Relative price change per kWPM of gap.
pub const PRICE_SENSITIVITY: &str = "price_sensitivity_to_gap";

const DEFAULT_PRICE_SENSITIVITY: f64 = 0.01;

/// Balances fab capacity against end-market demand.
#[derive(Debug, Default)]
pub struct CapacityDemandModule {
    view: RegistryView,
}

impl CapacityDemandModule {
    /// Create the module. It captures its scope at initialization.
    pub fn new() -> Self {
        Self::default()
    }
}

/// Summed demand per node across all end markets.
pub fn demand_per_node(
    registry: &EntityRegistry,
) -> Result<BTreeMap<String, f64>, ModuleError> {
    let mut demand = BTreeMap::new();
    for (_, market) in registry.entities(END_MARKETS) {
        for (node, kwpm) in attrs::number_map(market, MARKET_DEMAND)?.unwrap_or_default() {
            *demand.entry(node).or_insert(0.0) += kwpm;
        }
    }
    Ok(demand)
}

/// Summed fab capacity per node across foundries and IDMs.
pub fn supply_per_node(
    registry: &EntityRegistry,
) -> Result<BTreeMap<String, f64>, ModuleError> {
    let mut supply = BTreeMap::new();
    for (_, company) in registry.entities(COMPANIES) {
        if !company.kind().company_type().is_some_and(|t| t.operates_fabs()) {
            continue;
        }
        for (node, kwpm) in attrs::number_map(company, FAB_CAPACITY)?.unwrap_or_default() {
            *supply.entry(node).or_insert(0.0) += kwpm;
        }
    }
    Ok(supply)
}

/// `supply - demand` for every node that has either.
pub fn gap_per_node(
    supply: &BTreeMap<String, f64>,
    demand: &BTreeMap<String, f64>,
) -> BTreeMap<String, f64> {
    let mut gap: BTreeMap<String, f64> = supply.clone();
    for (node, kwpm) in demand {
        *gap.entry(node.clone()).or_insert(0.0) -= kwpm;
    }
    gap
}

impl Module for CapacityDemandModule {
    fn id(&self) -> &str {
        ID
    }

    fn name(&self) -> &str {
        "Capacity-Demand Balancing"
    }

    fn initialize(
        &mut self,
        registry: &EntityRegistry,
        params: &GlobalParameters,
    ) -> Result<(), ModuleError> {
        attrs::param(params, PRICE_SENSITIVITY)?;
        self.view = registry.view([COMPANIES, TECHNOLOGY_NODES, END_MARKETS]);
        Ok(())
    }

    fn execute_year_step(
        &mut self,
        year: Year,
        ctx: &mut YearContext<'_>,
    ) -> Result<(), ModuleError> {
        let sensitivity =
            attrs::param_or(ctx.global_parameters(), PRICE_SENSITIVITY, DEFAULT_PRICE_SENSITIVITY)?;
        let demand = demand_per_node(ctx.registry())?;
        let supply = supply_per_node(ctx.registry())?;
        let gaps = gap_per_node(&supply, &demand);
        debug!(year, nodes = gaps.len(), "Supply-demand gaps computed");

        let nodes = self.view.handles(TECHNOLOGY_NODES).to_vec();
        for &handle in &nodes {
            let node = ctx.entity_mut(&self.view, handle)?;
            let gap = gaps.get(node.id().as_str()).copied().unwrap_or(0.0);
            if let Some(price) = attrs::number(node, WAFER_PRICE)? {
                let next = (price * (1.0 - gap * sensitivity)).max(0.0);
                ctx.set(&self.view, handle, WAFER_PRICE, next)?;
            }
            ctx.set(&self.view, handle, SUPPLY_DEMAND_GAP, gap)?;
        }

        let markets = self.view.handles(END_MARKETS).to_vec();
        ctx.update_all(&self.view, &markets)?;
        ctx.update_all(&self.view, &nodes)?;
        let companies = self.view.handles(COMPANIES).to_vec();
        ctx.update_all(&self.view, &companies)?;
        Ok(())
    }
}
