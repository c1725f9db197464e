//! Behaviour of each semiconductor module on small hand-computed scenarios.
//!
//! Every test loads a YAML scenario, runs one or more modules through the
//! manager, and checks attribute values against figures worked out by hand.

#![allow(clippy::unwrap_used, clippy::float_cmp)]

use semisim_core::{ManagerError, Module, ModuleError, ScenarioDocument, SimulationManager};
use semisim_modules::{
    CapacityDemandModule, ConsultingMarketModule, GeopoliticalModule, IndustryStructureModule,
    NationalEcosystemModule, TechEvolutionModule, standard_modules,
};
use semisim_types::{ScalarValue, Value, Year};

fn run(yaml: &str, modules: Vec<Box<dyn Module>>) -> SimulationManager {
    let mut manager = SimulationManager::new("test", modules);
    let report = manager
        .load_scenario(&ScenarioDocument::parse(yaml).unwrap())
        .unwrap();
    assert!(report.is_clean(), "{:?}", report.diagnostics);
    manager.initialize_modules().unwrap();
    manager.run().unwrap();
    manager
}

fn recorded(
    manager: &SimulationManager,
    year: Year,
    category: &str,
    id: &str,
    attribute: &str,
) -> Option<ScalarValue> {
    manager
        .results()
        .get(&year)?
        .get(category)?
        .iter()
        .find(|r| r.model_id == id)?
        .attributes
        .get(attribute)
        .cloned()
}

fn number(
    manager: &SimulationManager,
    year: Year,
    category: &str,
    id: &str,
    attribute: &str,
) -> f64 {
    recorded(manager, year, category, id, attribute)
        .and_then(|v| v.as_f64())
        .unwrap()
}

fn current(
    manager: &SimulationManager,
    category: &str,
    id: &str,
    attribute: &str,
) -> Option<Value> {
    let handle = manager.registry().find(category, id)?;
    manager.registry().get(handle)?.get(attribute).cloned()
}

fn map_entry(value: Option<Value>, key: &str) -> Option<f64> {
    value?.as_map()?.get(key)?.as_f64()
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

#[test]
fn capacity_demand_moves_prices_against_the_gap() {
    let yaml = "
start_year: 2025
end_year: 2025
global_parameters:
  price_sensitivity_to_gap: 0.01
models_initial_state:
  end_markets:
    - {model_id: phones, name: Phones, initial_attributes: {base_demand_wafer_starts_kwpm: {7nm: 4, 3nm: 2}}}
  companies:
    - {model_id: fab, name: Fab, company_type: Foundry, initial_attributes: {fab_capacity_kwpm_by_node: {7nm: 5, 28nm: 200}}}
    - {model_id: design, name: Design, company_type: Fabless, initial_attributes: {fab_capacity_kwpm_by_node: {7nm: 100}}}
  technology_nodes:
    - {model_id: 7nm, name: 7nm, initial_attributes: {average_price_per_wafer_usd: 1000}}
    - {model_id: 3nm, name: 3nm, initial_attributes: {average_price_per_wafer_usd: 20000}}
    - {model_id: 28nm, name: 28nm, initial_attributes: {average_price_per_wafer_usd: 100}}
    - {model_id: 5nm, name: 5nm}
";
    let manager = run(yaml, vec![Box::new(CapacityDemandModule::new())]);

    assert!(close(
        number(&manager, 2025, "technology_nodes", "7nm", "average_price_per_wafer_usd"),
        990.0
    ));
    assert!(close(
        number(&manager, 2025, "technology_nodes", "3nm", "average_price_per_wafer_usd"),
        20400.0
    ));
    assert_eq!(
        number(&manager, 2025, "technology_nodes", "28nm", "average_price_per_wafer_usd"),
        0.0
    );
    assert_eq!(number(&manager, 2025, "technology_nodes", "7nm", "supply_demand_gap_kwpm"), 1.0);
    assert_eq!(number(&manager, 2025, "technology_nodes", "3nm", "supply_demand_gap_kwpm"), -2.0);
    assert_eq!(number(&manager, 2025, "technology_nodes", "5nm", "supply_demand_gap_kwpm"), 0.0);
    assert_eq!(
        recorded(&manager, 2025, "technology_nodes", "5nm", "average_price_per_wafer_usd"),
        None
    );
}

#[test]
fn capacity_demand_rejects_non_numeric_demand() {
    let yaml = "
start_year: 2025
end_year: 2027
models_initial_state:
  end_markets:
    - {model_id: bad, name: Bad, initial_attributes: {base_demand_wafer_starts_kwpm: {7nm: lots}}}
";
    let mut manager = SimulationManager::new("test", vec![Box::new(CapacityDemandModule::new())]);
    manager
        .load_scenario(&ScenarioDocument::parse(yaml).unwrap())
        .unwrap();
    manager.initialize_modules().unwrap();
    let err = manager.run().err().unwrap();
    assert!(matches!(
        err,
        ManagerError::ModuleStep {
            ref module_id,
            year: 2025,
            source: ModuleError::MalformedAttribute { .. },
        } if module_id == "CAPDEM"
    ));
    assert!(manager.results().is_empty());
}

#[test]
fn end_market_demand_grows_through_entity_updates() {
    let yaml = "
start_year: 2025
end_year: 2026
models_initial_state:
  end_markets:
    - model_id: ai
      name: AI
      initial_attributes:
        base_demand_wafer_starts_kwpm: {3nm: 1, 7nm: 4}
        annual_growth_rate_kwpm: {3nm: 0.5, 7nm: 0.25}
";
    let manager = run(yaml, vec![Box::new(CapacityDemandModule::new())]);
    let demand = current(&manager, "end_markets", "ai", "base_demand_wafer_starts_kwpm");
    assert_eq!(map_entry(demand.clone(), "3nm"), Some(2.25));
    assert_eq!(map_entry(demand, "7nm"), Some(6.25));
}

#[test]
fn tech_evolution_raises_trl_and_marks_commercialization() {
    let yaml = "
start_year: 2025
end_year: 2027
global_parameters:
  rd_effectiveness_factor: 0.5
models_initial_state:
  tech_nodes:
    - {model_id: 2nm, name: 2nm, initial_attributes: {maturity_trl: 6, year_commercialized: ~, commercialization_trl_threshold: 7}}
    - {model_id: 5nm, name: 5nm, initial_attributes: {maturity_trl: 8.75}}
";
    let manager = run(yaml, vec![Box::new(TechEvolutionModule::new())]);

    assert_eq!(number(&manager, 2025, "technology_nodes", "2nm", "maturity_trl"), 6.5);
    assert_eq!(
        recorded(&manager, 2025, "technology_nodes", "2nm", "year_commercialized"),
        Some(ScalarValue::Null)
    );
    assert_eq!(number(&manager, 2026, "technology_nodes", "2nm", "maturity_trl"), 7.0);
    assert_eq!(
        recorded(&manager, 2026, "technology_nodes", "2nm", "year_commercialized"),
        Some(ScalarValue::Int(2026))
    );
    assert_eq!(
        recorded(&manager, 2027, "technology_nodes", "2nm", "year_commercialized"),
        Some(ScalarValue::Int(2026))
    );

    assert_eq!(number(&manager, 2025, "technology_nodes", "5nm", "maturity_trl"), 9.0);
    assert_eq!(number(&manager, 2027, "technology_nodes", "5nm", "maturity_trl"), 9.0);
    assert_eq!(
        recorded(&manager, 2025, "technology_nodes", "5nm", "year_commercialized"),
        Some(ScalarValue::Int(2025))
    );
}

#[test]
fn geopolitical_disburses_incentives_until_funds_run_out() {
    let yaml = "
start_year: 2025
end_year: 2027
models_initial_state:
  regions:
    - {model_id: usa, name: USA, initial_attributes: {capacity_by_node_kwpm: {7nm: 5}}}
    - {model_id: eu, name: EU}
  policies:
    - model_id: chips
      name: CHIPS
      policy_type: InvestmentIncentive
      initial_attributes:
        start_year: 2025
        end_year: 2026
        total_funding_billion_usd: 10
        annual_disbursement_billion_usd: 6
        node_investment_distribution: {3nm: 0.5, 7nm: 0.5}
        kwpm_per_billion_invested: 2
        target_region_ids: [usa, eu, atlantis]
";
    let manager = run(yaml, vec![Box::new(GeopoliticalModule::new())]);

    let usa_2025 = recorded(&manager, 2025, "regions", "usa", "capacity_by_node_kwpm");
    assert_eq!(
        usa_2025,
        Some(ScalarValue::Text("{\"3nm\":3.0,\"7nm\":8.0}".to_owned()))
    );
    assert_eq!(
        number(&manager, 2025, "policies", "chips", "funding_disbursed_to_date_billion_usd"),
        6.0
    );
    assert_eq!(
        number(&manager, 2026, "policies", "chips", "funding_disbursed_to_date_billion_usd"),
        10.0
    );
    assert_eq!(
        number(&manager, 2027, "policies", "chips", "funding_disbursed_to_date_billion_usd"),
        10.0
    );

    let usa = current(&manager, "regions", "usa", "capacity_by_node_kwpm");
    assert_eq!(map_entry(usa.clone(), "3nm"), Some(5.0));
    assert_eq!(map_entry(usa, "7nm"), Some(10.0));
    let eu = current(&manager, "regions", "eu", "capacity_by_node_kwpm");
    assert_eq!(map_entry(eu, "3nm"), Some(5.0));

    assert_eq!(
        recorded(&manager, 2026, "policies", "chips", "is_active"),
        Some(ScalarValue::Bool(true))
    );
    assert_eq!(
        recorded(&manager, 2027, "policies", "chips", "is_active"),
        Some(ScalarValue::Bool(false))
    );
}

#[test]
fn incentive_without_reachable_capacity_keeps_its_funds() {
    let yaml = "
start_year: 2025
end_year: 2026
models_initial_state:
  regions:
    - {model_id: usa, name: USA, initial_attributes: {capacity_by_node_kwpm: {7nm: 5}}}
  policies:
    - model_id: stranded
      name: Stranded
      policy_type: InvestmentIncentive
      initial_attributes:
        start_year: 2025
        end_year: 2026
        annual_disbursement_billion_usd: 4
        node_investment_distribution: {7nm: 1.0}
        target_region_ids: [atlantis]
    - model_id: undirected
      name: Undirected
      policy_type: InvestmentIncentive
      initial_attributes:
        start_year: 2025
        end_year: 2026
        annual_disbursement_billion_usd: 4
        target_region_ids: [usa]
";
    let manager = run(yaml, vec![Box::new(GeopoliticalModule::new())]);

    let disbursed = "funding_disbursed_to_date_billion_usd";
    for policy in ["stranded", "undirected"] {
        for year in [2025, 2026] {
            assert_eq!(
                recorded(&manager, year, "policies", policy, disbursed),
                None,
                "{policy} in {year}"
            );
        }
    }
    assert_eq!(
        recorded(&manager, 2026, "regions", "usa", "capacity_by_node_kwpm"),
        Some(ScalarValue::Text("{\"7nm\":5}".to_owned()))
    );
}

#[test]
fn geopolitical_tracks_export_control_pressure() {
    let yaml = "
start_year: 2025
end_year: 2027
models_initial_state:
  regions:
    - {model_id: cn, name: China}
    - {model_id: eu, name: EU}
  policies:
    - model_id: euv
      name: EUV restriction
      policy_type: ExportControl
      initial_attributes: {start_year: 2026, end_year: 2026, affected_regions: [cn], enforcement_level_score: 0.75}
";
    let manager = run(yaml, vec![Box::new(GeopoliticalModule::new())]);
    assert_eq!(number(&manager, 2025, "regions", "cn", "export_control_pressure"), 0.0);
    assert_eq!(number(&manager, 2026, "regions", "cn", "export_control_pressure"), 0.75);
    assert_eq!(number(&manager, 2027, "regions", "cn", "export_control_pressure"), 0.0);
    assert_eq!(recorded(&manager, 2026, "regions", "eu", "export_control_pressure"), None);
}

#[test]
fn industry_structure_splits_capacity_between_fab_operators() {
    let yaml = "
start_year: 2025
end_year: 2025
models_initial_state:
  companies:
    - {model_id: fab, name: Fab, company_type: Foundry, initial_attributes: {fab_capacity_kwpm_by_node: {7nm: 20, 28nm: 10}}}
    - {model_id: idm, name: IDM, company_type: IDM, initial_attributes: {fab_capacity_kwpm_by_node: {28nm: 10}}}
    - {model_id: design, name: Design, company_type: Fabless}
";
    let manager = run(yaml, vec![Box::new(IndustryStructureModule::new())]);
    assert_eq!(number(&manager, 2025, "companies", "fab", "capacity_share"), 0.75);
    assert_eq!(number(&manager, 2025, "companies", "idm", "capacity_share"), 0.25);
    assert_eq!(recorded(&manager, 2025, "companies", "design", "capacity_share"), None);
}

#[test]
fn industry_structure_skips_zero_capacity() {
    let yaml = "
start_year: 2025
end_year: 2025
models_initial_state:
  companies:
    - {model_id: fab, name: Fab, company_type: Foundry}
";
    let manager = run(yaml, vec![Box::new(IndustryStructureModule::new())]);
    assert_eq!(recorded(&manager, 2025, "companies", "fab", "capacity_share"), None);
}

const CONSULTING: &str = "
start_year: 2025
end_year: 2026
global_parameters:
  client_need_shift: {supply_security: SHIFT}
models_initial_state:
  companies:
    - {model_id: cx, name: Consult X, company_type: Consultancy, initial_attributes: {geopolitical_expertise_score: 3}}
    - {model_id: fab, name: Fab, company_type: Foundry, initial_attributes: {geopolitical_expertise_score: 3}}
";

#[test]
fn consultancies_gain_expertise_under_supply_security_pressure() {
    let module = ConsultingMarketModule::new();
    let manager = run(&CONSULTING.replace("SHIFT", "0.7"), vec![Box::new(module)]);
    assert!(close(number(&manager, 2025, "companies", "cx", "geopolitical_expertise_score"), 3.1));
    assert!(close(number(&manager, 2026, "companies", "cx", "geopolitical_expertise_score"), 3.2));
    assert_eq!(
        recorded(&manager, 2026, "companies", "fab", "geopolitical_expertise_score"),
        Some(ScalarValue::Int(3))
    );
}

#[test]
fn consultancies_stay_put_below_threshold() {
    let manager = run(
        &CONSULTING.replace("SHIFT", "0.6"),
        vec![Box::new(ConsultingMarketModule::new())],
    );
    assert_eq!(
        recorded(&manager, 2026, "companies", "cx", "geopolitical_expertise_score"),
        Some(ScalarValue::Int(3))
    );
}

#[test]
fn talent_pools_grow_from_flows_or_global_rate() {
    let yaml = "
start_year: 2025
end_year: 2026
global_parameters:
  talent_growth_rate: 0.5
models_initial_state:
  regions:
    - {model_id: usa, name: USA, initial_attributes: {talent_pool_skilled_engineers: 100, annual_semiconductor_graduates: 10, net_talent_inflow_skilled_engineers_annual: 5}}
    - {model_id: eu, name: EU, initial_attributes: {talent_pool_skilled_engineers: 200}}
    - {model_id: cn, name: China}
";
    let manager = run(yaml, vec![Box::new(NationalEcosystemModule::new())]);
    assert_eq!(number(&manager, 2025, "regions", "usa", "talent_pool_skilled_engineers"), 115.0);
    assert_eq!(number(&manager, 2026, "regions", "usa", "talent_pool_skilled_engineers"), 130.0);
    assert_eq!(number(&manager, 2025, "regions", "eu", "talent_pool_skilled_engineers"), 300.0);
    assert_eq!(number(&manager, 2026, "regions", "eu", "talent_pool_skilled_engineers"), 450.0);
    assert_eq!(recorded(&manager, 2026, "regions", "cn", "talent_pool_skilled_engineers"), None);
}

#[test]
fn invalid_global_parameter_fails_initialization() {
    let yaml = "
start_year: 2025
end_year: 2025
global_parameters:
  rd_effectiveness_factor: fast
";
    let mut manager = SimulationManager::new("test", vec![Box::new(TechEvolutionModule::new())]);
    manager
        .load_scenario(&ScenarioDocument::parse(yaml).unwrap())
        .unwrap();
    let err = manager.initialize_modules().err().unwrap();
    assert!(matches!(
        err,
        ManagerError::ModuleInit { ref module_id, source: ModuleError::InvalidParameter { .. } }
            if module_id == "TECHEVO"
    ));
}

#[test]
fn standard_modules_run_deterministically() {
    let yaml = "
start_year: 2025
end_year: 2028
global_parameters:
  talent_growth_rate: 0.02
  client_need_shift: {supply_security: 0.8}
models_initial_state:
  regions:
    - {model_id: usa, name: USA, initial_attributes: {talent_pool_skilled_engineers: 50000}}
  companies:
    - {model_id: fab, name: Fab, company_type: Foundry, initial_attributes: {fab_capacity_kwpm_by_node: {7nm: 5}}}
    - {model_id: cx, name: CX, company_type: Consultancy, initial_attributes: {geopolitical_expertise_score: 3}}
  tech_nodes:
    - {model_id: 7nm, name: 7nm, initial_attributes: {maturity_trl: 8, average_price_per_wafer_usd: 8000}}
  end_markets:
    - {model_id: ai, name: AI, initial_attributes: {base_demand_wafer_starts_kwpm: {7nm: 3}, annual_growth_rate_kwpm: {7nm: 0.15}}}
  policies:
    - {model_id: chips, name: CHIPS, policy_type: InvestmentIncentive, initial_attributes: {start_year: 2025, end_year: 2026, annual_disbursement_billion_usd: 1, target_region_ids: [usa], node_investment_distribution: {7nm: 1.0}}}
";
    let once = || serde_json::to_string(run(yaml, standard_modules()).results()).unwrap();
    let first = once();
    assert_eq!(first, once());
    assert!(first.contains("\"capacity_share\":1.0"));
}
