//! The simulation manager: lifecycle, scheduling, and result collection.
//!
//! A run goes through a fixed sequence of phases:
//!
//! ```text
//! Uninitialized --load_scenario--> Loaded --initialize_modules--> ModulesReady
//!     --run--> Running --> Complete
//!                      \-> Aborted   (a module failed)
//! ```
//!
//! Each operation checks the phase it is called in and refuses with
//! [`ManagerError::Precondition`] otherwise. A manager runs at most once.
//!
//! Within [`SimulationManager::run`], years are stepped in ascending order.
//! Every year runs each module in registration order against a shared
//! [`YearContext`], then captures the registry into `results[year]`. A
//! module failure stops the run immediately: years already captured and
//! writes already made are kept as they are.

use std::fmt;

use semisim_types::{
    EntityKindTag, GlobalParameters, SimulationResults, Trajectories, Year, YearSnapshot,
};
use tracing::{debug, error, info};

use crate::calendar::{CalendarError, YearRange};
use crate::module::{Module, ModuleError, YearContext};
use crate::registry::{CategoryKinds, EntityRegistry};
use crate::scenario::{LoadReport, ScenarioDocument, ScenarioLoader};
use crate::{snapshot, trajectory};

/// Lifecycle phase of a [`SimulationManager`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    /// Nothing loaded yet.
    Uninitialized,
    /// Scenario loaded, modules not yet initialized.
    Loaded,
    /// Every module initialized; ready to run.
    ModulesReady,
    /// Year steps in progress.
    Running,
    /// Every year completed.
    Complete,
    /// A module failed; the run stopped.
    Aborted,
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Uninitialized => "uninitialized",
            Self::Loaded => "loaded",
            Self::ModulesReady => "modules ready",
            Self::Running => "running",
            Self::Complete => "complete",
            Self::Aborted => "aborted",
        };
        f.write_str(label)
    }
}

/// Errors returned by the manager's lifecycle operations.
#[derive(Debug, thiserror::Error)]
pub enum ManagerError {
    /// The operation is not allowed in the current phase.
    #[error("cannot {operation} while {phase}")]
    Precondition {
        /// The refused operation.
        operation: &'static str,
        /// Phase the manager was in.
        phase: RunPhase,
    },

    /// The scenario's year range is invalid.
    #[error("invalid scenario calendar: {source}")]
    Calendar {
        /// The underlying calendar error.
        #[from]
        source: CalendarError,
    },

    /// A module refused to initialize.
    #[error("module {module_id} failed to initialize: {source}")]
    ModuleInit {
        /// Id of the failing module.
        module_id: String,
        /// The module's error.
        source: ModuleError,
    },

    /// A module failed during a year step.
    #[error("module {module_id} failed in year {year}: {source}")]
    ModuleStep {
        /// Id of the failing module.
        module_id: String,
        /// Year being simulated.
        year: Year,
        /// The module's error.
        source: ModuleError,
    },
}

/// Owns every entity, module, and result of one simulation run.
pub struct SimulationManager {
    scenario_name: String,
    kinds: CategoryKinds,
    range: Option<YearRange>,
    current_year: Option<Year>,
    registry: EntityRegistry,
    modules: Vec<Box<dyn Module>>,
    global_parameters: GlobalParameters,
    results: SimulationResults,
    phase: RunPhase,
}

impl fmt::Debug for SimulationManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimulationManager")
            .field("scenario_name", &self.scenario_name)
            .field("range", &self.range)
            .field("current_year", &self.current_year)
            .field("entities", &self.registry.len())
            .field(
                "modules",
                &self.modules.iter().map(|m| m.id()).collect::<Vec<_>>(),
            )
            .field("years_recorded", &self.results.len())
            .field("phase", &self.phase)
            .finish()
    }
}

impl SimulationManager {
    /// Create a manager that will run `modules` in the given order.
    pub fn new(scenario_name: impl Into<String>, modules: Vec<Box<dyn Module>>) -> Self {
        Self {
            scenario_name: scenario_name.into(),
            kinds: CategoryKinds::default(),
            range: None,
            current_year: None,
            registry: EntityRegistry::new(),
            modules,
            global_parameters: GlobalParameters::new(),
            results: SimulationResults::new(),
            phase: RunPhase::Uninitialized,
        }
    }

    /// Map an additional scenario category to an entity kind.
    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>, kind: EntityKindTag) -> Self {
        self.kinds.insert(category, kind);
        self
    }

    /// Append a module after the ones given at construction.
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError::Precondition`] once modules have been
    /// initialized.
    pub fn register(&mut self, module: Box<dyn Module>) -> Result<(), ManagerError> {
        self.require("register a module", &[RunPhase::Uninitialized, RunPhase::Loaded])?;
        info!(module = module.id(), name = module.name(), "Module registered");
        self.modules.push(module);
        Ok(())
    }

    /// Load a scenario: year range, global parameters, and entities.
    ///
    /// Individual bad records do not fail the load; they are returned in the
    /// [`LoadReport`].
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError::Precondition`] unless the manager is
    /// uninitialized, and [`ManagerError::Calendar`] if the start year lies
    /// after the end year. Nothing is loaded on error.
    pub fn load_scenario(&mut self, doc: &ScenarioDocument) -> Result<LoadReport, ManagerError> {
        self.require("load a scenario", &[RunPhase::Uninitialized])?;
        let range = YearRange::new(doc.start_year, doc.end_year)?;

        let loader = ScenarioLoader::new(self.kinds.clone());
        let mut registry = EntityRegistry::new();
        let report = loader.load(doc, &mut registry);

        self.registry = registry;
        self.global_parameters = doc.global_parameters.clone();
        self.range = Some(range);
        self.current_year = Some(range.start());
        self.phase = RunPhase::Loaded;

        info!(
            scenario = %self.scenario_name,
            start_year = range.start(),
            end_year = range.end(),
            entities = report.total_entities(),
            rejected = report.diagnostics.len(),
            "Scenario loaded"
        );
        Ok(report)
    }

    /// Initialize every module, in registration order.
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError::Precondition`] unless a scenario is loaded,
    /// and [`ManagerError::ModuleInit`] naming the first module that fails.
    /// A failed initialization aborts the run.
    pub fn initialize_modules(&mut self) -> Result<(), ManagerError> {
        self.require("initialize modules", &[RunPhase::Loaded])?;
        for module in &mut self.modules {
            if let Err(source) = module.initialize(&self.registry, &self.global_parameters) {
                error!(module = module.id(), %source, "Module initialization failed");
                self.phase = RunPhase::Aborted;
                return Err(ManagerError::ModuleInit {
                    module_id: module.id().to_owned(),
                    source,
                });
            }
            debug!(module = module.id(), "Module initialized");
        }
        self.phase = RunPhase::ModulesReady;
        info!(modules = self.modules.len(), "All modules initialized");
        Ok(())
    }

    /// Step through every year and collect one snapshot per year.
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError::Precondition`] unless modules are
    /// initialized (no results are produced), and
    /// [`ManagerError::ModuleStep`] if a module fails. After a module
    /// failure the manager is [`RunPhase::Aborted`] and keeps the snapshots
    /// of every completed year.
    pub fn run(&mut self) -> Result<&SimulationResults, ManagerError> {
        self.require("run", &[RunPhase::ModulesReady])?;
        let Some(range) = self.range else {
            return Err(ManagerError::Precondition {
                operation: "run",
                phase: self.phase,
            });
        };
        self.phase = RunPhase::Running;
        info!(
            scenario = %self.scenario_name,
            start_year = range.start(),
            end_year = range.end(),
            modules = self.modules.len(),
            "Simulation started"
        );

        for year in range.years() {
            self.current_year = Some(year);
            debug!(year, "Year started");
            if let Err(err) = self.step_year(year, range.previous(year)) {
                error!(year, %err, "Simulation aborted");
                self.phase = RunPhase::Aborted;
                return Err(err);
            }
            self.results.insert(year, snapshot::capture(&self.registry));
            info!(year, entities = self.registry.len(), "Year completed");
        }

        self.phase = RunPhase::Complete;
        info!(
            scenario = %self.scenario_name,
            years = self.results.len(),
            "Simulation complete"
        );
        Ok(&self.results)
    }

    fn step_year(&mut self, year: Year, previous: Option<Year>) -> Result<(), ManagerError> {
        let mut ctx = YearContext::new(
            year,
            previous,
            &mut self.registry,
            &self.global_parameters,
            &self.results,
        );
        for module in &mut self.modules {
            debug!(year, module = module.id(), "Module step");
            module
                .execute_year_step(year, &mut ctx)
                .map_err(|source| ManagerError::ModuleStep {
                    module_id: module.id().to_owned(),
                    year,
                    source,
                })?;
        }
        Ok(())
    }

    fn require(&self, operation: &'static str, allowed: &[RunPhase]) -> Result<(), ManagerError> {
        if allowed.contains(&self.phase) {
            Ok(())
        } else {
            Err(ManagerError::Precondition {
                operation,
                phase: self.phase,
            })
        }
    }

    /// Flatten the current registry state. Does not modify anything.
    pub fn snapshot(&self) -> YearSnapshot {
        snapshot::capture(&self.registry)
    }

    /// Snapshots captured so far, keyed by year.
    pub const fn results(&self) -> &SimulationResults {
        &self.results
    }

    /// Results regrouped per entity.
    pub fn trajectories(&self) -> Trajectories {
        trajectory::to_trajectories(&self.results)
    }

    /// Every loaded entity.
    pub const fn registry(&self) -> &EntityRegistry {
        &self.registry
    }

    /// The scenario's global parameters.
    pub const fn global_parameters(&self) -> &GlobalParameters {
        &self.global_parameters
    }

    /// Current lifecycle phase.
    pub const fn phase(&self) -> RunPhase {
        self.phase
    }

    /// Year being (or last) simulated; the start year right after loading.
    pub const fn current_year(&self) -> Option<Year> {
        self.current_year
    }

    /// The scenario's year range, once loaded.
    pub const fn year_range(&self) -> Option<YearRange> {
        self.range
    }

    /// Name given to this run.
    pub fn scenario_name(&self) -> &str {
        &self.scenario_name
    }

    /// Ids of the registered modules, in execution order.
    pub fn module_ids(&self) -> Vec<&str> {
        self.modules.iter().map(|m| m.id()).collect()
    }
}
