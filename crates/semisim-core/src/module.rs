//! The module contract and the per-year execution context.
//!
//! A [`Module`] is a pluggable unit of simulation logic. The manager calls
//! [`Module::initialize`] once, in registration order, with read-only access
//! to the loaded registry; modules use it to capture a [`RegistryView`] of
//! the entities they will write. Then, once per simulated year, the manager
//! calls [`Module::execute_year_step`] with a [`YearContext`].
//!
//! The context gives read access to everything (all entities, global
//! parameters, earlier snapshots) but write access only through
//! [`YearContext::entity_mut`], which checks the handle against the caller's
//! view. Writes land immediately, so a module running later in the same year
//! sees them.

use semisim_types::{GlobalParameters, SimulationResults, Value, Year, YearSnapshot};

use crate::entity::{Entity, EntityError};
use crate::registry::{EntityHandle, EntityRegistry, RegistryView};

/// Errors a module can raise from initialization or a year step.
#[derive(Debug, thiserror::Error)]
pub enum ModuleError {
    /// The module tried to write an entity outside its captured view.
    #[error("entity {handle} is outside the module's scope")]
    OutOfScope {
        /// The refused handle.
        handle: EntityHandle,
    },

    /// An entity write was rejected.
    #[error("entity write failed: {source}")]
    Entity {
        /// The underlying entity error.
        #[from]
        source: EntityError,
    },

    /// An attribute the module depends on has an unusable value.
    #[error("attribute `{attribute}` of {entity} is malformed: {reason}")]
    MalformedAttribute {
        /// Id of the entity holding the attribute.
        entity: String,
        /// The attribute name.
        attribute: String,
        /// What was wrong with it.
        reason: String,
    },

    /// A global parameter has an unusable value.
    #[error("global parameter `{name}` is invalid: {reason}")]
    InvalidParameter {
        /// The parameter name.
        name: String,
        /// What was wrong with it.
        reason: String,
    },

    /// Any other failure inside the module.
    #[error("module error: {message}")]
    Internal {
        /// Description of the error.
        message: String,
    },
}

/// A unit of simulation logic executed once per year.
///
/// Implementations hold their own configuration and the handles they
/// captured at initialization. They must not keep references into the
/// registry between calls.
pub trait Module {
    /// Unique, stable identifier (e.g. `GEO`).
    fn id(&self) -> &str;

    /// Human-readable name.
    fn name(&self) -> &str;

    /// Capture the entities this module works on.
    ///
    /// Called exactly once, after the scenario is loaded and before the first
    /// year. The registry is read-only here.
    ///
    /// # Errors
    ///
    /// Returns [`ModuleError`] if the module cannot run against this
    /// scenario. The manager refuses to start the run in that case.
    fn initialize(
        &mut self,
        registry: &EntityRegistry,
        params: &GlobalParameters,
    ) -> Result<(), ModuleError>;

    /// Advance the module's part of the world by one year.
    ///
    /// # Errors
    ///
    /// Returns [`ModuleError`] on failure. The run stops at this module and
    /// writes already made stay in place.
    fn execute_year_step(&mut self, year: Year, ctx: &mut YearContext<'_>)
    -> Result<(), ModuleError>;
}

/// Everything a module sees during one year step.
pub struct YearContext<'a> {
    year: Year,
    previous_year: Option<Year>,
    registry: &'a mut EntityRegistry,
    params: &'a GlobalParameters,
    results: &'a SimulationResults,
}

impl<'a> YearContext<'a> {
    /// Build the context for `year`.
    ///
    /// `previous_year` is `None` in the first simulated year.
    pub const fn new(
        year: Year,
        previous_year: Option<Year>,
        registry: &'a mut EntityRegistry,
        params: &'a GlobalParameters,
        results: &'a SimulationResults,
    ) -> Self {
        Self {
            year,
            previous_year,
            registry,
            params,
            results,
        }
    }

    /// The year being simulated.
    pub const fn current_year(&self) -> Year {
        self.year
    }

    /// Read access to every entity.
    pub fn registry(&self) -> &EntityRegistry {
        &*self.registry
    }

    /// Read an entity by handle.
    pub fn entity(&self, handle: EntityHandle) -> Option<&Entity> {
        self.registry.get(handle)
    }

    /// The scenario's global parameters.
    pub const fn global_parameters(&self) -> &GlobalParameters {
        self.params
    }

    /// Snapshot of the previous year; `None` in the first year.
    pub fn previous_results(&self) -> Option<&YearSnapshot> {
        self.previous_year.and_then(|year| self.results.get(&year))
    }

    /// Every snapshot captured so far, keyed by year.
    pub const fn all_results(&self) -> &SimulationResults {
        self.results
    }

    /// Mutable access to an entity inside `view`.
    ///
    /// # Errors
    ///
    /// Returns [`ModuleError::OutOfScope`] if `handle` is not part of `view`
    /// or does not resolve to an entity.
    pub fn entity_mut(
        &mut self,
        view: &RegistryView,
        handle: EntityHandle,
    ) -> Result<&mut Entity, ModuleError> {
        if !view.contains(handle) {
            return Err(ModuleError::OutOfScope { handle });
        }
        self.registry
            .get_mut(handle)
            .ok_or(ModuleError::OutOfScope { handle })
    }

    /// Write an attribute of an in-scope entity for the current year.
    ///
    /// # Errors
    ///
    /// Returns [`ModuleError`] for out-of-scope handles and rejected writes.
    pub fn set(
        &mut self,
        view: &RegistryView,
        handle: EntityHandle,
        name: &str,
        value: impl Into<Value>,
    ) -> Result<(), ModuleError> {
        let year = self.year;
        self.entity_mut(view, handle)?.set(name, value, year)?;
        Ok(())
    }

    /// Run an in-scope entity's own update rules for the current year.
    ///
    /// # Errors
    ///
    /// Returns [`ModuleError`] for out-of-scope handles and rejected writes.
    pub fn update(&mut self, view: &RegistryView, handle: EntityHandle) -> Result<(), ModuleError> {
        if !view.contains(handle) {
            return Err(ModuleError::OutOfScope { handle });
        }
        let year = self.year;
        let params = self.params;
        let entity = self
            .registry
            .get_mut(handle)
            .ok_or(ModuleError::OutOfScope { handle })?;
        entity.update(year, params)?;
        Ok(())
    }

    /// Run the update rules of every entity in `handles`.
    ///
    /// # Errors
    ///
    /// Stops at the first failing entity.
    pub fn update_all(
        &mut self,
        view: &RegistryView,
        handles: &[EntityHandle],
    ) -> Result<(), ModuleError> {
        handles.iter().try_for_each(|&h| self.update(view, h))
    }
}
