//! # Service Trait - Component Lifecycle Contract
//!
//! Every pluggable component (plain services, modules, sources, main loops)
//! implements [`Service`]:
//!
//! 1. `default_configuration()` declares the parameters it understands.
//! 2. `initialize()` receives the overridden configuration and a
//!    [`ServiceContext`] to resolve its collaborators.
//! 3. `finish()` runs once after the main loop is done.
//!
//! ## Example Implementation
//!
//! ```rust,ignore
//! use aerie_types::{Configuration, NestError, Service, ServiceContext};
//!
//! #[derive(Default)]
//! pub struct Calibrator { gain: f64 }
//!
//! impl Service for Calibrator {
//!     fn default_configuration(&self) -> Result<Configuration, NestError> {
//!         let mut config = Configuration::new();
//!         config.parameter_default("gain", 1.0)?;
//!         Ok(config)
//!     }
//!
//!     fn initialize(&mut self, config: &Configuration, _ctx: &ServiceContext<'_>) -> Result<(), NestError> {
//!         self.gain = config.get_parameter("gain")?;
//!         Ok(())
//!     }
//! }
//! ```

use std::sync::Arc;

use crate::configuration::Configuration;
use crate::errors::{NestError, RegistryError};
use crate::registry::{ServiceRegistry, Shared};

/// Lifecycle contract shared by every configurable component.
pub trait Service: Send {
    /// Parameters this component accepts, with their defaults.
    ///
    /// Fails only if the component declares the same name twice.
    fn default_configuration(&self) -> Result<Configuration, NestError> {
        Ok(Configuration::new())
    }

    /// Called once, in assembly order, before the main loop runs.
    fn initialize(&mut self, config: &Configuration, ctx: &ServiceContext<'_>) -> Result<(), NestError>;

    /// Called once, in assembly order, after the main loop has returned.
    fn finish(&mut self) -> Result<(), NestError> {
        Ok(())
    }
}

/// Type-erased lifecycle handle kept by the runtime for every instance.
pub type DynService = Shared<dyn Service>;

/// What a component sees of the runtime while it initializes.
#[derive(Clone, Copy)]
pub struct ServiceContext<'a> {
    registry: &'a ServiceRegistry,
    name: &'a str,
}

impl<'a> ServiceContext<'a> {
    pub fn new(registry: &'a ServiceRegistry, name: &'a str) -> Self {
        Self { registry, name }
    }

    /// Name of the instance being initialized.
    pub fn name(&self) -> &'a str {
        self.name
    }

    pub fn registry(&self) -> &'a ServiceRegistry {
        self.registry
    }

    /// Resolve a collaborator by interface and name.
    pub fn resolve<I: ?Sized + Send + 'static>(&self, name: &str) -> Result<Shared<I>, RegistryError> {
        self.registry.resolve::<I>(name)
    }

    /// Resolve every name in order, keeping the names alongside the handles.
    pub fn resolve_all<I: ?Sized + Send + 'static>(
        &self,
        names: &[String],
    ) -> Result<Vec<(String, Shared<I>)>, RegistryError> {
        names
            .iter()
            .map(|name| Ok((name.clone(), self.registry.resolve::<I>(name)?)))
            .collect()
    }

    /// True if the handle resolved for `name` is the instance being initialized.
    pub fn is_self<I: ?Sized + Send + 'static>(&self, handle: &Shared<I>) -> bool {
        self.registry
            .try_resolve::<I>(self.name)
            .is_some_and(|own| Arc::ptr_eq(&own, handle))
    }
}
