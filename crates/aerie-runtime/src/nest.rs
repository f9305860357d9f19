//! # Nest - Application Object
//!
//! Owns everything a run needs: the component catalog, the service
//! registry and the ordered list of assembled services.
//!
//! ## Lifecycle
//!
//! ```text
//! Assembling ──configure()──▶ Configured ──finish()──▶ Finished
//!   add_service                execute_main_loop
//!   set_parameter
//!   apply_overrides
//! ```
//!
//! Services are initialized and finished in the order they were added.
//!
//! ## Example
//!
//! ```rust,ignore
//! let mut nest = Nest::new();
//! nest.add_service("CountingSource", "source")?.set("count", 100)?;
//! nest.add_service("BagDumpModule", "dump")?;
//! nest.add_service("SequentialMainLoop", "main")?
//!     .set("source", "source")?
//!     .set("modulechain", vec!["dump".to_string()])?;
//! nest.configure()?;
//! let stats = nest.execute_main_loop("main", Direction::Forward)?;
//! nest.finish()?;
//! ```

use std::any::type_name;
use std::fmt;

use aerie_pipeline::{Direction, LoopStats, MainLoop, Module, Source};
use aerie_telemetry::log_event;
use aerie_types::{
    shared, short_type_name, Configuration, DynService, ParamType, ParamValue, Service,
    ServiceContext, ServiceRegistry, Shared,
};
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::catalog::{module_view, register_as, source_view, ComponentCatalog};
use crate::error::RuntimeError;

/// Where a [`Nest`] is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NestPhase {
    /// Services and parameters may be added.
    Assembling,
    /// Services are initialized; main loops may run.
    Configured,
    /// Services are finished; nothing else is allowed.
    Finished,
}

impl fmt::Display for NestPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Assembling => write!(f, "assembling"),
            Self::Configured => write!(f, "configured"),
            Self::Finished => write!(f, "finished"),
        }
    }
}

struct ServiceEntry {
    name: String,
    type_name: String,
    handle: DynService,
    config: Configuration,
}

/// Chainable parameter setter returned when a service is added.
pub struct Configurator<'a> {
    entry: &'a mut ServiceEntry,
}

impl<'a> Configurator<'a> {
    pub fn name(&self) -> &str {
        &self.entry.name
    }

    pub fn set(self, parameter: &str, value: impl Into<ParamValue>) -> Result<Self, RuntimeError> {
        self.entry.config.set_parameter(parameter, value)?;
        Ok(self)
    }

    pub fn set_decode(self, parameter: &str, text: &str) -> Result<Self, RuntimeError> {
        self.entry.config.set_parameter_decode(parameter, text)?;
        Ok(self)
    }
}

pub struct Nest {
    catalog: ComponentCatalog,
    registry: ServiceRegistry,
    services: Vec<ServiceEntry>,
    phase: NestPhase,
    run_id: Uuid,
}

impl Default for Nest {
    fn default() -> Self {
        Self::new()
    }
}

impl Nest {
    /// A nest able to build every builtin component.
    pub fn new() -> Self {
        Self::with_catalog(ComponentCatalog::builtin())
    }

    pub fn with_catalog(catalog: ComponentCatalog) -> Self {
        let run_id = Uuid::new_v4();
        info!("[Nest] Created run {}", run_id);
        Self {
            catalog,
            registry: ServiceRegistry::new(),
            services: Vec::new(),
            phase: NestPhase::Assembling,
            run_id,
        }
    }

    pub fn catalog(&self) -> &ComponentCatalog {
        &self.catalog
    }

    pub fn catalog_mut(&mut self) -> &mut ComponentCatalog {
        &mut self.catalog
    }

    pub fn registry(&self) -> &ServiceRegistry {
        &self.registry
    }

    pub fn phase(&self) -> NestPhase {
        self.phase
    }

    /// Unique identifier of this run, attached to lifecycle logs.
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Build a `type_name` component from the catalog and add it as `name`.
    pub fn add_service(&mut self, type_name: &str, name: &str) -> Result<Configurator<'_>, RuntimeError> {
        self.ensure_can_add(name, type_name)?;
        let handle = self.catalog.build(type_name, &mut self.registry, name)?;
        self.push_entry(name, type_name, handle)
    }

    /// Add a pre-built component, resolvable by its concrete type and as `I`.
    pub fn add_instance<T, I>(
        &mut self,
        name: &str,
        instance: T,
        upcast: fn(Shared<T>) -> Shared<I>,
    ) -> Result<Configurator<'_>, RuntimeError>
    where
        T: Service + 'static,
        I: ?Sized + Send + 'static,
    {
        let type_name = short_type_name(type_name::<T>());
        self.ensure_can_add(name, &type_name)?;
        let handle = register_as(&mut self.registry, name, shared(instance), upcast)?;
        self.push_entry(name, &type_name, handle)
    }

    /// [`Nest::add_instance`] for modules.
    pub fn add_module_instance<T: Module + 'static>(
        &mut self,
        name: &str,
        module: T,
    ) -> Result<Configurator<'_>, RuntimeError> {
        self.add_instance(name, module, module_view::<T>)
    }

    /// [`Nest::add_instance`] for sources.
    pub fn add_source_instance<T: Source + 'static>(
        &mut self,
        name: &str,
        source: T,
    ) -> Result<Configurator<'_>, RuntimeError> {
        self.add_instance(name, source, source_view::<T>)
    }

    fn ensure_can_add(&self, name: &str, type_name: &str) -> Result<(), RuntimeError> {
        self.expect_phase(NestPhase::Assembling, "add a service")?;
        if self.service_exists(name) {
            return Err(RuntimeError::DuplicateService {
                name: name.to_string(),
                type_name: type_name.to_string(),
            });
        }
        Ok(())
    }

    fn push_entry(
        &mut self,
        name: &str,
        type_name: &str,
        handle: DynService,
    ) -> Result<Configurator<'_>, RuntimeError> {
        let config = handle.lock().default_configuration()?;
        log_event!(debug, name, "service added", service_type = type_name, parameters = config.len());

        self.services.push(ServiceEntry {
            name: name.to_string(),
            type_name: type_name.to_string(),
            handle,
            config,
        });
        let index = self.services.len() - 1;
        Ok(Configurator {
            entry: &mut self.services[index],
        })
    }

    pub fn service_exists(&self, name: &str) -> bool {
        self.services.iter().any(|s| s.name == name)
    }

    /// Service names in insertion order.
    pub fn service_names(&self) -> Vec<&str> {
        self.services.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn type_of(&self, name: &str) -> Option<&str> {
        self.entry(name).ok().map(|s| s.type_name.as_str())
    }

    pub fn configuration(&self, name: &str) -> Option<&Configuration> {
        self.entry(name).ok().map(|s| &s.config)
    }

    /// Resolve an assembled component by interface or concrete type.
    pub fn resolve<I: ?Sized + Send + 'static>(&self, name: &str) -> Result<Shared<I>, RuntimeError> {
        Ok(self.registry.resolve::<I>(name)?)
    }

    pub fn set_parameter(
        &mut self,
        service: &str,
        parameter: &str,
        value: impl Into<ParamValue>,
    ) -> Result<(), RuntimeError> {
        self.expect_phase(NestPhase::Assembling, "set a parameter")?;
        self.entry_mut(service)?.config.set_parameter(parameter, value)?;
        Ok(())
    }

    pub fn set_parameter_decode(&mut self, service: &str, parameter: &str, text: &str) -> Result<(), RuntimeError> {
        self.expect_phase(NestPhase::Assembling, "set a parameter")?;
        self.entry_mut(service)?
            .config
            .set_parameter_decode(parameter, text)?;
        Ok(())
    }

    pub fn get_parameter<T: ParamType>(&self, service: &str, parameter: &str) -> Result<T, RuntimeError> {
        Ok(self.entry(service)?.config.get_parameter(parameter)?)
    }

    /// Apply `<prefix><service>__<parameter>=<text>` pairs; other keys are ignored.
    ///
    /// Returns the number of parameters set.
    pub fn apply_overrides<I, K, V>(&mut self, prefix: &str, vars: I) -> Result<usize, RuntimeError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut applied = 0;
        for (key, text) in vars {
            let key = key.as_ref();
            let Some(rest) = key.strip_prefix(prefix) else {
                continue;
            };
            let (service, parameter) = rest
                .split_once("__")
                .filter(|(s, p)| !s.is_empty() && !p.is_empty())
                .ok_or_else(|| RuntimeError::InvalidOverride { key: key.to_string() })?;

            self.set_parameter_decode(service, parameter, text.as_ref())?;
            log_event!(info, service, "parameter overridden", parameter, value = text.as_ref());
            applied += 1;
        }
        Ok(applied)
    }

    /// Seal the registry and initialize every service in insertion order.
    pub fn configure(&mut self) -> Result<(), RuntimeError> {
        self.expect_phase(NestPhase::Assembling, "configure")?;
        self.registry.seal();
        log_event!(
            info,
            "nest",
            "configuring services",
            run_id = %self.run_id,
            services = self.services.len()
        );

        for entry in &self.services {
            let ctx = ServiceContext::new(&self.registry, &entry.name);
            entry
                .handle
                .lock()
                .initialize(&entry.config, &ctx)
                .map_err(|source| {
                    error!("[{}] Initialization failed: {}", entry.name, source);
                    RuntimeError::Initialize {
                        service: entry.name.clone(),
                        source,
                    }
                })?;
            log_event!(info, entry.name.as_str(), "configured", service_type = entry.type_name.as_str());
            debug!("[{}] Configured with:\n{}", entry.name, entry.config);
        }

        self.phase = NestPhase::Configured;
        Ok(())
    }

    /// Run the main loop registered as `name` and return its statistics.
    pub fn execute_main_loop(&mut self, name: &str, direction: Direction) -> Result<LoopStats, RuntimeError> {
        self.expect_phase(NestPhase::Configured, "execute a main loop")?;
        let main_loop = self.registry.resolve::<dyn MainLoop>(name)?;

        log_event!(info, name, "executing main loop", direction = %direction, run_id = %self.run_id);
        let mut main_loop = main_loop.lock();
        main_loop.execute(direction)?;

        let stats = main_loop.stats();
        log_event!(
            info,
            name,
            "main loop finished",
            fetched = stats.fetched,
            completed = stats.completed,
            filtered = stats.filtered,
            terminated = stats.terminated
        );
        Ok(stats)
    }

    /// Finish every service in insertion order.
    ///
    /// All services are finished even if one fails; the first failure is returned.
    pub fn finish(&mut self) -> Result<(), RuntimeError> {
        self.expect_phase(NestPhase::Configured, "finish")?;
        let mut first_error = None;

        for entry in &self.services {
            if let Err(source) = entry.handle.lock().finish() {
                error!("[{}] Finish failed: {}", entry.name, source);
                first_error.get_or_insert(RuntimeError::Finish {
                    service: entry.name.clone(),
                    source,
                });
            }
        }

        self.phase = NestPhase::Finished;
        log_event!(info, "nest", "finished", run_id = %self.run_id);
        first_error.map_or(Ok(()), Err)
    }

    /// Every service with its type and parameters.
    pub fn dump<W: fmt::Write>(&self, out: &mut W) -> fmt::Result {
        for entry in &self.services {
            writeln!(out, "{} ({}):", entry.name, entry.type_name)?;
            entry.config.dump(out)?;
        }
        Ok(())
    }

    /// INI listing with one `[service]` section per service.
    pub fn dump_ini<W: fmt::Write>(&self, out: &mut W) -> fmt::Result {
        for (i, entry) in self.services.iter().enumerate() {
            if i > 0 {
                writeln!(out)?;
            }
            writeln!(out, "[{}]", entry.name)?;
            writeln!(out, "service_type = {}", entry.type_name)?;
            entry.config.dump_ini(out)?;
        }
        Ok(())
    }

    pub(crate) fn entries(&self) -> impl Iterator<Item = (&str, &str, &Configuration)> {
        self.services
            .iter()
            .map(|s| (s.name.as_str(), s.type_name.as_str(), &s.config))
    }

    fn entry(&self, name: &str) -> Result<&ServiceEntry, RuntimeError> {
        self.services
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| RuntimeError::UnknownService(name.to_string()))
    }

    fn entry_mut(&mut self, name: &str) -> Result<&mut ServiceEntry, RuntimeError> {
        self.services
            .iter_mut()
            .find(|s| s.name == name)
            .ok_or_else(|| RuntimeError::UnknownService(name.to_string()))
    }

    fn expect_phase(&self, expected: NestPhase, operation: &'static str) -> Result<(), RuntimeError> {
        if self.phase != expected {
            return Err(RuntimeError::InvalidPhase {
                operation,
                phase: self.phase,
            });
        }
        Ok(())
    }
}

impl fmt::Debug for Nest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Nest")
            .field("run_id", &self.run_id)
            .field("phase", &self.phase)
            .field("services", &self.service_names())
            .finish()
    }
}

impl fmt::Display for Nest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.dump(f)
    }
}
