//! # Component Catalog
//!
//! Build-by-name table of component types. Every entry knows how to create
//! a fresh instance and register it in a [`ServiceRegistry`] under:
//!
//! - its concrete type, so tests and tools can reach the instance directly;
//! - its interface (`dyn Module`, `dyn Source`, ...), which is what other
//!   components resolve.
//!
//! The lifecycle handle (`dyn Service`) is returned to the caller.
//!
//! Types are keyed by their short type name (`CountingSource`,
//! `WhileLoop<FixedIterations>`); [`ComponentCatalog::alias`] adds extra names.

use std::any::type_name;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use aerie_pipeline::{
    BagDumpModule, CountingSource, FixedIterations, IndexSignpost, MainLoop, Module, MultiSource,
    PrescaleModule, SequentialMainLoop, SharedMainLoop, SharedModule, SharedSignpost, SharedSource,
    SignpostModule, SingleEventMainLoop, Source, TwoForkMainLoop, WhileLoop,
};
use aerie_types::{shared, short_type_name, DynService, RegistryError, Service, ServiceRegistry, Shared};
use tracing::debug;

use crate::error::RuntimeError;

/// The pluggable role a catalog entry fills.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentKind {
    Service,
    Module,
    Source,
    Signpost,
    MainLoop,
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Service => write!(f, "service"),
            Self::Module => write!(f, "module"),
            Self::Source => write!(f, "source"),
            Self::Signpost => write!(f, "signpost"),
            Self::MainLoop => write!(f, "main loop"),
        }
    }
}

type Build = Arc<dyn Fn(&mut ServiceRegistry, &str) -> Result<DynService, RegistryError> + Send + Sync>;

#[derive(Clone)]
struct Factory {
    kind: ComponentKind,
    build: Build,
}

/// Register `instance` under its concrete type and under interface `I`.
pub(crate) fn register_as<T, I>(
    registry: &mut ServiceRegistry,
    name: &str,
    instance: Shared<T>,
    upcast: fn(Shared<T>) -> Shared<I>,
) -> Result<DynService, RegistryError>
where
    T: Service + 'static,
    I: ?Sized + Send + 'static,
{
    registry.register::<T>(name, Arc::clone(&instance))?;
    registry.register::<I>(name, upcast(Arc::clone(&instance)))?;
    Ok(instance as DynService)
}

pub(crate) fn module_view<T: Module + 'static>(instance: Shared<T>) -> SharedModule {
    instance
}

pub(crate) fn source_view<T: Source + 'static>(instance: Shared<T>) -> SharedSource {
    instance
}

pub(crate) fn signpost_view<T: SignpostModule + 'static>(instance: Shared<T>) -> SharedSignpost {
    instance
}

pub(crate) fn main_loop_view<T: MainLoop + 'static>(instance: Shared<T>) -> SharedMainLoop {
    instance
}

/// Table of constructible component types.
#[derive(Clone, Default)]
pub struct ComponentCatalog {
    factories: BTreeMap<String, Factory>,
}

impl ComponentCatalog {
    /// An empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// A catalog holding every component shipped with the framework.
    pub fn builtin() -> Self {
        let mut catalog = Self::new();
        catalog.put_module::<PrescaleModule>();
        catalog.put_module::<BagDumpModule>();
        catalog.put_module::<WhileLoop<FixedIterations>>();
        catalog.put_source::<CountingSource>();
        catalog.put_source::<MultiSource>();
        catalog.put_signpost::<IndexSignpost>();
        catalog.put_main_loop::<SequentialMainLoop>();
        catalog.put_main_loop::<SingleEventMainLoop>();
        catalog.put_main_loop::<TwoForkMainLoop>();
        if let Some(factory) = catalog.factories.get(&short_name::<WhileLoop<FixedIterations>>()).cloned() {
            catalog.factories.insert("WhileLoop".to_string(), factory);
        }
        catalog
    }

    pub fn add_module<T: Module + Default + 'static>(&mut self) -> Result<&mut Self, RuntimeError> {
        self.ensure_new(&short_name::<T>())?;
        self.put_module::<T>();
        Ok(self)
    }

    pub fn add_source<T: Source + Default + 'static>(&mut self) -> Result<&mut Self, RuntimeError> {
        self.ensure_new(&short_name::<T>())?;
        self.put_source::<T>();
        Ok(self)
    }

    pub fn add_signpost<T: SignpostModule + Default + 'static>(&mut self) -> Result<&mut Self, RuntimeError> {
        self.ensure_new(&short_name::<T>())?;
        self.put_signpost::<T>();
        Ok(self)
    }

    pub fn add_main_loop<T: MainLoop + Default + 'static>(&mut self) -> Result<&mut Self, RuntimeError> {
        self.ensure_new(&short_name::<T>())?;
        self.put_main_loop::<T>();
        Ok(self)
    }

    /// Add a plain service resolvable as interface `I`.
    ///
    /// `upcast` is usually a non-capturing closure such as
    /// `|s| s as Shared<dyn Calibration>`.
    pub fn add_service<T, I>(&mut self, upcast: fn(Shared<T>) -> Shared<I>) -> Result<&mut Self, RuntimeError>
    where
        T: Service + Default + 'static,
        I: ?Sized + Send + 'static,
    {
        let type_name = short_name::<T>();
        self.ensure_new(&type_name)?;
        self.put(type_name, ComponentKind::Service, move |registry, name| {
            register_as(registry, name, shared(T::default()), upcast)
        });
        Ok(self)
    }

    /// Make `existing` constructible under `alias` too.
    pub fn alias(&mut self, existing: &str, alias: &str) -> Result<&mut Self, RuntimeError> {
        self.ensure_new(alias)?;
        let factory = self
            .factories
            .get(existing)
            .cloned()
            .ok_or_else(|| self.unknown(existing))?;
        self.factories.insert(alias.to_string(), factory);
        Ok(self)
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.factories.contains_key(type_name)
    }

    pub fn kind_of(&self, type_name: &str) -> Option<ComponentKind> {
        self.factories.get(type_name).map(|f| f.kind)
    }

    /// Registered type names, sorted.
    pub fn type_names(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// Create an instance of `type_name` and register it as `name`.
    pub(crate) fn build(
        &self,
        type_name: &str,
        registry: &mut ServiceRegistry,
        name: &str,
    ) -> Result<DynService, RuntimeError> {
        let factory = self.factories.get(type_name).ok_or_else(|| self.unknown(type_name))?;
        debug!(type_name, name, kind = %factory.kind, "building component");
        Ok((factory.build)(registry, name)?)
    }

    fn unknown(&self, type_name: &str) -> RuntimeError {
        RuntimeError::UnknownComponentType {
            type_name: type_name.to_string(),
            known: self.factories.keys().cloned().collect(),
        }
    }

    fn ensure_new(&self, type_name: &str) -> Result<(), RuntimeError> {
        if self.factories.contains_key(type_name) {
            return Err(RuntimeError::DuplicateComponentType(type_name.to_string()));
        }
        Ok(())
    }

    fn put<F>(&mut self, type_name: String, kind: ComponentKind, build: F)
    where
        F: Fn(&mut ServiceRegistry, &str) -> Result<DynService, RegistryError> + Send + Sync + 'static,
    {
        self.factories.insert(
            type_name,
            Factory {
                kind,
                build: Arc::new(build),
            },
        );
    }

    fn put_module<T: Module + Default + 'static>(&mut self) {
        self.put(short_name::<T>(), ComponentKind::Module, |registry, name| {
            register_as(registry, name, shared(T::default()), module_view::<T>)
        });
    }

    fn put_source<T: Source + Default + 'static>(&mut self) {
        self.put(short_name::<T>(), ComponentKind::Source, |registry, name| {
            register_as(registry, name, shared(T::default()), source_view::<T>)
        });
    }

    fn put_signpost<T: SignpostModule + Default + 'static>(&mut self) {
        self.put(short_name::<T>(), ComponentKind::Signpost, |registry, name| {
            register_as(registry, name, shared(T::default()), signpost_view::<T>)
        });
    }

    fn put_main_loop<T: MainLoop + Default + 'static>(&mut self) {
        self.put(short_name::<T>(), ComponentKind::MainLoop, |registry, name| {
            register_as(registry, name, shared(T::default()), main_loop_view::<T>)
        });
    }
}

impl fmt::Debug for ComponentCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.factories.iter().map(|(name, factory)| (name, factory.kind)))
            .finish()
    }
}

fn short_name<T: ?Sized>() -> String {
    short_type_name(type_name::<T>())
}
