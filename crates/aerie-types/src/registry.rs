//! # Service Registry - Named Instances by Interface
//!
//! Maps an (interface type, instance name) pair to one shared instance.
//! Modules, sources and plain services are all looked up through it.
//!
//! ## Lifecycle
//!
//! 1. **Registration**: the runtime registers every instance while the
//!    application is being assembled.
//! 2. **Sealed**: [`ServiceRegistry::seal`] is called before any component is
//!    initialized. From then on the registry is read-only and further
//!    registrations fail with [`RegistryError::RegistrationClosed`].
//!
//! The registry is not a global: it is owned by the runtime and handed to
//! components through [`crate::ServiceContext`], so every test can build a
//! fresh one.
//!
//! ## Anonymous Lookup
//!
//! `resolve::<I>("")` returns, in order of preference:
//!
//! - the instance registered under the empty name,
//! - the instance marked with [`ServiceRegistry::designate_default`],
//! - the only registered instance, if there is exactly one.
//!
//! Anything else is [`RegistryError::AmbiguousOrMissing`].
//!
//! ## Usage
//!
//! ```rust,ignore
//! let mut registry = ServiceRegistry::new();
//!
//! let fitter: Shared<dyn Module> = shared(CoreFitter::default());
//! registry.register::<dyn Module>("core-fitter", fitter)?;
//! registry.seal();
//!
//! let fitter = registry.resolve::<dyn Module>("core-fitter")?;
//! fitter.lock().process(&mut bag)?;
//! ```

use std::any::{type_name, Any, TypeId};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::bag::short_type_name;
use crate::errors::RegistryError;

/// Handle through which registered instances are shared.
pub type Shared<T> = Arc<Mutex<T>>;

/// Wrap a value into a [`Shared`] handle.
pub fn shared<T>(value: T) -> Shared<T> {
    Arc::new(Mutex::new(value))
}

/// Whether the registry still accepts registrations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegistryPhase {
    Registration,
    Sealed,
}

/// One (interface, name) binding, as listed by [`ServiceRegistry::registrations`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    pub interface: String,
    pub name: String,
}

/// All instances bound for one interface type.
struct InterfaceSlot {
    /// Erased `Shared<I>` keyed by instance name. The empty name is the anonymous default.
    instances: BTreeMap<String, Box<dyn Any + Send + Sync>>,
    default: Option<String>,
}

impl InterfaceSlot {
    fn get<I: ?Sized + Send + 'static>(&self, name: &str) -> Option<Shared<I>> {
        self.instances
            .get(name)
            .and_then(|erased| erased.downcast_ref::<Shared<I>>())
            .map(Arc::clone)
    }

    fn anonymous_name(&self) -> Option<&str> {
        if self.instances.contains_key("") {
            return Some("");
        }
        if let Some(default) = &self.default {
            return Some(default.as_str());
        }
        if self.instances.len() == 1 {
            self.instances.keys().next().map(String::as_str)
        } else {
            None
        }
    }
}

/// Registry of shared instances keyed by interface type and name.
pub struct ServiceRegistry {
    slots: HashMap<TypeId, InterfaceSlot>,
    registrations: Vec<Registration>,
    phase: RegistryPhase,
}

impl ServiceRegistry {
    /// Create an empty registry in the registration phase.
    pub fn new() -> Self {
        Self {
            slots: HashMap::new(),
            registrations: Vec::new(),
            phase: RegistryPhase::Registration,
        }
    }

    /// Bind `instance` to interface `I` under `name`.
    pub fn register<I: ?Sized + Send + 'static>(
        &mut self,
        name: impl Into<String>,
        instance: Shared<I>,
    ) -> Result<(), RegistryError> {
        let name = name.into();
        let interface = interface_name::<I>();

        if self.phase == RegistryPhase::Sealed {
            return Err(RegistryError::RegistrationClosed { interface, name });
        }

        let slot = self
            .slots
            .entry(TypeId::of::<I>())
            .or_insert_with(|| InterfaceSlot {
                instances: BTreeMap::new(),
                default: None,
            });

        if slot.instances.contains_key(&name) {
            return Err(RegistryError::DuplicateRegistration { interface, name });
        }

        info!("[Registry] Registering {} '{}'", interface, name);
        slot.instances.insert(name.clone(), Box::new(instance));
        self.registrations.push(Registration { interface, name });
        Ok(())
    }

    /// Make the instance `name` the answer to anonymous lookups of `I`.
    pub fn designate_default<I: ?Sized + Send + 'static>(
        &mut self,
        name: &str,
    ) -> Result<(), RegistryError> {
        let interface = interface_name::<I>();
        if self.phase == RegistryPhase::Sealed {
            return Err(RegistryError::RegistrationClosed {
                interface,
                name: name.to_string(),
            });
        }

        match self.slots.get_mut(&TypeId::of::<I>()) {
            Some(slot) if slot.instances.contains_key(name) => {
                debug!("[Registry] '{}' is the default {}", name, interface);
                slot.default = Some(name.to_string());
                Ok(())
            }
            _ => Err(RegistryError::ServiceNotFound {
                interface,
                name: name.to_string(),
            }),
        }
    }

    /// Look up the instance of `I` named `name`; the empty name is an anonymous lookup.
    pub fn resolve<I: ?Sized + Send + 'static>(&self, name: &str) -> Result<Shared<I>, RegistryError> {
        let Some(slot) = self.slots.get(&TypeId::of::<I>()) else {
            return Err(self.missing::<I>(name, Vec::new()));
        };

        let resolved = if name.is_empty() {
            slot.anonymous_name()
        } else {
            Some(name)
        };

        resolved
            .and_then(|resolved| slot.get::<I>(resolved))
            .ok_or_else(|| self.missing::<I>(name, slot.instances.keys().cloned().collect()))
    }

    /// Like [`ServiceRegistry::resolve`] but `None` on failure.
    pub fn try_resolve<I: ?Sized + Send + 'static>(&self, name: &str) -> Option<Shared<I>> {
        self.resolve::<I>(name).ok()
    }

    /// True if an instance of `I` is bound under exactly `name`.
    pub fn contains<I: ?Sized + Send + 'static>(&self, name: &str) -> bool {
        self.slots
            .get(&TypeId::of::<I>())
            .is_some_and(|slot| slot.instances.contains_key(name))
    }

    /// Instance names bound for `I`, sorted.
    pub fn names<I: ?Sized + Send + 'static>(&self) -> Vec<String> {
        self.slots
            .get(&TypeId::of::<I>())
            .map(|slot| slot.instances.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Every binding in registration order.
    pub fn registrations(&self) -> &[Registration] {
        &self.registrations
    }

    /// Close the registration phase.
    pub fn seal(&mut self) {
        if self.phase == RegistryPhase::Registration {
            info!(
                "[Registry] Sealed with {} registrations across {} interfaces",
                self.registrations.len(),
                self.slots.len()
            );
        }
        self.phase = RegistryPhase::Sealed;
    }

    pub fn phase(&self) -> RegistryPhase {
        self.phase
    }

    /// Drop every binding and reopen registration.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.registrations.clear();
        self.phase = RegistryPhase::Registration;
    }

    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    fn missing<I: ?Sized + 'static>(&self, name: &str, candidates: Vec<String>) -> RegistryError {
        let interface = interface_name::<I>();
        if name.is_empty() {
            RegistryError::AmbiguousOrMissing {
                interface,
                candidates,
            }
        } else {
            RegistryError::ServiceNotFound {
                interface,
                name: name.to_string(),
            }
        }
    }
}

impl Default for ServiceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn interface_name<I: ?Sized + 'static>() -> String {
    short_type_name(type_name::<I>())
}
