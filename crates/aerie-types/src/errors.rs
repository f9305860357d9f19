//! # Error Types
//!
//! Defines the error taxonomy shared by the container, configuration and
//! registry layers.
//!
//! Every variant names the offending key/parameter/service and the types
//! involved so a fatal error can be reported without further context.

use thiserror::Error;

/// Errors raised by [`crate::Bag`] lookups and insertions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BagError {
    /// Nothing stored under the requested key.
    #[error("Nothing in the bag with the name '{key}' when looking for type '{requested}'")]
    KeyNotFound { key: String, requested: String },

    /// Something is stored under the key, but not viewable as the requested type.
    #[error("Found bag member '{key}' of type '{stored}' but it isn't the requested type '{requested}'")]
    TypeMismatch {
        key: String,
        stored: String,
        requested: String,
    },

    /// The key is already taken and the bag's policy forbids overwriting.
    #[error("Bag member '{key}' already exists. Cannot put type '{attempted}' with that key")]
    DuplicateKey { key: String, attempted: String },
}

/// Errors raised while declaring, setting or reading configuration parameters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    /// A parameter with this name was already declared.
    #[error("Duplicate parameter '{name}' when adding a parameter of type '{kind}'")]
    DuplicateParameter { name: String, kind: String },

    /// The parameter was never declared.
    #[error("Parameter '{name}' not found when accessing a parameter of type '{requested}'")]
    UndeclaredParameter { name: String, requested: String },

    /// The declared type cannot be converted to/from the requested type.
    #[error("Parameter '{name}' is declared as '{declared}', cannot convert to/from '{requested}'")]
    TypeMismatch {
        name: String,
        declared: String,
        requested: String,
    },

    /// Declared without a default and never set.
    #[error("Parameter '{name}' has no default value and wasn't set. Looking for type '{requested}'")]
    ParameterNotSet { name: String, requested: String },

    /// Text could not be decoded into the declared type.
    #[error("Could not decode '{text}' as '{kind}' for parameter '{name}'")]
    Decode {
        name: String,
        kind: String,
        text: String,
    },
}

/// Errors raised by the [`crate::ServiceRegistry`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// The (interface, name) pair is already bound.
    #[error("Service with name '{name}' already registered for interface '{interface}'")]
    DuplicateRegistration { interface: String, name: String },

    /// No instance bound under the requested name.
    #[error("Couldn't find service to satisfy type '{interface}' and named '{name}'")]
    ServiceNotFound { interface: String, name: String },

    /// Anonymous resolve with zero, or several undesignated, candidates.
    #[error("Cannot resolve an anonymous '{interface}': candidates {candidates:?} and no default designated")]
    AmbiguousOrMissing {
        interface: String,
        candidates: Vec<String>,
    },

    /// Registration attempted after the registry was sealed.
    #[error("Registry is sealed; cannot register '{name}' for interface '{interface}'")]
    RegistrationClosed { interface: String, name: String },
}

/// Framework-wide error used by the service lifecycle and by processing units.
#[derive(Debug, Error)]
pub enum NestError {
    #[error("Bag error: {0}")]
    Bag(#[from] BagError),

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    /// A component reported a failure of its own.
    #[error("[{component}] {message}")]
    Component { component: String, message: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl NestError {
    /// Shorthand for a component-level failure.
    pub fn component(component: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Component {
            component: component.into(),
            message: message.into(),
        }
    }
}
