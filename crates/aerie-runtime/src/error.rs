//! Runtime errors.

use aerie_pipeline::PipelineError;
use aerie_types::{ConfigurationError, NestError, RegistryError};
use thiserror::Error;

use crate::nest::NestPhase;

#[derive(Debug, Error)]
pub enum RuntimeError {
    /// No factory registered for the requested component type.
    #[error("Unknown component type '{type_name}'. Known types: {known:?}")]
    UnknownComponentType { type_name: String, known: Vec<String> },

    /// A factory with this type name is already in the catalog.
    #[error("Component type '{0}' is already registered")]
    DuplicateComponentType(String),

    #[error("Service with name '{0}' not found")]
    UnknownService(String),

    #[error("Service with name '{name}' already exists when adding a service of type '{type_name}'")]
    DuplicateService { name: String, type_name: String },

    /// The operation is not allowed in the current lifecycle phase.
    #[error("Cannot {operation} while the nest is {phase}")]
    InvalidPhase {
        operation: &'static str,
        phase: NestPhase,
    },

    #[error("Failed to initialize service '{service}': {source}")]
    Initialize {
        service: String,
        #[source]
        source: NestError,
    },

    #[error("Failed to finish service '{service}': {source}")]
    Finish {
        service: String,
        #[source]
        source: NestError,
    },

    #[error("Invalid parameter override '{key}': expected <prefix><service>__<parameter>")]
    InvalidOverride { key: String },

    #[error("Failed to parse nest file: {0}")]
    NestFile(String),

    #[error(transparent)]
    Nest(#[from] NestError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

impl From<ConfigurationError> for RuntimeError {
    fn from(err: ConfigurationError) -> Self {
        Self::Nest(err.into())
    }
}

impl From<RegistryError> for RuntimeError {
    fn from(err: RegistryError) -> Self {
        Self::Nest(err.into())
    }
}
