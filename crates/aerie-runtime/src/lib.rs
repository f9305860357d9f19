//! # Aerie Runtime
//!
//! Assembles services into a runnable analysis and drives its lifecycle.
//!
//! - [`ComponentCatalog`]: build-by-name table of component types
//! - [`Nest`]: service assembly, parameters and the configure / execute /
//!   finish lifecycle
//! - [`nest_file`]: TOML descriptions of a whole nest
//! - [`RuntimeConfig`]: process-level settings from the environment

pub mod catalog;
pub mod config;
pub mod error;
pub mod nest;
pub mod nest_file;

pub use catalog::{ComponentCatalog, ComponentKind};
pub use config::{RuntimeConfig, DEFAULT_OVERRIDE_PREFIX};
pub use error::RuntimeError;
pub use nest::{Configurator, Nest, NestPhase};
pub use nest_file::{load_nest_file, load_nest_str, to_nest_string};
