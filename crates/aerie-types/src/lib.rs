//! # Aerie Types Crate
//!
//! The framework core every other crate builds on.
//!
//! ## Contents
//!
//! - [`Bag`]: per-event, name-keyed heterogeneous container with checked retrieval.
//! - [`Configuration`]: named, typed parameters with defaults and text decoding.
//! - [`ServiceRegistry`]: shared instances keyed by interface type and name.
//! - [`Service`]: the `default_configuration` / `initialize` / `finish` contract.
//!
//! ## Design Principles
//!
//! - **No ambient globals**: the registry is passed explicitly through
//!   [`ServiceContext`], so every test constructs its own.
//! - **Fail fast**: lookups return typed errors naming the key and types
//!   involved; nothing is silently coerced outside the conversion whitelist.

pub mod bag;
pub mod configuration;
pub mod errors;
pub mod registry;
pub mod service;

pub use bag::{short_type_name, Bag, OverwritePolicy};
pub use configuration::{compose, Configuration, ParamKind, ParamType, ParamValue};
pub use errors::*;
pub use registry::{shared, Registration, RegistryPhase, ServiceRegistry, Shared};
pub use service::{DynService, Service, ServiceContext};
