//! # Integration Scenarios
//!
//! End-to-end runs assembled through the `Nest`, plus property tests for
//! the container, registry and configuration contracts.

pub mod properties;
pub mod scenarios;
