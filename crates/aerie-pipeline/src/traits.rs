//! # Processing Unit Traits
//!
//! The four pluggable roles of the pipeline. Each one extends
//! [`Service`], so every unit is configured and initialized the same way.
//!
//! ```text
//! Source ──next()──▶ Bag ──▶ Module ──▶ Module ──▶ ...
//!                              │
//!                    Continue / Filter / Terminate
//! ```

use std::fmt;

use aerie_types::{Bag, NestError, Service, Shared};
use serde::{Deserialize, Serialize};

/// Flow-control decision returned by [`Module::process`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModuleResult {
    /// Hand the bag to the next module.
    Continue,
    /// Skip the remaining modules for this bag and fetch the next one.
    Filter,
    /// Skip the remaining modules and stop the loop.
    Terminate,
}

impl fmt::Display for ModuleResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Continue => write!(f, "Continue"),
            Self::Filter => write!(f, "Filter"),
            Self::Terminate => write!(f, "Terminate"),
        }
    }
}

/// Which way a main loop walks its source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Direction {
    #[default]
    Forward,
    Reverse,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Forward => write!(f, "forward"),
            Self::Reverse => write!(f, "reverse"),
        }
    }
}

/// A pipeline stage inspecting or extending one bag at a time.
pub trait Module: Service {
    fn process(&mut self, bag: &mut Bag) -> Result<ModuleResult, NestError>;
}

/// Supplies successive bags.
pub trait Source: Service {
    /// The next bag, or `None` when the stream is exhausted.
    fn next(&mut self) -> Result<Option<Bag>, NestError>;

    /// The previous bag. Sources that cannot walk backwards keep this default,
    /// which reads as an exhausted stream.
    fn previous(&mut self) -> Result<Option<Bag>, NestError> {
        Ok(None)
    }

    /// `next()` or `previous()` depending on `direction`.
    fn fetch(&mut self, direction: Direction) -> Result<Option<Bag>, NestError> {
        match direction {
            Direction::Forward => self.next(),
            Direction::Reverse => self.previous(),
        }
    }
}

/// Picks a downstream branch for a bag. Fork numbers start at 1.
pub trait SignpostModule: Service {
    fn direction(&mut self, bag: &Bag) -> Result<usize, NestError>;
}

/// Drives a source through module chains until a stop condition.
pub trait MainLoop: Service {
    fn execute(&mut self, direction: Direction) -> Result<(), crate::PipelineError>;

    /// Result of the last module invoked by the most recent `execute`.
    fn last_result(&self) -> Option<ModuleResult>;

    fn stats(&self) -> crate::LoopStats;
}

pub type SharedModule = Shared<dyn Module>;
pub type SharedSource = Shared<dyn Source>;
pub type SharedSignpost = Shared<dyn SignpostModule>;
pub type SharedMainLoop = Shared<dyn MainLoop>;

/// A registry handle together with the instance name it was resolved under.
pub struct Named<T: ?Sized> {
    pub name: String,
    pub handle: Shared<T>,
}

impl<T: ?Sized> Named<T> {
    pub fn new(name: impl Into<String>, handle: Shared<T>) -> Self {
        Self {
            name: name.into(),
            handle,
        }
    }
}

impl<T: ?Sized> Clone for Named<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            handle: self.handle.clone(),
        }
    }
}

impl<T: ?Sized> fmt::Debug for Named<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Named").field(&self.name).finish()
    }
}
