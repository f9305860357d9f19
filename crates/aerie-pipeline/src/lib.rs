//! # Aerie Pipeline
//!
//! The processing side of the framework: bags flow from a [`Source`]
//! through chains of [`Module`]s, driven by a [`MainLoop`].
//!
//! ## Main loops
//!
//! | Loop | Routing |
//! |------|---------|
//! | [`SequentialMainLoop`] | one chain, optional termination limit |
//! | [`SingleEventMainLoop`] | one chain, exactly one bag |
//! | [`TwoForkMainLoop`] | prefork, signpost-selected fork, postfork |
//!
//! Nested processing is available through [`WhileLoop`] (a module running
//! an inner chain repeatedly) and [`MultiSource`] (a source merging
//! several upstream sources).

pub mod builtins;
pub mod chain;
mod driver;
pub mod errors;
pub mod multi_source;
pub mod sequential;
pub mod single_event;
pub mod stats;
pub mod traits;
pub mod two_fork;
pub mod while_loop;

#[cfg(test)]
mod testing;

pub use builtins::{BagDumpModule, CountingSource, EventIndex, IndexSignpost, PrescaleModule, EVENT_INDEX_KEY};
pub use chain::{ChainOutcome, ModuleChain};
pub use errors::PipelineError;
pub use multi_source::MultiSource;
pub use sequential::SequentialMainLoop;
pub use single_event::SingleEventMainLoop;
pub use stats::LoopStats;
pub use traits::{
    Direction, MainLoop, Module, ModuleResult, Named, SharedMainLoop, SharedModule, SharedSignpost,
    SharedSource, SignpostModule, Source,
};
pub use two_fork::TwoForkMainLoop;
pub use while_loop::{FixedIterations, LoopHooks, WhileLoop, ITERATION_KEY};
