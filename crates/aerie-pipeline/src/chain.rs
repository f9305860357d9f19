//! # Module Chain
//!
//! An ordered list of resolved modules and the rules for pushing one bag
//! through it:
//!
//! | Result | Effect |
//! |--------|--------|
//! | `Continue` | next module |
//! | `Filter` | stop this bag, caller fetches the next one |
//! | `Terminate` | stop this bag, caller stops its loop |
//!
//! Any error stops the chain immediately and is reported as
//! [`PipelineError::ModuleFailed`].

use aerie_telemetry::{HistogramTimer, MODULE_ERRORS};
use aerie_types::{Bag, NestError, ServiceContext};
use tracing::{debug, error, info, trace};

use crate::errors::PipelineError;
use crate::traits::{Module, ModuleResult, Named, SharedModule};

/// How far a bag got through a chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainOutcome {
    /// Every module returned `Continue` (or the chain is empty).
    Completed,
    /// `module` returned `Filter`.
    Filtered { module: String },
    /// `module` returned `Terminate`.
    Terminated { module: String },
}

impl ChainOutcome {
    /// The result of the last module that ran.
    pub fn result(&self) -> ModuleResult {
        match self {
            Self::Completed => ModuleResult::Continue,
            Self::Filtered { .. } => ModuleResult::Filter,
            Self::Terminated { .. } => ModuleResult::Terminate,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }

    pub fn is_terminated(&self) -> bool {
        matches!(self, Self::Terminated { .. })
    }
}

/// Ordered, named modules applied to one bag at a time.
#[derive(Debug, Clone, Default)]
pub struct ModuleChain {
    label: String,
    modules: Vec<Named<dyn Module>>,
}

impl ModuleChain {
    /// Create an empty chain. `label` appears in logs (e.g. `modulechain`).
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            modules: Vec::new(),
        }
    }

    /// Resolve `names` as modules through `ctx`, in order.
    ///
    /// A chain may not contain the component being initialized.
    pub fn resolve(
        label: impl Into<String>,
        names: &[String],
        ctx: &ServiceContext<'_>,
    ) -> Result<Self, NestError> {
        let label = label.into();
        let mut chain = Self::new(label.clone());
        for (name, handle) in ctx.resolve_all::<dyn Module>(names)? {
            if ctx.is_self(&handle) {
                return Err(NestError::component(
                    ctx.name(),
                    format!("{label} cannot contain '{name}' itself"),
                ));
            }
            chain.push(name, handle);
        }
        debug!(chain = %chain.label, modules = ?chain.names(), "module chain resolved");
        Ok(chain)
    }

    pub fn push(&mut self, name: impl Into<String>, module: SharedModule) {
        self.modules.push(Named::new(name, module));
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn names(&self) -> Vec<&str> {
        self.modules.iter().map(|m| m.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Push `bag` through the chain. `bag_index` is only used for logs and errors.
    pub fn run(&self, bag: &mut Bag, bag_index: u64) -> Result<ChainOutcome, PipelineError> {
        for module in &self.modules {
            trace!(module = %module.name, bag = bag_index, "processing module");

            let result = {
                let _timer = HistogramTimer::module(&module.name);
                module.handle.lock().process(bag)
            };

            match result {
                Ok(ModuleResult::Continue) => {}
                Ok(ModuleResult::Filter) => {
                    debug!(module = %module.name, bag = bag_index, "bag filtered");
                    return Ok(ChainOutcome::Filtered {
                        module: module.name.clone(),
                    });
                }
                Ok(ModuleResult::Terminate) => {
                    info!(module = %module.name, bag = bag_index, "module requested termination");
                    return Ok(ChainOutcome::Terminated {
                        module: module.name.clone(),
                    });
                }
                Err(err) => {
                    MODULE_ERRORS.with_label_values(&[module.name.as_str()]).inc();
                    error!(module = %module.name, bag = bag_index, error = %err, "module failed");
                    return Err(PipelineError::ModuleFailed {
                        module: module.name.clone(),
                        bag: bag_index,
                        error: err,
                    });
                }
            }
        }
        Ok(ChainOutcome::Completed)
    }
}
