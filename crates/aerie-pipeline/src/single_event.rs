//! # Single Event Main Loop
//!
//! Fetches exactly one bag and runs it through `modulechain`. Handy for
//! inspecting one event interactively.

use aerie_types::{Configuration, NestError, Service, ServiceContext};

use crate::chain::ModuleChain;
use crate::driver::{drive, LoopSettings, LoopState};
use crate::errors::PipelineError;
use crate::stats::LoopStats;
use crate::traits::{Direction, MainLoop, ModuleResult, Named, Source};

#[derive(Default)]
pub struct SingleEventMainLoop {
    name: String,
    source: Option<Named<dyn Source>>,
    chain: ModuleChain,
    state: LoopState,
}

impl SingleEventMainLoop {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Service for SingleEventMainLoop {
    fn default_configuration(&self) -> Result<Configuration, NestError> {
        let mut config = Configuration::new();
        config
            .parameter::<String>("source")?
            .parameter::<Vec<String>>("modulechain")?;
        Ok(config)
    }

    fn initialize(&mut self, config: &Configuration, ctx: &ServiceContext<'_>) -> Result<(), NestError> {
        self.name = ctx.name().to_string();

        let source_name: String = config.get_parameter("source")?;
        let module_names: Vec<String> = config.get_parameter("modulechain")?;

        self.source = Some(Named::new(
            source_name.clone(),
            ctx.resolve::<dyn Source>(&source_name)?,
        ));
        self.chain = ModuleChain::resolve("modulechain", &module_names, ctx)?;
        Ok(())
    }
}

impl MainLoop for SingleEventMainLoop {
    fn execute(&mut self, direction: Direction) -> Result<(), PipelineError> {
        let source = self.source.as_ref().ok_or_else(|| PipelineError::NoSource {
            main_loop: self.name.clone(),
        })?;
        if self.chain.is_empty() {
            return Err(PipelineError::NoModules {
                main_loop: self.name.clone(),
                chain: self.chain.label().to_string(),
            });
        }

        let settings = LoopSettings {
            update_frequency: 0,
            termination_limit: Some(1),
        };
        let chain = &self.chain;
        drive(&self.name, source, direction, settings, &mut self.state, |bag, index| {
            chain.run(bag, index)
        })
    }

    fn last_result(&self) -> Option<ModuleResult> {
        self.state.last_result
    }

    fn stats(&self) -> LoopStats {
        self.state.stats
    }
}
