//! # Sequential Main Loop
//!
//! The standard loop: one source, one module chain.
//!
//! ## Parameters
//!
//! | Name | Type | Default |
//! |------|------|---------|
//! | `source` | string | required |
//! | `modulechain` | vector<string> | required |
//! | `updateFrequency` | int | 10000 |
//! | `terminationLimit` | int | -1 (unbounded) |

use aerie_types::{Configuration, NestError, Service, ServiceContext};

use crate::chain::ModuleChain;
use crate::driver::{drive, LoopSettings, LoopState};
use crate::errors::PipelineError;
use crate::stats::LoopStats;
use crate::traits::{Direction, MainLoop, ModuleResult, Named, Source};

#[derive(Default)]
pub struct SequentialMainLoop {
    name: String,
    source: Option<Named<dyn Source>>,
    chain: ModuleChain,
    settings: LoopSettings,
    state: LoopState,
}

impl SequentialMainLoop {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Service for SequentialMainLoop {
    fn default_configuration(&self) -> Result<Configuration, NestError> {
        let mut config = Configuration::new();
        config
            .parameter::<String>("source")?
            .parameter::<Vec<String>>("modulechain")?;
        LoopSettings::declare(&mut config)?;
        Ok(config)
    }

    fn initialize(&mut self, config: &Configuration, ctx: &ServiceContext<'_>) -> Result<(), NestError> {
        self.name = ctx.name().to_string();

        let source_name: String = config.get_parameter("source")?;
        let module_names: Vec<String> = config.get_parameter("modulechain")?;
        self.settings = LoopSettings::from_config(config)?;

        self.source = Some(Named::new(
            source_name.clone(),
            ctx.resolve::<dyn Source>(&source_name)?,
        ));
        self.chain = ModuleChain::resolve("modulechain", &module_names, ctx)?;
        if self.chain.is_empty() {
            return Err(PipelineError::NoModules {
                main_loop: self.name.clone(),
                chain: "modulechain".to_string(),
            }
            .into());
        }
        Ok(())
    }
}

impl MainLoop for SequentialMainLoop {
    fn execute(&mut self, direction: Direction) -> Result<(), PipelineError> {
        let source = self.source.as_ref().ok_or_else(|| PipelineError::NoSource {
            main_loop: self.name.clone(),
        })?;
        let chain = &self.chain;
        drive(
            &self.name,
            source,
            direction,
            self.settings,
            &mut self.state,
            |bag, index| chain.run(bag, index),
        )
    }

    fn last_result(&self) -> Option<ModuleResult> {
        self.state.last_result
    }

    fn stats(&self) -> LoopStats {
        self.state.stats
    }
}
