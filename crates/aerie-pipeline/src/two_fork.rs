//! # Two-Fork Main Loop
//!
//! Routes every bag through a prefork chain, then one of two fork chains
//! chosen by a signpost, then a postfork chain:
//!
//! ```text
//!                        ┌─▶ fork1modulechain ─┐
//! source ─▶ prefork ─▶ signpost                 ├─▶ postfork
//!                        └─▶ fork2modulechain ─┘
//! ```
//!
//! - `Filter` in any segment drops the bag: later segments are skipped.
//! - `Terminate` in any segment stops the whole loop.
//! - A signpost answer other than 1 or 2 is [`PipelineError::InvalidFork`].

use aerie_types::{Bag, Configuration, NestError, Service, ServiceContext};
use tracing::{error, trace};

use crate::chain::{ChainOutcome, ModuleChain};
use crate::driver::{drive, LoopSettings, LoopState};
use crate::errors::PipelineError;
use crate::stats::LoopStats;
use crate::traits::{Direction, MainLoop, ModuleResult, Named, SignpostModule, Source};

#[derive(Default)]
pub struct TwoForkMainLoop {
    name: String,
    source: Option<Named<dyn Source>>,
    signpost: Option<Named<dyn SignpostModule>>,
    prefork: ModuleChain,
    fork1: ModuleChain,
    fork2: ModuleChain,
    postfork: ModuleChain,
    settings: LoopSettings,
    state: LoopState,
}

impl TwoForkMainLoop {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Run one bag through the four segments.
fn route(
    signpost: &Named<dyn SignpostModule>,
    segments: [&ModuleChain; 4],
    bag: &mut Bag,
    index: u64,
) -> Result<ChainOutcome, PipelineError> {
    let [prefork, fork1, fork2, postfork] = segments;

    let outcome = prefork.run(bag, index)?;
    if !outcome.is_completed() {
        return Ok(outcome);
    }

    let fork = signpost
        .handle
        .lock()
        .direction(bag)
        .map_err(|err| {
            error!(signpost = %signpost.name, bag = index, error = %err, "signpost failed");
            PipelineError::SignpostFailed {
                signpost: signpost.name.clone(),
                bag: index,
                error: err,
            }
        })?;

    let chosen = match fork {
        1 => fork1,
        2 => fork2,
        other => {
            return Err(PipelineError::InvalidFork {
                signpost: signpost.name.clone(),
                bag: index,
                fork: other,
            })
        }
    };
    trace!(bag = index, fork, "bag goes down fork");

    let outcome = chosen.run(bag, index)?;
    if !outcome.is_completed() {
        return Ok(outcome);
    }
    postfork.run(bag, index)
}

impl Service for TwoForkMainLoop {
    fn default_configuration(&self) -> Result<Configuration, NestError> {
        let mut config = Configuration::new();
        config
            .parameter::<String>("source")?
            .parameter::<String>("signpost")?
            .parameter_default("preforkmodulechain", Vec::<String>::new())?
            .parameter::<Vec<String>>("fork1modulechain")?
            .parameter::<Vec<String>>("fork2modulechain")?
            .parameter_default("postforkmodulechain", Vec::<String>::new())?;
        LoopSettings::declare(&mut config)?;
        Ok(config)
    }

    fn initialize(&mut self, config: &Configuration, ctx: &ServiceContext<'_>) -> Result<(), NestError> {
        self.name = ctx.name().to_string();
        self.settings = LoopSettings::from_config(config)?;

        let source_name: String = config.get_parameter("source")?;
        self.source = Some(Named::new(
            source_name.clone(),
            ctx.resolve::<dyn Source>(&source_name)?,
        ));

        let signpost_name: String = config.get_parameter("signpost")?;
        self.signpost = Some(Named::new(
            signpost_name.clone(),
            ctx.resolve::<dyn SignpostModule>(&signpost_name)?,
        ));

        let chain = |label: &str| -> Result<ModuleChain, NestError> {
            ModuleChain::resolve(label, &config.get_parameter::<Vec<String>>(label)?, ctx)
        };
        self.prefork = chain("preforkmodulechain")?;
        self.fork1 = chain("fork1modulechain")?;
        self.fork2 = chain("fork2modulechain")?;
        self.postfork = chain("postforkmodulechain")?;
        Ok(())
    }
}

impl MainLoop for TwoForkMainLoop {
    fn execute(&mut self, direction: Direction) -> Result<(), PipelineError> {
        let source = self.source.as_ref().ok_or_else(|| PipelineError::NoSource {
            main_loop: self.name.clone(),
        })?;
        let signpost = self.signpost.as_ref().ok_or_else(|| {
            PipelineError::Configuration(format!("[{}] no signpost specified", self.name))
        })?;
        let segments = [&self.prefork, &self.fork1, &self.fork2, &self.postfork];

        drive(
            &self.name,
            source,
            direction,
            self.settings,
            &mut self.state,
            |bag, index| route(signpost, segments, bag, index),
        )
    }

    fn last_result(&self) -> Option<ModuleResult> {
        self.state.last_result
    }

    fn stats(&self) -> LoopStats {
        self.state.stats
    }
}
