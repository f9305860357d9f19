//! # Built-in Components
//!
//! Small, generally useful units shipped with the framework:
//!
//! - [`CountingSource`]: emits `count` bags holding an [`EventIndex`]
//! - [`PrescaleModule`]: keeps one bag out of every `prescale`
//! - [`BagDumpModule`]: logs the bag contents
//! - [`IndexSignpost`]: routes even indices to fork 1 and odd ones to fork 2

use aerie_types::{Bag, Configuration, NestError, Service, ServiceContext};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::traits::{Module, ModuleResult, SignpostModule, Source};

/// Bag key under which [`CountingSource`] stores the [`EventIndex`].
pub const EVENT_INDEX_KEY: &str = "index";

/// Position of a bag in its source stream, starting at 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EventIndex(pub u64);

/// Emits `count` bags. Forward iteration counts up from 0; reverse iteration
/// counts down from `count - 1`.
#[derive(Debug, Default)]
pub struct CountingSource {
    count: u64,
    forward: u64,
    reverse: u64,
}

impl CountingSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_count(count: u64) -> Self {
        Self {
            count,
            forward: 0,
            reverse: count,
        }
    }

    fn emit(index: u64) -> Result<Bag, NestError> {
        let mut bag = Bag::new();
        bag.put(EVENT_INDEX_KEY, EventIndex(index))?;
        Ok(bag)
    }
}

impl Service for CountingSource {
    fn default_configuration(&self) -> Result<Configuration, NestError> {
        let mut config = Configuration::new();
        config.parameter_default("count", 10)?;
        Ok(config)
    }

    fn initialize(&mut self, config: &Configuration, ctx: &ServiceContext<'_>) -> Result<(), NestError> {
        let count: i32 = config.get_parameter("count")?;
        let count = u64::try_from(count)
            .map_err(|_| NestError::component(ctx.name(), format!("count must not be negative, got {count}")))?;
        *self = Self::with_count(count);
        Ok(())
    }
}

impl Source for CountingSource {
    fn next(&mut self) -> Result<Option<Bag>, NestError> {
        if self.forward >= self.count {
            return Ok(None);
        }
        let bag = Self::emit(self.forward)?;
        self.forward += 1;
        Ok(Some(bag))
    }

    fn previous(&mut self) -> Result<Option<Bag>, NestError> {
        if self.reverse == 0 {
            return Ok(None);
        }
        self.reverse -= 1;
        Self::emit(self.reverse).map(Some)
    }
}

/// Passes the first bag and then one out of every `prescale`; filters the rest.
#[derive(Debug)]
pub struct PrescaleModule {
    prescale: u64,
    seen: u64,
}

impl Default for PrescaleModule {
    fn default() -> Self {
        Self {
            prescale: 1,
            seen: 0,
        }
    }
}

impl PrescaleModule {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Service for PrescaleModule {
    fn default_configuration(&self) -> Result<Configuration, NestError> {
        let mut config = Configuration::new();
        config.parameter_default("prescale", 1)?;
        Ok(config)
    }

    fn initialize(&mut self, config: &Configuration, ctx: &ServiceContext<'_>) -> Result<(), NestError> {
        let prescale: i32 = config.get_parameter("prescale")?;
        self.prescale = u64::try_from(prescale)
            .ok()
            .filter(|&p| p > 0)
            .ok_or_else(|| NestError::component(ctx.name(), format!("prescale must be positive, got {prescale}")))?;
        self.seen = 0;
        Ok(())
    }
}

impl Module for PrescaleModule {
    fn process(&mut self, _bag: &mut Bag) -> Result<ModuleResult, NestError> {
        let position = self.seen;
        self.seen += 1;
        if position % self.prescale == 0 {
            Ok(ModuleResult::Continue)
        } else {
            Ok(ModuleResult::Filter)
        }
    }
}

/// Logs every bag it sees at debug level; at info level when `verbose` is set.
#[derive(Debug, Default)]
pub struct BagDumpModule {
    name: String,
    verbose: bool,
    dumped: u64,
}

impl BagDumpModule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dumped(&self) -> u64 {
        self.dumped
    }
}

impl Service for BagDumpModule {
    fn default_configuration(&self) -> Result<Configuration, NestError> {
        let mut config = Configuration::new();
        config.parameter_default("verbose", false)?;
        Ok(config)
    }

    fn initialize(&mut self, config: &Configuration, ctx: &ServiceContext<'_>) -> Result<(), NestError> {
        self.name = ctx.name().to_string();
        self.verbose = config.get_parameter("verbose")?;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), NestError> {
        info!("[{}] Dumped {} bags", self.name, self.dumped);
        Ok(())
    }
}

impl Module for BagDumpModule {
    fn process(&mut self, bag: &mut Bag) -> Result<ModuleResult, NestError> {
        self.dumped += 1;
        if self.verbose {
            info!("[{}] {}", self.name, bag);
        } else {
            debug!("[{}] {}", self.name, bag);
        }
        Ok(ModuleResult::Continue)
    }
}

/// Fork 1 for even [`EventIndex`] values, fork 2 for odd ones.
#[derive(Debug, Default)]
pub struct IndexSignpost;

impl Service for IndexSignpost {
    fn initialize(&mut self, _config: &Configuration, _ctx: &ServiceContext<'_>) -> Result<(), NestError> {
        Ok(())
    }
}

impl SignpostModule for IndexSignpost {
    fn direction(&mut self, bag: &Bag) -> Result<usize, NestError> {
        let EventIndex(index) = *bag.get::<EventIndex>(EVENT_INDEX_KEY)?;
        Ok(if index % 2 == 0 { 1 } else { 2 })
    }
}
