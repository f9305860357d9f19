//! # Multi Source
//!
//! A [`Source`] merging several upstream sources into one stream. Each
//! output bag is assembled from one bag per entry of `sourcechain`:
//!
//! 1. fetch from every source, in order;
//! 2. run the local `modulechain` on each fetched bag;
//! 3. move every entry into the output bag as `<source>/<key>`.
//!
//! The stream ends as soon as any source is exhausted, or when the local
//! chain returns `Terminate`. A local `Filter` only stops the chain for that
//! bag; its entries are still merged.

use aerie_types::{Bag, Configuration, NestError, Service, ServiceContext};
use tracing::{debug, info};

use crate::chain::{ChainOutcome, ModuleChain};
use crate::traits::{Direction, Named, Source};

#[derive(Debug, Default)]
pub struct MultiSource {
    name: String,
    sources: Vec<Named<dyn Source>>,
    chain: ModuleChain,
    merged: u64,
    terminated: bool,
}

impl MultiSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Names of the merged sources, in fetch order.
    pub fn source_names(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.name.as_str()).collect()
    }

    fn pull(&mut self, direction: Direction) -> Result<Option<Bag>, NestError> {
        if self.terminated {
            return Ok(None);
        }

        let mut fetched = Vec::with_capacity(self.sources.len());
        for source in &self.sources {
            match source.handle.lock().fetch(direction)? {
                Some(bag) => fetched.push((source.name.as_str(), bag)),
                None => {
                    debug!("[{}] Source '{}' exhausted", self.name, source.name);
                    return Ok(None);
                }
            }
        }

        let index = self.merged + 1;
        let mut merged = Bag::new();
        for (source_name, mut bag) in fetched {
            if let ChainOutcome::Terminated { module } = self.chain.run(&mut bag, index)? {
                info!(
                    "[{}] Module '{}' terminated the stream after {} bags",
                    self.name, module, self.merged
                );
                self.terminated = true;
                return Ok(None);
            }
            merged.absorb(bag, &format!("{source_name}/"))?;
        }

        self.merged = index;
        Ok(Some(merged))
    }
}

impl Service for MultiSource {
    fn default_configuration(&self) -> Result<Configuration, NestError> {
        let mut config = Configuration::new();
        config
            .parameter::<Vec<String>>("sourcechain")?
            .parameter_default("modulechain", Vec::<String>::new())?;
        Ok(config)
    }

    fn initialize(&mut self, config: &Configuration, ctx: &ServiceContext<'_>) -> Result<(), NestError> {
        self.name = ctx.name().to_string();
        self.merged = 0;
        self.terminated = false;

        let source_names: Vec<String> = config.get_parameter("sourcechain")?;
        if source_names.is_empty() {
            return Err(NestError::component(ctx.name(), "sourcechain is empty"));
        }
        if let Some(repeated) = source_names
            .iter()
            .enumerate()
            .find_map(|(i, name)| source_names[..i].contains(name).then_some(name))
        {
            return Err(NestError::component(
                ctx.name(),
                format!("sourcechain lists '{repeated}' more than once"),
            ));
        }
        self.sources = Vec::with_capacity(source_names.len());
        for (name, handle) in ctx.resolve_all::<dyn Source>(&source_names)? {
            if ctx.is_self(&handle) {
                return Err(NestError::component(
                    ctx.name(),
                    format!("sourcechain cannot contain '{name}' itself"),
                ));
            }
            self.sources.push(Named::new(name, handle));
        }

        let module_names: Vec<String> = config.get_parameter("modulechain")?;
        self.chain = ModuleChain::resolve("modulechain", &module_names, ctx)?;
        Ok(())
    }
}

impl Source for MultiSource {
    fn next(&mut self) -> Result<Option<Bag>, NestError> {
        self.pull(Direction::Forward)
    }

    fn previous(&mut self) -> Result<Option<Bag>, NestError> {
        self.pull(Direction::Reverse)
    }
}
