//! # While Loop
//!
//! A [`Module`] that runs an inner module chain over and over for one outer
//! bag. Each pass gets a fresh local bag; a [`LoopHooks`] implementation
//! decides what goes into it and when to stop:
//!
//! ```text
//! initialize_loop(outer)
//! while pre_loop(outer, local) {
//!     modulechain.run(local)
//!     post_loop(outer, local)
//! }
//! ```
//!
//! `Filter` from the inner chain ends the current pass only. `Terminate`
//! ends the pass, runs `post_loop`, and is returned as the result of the
//! `WhileLoop` itself.

use aerie_types::{Bag, Configuration, NestError, Service, ServiceContext};
use tracing::{debug, trace};

use crate::chain::ModuleChain;
use crate::traits::{Module, ModuleResult};

/// Customization points of a [`WhileLoop`].
pub trait LoopHooks: Send {
    /// Extra parameters, merged with the loop's own `modulechain`.
    fn default_configuration(&self) -> Result<Configuration, NestError> {
        Ok(Configuration::new())
    }

    fn initialize(&mut self, _config: &Configuration, _ctx: &ServiceContext<'_>) -> Result<(), NestError> {
        Ok(())
    }

    /// Called once per outer bag before the first pass.
    fn initialize_loop(&mut self, _outer: &Bag) -> Result<(), NestError> {
        Ok(())
    }

    /// Fill `local` for the next pass. Returning `false` ends the loop.
    fn pre_loop(&mut self, outer: &mut Bag, local: &mut Bag) -> Result<bool, NestError>;

    /// Called after every pass with the bag the inner chain worked on.
    fn post_loop(&mut self, _outer: &mut Bag, _local: Bag) -> Result<(), NestError> {
        Ok(())
    }
}

#[derive(Default)]
pub struct WhileLoop<H> {
    name: String,
    hooks: H,
    chain: ModuleChain,
}

impl<H: LoopHooks> WhileLoop<H> {
    pub fn with_hooks(hooks: H) -> Self {
        Self {
            name: String::new(),
            hooks,
            chain: ModuleChain::default(),
        }
    }

    pub fn hooks(&self) -> &H {
        &self.hooks
    }
}

impl<H: LoopHooks> Service for WhileLoop<H> {
    fn default_configuration(&self) -> Result<Configuration, NestError> {
        let mut config = self.hooks.default_configuration()?;
        config.parameter::<Vec<String>>("modulechain")?;
        Ok(config)
    }

    fn initialize(&mut self, config: &Configuration, ctx: &ServiceContext<'_>) -> Result<(), NestError> {
        self.name = ctx.name().to_string();
        let names: Vec<String> = config.get_parameter("modulechain")?;
        self.chain = ModuleChain::resolve("modulechain", &names, ctx)?;
        self.hooks.initialize(config, ctx)
    }
}

impl<H: LoopHooks> Module for WhileLoop<H> {
    fn process(&mut self, bag: &mut Bag) -> Result<ModuleResult, NestError> {
        self.hooks.initialize_loop(bag)?;

        let mut pass = 0_u64;
        loop {
            let mut local = Bag::new();
            if !self.hooks.pre_loop(bag, &mut local)? {
                break;
            }
            pass += 1;
            trace!("[{}] Pass {}", self.name, pass);

            let outcome = self.chain.run(&mut local, pass)?;
            self.hooks.post_loop(bag, local)?;

            if outcome.is_terminated() {
                debug!("[{}] Inner chain terminated on pass {}", self.name, pass);
                return Ok(ModuleResult::Terminate);
            }
        }
        Ok(ModuleResult::Continue)
    }
}

/// Bag key holding the 0-based pass number in every local bag.
pub const ITERATION_KEY: &str = "iteration";

/// Runs the inner chain `iterations` times per outer bag and copies each
/// local bag back into the outer one under `<prefix><pass>/`.
#[derive(Debug, Clone)]
pub struct FixedIterations {
    iterations: u64,
    prefix: String,
    done: u64,
}

impl Default for FixedIterations {
    fn default() -> Self {
        Self {
            iterations: 1,
            prefix: "pass".to_string(),
            done: 0,
        }
    }
}

impl LoopHooks for FixedIterations {
    fn default_configuration(&self) -> Result<Configuration, NestError> {
        let mut config = Configuration::new();
        config
            .parameter_default("iterations", 1)?
            .parameter_default("prefix", "pass")?;
        Ok(config)
    }

    fn initialize(&mut self, config: &Configuration, ctx: &ServiceContext<'_>) -> Result<(), NestError> {
        let iterations: i32 = config.get_parameter("iterations")?;
        self.iterations = u64::try_from(iterations).map_err(|_| {
            NestError::component(ctx.name(), format!("iterations must not be negative, got {iterations}"))
        })?;
        self.prefix = config.get_parameter("prefix")?;
        Ok(())
    }

    fn initialize_loop(&mut self, _outer: &Bag) -> Result<(), NestError> {
        self.done = 0;
        Ok(())
    }

    fn pre_loop(&mut self, _outer: &mut Bag, local: &mut Bag) -> Result<bool, NestError> {
        if self.done >= self.iterations {
            return Ok(false);
        }
        local.put(ITERATION_KEY, self.done)?;
        Ok(true)
    }

    fn post_loop(&mut self, outer: &mut Bag, local: Bag) -> Result<(), NestError> {
        outer.absorb(local, &format!("{}{}/", self.prefix, self.done))?;
        self.done += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Scripted;
    use crate::traits::SharedModule;
    use aerie_types::{shared, ServiceRegistry};

    fn build(registry: &ServiceRegistry, iterations: i32, chain: &[&str]) -> WhileLoop<FixedIterations> {
        let mut while_loop = WhileLoop::<FixedIterations>::default();
        let mut config = while_loop.default_configuration().unwrap();
        config.set_parameter("iterations", iterations).unwrap();
        config
            .set_parameter("modulechain", chain.iter().map(|s| s.to_string()).collect::<Vec<_>>())
            .unwrap();
        while_loop
            .initialize(&config, &ServiceContext::new(registry, "while"))
            .unwrap();
        while_loop
    }

    #[test]
    fn test_runs_fixed_passes() {
        let inner = Scripted::always(ModuleResult::Continue).marking("hit");
        let calls = inner.calls();
        let mut registry = ServiceRegistry::new();
        registry.register::<dyn Module>("inner", shared(inner) as SharedModule).unwrap();

        let mut while_loop = build(&registry, 3, &["inner"]);
        let mut outer = Bag::new();
        assert_eq!(while_loop.process(&mut outer).unwrap(), ModuleResult::Continue);

        assert_eq!(calls.get(), 3);
        assert_eq!(*outer.get::<u64>("pass0/iteration").unwrap(), 0);
        assert_eq!(*outer.get::<u64>("pass2/iteration").unwrap(), 2);
        assert_eq!(*outer.get::<u64>("pass1/hit").unwrap(), 2);
        assert_eq!(outer.len(), 6);
    }

    #[test]
    fn test_filter_ends_pass_only() {
        let inner = Scripted::on_call(1, ModuleResult::Filter);
        let after = Scripted::always(ModuleResult::Continue);
        let after_calls = after.calls();
        let mut registry = ServiceRegistry::new();
        registry.register::<dyn Module>("inner", shared(inner) as SharedModule).unwrap();
        registry.register::<dyn Module>("after", shared(after) as SharedModule).unwrap();

        let mut while_loop = build(&registry, 3, &["inner", "after"]);
        assert_eq!(while_loop.process(&mut Bag::new()).unwrap(), ModuleResult::Continue);
        assert_eq!(after_calls.get(), 2);
    }

    #[test]
    fn test_terminate_propagates() {
        let inner = Scripted::on_call(2, ModuleResult::Terminate);
        let calls = inner.calls();
        let mut registry = ServiceRegistry::new();
        registry.register::<dyn Module>("inner", shared(inner) as SharedModule).unwrap();

        let mut while_loop = build(&registry, 5, &["inner"]);
        let mut outer = Bag::new();
        assert_eq!(while_loop.process(&mut outer).unwrap(), ModuleResult::Terminate);
        assert_eq!(calls.get(), 2);
        assert!(outer.has("pass1/iteration"));
        assert!(!outer.has("pass2/iteration"));
    }

    #[test]
    fn test_zero_iterations() {
        let inner = Scripted::always(ModuleResult::Continue);
        let calls = inner.calls();
        let mut registry = ServiceRegistry::new();
        registry.register::<dyn Module>("inner", shared(inner) as SharedModule).unwrap();

        let mut while_loop = build(&registry, 0, &["inner"]);
        assert_eq!(while_loop.process(&mut Bag::new()).unwrap(), ModuleResult::Continue);
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn test_inner_error_propagates() {
        let mut registry = ServiceRegistry::new();
        registry
            .register::<dyn Module>("broken", shared(Scripted::failing()) as SharedModule)
            .unwrap();

        let mut while_loop = build(&registry, 2, &["broken"]);
        let err = while_loop.process(&mut Bag::new()).unwrap_err();
        assert!(err.to_string().contains("broken"));
    }

    #[test]
    fn test_hooks_cannot_shadow_modulechain() {
        struct Shadowing;
        impl LoopHooks for Shadowing {
            fn default_configuration(&self) -> Result<Configuration, NestError> {
                let mut config = Configuration::new();
                config.parameter::<Vec<String>>("modulechain")?;
                Ok(config)
            }
            fn pre_loop(&mut self, _outer: &mut Bag, _local: &mut Bag) -> Result<bool, NestError> {
                Ok(false)
            }
        }
        assert!(WhileLoop::with_hooks(Shadowing).default_configuration().is_err());
    }
}
