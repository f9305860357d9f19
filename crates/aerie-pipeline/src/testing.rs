//! Test doubles shared by the unit tests of this crate.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use aerie_types::{shared, Bag, Configuration, NestError, Service, ServiceContext, ServiceRegistry};
use parking_lot::Mutex;

use crate::builtins::{CountingSource, EventIndex, EVENT_INDEX_KEY};
use crate::traits::{Module, ModuleResult, SharedModule, SharedSource, Source};

#[derive(Debug, Clone, Default)]
pub struct Counter(Arc<AtomicU64>);

impl Counter {
    pub fn get(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }

    pub fn inc(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

/// Records every bag it sees and marks it with its own key.
#[derive(Debug, Clone)]
pub struct Recorder {
    key: String,
    indices: Arc<Mutex<Vec<u64>>>,
}

impl Recorder {
    pub fn new(key: &str) -> Self {
        Self {
            key: key.to_string(),
            indices: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn seen(&self) -> usize {
        self.indices.lock().len()
    }

    pub fn seen_indices(&self) -> Vec<u64> {
        self.indices.lock().clone()
    }
}

impl Service for Recorder {
    fn initialize(&mut self, _config: &Configuration, _ctx: &ServiceContext<'_>) -> Result<(), NestError> {
        Ok(())
    }
}

impl Module for Recorder {
    fn process(&mut self, bag: &mut Bag) -> Result<ModuleResult, NestError> {
        let index = bag
            .get_shared::<EventIndex>(EVENT_INDEX_KEY)
            .map_or(u64::MAX, |i| i.0);
        self.indices.lock().push(index);
        bag.put(self.key.clone(), index)?;
        Ok(ModuleResult::Continue)
    }
}

/// Returns `Continue` except on scripted calls.
#[derive(Debug)]
pub struct Scripted {
    on_call: Option<u64>,
    result: ModuleResult,
    fail: bool,
    mark: Option<String>,
    calls: Counter,
}

impl Scripted {
    pub fn always(result: ModuleResult) -> Self {
        Self {
            on_call: None,
            result,
            fail: false,
            mark: None,
            calls: Counter::default(),
        }
    }

    /// `result` on the `call`-th invocation (1-based), `Continue` otherwise.
    pub fn on_call(call: u64, result: ModuleResult) -> Self {
        Self {
            on_call: Some(call),
            ..Self::always(result)
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::always(ModuleResult::Continue)
        }
    }

    pub fn failing_on(call: u64) -> Self {
        Self {
            on_call: Some(call),
            ..Self::failing()
        }
    }

    /// Put `key` into every bag that reaches this module.
    pub fn marking(mut self, key: &str) -> Self {
        self.mark = Some(key.to_string());
        self
    }

    pub fn calls(&self) -> Counter {
        self.calls.clone()
    }
}

impl Service for Scripted {
    fn initialize(&mut self, _config: &Configuration, _ctx: &ServiceContext<'_>) -> Result<(), NestError> {
        Ok(())
    }
}

impl Module for Scripted {
    fn process(&mut self, bag: &mut Bag) -> Result<ModuleResult, NestError> {
        self.calls.inc();
        if let Some(key) = &self.mark {
            bag.put(key.clone(), self.calls.get())?;
        }
        let triggered = self.on_call.map_or(true, |call| call == self.calls.get());
        match (triggered, self.fail) {
            (true, true) => Err(NestError::component("scripted", "scripted failure")),
            (true, false) => Ok(self.result),
            (false, _) => Ok(ModuleResult::Continue),
        }
    }
}

/// [`CountingSource`] that also counts the bags it handed out.
pub struct TrackedSource {
    inner: CountingSource,
    fetched: Counter,
}

impl TrackedSource {
    pub fn new(count: u64) -> (Self, Counter) {
        let fetched = Counter::default();
        (
            Self {
                inner: CountingSource::with_count(count),
                fetched: fetched.clone(),
            },
            fetched,
        )
    }

    fn track(&self, bag: Option<Bag>) -> Option<Bag> {
        if bag.is_some() {
            self.fetched.inc();
        }
        bag
    }
}

impl Service for TrackedSource {
    fn initialize(&mut self, _config: &Configuration, _ctx: &ServiceContext<'_>) -> Result<(), NestError> {
        Ok(())
    }
}

impl Source for TrackedSource {
    fn next(&mut self) -> Result<Option<Bag>, NestError> {
        let bag = self.inner.next()?;
        Ok(self.track(bag))
    }

    fn previous(&mut self) -> Result<Option<Bag>, NestError> {
        let bag = self.inner.previous()?;
        Ok(self.track(bag))
    }
}

/// Registry holding a source named `source` with `count` bags plus `modules`.
pub fn assemble(count: u64, modules: Vec<(&str, SharedModule)>) -> (ServiceRegistry, Counter) {
    let mut registry = ServiceRegistry::new();
    let (source, fetched) = TrackedSource::new(count);
    registry
        .register::<dyn Source>("source", shared(source) as SharedSource)
        .unwrap();
    for (name, module) in modules {
        registry.register::<dyn Module>(name, module).unwrap();
    }
    (registry, fetched)
}
