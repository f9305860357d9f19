//! Scriptable components for scenarios and benchmarks.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use aerie_pipeline::{EventIndex, Module, ModuleResult, Source, EVENT_INDEX_KEY};
use aerie_types::{Bag, Configuration, NestError, Service, ServiceContext};
use parking_lot::Mutex;

/// What a [`ScriptedModule`] saw, shared with the test after the module
/// moved into a nest.
#[derive(Debug, Clone, Default)]
pub struct Trace {
    seen: Arc<Mutex<Vec<u64>>>,
}

impl Trace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Indices of the bags the module processed, in order.
    pub fn seen(&self) -> Vec<u64> {
        self.seen.lock().clone()
    }

    fn record(&self, index: u64) {
        self.seen.lock().push(index);
    }
}

/// Returns scripted results keyed by 1-based call number, `Continue` otherwise.
/// Marks every bag it touches with `<name>` so later state can be inspected.
pub struct ScriptedModule {
    name: String,
    script: HashMap<u64, ModuleResult>,
    calls: u64,
    trace: Trace,
}

impl ScriptedModule {
    pub fn new(name: &str, trace: Trace) -> Self {
        Self {
            name: name.to_string(),
            script: HashMap::new(),
            calls: 0,
            trace,
        }
    }

    /// Return `result` on the `call`-th invocation.
    pub fn on_call(mut self, call: u64, result: ModuleResult) -> Self {
        self.script.insert(call, result);
        self
    }
}

impl Service for ScriptedModule {
    fn initialize(&mut self, _config: &Configuration, _ctx: &ServiceContext<'_>) -> Result<(), NestError> {
        self.calls = 0;
        Ok(())
    }
}

impl Module for ScriptedModule {
    fn process(&mut self, bag: &mut Bag) -> Result<ModuleResult, NestError> {
        self.calls += 1;
        let EventIndex(index) = *bag.get::<EventIndex>(EVENT_INDEX_KEY)?;
        self.trace.record(index);
        bag.put(self.name.clone(), self.calls)?;
        Ok(self.script.get(&self.calls).copied().unwrap_or(ModuleResult::Continue))
    }
}

/// Yields prepared bags in order and counts how many were handed out.
pub struct VecSource {
    bags: VecDeque<Bag>,
    fetched: Arc<Mutex<u64>>,
}

impl VecSource {
    /// `count` bags, each holding its [`EventIndex`] and an `energy` value.
    pub fn indexed(count: u64) -> Result<(Self, Arc<Mutex<u64>>), NestError> {
        let bags = (0..count)
            .map(|i| -> Result<Bag, NestError> {
                let mut bag = Bag::new();
                bag.put(EVENT_INDEX_KEY, EventIndex(i))?;
                bag.put("energy", i as f64)?;
                Ok(bag)
            })
            .collect::<Result<VecDeque<Bag>, NestError>>()?;
        let fetched = Arc::new(Mutex::new(0));
        Ok((
            Self {
                bags,
                fetched: Arc::clone(&fetched),
            },
            fetched,
        ))
    }
}

impl Service for VecSource {
    fn initialize(&mut self, _config: &Configuration, _ctx: &ServiceContext<'_>) -> Result<(), NestError> {
        Ok(())
    }
}

impl Source for VecSource {
    fn next(&mut self) -> Result<Option<Bag>, NestError> {
        let bag = self.bags.pop_front();
        if bag.is_some() {
            *self.fetched.lock() += 1;
        }
        Ok(bag)
    }
}
