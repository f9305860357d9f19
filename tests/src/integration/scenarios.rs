//! # Loop Scenarios
//!
//! The control-flow contract observed from outside:
//!
//! 1. `Filter` drops one bag, the loop keeps fetching
//! 2. `Terminate` stops fetching altogether
//! 3. `terminationLimit` bounds the number of fetched bags
//! 4. Reverse runs over a forward-only source see an exhausted stream
//! 5. Configuration errors name the failing service

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use aerie_pipeline::{Direction, ModuleResult};
    use aerie_runtime::{Nest, RuntimeError};
    use aerie_types::Bag;
    use parking_lot::Mutex;

    use crate::fixtures::{ScriptedModule, Trace, VecSource};

    // =========================================================================
    // FIXTURES
    // =========================================================================

    struct Run {
        nest: Nest,
        fetched: Arc<Mutex<u64>>,
    }

    /// `available` bags through modules `a` and `b`, driven by a sequential loop.
    fn assemble(available: u64, a: ScriptedModule, b: ScriptedModule) -> Run {
        aerie_telemetry::init_test_logging();
        let (source, fetched) = VecSource::indexed(available).unwrap();

        let mut nest = Nest::new();
        nest.add_source_instance("source", source).unwrap();
        nest.add_module_instance("A", a).unwrap();
        nest.add_module_instance("B", b).unwrap();
        nest.add_service("SequentialMainLoop", "main")
            .unwrap()
            .set("source", "source")
            .unwrap()
            .set("modulechain", vec!["A".to_string(), "B".to_string()])
            .unwrap();
        Run { nest, fetched }
    }

    // =========================================================================
    // FILTER / TERMINATE / LIMIT
    // =========================================================================

    #[test]
    fn test_filter_on_second_of_three() {
        let trace_a = Trace::new();
        let trace_b = Trace::new();
        let mut run = assemble(
            3,
            ScriptedModule::new("A", trace_a.clone()),
            ScriptedModule::new("B", trace_b.clone()).on_call(2, ModuleResult::Filter),
        );

        run.nest.configure().unwrap();
        let stats = run.nest.execute_main_loop("main", Direction::Forward).unwrap();

        assert_eq!(*run.fetched.lock(), 3);
        assert_eq!(stats.fetched, 3);
        assert_eq!(stats.completed, 2);
        assert_eq!(stats.filtered, 1);
        assert_eq!(trace_a.seen(), vec![0, 1, 2]);
        assert_eq!(trace_b.seen(), vec![0, 1, 2]);
    }

    #[test]
    fn test_filter_skips_later_modules() {
        let trace_b = Trace::new();
        let mut run = assemble(
            3,
            ScriptedModule::new("A", Trace::new()).on_call(2, ModuleResult::Filter),
            ScriptedModule::new("B", trace_b.clone()),
        );

        run.nest.configure().unwrap();
        run.nest.execute_main_loop("main", Direction::Forward).unwrap();

        assert_eq!(trace_b.seen(), vec![0, 2]);
    }

    #[test]
    fn test_terminate_on_second_of_five() {
        let trace_a = Trace::new();
        let trace_b = Trace::new();
        let mut run = assemble(
            5,
            ScriptedModule::new("A", trace_a.clone()).on_call(2, ModuleResult::Terminate),
            ScriptedModule::new("B", trace_b.clone()),
        );

        run.nest.configure().unwrap();
        let stats = run.nest.execute_main_loop("main", Direction::Forward).unwrap();

        assert_eq!(*run.fetched.lock(), 2);
        assert_eq!(trace_a.seen(), vec![0, 1]);
        assert_eq!(trace_b.seen(), vec![0]);
        assert!(stats.terminated);

        let main = run
            .nest
            .resolve::<dyn aerie_pipeline::MainLoop>("main")
            .unwrap();
        assert_eq!(main.lock().last_result(), Some(ModuleResult::Terminate));
    }

    #[test]
    fn test_termination_limit_of_two() {
        let trace_a = Trace::new();
        let mut run = assemble(
            10,
            ScriptedModule::new("A", trace_a.clone()),
            ScriptedModule::new("B", Trace::new()),
        );
        run.nest.set_parameter("main", "terminationLimit", 2).unwrap();

        run.nest.configure().unwrap();
        let stats = run.nest.execute_main_loop("main", Direction::Forward).unwrap();

        assert_eq!(*run.fetched.lock(), 2);
        assert_eq!(stats.completed, 2);
        assert_eq!(trace_a.seen(), vec![0, 1]);
    }

    #[test]
    fn test_limit_from_environment_override() {
        let mut run = assemble(
            10,
            ScriptedModule::new("A", Trace::new()),
            ScriptedModule::new("B", Trace::new()),
        );
        run.nest
            .apply_overrides("AERIE_PARAM__", [("AERIE_PARAM__main__terminationLimit", "4")])
            .unwrap();

        run.nest.configure().unwrap();
        let stats = run.nest.execute_main_loop("main", Direction::Forward).unwrap();
        assert_eq!(stats.fetched, 4);
    }

    #[test]
    fn test_reverse_without_previous_is_exhausted() {
        let trace_a = Trace::new();
        let mut run = assemble(
            3,
            ScriptedModule::new("A", trace_a.clone()),
            ScriptedModule::new("B", Trace::new()),
        );

        run.nest.configure().unwrap();
        let stats = run.nest.execute_main_loop("main", Direction::Reverse).unwrap();

        assert_eq!(stats.fetched, 0);
        assert_eq!(*run.fetched.lock(), 0);
        assert!(trace_a.seen().is_empty());

        let main = run
            .nest
            .resolve::<dyn aerie_pipeline::MainLoop>("main")
            .unwrap();
        assert_eq!(main.lock().last_result(), None);
    }

    // =========================================================================
    // ERRORS
    // =========================================================================

    #[test]
    fn test_two_fork_routes_indexed_bags() {
        let trace_a = Trace::new();
        let (source, fetched) = VecSource::indexed(3).unwrap();
        let mut nest = Nest::new();
        nest.add_source_instance("source", source).unwrap();
        nest.add_service("IndexSignpost", "signpost").unwrap();
        nest.add_module_instance("A", ScriptedModule::new("A", trace_a.clone()))
            .unwrap();
        nest.add_service("TwoForkMainLoop", "fork")
            .unwrap()
            .set("source", "source")
            .unwrap()
            .set("signpost", "signpost")
            .unwrap()
            .set("fork1modulechain", vec!["A".to_string()])
            .unwrap()
            .set("fork2modulechain", Vec::<String>::new())
            .unwrap();
        nest.configure().unwrap();

        let stats = nest.execute_main_loop("fork", Direction::Forward).unwrap();
        assert_eq!(stats.completed, 3);
        assert_eq!(*fetched.lock(), 3);
        // even indices take fork 1
        assert_eq!(trace_a.seen(), vec![0, 2]);
    }

    #[test]
    fn test_unknown_main_loop() {
        let mut run = assemble(
            1,
            ScriptedModule::new("A", Trace::new()),
            ScriptedModule::new("B", Trace::new()),
        );
        run.nest.configure().unwrap();
        assert!(matches!(
            run.nest.execute_main_loop("ghost", Direction::Forward),
            Err(RuntimeError::Nest(_))
        ));
    }

    #[test]
    fn test_module_chain_naming_unknown_module() {
        let mut run = assemble(
            1,
            ScriptedModule::new("A", Trace::new()),
            ScriptedModule::new("B", Trace::new()),
        );
        run.nest
            .set_parameter("main", "modulechain", vec!["A".to_string(), "C".to_string()])
            .unwrap();

        let err = run.nest.configure().unwrap_err();
        assert!(err.to_string().contains("main"));
    }

    #[test]
    fn test_scripted_module_marks_bag() {
        let mut bag = Bag::new();
        let mut module = ScriptedModule::new("A", Trace::new());
        bag.put(aerie_pipeline::EVENT_INDEX_KEY, aerie_pipeline::EventIndex(7))
            .unwrap();
        assert_eq!(
            aerie_pipeline::Module::process(&mut module, &mut bag).unwrap(),
            ModuleResult::Continue
        );
        assert_eq!(*bag.get::<u64>("A").unwrap(), 1);
    }
}
