//! # Aerie Pipeline Benchmarks
//!
//! Hot paths of an analysis run:
//! - Bag put/get with type checking
//! - Parameter lookup and text decoding
//! - Sequential loop throughput through a nest
//!
//! ## Usage
//!
//! ```bash
//! cargo bench --package aerie-tests --bench pipeline_benchmarks
//! cargo bench --package aerie-tests --bench pipeline_benchmarks -- loop/
//! ```

use aerie_pipeline::Direction;
use aerie_runtime::Nest;
use aerie_tests::fixtures::{ScriptedModule, Trace, VecSource};
use aerie_types::{Bag, Configuration, ParamKind};
use criterion::{black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput};
use rand::Rng;

fn bench_bag(c: &mut Criterion) {
    let mut group = c.benchmark_group("bag");

    for members in [8_usize, 64, 512] {
        let keys: Vec<String> = (0..members).map(|i| format!("hit_{i}")).collect();
        group.throughput(Throughput::Elements(members as u64));

        group.bench_with_input(BenchmarkId::new("put", members), &keys, |b, keys| {
            b.iter(|| {
                let mut bag = Bag::new();
                for (i, key) in keys.iter().enumerate() {
                    bag.put(key.as_str(), i as f64).unwrap();
                }
                black_box(bag)
            })
        });

        let mut bag = Bag::new();
        for (i, key) in keys.iter().enumerate() {
            bag.put(key.as_str(), i as f64).unwrap();
        }
        let mut rng = rand::thread_rng();
        let lookups: Vec<&str> = (0..1024)
            .map(|_| keys[rng.gen_range(0..keys.len())].as_str())
            .collect();

        group.bench_with_input(BenchmarkId::new("get", members), &lookups, |b, lookups| {
            b.iter(|| {
                let mut sum = 0.0;
                for key in lookups {
                    sum += *bag.get::<f64>(key).unwrap();
                }
                black_box(sum)
            })
        });
    }

    group.finish();
}

fn bench_configuration(c: &mut Criterion) {
    let mut group = c.benchmark_group("configuration");

    let mut config = Configuration::new();
    for i in 0..32 {
        config.parameter_default(&format!("cut_{i}"), f64::from(i)).unwrap();
    }
    group.bench_function("get_parameter", |b| {
        b.iter(|| black_box(config.get_parameter::<f64>(black_box("cut_17")).unwrap()))
    });

    let bins = (0..64).map(|i| i.to_string()).collect::<Vec<_>>().join(", ");
    let text = format!("[{bins}]");
    group.bench_function("decode_vector", |b| {
        b.iter(|| black_box(ParamKind::VecI.decode(black_box(&text))))
    });

    group.finish();
}

fn assemble(bags: u64, prescale: i32) -> Nest {
    let (source, _) = VecSource::indexed(bags).unwrap();
    let mut nest = Nest::new();
    nest.add_source_instance("source", source).unwrap();
    nest.add_module_instance("tag", ScriptedModule::new("tag", Trace::new()))
        .unwrap();
    nest.add_service("PrescaleModule", "prescale")
        .unwrap()
        .set("prescale", prescale)
        .unwrap();
    nest.add_service("SequentialMainLoop", "main")
        .unwrap()
        .set("source", "source")
        .unwrap()
        .set("modulechain", vec!["tag".to_string(), "prescale".to_string()])
        .unwrap()
        .set("updateFrequency", 0)
        .unwrap();
    nest.configure().unwrap();
    nest
}

fn bench_loop(c: &mut Criterion) {
    let mut group = c.benchmark_group("loop");

    for bags in [100_u64, 1_000, 10_000] {
        group.throughput(Throughput::Elements(bags));
        group.bench_with_input(BenchmarkId::new("sequential", bags), &bags, |b, &bags| {
            b.iter_batched(
                || assemble(bags, 10),
                |mut nest| {
                    let stats = nest.execute_main_loop("main", Direction::Forward).unwrap();
                    assert_eq!(stats.fetched, bags);
                    black_box(stats)
                },
                BatchSize::LargeInput,
            )
        });
    }

    group.finish();
}

criterion_group!(benches, bench_bag, bench_configuration, bench_loop);
criterion_main!(benches);
