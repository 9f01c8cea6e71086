use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use criterion::{criterion_group, criterion_main, Criterion};
use logicmap::{LogicEngine, Snapshot, WorldBuilder, has};

fn build_shared_engine() -> (Arc<LogicEngine>, Snapshot) {
    let n = 20;
    let mut builder = WorldBuilder::new().start("R0");
    let mut snapshot = Snapshot::new();

    for i in 0..n {
        let key = format!("Key{i}");
        let next = format!("R{}", i + 1);
        builder = builder.region(&format!("R{i}"), |r| {
            r.exit(&format!("Door {i}"), &next, Some(has(key.as_str())))
                .location_when(&format!("Chest {i}"), &format!(r#"has("{key}")"#))
        });
        snapshot = snapshot.with_item(&key, 1);
    }
    builder = builder.region(&format!("R{n}"), |r| r);

    (Arc::new(LogicEngine::new(builder.compile().unwrap())), snapshot)
}

fn bench_throughput(c: &mut Criterion) {
    let thread_counts = [1, 2, 4, 8];

    let mut group = c.benchmark_group("throughput");
    group.measurement_time(Duration::from_secs(5));

    for &threads in &thread_counts {
        let (engine, snapshot) = build_shared_engine();

        group.bench_function(format!("{threads}_threads"), |b| {
            b.iter_custom(|iters| {
                let per_thread = iters / threads as u64;
                let handles: Vec<_> = (0..threads)
                    .map(|_| {
                        let engine = Arc::clone(&engine);
                        let snapshot = snapshot.clone();
                        thread::spawn(move || {
                            let start = Instant::now();
                            for _ in 0..per_thread {
                                let _ = engine.reachability(&snapshot);
                            }
                            start.elapsed()
                        })
                    })
                    .collect();

                let mut max_elapsed = Duration::ZERO;
                for h in handles {
                    let elapsed = h.join().unwrap();
                    if elapsed > max_elapsed {
                        max_elapsed = elapsed;
                    }
                }
                max_elapsed
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_throughput);
criterion_main!(benches);
