use async_commander::{
    Command, DispatchMode, Dispatcher, DispatcherConfig, FnCommand, MacroCommand,
};
use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

fn counting_command(counter: &Arc<AtomicU64>) -> Arc<dyn Command> {
    let (up, down) = (counter.clone(), counter.clone());
    Arc::new(FnCommand::new(
        "Count",
        move || {
            up.fetch_add(1, Ordering::Relaxed);
            Ok(())
        },
        move || {
            down.fetch_sub(1, Ordering::Relaxed);
            Ok(())
        },
    ))
}

fn build_macro(mode: DispatchMode, children: usize, dispatcher: &Dispatcher) -> MacroCommand {
    let counter = Arc::new(AtomicU64::new(0));
    let mac = MacroCommand::with_modes(mode, mode).with_dispatcher(dispatcher.clone());
    for _ in 0..children {
        mac.add_command(counting_command(&counter));
    }
    mac
}

/// Benchmark synchronous fan-out (pure call overhead)
fn bench_sync_fan_out(c: &mut Criterion) {
    let mut group = c.benchmark_group("sync_fan_out");
    let dispatcher = Dispatcher::default();

    for children in [1, 16, 256] {
        let mac = build_macro(DispatchMode::Synchronous, children, &dispatcher);
        group.bench_with_input(BenchmarkId::from_parameter(children), &children, |b, _| {
            b.iter(|| black_box(mac.execute()));
        });
    }
    group.finish();
}

/// Benchmark asynchronous fan-out, including waiting for the workers
fn bench_async_fan_out(c: &mut Criterion) {
    let mut group = c.benchmark_group("async_fan_out");
    let dispatcher = Dispatcher::new(DispatcherConfig::default().with_thread_name_prefix("bench"))
        .expect("default bench config is valid");

    for children in [1, 16, 256] {
        let mac = build_macro(DispatchMode::Asynchronous, children, &dispatcher);
        group.bench_with_input(BenchmarkId::from_parameter(children), &children, |b, _| {
            b.iter(|| {
                black_box(mac.execute()).ok();
                dispatcher.drain();
            });
        });
    }
    group.finish();
    dispatcher.shutdown();
}

/// Benchmark the round trip of a single dispatch request
fn bench_submit(c: &mut Criterion) {
    let dispatcher = Dispatcher::default();
    let counter = Arc::new(AtomicU64::new(0));
    let command = counting_command(&counter);

    c.bench_function("submit_and_drain", |b| {
        b.iter(|| {
            command.clone().execute_on(&dispatcher);
            dispatcher.drain();
        });
    });
}

criterion_group!(benches, bench_sync_fan_out, bench_async_fan_out, bench_submit);
criterion_main!(benches);
