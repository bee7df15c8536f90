// Quick demonstration of synchronous, asynchronous and nested macros
// Run with: cargo run --bin macro_demo
// More detail with: RUST_LOG=async_commander=debug cargo run --bin macro_demo

use async_commander::logging::{self, Profile};
use async_commander::{Command, CommandError, DispatchMode, FnCommand, MacroCommand, dispatch};
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

/// Leaf command that adds `amount` to a shared balance, slowly
fn deposit(balance: &Arc<AtomicI64>, amount: i64) -> Arc<dyn Command> {
    let (up, down) = (balance.clone(), balance.clone());
    Arc::new(FnCommand::new(
        format!("Deposit {}", amount),
        move || {
            std::thread::sleep(Duration::from_millis(50));
            up.fetch_add(amount, Ordering::SeqCst);
            Ok(())
        },
        move || {
            std::thread::sleep(Duration::from_millis(50));
            down.fetch_sub(amount, Ordering::SeqCst);
            Ok(())
        },
    ))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init(Profile::Development);

    println!("AsyncCommander - MacroCommand Demo");
    println!("==================================");

    let balance = Arc::new(AtomicI64::new(0));
    let failures = dispatch::global().subscribe_failures();

    // Synchronous fan-out: returns after every child has run
    let payroll = MacroCommand::from_commands(
        deposit(&balance, 100),
        [deposit(&balance, 200), deposit(&balance, 300)],
    );
    payroll.execute()?;
    println!("\nSynchronous execute done");
    println!("   - Balance: {}", balance.load(Ordering::SeqCst));

    // Asynchronous fan-out: returns as soon as every child is submitted
    payroll.set_undo_all_asynchronously(true);
    payroll.undo()?;
    println!("\nAsynchronous undo submitted");
    println!("   - Balance right after: {}", balance.load(Ordering::SeqCst));
    dispatch::global().drain();
    println!("   - Balance after drain: {}", balance.load(Ordering::SeqCst));

    // Nested: the whole inner macro runs on a worker
    let bonus: Arc<dyn Command> = Arc::new(
        MacroCommand::with_modes(DispatchMode::Synchronous, DispatchMode::Synchronous)
            .with_command(deposit(&balance, 10))
            .with_command(deposit(&balance, 20)),
    );
    let broken: Arc<dyn Command> = Arc::new(FnCommand::irreversible("Audit", || {
        Err(CommandError::ExecutionFailed("auditor unavailable".into()))
    }));
    let month_end = MacroCommand::new()
        .with_command(bonus)
        .with_command(broken);

    month_end.execute()?;
    println!("\nNested asynchronous execute submitted (caller saw no error)");
    dispatch::global().drain();
    println!("   - Balance after drain: {}", balance.load(Ordering::SeqCst));

    while let Ok(failure) = failures.try_recv() {
        println!(
            "   - {} of '{}' failed in background: {}",
            failure.operation, failure.description, failure.error
        );
    }

    let stats = dispatch::global().stats();
    println!("\nDispatcher stats");
    println!("   - Tasks completed: {}", stats.tasks_completed);
    println!("   - Tasks failed: {}", stats.tasks_failed);
    println!("   - Live workers: {}", stats.live_workers);

    Ok(())
}
