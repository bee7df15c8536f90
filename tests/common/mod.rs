// Shared test doubles for integration tests
#![allow(dead_code)]

use async_commander::{Command, CommandError, CommandResult};
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

/// Shared, ordered record of what commands did
pub type CallLog = Arc<Mutex<Vec<String>>>;

pub fn call_log() -> CallLog {
    Arc::new(Mutex::new(Vec::new()))
}

/// Records "start"/"end" entries around every execute and undo
pub struct RecordingCommand {
    name: String,
    log: CallLog,
    work: Duration,
}

impl RecordingCommand {
    pub fn new(name: &str, log: &CallLog) -> Arc<dyn Command> {
        Self::slow(name, log, Duration::ZERO)
    }

    /// Like `new`, but each call sleeps for `work` between start and end
    pub fn slow(name: &str, log: &CallLog, work: Duration) -> Arc<dyn Command> {
        Arc::new(Self {
            name: name.to_string(),
            log: log.clone(),
            work,
        })
    }

    fn record(&self, operation: &str) {
        self.log.lock().push(format!("start {} {}", operation, self.name));
        if !self.work.is_zero() {
            std::thread::sleep(self.work);
        }
        self.log.lock().push(format!("end {} {}", operation, self.name));
    }
}

impl Command for RecordingCommand {
    fn execute(&self) -> CommandResult<()> {
        self.record("execute");
        Ok(())
    }

    fn undo(&self) -> CommandResult<()> {
        self.record("undo");
        Ok(())
    }

    fn description(&self) -> String {
        format!("Record {}", self.name)
    }
}

/// A gate that blocks callers until it is opened
#[derive(Default)]
pub struct Gate {
    open: Mutex<bool>,
    cond: Condvar,
}

impl Gate {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn open(&self) {
        *self.open.lock() = true;
        self.cond.notify_all();
    }

    pub fn wait(&self) {
        let mut open = self.open.lock();
        while !*open {
            self.cond.wait(&mut open);
        }
    }
}

/// Blocks on a gate inside execute/undo and flags when it got past it
pub struct GatedCommand {
    gate: Arc<Gate>,
    started: AtomicBool,
    finished: AtomicBool,
}

impl GatedCommand {
    pub fn new(gate: &Arc<Gate>) -> Arc<Self> {
        Arc::new(Self {
            gate: gate.clone(),
            started: AtomicBool::new(false),
            finished: AtomicBool::new(false),
        })
    }

    pub fn started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    pub fn finished(&self) -> bool {
        self.finished.load(Ordering::SeqCst)
    }

    fn pass_gate(&self) {
        self.started.store(true, Ordering::SeqCst);
        self.gate.wait();
        self.finished.store(true, Ordering::SeqCst);
    }
}

impl Command for GatedCommand {
    fn execute(&self) -> CommandResult<()> {
        self.pass_gate();
        Ok(())
    }

    fn undo(&self) -> CommandResult<()> {
        self.pass_gate();
        Ok(())
    }

    fn description(&self) -> String {
        "Gated".to_string()
    }
}

/// Counts calls and sets a completion flag
#[derive(Default)]
pub struct FlagCommand {
    executed: AtomicUsize,
    undone: AtomicUsize,
}

impl FlagCommand {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn executed(&self) -> usize {
        self.executed.load(Ordering::SeqCst)
    }

    pub fn undone(&self) -> usize {
        self.undone.load(Ordering::SeqCst)
    }
}

impl Command for FlagCommand {
    fn execute(&self) -> CommandResult<()> {
        self.executed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn undo(&self) -> CommandResult<()> {
        self.undone.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn description(&self) -> String {
        "Flag".to_string()
    }
}

/// Always fails, after logging the attempt
pub struct FailingCommand {
    name: String,
    log: CallLog,
}

impl FailingCommand {
    pub fn new(name: &str, log: &CallLog) -> Arc<dyn Command> {
        Arc::new(Self {
            name: name.to_string(),
            log: log.clone(),
        })
    }
}

impl Command for FailingCommand {
    fn execute(&self) -> CommandResult<()> {
        self.log.lock().push(format!("start execute {}", self.name));
        Err(CommandError::ExecutionFailed(format!("{} failed", self.name)))
    }

    fn undo(&self) -> CommandResult<()> {
        self.log.lock().push(format!("start undo {}", self.name));
        Err(CommandError::UndoFailed(format!("{} failed", self.name)))
    }

    fn description(&self) -> String {
        format!("Fail {}", self.name)
    }
}

/// Panics on every call
pub struct PanickingCommand;

impl Command for PanickingCommand {
    fn execute(&self) -> CommandResult<()> {
        panic!("execute panicked");
    }

    fn undo(&self) -> CommandResult<()> {
        panic!("undo panicked");
    }

    fn description(&self) -> String {
        "Panicking".to_string()
    }
}
