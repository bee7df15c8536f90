// Command trait definition

use crate::dispatch::{self, Dispatcher, TaskHandle};
use std::fmt;
use std::sync::Arc;

/// Result type for command operations
pub type CommandResult<T> = Result<T, CommandError>;

/// Errors that can occur during command execution
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    /// Command execution failed
    #[error("Execution failed: {0}")]
    ExecutionFailed(String),

    /// Undo operation failed
    #[error("Undo failed: {0}")]
    UndoFailed(String),

    /// Invalid state for this operation
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// The command panicked on a background worker
    #[error("Command panicked: {0}")]
    Panicked(String),

    /// The dispatcher no longer accepts work
    #[error("Dispatcher has been shut down")]
    DispatcherShutdown,

    /// No worker thread could be started for the submitted work
    #[error("Failed to spawn worker thread: {0}")]
    WorkerSpawn(String),
}

/// The two operations every command supports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Execute,
    Undo,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Execute => write!(f, "execute"),
            Operation::Undo => write!(f, "undo"),
        }
    }
}

/// A unit of work that can be executed and undone, synchronously or on a
/// background worker.
///
/// Only `execute`, `undo` and `description` need to be written by hand. The
/// asynchronous operations are provided: they move an `Arc` of the command
/// into the submitted job, so the work keeps the command alive for as long as
/// it runs, whatever happens to the caller's reference.
///
/// # Thread Safety
/// Commands take `&self` and may run on several threads at once when they are
/// dispatched asynchronously. A command with mutable state is responsible for
/// its own synchronisation.
///
/// # Example
/// ```no_run
/// use async_commander::command::trait_def::{Command, CommandError, CommandResult};
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicI32, Ordering};
///
/// struct IncrementCommand {
///     counter: Arc<AtomicI32>,
/// }
///
/// impl Command for IncrementCommand {
///     fn execute(&self) -> CommandResult<()> {
///         self.counter.fetch_add(1, Ordering::SeqCst);
///         Ok(())
///     }
///
///     fn undo(&self) -> CommandResult<()> {
///         if self.counter.fetch_sub(1, Ordering::SeqCst) <= 0 {
///             return Err(CommandError::UndoFailed("Counter already at zero".into()));
///         }
///         Ok(())
///     }
///
///     fn description(&self) -> String {
///         "Increment counter".to_string()
///     }
/// }
///
/// let counter = Arc::new(AtomicI32::new(0));
/// let cmd = Arc::new(IncrementCommand { counter: counter.clone() });
///
/// cmd.execute().unwrap();
/// // Fire and forget: the handle may simply be dropped
/// cmd.clone().execute_asynchronously();
/// ```
pub trait Command: Send + Sync + 'static {
    /// Execute the command, blocking the caller until it is done
    fn execute(&self) -> CommandResult<()>;

    /// Reverse the most recent execute, blocking the caller until it is done
    fn undo(&self) -> CommandResult<()>;

    /// Get a human-readable description of the command
    ///
    /// Used in log records and in [`crate::dispatch::AsyncFailure`] reports.
    fn description(&self) -> String;

    /// Submit `execute` to the global dispatcher and return immediately
    ///
    /// The returned handle is optional to use. Failures inside the background
    /// execution never reach the caller; they are logged and published to
    /// failure subscribers.
    fn execute_asynchronously(self: Arc<Self>) -> TaskHandle {
        self.execute_on(dispatch::global())
    }

    /// Submit `undo` to the global dispatcher and return immediately
    fn undo_asynchronously(self: Arc<Self>) -> TaskHandle {
        self.undo_on(dispatch::global())
    }

    /// Submit `execute` to a specific dispatcher
    fn execute_on(self: Arc<Self>, dispatcher: &Dispatcher) -> TaskHandle {
        let description = self.description();
        dispatcher.submit(Operation::Execute, description, move || self.execute())
    }

    /// Submit `undo` to a specific dispatcher
    fn undo_on(self: Arc<Self>, dispatcher: &Dispatcher) -> TaskHandle {
        let description = self.description();
        dispatcher.submit(Operation::Undo, description, move || self.undo())
    }
}
