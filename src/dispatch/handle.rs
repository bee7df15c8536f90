// TaskHandle - optional completion handle for dispatched work

use crate::command::trait_def::{CommandResult, Operation};
use parking_lot::{Condvar, Mutex};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Identifier assigned to every submission, unique per dispatcher
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(pub u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task-{}", self.0)
    }
}

/// Shared slot the worker fills in once the task has run
pub(crate) struct CompletionSlot {
    outcome: Mutex<Option<CommandResult<()>>>,
    done: Condvar,
}

impl CompletionSlot {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            outcome: Mutex::new(None),
            done: Condvar::new(),
        })
    }

    pub(crate) fn complete(&self, outcome: CommandResult<()>) {
        let mut slot = self.outcome.lock();
        *slot = Some(outcome);
        self.done.notify_all();
    }
}

/// Handle to a command submitted for asynchronous execution or undo
///
/// Dispatch is fire-and-forget: dropping the handle does not cancel or
/// detach anything, the work runs regardless. Callers that do want to know
/// when the work is done can poll or block on the handle.
pub struct TaskHandle {
    id: TaskId,
    operation: Operation,
    description: String,
    slot: Arc<CompletionSlot>,
}

impl TaskHandle {
    pub(crate) fn new(
        id: TaskId,
        operation: Operation,
        description: String,
        slot: Arc<CompletionSlot>,
    ) -> Self {
        Self {
            id,
            operation,
            description,
            slot,
        }
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }

    /// Description of the dispatched command
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Check whether the task has finished (successfully or not)
    pub fn is_finished(&self) -> bool {
        self.slot.outcome.lock().is_some()
    }

    /// Get the outcome without blocking, if the task has finished
    pub fn try_result(&self) -> Option<CommandResult<()>> {
        self.slot.outcome.lock().clone()
    }

    /// Block until the task has finished and return its outcome
    pub fn wait(self) -> CommandResult<()> {
        let mut outcome = self.slot.outcome.lock();
        while outcome.is_none() {
            self.slot.done.wait(&mut outcome);
        }
        outcome.clone().unwrap_or(Ok(()))
    }

    /// Block for at most `timeout`
    ///
    /// Returns `None` if the task is still pending when the timeout elapses.
    /// The task itself keeps running either way.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<CommandResult<()>> {
        let mut outcome = self.slot.outcome.lock();
        if outcome.is_none() {
            self.slot.done.wait_while_for(&mut outcome, |o| o.is_none(), timeout);
        }
        outcome.clone()
    }
}

impl fmt::Debug for TaskHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskHandle")
            .field("id", &self.id)
            .field("operation", &self.operation)
            .field("description", &self.description)
            .field("finished", &self.is_finished())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::trait_def::CommandError;

    fn pending_handle() -> (TaskHandle, Arc<CompletionSlot>) {
        let slot = CompletionSlot::new();
        let handle = TaskHandle::new(TaskId(7), Operation::Undo, "Test".into(), slot.clone());
        (handle, slot)
    }

    #[test]
    fn test_pending_handle() {
        let (handle, _slot) = pending_handle();
        assert!(!handle.is_finished());
        assert_eq!(handle.try_result(), None);
        assert_eq!(handle.wait_timeout(Duration::from_millis(10)), None);
        assert_eq!(handle.id().to_string(), "task-7");
        assert_eq!(handle.operation(), Operation::Undo);
    }

    #[test]
    fn test_completed_handle() {
        let (handle, slot) = pending_handle();
        slot.complete(Err(CommandError::UndoFailed("boom".into())));

        assert!(handle.is_finished());
        assert_eq!(
            handle.wait_timeout(Duration::from_millis(10)),
            Some(Err(CommandError::UndoFailed("boom".into())))
        );
        assert_eq!(
            handle.wait(),
            Err(CommandError::UndoFailed("boom".into()))
        );
    }

    #[test]
    fn test_wait_blocks_until_completed() {
        let (handle, slot) = pending_handle();

        let completer = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            slot.complete(Ok(()));
        });

        assert_eq!(handle.wait(), Ok(()));
        completer.join().unwrap();
    }
}
