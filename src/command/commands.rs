// Concrete command implementations

use crate::command::trait_def::{Command, CommandResult};

type Action = Box<dyn Fn() -> CommandResult<()> + Send + Sync>;

/// Command built from a pair of closures
///
/// Lets callers wrap an existing piece of work without declaring a type for
/// it. The closures are shared between threads when the command is
/// dispatched asynchronously, so any state they touch needs its own
/// synchronisation.
///
/// # Arguments
/// * `description` - Label used in logs and failure reports
/// * `execute` - Called by [`Command::execute`]
/// * `undo` - Called by [`Command::undo`]
pub struct FnCommand {
    description: String,
    execute: Action,
    undo: Action,
}

impl FnCommand {
    pub fn new<E, U>(description: impl Into<String>, execute: E, undo: U) -> Self
    where
        E: Fn() -> CommandResult<()> + Send + Sync + 'static,
        U: Fn() -> CommandResult<()> + Send + Sync + 'static,
    {
        Self {
            description: description.into(),
            execute: Box::new(execute),
            undo: Box::new(undo),
        }
    }

    /// Command whose undo does nothing
    pub fn irreversible<E>(description: impl Into<String>, execute: E) -> Self
    where
        E: Fn() -> CommandResult<()> + Send + Sync + 'static,
    {
        Self::new(description, execute, || Ok(()))
    }
}

impl Command for FnCommand {
    fn execute(&self) -> CommandResult<()> {
        (self.execute)()
    }

    fn undo(&self) -> CommandResult<()> {
        (self.undo)()
    }

    fn description(&self) -> String {
        self.description.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::trait_def::CommandError;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicI32, Ordering};

    #[test]
    fn test_fn_command_execute_and_undo() {
        let value = Arc::new(AtomicI32::new(0));
        let (v1, v2) = (value.clone(), value.clone());
        let cmd = FnCommand::new(
            "Add 5",
            move || {
                v1.fetch_add(5, Ordering::SeqCst);
                Ok(())
            },
            move || {
                v2.fetch_sub(5, Ordering::SeqCst);
                Ok(())
            },
        );

        cmd.execute().unwrap();
        assert_eq!(value.load(Ordering::SeqCst), 5);

        cmd.undo().unwrap();
        assert_eq!(value.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_fn_command_propagates_errors() {
        let cmd = FnCommand::new(
            "Broken",
            || Err(CommandError::ExecutionFailed("no device".into())),
            || Err(CommandError::UndoFailed("no device".into())),
        );

        assert_eq!(
            cmd.execute(),
            Err(CommandError::ExecutionFailed("no device".into()))
        );
        assert_eq!(cmd.undo(), Err(CommandError::UndoFailed("no device".into())));
    }

    #[test]
    fn test_irreversible_undo_is_noop() {
        let cmd = FnCommand::irreversible("Send email", || Ok(()));
        assert!(cmd.undo().is_ok());
        assert_eq!(cmd.description(), "Send email");
    }
}
