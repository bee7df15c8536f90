// MacroCommand - composite command that fans out to its children

use crate::command::trait_def::{Command, CommandResult, Operation};
use crate::dispatch::{self, Dispatcher};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::debug;

/// How a composite forwards one operation to its children
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchMode {
    /// Call the child directly and wait for it before moving to the next one
    Synchronous,
    /// Submit the child to the dispatcher and move on immediately
    Asynchronous,
}

impl DispatchMode {
    pub fn is_asynchronous(self) -> bool {
        self == DispatchMode::Asynchronous
    }

    fn from_flag(asynchronous: bool) -> Self {
        if asynchronous {
            DispatchMode::Asynchronous
        } else {
            DispatchMode::Synchronous
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Modes {
    execute: DispatchMode,
    undo: DispatchMode,
}

/// A command made of an ordered list of commands
///
/// Executing or undoing a macro forwards the operation to every child in
/// insertion order. Each operation has its own [`DispatchMode`]:
/// - Synchronous: each child runs to completion before the next one starts.
///   The first child error is returned as is and the remaining children are
///   skipped.
/// - Asynchronous: each child is submitted to the dispatcher. The macro
///   returns once every submission has been issued, without waiting for any
///   of them; their failures are only visible through the dispatcher's
///   logging and failure subscriptions.
///
/// Undo walks the children in the same order as execute, not in reverse.
///
/// Because a macro is itself a [`Command`], macros nest. The parent's mode
/// decides whether the child macro's whole fan-out runs inline or on a worker.
///
/// The child list can be changed through `&self` while other threads run the
/// macro. Every pass works on a snapshot taken when it starts, so changes show
/// up from the next pass on.
///
/// # Example
/// ```no_run
/// use async_commander::command::{Command, DispatchMode, FnCommand, MacroCommand};
/// use std::sync::Arc;
///
/// let save: Arc<dyn Command> = Arc::new(FnCommand::new("Save", || Ok(()), || Ok(())));
/// let upload: Arc<dyn Command> = Arc::new(FnCommand::new("Upload", || Ok(()), || Ok(())));
///
/// let publish = MacroCommand::with_modes(DispatchMode::Synchronous, DispatchMode::Asynchronous)
///     .with_command(save)
///     .with_command(upload);
///
/// publish.execute().unwrap(); // save, then upload, on this thread
/// publish.undo().unwrap();    // both undos submitted to the dispatcher
/// ```
pub struct MacroCommand {
    commands: RwLock<Vec<Arc<dyn Command>>>,
    modes: RwLock<Modes>,
    /// `None` until a dispatcher is set; asynchronous passes then use the global one
    dispatcher: Option<Dispatcher>,
}

impl MacroCommand {
    /// Create an empty macro that dispatches both operations asynchronously
    pub fn new() -> Self {
        Self::with_modes(DispatchMode::Asynchronous, DispatchMode::Asynchronous)
    }

    /// Create an empty macro with explicit dispatch modes
    pub fn with_modes(execute_mode: DispatchMode, undo_mode: DispatchMode) -> Self {
        Self {
            commands: RwLock::new(Vec::new()),
            modes: RwLock::new(Modes {
                execute: execute_mode,
                undo: undo_mode,
            }),
            dispatcher: None,
        }
    }

    /// Create a macro from one command plus any number of additional ones
    ///
    /// `None` entries are dropped. Both operations default to synchronous
    /// dispatch with this constructor.
    pub fn from_commands<C, I, T>(command: C, additional: I) -> Self
    where
        C: Into<Option<Arc<dyn Command>>>,
        I: IntoIterator<Item = T>,
        T: Into<Option<Arc<dyn Command>>>,
    {
        let commands: Vec<Arc<dyn Command>> = std::iter::once(command.into())
            .chain(additional.into_iter().map(Into::into))
            .flatten()
            .collect();

        let mac = Self::with_modes(DispatchMode::Synchronous, DispatchMode::Synchronous);
        *mac.commands.write() = commands;
        mac
    }

    /// Append a command, builder style
    pub fn with_command(self, command: impl Into<Option<Arc<dyn Command>>>) -> Self {
        self.add_command(command);
        self
    }

    /// Use `dispatcher` instead of the global one for asynchronous children
    pub fn with_dispatcher(mut self, dispatcher: Dispatcher) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    /// Append a command to the end of the list
    ///
    /// Duplicates are allowed. `None` is ignored. Returns whether a command
    /// was added.
    pub fn add_command(&self, command: impl Into<Option<Arc<dyn Command>>>) -> bool {
        match command.into() {
            Some(command) => {
                self.commands.write().push(command);
                true
            }
            None => false,
        }
    }

    /// Remove the first occurrence of `command`
    ///
    /// Commands are compared by identity (same allocation), not by value.
    /// Removing a command that is not there is a no-op. Returns whether a
    /// command was removed.
    pub fn remove_command(&self, command: &Arc<dyn Command>) -> bool {
        let mut commands = self.commands.write();
        match commands.iter().position(|c| same_command(c, command)) {
            Some(index) => {
                commands.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, command: &Arc<dyn Command>) -> bool {
        self.commands.read().iter().any(|c| same_command(c, command))
    }

    pub fn len(&self) -> usize {
        self.commands.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.read().is_empty()
    }

    /// Snapshot of the children in insertion order
    pub fn commands(&self) -> Vec<Arc<dyn Command>> {
        self.commands.read().clone()
    }

    /// Dispatcher used for asynchronous children
    ///
    /// Without [`MacroCommand::with_dispatcher`] this is [`dispatch::global`],
    /// which is only created the first time it is needed.
    pub fn dispatcher(&self) -> &Dispatcher {
        self.dispatcher.as_ref().unwrap_or_else(|| dispatch::global())
    }

    pub fn execute_mode(&self) -> DispatchMode {
        self.modes.read().execute
    }

    pub fn undo_mode(&self) -> DispatchMode {
        self.modes.read().undo
    }

    pub fn set_execute_mode(&self, mode: DispatchMode) {
        self.modes.write().execute = mode;
    }

    pub fn set_undo_mode(&self, mode: DispatchMode) {
        self.modes.write().undo = mode;
    }

    pub fn execute_all_asynchronously(&self) -> bool {
        self.execute_mode().is_asynchronous()
    }

    pub fn set_execute_all_asynchronously(&self, asynchronous: bool) {
        self.set_execute_mode(DispatchMode::from_flag(asynchronous));
    }

    pub fn undo_all_asynchronously(&self) -> bool {
        self.undo_mode().is_asynchronous()
    }

    pub fn set_undo_all_asynchronously(&self, asynchronous: bool) {
        self.set_undo_mode(DispatchMode::from_flag(asynchronous));
    }

    fn mode_for(&self, operation: Operation) -> DispatchMode {
        let modes = self.modes.read();
        match operation {
            Operation::Execute => modes.execute,
            Operation::Undo => modes.undo,
        }
    }

    /// Forward `operation` to every child, in insertion order
    fn fan_out(&self, operation: Operation) -> CommandResult<()> {
        let commands = self.commands();
        if commands.is_empty() {
            return Ok(());
        }

        let mode = self.mode_for(operation);
        debug!(
            operation = %operation,
            mode = ?mode,
            children = commands.len(),
            "macro fan-out"
        );

        for (index, command) in commands.into_iter().enumerate() {
            match (mode, operation) {
                (DispatchMode::Asynchronous, Operation::Execute) => {
                    command.execute_on(self.dispatcher());
                }
                (DispatchMode::Asynchronous, Operation::Undo) => {
                    command.undo_on(self.dispatcher());
                }
                (DispatchMode::Synchronous, _) => {
                    let result = match operation {
                        Operation::Execute => command.execute(),
                        Operation::Undo => command.undo(),
                    };
                    if let Err(e) = result {
                        debug!(
                            operation = %operation,
                            index,
                            command = %command.description(),
                            error = %e,
                            "macro fan-out aborted"
                        );
                        return Err(e);
                    }
                }
            }
        }

        Ok(())
    }
}

impl Default for MacroCommand {
    fn default() -> Self {
        Self::new()
    }
}

impl Command for MacroCommand {
    fn execute(&self) -> CommandResult<()> {
        self.fan_out(Operation::Execute)
    }

    fn undo(&self) -> CommandResult<()> {
        self.fan_out(Operation::Undo)
    }

    fn description(&self) -> String {
        format!("Macro ({} commands)", self.len())
    }
}

impl std::fmt::Debug for MacroCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let descriptions: Vec<String> =
            self.commands().iter().map(|c| c.description()).collect();
        f.debug_struct("MacroCommand")
            .field("commands", &descriptions)
            .field("execute_mode", &self.execute_mode())
            .field("undo_mode", &self.undo_mode())
            .finish()
    }
}

/// Identity comparison that ignores vtable pointers
fn same_command(a: &Arc<dyn Command>, b: &Arc<dyn Command>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}
