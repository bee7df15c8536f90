// Command Pattern with synchronous and asynchronous dispatch
//
// Every command can be executed or undone either on the caller's thread or
// fire-and-forget on a background worker (see crate::dispatch).
//
// Architecture:
// - Command trait: execute(), undo(), description() plus provided async variants
// - MacroCommand: ordered list of commands, fans each operation out to its children
// - FnCommand: closure-backed leaf command
//
// This layer only runs commands. Deciding when to undo and keeping a history
// belongs to the caller.

pub mod commands;
pub mod macro_command;
pub mod trait_def;

pub use commands::FnCommand;
pub use macro_command::{DispatchMode, MacroCommand};
pub use trait_def::{Command, CommandError, CommandResult, Operation};
