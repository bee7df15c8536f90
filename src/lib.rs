// AsyncCommander - commands that run synchronously or fire-and-forget

pub mod command;
pub mod dispatch;
pub mod logging;

// Re-export commonly used types for convenience
pub use command::{
    Command, CommandError, CommandResult, DispatchMode, FnCommand, MacroCommand, Operation,
};
pub use dispatch::{
    AsyncFailure, ConfigError, Dispatcher, DispatcherConfig, DispatcherStats, FailureReceiver,
    TaskHandle, TaskId,
};
