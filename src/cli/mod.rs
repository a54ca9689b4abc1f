//! Command-line interface for shmake.
//!
//! - [`args`] - Argument definitions using clap derive macros
//! - [`commands`] - Command implementations

pub mod args;
pub mod commands;

pub use args::{Cli, Commands, LevelArg};
pub use commands::CommandDispatcher;
