//! shmake - shell-command execution for build scripts.
//!
//! The heart of the crate is [`shell::Runner`]: it runs a command line
//! through `sh -c`, routes the child's output according to an
//! [`shell::OutputLevel`], tracks the child in a process registry so an
//! interrupt can terminate it, and checks the exit code. The remaining
//! modules are build-script helpers layered on top of it.
//!
//! # Modules
//!
//! - [`archive`] - `xcodebuild` archive and XCFramework assembly
//! - [`cli`] - Command-line interface and argument parsing
//! - [`config`] - Runner configuration loading
//! - [`error`] - Error types and result aliases
//! - [`files`] - Directory, download and checksum helpers
//! - [`markdown`] - Markdown headers and tables
//! - [`platform`] - Apple platform metadata
//! - [`shell`] - Command execution, output routing and process supervision
//! - [`ui`] - Console and progress indicator
//!
//! # Example
//!
//! ```
//! use shmake::markdown::{Align, Table};
//!
//! let mut table = Table::new(["Name", "Size"]).aligns([Align::Left, Align::Right]);
//! table.add_row(["lib.a", "12"]);
//! assert!(table.render().starts_with("| Name  | Size |\n"));
//! ```

pub mod archive;
pub mod cli;
pub mod config;
pub mod error;
pub mod files;
pub mod markdown;
pub mod platform;
pub mod shell;
pub mod ui;

pub use config::RunnerConfig;
pub use error::{Result, ShmakeError};
