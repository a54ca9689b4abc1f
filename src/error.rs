//! Error types for shmake operations.
//!
//! This module defines [`ShmakeError`], the error type returned by every
//! fallible helper in the crate, and a [`Result`] type alias for convenience.
//!
//! # Error Handling Strategy
//!
//! - Every invocation is attempted exactly once; nothing here is retried
//! - Diagnostic context (environment, command, captured output) is printed
//!   by the runner before the error is returned, so variants stay small
//! - Use `anyhow::Error` (via `ShmakeError::Other`) for unexpected errors

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for shmake operations.
#[derive(Debug, Error)]
pub enum ShmakeError {
    /// A child process exited with a code other than the expected one.
    ///
    /// The actual code is only reported in the runner's diagnostic output.
    #[error("Unexpected status code")]
    UnexpectedStatusCode,

    /// A helper expected output of a specific shape and got something else.
    #[error("Unexpected output: {output:?}")]
    UnexpectedOutput { output: String },

    /// A file's digest did not match the expected value.
    #[error("Checksum mismatch for {path}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    /// The shell could not be started.
    #[error("Failed to spawn {shell}: {source}")]
    Spawn {
        shell: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Platform name not present in the platform table.
    #[error("Unknown platform: {name}")]
    UnknownPlatform { name: String },

    /// Architecture name not recognised.
    #[error("Unknown architecture: {name}")]
    UnknownArch { name: String },

    /// Output level name could not be parsed.
    #[error("Unknown output level: {value}")]
    UnknownOutputLevel { value: String },

    /// Failed to parse configuration file.
    #[error("Failed to parse config at {path}: {message}")]
    ConfigParseError { path: PathBuf, message: String },

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic wrapped error for anyhow interop.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias for shmake operations.
pub type Result<T> = std::result::Result<T, ShmakeError>;
