//! Output verbosity levels for shell invocations.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ShmakeError;
use crate::ui::Console;

/// How much of an invocation is shown, and where its output goes.
///
/// | Level  | stdout    | stderr    | progress | command | env |
/// |--------|-----------|-----------|----------|---------|-----|
/// | Debug  | inherited | inherited | no       | yes     | yes |
/// | Info   | inherited | captured  | yes      | yes     | yes |
/// | Error  | captured  | captured  | yes      | yes     | no  |
/// | Silent | discarded | discarded | no       | no      | no  |
///
/// Explicit sinks on the [`Invocation`](super::Invocation) always win over
/// the routing in this table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputLevel {
    /// Everything is echoed and both streams pass straight through.
    Debug,
    /// Echo the command, keep stdout live, buffer stderr for failures.
    #[default]
    Info,
    /// Buffer everything; only a failure dumps it.
    Error,
    /// Print nothing and discard the child's output.
    #[serde(alias = "none")]
    Silent,
}

/// Where a child stream goes when the caller supplied no sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Inherit,
    Capture,
    Discard,
}

impl OutputLevel {
    /// All levels, from most to least verbose.
    pub const ALL: [OutputLevel; 4] = [Self::Debug, Self::Info, Self::Error, Self::Silent];

    /// Lowercase name, as accepted by [`FromStr`].
    pub fn name(&self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Error => "error",
            Self::Silent => "silent",
        }
    }

    /// Default route for the child's stdout.
    pub fn stdout_route(&self) -> Route {
        match self {
            Self::Debug | Self::Info => Route::Inherit,
            Self::Error => Route::Capture,
            Self::Silent => Route::Discard,
        }
    }

    /// Default route for the child's stderr.
    pub fn stderr_route(&self) -> Route {
        match self {
            Self::Debug => Route::Inherit,
            Self::Info | Self::Error => Route::Capture,
            Self::Silent => Route::Discard,
        }
    }

    /// Whether a progress indicator runs while the child is alive.
    pub fn shows_progress(&self) -> bool {
        matches!(self, Self::Info | Self::Error)
    }

    /// Whether the command line is printed before spawning.
    pub fn echoes_command(&self) -> bool {
        !matches!(self, Self::Silent)
    }

    /// Whether the child's environment is printed before spawning.
    pub fn echoes_env(&self) -> bool {
        matches!(self, Self::Debug | Self::Info)
    }

    /// Whether a failed invocation dumps its diagnostic context.
    pub fn reports_failures(&self) -> bool {
        !matches!(self, Self::Silent)
    }

    pub(crate) fn on_command(&self, console: &Console, command_line: &str) {
        if self.echoes_command() {
            console.line(command_line);
        }
    }

    pub(crate) fn on_env(&self, console: &Console, env: &BTreeMap<String, String>) {
        if self.echoes_env() {
            console.line(&format!("env: {:?}", env));
        }
    }
}

impl fmt::Display for OutputLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for OutputLevel {
    type Err = ShmakeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "error" => Ok(Self::Error),
            "silent" | "none" => Ok(Self::Silent),
            _ => Err(ShmakeError::UnknownOutputLevel {
                value: s.to_string(),
            }),
        }
    }
}
