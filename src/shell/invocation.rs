//! A single shell command line and how to run it.

use std::collections::BTreeMap;
use std::fs::File;
use std::path::PathBuf;
use std::process::Stdio;

use super::capture::CaptureBuffer;
use super::level::OutputLevel;

/// Destination for one of the child's output streams.
#[derive(Debug)]
pub enum Sink {
    /// Share the host's stream.
    Inherit,
    /// Discard everything.
    Null,
    /// Any other process stream, e.g. a file or a pipe.
    Stdio(Stdio),
    /// Drain into a caller-owned buffer.
    Capture(CaptureBuffer),
}

impl Sink {
    /// Capture into `buffer`. The buffer is complete once the invocation returns.
    pub fn capture(buffer: &CaptureBuffer) -> Self {
        Self::Capture(buffer.clone())
    }
}

impl From<File> for Sink {
    fn from(file: File) -> Self {
        Self::Stdio(Stdio::from(file))
    }
}

impl From<Stdio> for Sink {
    fn from(stdio: Stdio) -> Self {
        Self::Stdio(stdio)
    }
}

impl From<CaptureBuffer> for Sink {
    fn from(buffer: CaptureBuffer) -> Self {
        Self::Capture(buffer)
    }
}

/// One command line to run through the shell.
///
/// Arguments are joined with single spaces into one command line; quoting
/// and escaping are the caller's responsibility.
///
/// # Example
///
/// ```
/// use shmake::shell::{Invocation, OutputLevel};
///
/// let invocation = Invocation::new(["mkdir", "-p", "build/out"])
///     .level(OutputLevel::Silent)
///     .expect_status(0);
/// assert_eq!(invocation.command_line(), "mkdir -p build/out");
/// ```
#[derive(Debug, Default)]
pub struct Invocation {
    pub(crate) args: Vec<String>,
    pub(crate) shell: Option<PathBuf>,
    pub(crate) stdin: Option<Stdio>,
    pub(crate) stdout: Option<Sink>,
    pub(crate) stderr: Option<Sink>,
    pub(crate) env: Option<BTreeMap<String, String>>,
    pub(crate) expected_status: i32,
    pub(crate) level: Option<OutputLevel>,
}

impl Invocation {
    /// Create an invocation from argument tokens.
    pub fn new<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            args: args.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Append one argument token.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Run through `shell` instead of the configured shell.
    pub fn shell(mut self, shell: impl Into<PathBuf>) -> Self {
        self.shell = Some(shell.into());
        self
    }

    /// Feed the child's stdin from `stdin`.
    pub fn stdin(mut self, stdin: impl Into<Stdio>) -> Self {
        self.stdin = Some(stdin.into());
        self
    }

    /// Send stdout to `sink`, overriding the level's routing.
    pub fn stdout(mut self, sink: impl Into<Sink>) -> Self {
        self.stdout = Some(sink.into());
        self
    }

    /// Send stderr to `sink`, overriding the level's routing.
    pub fn stderr(mut self, sink: impl Into<Sink>) -> Self {
        self.stderr = Some(sink.into());
        self
    }

    /// Give the child exactly this environment.
    pub fn env(mut self, env: BTreeMap<String, String>) -> Self {
        self.env = Some(env);
        self
    }

    /// Add one variable to the explicit environment.
    ///
    /// The first call starts from an empty mapping, not from the default
    /// `PATH`-only environment.
    pub fn env_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env
            .get_or_insert_with(BTreeMap::new)
            .insert(key.into(), value.into());
        self
    }

    /// Exit code that counts as success. Defaults to 0.
    pub fn expect_status(mut self, code: i32) -> Self {
        self.expected_status = code;
        self
    }

    /// Output level for this invocation only.
    pub fn level(mut self, level: OutputLevel) -> Self {
        self.level = Some(level);
        self
    }

    /// The argument tokens joined by single spaces.
    pub fn command_line(&self) -> String {
        self.args.join(" ")
    }

    pub fn expected_status(&self) -> i32 {
        self.expected_status
    }

    /// The environment the child will receive.
    pub fn resolved_env(&self) -> BTreeMap<String, String> {
        self.env.clone().unwrap_or_else(inherited_env)
    }
}

/// Default child environment: only `PATH`, copied from the host.
pub fn inherited_env() -> BTreeMap<String, String> {
    let mut env = BTreeMap::new();
    env.insert(
        "PATH".to_string(),
        std::env::var("PATH").unwrap_or_default(),
    );
    env
}
