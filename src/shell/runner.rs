//! Running an [`Invocation`] to completion.

use std::collections::BTreeMap;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use super::capture::{drain, first_line, CaptureBuffer, Drain};
use super::invocation::{inherited_env, Invocation, Sink};
use super::level::{OutputLevel, Route};
use super::supervisor::Supervisor;
use crate::config::RunnerConfig;
use crate::error::{Result, ShmakeError};
use crate::ui::{Console, ProgressIndicator};

const SEPARATOR: &str = "----------------------------------------";

/// How long to keep reading captured pipes once the child has exited.
/// Background processes started by the command may hold them open.
const READER_GRACE: Duration = Duration::from_millis(250);

/// Runs shell command lines, routing their output by [`OutputLevel`].
///
/// Each call blocks until the child exits. A child whose exit code differs
/// from the expected one fails the call with
/// [`ShmakeError::UnexpectedStatusCode`]; unless the level is
/// [`OutputLevel::Silent`], the environment, the command line and any
/// captured output are printed first.
///
/// # Example
///
/// ```no_run
/// use shmake::shell::Runner;
///
/// let runner = Runner::default();
/// runner.sh(["mkdir", "-p", "build"])?;
/// let sdk = runner.read_line("xcrun --sdk iphoneos --show-sdk-path")?;
/// # Ok::<(), shmake::ShmakeError>(())
/// ```
#[derive(Debug)]
pub struct Runner {
    config: RunnerConfig,
    supervisor: Arc<Supervisor>,
    console: Console,
}

impl Default for Runner {
    fn default() -> Self {
        Self::new(RunnerConfig::default())
    }
}

impl Runner {
    /// Runner using the process-wide supervisor and standard output.
    pub fn new(config: RunnerConfig) -> Self {
        Self {
            config,
            supervisor: Supervisor::global(),
            console: Console::stdout(),
        }
    }

    /// Register children with `supervisor` instead of the global one.
    pub fn with_supervisor(mut self, supervisor: Arc<Supervisor>) -> Self {
        self.supervisor = supervisor;
        self
    }

    /// Write echoes, reports and progress to `console`.
    pub fn with_console(mut self, console: Console) -> Self {
        self.console = console;
        self
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    pub fn supervisor(&self) -> &Arc<Supervisor> {
        &self.supervisor
    }

    pub fn console(&self) -> &Console {
        &self.console
    }

    /// Run `args` joined into one command line with default options.
    pub fn sh<I, S>(&self, args: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.run(Invocation::new(args))
    }

    /// Run `cmd` silently and return the first non-empty line it printed.
    ///
    /// Returns an empty string when the command printed nothing.
    pub fn read_line(&self, cmd: &str) -> Result<String> {
        let buffer = CaptureBuffer::new();
        self.run(
            Invocation::new([cmd])
                .stdout(Sink::capture(&buffer))
                .level(OutputLevel::Silent),
        )?;
        let text = buffer.text();
        Ok(first_line(&text).unwrap_or_default().to_string())
    }

    /// Run one invocation to completion.
    pub fn run(&self, invocation: Invocation) -> Result<()> {
        let Invocation {
            args,
            shell,
            stdin,
            stdout,
            stderr,
            env,
            expected_status,
            level,
        } = invocation;

        let level = level.unwrap_or(self.config.output_level);
        let command_line = args.join(" ");
        level.on_command(&self.console, &command_line);

        let env = env.unwrap_or_else(inherited_env);
        level.on_env(&self.console, &env);

        let shell = shell.unwrap_or_else(|| self.config.shell.clone());
        let mut command = Command::new(&shell);
        command
            .arg("-c")
            .arg(&command_line)
            .env_clear()
            .envs(&env);
        if let Some(stdin) = stdin {
            command.stdin(stdin);
        }

        let captured = CaptureBuffer::new();
        let (stdout_stdio, stdout_capture) = resolve(stdout, level.stdout_route(), &captured);
        let (stderr_stdio, stderr_capture) = resolve(stderr, level.stderr_route(), &captured);
        command.stdout(stdout_stdio).stderr(stderr_stdio);

        let (mut child, registration) = self
            .supervisor
            .spawn(&mut command, &command_line)
            .map_err(|source| ShmakeError::Spawn {
                shell: shell.clone(),
                source,
            })?;
        debug!(pid = child.id(), command = %command_line, %level, "Spawned shell");

        let mut readers = Vec::with_capacity(2);
        if let Err(e) = start_readers(&mut child, stdout_capture, stderr_capture, &mut readers) {
            let _ = child.kill();
            let _ = child.wait();
            finish_readers(readers);
            return Err(e.into());
        }

        let progress = if level.shows_progress() {
            ProgressIndicator::attach(&self.console, &self.config.progress)
                .map_err(|e| warn!("Could not start progress indicator: {}", e))
                .ok()
        } else {
            None
        };

        let status = child.wait();
        drop(registration);
        if let Some(progress) = progress {
            progress.cancel();
        }
        finish_readers(readers);
        let status = status?;
        debug!(%status, command = %command_line, "Shell exited");

        if status.code() == Some(expected_status) {
            return Ok(());
        }

        if level.reports_failures() {
            self.report_failure(&status, &env, &command_line, &captured);
        }
        Err(ShmakeError::UnexpectedStatusCode)
    }

    fn report_failure(
        &self,
        status: &ExitStatus,
        env: &BTreeMap<String, String>,
        command_line: &str,
        captured: &CaptureBuffer,
    ) {
        let code = match status.code() {
            Some(code) => code.to_string(),
            None => status.to_string(),
        };
        self.console.line(&format!("Unexpected exit code {}", code));
        self.console.line(SEPARATOR);
        for (name, value) in env {
            self.console.line(&format!("{}=\"{}\" \\", name, value));
        }
        self.console.line(command_line);
        self.console.line(SEPARATOR);
        self.console.write_bytes(&captured.bytes());
    }
}

/// Pick the child-side stream and, for captured streams, the buffer to drain into.
fn resolve(
    sink: Option<Sink>,
    route: Route,
    captured: &CaptureBuffer,
) -> (Stdio, Option<CaptureBuffer>) {
    match sink {
        Some(Sink::Inherit) => (Stdio::inherit(), None),
        Some(Sink::Null) => (Stdio::null(), None),
        Some(Sink::Stdio(stdio)) => (stdio, None),
        Some(Sink::Capture(buffer)) => (Stdio::piped(), Some(buffer)),
        None => match route {
            Route::Inherit => (Stdio::inherit(), None),
            Route::Discard => (Stdio::null(), None),
            Route::Capture => (Stdio::piped(), Some(captured.clone())),
        },
    }
}

fn start_readers(
    child: &mut Child,
    stdout: Option<CaptureBuffer>,
    stderr: Option<CaptureBuffer>,
    readers: &mut Vec<Drain>,
) -> std::io::Result<()> {
    if let (Some(buffer), Some(pipe)) = (stdout, child.stdout.take()) {
        readers.push(drain(pipe, buffer)?);
    }
    if let (Some(buffer), Some(pipe)) = (stderr, child.stderr.take()) {
        readers.push(drain(pipe, buffer)?);
    }
    Ok(())
}

/// Wait for the readers of an exited child, sharing one grace period.
fn finish_readers(readers: Vec<Drain>) {
    let deadline = Instant::now() + READER_GRACE;
    for reader in readers {
        reader.finish_by(deadline);
    }
}
