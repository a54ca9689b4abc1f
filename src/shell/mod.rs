//! Shell command execution.
//!
//! - [`Runner`] runs one command line through `<shell> -c` and routes its
//!   output according to an [`OutputLevel`]
//! - [`Invocation`] describes a single command line and its overrides
//! - [`Supervisor`] tracks running children so SIGINT can terminate them
//! - [`CapturedOutput`] holds buffered child output

pub mod capture;
pub mod invocation;
pub mod level;
pub mod runner;
pub mod supervisor;

pub use capture::{first_line, CaptureBuffer, CapturedOutput};
pub use invocation::{inherited_env, Invocation, Sink};
pub use level::{OutputLevel, Route};
pub use runner::Runner;
pub use supervisor::{Registration, Supervisor, INTERRUPT_EXIT_CODE};
