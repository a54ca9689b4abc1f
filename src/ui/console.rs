//! Console sink for the runner's own output.
//!
//! Command echoes, failure reports and the progress indicator all go through
//! a [`Console`], which is standard output in normal use and an in-memory
//! buffer in tests.

use std::fmt;
use std::io::{self, Write};
use std::sync::{Arc, Mutex, PoisonError};

use crate::shell::CaptureBuffer;

type SharedWriter = Arc<Mutex<Box<dyn Write + Send>>>;

/// A cloneable, thread-safe line writer.
#[derive(Clone)]
pub struct Console {
    writer: SharedWriter,
    is_term: bool,
}

impl fmt::Debug for Console {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Console")
            .field("is_term", &self.is_term)
            .finish_non_exhaustive()
    }
}

impl Console {
    /// Console writing to the process's standard output.
    pub fn stdout() -> Self {
        Self {
            writer: Arc::new(Mutex::new(Box::new(io::stdout()))),
            is_term: console::Term::stdout().is_term(),
        }
    }

    /// Console writing into a buffer, returned alongside it.
    pub fn buffer() -> (Self, CaptureBuffer) {
        let buffer = CaptureBuffer::new();
        let console = Self {
            writer: Arc::new(Mutex::new(Box::new(buffer.clone()))),
            is_term: false,
        };
        (console, buffer)
    }

    /// Whether this console is an interactive terminal.
    pub fn is_term(&self) -> bool {
        self.is_term
    }

    /// Write raw bytes and flush. Write errors are ignored.
    pub fn write_bytes(&self, bytes: &[u8]) {
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let _ = writer.write_all(bytes);
        let _ = writer.flush();
    }

    /// Write `text` followed by a newline.
    pub fn line(&self, text: &str) {
        let mut line = String::with_capacity(text.len() + 1);
        line.push_str(text);
        line.push('\n');
        self.write_bytes(line.as_bytes());
    }

    /// Write an empty line.
    pub fn newline(&self) {
        self.write_bytes(b"\n");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_console_collects_lines() {
        let (console, buffer) = Console::buffer();
        console.line("first");
        console.write_bytes(b"..");
        console.newline();

        assert_eq!(buffer.text(), "first\n..\n");
    }

    #[test]
    fn buffer_console_is_not_a_terminal() {
        let (console, _buffer) = Console::buffer();
        assert!(!console.is_term());
    }

    #[test]
    fn clones_write_to_the_same_sink() {
        let (console, buffer) = Console::buffer();
        let clone = console.clone();
        clone.line("from clone");
        console.line("from original");

        assert_eq!(buffer.text(), "from clone\nfrom original\n");
    }
}
