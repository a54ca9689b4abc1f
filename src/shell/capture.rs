//! In-memory capture of child process output.

use std::io::{self, Read, Write};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use tracing::debug;

const CHUNK_SIZE: usize = 8 * 1024;

/// Output chunks in the order they were read from a pipe.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapturedOutput {
    chunks: Vec<Vec<u8>>,
}

impl CapturedOutput {
    /// Create an empty capture.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one chunk. Empty chunks are dropped.
    pub fn push(&mut self, chunk: &[u8]) {
        if !chunk.is_empty() {
            self.chunks.push(chunk.to_vec());
        }
    }

    /// The chunks in arrival order.
    pub fn chunks(&self) -> &[Vec<u8>] {
        &self.chunks
    }

    /// Total number of captured bytes.
    pub fn len(&self) -> usize {
        self.chunks.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// All chunks concatenated.
    pub fn bytes(&self) -> Vec<u8> {
        self.chunks.concat()
    }

    /// All chunks concatenated and decoded as UTF-8 (lossy).
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.bytes()).into_owned()
    }
}

/// A shareable handle to a [`CapturedOutput`].
///
/// Reader threads append to it while the child runs; the owner reads it
/// once those threads have finished. Cloning shares the same buffer.
#[derive(Debug, Clone, Default)]
pub struct CaptureBuffer {
    inner: Arc<Mutex<CapturedOutput>>,
}

impl CaptureBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, CapturedOutput> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append one chunk.
    pub fn push(&self, chunk: &[u8]) {
        self.lock().push(chunk);
    }

    /// Copy of the current contents.
    pub fn snapshot(&self) -> CapturedOutput {
        self.lock().clone()
    }

    /// Current contents as bytes.
    pub fn bytes(&self) -> Vec<u8> {
        self.lock().bytes()
    }

    /// Current contents as text (lossy UTF-8).
    pub fn text(&self) -> String {
        self.lock().text()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

impl Write for CaptureBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.push(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// A reader thread copying one pipe into a [`CaptureBuffer`].
///
/// The thread ends at end of stream. A pipe can outlive the child that
/// owned it when a background process inherited it, so callers wait with a
/// deadline instead of joining unconditionally.
#[derive(Debug)]
pub(crate) struct Drain {
    handle: JoinHandle<()>,
    done: Receiver<()>,
}

impl Drain {
    /// Wait for end of stream until `deadline`.
    ///
    /// Returns `false` if the pipe was still open; the thread is then left
    /// running and keeps appending to the buffer until the pipe closes.
    pub(crate) fn finish_by(self, deadline: Instant) -> bool {
        let wait = deadline.saturating_duration_since(Instant::now());
        match self.done.recv_timeout(wait) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                let _ = self.handle.join();
                true
            }
            Err(RecvTimeoutError::Timeout) => {
                debug!("Pipe still open after child exit, detaching reader");
                false
            }
        }
    }
}

/// Spawn a thread that copies `reader` into `buffer` until end of stream.
///
/// Finish the returned [`Drain`] before reading the buffer.
pub(crate) fn drain<R>(mut reader: R, buffer: CaptureBuffer) -> io::Result<Drain>
where
    R: Read + Send + 'static,
{
    let (finished, done) = mpsc::channel();
    let handle = thread::Builder::new()
        .name("shmake-drain".to_string())
        .spawn(move || {
            let mut chunk = [0u8; CHUNK_SIZE];
            loop {
                match reader.read(&mut chunk) {
                    Ok(0) => break,
                    Ok(n) => buffer.push(&chunk[..n]),
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    Err(e) => {
                        debug!("Stopped draining pipe: {}", e);
                        break;
                    }
                }
            }
            let _ = finished.send(());
        })?;
    Ok(Drain { handle, done })
}

/// First non-empty line of `text`, without its line terminator.
pub fn first_line(text: &str) -> Option<&str> {
    text.split('\n').find(|line| !line.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn captured_output_keeps_chunk_order() {
        let mut output = CapturedOutput::new();
        output.push(b"one ");
        output.push(b"two ");
        output.push(b"three");

        assert_eq!(output.chunks().len(), 3);
        assert_eq!(output.text(), "one two three");
        assert_eq!(output.len(), 13);
    }

    #[test]
    fn captured_output_ignores_empty_chunks() {
        let mut output = CapturedOutput::new();
        output.push(b"");
        assert!(output.is_empty());
    }

    #[test]
    fn capture_buffer_clones_share_contents() {
        let buffer = CaptureBuffer::new();
        let clone = buffer.clone();
        clone.push(b"shared");
        assert_eq!(buffer.text(), "shared");
    }

    #[test]
    fn capture_buffer_implements_write() {
        let mut buffer = CaptureBuffer::new();
        write!(buffer, "a{}", 1).unwrap();
        assert_eq!(buffer.text(), "a1");
    }

    #[test]
    fn drain_copies_reader_to_end() {
        let buffer = CaptureBuffer::new();
        let data = vec![b'x'; CHUNK_SIZE * 2 + 10];
        let reader = drain(std::io::Cursor::new(data.clone()), buffer.clone()).unwrap();
        assert!(reader.finish_by(Instant::now() + Duration::from_secs(5)));

        assert_eq!(buffer.bytes(), data);
        assert!(buffer.snapshot().chunks().len() >= 3);
    }

    #[test]
    fn drain_gives_up_on_open_pipe() {
        let buffer = CaptureBuffer::new();
        let (pipe_reader, mut pipe_writer) = io::pipe().unwrap();
        pipe_writer.write_all(b"early").unwrap();

        let reader = drain(pipe_reader, buffer.clone()).unwrap();
        let started = Instant::now();
        assert!(!reader.finish_by(Instant::now() + Duration::from_millis(50)));
        assert!(started.elapsed() < Duration::from_secs(2));

        drop(pipe_writer);
        let deadline = Instant::now() + Duration::from_secs(5);
        while buffer.is_empty() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(buffer.text(), "early");
    }

    #[test]
    fn first_line_skips_leading_blank_lines() {
        assert_eq!(first_line("nice\n"), Some("nice"));
        assert_eq!(first_line("\n\nsecond\nthird"), Some("second"));
        assert_eq!(first_line(""), None);
        assert_eq!(first_line("\n\n"), None);
    }
}
