//! Registry of running child processes and the interrupt handler.
//!
//! Every invocation registers its child here for as long as it runs. When
//! the host receives SIGINT, the handler terminates every registered child
//! and exits the host with status -1. There is no graceful drain.

use std::collections::BTreeMap;
use std::io;
use std::process::{Child, Command};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use tracing::{debug, warn};

/// Exit status of the host after an interrupt.
pub const INTERRUPT_EXIT_CODE: i32 = -1;

static GLOBAL: OnceLock<Arc<Supervisor>> = OnceLock::new();

/// Owns the set of running children.
#[derive(Debug, Default)]
pub struct Supervisor {
    running: Mutex<BTreeMap<u32, String>>,
}

impl Supervisor {
    /// A supervisor with no interrupt handler attached.
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide supervisor.
    ///
    /// The SIGINT handler is installed when this is first called and stays
    /// installed for the life of the process.
    pub fn global() -> Arc<Supervisor> {
        GLOBAL
            .get_or_init(|| {
                let supervisor = Arc::new(Supervisor::new());
                if let Err(e) = interrupt::install(Arc::clone(&supervisor)) {
                    warn!("Could not install interrupt handler: {}", e);
                }
                supervisor
            })
            .clone()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<u32, String>> {
        self.running.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Spawn `command` and register the child.
    ///
    /// The registry lock is held across the spawn, so an interrupt either
    /// happens before the child exists or sees it registered. The child is
    /// deregistered when the returned [`Registration`] is dropped.
    pub fn spawn(&self, command: &mut Command, label: &str) -> io::Result<(Child, Registration<'_>)> {
        let mut running = self.lock();
        let child = command.spawn()?;
        let pid = child.id();
        running.insert(pid, label.to_string());
        debug!(pid, "Registered child process");
        Ok((
            child,
            Registration {
                supervisor: self,
                pid,
            },
        ))
    }

    /// Add a pid to the registry.
    pub fn register(&self, pid: u32, label: &str) {
        self.lock().insert(pid, label.to_string());
    }

    /// Remove a pid from the registry. Returns whether it was present.
    pub fn deregister(&self, pid: u32) -> bool {
        let removed = self.lock().remove(&pid).is_some();
        if removed {
            debug!(pid, "Deregistered child process");
        }
        removed
    }

    /// Whether `pid` is currently registered.
    pub fn contains(&self, pid: u32) -> bool {
        self.lock().contains_key(&pid)
    }

    /// Pids of all registered children, ascending.
    pub fn running(&self) -> Vec<u32> {
        self.lock().keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Send SIGTERM to every registered child and clear the registry.
    ///
    /// Returns how many children were signalled.
    pub fn terminate_all(&self) -> usize {
        let running = std::mem::take(&mut *self.lock());
        let mut signalled = 0;
        for (pid, label) in running {
            debug!(pid, command = %label, "Terminating child process");
            if terminate(pid) {
                signalled += 1;
            } else {
                warn!(pid, "Failed to terminate child process");
            }
        }
        signalled
    }

    /// Terminate every registered child and exit the host immediately.
    pub fn interrupt(&self) -> ! {
        self.terminate_all();
        std::process::exit(INTERRUPT_EXIT_CODE)
    }
}

/// Keeps a child registered until dropped.
#[derive(Debug)]
pub struct Registration<'a> {
    supervisor: &'a Supervisor,
    pid: u32,
}

impl Registration<'_> {
    pub fn pid(&self) -> u32 {
        self.pid
    }
}

impl Drop for Registration<'_> {
    fn drop(&mut self) {
        self.supervisor.deregister(self.pid);
    }
}

#[cfg(unix)]
fn terminate(pid: u32) -> bool {
    let Ok(pid) = libc::pid_t::try_from(pid) else {
        return false;
    };
    // SAFETY: kill() has no memory-safety preconditions
    unsafe { libc::kill(pid, libc::SIGTERM) == 0 }
}

#[cfg(not(unix))]
fn terminate(_pid: u32) -> bool {
    false
}

#[cfg(unix)]
mod interrupt {
    //! SIGINT is turned into a byte on a self-pipe; a watcher thread reads
    //! it and runs the shutdown outside of signal context.

    use std::fs::File;
    use std::io::{self, Read};
    use std::os::fd::FromRawFd;
    use std::sync::atomic::{AtomicI32, Ordering};
    use std::sync::Arc;
    use std::thread;

    use super::Supervisor;

    static WAKE_FD: AtomicI32 = AtomicI32::new(-1);

    extern "C" fn on_sigint(_signal: libc::c_int) {
        let fd = WAKE_FD.load(Ordering::SeqCst);
        if fd >= 0 {
            let byte = 1u8;
            // SAFETY: write() is async-signal-safe and the buffer is a live local
            unsafe {
                libc::write(fd, (&byte as *const u8).cast(), 1);
            }
        }
    }

    fn set_cloexec(fd: libc::c_int) -> io::Result<()> {
        // SAFETY: fcntl on a descriptor we own
        let rc = unsafe { libc::fcntl(fd, libc::F_SETFD, libc::FD_CLOEXEC) };
        if rc == -1 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    pub(super) fn install(supervisor: Arc<Supervisor>) -> io::Result<()> {
        let mut fds = [0 as libc::c_int; 2];
        // SAFETY: fds has room for the two descriptors pipe() writes
        if unsafe { libc::pipe(fds.as_mut_ptr()) } == -1 {
            return Err(io::Error::last_os_error());
        }
        let [read_fd, write_fd] = fds;
        set_cloexec(read_fd)?;
        set_cloexec(write_fd)?;

        // SAFETY: read_fd was just created by pipe() and is owned by nobody else
        let mut wake = unsafe { File::from_raw_fd(read_fd) };
        WAKE_FD.store(write_fd, Ordering::SeqCst);

        thread::Builder::new()
            .name("shmake-interrupt".to_string())
            .spawn(move || {
                let mut byte = [0u8; 1];
                loop {
                    match wake.read(&mut byte) {
                        Ok(0) => return,
                        Ok(_) => break,
                        Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                        Err(_) => return,
                    }
                }
                tracing::debug!("Interrupted, terminating running processes");
                supervisor.interrupt();
            })?;

        let handler = on_sigint as extern "C" fn(libc::c_int);
        // SAFETY: the handler only performs an async-signal-safe write()
        let previous = unsafe { libc::signal(libc::SIGINT, handler as libc::sighandler_t) };
        if previous == libc::SIG_ERR {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }
}

#[cfg(not(unix))]
mod interrupt {
    use std::io;
    use std::sync::Arc;

    use super::Supervisor;

    pub(super) fn install(_supervisor: Arc<Supervisor>) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_and_deregister() {
        let supervisor = Supervisor::new();
        supervisor.register(42, "sleep 1");
        assert!(supervisor.contains(42));
        assert_eq!(supervisor.running(), vec![42]);

        assert!(supervisor.deregister(42));
        assert!(!supervisor.contains(42));
        assert!(!supervisor.deregister(42));
    }

    #[test]
    fn holds_several_children() {
        let supervisor = Supervisor::new();
        supervisor.register(3, "a");
        supervisor.register(1, "b");
        supervisor.register(2, "c");
        assert_eq!(supervisor.running(), vec![1, 2, 3]);
        assert_eq!(supervisor.len(), 3);
    }

    #[test]
    fn registration_drop_deregisters() {
        let supervisor = Supervisor::new();
        let mut command = Command::new("/bin/sh");
        command.args(["-c", "exit 0"]);

        let (mut child, registration) = supervisor.spawn(&mut command, "exit 0").unwrap();
        let pid = registration.pid();
        assert_eq!(pid, child.id());
        assert!(supervisor.contains(pid));

        child.wait().unwrap();
        drop(registration);
        assert!(!supervisor.contains(pid));
        assert!(supervisor.is_empty());
    }

    #[test]
    fn spawn_failure_leaves_registry_empty() {
        let supervisor = Supervisor::new();
        let mut command = Command::new("/definitely/not/a/shell");
        assert!(supervisor.spawn(&mut command, "nope").is_err());
        assert!(supervisor.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn terminate_all_signals_running_children() {
        use std::os::unix::process::ExitStatusExt;

        let supervisor = Supervisor::new();
        let mut command = Command::new("/bin/sh");
        command.args(["-c", "exec sleep 30"]);
        let (mut child, registration) = supervisor.spawn(&mut command, "sleep 30").unwrap();

        assert_eq!(supervisor.terminate_all(), 1);
        assert!(supervisor.is_empty());

        let status = child.wait().unwrap();
        assert_eq!(status.signal(), Some(libc::SIGTERM));
        drop(registration);
    }

    #[test]
    fn global_is_shared() {
        let a = Supervisor::global();
        let b = Supervisor::global();
        assert!(Arc::ptr_eq(&a, &b));
    }
}
