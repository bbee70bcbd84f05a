//! Cancellable child process slot shared by the command-line speech engines
//!
//! A slot runs at most one process at a time from the engine's point of view.
//! `cancel` bumps a generation counter and wakes the running `run` call, which
//! kills its child. On Unix the running child can also be paused and resumed
//! with SIGSTOP/SIGCONT.

use std::io;
use std::process::{ExitStatus, Stdio};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tokio::sync::Notify;

/// How a slot run ended
#[derive(Debug)]
pub(crate) enum ProcessOutcome {
    Finished {
        status: ExitStatus,
        stdout: String,
        stderr: String,
    },
    Cancelled,
}

#[derive(Debug, Default)]
pub(crate) struct ProcessSlot {
    pid: Mutex<Option<u32>>,
    generation: AtomicU64,
    cancelled: Notify,
}

impl ProcessSlot {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn set_pid(&self, pid: Option<u32>) {
        let mut guard = self.pid.lock().unwrap_or_else(|e| e.into_inner());
        *guard = pid;
    }

    /// Forget `pid` unless a later run has already registered its own
    fn clear_pid(&self, pid: Option<u32>) {
        let mut guard = self.pid.lock().unwrap_or_else(|e| e.into_inner());
        if *guard == pid {
            *guard = None;
        }
    }

    pub(crate) fn pid(&self) -> Option<u32> {
        *self.pid.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub(crate) fn is_running(&self) -> bool {
        self.pid().is_some()
    }

    /// Spawn `command` and wait for it, unless `cancel` is called first
    pub(crate) async fn run(&self, mut command: Command) -> io::Result<ProcessOutcome> {
        let generation = self.generation.load(Ordering::SeqCst);

        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = command.spawn()?;
        let pid = child.id();
        self.set_pid(pid);

        let mut stdout = child.stdout.take();
        let mut stderr = child.stderr.take();

        let cancelled = async {
            loop {
                let notified = self.cancelled.notified();
                if self.generation.load(Ordering::SeqCst) != generation {
                    break;
                }
                notified.await;
            }
        };

        let finished = tokio::select! {
            result = async {
                let read_out = async {
                    let mut buf = String::new();
                    if let Some(out) = stdout.as_mut() {
                        let _ = out.read_to_string(&mut buf).await;
                    }
                    buf
                };
                let read_err = async {
                    let mut buf = String::new();
                    if let Some(err) = stderr.as_mut() {
                        let _ = err.read_to_string(&mut buf).await;
                    }
                    buf
                };
                tokio::join!(child.wait(), read_out, read_err)
            } => Some(result),
            _ = cancelled => None,
        };

        let outcome = match finished {
            Some((status, stdout, stderr)) => status.map(|status| ProcessOutcome::Finished {
                status,
                stdout,
                stderr,
            }),
            None => {
                let _ = child.start_kill();
                let _ = child.wait().await;
                Ok(ProcessOutcome::Cancelled)
            }
        };

        self.clear_pid(pid);
        outcome
    }

    /// Stop whatever is running now
    pub(crate) fn cancel(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.cancelled.notify_waiters();
    }

    /// Suspend the running process; returns false when nothing was paused
    pub(crate) fn pause(&self) -> bool {
        self.signal(Signal::Stop)
    }

    /// Continue a suspended process
    pub(crate) fn resume(&self) -> bool {
        self.signal(Signal::Continue)
    }

    #[cfg(unix)]
    fn signal(&self, signal: Signal) -> bool {
        let Some(pid) = self.pid() else {
            return false;
        };
        let signo = match signal {
            Signal::Stop => libc::SIGSTOP,
            Signal::Continue => libc::SIGCONT,
        };
        // SAFETY: pid is a process ID obtained from tokio::process::Child.
        unsafe { libc::kill(pid as libc::pid_t, signo) == 0 }
    }

    #[cfg(not(unix))]
    fn signal(&self, _signal: Signal) -> bool {
        false
    }
}

#[derive(Debug, Clone, Copy)]
enum Signal {
    Stop,
    Continue,
}
