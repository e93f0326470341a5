//! Process Supervisor (E), `spec.md` §4.4.
//!
//! Grounded on `injection/mod_tools.rs`'s command building (`CREATE_NO_WINDOW`
//! on every spawned command) and `examples/original_source/injection/overlay/process_manager.py`'s
//! `stop_overlay_process` (graceful `terminate()` + bounded wait, `kill()` on
//! timeout). Output capture via reader threads into a bounded buffer is new:
//! the teacher uses `Command::output()` (which buffers unboundedly and
//! blocks until exit) for `mkoverlay` and a bare `.spawn()` with inherited
//! pipes for `runoverlay`; `spec.md`'s "never left connected to a blocking
//! pipe" rules both out for a command with no wall-clock bound on the child.

use std::io::Read;
use std::process::{Child, Command, Stdio};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

#[cfg(target_os = "windows")]
use std::os::windows::process::CommandExt;

#[cfg(target_os = "windows")]
pub const CREATE_NO_WINDOW: u32 = 0x0800_0000;

/// Output is either captured up to a bounded size or discarded, never left
/// attached to an unread OS pipe (`spec.md` §4.4 rationale).
#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Capture,
    Null,
}

const CAPTURE_BUFFER_CAP: usize = 64 * 1024;

pub enum Exit {
    Exited(i32),
    TimedOut,
    Killed,
}

pub struct Supervised {
    child: Child,
    stdout_rx: Option<mpsc::Receiver<Vec<u8>>>,
    stderr_rx: Option<mpsc::Receiver<Vec<u8>>>,
}

impl Supervised {
    /// `spawn(cmd, stdout_mode, stderr_mode, priority_boost) -> Child`.
    pub fn spawn(
        mut command: Command,
        stdout_mode: OutputMode,
        stderr_mode: OutputMode,
        priority_boost: bool,
    ) -> std::io::Result<Self> {
        command.stdin(Stdio::null());
        command.stdout(match stdout_mode {
            OutputMode::Capture => Stdio::piped(),
            OutputMode::Null => Stdio::null(),
        });
        command.stderr(match stderr_mode {
            OutputMode::Capture => Stdio::piped(),
            OutputMode::Null => Stdio::null(),
        });

        #[cfg(target_os = "windows")]
        command.creation_flags(CREATE_NO_WINDOW);

        let mut child = command.spawn()?;

        if priority_boost {
            boost_priority(&child);
        }

        let stdout_rx = child.stdout.take().map(drain_bounded);
        let stderr_rx = child.stderr.take().map(drain_bounded);

        Ok(Self {
            child,
            stdout_rx,
            stderr_rx,
        })
    }

    /// `wait(child, timeout) -> Exit`. Polls `try_wait` at a short cadence;
    /// on timeout, kills the child and drains whatever output arrived.
    pub fn wait(&mut self, timeout: Duration) -> Exit {
        let deadline = Instant::now() + timeout;
        loop {
            match self.child.try_wait() {
                Ok(Some(status)) => {
                    return Exit::Exited(status.code().unwrap_or(-1));
                }
                Ok(None) => {
                    if Instant::now() >= deadline {
                        self.kill();
                        return Exit::TimedOut;
                    }
                    thread::sleep(Duration::from_millis(50));
                }
                Err(_) => return Exit::Killed,
            }
        }
    }

    /// Graceful-then-forced shutdown, matching `stop_overlay_process`: a
    /// best-effort kill with no separate SIGTERM concept on this platform,
    /// so "graceful" here means giving `try_wait` one more bounded look
    /// before declaring the process gone.
    pub fn kill(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }

    pub fn captured_stdout(&self) -> Vec<u8> {
        self.stdout_rx
            .as_ref()
            .and_then(|rx| rx.try_recv().ok())
            .unwrap_or_default()
    }

    pub fn captured_stderr(&self) -> Vec<u8> {
        self.stderr_rx
            .as_ref()
            .and_then(|rx| rx.try_recv().ok())
            .unwrap_or_default()
    }
}

fn drain_bounded<R: Read + Send + 'static>(mut pipe: R) -> mpsc::Receiver<Vec<u8>> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut buf = Vec::with_capacity(CAPTURE_BUFFER_CAP);
        let mut chunk = [0u8; 4096];
        loop {
            match pipe.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => {
                    if buf.len() < CAPTURE_BUFFER_CAP {
                        let take = n.min(CAPTURE_BUFFER_CAP - buf.len());
                        buf.extend_from_slice(&chunk[..take]);
                    }
                    // Once the cap is hit, keep draining the pipe (so the
                    // child never blocks on a full OS buffer) without
                    // growing `buf` further.
                }
                Err(_) => break,
            }
        }
        let _ = tx.send(buf);
    });
    rx
}

#[cfg(target_os = "windows")]
fn boost_priority(child: &Child) {
    use windows::Win32::System::Threading::{
        OpenProcess, SetPriorityClass, ABOVE_NORMAL_PRIORITY_CLASS, PROCESS_SET_INFORMATION,
    };
    unsafe {
        if let Ok(handle) = OpenProcess(PROCESS_SET_INFORMATION, false, child.id()) {
            // Failure here is non-fatal per spec.md: priority boost is
            // best-effort.
            let _ = SetPriorityClass(handle, ABOVE_NORMAL_PRIORITY_CLASS);
            let _ = windows::Win32::Foundation::CloseHandle(handle);
        }
    }
}

#[cfg(not(target_os = "windows"))]
fn boost_priority(_child: &Child) {}
