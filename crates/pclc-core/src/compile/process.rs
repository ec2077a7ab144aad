//! Bounded execution of external processes.
//!
//! Children are polled rather than waited on so a time limit or an abort
//! request can kill them mid-flight.

use std::io::Read;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::error::{Error, Result};

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Thread-safe cancellation flag shared with in-flight processes.
///
/// Cloning shares the flag; aborting any clone kills every process being
/// supervised under it at its next poll.
#[derive(Debug, Clone, Default)]
pub struct AbortHandle {
    aborted: Arc<AtomicBool>,
}

impl AbortHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn abort(&self) {
        if !self.aborted.swap(true, Ordering::SeqCst) {
            tracing::debug!("Abort requested");
        }
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::SeqCst)
    }
}

/// Captured output of a finished process.
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

/// Run a command to completion with stdout and stderr captured.
///
/// `what` names the process in errors. On Unix the command runs in its own
/// process group, so a timeout or abort also kills anything it spawned.
pub fn run_captured(
    mut cmd: Command,
    what: &str,
    timeout: Option<Duration>,
    abort: &AbortHandle,
) -> Result<ProcessOutput> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        cmd.process_group(0);
    }

    let mut child = spawn(&mut cmd, what)?;
    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());

    let status = supervise(&mut child, what, timeout, abort, KillScope::Group)?;

    Ok(ProcessOutput {
        status,
        stdout: collect(stdout),
        stderr: collect(stderr),
    })
}

/// Run a command with inherited stdio, without a time limit.
///
/// The child stays in the terminal's foreground process group.
pub fn run_inherited(mut cmd: Command, what: &str, abort: &AbortHandle) -> Result<ExitStatus> {
    let mut child = spawn(&mut cmd, what)?;
    supervise(&mut child, what, None, abort, KillScope::Child)
}

/// What a timeout or abort kills.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KillScope {
    /// Only the direct child
    Child,
    /// The process group led by the child
    Group,
}

fn spawn(cmd: &mut Command, what: &str) -> Result<Child> {
    cmd.spawn()
        .map_err(|e| Error::Toolchain(format!("failed to start {}: {}", what, e)))
}

fn supervise(
    child: &mut Child,
    what: &str,
    timeout: Option<Duration>,
    abort: &AbortHandle,
    scope: KillScope,
) -> Result<ExitStatus> {
    let started = Instant::now();

    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(status);
        }

        if abort.is_aborted() {
            kill(child, what, scope);
            return Err(Error::Aborted);
        }

        if let Some(limit) = timeout.filter(|limit| started.elapsed() >= *limit) {
            kill(child, what, scope);
            return Err(Error::Timeout {
                what: what.to_string(),
                seconds: limit.as_secs(),
            });
        }

        thread::sleep(POLL_INTERVAL);
    }
}

fn kill(child: &mut Child, what: &str, scope: KillScope) {
    #[cfg(unix)]
    {
        if scope == KillScope::Group {
            let pgid = child.id() as libc::pid_t;
            // SIGKILL to the negated pid reaches every process in the group
            if unsafe { libc::kill(-pgid, libc::SIGKILL) } == 0 {
                let _ = child.wait();
                return;
            }
            tracing::debug!(
                "Failed to kill process group of {}: {}",
                what,
                std::io::Error::last_os_error()
            );
        }
    }
    #[cfg(not(unix))]
    let _ = scope;

    if let Err(e) = child.kill() {
        tracing::warn!("Failed to kill {}: {}", what, e);
    }
    // Reap the zombie
    let _ = child.wait();
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<JoinHandle<String>> {
    pipe.map(|mut pipe| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf);
            String::from_utf8_lossy(&buf).into_owned()
        })
    })
}

fn collect(handle: Option<JoinHandle<String>>) -> String {
    handle
        .and_then(|handle| handle.join().ok())
        .unwrap_or_default()
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn test_captures_output_and_status() {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", "echo out; echo err >&2; exit 3"]);

        let output = run_captured(cmd, "sh", None, &AbortHandle::new()).expect("sh runs");
        assert_eq!(output.status.code(), Some(3));
        assert_eq!(output.stdout.trim(), "out");
        assert_eq!(output.stderr.trim(), "err");
    }

    #[test]
    fn test_timeout_kills_child() {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", "sleep 5"]);

        let started = Instant::now();
        let err = run_captured(
            cmd,
            "sleeper",
            Some(Duration::from_millis(100)),
            &AbortHandle::new(),
        )
        .expect_err("must time out");

        assert!(matches!(err, Error::Timeout { ref what, .. } if what == "sleeper"));
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[test]
    fn test_abort_kills_child() {
        let abort = AbortHandle::new();
        let trigger = abort.clone();
        let canceller = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            trigger.abort();
        });

        let mut cmd = Command::new("sh");
        cmd.args(["-c", "sleep 5"]);
        let err = run_captured(cmd, "sleeper", None, &abort).expect_err("must abort");

        canceller.join().expect("canceller thread");
        assert!(matches!(err, Error::Aborted));
        assert!(abort.is_aborted());
    }

    #[cfg(target_os = "linux")]
    fn is_running(pid: &str) -> bool {
        // Zombies count as gone; only their parent can reap them.
        std::fs::read_to_string(format!("/proc/{}/stat", pid))
            .map(|stat| {
                stat.rsplit(')')
                    .next()
                    .is_some_and(|rest| !rest.trim_start().starts_with('Z'))
            })
            .unwrap_or(false)
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_timeout_kills_grandchildren() {
        let temp = tempfile::TempDir::new().expect("Failed to create temp dir");
        let pid_file = temp.path().join("grandchild.pid");

        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(format!(
            "sleep 30 >/dev/null 2>&1 & echo $! > '{}'; wait",
            pid_file.display()
        ));

        let err = run_captured(
            cmd,
            "compiler",
            Some(Duration::from_millis(200)),
            &AbortHandle::new(),
        )
        .expect_err("must time out");
        assert!(matches!(err, Error::Timeout { .. }));

        let pid = std::fs::read_to_string(&pid_file).expect("grandchild pid");
        let pid = pid.trim();

        let deadline = Instant::now() + Duration::from_secs(2);
        while is_running(pid) && Instant::now() < deadline {
            thread::sleep(POLL_INTERVAL);
        }
        assert!(!is_running(pid), "grandchild {} survived the timeout", pid);
    }

    #[test]
    fn test_missing_program() {
        let cmd = Command::new("pclc-no-such-program");
        let err = run_captured(cmd, "ghost", None, &AbortHandle::new()).expect_err("spawn fails");
        assert!(err.to_string().contains("failed to start ghost"));
    }
}
