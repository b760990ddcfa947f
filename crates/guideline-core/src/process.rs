//! Bounded execution of external commands for bootstrap steps.
//!
//! Commands run through `sh -c` in their own process group, with
//! stdout/stderr captured on helper threads. The parent polls `try_wait`
//! until the deadline and kills the whole group when it is exceeded, so
//! nothing the shell started outlives the step. A timeout is an ordinary
//! error.

use crate::error::{GuidelineError, Result};
use std::io::Read;
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Characters of stderr kept in a `CommandFailed` error.
const STDERR_EXCERPT: usize = 500;

#[derive(Debug, Clone)]
pub struct ShellOutput {
    pub stdout: String,
    pub stderr: String,
}

/// True if `program` resolves on `PATH`.
pub fn command_available(program: &str) -> bool {
    which::which(program).is_ok()
}

/// Run `command` with `sh -c` in `cwd`, killing it after `timeout`.
///
/// Non-zero exit is `CommandFailed`, exceeding the deadline is `StepTimeout`.
pub fn run_shell(command: &str, cwd: &Path, timeout: Duration) -> Result<ShellOutput> {
    let mut cmd = Command::new("sh");
    cmd.arg("-c")
        .arg(command)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        cmd.process_group(0);
    }
    let mut child = cmd.spawn()?;

    let stdout = spawn_reader(child.stdout.take());
    let stderr = spawn_reader(child.stderr.take());

    let deadline = Instant::now() + timeout;
    let status = loop {
        if let Some(status) = child.try_wait()? {
            break status;
        }
        if Instant::now() >= deadline {
            kill_tree(&mut child);
            let _ = child.wait();
            return Err(GuidelineError::StepTimeout {
                seconds: timeout.as_secs(),
            });
        }
        thread::sleep(POLL_INTERVAL);
    };

    let stdout = join_reader(stdout);
    let stderr = join_reader(stderr);

    if !status.success() {
        let code = status
            .code()
            .map(|c| c.to_string())
            .unwrap_or_else(|| "signal".to_string());
        return Err(GuidelineError::CommandFailed {
            code,
            stderr: stderr.trim().chars().take(STDERR_EXCERPT).collect(),
        });
    }

    Ok(ShellOutput { stdout, stderr })
}

/// Kill the child and every process in its group.
#[cfg(unix)]
fn kill_tree(child: &mut Child) {
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    let pgid = Pid::from_raw(child.id() as i32);
    if let Err(e) = killpg(pgid, Signal::SIGKILL) {
        tracing::debug!(pid = child.id(), error = %e, "killpg failed, killing child only");
        let _ = child.kill();
    }
}

#[cfg(not(unix))]
fn kill_tree(child: &mut Child) {
    let _ = child.kill();
}

fn spawn_reader<R: Read + Send + 'static>(pipe: Option<R>) -> Option<JoinHandle<String>> {
    pipe.map(|mut r| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = r.read_to_end(&mut buf);
            String::from_utf8_lossy(&buf).into_owned()
        })
    })
}

fn join_reader(handle: Option<JoinHandle<String>>) -> String {
    handle
        .and_then(|h| h.join().ok())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn captures_stdout() {
        let dir = TempDir::new().unwrap();
        let out = run_shell("echo hello", dir.path(), Duration::from_secs(5)).unwrap();
        assert_eq!(out.stdout, "hello\n");
    }

    #[test]
    fn runs_in_given_directory() {
        let dir = TempDir::new().unwrap();
        run_shell("touch marker", dir.path(), Duration::from_secs(5)).unwrap();
        assert!(dir.path().join("marker").exists());
    }

    #[test]
    fn non_zero_exit_is_command_failed() {
        let dir = TempDir::new().unwrap();
        let err = run_shell("echo boom >&2; exit 3", dir.path(), Duration::from_secs(5))
            .unwrap_err();
        match err {
            GuidelineError::CommandFailed { code, stderr } => {
                assert_eq!(code, "3");
                assert_eq!(stderr, "boom");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn slow_command_times_out() {
        let dir = TempDir::new().unwrap();
        let started = Instant::now();
        let err = run_shell("sleep 10", dir.path(), Duration::from_millis(200)).unwrap_err();
        assert!(matches!(err, GuidelineError::StepTimeout { .. }));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn timeout_kills_commands_started_by_the_shell() {
        let dir = TempDir::new().unwrap();
        let err = run_shell(
            "sh -c 'sleep 1; touch survived'; true",
            dir.path(),
            Duration::from_millis(200),
        )
        .unwrap_err();
        assert!(matches!(err, GuidelineError::StepTimeout { .. }));

        std::thread::sleep(Duration::from_millis(1800));
        assert!(!dir.path().join("survived").exists());
    }

    #[test]
    fn command_available_finds_sh() {
        assert!(command_available("sh"));
        assert!(!command_available("definitely-not-a-real-program-xyz"));
    }
}
