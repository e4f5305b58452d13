//! `shell`/`shell_filter`, with rusage accounting for the child
//! process.
//!
//! Each call spawns its own `sh -c` rather than reusing a persistent
//! marker-delimited subprocess, because mash documents do not share
//! shell state across invocations the way an interactive session
//! does.

use std::io::{Read, Write};
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use crate::context::EngineState;
use crate::error::{MashError, ShellError};

/// Wall-clock guard on every `shell()` call.
const TIMEOUT: Duration = Duration::from_secs(60_000);

/// What a completed (or non-zero but unchecked) shell invocation
/// produced, before it is lowered into a Rhai-visible value.
pub struct ShellOutcome {
    pub stdout: String,
    pub stderr: String,
    pub code: i32,
    pub user_time: f64,
    pub sys_time: f64,
}

/// Run `cmd` through a system shell in `state.workspace.build`,
/// feeding it `stdin` if given. If `check`, the first whitespace-split
/// word of `cmd` must resolve on PATH (memoized via `resolver`) and a
/// non-zero exit is a fatal [`ShellError::NonZeroExit`].
pub fn run(state: &mut EngineState, cmd: &str, stdin: Option<&str>, check: bool) -> Result<ShellOutcome, MashError> {
    run_with_timeout(state, cmd, stdin, check, TIMEOUT)
}

/// As [`run`], but with an explicit timeout — split out so tests can
/// exercise the timeout path without waiting on the real one.
fn run_with_timeout(state: &mut EngineState, cmd: &str, stdin: Option<&str>, check: bool, timeout: Duration) -> Result<ShellOutcome, MashError> {
    if check {
        let first = cmd.split_whitespace().next().unwrap_or("");
        if !state.resolver.is_executable(first) {
            return Err(ShellError::ExecutableMissing(first.to_string()).into());
        }
    }

    let mut child = Command::new("sh")
        .arg("-c")
        .arg(cmd)
        .current_dir(&state.workspace.build)
        .stdin(if stdin.is_some() { Stdio::piped() } else { Stdio::null() })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(ShellError::Spawn)?;

    if let Some(input) = stdin {
        if let Some(mut child_stdin) = child.stdin.take() {
            child_stdin.write_all(input.as_bytes()).map_err(ShellError::Spawn)?;
        }
    }

    let mut stdout_pipe = child.stdout.take().expect("stdout piped");
    let mut stderr_pipe = child.stderr.take().expect("stderr piped");
    let stdout_handle = thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = stdout_pipe.read_to_end(&mut buf);
        buf
    });
    let stderr_handle = thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = stderr_pipe.read_to_end(&mut buf);
        buf
    });

    let before = rusage_children();
    let deadline = Instant::now() + timeout;
    let status = loop {
        if let Some(status) = child.try_wait().map_err(ShellError::Spawn)? {
            break status;
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            let _ = child.wait();
            return Err(ShellError::Timeout(cmd.to_string()).into());
        }
        thread::sleep(Duration::from_millis(20));
    };
    let after = rusage_children();

    let stdout = String::from_utf8_lossy(&stdout_handle.join().unwrap_or_default()).into_owned();
    let stderr = String::from_utf8_lossy(&stderr_handle.join().unwrap_or_default()).into_owned();
    let code = status.code().unwrap_or(-1);

    if check && code != 0 {
        return Err(ShellError::NonZeroExit { cmd: cmd.to_string(), code, stdout, stderr }.into());
    }

    Ok(ShellOutcome {
        stdout,
        stderr,
        code,
        user_time: after.0 - before.0,
        sys_time: after.1 - before.1,
    })
}

#[cfg(unix)]
fn rusage_children() -> (f64, f64) {
    let mut usage: libc::rusage = unsafe { std::mem::zeroed() };
    unsafe {
        libc::getrusage(libc::RUSAGE_CHILDREN, &mut usage);
    }
    let user = usage.ru_utime.tv_sec as f64 + usage.ru_utime.tv_usec as f64 / 1_000_000.0;
    let sys = usage.ru_stime.tv_sec as f64 + usage.ru_stime.tv_usec as f64 / 1_000_000.0;
    (user, sys)
}

#[cfg(not(unix))]
fn rusage_children() -> (f64, f64) {
    (0.0, 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workspace::Workspace;
    use tempfile::tempdir;

    fn new_state(dir: &std::path::Path) -> EngineState {
        let workspace = Workspace::new(dir.to_path_buf(), dir.to_path_buf());
        workspace.rotate().unwrap();
        EngineState::new(workspace, vec![], dir.to_path_buf())
    }

    #[test]
    fn checked_non_zero_exit_is_fatal() {
        let dir = tempdir().unwrap();
        let mut state = new_state(dir.path());
        let err = run(&mut state, "exit 3", None, true).unwrap_err();
        match err {
            MashError::Shell(ShellError::NonZeroExit { code, .. }) => assert_eq!(code, 3),
            other => panic!("expected NonZeroExit, got {other:?}"),
        }
    }

    #[test]
    fn unchecked_non_zero_exit_is_reported_not_raised() {
        let dir = tempdir().unwrap();
        let mut state = new_state(dir.path());
        let outcome = run(&mut state, "exit 3", None, false).unwrap();
        assert_eq!(outcome.code, 3);
    }

    #[test]
    fn checked_missing_executable_is_fatal_before_spawning() {
        let dir = tempdir().unwrap();
        let mut state = new_state(dir.path());
        let err = run(&mut state, "this-executable-does-not-exist-anywhere", None, true).unwrap_err();
        assert!(matches!(err, MashError::Shell(ShellError::ExecutableMissing(_))));
    }

    #[test]
    fn stdin_is_piped_to_the_child_and_stdout_captured() {
        let dir = tempdir().unwrap();
        let mut state = new_state(dir.path());
        let outcome = run(&mut state, "cat", Some("hello"), true).unwrap();
        assert_eq!(outcome.stdout, "hello");
    }

    #[test]
    fn a_command_that_outlives_its_timeout_is_killed() {
        let dir = tempdir().unwrap();
        let mut state = new_state(dir.path());
        let err = run_with_timeout(&mut state, "sleep 5", None, true, Duration::from_millis(50)).unwrap_err();
        assert!(matches!(err, MashError::Shell(ShellError::Timeout(_))));
    }
}
