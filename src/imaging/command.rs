//! Blocking subprocess runner for the external tools.
//!
//! Every tool invocation goes through [`ToolCommand::run`], which:
//!
//! 1. logs the full command line at `debug` level,
//! 2. spawns the program with stdin closed,
//! 3. drains captured stdout on a dedicated reader thread *while* the child
//!    runs, so a large metadata dump can never fill the pipe buffer and
//!    deadlock the child against our `wait`,
//! 4. waits for exit, killing the child once the timeout elapses.
//!
//! A launch failure, a non-zero exit, and a timeout all surface as
//! [`BackendError`] variants.

use super::backend::BackendError;
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::io::{self, BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use tracing::debug;

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// What to do with the child's standard streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Collect stdout line by line; stderr goes to ours.
    Capture,
    /// Both streams go to ours.
    Inherit,
    /// stdout is dropped; stderr goes to ours.
    DiscardStdout,
    /// Both streams are dropped.
    Discard,
}

/// A single external program invocation.
#[derive(Debug, Clone)]
pub struct ToolCommand {
    program: PathBuf,
    args: Vec<OsString>,
    current_dir: Option<PathBuf>,
}

impl ToolCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            current_dir: None,
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    /// Run in `dir`. Ignored if `dir` is empty (a bare relative file name).
    pub fn current_dir(mut self, dir: Option<&Path>) -> Self {
        self.current_dir = dir
            .filter(|d| !d.as_os_str().is_empty())
            .map(Path::to_path_buf);
        self
    }

    pub fn program_name(&self) -> String {
        self.program.display().to_string()
    }

    /// Run to completion. Returns captured stdout lines ([`OutputMode::Capture`]
    /// only; empty otherwise).
    pub fn run(&self, mode: OutputMode, timeout: Option<Duration>) -> Result<Vec<String>, BackendError> {
        let mut command = Command::new(&self.program);
        command.args(&self.args).stdin(Stdio::null());
        if let Some(dir) = &self.current_dir {
            command.current_dir(dir);
        }
        let (stdout, stderr) = match mode {
            OutputMode::Capture => (Stdio::piped(), Stdio::inherit()),
            OutputMode::Inherit => (Stdio::inherit(), Stdio::inherit()),
            OutputMode::DiscardStdout => (Stdio::null(), Stdio::inherit()),
            OutputMode::Discard => (Stdio::null(), Stdio::null()),
        };
        command.stdout(stdout).stderr(stderr);

        debug!(command = %self, "running");
        let mut child = command.spawn().map_err(|source| BackendError::Launch {
            program: self.program_name(),
            source,
        })?;

        let reader = match child.stdout.take() {
            Some(out) => {
                let spawned = thread::Builder::new()
                    .name("tool-stdout".into())
                    .spawn(move || collect_lines(out));
                match spawned {
                    Ok(handle) => Some(handle),
                    Err(e) => {
                        reap(&mut child);
                        return Err(e.into());
                    }
                }
            }
            None => None,
        };

        let status = match wait_with_timeout(&mut child, timeout) {
            Ok(status) => status,
            Err(e) => {
                reap(&mut child);
                if let Some(handle) = reader {
                    let _ = handle.join();
                }
                return Err(e.into());
            }
        };

        // The child is gone (exited or killed), so the pipe is closed and the
        // reader reaches EOF.
        let lines = match reader {
            Some(handle) => handle.join().map_err(|_| {
                BackendError::ProcessingFailed(format!(
                    "stdout reader for {} panicked",
                    self.program_name()
                ))
            })??,
            None => Vec::new(),
        };

        match status {
            None => Err(BackendError::TimedOut {
                program: self.program_name(),
                timeout: timeout.unwrap_or_default(),
            }),
            Some(status) if !status.success() => Err(BackendError::Failed {
                program: self.program_name(),
                status: describe_status(status),
            }),
            Some(_) => Ok(lines),
        }
    }
}

impl fmt::Display for ToolCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            let arg = arg.to_string_lossy();
            if arg.contains(char::is_whitespace) {
                write!(f, " \"{arg}\"")?;
            } else {
                write!(f, " {arg}")?;
            }
        }
        Ok(())
    }
}

/// Read a stream to EOF, splitting on `\n`. Invalid UTF-8 is replaced rather
/// than failing the read.
fn collect_lines(stream: impl Read) -> io::Result<Vec<String>> {
    let mut reader = BufReader::new(stream);
    let mut lines = Vec::new();
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        while matches!(buf.last(), Some(b'\n' | b'\r')) {
            buf.pop();
        }
        lines.push(String::from_utf8_lossy(&buf).into_owned());
    }
    Ok(lines)
}

/// Wait for the child. `Ok(None)` means it was killed after `timeout`.
fn wait_with_timeout(child: &mut Child, timeout: Option<Duration>) -> io::Result<Option<ExitStatus>> {
    let Some(timeout) = timeout else {
        return child.wait().map(Some);
    };
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if Instant::now() >= deadline {
            // May race with a natural exit; either way we reap below.
            let _ = child.kill();
            child.wait()?;
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

/// Kill and wait for a child that is being abandoned on an error path.
fn reap(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

fn describe_status(status: ExitStatus) -> String {
    match status.code() {
        Some(code) => format!("exit code {code}"),
        None => "terminated by signal".to_string(),
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(script: &str) -> ToolCommand {
        ToolCommand::new("sh").arg("-c").arg(script)
    }

    #[test]
    fn captures_stdout_lines() {
        let lines = sh("printf 'one\\ntwo\\r\\nthree'")
            .run(OutputMode::Capture, None)
            .unwrap();
        assert_eq!(lines, vec!["one", "two", "three"]);
    }

    #[test]
    fn non_zero_exit_is_failure() {
        let err = sh("exit 3").run(OutputMode::Discard, None).unwrap_err();
        match err {
            BackendError::Failed { program, status } => {
                assert_eq!(program, "sh");
                assert_eq!(status, "exit code 3");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn missing_program_is_launch_failure() {
        let err = ToolCommand::new("definitely-not-a-real-tool-4f1c")
            .run(OutputMode::Capture, None)
            .unwrap_err();
        assert!(matches!(err, BackendError::Launch { .. }));
    }

    #[test]
    fn large_output_does_not_deadlock() {
        // Far more than a pipe buffer holds
        let lines = sh("i=0; while [ $i -lt 50000 ]; do echo \"<Tag:Line>$i</Tag:Line>\"; i=$((i+1)); done")
            .run(OutputMode::Capture, Some(Duration::from_secs(60)))
            .unwrap();
        assert_eq!(lines.len(), 50000);
        assert_eq!(lines[49999], "<Tag:Line>49999</Tag:Line>");
    }

    #[test]
    fn slow_tool_times_out() {
        let started = Instant::now();
        let err = sh("exec sleep 10")
            .run(OutputMode::Capture, Some(Duration::from_millis(200)))
            .unwrap_err();
        assert!(matches!(err, BackendError::TimedOut { .. }));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn abandoned_child_is_killed_and_reaped() {
        let mut child = Command::new("sleep")
            .arg("10")
            .stdout(Stdio::piped())
            .spawn()
            .unwrap();
        let started = Instant::now();

        reap(&mut child);

        // Already reaped: the exit status is available without blocking
        assert!(child.try_wait().unwrap().is_some());
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn runs_in_current_dir() {
        let tmp = tempfile::TempDir::new().unwrap();
        let lines = ToolCommand::new("pwd")
            .current_dir(Some(tmp.path()))
            .run(OutputMode::Capture, None)
            .unwrap();
        let reported = std::fs::canonicalize(&lines[0]).unwrap();
        assert_eq!(reported, std::fs::canonicalize(tmp.path()).unwrap());
    }

    #[test]
    fn display_quotes_arguments_with_spaces() {
        let cmd = ToolCommand::new("exiftool").arg("-X").arg("/in/my photo.jpg");
        assert_eq!(cmd.to_string(), "exiftool -X \"/in/my photo.jpg\"");
    }
}
