//! Process execution capability.
//!
//! The dispatcher in [`crate::pipeline::execute`] never spawns processes
//! itself. It hands a [`CommandSpec`] to an [`Executor`], which makes the
//! language table and failure mapping testable with a scripted fake.
//! [`ProcessExecutor`] is the production implementation on top of
//! `tokio::process`.
//!
//! Commands are run directly, never through a shell, so file names with
//! spaces or quotes need no escaping.

use async_trait::async_trait;
use std::fmt;
use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tracing::debug;

/// A program plus its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            if arg.contains(' ') {
                write!(f, " \"{arg}\"")?;
            } else {
                write!(f, " {arg}")?;
            }
        }
        Ok(())
    }
}

/// Captured result of a finished process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    pub stdout: String,
    pub stderr: String,
    /// `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Failures of the capability itself (as opposed to a program that ran and
/// exited non-zero, which is a normal [`ProcessOutput`]).
#[derive(Debug, Error)]
pub enum ExecError {
    /// The program could not be started (usually: not on `PATH`).
    #[error("failed to start `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The program did not finish in time and was killed.
    #[error("`{program}` timed out after {secs}s")]
    Timeout { program: String, secs: u64 },

    /// I/O failure while collecting the program's output.
    #[error("I/O error while running `{program}`: {source}")]
    Io {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// Runs one command to completion.
#[async_trait]
pub trait Executor: Send + Sync {
    /// Run `command` with `working_dir` as current directory, killing it if it
    /// has not finished after `timeout`.
    async fn run(
        &self,
        command: &CommandSpec,
        working_dir: &Path,
        timeout: Duration,
    ) -> Result<ProcessOutput, ExecError>;
}

/// Default cap on the bytes kept from each captured stream (1 MiB).
pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 1024 * 1024;

/// [`Executor`] backed by `tokio::process::Command`.
///
/// stdin is closed, stdout/stderr are captured and decoded lossily as UTF-8.
/// Each stream keeps at most `max_output_bytes`; the rest is read and
/// discarded so the child never blocks on a full pipe, and a note is
/// appended to the kept text. The child is spawned with `kill_on_drop`, so
/// when the timeout fires the pending wait future is dropped and the
/// process is killed.
#[derive(Debug, Clone, Copy)]
pub struct ProcessExecutor {
    max_output_bytes: usize,
}

impl Default for ProcessExecutor {
    fn default() -> Self {
        Self::with_output_limit(DEFAULT_MAX_OUTPUT_BYTES)
    }
}

impl ProcessExecutor {
    /// Keep at most `max_output_bytes` of each stream (at least 1).
    pub fn with_output_limit(max_output_bytes: usize) -> Self {
        Self {
            max_output_bytes: max_output_bytes.max(1),
        }
    }
}

#[async_trait]
impl Executor for ProcessExecutor {
    async fn run(
        &self,
        command: &CommandSpec,
        working_dir: &Path,
        timeout: Duration,
    ) -> Result<ProcessOutput, ExecError> {
        debug!("Running `{}` in {}", command, working_dir.display());
        let start = Instant::now();

        let mut child = Command::new(&command.program)
            .args(&command.args)
            .current_dir(working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ExecError::Spawn {
                program: command.program.clone(),
                source: e,
            })?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let limit = self.max_output_bytes;
        let finished = async {
            tokio::try_join!(
                read_capped(stdout, limit),
                read_capped(stderr, limit),
                child.wait(),
            )
        };

        let (stdout, stderr, status) = match tokio::time::timeout(timeout, finished).await {
            Ok(result) => result.map_err(|e| ExecError::Io {
                program: command.program.clone(),
                source: e,
            })?,
            Err(_) => {
                return Err(ExecError::Timeout {
                    program: command.program.clone(),
                    secs: timeout.as_secs(),
                })
            }
        };

        debug!(
            "`{}` finished with {:?} in {}ms",
            command.program,
            status.code(),
            start.elapsed().as_millis()
        );

        Ok(ProcessOutput {
            stdout: stdout.into_text(),
            stderr: stderr.into_text(),
            exit_code: status.code(),
        })
    }
}

/// Bytes kept from one stream, plus how many were thrown away.
#[derive(Debug, Default)]
struct Captured {
    bytes: Vec<u8>,
    dropped: u64,
}

impl Captured {
    fn into_text(self) -> String {
        let mut text = String::from_utf8_lossy(&self.bytes).into_owned();
        if self.dropped > 0 {
            if !text.ends_with('\n') {
                text.push('\n');
            }
            text.push_str(&format!(
                "[output truncated: {} more bytes not shown]",
                self.dropped
            ));
        }
        text
    }
}

/// Read `reader` to EOF, keeping the first `limit` bytes.
async fn read_capped<R: AsyncRead + Unpin>(
    reader: Option<R>,
    limit: usize,
) -> std::io::Result<Captured> {
    let mut captured = Captured::default();
    let Some(mut reader) = reader else {
        return Ok(captured);
    };
    let mut chunk = [0u8; 8192];
    loop {
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            return Ok(captured);
        }
        let keep = n.min(limit - captured.bytes.len());
        captured.bytes.extend_from_slice(&chunk[..keep]);
        captured.dropped += (n - keep) as u64;
    }
}
