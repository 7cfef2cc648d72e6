// Process bridge: the single point of contact with the external cq decoder

use bytes::Bytes;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Where the decoder lives when nothing else is configured
pub const DEFAULT_BINARY_PATH: &str = "public/cq";

/// One decoder run: command-line arguments plus optional stdin payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessInvocation {
    arguments: Vec<String>,
    input: Option<Bytes>,
}

impl ProcessInvocation {
    pub fn new<I, S>(arguments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            arguments: arguments.into_iter().map(Into::into).collect(),
            input: None,
        }
    }

    /// Attach bytes to be written to the decoder's standard input
    pub fn with_input(mut self, input: impl Into<Bytes>) -> Self {
        self.input = Some(input.into());
        self
    }

    pub fn arguments(&self) -> &[String] {
        &self.arguments
    }

    pub fn input(&self) -> Option<&Bytes> {
        self.input.as_ref()
    }
}

/// Errors produced by the bridge
///
/// Only [`BridgeError::Failed`] means the decoder actually ran and rejected
/// its input; every other variant is a deployment or runtime problem.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("cq binary not found at {}. Please ensure the binary is built and available.", .0.display())]
    BinaryNotFound(PathBuf),

    #[error("Failed to spawn cq process: {0}")]
    Launch(#[source] io::Error),

    #[error("I/O error while collecting cq output: {0}")]
    Io(#[source] io::Error),

    #[error("{stderr}")]
    Failed {
        stderr: String,
        /// `None` when the process was terminated by a signal
        exit_code: Option<i32>,
    },

    #[error("cq did not finish within {}ms", .0.as_millis())]
    TimedOut(Duration),
}

impl BridgeError {
    /// Build a decode failure, synthesizing a message when stderr was empty
    pub fn failed(stderr: impl Into<String>, exit_code: Option<i32>) -> Self {
        let mut stderr = stderr.into();
        if stderr.is_empty() {
            stderr = match exit_code {
                Some(code) => format!("cq exited with code {}", code),
                None => "cq was terminated by a signal".to_string(),
            };
        }
        Self::Failed { stderr, exit_code }
    }

    /// True when the decoder ran and reported a problem with its input
    pub fn is_decode_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::Failed { exit_code, .. } => *exit_code,
            _ => None,
        }
    }
}

/// Runs the decoder binary as a subprocess, one process per invocation
#[derive(Debug, Clone)]
pub struct ProcessBridge {
    binary: PathBuf,
    timeout: Option<Duration>,
}

impl ProcessBridge {
    /// Create a bridge for the binary at `binary`
    ///
    /// Fails with [`BridgeError::BinaryNotFound`] when nothing exists at the
    /// path; callers treat that as fatal at startup.
    pub fn new(binary: impl Into<PathBuf>) -> Result<Self, BridgeError> {
        let binary = binary.into();
        if !binary.exists() {
            return Err(BridgeError::BinaryNotFound(binary));
        }

        Ok(Self {
            binary,
            timeout: None,
        })
    }

    /// Kill the decoder and fail with [`BridgeError::TimedOut`] after `timeout`
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Run the decoder and return its stdout on exit code 0
    pub async fn invoke(&self, invocation: &ProcessInvocation) -> Result<String, BridgeError> {
        let started = Instant::now();

        tracing::debug!(
            binary = %self.binary.display(),
            args = ?invocation.arguments(),
            input_bytes = invocation.input().map(Bytes::len).unwrap_or(0),
            "Invoking decoder"
        );

        let output = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, self.run(invocation))
                .await
                .map_err(|_| {
                    tracing::warn!(timeout_ms = limit.as_millis() as u64, "Decoder timed out");
                    BridgeError::TimedOut(limit)
                })??,
            None => self.run(invocation).await?,
        };

        let duration_ms = started.elapsed().as_millis() as u64;

        if output.status.success() {
            tracing::info!(exit_code = 0, duration_ms, "Decoder invocation completed");
            return Ok(String::from_utf8_lossy(&output.stdout).into_owned());
        }

        let exit_code = output.status.code();
        tracing::warn!(exit_code = ?exit_code, duration_ms, "Decoder reported failure");

        Err(BridgeError::failed(
            String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code,
        ))
    }

    /// Spawn, feed stdin and drain stdout/stderr concurrently
    ///
    /// The child is killed if this future is dropped before it completes.
    async fn run(&self, invocation: &ProcessInvocation) -> Result<Output, BridgeError> {
        let mut child = Command::new(&self.binary)
            .args(invocation.arguments())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                tracing::error!(binary = %self.binary.display(), error = %e, "Failed to spawn decoder");
                BridgeError::Launch(e)
            })?;

        let stdin = child.stdin.take();
        let payload = invocation.input().cloned();

        let feed = async move {
            let Some(mut stdin) = stdin else {
                return Ok(());
            };
            if let Some(payload) = payload {
                match stdin.write_all(&payload).await {
                    // The decoder may exit without reading everything
                    Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {}
                    other => other?,
                }
            }
            // Dropping the handle closes the pipe so the decoder sees EOF
            drop(stdin);
            Ok::<(), io::Error>(())
        };

        let (fed, output) = tokio::join!(feed, child.wait_with_output());

        if let Err(e) = fed {
            tracing::warn!(error = %e, "Failed to write decoder input");
        }

        output.map_err(BridgeError::Io)
    }
}
