//! `piper` command-line backend.
//!
//! Runs `piper --model <voice> --output_file <path>` directly (no shell) and
//! feeds the text on stdin. Each run is bounded by a timeout; the child is
//! killed if it overruns.

use std::io;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use super::{TtsBackend, TtsError};

#[derive(Debug, Clone)]
pub struct PiperProcess {
    program: String,
    voice: String,
    timeout: Duration,
}

impl PiperProcess {
    pub fn new(program: impl Into<String>, voice: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            voice: voice.into(),
            timeout,
        }
    }

    fn spawn_error(&self, err: io::Error) -> TtsError {
        if err.kind() == io::ErrorKind::NotFound {
            TtsError::EngineMissing(self.program.clone())
        } else {
            TtsError::Io(err)
        }
    }
}

#[async_trait]
impl TtsBackend for PiperProcess {
    fn name(&self) -> &'static str {
        "piper"
    }

    async fn check(&self) -> Result<String, TtsError> {
        let run = Command::new(&self.program)
            .arg("--version")
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(self.timeout, run)
            .await
            .map_err(|_| TtsError::Timeout(self.timeout))?
            .map_err(|e| self.spawn_error(e))?;

        if !output.status.success() {
            return Err(TtsError::Process {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
            });
        }
        Ok(format!(
            "{} {}",
            self.program,
            String::from_utf8_lossy(&output.stdout).trim()
        ))
    }

    async fn synthesize(&self, text: &str, output: &Path) -> Result<(), TtsError> {
        debug!(program = %self.program, voice = %self.voice, output = %output.display(), "running piper");

        let mut child = Command::new(&self.program)
            .arg("--model")
            .arg(&self.voice)
            .arg("--output_file")
            .arg(output)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| self.spawn_error(e))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| TtsError::Io(io::Error::other("piper stdin was not captured")))?;
        let input = format!("{text}\n");

        let run = async move {
            // A piper that exits before reading (bad voice, bad flags) closes
            // the pipe; its exit status and stderr are the error to report.
            match stdin.write_all(input.as_bytes()).await {
                Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
                    debug!("piper closed stdin before reading the text");
                }
                other => other?,
            }
            // Closing stdin is piper's end-of-input signal.
            drop(stdin);
            child.wait_with_output().await
        };

        let finished = tokio::time::timeout(self.timeout, run)
            .await
            .map_err(|_| TtsError::Timeout(self.timeout))??;

        if !finished.status.success() {
            return Err(TtsError::Process {
                status: finished.status.to_string(),
                stderr: String::from_utf8_lossy(&finished.stderr).trim().to_owned(),
            });
        }
        Ok(())
    }
}
