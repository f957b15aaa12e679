/// Single capture lifecycle: spawn the capture subprocess against a resolved
/// stream URL, stream its diagnostics to the download log, and report the
/// exit status.
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Instant;
use tokio::process::Command;

/// How a capture subprocess ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureStatus {
    /// Exit code 0; the output file should be a complete recording.
    Success,
    /// Nonzero exit code. Not fatal; the next cycle re-probes.
    Failed(i32),
    /// Killed by a signal, no exit code available.
    Signaled,
}

/// Errors that can occur while running a capture.
#[derive(Debug)]
pub enum CaptureError {
    /// Failed to open the download log file.
    LogFile {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed to spawn the capture subprocess.
    Spawn { source: std::io::Error },
    /// Failed while waiting for the subprocess.
    Io { source: std::io::Error },
}

impl std::fmt::Display for CaptureError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CaptureError::LogFile { path, source } => {
                write!(
                    f,
                    "failed to open download log {}: {}",
                    path.display(),
                    source
                )
            }
            CaptureError::Spawn { source } => {
                write!(f, "failed to spawn capture subprocess: {}", source)
            }
            CaptureError::Io { source } => {
                write!(f, "I/O error during capture: {}", source)
            }
        }
    }
}

impl std::error::Error for CaptureError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CaptureError::LogFile { source, .. } => Some(source),
            CaptureError::Spawn { source } => Some(source),
            CaptureError::Io { source } => Some(source),
        }
    }
}

/// Capability interface for the supervisor; tests inject a recording fake.
#[async_trait]
pub trait Capturer: Send + Sync {
    async fn capture(
        &self,
        url: &str,
        output_path: &Path,
        log_path: &Path,
    ) -> Result<CaptureStatus, CaptureError>;
}

/// Real capturer backed by the ffmpeg CLI in stream-copy mode.
pub struct FfmpegCapturer;

impl FfmpegCapturer {
    pub const COMMAND: &'static str = "ffmpeg";
}

#[async_trait]
impl Capturer for FfmpegCapturer {
    async fn capture(
        &self,
        url: &str,
        output_path: &Path,
        log_path: &Path,
    ) -> Result<CaptureStatus, CaptureError> {
        let args = build_args(url, output_path);
        run_to_log(Self::COMMAND, &args, log_path).await
    }
}

/// Build the ffmpeg invocation: copy both streams without re-encoding.
fn build_args(url: &str, output_path: &Path) -> Vec<String> {
    vec![
        "-hide_banner".to_string(),
        "-i".to_string(),
        url.to_string(),
        "-c".to_string(),
        "copy".to_string(),
        output_path.to_string_lossy().into_owned(),
    ]
}

/// Spawn `command`, wire its stdout+stderr to `log_path` in append mode, and
/// wait for it to exit.
///
/// The file descriptor is handed to the child directly, so diagnostics flow
/// to disk for the whole capture (hours) without passing through this
/// process's memory. Blocks the calling cycle until the child exits.
async fn run_to_log(
    command: &str,
    args: &[String],
    log_path: &Path,
) -> Result<CaptureStatus, CaptureError> {
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
        .map_err(|e| CaptureError::LogFile {
            path: log_path.to_path_buf(),
            source: e,
        })?;
    // Second handle for stderr since File doesn't impl Clone.
    let log_file_stderr = log_file.try_clone().map_err(|e| CaptureError::LogFile {
        path: log_path.to_path_buf(),
        source: e,
    })?;

    tracing::info!(
        command,
        args = ?args,
        log = %log_path.display(),
        "spawning capture subprocess"
    );

    let start = Instant::now();

    let mut child = Command::new(command)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::from(log_file))
        .stderr(Stdio::from(log_file_stderr))
        .spawn()
        .map_err(|e| CaptureError::Spawn { source: e })?;

    let pid = child.id().unwrap_or(0);
    tracing::info!(pid, "capture subprocess started");

    let status = child.wait().await.map_err(|e| CaptureError::Io { source: e })?;

    let outcome = match status.code() {
        Some(0) => CaptureStatus::Success,
        Some(code) => CaptureStatus::Failed(code),
        None => CaptureStatus::Signaled,
    };
    tracing::info!(
        ?outcome,
        duration_secs = start.elapsed().as_secs(),
        "capture subprocess completed"
    );

    Ok(outcome)
}
