/// The polling-and-capture loop: prune logs, check for the exit-signal file,
/// probe liveness, and when the channel is live run one capture to completion
/// before sleeping and probing again.
///
/// One logical sequence, one capture at a time. The exit-signal file is only
/// observed at the top of a probing phase; an in-flight capture is never
/// interrupted by it.
use chrono::Local;

use crate::capture::{CaptureStatus, Capturer};
use crate::config::Config;
use crate::logfile::{LogLevel, LogManager};
use crate::notify::Notifier;
use crate::probe::{ProbeOutcome, Prober};

/// Why the loop stopped, mapped to the process exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// The exit-signal file was present at the start of a cycle.
    Requested,
    /// The auth token was rejected; retrying would fail identically.
    CredentialInvalid,
}

impl ExitReason {
    pub fn code(self) -> u8 {
        match self {
            ExitReason::Requested => 0,
            ExitReason::CredentialInvalid => 1,
        }
    }
}

enum State {
    Probing,
    Capturing(String),
    Sleeping,
    Terminating(ExitReason),
}

pub struct Supervisor {
    config: Config,
    channel: String,
    logs: LogManager,
    prober: Box<dyn Prober>,
    capturer: Box<dyn Capturer>,
    notifier: Box<dyn Notifier>,
}

impl Supervisor {
    pub fn new(
        config: Config,
        channel: impl Into<String>,
        logs: LogManager,
        prober: Box<dyn Prober>,
        capturer: Box<dyn Capturer>,
        notifier: Box<dyn Notifier>,
    ) -> Self {
        Self {
            config,
            channel: channel.into(),
            logs,
            prober,
            capturer,
            notifier,
        }
    }

    /// Validate the configured credential with a single probe before entering
    /// the loop. Returns the exit reason if the token is rejected; any other
    /// outcome (live, offline, tool error) is left for the loop to handle.
    pub async fn preflight(&self) -> Option<ExitReason> {
        if self.config.auth_token.is_none() {
            return None;
        }
        match self.prober.probe().await {
            Ok(ProbeOutcome::CredentialInvalid) => Some(self.credential_rejected().await),
            Ok(_) => None,
            Err(e) => {
                self.logs
                    .append(LogLevel::Warn, &format!("startup probe failed: {e}"));
                None
            }
        }
    }

    /// Drive the state machine until it terminates.
    pub async fn run(&self) -> ExitReason {
        let mut state = State::Probing;
        loop {
            state = match state {
                State::Probing => self.probing().await,
                State::Capturing(url) => self.capturing(&url).await,
                State::Sleeping => {
                    tokio::time::sleep(self.config.interval).await;
                    State::Probing
                }
                State::Terminating(reason) => return reason,
            };
        }
    }

    async fn probing(&self) -> State {
        self.logs.prune(self.config.retention_days);

        if self.config.exit_file.exists() {
            self.logs
                .append(LogLevel::Info, "exit file detected, shutting down");
            return State::Terminating(ExitReason::Requested);
        }

        match self.prober.probe().await {
            Ok(ProbeOutcome::Offline) => {
                self.logs
                    .append(LogLevel::Info, &format!("{} is offline", self.channel));
                State::Sleeping
            }
            Ok(ProbeOutcome::Live(url)) => {
                self.logs
                    .append(LogLevel::Info, &format!("{} is online", self.channel));
                self.notifier
                    .notify(&format!("{} is live, recording started", self.channel))
                    .await;
                State::Capturing(url)
            }
            Ok(ProbeOutcome::CredentialInvalid) => {
                State::Terminating(self.credential_rejected().await)
            }
            // Tool invocation trouble is transient as far as the loop is
            // concerned; the next cycle retries.
            Err(e) => {
                self.logs
                    .append(LogLevel::Warn, &format!("probe failed: {e}"));
                State::Sleeping
            }
        }
    }

    async fn capturing(&self, url: &str) -> State {
        let started = Local::now();
        let output_path = self.config.video_dir.join(format!(
            "{}_{}.mp4",
            self.channel,
            started.format("%Y%m%d_%H%M%S")
        ));

        if let Err(e) = std::fs::create_dir_all(&self.config.video_dir) {
            self.logs.append(
                LogLevel::Warn,
                &format!("could not create video directory: {e}"),
            );
            return State::Sleeping;
        }
        let log_path = match self.logs.download_log_path(started) {
            Ok(path) => path,
            Err(e) => {
                self.logs.append(
                    LogLevel::Warn,
                    &format!("could not create log directory: {e}"),
                );
                return State::Sleeping;
            }
        };

        self.logs.append(
            LogLevel::Info,
            &format!("recording {} to {}", url, output_path.display()),
        );

        match self.capturer.capture(url, &output_path, &log_path).await {
            Ok(CaptureStatus::Success) => {
                self.logs.append(
                    LogLevel::Info,
                    &format!("capture complete: {}", output_path.display()),
                );
            }
            Ok(CaptureStatus::Failed(code)) => {
                self.logs.append(
                    LogLevel::Warn,
                    &format!("capture failed with exit code {code}"),
                );
            }
            Ok(CaptureStatus::Signaled) => {
                self.logs
                    .append(LogLevel::Warn, "capture terminated by signal");
            }
            Err(e) => {
                self.logs
                    .append(LogLevel::Warn, &format!("capture error: {e}"));
            }
        }

        State::Sleeping
    }

    async fn credential_rejected(&self) -> ExitReason {
        self.logs.append(
            LogLevel::Error,
            "auth token rejected by the platform, shutting down",
        );
        self.notifier
            .notify(&format!(
                "{} watcher stopping: auth token rejected",
                self.channel
            ))
            .await;
        ExitReason::CredentialInvalid
    }
}

/// True when `name` resolves to a file somewhere on PATH. Used by startup
/// preconditions so a missing tool fails fast instead of on the first probe.
pub fn tool_on_path(name: &str) -> bool {
    let Some(paths) = std::env::var_os("PATH") else {
        return false;
    };
    std::env::split_paths(&paths).any(|dir| dir.join(name).is_file())
}
