/// Liveness probing via streamlink: ask for a playable stream URL and
/// classify the result as live, offline, or a dead credential.
use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::Command;

/// Verbatim marker streamlink prints when the Twitch auth token is rejected.
/// This is an external contract with the tool's error text; if streamlink
/// ever rewords it, credential failures degrade to plain Offline.
pub const UNAUTHORIZED_MARKER: &str = "unauthorized";

/// Result of one liveness probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// Channel is live; payload is the playable stream URL.
    Live(String),
    /// Channel is not currently streaming. Not an error.
    Offline,
    /// The auth token was rejected. Fatal for the whole run: every
    /// subsequent probe would fail the same way.
    CredentialInvalid,
}

/// Errors invoking the resolution tool itself (not probe outcomes).
#[derive(Debug)]
pub enum ProbeError {
    Spawn { source: std::io::Error },
}

impl std::fmt::Display for ProbeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProbeError::Spawn { source } => {
                write!(f, "failed to run resolution tool: {}", source)
            }
        }
    }
}

impl std::error::Error for ProbeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ProbeError::Spawn { source } => Some(source),
        }
    }
}

/// Capability interface for the supervisor; tests inject a scripted fake.
#[async_trait]
pub trait Prober: Send + Sync {
    async fn probe(&self) -> Result<ProbeOutcome, ProbeError>;
}

/// Real prober backed by the streamlink CLI.
pub struct StreamlinkProber {
    channel: String,
    auth_token: Option<String>,
}

impl StreamlinkProber {
    pub const COMMAND: &'static str = "streamlink";

    pub fn new(channel: impl Into<String>, auth_token: Option<String>) -> Self {
        Self {
            channel: channel.into(),
            auth_token,
        }
    }
}

#[async_trait]
impl Prober for StreamlinkProber {
    async fn probe(&self) -> Result<ProbeOutcome, ProbeError> {
        let args = build_args(&self.channel, self.auth_token.as_deref());
        tracing::debug!(command = Self::COMMAND, channel = %self.channel, "probing liveness");

        // Probe output is a URL or a short error message, safe to buffer.
        let output = Command::new(Self::COMMAND)
            .args(&args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| ProbeError::Spawn { source: e })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        Ok(classify(output.status.success(), &stdout, &stderr))
    }
}

/// Build the streamlink invocation. The auth header is only attached when a
/// token is present; streamlink probes anonymously otherwise.
fn build_args(channel: &str, auth_token: Option<&str>) -> Vec<String> {
    let mut args = Vec::new();
    if let Some(token) = auth_token {
        args.push("--twitch-api-header".to_string());
        args.push(format!("Authorization=OAuth {token}"));
    }
    args.push("--stream-url".to_string());
    args.push(format!("twitch.tv/{channel}"));
    args.push("best".to_string());
    args
}

/// Classify combined tool output into a probe outcome.
///
/// The unauthorized marker wins over the exit code: streamlink exits nonzero
/// both for "channel offline" and "token rejected", and only the message text
/// separates the two.
pub fn classify(exit_ok: bool, stdout: &str, stderr: &str) -> ProbeOutcome {
    if stdout.contains(UNAUTHORIZED_MARKER) || stderr.contains(UNAUTHORIZED_MARKER) {
        return ProbeOutcome::CredentialInvalid;
    }
    if !exit_ok {
        return ProbeOutcome::Offline;
    }
    match stdout.trim().lines().next() {
        Some(url) if !url.is_empty() => ProbeOutcome::Live(url.trim().to_string()),
        _ => ProbeOutcome::Offline,
    }
}
