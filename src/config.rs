use std::path::PathBuf;
use std::time::Duration;

/// Default seconds between poll cycles.
const DEFAULT_INTERVAL_SECS: u64 = 55;

/// Default log retention window in days.
const DEFAULT_RETENTION_DAYS: u64 = 3;

/// Immutable runtime configuration, resolved once at startup from the
/// environment and CLI overrides, then passed by reference to each component.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory where finished recordings land (`VIDEO_DIR`, `~` expanded).
    pub video_dir: PathBuf,
    /// Pause between poll cycles (`INTERVAL`, seconds).
    pub interval: Duration,
    /// Twitch OAuth token (`TWITCH_AUTH_TOKEN`). Absence warns, never blocks.
    pub auth_token: Option<String>,
    /// Discord webhook endpoint (`DISCORD_WEBHOOK_URL`).
    pub webhook_url: Option<String>,
    /// Discord user id to @-mention in notifications (`DISCORD_MENTION_TARGET_ID`).
    pub mention_target: Option<String>,
    /// Directory holding watch/download logs.
    pub log_dir: PathBuf,
    /// Marker file whose existence requests a graceful shutdown.
    pub exit_file: PathBuf,
    /// Log files older than this many days are pruned each cycle.
    pub retention_days: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            video_dir: PathBuf::from("."),
            interval: Duration::from_secs(DEFAULT_INTERVAL_SECS),
            auth_token: None,
            webhook_url: None,
            mention_target: None,
            log_dir: PathBuf::from("logs"),
            exit_file: PathBuf::from("exit.txt"),
            retention_days: DEFAULT_RETENTION_DAYS,
        }
    }
}

impl Config {
    /// Build a Config from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a Config from an arbitrary variable lookup. Split out from
    /// `from_env` so tests don't have to mutate process-global state.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Config::default();

        if let Some(dir) = get("VIDEO_DIR") {
            config.video_dir = expand_tilde(&dir, get("HOME").as_deref());
        }

        if let Some(raw) = get("INTERVAL") {
            match raw.trim().parse::<u64>() {
                Ok(secs) => config.interval = Duration::from_secs(secs),
                Err(_) => tracing::warn!(
                    value = %raw,
                    default_secs = DEFAULT_INTERVAL_SECS,
                    "INTERVAL is not a valid number of seconds, using default"
                ),
            }
        }

        config.auth_token = get("TWITCH_AUTH_TOKEN").filter(|t| !t.is_empty());
        config.webhook_url = get("DISCORD_WEBHOOK_URL").filter(|u| !u.is_empty());
        config.mention_target = get("DISCORD_MENTION_TARGET_ID").filter(|i| !i.is_empty());

        config
    }

    /// Status tag recorded in every watch-log line so operators can tell at a
    /// glance whether the run had a credential.
    pub fn credential_tag(&self) -> &'static str {
        if self.auth_token.is_some() {
            "(token set)"
        } else {
            "(no token)"
        }
    }
}

/// Expand a leading `~/` (or bare `~`) against the home directory.
/// Paths without the shorthand pass through unchanged, as does everything
/// when no home directory is known.
fn expand_tilde(path: &str, home: Option<&str>) -> PathBuf {
    let Some(home) = home else {
        return PathBuf::from(path);
    };
    if path == "~" {
        return PathBuf::from(home);
    }
    match path.strip_prefix("~/") {
        Some(rest) => PathBuf::from(home).join(rest),
        None => PathBuf::from(path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_env_empty() {
        let config = Config::from_lookup(lookup(&[]));
        assert_eq!(config.video_dir, PathBuf::from("."));
        assert_eq!(config.interval, Duration::from_secs(55));
        assert!(config.auth_token.is_none());
        assert!(config.webhook_url.is_none());
        assert_eq!(config.log_dir, PathBuf::from("logs"));
        assert_eq!(config.exit_file, PathBuf::from("exit.txt"));
        assert_eq!(config.retention_days, 3);
    }

    #[test]
    fn test_interval_parsed_from_env() {
        let config = Config::from_lookup(lookup(&[("INTERVAL", "120")]));
        assert_eq!(config.interval, Duration::from_secs(120));
    }

    #[test]
    fn test_bad_interval_falls_back_to_default() {
        let config = Config::from_lookup(lookup(&[("INTERVAL", "soon")]));
        assert_eq!(config.interval, Duration::from_secs(55));
    }

    #[test]
    fn test_video_dir_tilde_expansion() {
        let config = Config::from_lookup(lookup(&[
            ("VIDEO_DIR", "~/videos"),
            ("HOME", "/home/op"),
        ]));
        assert_eq!(config.video_dir, PathBuf::from("/home/op/videos"));
    }

    #[test]
    fn test_video_dir_absolute_passes_through() {
        let config = Config::from_lookup(lookup(&[
            ("VIDEO_DIR", "/srv/vods"),
            ("HOME", "/home/op"),
        ]));
        assert_eq!(config.video_dir, PathBuf::from("/srv/vods"));
    }

    #[test]
    fn test_tilde_without_home_passes_through() {
        let config = Config::from_lookup(lookup(&[("VIDEO_DIR", "~/videos")]));
        assert_eq!(config.video_dir, PathBuf::from("~/videos"));
    }

    #[test]
    fn test_bare_tilde_expands_to_home() {
        assert_eq!(expand_tilde("~", Some("/home/op")), PathBuf::from("/home/op"));
    }

    #[test]
    fn test_empty_token_treated_as_absent() {
        let config = Config::from_lookup(lookup(&[("TWITCH_AUTH_TOKEN", "")]));
        assert!(config.auth_token.is_none());
        assert_eq!(config.credential_tag(), "(no token)");
    }

    #[test]
    fn test_credential_tag_reflects_token() {
        let config = Config::from_lookup(lookup(&[("TWITCH_AUTH_TOKEN", "oauth-abc")]));
        assert_eq!(config.credential_tag(), "(token set)");
    }

    #[test]
    fn test_notifier_settings() {
        let config = Config::from_lookup(lookup(&[
            ("DISCORD_WEBHOOK_URL", "https://discord.example/hook"),
            ("DISCORD_MENTION_TARGET_ID", "1234"),
        ]));
        assert_eq!(
            config.webhook_url.as_deref(),
            Some("https://discord.example/hook")
        );
        assert_eq!(config.mention_target.as_deref(), Some("1234"));
    }
}
