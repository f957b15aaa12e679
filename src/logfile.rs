/// Dual-sink logging: every line goes to a per-channel log file and is
/// mirrored to the operator console via `tracing`. Watch logs bucket by
/// calendar day; download logs bucket by the minute a capture started, so
/// each capture session gets its own file.
use chrono::{DateTime, Local};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

/// Which log family a line belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogKind {
    /// Poll-cycle journal, one file per day.
    Watch,
    /// Capture-tool diagnostics, one file per capture session.
    Download,
}

/// Severity recorded in the file line and used to pick the console level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn as_str(self) -> &'static str {
        match self {
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        }
    }
}

/// Owns log path derivation, appends, and retention pruning for one channel.
#[derive(Debug, Clone)]
pub struct LogManager {
    channel: String,
    dir: PathBuf,
    credential_tag: &'static str,
}

impl LogManager {
    pub fn new(channel: impl Into<String>, dir: impl Into<PathBuf>, credential_tag: &'static str) -> Self {
        Self {
            channel: channel.into(),
            dir: dir.into(),
            credential_tag,
        }
    }

    /// Path of the log file a line written at `at` belongs to.
    /// Deterministic in (channel, kind, timestamp); collisions just append.
    pub fn path_for(&self, kind: LogKind, at: DateTime<Local>) -> PathBuf {
        let name = match kind {
            LogKind::Watch => format!("{}_watch_{}.log", self.channel, at.format("%Y%m%d")),
            LogKind::Download => {
                format!("{}_download_{}.log", self.channel, at.format("%Y%m%d_%H%M"))
            }
        };
        self.dir.join(name)
    }

    /// Append one formatted line to the watch log and mirror it to the console.
    /// File-sink failures are reported to the console and swallowed; a full
    /// disk must not take down the poll loop.
    pub fn append(&self, level: LogLevel, message: &str) {
        self.append_at(level, message, Local::now());
    }

    pub fn append_at(&self, level: LogLevel, message: &str, at: DateTime<Local>) {
        match level {
            LogLevel::Info => tracing::info!(channel = %self.channel, "{message}"),
            LogLevel::Warn => tracing::warn!(channel = %self.channel, "{message}"),
            LogLevel::Error => tracing::error!(channel = %self.channel, "{message}"),
        }

        let line = format!(
            "[{}] {} {}: {}",
            level.as_str(),
            at.format("%Y-%m-%d %H:%M:%S"),
            self.credential_tag,
            message
        );
        if let Err(e) = self.write_line(LogKind::Watch, at, &line) {
            tracing::warn!(error = %e, "could not write watch log line");
        }
    }

    fn write_line(&self, kind: LogKind, at: DateTime<Local>, line: &str) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.path_for(kind, at))?;
        writeln!(file, "{line}")?;
        Ok(())
    }

    /// Resolve the download-log path for a capture starting at `at`, creating
    /// the log directory so the capture subprocess can open it.
    pub fn download_log_path(&self, at: DateTime<Local>) -> std::io::Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)?;
        Ok(self.path_for(LogKind::Download, at))
    }

    /// Delete log files whose mtime is older than `retention_days`.
    /// Each file is handled independently: a stat or delete failure on one
    /// entry is logged and the scan continues.
    pub fn prune(&self, retention_days: u64) {
        let cutoff = SystemTime::now() - Duration::from_secs(retention_days * 24 * 60 * 60);

        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            // Nothing logged yet, or the directory vanished. Not a problem.
            Err(_) => return,
        };

        for entry in entries {
            let path = match entry {
                Ok(entry) => entry.path(),
                Err(e) => {
                    tracing::warn!(error = %e, "could not read log directory entry");
                    continue;
                }
            };
            if let Err(e) = prune_one(&path, cutoff) {
                tracing::warn!(path = %path.display(), error = %e, "could not prune log file");
            }
        }
    }
}

fn prune_one(path: &Path, cutoff: SystemTime) -> std::io::Result<()> {
    let modified = std::fs::metadata(path)?.modified()?;
    if modified < cutoff {
        std::fs::remove_file(path)?;
        tracing::info!(path = %path.display(), "pruned expired log file");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_time() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 3, 5, 14, 30, 45).unwrap()
    }

    #[test]
    fn test_watch_path_buckets_by_day() {
        let logs = LogManager::new("foo", "/var/log/recwatch", "(no token)");
        assert_eq!(
            logs.path_for(LogKind::Watch, fixed_time()),
            PathBuf::from("/var/log/recwatch/foo_watch_20240305.log")
        );
    }

    #[test]
    fn test_download_path_buckets_by_minute() {
        let logs = LogManager::new("foo", "logs", "(no token)");
        assert_eq!(
            logs.path_for(LogKind::Download, fixed_time()),
            PathBuf::from("logs/foo_download_20240305_1430.log")
        );
    }

    #[test]
    fn test_append_creates_dir_and_formats_line() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("logs");
        let logs = LogManager::new("foo", &dir, "(token set)");

        logs.append_at(LogLevel::Info, "foo is offline", fixed_time());

        let contents =
            std::fs::read_to_string(logs.path_for(LogKind::Watch, fixed_time())).unwrap();
        assert_eq!(
            contents,
            "[INFO] 2024-03-05 14:30:45 (token set): foo is offline\n"
        );
    }

    #[test]
    fn test_append_accumulates_same_day_lines() {
        let tmp = tempfile::tempdir().unwrap();
        let logs = LogManager::new("foo", tmp.path(), "(no token)");

        logs.append_at(LogLevel::Info, "first", fixed_time());
        logs.append_at(LogLevel::Warn, "second", fixed_time());

        let contents =
            std::fs::read_to_string(logs.path_for(LogKind::Watch, fixed_time())).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("[INFO]"));
        assert!(lines[1].starts_with("[WARN]"));
        assert!(lines[1].ends_with(": second"));
    }

    #[test]
    fn test_prune_removes_only_expired_files() {
        let tmp = tempfile::tempdir().unwrap();
        let logs = LogManager::new("foo", tmp.path(), "(no token)");

        let old = tmp.path().join("foo_watch_20200101.log");
        let fresh = tmp.path().join("foo_watch_20990101.log");
        std::fs::write(&old, "stale\n").unwrap();
        std::fs::write(&fresh, "fresh\n").unwrap();

        let four_days_ago = SystemTime::now() - Duration::from_secs(4 * 24 * 60 * 60);
        filetime::set_file_mtime(&old, filetime::FileTime::from_system_time(four_days_ago))
            .unwrap();

        logs.prune(3);

        assert!(!old.exists());
        assert!(fresh.exists());
    }

    #[test]
    fn test_prune_keeps_file_at_threshold() {
        let tmp = tempfile::tempdir().unwrap();
        let logs = LogManager::new("foo", tmp.path(), "(no token)");

        let file = tmp.path().join("foo_watch_20240101.log");
        std::fs::write(&file, "x\n").unwrap();
        // Just inside the window.
        let almost = SystemTime::now() - Duration::from_secs(3 * 24 * 60 * 60 - 60);
        filetime::set_file_mtime(&file, filetime::FileTime::from_system_time(almost)).unwrap();

        logs.prune(3);
        assert!(file.exists());
    }

    #[test]
    fn test_prune_failure_on_one_entry_does_not_stop_scan() {
        let tmp = tempfile::tempdir().unwrap();
        let logs = LogManager::new("foo", tmp.path(), "(no token)");

        // A directory entry makes remove_file fail for that entry.
        let decoy = tmp.path().join("aaa_subdir");
        std::fs::create_dir(&decoy).unwrap();
        let old = tmp.path().join("zzz_watch_old.log");
        std::fs::write(&old, "stale\n").unwrap();

        let four_days_ago = SystemTime::now() - Duration::from_secs(4 * 24 * 60 * 60);
        filetime::set_file_mtime(&decoy, filetime::FileTime::from_system_time(four_days_ago))
            .unwrap();
        filetime::set_file_mtime(&old, filetime::FileTime::from_system_time(four_days_ago))
            .unwrap();

        logs.prune(3);

        assert!(decoy.exists());
        assert!(!old.exists());
    }

    #[test]
    fn test_prune_missing_dir_is_noop() {
        let logs = LogManager::new("foo", "/nonexistent/recwatch-logs", "(no token)");
        logs.prune(3);
    }

    #[test]
    fn test_download_log_path_creates_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("logs");
        let logs = LogManager::new("foo", &dir, "(no token)");

        let path = logs.download_log_path(fixed_time()).unwrap();
        assert!(dir.exists());
        assert_eq!(path, dir.join("foo_download_20240305_1430.log"));
    }
}
