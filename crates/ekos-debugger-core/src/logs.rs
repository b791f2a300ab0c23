//! Captured process output and saving it to timestamped text files

use chrono::{DateTime, Local, TimeZone};
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Timestamp format used in saved log file names
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H-%M-%S";

#[derive(Error, Debug)]
pub enum LogError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("No directory selected for saving logs")]
    NoDirectory,
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),
}

/// Accumulated output of one stream
#[derive(Debug, Clone, Default, Serialize)]
pub struct LogBuffer {
    lines: Vec<String>,
}

impl LogBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk of output. Surrounding whitespace is trimmed and blank
    /// chunks are dropped.
    pub fn append(&mut self, chunk: &str) {
        let chunk = chunk.trim();
        if !chunk.is_empty() {
            self.lines.push(chunk.to_string());
        }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Whole log as one string, one chunk per line
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }
}

/// Which stream a line came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stream {
    /// Standard output; carries the debugger's own output
    Debug,
    /// Standard error; carries the application's log
    App,
}

/// Debug and application logs of one supervised target
#[derive(Debug, Clone, Default, Serialize)]
pub struct TargetLogs {
    pub debug: LogBuffer,
    pub app: LogBuffer,
}

impl TargetLogs {
    pub fn append(&mut self, stream: Stream, chunk: &str) {
        match stream {
            Stream::Debug => self.debug.append(chunk),
            Stream::App => self.app.append(chunk),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.debug.is_empty() && self.app.is_empty()
    }
}

/// Paths written by [`save_logs`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedLogs {
    pub debug: PathBuf,
    pub app: PathBuf,
}

/// File name for a saved log, e.g. `indi_debug_log_2024-03-01T21-04-59.txt`
pub fn log_file_name<Tz: TimeZone>(prefix: &str, kind: &str, timestamp: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!("{}_{}_log_{}.txt", prefix, kind, timestamp.format(TIMESTAMP_FORMAT))
}

/// Write both logs of a target into `dir`
pub fn save_logs(
    dir: &Path,
    prefix: &str,
    logs: &TargetLogs,
    timestamp: &DateTime<Local>,
) -> Result<SavedLogs, LogError> {
    if dir.as_os_str().is_empty() {
        return Err(LogError::NoDirectory);
    }
    if !dir.is_dir() {
        return Err(LogError::NotADirectory(dir.to_path_buf()));
    }

    let saved = SavedLogs {
        debug: dir.join(log_file_name(prefix, "debug", timestamp)),
        app: dir.join(log_file_name(prefix, "app", timestamp)),
    };
    std::fs::write(&saved.debug, format!("{}\n", logs.debug.text()))?;
    std::fs::write(&saved.app, format!("{}\n", logs.app.text()))?;
    Ok(saved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn fixed_time() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 3, 1, 21, 4, 59).unwrap()
    }

    #[test]
    fn test_append_trims_and_skips_blank() {
        let mut log = LogBuffer::new();
        log.append("  Starting program: /usr/bin/kstars\n");
        log.append("\n\n");
        log.append("[Inferior 1 (process 4242) exited normally]\r\n");

        assert_eq!(log.len(), 2);
        assert_eq!(
            log.text(),
            "Starting program: /usr/bin/kstars\n[Inferior 1 (process 4242) exited normally]"
        );

        log.clear();
        assert!(log.is_empty());
    }

    #[test]
    fn test_streams_are_separate() {
        let mut logs = TargetLogs::default();
        logs.append(Stream::Debug, "Thread 1 \"kstars\" received signal SIGSEGV");
        logs.append(Stream::App, "org.kde.kstars.ekos: Loading profile");

        assert_eq!(logs.debug.lines(), ["Thread 1 \"kstars\" received signal SIGSEGV"]);
        assert_eq!(logs.app.lines(), ["org.kde.kstars.ekos: Loading profile"]);
    }

    #[test]
    fn test_log_file_name() {
        assert_eq!(
            log_file_name("kstars", "debug", &fixed_time()),
            "kstars_debug_log_2024-03-01T21-04-59.txt"
        );
    }

    #[test]
    fn test_save_logs() {
        let dir = TempDir::new().unwrap();
        let mut logs = TargetLogs::default();
        logs.append(Stream::Debug, "#0  0x00007f in raise ()");
        logs.append(Stream::App, "INDI: driver started");
        logs.append(Stream::App, "INDI: client connected");

        let saved = save_logs(dir.path(), "indi", &logs, &fixed_time()).unwrap();
        assert!(saved.debug.ends_with("indi_debug_log_2024-03-01T21-04-59.txt"));
        assert!(saved.app.ends_with("indi_app_log_2024-03-01T21-04-59.txt"));

        let app = std::fs::read_to_string(&saved.app).unwrap();
        assert_eq!(app, "INDI: driver started\nINDI: client connected\n");
    }

    #[test]
    fn test_save_logs_requires_directory() {
        let logs = TargetLogs::default();
        assert!(matches!(
            save_logs(Path::new(""), "kstars", &logs, &fixed_time()),
            Err(LogError::NoDirectory)
        ));

        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing");
        assert!(matches!(
            save_logs(&missing, "kstars", &logs, &fixed_time()),
            Err(LogError::NotADirectory(_))
        ));
    }
}
