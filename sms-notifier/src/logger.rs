//! Logging Infrastructure
//!
//! Console output (pretty or JSON) plus optional daily rotating files.

use std::fs;
use std::path::Path;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// File prefix for rotated logs (`sms-notifier.YYYY-MM-DD`)
const LOG_FILE_PREFIX: &str = "sms-notifier";

/// Default filter when `RUST_LOG` is unset
fn default_filter(level: &str) -> String {
    format!("sms_notifier={level},shared={level},tower_http={level}")
}

/// Initialize the logging system
///
/// * `level` - Log level for this service's targets (e.g. "info", "debug")
/// * `json_format` - JSON lines instead of the human-readable format
/// * `log_dir` - Optional directory for daily rotating log files
pub fn init_logger(level: &str, json_format: bool, log_dir: Option<&str>) -> Result<(), BoxError> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter(level)));

    let console_layer = if json_format {
        fmt::layer()
            .json()
            .with_target(true)
            .with_current_span(true)
            .with_file(false)
            .boxed()
    } else {
        fmt::layer().with_target(true).with_thread_ids(false).boxed()
    };

    let file_layer = match log_dir {
        Some(dir) => {
            fs::create_dir_all(dir)?;
            let appender = RollingFileAppender::new(Rotation::DAILY, dir, LOG_FILE_PREFIX);
            Some(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_ansi(false)
                    .with_writer(std::sync::Mutex::new(appender))
                    .boxed(),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()?;

    Ok(())
}

/// Delete rotated log files older than `days`. Returns how many were removed.
pub fn cleanup_old_logs(log_dir: &Path, days: i64) -> std::io::Result<usize> {
    let cutoff = chrono::Local::now().date_naive() - chrono::Duration::days(days);
    let prefix = format!("{LOG_FILE_PREFIX}.");
    let mut removed = 0;

    for entry in fs::read_dir(log_dir)? {
        let path = entry?.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if let Some(date_part) = name.strip_prefix(&prefix)
            && let Ok(date) = chrono::NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
            && date < cutoff
        {
            fs::remove_file(&path)?;
            tracing::info!(file = %name, "Deleted old log file");
            removed += 1;
        }
    }

    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cleanup_removes_only_old_rotated_files() {
        let dir = tempfile::tempdir().unwrap();
        let today = chrono::Local::now().date_naive();
        let old = today - chrono::Duration::days(30);

        let old_file = dir.path().join(format!("sms-notifier.{}", old.format("%Y-%m-%d")));
        let fresh_file = dir.path().join(format!("sms-notifier.{}", today.format("%Y-%m-%d")));
        let unrelated = dir.path().join("notes.txt");
        for path in [&old_file, &fresh_file, &unrelated] {
            fs::write(path, "x").unwrap();
        }

        assert_eq!(cleanup_old_logs(dir.path(), 14).unwrap(), 1);
        assert!(!old_file.exists());
        assert!(fresh_file.exists());
        assert!(unrelated.exists());
    }
}
