// src/logging.rs
//
// Timestamped stderr logging with an optional log file sink.
//
// `tlog!` is the general entry point. `port_log!` tags a line with the serial
// port it concerns, so a log covering several devices stays readable.

use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

const LOG_FILE_SUFFIX: &str = "firmata-serial.log";

/// Mirror of stderr output, present while file logging is active
static LOG_SINK: Mutex<Option<LogSink>> = Mutex::new(None);

struct LogSink {
    path: PathBuf,
    file: File,
}

fn sink() -> MutexGuard<'static, Option<LogSink>> {
    match LOG_SINK.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Wall-clock prefix used on every line
pub fn timestamp() -> String {
    chrono::Local::now().format("%H:%M:%S%.3f").to_string()
}

/// Write one already formatted message. Used by the logging macros.
#[doc(hidden)]
pub fn emit(message: std::fmt::Arguments<'_>) {
    let line = format!("{} {}", timestamp(), message);
    eprintln!("{}", line);
    if let Some(active) = sink().as_mut() {
        let _ = writeln!(active.file, "{}", line);
    }
}

/// Start mirroring log lines into a new timestamped file under `log_dir`.
///
/// On Unix a `firmata-serial.log` symlink is pointed at the newest file.
/// Returns the path of the file being written.
pub fn init_file_logging(log_dir: &Path) -> io::Result<PathBuf> {
    std::fs::create_dir_all(log_dir)?;

    let filename = format!("{}-{}", chrono::Local::now().format("%Y%m%d-%H%M%S"), LOG_FILE_SUFFIX);
    let path = log_dir.join(&filename);
    let file = std::fs::OpenOptions::new().create(true).append(true).open(&path)?;

    #[cfg(unix)]
    {
        let latest = log_dir.join(LOG_FILE_SUFFIX);
        let _ = std::fs::remove_file(&latest);
        if let Err(e) = std::os::unix::fs::symlink(&filename, &latest) {
            crate::tlog!("[logging] Could not link {}: {}", latest.display(), e);
        }
    }

    *sink() = Some(LogSink { path: path.clone(), file });
    crate::tlog!("[logging] Writing log to {}", path.display());
    Ok(path)
}

/// Stop mirroring into the log file. Returns the file that was closed.
pub fn stop_file_logging() -> Option<PathBuf> {
    let closed = sink().take().map(|sink| sink.path);
    if let Some(path) = &closed {
        crate::tlog!("[logging] Closed {}", path.display());
    }
    closed
}

/// Timestamped log line on stderr, mirrored to the log file when enabled.
#[macro_export]
macro_rules! tlog {
    ($($arg:tt)*) => {
        $crate::logging::emit(format_args!($($arg)*))
    };
}

/// `tlog!` tagged with a serial port name: `[Serial:COM3] message`.
#[macro_export]
macro_rules! port_log {
    ($port:expr, $($arg:tt)*) => {
        $crate::logging::emit(format_args!("[Serial:{}] {}", $port, format_args!($($arg)*)))
    };
}
