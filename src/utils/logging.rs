//! Logging
//!
//! File-based logger with an optional console sink. Console output stays off
//! by default: console I/O on Windows blocks, and the logger is reachable
//! from the hook path.

use log::{Level, LevelFilter, Log, Metadata, Record};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

/// Log file location inside the app data directory.
pub fn log_file_path() -> PathBuf {
    super::app_data_dir().join("trackscroll.log")
}

/// Simple file logger.
pub struct FileLogger {
    file: Mutex<Option<File>>,
    console: bool,
}

impl FileLogger {
    pub fn new(console: bool) -> Self {
        FileLogger {
            file: Mutex::new(Self::open_log_file()),
            console,
        }
    }

    fn open_log_file() -> Option<File> {
        let path = log_file_path();
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        OpenOptions::new().create(true).append(true).open(&path).ok()
    }
}

impl Log for FileLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        if metadata.target().starts_with("trackscroll") {
            metadata.level() <= Level::Debug
        } else {
            metadata.level() <= Level::Warn
        }
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
        let line = format!(
            "[{}] {} {} - {}\n",
            timestamp,
            record.level(),
            record.target(),
            record.args()
        );

        if let Ok(mut guard) = self.file.lock() {
            if let Some(ref mut file) = *guard {
                let _ = file.write_all(line.as_bytes());
            }
        }

        if self.console {
            print!("{}", line);
        }
    }

    fn flush(&self) {
        if let Ok(mut guard) = self.file.lock() {
            if let Some(ref mut file) = *guard {
                let _ = file.flush();
            }
        }
    }
}

/// Initialize file logging; `console` additionally mirrors lines to stdout.
pub fn init_logging(console: bool) -> Result<(), log::SetLoggerError> {
    log::set_boxed_logger(Box::new(FileLogger::new(console)))?;
    log::set_max_level(LevelFilter::Debug);
    Ok(())
}
