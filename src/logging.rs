use std::path::PathBuf;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::error::{HookError, Result};

const DEFAULT_MAX_LOG_FILES: usize = 5;
const DEFAULT_LOG_FILTER: &str = "info";

/// Daily rolling log files next to the console output
pub struct FileLogger {
    log_directory: PathBuf,
    file_prefix: String,
    max_files: usize,
    rotation: Rotation,
}

impl FileLogger {
    pub fn new(log_directory: PathBuf, file_prefix: &str) -> Self {
        Self {
            log_directory,
            file_prefix: file_prefix.to_string(),
            max_files: DEFAULT_MAX_LOG_FILES,
            rotation: Rotation::DAILY,
        }
    }

    /// File logging is on when `LOG_DIR` is set.
    pub fn from_env(file_prefix: &str) -> Option<Self> {
        std::env::var("LOG_DIR")
            .ok()
            .filter(|dir| !dir.is_empty())
            .map(|dir| Self::new(PathBuf::from(dir), file_prefix))
    }

    pub fn with_max_files(mut self, max_files: usize) -> Self {
        self.max_files = max_files;
        self
    }

    pub fn with_rotation(mut self, rotation: Rotation) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn setup_file_logging(&self) -> Result<(NonBlocking, WorkerGuard)> {
        std::fs::create_dir_all(&self.log_directory)?;

        let file_appender = RollingFileAppender::builder()
            .rotation(self.rotation.clone())
            .filename_prefix(self.file_prefix.as_str())
            .max_log_files(self.max_files)
            .build(&self.log_directory)
            .map_err(|e| HookError::Config(format!("Failed to set up log files: {}", e)))?;

        Ok(tracing_appender::non_blocking(file_appender))
    }
}

/// Installs the global subscriber: `RUST_LOG` filtered console output, plus
/// plain-text log files when a [`FileLogger`] is given. Keep the returned
/// guard alive for as long as file logs should be flushed.
pub fn init(file_logger: Option<&FileLogger>) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let (file_layer, guard) = match file_logger {
        Some(logger) => {
            let (writer, guard) = logger.setup_file_logging()?;
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false); // no colour codes in files
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .init();

    Ok(guard)
}
