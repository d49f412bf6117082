use crate::infra::Config;
use env_logger::{Builder, Target};
use std::fs::OpenOptions;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("failed to open log file {path}: {source}")]
    OpenFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("logger already initialized: {0}")]
    Init(#[from] log::SetLoggerError),
}

/// Routes `log` records to the configured file. The terminal belongs to the
/// UI, so without a file nothing is logged.
pub fn init_logging(config: &Config) -> Result<bool, LoggingError> {
    let Some(path) = config.log_file.as_ref() else {
        return Ok(false);
    };

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| LoggingError::OpenFile {
            path: path.clone(),
            source,
        })?;

    Builder::new()
        .parse_filters(&config.log_level)
        .target(Target::Pipe(Box::new(file)))
        .format_timestamp_millis()
        .try_init()?;

    log::info!("logging to {}", path.display());
    Ok(true)
}
