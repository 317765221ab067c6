//! Logging setup (spec §6 ambient stack): `tracing-subscriber` to stderr,
//! plus an optional rotating file sink when `--log-file` is given. Grounded
//! on the teacher's own `tracing`/`tracing-subscriber` usage; the rotation
//! policy (`log-max-size`, `log-file-retention`, `log-max-age`,
//! `log-compress`) mirrors the Go original's `lumberjack.Logger` knobs
//! (`original_source/app/app.go::LoggerConfig`), implemented here with the
//! `file-rotate` crate wrapped by `tracing-appender`.

use std::path::PathBuf;

use file_rotate::compression::Compression;
use file_rotate::suffix::AppendCount;
use file_rotate::{ContentLimit, FileRotate};
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;

/// Rotating-file configuration lifted from the CLI (spec §6).
pub struct LogFileConfig {
    pub path: PathBuf,
    pub max_size_bytes: usize,
    pub retention: usize,
    pub compress: bool,
}

impl LogFileConfig {
    pub fn from_cli(cli: &Cli) -> Option<Self> {
        let path = cli.log_file.clone()?;
        Some(Self {
            path,
            max_size_bytes: cli.log_max_size.unwrap_or(10 * 1024 * 1024),
            retention: cli.log_file_retention.unwrap_or(5),
            compress: cli.log_compress,
        })
    }
}

/// Initializes the global tracing subscriber. Returns the file writer guard
/// when file logging is configured — the caller must keep it alive for the
/// process lifetime or buffered lines are lost on exit.
pub fn init(config: Option<LogFileConfig>) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match config {
        None => {
            tracing_subscriber::fmt().with_env_filter(env_filter).init();
            None
        }
        Some(cfg) => {
            let compression = if cfg.compress { Compression::OnRotate(cfg.retention) } else { Compression::None };
            let rotator = FileRotate::new(
                &cfg.path,
                AppendCount::new(cfg.retention),
                ContentLimit::BytesSurpassed(cfg.max_size_bytes),
                compression,
                None,
            );
            let (non_blocking, guard) = tracing_appender::non_blocking(rotator);
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_writer(non_blocking)
                .with_ansi(false)
                .init();
            Some(guard)
        }
    }
}
