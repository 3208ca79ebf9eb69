//! Logging Infrastructure
//!
//! Console output through `tracing-subscriber`, optionally mirrored to a
//! daily rolling file.

use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

/// Keeps the file writer flushing; drop it last
pub struct LogGuard(#[allow(dead_code)] Option<WorkerGuard>);

/// Initialize the logger.
///
/// `RUST_LOG` wins over `level`. Logs go to stderr so command output on
/// stdout stays clean.
pub fn init_logger(level: &str, json: bool, log_dir: Option<&Path>) -> LogGuard {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{level},hyper=warn,reqwest=warn")));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            if let Err(e) = std::fs::create_dir_all(dir) {
                eprintln!("Failed to create log dir {}: {e}", dir.display());
                (None, None)
            } else {
                let appender = tracing_appender::rolling::daily(dir, "hm-cli.log");
                let (writer, guard) = tracing_appender::non_blocking(appender);
                let layer = fmt::layer().with_writer(writer).with_ansi(false).json();
                (Some(layer), Some(guard))
            }
        }
        None => (None, None),
    };

    let registry = tracing_subscriber::registry().with(filter).with(file_layer);
    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    }

    LogGuard(guard)
}
