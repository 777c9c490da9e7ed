///! Logging setup shared by the binaries.

use std::path::Path;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[allow(dead_code)]
pub struct LoggerGuard(Option<WorkerGuard>);

fn checked_level(level: &str) -> &str {
    match level {
        "trace" | "debug" | "info" | "warn" | "error" => level,
        _ => "info",
    }
}

/// Console-only logging, used by the CLI. `RUST_LOG` overrides the default
/// level.
pub fn init_console(level: &str) {
    let filter = EnvFilter::builder()
        .with_default_directive(checked_level(level).parse().expect("valid level directive"))
        .parse_lossy(&std::env::var("RUST_LOG").unwrap_or_default());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Console plus daily-rolling file logging, used by the server. The returned
/// guard must stay alive for the process lifetime.
pub fn init_with_file(log_dir: impl AsRef<Path>, prefix: &str, level: &str) -> LoggerGuard {
    let level = checked_level(level);

    let builder = EnvFilter::builder()
        .with_default_directive(level.parse().expect("valid level directive"));
    let console_filter = builder
        .clone()
        .parse_lossy(&std::env::var("RUST_LOG").unwrap_or_default());
    let file_filter = builder.parse_lossy(&std::env::var("RUST_LOG").unwrap_or_default());

    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(prefix)
        .filename_suffix("log")
        .build(log_dir.as_ref())
        .expect("Failed to create file appender");
    let (non_blocking, guard) = NonBlocking::new(file_appender);

    let file_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_filter(file_filter);
    let stdout_layer = fmt::layer()
        .with_writer(std::io::stdout)
        .with_ansi(true)
        .with_filter(console_filter);

    tracing_subscriber::registry()
        .with(file_layer)
        .with(stdout_layer)
        .init();

    LoggerGuard(Some(guard))
}
