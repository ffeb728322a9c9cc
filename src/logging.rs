use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "info,creality_watcher=debug";

/// Logs to stdout and to a daily file under `logs/`.
///
/// Keep the returned guard alive for the whole program, dropping it flushes
/// and stops the file writer.
pub fn init_logs() -> WorkerGuard {
    let file_appender = tracing_appender::rolling::daily("logs", "creality_watcher.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let stdout_layer = fmt::layer().with_target(false).with_line_number(true);
    let file_layer = fmt::layer().with_ansi(false).with_writer(file_writer);

    if let Err(e) = tracing_subscriber::registry()
        .with(filter)
        .with(stdout_layer)
        .with(file_layer)
        .try_init()
    {
        eprintln!("logging already initialized: {}", e);
    }

    guard
}
