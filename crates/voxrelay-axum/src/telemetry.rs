//! Tracing subscriber setup for the binary.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const DEFAULT_FILTER: &str = "info,voxrelay_core=debug,tower_http=info";

/// Install a compact stdout layer and, with `log_dir`, a daily-rotated
/// file layer.
///
/// `RUST_LOG` overrides the default filter. The returned guard must be
/// held for the life of the process or buffered file output is lost.
pub fn init_tracing(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            if let Err(e) = std::fs::create_dir_all(dir) {
                eprintln!("Failed to create log directory {}: {}", dir.display(), e);
            }
            let appender = tracing_appender::rolling::daily(dir, "voxrelay");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .compact();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stdout)
                .compact(),
        )
        .with(file_layer)
        .try_init()
        .ok();

    guard
}
