use anyhow::Result;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::config::GoodsConfig;

/// Initializes logging with a daily-rotated file under `~/.goods/logs` plus
/// compact console output on stderr. Stdout is left for operation results.
///
/// `RUST_LOG` wins over `level`. Returns a guard that must be kept alive for
/// the duration of the process.
pub fn init_logging(level: &str) -> Result<WorkerGuard> {
    let logs_dir = GoodsConfig::logs_dir()?;
    std::fs::create_dir_all(&logs_dir)?;

    let file_appender = tracing_appender::rolling::daily(&logs_dir, "goods");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(level)));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_target(true)
                .with_thread_ids(false)
                .with_ansi(false)
                .with_writer(non_blocking),
        )
        .with(
            fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_writer(std::io::stderr)
                .compact(),
        )
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {e}"))?;

    Ok(guard)
}

/// Quiet the SDK's own transport chatter unless the user asked for it.
fn default_filter(level: &str) -> String {
    format!(
        "{level},goods_cli={level},goods_chain={level},goods_core={level},\
         near_jsonrpc_client=warn,hyper=warn"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_is_parseable() {
        for level in ["info", "debug", "warn", "trace"] {
            let filter = default_filter(level);
            assert!(filter.starts_with(level));
            assert!(EnvFilter::try_new(&filter).is_ok());
        }
    }
}
