use anyhow::Result;
use review_harvest_config::PathManager;
use std::io;
use std::io::IsTerminal;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::{self, time::ChronoUtc};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Initialize the tracing subscriber.
///
/// Verbose count maps to levels: 0 = info, 1 = debug (noisy hyper targets
/// suppressed), 2+ = trace. Harvest runs additionally append to a daily
/// rolling file under the log directory, so long unattended runs keep a
/// record past the terminal scrollback.
pub fn init_logging(verbose_level: u8, quiet: bool, with_log_file: bool) -> Result<()> {
    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose_level > 0 {
        let filter_str = match verbose_level {
            1 => "debug,hyper::proto::h1=warn,hyper::client::pool=warn",
            _ => "trace",
        };
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter_str))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let json = std::env::var("RUST_LOG_JSON")
        .map(|v| v == "true")
        .unwrap_or_else(|_| !io::stdout().is_terminal());

    let file_layer = if with_log_file {
        let paths = PathManager::default();
        std::fs::create_dir_all(paths.log_dir())?;
        let file_appender =
            RollingFileAppender::new(Rotation::DAILY, paths.log_dir(), "reviewharvest");
        Some(
            fmt::layer()
                .with_timer(ChronoUtc::rfc_3339())
                .with_ansi(false)
                .with_writer(file_appender),
        )
    } else {
        None
    };

    let registry = Registry::default().with(filter).with(file_layer);

    if json {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_writer(io::stderr),
            )
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_writer(io::stderr),
            )
            .init();
    }

    Ok(())
}
