use tracing::level_filters::LevelFilter;
use tracing_subscriber::{
    filter::Targets, fmt, prelude::__tracing_subscriber_SubscriberExt, util::SubscriberInitExt,
    EnvFilter,
};

/// Install the global tracing subscriber for an embedding application.
///
/// `RUST_LOG` wins when set; otherwise ledger events are shown at debug level
/// with `verbose` and only warnings without it. Calling it twice is harmless.
pub fn init_logging(verbose: bool) {
    let (level_filter, level) = if verbose {
        (LevelFilter::DEBUG, "debug")
    } else {
        (LevelFilter::WARN, "warn")
    };
    let crate_filter = Targets::new()
        .with_target("finance_ledger_core", level_filter)
        .with_default(LevelFilter::WARN);
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let _ = tracing_subscriber::registry()
        .with(fmt::layer().compact().without_time())
        .with(crate_filter)
        .with(env_filter)
        .try_init();
}
