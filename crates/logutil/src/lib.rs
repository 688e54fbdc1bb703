//! Utilities for logging.
use tracing::Level;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoggingMode {
    #[default]
    Pretty,
    Json,
    Compact,
}

/// Map a `-v` count to a max level.
pub fn level_for_verbosity(verbosity: u8) -> Level {
    match verbosity {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Initialize a global subscriber writing to stderr.
///
/// `RUST_LOG` takes precedence over the verbosity if set. Calling this more
/// than once is a no-op.
pub fn init(verbosity: u8, mode: LoggingMode) {
    let level = level_for_verbosity(verbosity);
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(level).into())
        .from_env_lossy();

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr);

    // Errors only when a global subscriber already exists.
    let _ = match mode {
        LoggingMode::Json => builder.json().try_init(),
        LoggingMode::Pretty => builder.pretty().try_init(),
        LoggingMode::Compact => builder.compact().try_init(),
    };
}

/// Initialize a subscriber for tests, capturing output per test.
pub fn init_test() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(Level::TRACE)
        .with_test_writer()
        .try_init();
}
