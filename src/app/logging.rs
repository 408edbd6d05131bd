//! Logging configuration and initialization

use crate::app::config::AppConfig;
use tracing::{debug, trace};

/// Initialize tracing/logging for the application
///
/// `RUST_LOG` is ignored; the filter comes from the `-v` count.
pub fn init_logging(config: &AppConfig) {
    let log_level = config.log_level();

    let _ = tracing_subscriber::fmt()
        .with_env_filter(log_level)
        .with_writer(std::io::stderr)
        .with_target(config.verbose >= 2)
        .with_thread_ids(config.verbose >= 3)
        .with_line_number(config.verbose >= 3)
        .try_init();

    debug!("sales-rollup started with verbosity level: {}", config.verbose);
    trace!("Full CLI args: {:?}", std::env::args().collect::<Vec<_>>());
}

/// Initialize tracing with just a verbosity level
pub fn init_tracing(verbose: u8) {
    init_logging(&AppConfig::default().with_verbose(verbose));
}
