//! Logger setup for hosts that have none
//!
//! Record diagnostics go through the `log` facade. Rust callers may install
//! any logger; C hosts and the demo programs use [`init`] (exported to C as
//! `user_record_init_logging`), which installs `env_logger` at info level.
//! `RUST_LOG` still overrides the level.

use env_logger::Builder;
use log::LevelFilter;

/// Builder for the default logger: info level, then `RUST_LOG`
pub fn builder() -> Builder {
    let mut builder = Builder::new();
    builder.filter_level(LevelFilter::Info).parse_default_env();
    builder
}

/// Install the default logger
///
/// Returns `false` if a logger was already installed, in which case that
/// logger keeps receiving the diagnostics.
pub fn init() -> bool {
    builder().try_init().is_ok()
}
