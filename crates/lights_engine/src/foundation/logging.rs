//! Logging setup
//!
//! The renderer only talks to the `log` facade. Applications call [`init`] or
//! [`init_with_level`] once at startup to route records through env_logger.

pub use log::{debug, error, info, trace, warn};

use crate::core::config::EngineConfig;

/// Initialize the logging system with the default filter from [`EngineConfig`]
pub fn init() {
    init_with_level(&EngineConfig::default().log_level);
}

/// Initialize the logging system, falling back to `level` when `RUST_LOG` is unset
///
/// Calling this more than once is harmless; later calls are ignored.
pub fn init_with_level(level: &str) {
    let result = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_millis()
        .try_init();

    if result.is_ok() {
        log::debug!("Logging initialized (default filter: {})", level);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeated_init_is_harmless() {
        init_with_level("warn");
        init_with_level("debug");
        init();
    }
}
