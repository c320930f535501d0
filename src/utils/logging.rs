//! Logger setup and per-module switchable logging macros.
//!
//! Modules that use the macros define their own switch first:
//! ```ignore
//! const ENABLE_LOGS: bool = true;
//!
//! use crate::{log_debug, log_info};
//!
//! log_info!("clustered {} events", 42);
//! ```

use log::LevelFilter;

/// Install the global `env_logger`. `RUST_LOG` still wins over `default_level`.
pub fn init(default_level: LevelFilter) {
    let _ = env_logger::Builder::new()
        .filter_level(default_level)
        .parse_default_env()
        .format_timestamp_millis()
        .try_init();
}

/// Map a configured level name to a filter, falling back to `Info`.
pub fn level_from_name(name: &str) -> LevelFilter {
    name.parse().unwrap_or(LevelFilter::Info)
}

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::info!($($arg)*);
        }
    };
}

#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::debug!($($arg)*);
        }
    };
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::warn!($($arg)*);
        }
    };
}
