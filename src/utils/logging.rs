//! Conditional logging macros that check a module-level `ENABLE_LOGS` flag.
//!
//! Every line is prefixed with the `[bt-header]` tag so the theme's output can
//! be told apart from the storefront's own console noise.
//!
//! Usage:
//! ```rust,ignore
//! // In your module, define the flag first:
//! const ENABLE_LOGS: bool = true;
//!
//! // Then use the macros (they're exported at the crate root):
//! use crate::{log_debug, log_error, log_info, log_warn};
//!
//! log_info!("header found after {} attempts", 3);
//! ```

/// Tag prepended to every line emitted through these macros.
pub const LOG_TAG: &str = "[bt-header]";

/// Conditional info logging.
///
/// The calling module must define `const ENABLE_LOGS: bool`.
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::info!("{} {}", $crate::utils::logging::LOG_TAG, format_args!($($arg)*));
        }
    };
}

/// Conditional warn logging.
///
/// The calling module must define `const ENABLE_LOGS: bool`.
#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::warn!("{} {}", $crate::utils::logging::LOG_TAG, format_args!($($arg)*));
        }
    };
}

/// Conditional error logging.
///
/// Absence of the header and boot failures go through here; they are
/// reported but never propagated to the page.
#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::error!("{} {}", $crate::utils::logging::LOG_TAG, format_args!($($arg)*));
        }
    };
}

/// Conditional debug logging, used for per-trigger chatter.
#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::debug!("{} {}", $crate::utils::logging::LOG_TAG, format_args!($($arg)*));
        }
    };
}
