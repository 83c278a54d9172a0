#![deny(missing_docs)]
//! Shared logging utilities for the relay workspace.
//!
//! This crate provides the `relay_*` logging macros used across the codebase
//! and a minimal test initializer for the global logger. Every line logged
//! through the macros carries the number of the poll iteration that produced
//! it, so a single bad iteration can be followed through fetch, tracking and
//! delivery.

use std::sync::atomic::{AtomicU64, Ordering};

#[doc(hidden)]
pub use log;

/// Iteration counter of the running poll loop. There is one loop per process
/// and it may hop between runtime worker threads, hence a global.
static POLL_ITERATION: AtomicU64 = AtomicU64::new(0);

/// Sets the poll iteration number reported by the logging macros.
/// This should be called by the poll loop once per iteration.
pub fn set_poll_iteration(iteration: u64) {
    POLL_ITERATION.store(iteration, Ordering::Relaxed);
}

/// Retrieves the current poll iteration number.
/// Returns 0 before the first iteration has started.
pub fn poll_iteration() -> u64 {
    POLL_ITERATION.load(Ordering::Relaxed)
}

/// Logs a trace-level message tagged with the poll iteration.
#[macro_export]
macro_rules! relay_trace {
    ($($arg:tt)*) => {{
        $crate::log::trace!("[poll {}] {}", $crate::poll_iteration(), format_args!($($arg)*));
    }};
}

/// Logs a debug-level message tagged with the poll iteration.
#[macro_export]
macro_rules! relay_debug {
    ($($arg:tt)*) => {{
        $crate::log::debug!("[poll {}] {}", $crate::poll_iteration(), format_args!($($arg)*));
    }};
}

/// Logs an info-level message tagged with the poll iteration.
#[macro_export]
macro_rules! relay_info {
    ($($arg:tt)*) => {{
        $crate::log::info!("[poll {}] {}", $crate::poll_iteration(), format_args!($($arg)*));
    }};
}

/// Logs a warn-level message tagged with the poll iteration.
#[macro_export]
macro_rules! relay_warn {
    ($($arg:tt)*) => {{
        $crate::log::warn!("[poll {}] {}", $crate::poll_iteration(), format_args!($($arg)*));
    }};
}

/// Logs an error-level message tagged with the poll iteration.
#[macro_export]
macro_rules! relay_error {
    ($($arg:tt)*) => {{
        $crate::log::error!("[poll {}] {}", $crate::poll_iteration(), format_args!($($arg)*));
    }};
}

/// Initializes a simple terminal logger for use in tests.
///
/// This safely no-ops if another logger has already been initialized.
pub fn initialize_for_tests() {
    use simplelog::{ColorChoice, CombinedLogger, Config, TermLogger, TerminalMode};

    // Use debug level in debug builds, info in release builds.
    let level = if cfg!(debug_assertions) {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    // Ignore the error if a logger was already set by another test.
    let _ = CombinedLogger::init(vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )]);
}
