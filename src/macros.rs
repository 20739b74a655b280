//! SQL logging macros
//!
//! Rendered statements are logged in debug builds only; in release builds
//! these compile to no-ops so hot query paths don't pay for formatting.

/// SQL debug logging - only active in debug builds
#[cfg(debug_assertions)]
#[macro_export]
macro_rules! sql_debug {
    ($($arg:tt)*) => { log::debug!(target: "meeting_store::sql", $($arg)*) };
}

/// SQL debug logging - no-op in release builds
#[cfg(not(debug_assertions))]
#[macro_export]
macro_rules! sql_debug {
    ($($arg:tt)*) => {};
}

/// SQL trace logging (bound parameters) - only active in debug builds
#[cfg(debug_assertions)]
#[macro_export]
macro_rules! sql_trace {
    ($($arg:tt)*) => { log::trace!(target: "meeting_store::sql", $($arg)*) };
}

/// SQL trace logging - no-op in release builds
#[cfg(not(debug_assertions))]
#[macro_export]
macro_rules! sql_trace {
    ($($arg:tt)*) => {};
}
