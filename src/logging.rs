//! Thin logging macros over the `log` crate.
//! They compile to no-ops when the `log` feature is disabled.

/// Logs at trace level if the `log` feature is enabled.
#[cfg(feature = "log")]
#[macro_export]
macro_rules! trace_log {
  ($($arg:tt)*) => { log::trace!($($arg)*) };
}

/// Logs at trace level if the `log` feature is enabled.
#[cfg(not(feature = "log"))]
#[macro_export]
macro_rules! trace_log {
  ($($arg:tt)*) => {{ let _ = format_args!($($arg)*); }};
}

/// Logs at info level if the `log` feature is enabled.
#[cfg(feature = "log")]
#[macro_export]
macro_rules! info_log {
  ($($arg:tt)*) => { log::info!($($arg)*) };
}

/// Logs at info level if the `log` feature is enabled.
#[cfg(not(feature = "log"))]
#[macro_export]
macro_rules! info_log {
  ($($arg:tt)*) => {{ let _ = format_args!($($arg)*); }};
}

/// Logs at warn level if the `log` feature is enabled.
#[cfg(feature = "log")]
#[macro_export]
macro_rules! warn_log {
  ($($arg:tt)*) => { log::warn!($($arg)*) };
}

/// Logs at warn level if the `log` feature is enabled.
#[cfg(not(feature = "log"))]
#[macro_export]
macro_rules! warn_log {
  ($($arg:tt)*) => {{ let _ = format_args!($($arg)*); }};
}

/// Logs at error level if the `log` feature is enabled.
#[cfg(feature = "log")]
#[macro_export]
macro_rules! error_log {
  ($($arg:tt)*) => { log::error!($($arg)*) };
}

/// Logs at error level if the `log` feature is enabled.
#[cfg(not(feature = "log"))]
#[macro_export]
macro_rules! error_log {
  ($($arg:tt)*) => {{ let _ = format_args!($($arg)*); }};
}
