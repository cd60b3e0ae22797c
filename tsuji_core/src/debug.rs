//! Debug logging module for development-time diagnostics
//!
//! Conditional compilation macros that enable detailed logging during
//! development while ensuring zero runtime overhead in production builds.
//! All macros are controlled by the `dev-log` feature flag.
//!
//! Constraint rejections and match-time diagnostics go through these
//! macros; with the feature disabled they compile to nothing, so a failed
//! candidate costs exactly the comparison that rejected it.
//!
//! # Usage
//!
//! Enable the feature in your Cargo.toml or via command line:
//! ```bash
//! cargo test --features "dev-log"
//! ```

/// General-purpose debug logging macro
///
/// Outputs informational messages prefixed with `[DEBUG]`.
///
/// # Examples
/// ```rust
/// use tsuji_core::debug_log;
/// debug_log!("route set built with {} entries", 3);
/// ```
#[macro_export]
#[cfg(feature = "dev-log")]
macro_rules! debug_log {
    ($($arg:tt)*) => {
        println!("[DEBUG] {}", format!($($arg)*));
    };
}

#[macro_export]
#[cfg(not(feature = "dev-log"))]
macro_rules! debug_log {
    ($($arg:tt)*) => {};
}

/// Warning logging macro for potentially problematic conditions
///
/// Outputs to stderr with `[WARN]` prefix.
#[macro_export]
#[cfg(feature = "dev-log")]
macro_rules! debug_warn {
    ($($arg:tt)*) => {
        eprintln!("[WARN] {}", format!($($arg)*));
    };
}

#[macro_export]
#[cfg(not(feature = "dev-log"))]
macro_rules! debug_warn {
    ($($arg:tt)*) => {};
}

/// Detailed trace logging for verbose debugging
///
/// Outputs with `[TRACE]` prefix. Use for per-segment match flow.
#[macro_export]
#[cfg(feature = "dev-log")]
macro_rules! debug_trace {
    ($($arg:tt)*) => {
        println!("[TRACE] {}", format!($($arg)*));
    };
}

#[macro_export]
#[cfg(not(feature = "dev-log"))]
macro_rules! debug_trace {
    ($($arg:tt)*) => {};
}
