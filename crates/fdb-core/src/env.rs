//! Environment variable utilities
//!
//! Generic `env_get<T>` function for parsing environment variables with
//! defaults. Used for the handful of process-wide tuning knobs this crate
//! exposes (arena capacity hint, trace verbosity) without introducing a
//! configuration-file format: [`crate::fdb::Fdb::new`] reads
//! `FDB_ARENA_CAPACITY_HINT` via `env_get` to pre-size its node arena, and
//! [`crate::trace`] reads `FDB_LOG_LEVEL`/`FDB_FLUSH_EPRINT` via
//! `env_get_str`/`env_get_bool`.
//!
//! # Usage
//!
//! ```ignore
//! use fdb_core::env::{env_get, env_get_bool};
//!
//! let cap: usize = env_get("FDB_ARENA_CAPACITY_HINT", 64);
//! let verbose: bool = env_get_bool("FDB_DEBUG", false);
//! ```

use std::str::FromStr;

/// Get environment variable parsed as type T, or return default
#[inline]
pub fn env_get<T>(key: &str, default: T) -> T
where
    T: FromStr,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Get environment variable as boolean
///
/// Accepts: "1", "true", "yes", "on" (case-insensitive) as true.
/// Everything else (including unset) returns the default.
#[inline]
pub fn env_get_bool(key: &str, default: bool) -> bool {
    match std::env::var(key) {
        Ok(val) => matches!(val.to_lowercase().as_str(), "1" | "true" | "yes" | "on"),
        Err(_) => default,
    }
}

/// Get environment variable as string, or return default
#[inline]
pub fn env_get_str(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
