//! Lightweight level-gated trace macros
//!
//! The filter database has no worker/gvthread execution context to stamp
//! onto each line (unlike a scheduler), so this is a much smaller relative
//! of a kernel-`printk`-style logger: a single level, read once from
//! `FDB_LOG_LEVEL`, gating plain `eprintln!`-shaped output.
//!
//! # Environment Variables
//!
//! - `FDB_LOG_LEVEL=<level>` - off|error|warn|info|debug|trace or 0-5
//!
//! # Usage
//!
//! ```ignore
//! use fdb_core::{fdb_debug, fdb_trace};
//!
//! fdb_debug!("collapsed node at level {}", level);
//! fdb_trace!("descending true branch, node_cnt={}", cnt);
//! ```

use crate::env::{env_get_bool, env_get_str};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

/// Trace levels, matching common conventions
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Off = 0,
    Error = 1,
    Warn = 2,
    Info = 3,
    Debug = 4,
    Trace = 5,
}

impl LogLevel {
    pub fn from_u8(v: u8) -> Self {
        match v {
            0 => LogLevel::Off,
            1 => LogLevel::Error,
            2 => LogLevel::Warn,
            3 => LogLevel::Info,
            4 => LogLevel::Debug,
            _ => LogLevel::Trace,
        }
    }

    pub fn prefix(&self) -> &'static str {
        match self {
            LogLevel::Off => "",
            LogLevel::Error => "[ERROR]",
            LogLevel::Warn => "[WARN] ",
            LogLevel::Info => "[INFO] ",
            LogLevel::Debug => "[DEBUG]",
            LogLevel::Trace => "[TRACE]",
        }
    }
}

static INITIALIZED: AtomicBool = AtomicBool::new(false);
static LOG_LEVEL: AtomicU8 = AtomicU8::new(LogLevel::Warn as u8);
static FLUSH_ENABLED: AtomicBool = AtomicBool::new(false);

fn init() {
    if INITIALIZED.swap(true, Ordering::SeqCst) {
        return;
    }
    FLUSH_ENABLED.store(env_get_bool("FDB_FLUSH_EPRINT", false), Ordering::Relaxed);
    let val = env_get_str("FDB_LOG_LEVEL", "warn");
    let level = match val.to_lowercase().as_str() {
        "off" | "0" => LogLevel::Off,
        "error" | "1" => LogLevel::Error,
        "warn" | "2" => LogLevel::Warn,
        "info" | "3" => LogLevel::Info,
        "debug" | "4" => LogLevel::Debug,
        "trace" | "5" => LogLevel::Trace,
        _ => LogLevel::Warn,
    };
    LOG_LEVEL.store(level as u8, Ordering::Relaxed);
}

#[inline]
pub fn log_level() -> LogLevel {
    if !INITIALIZED.load(Ordering::Relaxed) {
        init();
    }
    LogLevel::from_u8(LOG_LEVEL.load(Ordering::Relaxed))
}

/// Set the trace level programmatically, overriding `FDB_LOG_LEVEL`.
pub fn set_log_level(level: LogLevel) {
    INITIALIZED.store(true, Ordering::SeqCst);
    LOG_LEVEL.store(level as u8, Ordering::Relaxed);
}

#[inline]
fn level_enabled(level: LogLevel) -> bool {
    level as u8 <= log_level() as u8
}

#[doc(hidden)]
pub fn _fdb_log_impl(level: LogLevel, args: std::fmt::Arguments<'_>) {
    if !level_enabled(level) {
        return;
    }
    use std::io::Write;
    let stderr = std::io::stderr();
    let mut handle = stderr.lock();
    let _ = write!(handle, "{} ", level.prefix());
    let _ = handle.write_fmt(args);
    let _ = handle.write_all(b"\n");
    if FLUSH_ENABLED.load(Ordering::Relaxed) {
        let _ = handle.flush();
    }
}

/// Error-level trace line.
#[macro_export]
macro_rules! fdb_error {
    ($($arg:tt)*) => {{
        $crate::trace::_fdb_log_impl($crate::trace::LogLevel::Error, format_args!($($arg)*));
    }};
}

/// Debug-level trace line (merge-algorithm bookkeeping).
#[macro_export]
macro_rules! fdb_debug {
    ($($arg:tt)*) => {{
        $crate::trace::_fdb_log_impl($crate::trace::LogLevel::Debug, format_args!($($arg)*));
    }};
}

/// Trace-level trace line (per-node merge steps).
#[macro_export]
macro_rules! fdb_trace {
    ($($arg:tt)*) => {{
        $crate::trace::_fdb_log_impl($crate::trace::LogLevel::Trace, format_args!($($arg)*));
    }};
}
