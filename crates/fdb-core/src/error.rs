//! Error types for the filter database

use core::fmt;

/// Result type for filter database operations
pub type FdbResult<T> = Result<T, FdbError>;

/// Errors that can occur while mutating a [`crate::fdb::Fdb`]
///
/// Mirrors the four-way taxonomy of the original `db_add_syscall`: every
/// mutating call either succeeds or fails with exactly one of these, and a
/// failure never leaves the database in a different state than before the
/// call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FdbError {
    /// Node arena allocation failed.
    ///
    /// Ordinary `Vec`-backed arenas never return this from within the crate
    /// (growth failure aborts the process in safe Rust); it is kept for
    /// interface parity with callers that pre-size a bounded arena via
    /// [`crate::fdb::Fdb::with_node_budget`] and want a recoverable signal
    /// when that bound is exhausted.
    OutOfMemory,

    /// The new rule conflicts with a rule already stored for this syscall:
    /// some branch already decided by the database demands a different
    /// action than the one the new rule would assign.
    AlreadyExists,

    /// An invariant-violating internal state was reached while merging.
    ///
    /// This is always a bug in the merge algorithm (or in a caller-supplied
    /// `chain` that violates the documented preconditions); the database is
    /// left unmodified.
    Fault(&'static str),
}

impl fmt::Display for FdbError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FdbError::OutOfMemory => write!(f, "filter database: out of memory"),
            FdbError::AlreadyExists => {
                write!(f, "filter database: conflicting rule already exists")
            }
            FdbError::Fault(msg) => write!(f, "filter database: internal fault: {}", msg),
        }
    }
}

impl std::error::Error for FdbError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            format!("{}", FdbError::OutOfMemory),
            "filter database: out of memory"
        );
        assert_eq!(
            format!("{}", FdbError::AlreadyExists),
            "filter database: conflicting rule already exists"
        );
        assert_eq!(
            format!("{}", FdbError::Fault("unreachable merge state")),
            "filter database: internal fault: unreachable merge state"
        );
    }
}
