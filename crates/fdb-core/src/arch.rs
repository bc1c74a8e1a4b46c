//! Architecture descriptor and syscall-name resolver contracts
//!
//! These traits define the interface between the architecture-agnostic
//! `Fdb` and a concrete per-architecture implementation (provided by
//! `fdb-arch`), the same split `gvthread-core`'s `traits::Platform` makes
//! between the scheduler core and `gvthread-runtime`.
//!
//! The table backing a real implementation is an ordered sequence of
//! `(name, num)` pairs terminated by a sentinel; lookup is linear on both
//! name and number (spec §4.1). That table's contents are reference data
//! and out of scope for this crate — only the lookup contract is specified
//! here.

/// Sentinel returned by [`SyscallResolver::resolve_name`] for an unknown
/// syscall name. Distinct from any legitimate pseudo-syscall number, which
/// spec §3 reserves small architecture-specific negative values for.
pub const RESOLVE_ERROR: i32 = i32::MIN;

/// Architecture identity and argument arity.
pub trait ArchDescriptor: Send + Sync {
    /// Short, stable identifier (e.g. `"x86_64"`).
    fn name(&self) -> &'static str;

    /// Maximum number of syscall arguments on this architecture, bounding
    /// both `chain`'s length and every `arg_index` (`1..=6` per spec §3).
    fn arg_count_max(&self) -> u8;
}

/// Bidirectional syscall name ↔ number mapping for one architecture.
pub trait SyscallResolver: ArchDescriptor {
    /// Look up a syscall number by name.
    ///
    /// Returns [`RESOLVE_ERROR`] if `name` is not in this architecture's
    /// vocabulary.
    fn resolve_name(&self, name: &str) -> i32;

    /// Look up a syscall name by number.
    fn resolve_num(&self, num: i32) -> Option<&str>;

    /// Dense iteration over the table in unspecified order.
    ///
    /// Returns `None` once `index` runs past the end of the table.
    fn iterate(&self, index: usize) -> Option<(&str, i32)>;
}

/// Combined architecture contract consumed by [`crate::fdb::Fdb`].
///
/// An `Fdb` holds its architecture by shared reference and never mutates
/// it (spec §3: "Shared by reference; never mutated by the FDB").
pub trait Arch: SyscallResolver {}

impl<T: SyscallResolver> Arch for T {}
