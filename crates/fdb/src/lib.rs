//! # fdb - syscall filter database builder
//!
//! Accumulates kernel syscall-filtering policy — permit, deny, trap, or
//! return-errno actions, optionally qualified by argument-value predicates
//! — into a per-syscall decision tree ready for an (out-of-scope) bytecode
//! emitter to lower into an in-kernel filter program.
//!
//! ## Quick start
//!
//! ```
//! use fdb::{Fdb, Action, ChainArg, CmpOp, X86_64};
//!
//! let mut db = Fdb::new(X86_64, Action::new(0) /* default: kill */);
//!
//! // Unconditionally permit `read`.
//! db.add_rule(Action::new(1), 0, &[]).unwrap();
//!
//! // Permit `open` only when its second argument equals 0 (O_RDONLY).
//! db.add_rule(
//!     Action::new(1),
//!     2,
//!     &[ChainArg::new(1, CmpOp::Eq, 0)],
//! ).unwrap();
//!
//! for entry in db.iterate() {
//!     println!("syscall {}: priority {}", entry.num, entry.priority);
//! }
//! ```

// Re-export the data model and add-rule algorithm.
pub use fdb_core::{
    priority_from_node_count, refresh_priority, with_user_hint, Action, Arch, ArchDescriptor,
    ChainArena, ChainArg, CmpOp, Fdb, FdbError, FdbResult, Node, NodeId, Predicate, StoredOp,
    SyscallResolver, SyscallEntry, RESOLVE_ERROR,
};

// Re-export env and trace helpers for callers that want the same
// configuration knobs the crate itself uses.
pub use fdb_core::env;
pub use fdb_core::{fdb_debug, fdb_trace};

// Re-export concrete architecture descriptors.
pub use fdb_arch::X86_64;

// Re-export the emission interface.
pub use fdb_emit::{EmitBranch, EmitOp, EmitPredicate, FilterEmitter};
