//! Architecture-agnostic filter database core.
//!
//! An [`Fdb`] accumulates syscall filtering policy rule by rule via
//! [`Fdb::add_rule`], merging each new rule into a per-syscall chain tree of
//! argument predicates rather than storing rules as a flat list. The merge
//! keeps the tree minimal (redundant branches collapse away) and
//! conflict-checked (two rules that disagree on the same predicate fail
//! loudly instead of silently shadowing one another).
//!
//! Modules:
//! - [`action`] - the opaque filter decision type
//! - [`op`] - comparison operators and the predicate type
//! - [`arena`] - the node arena backing every chain tree
//! - [`entry`] - per-syscall entries and priority encoding
//! - [`fdb`] - `Fdb` itself and the `add_rule` merge algorithm
//! - [`arch`] - the architecture contract `Fdb` is generic over
//! - [`error`] - the error type returned by fallible operations
//! - [`env`] - environment-variable configuration helpers
//! - [`trace`] - level-gated trace macros

pub mod action;
pub mod arch;
pub mod arena;
pub mod entry;
pub mod env;
pub mod error;
pub mod fdb;
pub mod op;
pub mod trace;

pub use action::Action;
pub use arch::{Arch, ArchDescriptor, SyscallResolver, RESOLVE_ERROR};
pub use arena::{ChainArena, Node, NodeId};
pub use entry::{priority_from_node_count, refresh_priority, with_user_hint, SyscallEntry};
pub use error::{FdbError, FdbResult};
pub use fdb::Fdb;
pub use op::{ChainArg, CmpOp, Predicate, StoredOp};
