//! # fdb-emit — trait definition for filter-database emission
//!
//! This crate defines the boundary between the filter database (which
//! owns merging and normalizing policy) and a future, out-of-scope
//! bytecode-emission crate (which would walk a built [`Fdb`](fdb_core::Fdb)
//! and lower it to an in-kernel filter program). No implementation lives
//! here — only the contract.
//!
//! The trait and its supporting types are defined in terms of primitives
//! rather than `fdb-core`'s own types so that this crate stays dependency
//! free; an emitter implementation depends on `fdb-core` to do the actual
//! walking and translates as it goes.

/// Comparison operator on a stored predicate, normalized to the four
/// forms the chain tree stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmitOp {
    Eq,
    Ge,
    Gt,
    MaskedEq,
}

/// One argument-value test at a chain-tree decision point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmitPredicate {
    pub arg_index: u8,
    pub op: EmitOp,
    pub datum: u64,
    /// Only meaningful when `op == EmitOp::MaskedEq`.
    pub mask: u64,
}

/// How a decision point's branch resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmitBranch {
    /// The branch falls straight through to this action.
    Leaf(u32),
    /// The branch continues into another decision point, to be visited
    /// next via [`FilterEmitter::enter_node`].
    Node,
    /// The branch is undecided: falls through to the next level sibling,
    /// or to the entry's default action if this was the last one.
    Undecided,
}

/// Walks a built filter database in traversal order to produce a filter
/// program.
///
/// Callers drive an implementor through one full pass: [`begin`] once,
/// then for every syscall entry in ascending `num` order [`enter_entry`],
/// either [`unconditional_action`] or a sequence of [`enter_node`] calls
/// (one per chain-tree node, level siblings included), then
/// [`leave_entry`], and finally [`finish`] once.
///
/// This repository commits to nothing past "here is the decision
/// structure in traversal order" — output format, target architecture,
/// and bytecode layout are entirely up to the implementor.
///
/// [`begin`]: FilterEmitter::begin
/// [`enter_entry`]: FilterEmitter::enter_entry
/// [`unconditional_action`]: FilterEmitter::unconditional_action
/// [`enter_node`]: FilterEmitter::enter_node
/// [`leave_entry`]: FilterEmitter::leave_entry
/// [`finish`]: FilterEmitter::finish
pub trait FilterEmitter {
    /// The finished program (e.g. a BPF instruction buffer).
    type Output;
    /// An emission failure (e.g. program too large for the target).
    type Error;

    /// Called once before any entry is visited.
    fn begin(&mut self, default_action: u32) -> Result<(), Self::Error>;

    /// Called once per syscall entry, in ascending `num` order, before
    /// its chain tree (if any) is walked. `num` may be negative (a
    /// pseudo-syscall not present on this architecture); implementors
    /// must reject it rather than emit a test against it.
    fn enter_entry(&mut self, num: i32, priority: u32) -> Result<(), Self::Error>;

    /// The entry has no chain tree; `action` applies unconditionally.
    fn unconditional_action(&mut self, action: u32) -> Result<(), Self::Error>;

    /// Visit one chain-tree decision point. `is_level_head` is `false`
    /// for every sibling after the first at the same decision point.
    fn enter_node(
        &mut self,
        predicate: EmitPredicate,
        true_branch: EmitBranch,
        false_branch: EmitBranch,
        is_level_head: bool,
    ) -> Result<(), Self::Error>;

    /// Called once per syscall entry after its chain tree (if any) is
    /// fully walked.
    fn leave_entry(&mut self, num: i32) -> Result<(), Self::Error>;

    /// Called once after the last entry; returns the finished program.
    fn finish(&mut self) -> Result<Self::Output, Self::Error>;
}
