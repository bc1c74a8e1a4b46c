//! The filter database itself: `Fdb`, and the `add_rule` merge algorithm
//!
//! `add_rule` is a Rust re-expression of libseccomp's `db_add_syscall`
//! (Phase A: build the new chain; Phase B: locate or create the syscall
//! entry; Phase C: merge the new chain into the existing one, node by node).
//! The three phases are kept as named internal steps below so the shape
//! stays recognizable against that reference, with `NodeId`s standing in for
//! the original's node pointers.

use crate::arch::ArchDescriptor;
use crate::arena::{ChainArena, Node, NodeId};
use crate::entry::{priority_from_node_count, refresh_priority, SyscallEntry};
use crate::env::env_get;
use crate::error::{FdbError, FdbResult};
use crate::op::{ChainArg, Predicate, StoredOp};
use crate::{fdb_debug, fdb_trace};
use crate::Action;

/// Env var read by [`Fdb::new`] to pre-size the node arena, avoiding the
/// early reallocations a from-empty `Vec` would otherwise do for a caller
/// who already knows roughly how large their policy will get. `0` (the
/// default) means no hint: the arena starts empty and grows as needed.
const ARENA_CAPACITY_HINT_VAR: &str = "FDB_ARENA_CAPACITY_HINT";

/// A freshly built, still-unattached chain (Phase A output).
struct NewChain {
    root: NodeId,
    node_count: u32,
}

/// Where a [`NodeId`] currently lives: the top-level `chains` slot of an
/// entry, or a specific branch of a parent node. Lets the level-search step
/// patch whichever field pointed at the node it's about to displace, without
/// threading a `&mut NodeId` through the borrow checker the way the
/// original's `struct db_arg_chain_tree **tree` does.
#[derive(Clone, Copy)]
enum ParentLink {
    Root,
    Child(NodeId, bool),
}

/// In-memory filter database: one default action plus a sorted table of
/// per-syscall entries, each either unconditional or the root of a chain
/// tree of argument predicates (spec §3).
///
/// Generic over the owning architecture rather than storing a trait object,
/// since `Fdb` never needs dynamic dispatch across architectures within a
/// single instance — one filter targets exactly one architecture for its
/// whole lifetime.
pub struct Fdb<A: ArchDescriptor> {
    arch: A,
    default_action: Action,
    entries: Vec<SyscallEntry>,
    arena: ChainArena,
}

impl<A: ArchDescriptor> Fdb<A> {
    /// `db_new`: an empty database for `arch`, falling back to
    /// `default_action` for any syscall with no matching entry.
    ///
    /// Pre-sizes the node arena from `FDB_ARENA_CAPACITY_HINT` if set, so a
    /// caller who knows roughly how large their policy will get can avoid
    /// the arena's early reallocations without reaching for
    /// [`Fdb::with_node_budget`]'s hard cap.
    pub fn new(arch: A, default_action: Action) -> Self {
        let capacity_hint: usize = env_get(ARENA_CAPACITY_HINT_VAR, 0);
        let arena = if capacity_hint > 0 {
            ChainArena::with_capacity(capacity_hint)
        } else {
            ChainArena::new()
        };
        Fdb {
            arch,
            default_action,
            entries: Vec::new(),
            arena,
        }
    }

    /// Like [`Fdb::new`], but the node arena refuses to grow past
    /// `max_nodes` live nodes — `add_rule` then fails with
    /// [`FdbError::OutOfMemory`] instead of growing without bound.
    pub fn with_node_budget(arch: A, default_action: Action, max_nodes: usize) -> Self {
        Fdb {
            arch,
            default_action,
            entries: Vec::new(),
            arena: ChainArena::bounded(max_nodes),
        }
    }

    pub fn arch(&self) -> &A {
        &self.arch
    }

    pub fn default_action(&self) -> Action {
        self.default_action
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// Look up the stored entry for a syscall number, if any.
    pub fn entry(&self, num: i32) -> Option<&SyscallEntry> {
        let idx = self.entries.partition_point(|e| e.num < num);
        self.entries
            .get(idx)
            .filter(|e| e.num == num)
    }

    /// Read a single node by id, for inspection/emission. Panics on a stale
    /// or out-of-range id, same contract as [`ChainArena::get`].
    pub fn node(&self, id: NodeId) -> &Node {
        self.arena.get(id)
    }

    /// `db_iterate`: every stored entry, in ascending `num` order (spec
    /// §4.4). The emitter (out of scope here) walks each entry's `chains`
    /// tree itself via [`Fdb::node`].
    pub fn iterate(&self) -> impl Iterator<Item = &SyscallEntry> {
        self.entries.iter()
    }

    /// `db_destroy`: consumes the database. Dropping `entries`/`arena`
    /// already frees every node, so this exists purely for interface parity
    /// with the teardown call spec §4.4 names; it never fails.
    pub fn destroy(self) {}

    /// `db_add_syscall`: merge one rule — `action` on `syscall_num`,
    /// qualified by `chain` — into the database.
    ///
    /// `chain` is read up to `self.arch.arg_count_max()` entries; slots
    /// beyond that, and slots with `valid == false`, are ignored. An empty
    /// (all-invalid) chain records an unconditional rule.
    pub fn add_rule(
        &mut self,
        action: Action,
        syscall_num: i32,
        chain: &[ChainArg],
    ) -> FdbResult<()> {
        let new_chain = self.build_new_chain(chain, action)?;
        let idx = self.entries.partition_point(|e| e.num < syscall_num);

        if idx >= self.entries.len() || self.entries[idx].num != syscall_num {
            // Phase B, case 1: no entry yet for this syscall.
            let priority = priority_from_node_count(new_chain.node_count);
            let entry = SyscallEntry {
                num: syscall_num,
                action,
                chains: new_chain.root,
                node_count: new_chain.node_count,
                priority,
            };
            fdb_debug!("add_rule: new entry for syscall {}", syscall_num);
            self.entries.insert(idx, entry);
            return Ok(());
        }

        if self.entries[idx].chains.is_none() {
            // Phase B, case 2: existing entry is already unconditional; it
            // subsumes anything more specific.
            self.free_tree(new_chain.root);
            fdb_debug!(
                "add_rule: syscall {} already unconditional, discarding new chain",
                syscall_num
            );
            return Ok(());
        }

        if new_chain.root.is_none() {
            // Phase B, case 3: new rule is unconditional; it replaces
            // whatever chain tree existed.
            let old_root = self.entries[idx].chains;
            self.free_tree(old_root);
            let e = &mut self.entries[idx];
            e.chains = NodeId::NONE;
            e.node_count = 0;
            e.action = action;
            e.priority = refresh_priority(e.priority, 0);
            fdb_debug!(
                "add_rule: syscall {} replaced with unconditional action",
                syscall_num
            );
            return Ok(());
        }

        // Phase B, case 4: both sides have a chain tree; merge (Phase C).
        self.chain_merge(idx, new_chain.root, new_chain.node_count, action)
    }

    // ---- Phase A -------------------------------------------------------

    /// Build a single linear chain from `chain`'s valid entries: one node
    /// per predicate, operator-normalized, with the final node's leaf set to
    /// `action`. Nothing here is linked into the stored database yet.
    fn build_new_chain(&mut self, chain: &[ChainArg], action: Action) -> FdbResult<NewChain> {
        let arg_count_max = self.arch.arg_count_max() as usize;
        let mut root = NodeId::NONE;
        let mut prev: Option<(NodeId, bool)> = None;
        let mut last: Option<(NodeId, bool)> = None;
        let mut node_count = 0u32;

        for arg in chain.iter().take(arg_count_max) {
            if !arg.valid {
                continue;
            }
            let (stored_op, tf_flag) = StoredOp::normalize(arg.op);
            let predicate = Predicate::new(arg.arg_index, stored_op, arg.datum, arg.mask);
            let node_id = match self.arena.alloc(Node::new(predicate)) {
                Some(id) => id,
                None => {
                    self.free_tree(root);
                    return Err(FdbError::OutOfMemory);
                }
            };
            node_count += 1;

            if let Some((prev_id, prev_tf)) = prev {
                self.arena.get_mut(prev_id).set_next(prev_tf, node_id);
            } else {
                root = node_id;
            }
            prev = Some((node_id, tf_flag));
            last = Some((node_id, tf_flag));
        }

        if let Some((id, tf)) = last {
            self.arena.get_mut(id).set_leaf(tf, action);
        }

        Ok(NewChain { root, node_count })
    }

    // ---- Phase C ---------------------------------------------------------

    /// Merge `s_root` (a freshly built, `s_node_count`-long chain ending in
    /// leaf action `action`) into `self.entries[entry_idx]`'s existing
    /// chain tree.
    fn chain_merge(
        &mut self,
        entry_idx: usize,
        s_root: NodeId,
        s_node_count: u32,
        action: Action,
    ) -> FdbResult<()> {
        enum Outcome {
            /// Nothing from the new chain is retained; free all of it.
            DiscardAll,
            /// A predicate conflict; free all of the new chain, report it.
            Conflict,
            /// Some prefix of the new chain was consumed descending into
            /// the existing tree before `c_prev`; the remainder from `c`
            /// onward is now owned by the existing tree. Free the prefix
            /// only (a no-op if nothing was consumed).
            Spliced,
        }

        let mut c_prev = NodeId::NONE;
        let mut c = s_root;
        let mut link = ParentLink::Root;
        let mut ec = self.link_get(entry_idx, link);
        let mut s_remaining = s_node_count;

        let outcome = 'walk: loop {
            if c.is_none() || ec.is_none() {
                break 'walk None;
            }

            let c_node = *self.arena.get(c);
            let ec_pred = self.arena.get(ec).predicate;

            if c_node.predicate == ec_pred {
                let c_is_leaf = c_node.next_true.is_none() && c_node.next_false.is_none();
                let ec_is_leaf = {
                    let e = self.arena.get(ec);
                    e.next_true.is_none() && e.next_false.is_none()
                };

                if c_is_leaf && ec_is_leaf {
                    // Both chains terminate here: fold whichever of c's
                    // branches carry a leaf action into ec.
                    if c_node.act_t_flag {
                        let has = self.arena.get(ec).act_t_flag;
                        if has {
                            if self.arena.get(ec).act_t != action {
                                break 'walk Some(Outcome::Conflict);
                            }
                        } else {
                            let em = self.arena.get_mut(ec);
                            em.act_t_flag = true;
                            em.act_t = action;
                        }
                    }
                    if c_node.act_f_flag {
                        let has = self.arena.get(ec).act_f_flag;
                        if has {
                            if self.arena.get(ec).act_f != action {
                                break 'walk Some(Outcome::Conflict);
                            }
                        } else {
                            let em = self.arena.get_mut(ec);
                            em.act_f_flag = true;
                            em.act_f = action;
                        }
                    }

                    // Collapse (I5): a node whose two branches now agree is
                    // redundant — cut it out of the tree and promote its
                    // action onto whatever pointed at it.
                    let snap = *self.arena.get(ec);
                    if snap.act_t_flag && snap.act_f_flag && snap.act_t == snap.act_f {
                        let mut root = self.entries[entry_idx].chains;
                        let freed = self.tree_remove(&mut root, ec, snap.act_t);
                        self.entries[entry_idx].chains = root;
                        self.entries[entry_idx].node_count -= freed;
                        fdb_trace!(
                            "chain_merge: collapsed redundant node for syscall {}",
                            self.entries[entry_idx].num
                        );
                    }
                    break 'walk Some(Outcome::DiscardAll);
                } else if c_is_leaf {
                    // New chain is shorter: it fully decides branch b, so it
                    // replaces whatever existing subtree is on b, provided
                    // that subtree never disagrees with `action`.
                    let branch = c_node.act_t_flag;
                    let existing_child = self.arena.get(ec).next(branch);
                    if !self.act_check(existing_child, action) {
                        break 'walk Some(Outcome::Conflict);
                    }
                    let freed = self.free_tree(existing_child);
                    {
                        let em = self.arena.get_mut(ec);
                        em.set_next(branch, NodeId::NONE);
                        em.set_leaf(branch, action);
                    }
                    self.entries[entry_idx].node_count -= freed;
                    break 'walk Some(Outcome::DiscardAll);
                } else {
                    // c has exactly one successor (Phase A built a strictly
                    // linear chain); find out which.
                    let branch = c_node.next_true.is_some();
                    let c_next = c_node.next(branch);
                    let ec_next = self.arena.get(ec).next(branch);

                    if ec_next.is_some() {
                        // Both sides continue on b: descend.
                        c_prev = c;
                        link = ParentLink::Child(ec, branch);
                        c = c_next;
                        ec = ec_next;
                        s_remaining -= 1;
                        continue 'walk;
                    } else if self.arena.get(ec).leaf_flag(branch) {
                        // Existing chain is shorter and already decides b.
                        if self.arena.get(ec).leaf_action(branch) == action {
                            break 'walk Some(Outcome::DiscardAll);
                        } else {
                            break 'walk Some(Outcome::Conflict);
                        }
                    } else {
                        // Branch b is wholly undecided: graft c's subtree
                        // onto it directly, discarding c itself (its
                        // children become ec's, not c's problem anymore).
                        self.arena.get_mut(ec).set_next(branch, c_next);
                        self.entries[entry_idx].node_count += s_remaining.saturating_sub(1);
                        self.arena.release(c);
                        break 'walk Some(Outcome::Spliced);
                    }
                }
            } else if c_node.predicate < ec_pred {
                let ec_level_prev = self.arena.get(ec).level_prev;
                if ec_level_prev.is_none() {
                    // c becomes the new head of this level.
                    self.arena.get_mut(ec).level_prev = c;
                    self.arena.get_mut(c).level_next = ec;
                    if self.link_get(entry_idx, link) == ec {
                        self.link_set(entry_idx, link, c);
                    }
                    self.entries[entry_idx].node_count += s_remaining;
                    break 'walk Some(Outcome::Spliced);
                } else {
                    ec = ec_level_prev;
                    continue 'walk;
                }
            } else {
                let ec_level_next = self.arena.get(ec).level_next;
                if ec_level_next.is_none() {
                    self.arena.get_mut(ec).level_next = c;
                    self.arena.get_mut(c).level_prev = ec;
                    self.entries[entry_idx].node_count += s_remaining;
                    break 'walk Some(Outcome::Spliced);
                }
                let en_pred = self.arena.get(ec_level_next).predicate;
                if c_node.predicate < en_pred {
                    self.arena.get_mut(c).level_next = ec_level_next;
                    self.arena.get_mut(ec_level_next).level_prev = c;
                    self.arena.get_mut(ec).level_next = c;
                    self.arena.get_mut(c).level_prev = ec;
                    self.entries[entry_idx].node_count += s_remaining;
                    break 'walk Some(Outcome::Spliced);
                } else {
                    ec = ec_level_next;
                    continue 'walk;
                }
            }
        };

        let result = match outcome {
            Some(Outcome::DiscardAll) => {
                self.free_tree(s_root);
                Ok(())
            }
            Some(Outcome::Conflict) => {
                self.free_tree(s_root);
                Err(FdbError::AlreadyExists)
            }
            Some(Outcome::Spliced) => {
                if c_prev.is_some() {
                    self.arena.get_mut(c_prev).next_true = NodeId::NONE;
                    self.arena.get_mut(c_prev).next_false = NodeId::NONE;
                    self.free_tree(s_root);
                }
                Ok(())
            }
            None => {
                self.free_tree(s_root);
                Err(FdbError::Fault(
                    "chain merge ran off the end of a chain without resolving",
                ))
            }
        };

        let e = &mut self.entries[entry_idx];
        e.priority = refresh_priority(e.priority, e.node_count);

        result
    }

    fn link_get(&self, entry_idx: usize, link: ParentLink) -> NodeId {
        match link {
            ParentLink::Root => self.entries[entry_idx].chains,
            ParentLink::Child(parent, branch) => self.arena.get(parent).next(branch),
        }
    }

    fn link_set(&mut self, entry_idx: usize, link: ParentLink, value: NodeId) {
        match link {
            ParentLink::Root => self.entries[entry_idx].chains = value,
            ParentLink::Child(parent, branch) => self.arena.get_mut(parent).set_next(branch, value),
        }
    }

    // ---- shared tree helpers (free / act_check / remove) ----------------

    /// `_db_tree_act_check`: does every leaf reachable from `tree` agree
    /// with `action`? An absent tree vacuously agrees.
    fn act_check(&self, tree: NodeId, action: Action) -> bool {
        if tree.is_none() {
            return true;
        }
        let mut stack = vec![tree];
        while let Some(id) = stack.pop() {
            let mut head = id;
            while self.arena.get(head).level_prev.is_some() {
                head = self.arena.get(head).level_prev;
            }
            let mut iter = head;
            while iter.is_some() {
                let node = self.arena.get(iter);
                if node.act_t_flag && node.act_t != action {
                    return false;
                }
                if node.act_f_flag && node.act_f != action {
                    return false;
                }
                if node.next_true.is_some() {
                    stack.push(node.next_true);
                }
                if node.next_false.is_some() {
                    stack.push(node.next_false);
                }
                iter = node.level_next;
            }
        }
        true
    }

    /// `_db_tree_free`: release every node reachable from `tree`, including
    /// its own level-siblings and their subtrees. Iterative (explicit work
    /// stack) rather than recursive, since a stored tree's depth is only
    /// bounded by the number of merges that built it, not by
    /// `arg_count_max`. Returns the number of nodes freed.
    fn free_tree(&mut self, tree: NodeId) -> u32 {
        if tree.is_none() {
            return 0;
        }
        let mut stack = vec![tree];
        let mut to_release = Vec::new();
        let mut count = 0u32;
        while let Some(id) = stack.pop() {
            let mut head = id;
            while self.arena.get(head).level_prev.is_some() {
                head = self.arena.get(head).level_prev;
            }
            let mut iter = head;
            while iter.is_some() {
                let node = *self.arena.get(iter);
                if node.next_true.is_some() {
                    stack.push(node.next_true);
                }
                if node.next_false.is_some() {
                    stack.push(node.next_false);
                }
                to_release.push(iter);
                count += 1;
                iter = node.level_next;
            }
        }
        for id in to_release {
            self.arena.release(id);
        }
        count
    }

    /// `_db_tree_remove`: locate `target` anywhere beneath `*root`, detach
    /// it, and promote `action` onto whatever pointed at it — a level
    /// neighbor link if `target` was a sibling, or a parent's branch action
    /// if `target` was someone's successor. Returns the number of nodes
    /// freed (`target`'s own now-redundant subtree).
    fn tree_remove(&mut self, root: &mut NodeId, target: NodeId, action: Action) -> u32 {
        if root.is_none() || target.is_none() {
            return 0;
        }

        enum Link {
            Root,
            True(NodeId),
            False(NodeId),
        }

        let mut stack = vec![Link::Root];
        while let Some(link) = stack.pop() {
            let list_head = match link {
                Link::Root => *root,
                Link::True(p) => self.arena.get(p).next_true,
                Link::False(p) => self.arena.get(p).next_false,
            };
            if list_head.is_none() {
                continue;
            }

            let mut head = list_head;
            while self.arena.get(head).level_prev.is_some() {
                head = self.arena.get(head).level_prev;
            }

            let mut iter = head;
            while iter.is_some() {
                if iter == target {
                    let prev = self.arena.get(iter).level_prev;
                    let next = self.arena.get(iter).level_next;
                    if iter == head {
                        let new_head = if prev.is_some() { prev } else { next };
                        match link {
                            Link::Root => *root = new_head,
                            Link::True(p) => self.arena.get_mut(p).next_true = new_head,
                            Link::False(p) => self.arena.get_mut(p).next_false = new_head,
                        }
                    }
                    if prev.is_some() {
                        self.arena.get_mut(prev).level_next = next;
                    }
                    if next.is_some() {
                        self.arena.get_mut(next).level_prev = prev;
                    }
                    self.arena.get_mut(iter).level_prev = NodeId::NONE;
                    self.arena.get_mut(iter).level_next = NodeId::NONE;
                    return self.free_tree(iter);
                }

                let node = *self.arena.get(iter);
                if node.next_true == target {
                    let em = self.arena.get_mut(iter);
                    em.act_t_flag = true;
                    em.act_t = action;
                    let freed = self.free_tree(node.next_true);
                    self.arena.get_mut(iter).next_true = NodeId::NONE;
                    return freed;
                }
                if node.next_false == target {
                    let em = self.arena.get_mut(iter);
                    em.act_f_flag = true;
                    em.act_f = action;
                    let freed = self.free_tree(node.next_false);
                    self.arena.get_mut(iter).next_false = NodeId::NONE;
                    return freed;
                }

                stack.push(Link::True(iter));
                stack.push(Link::False(iter));
                iter = node.level_next;
            }
        }
        0
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Copy)]
    struct StubArch;
    impl ArchDescriptor for StubArch {
        fn name(&self) -> &'static str {
            "stub"
        }
        fn arg_count_max(&self) -> u8 {
            6
        }
    }

    const ALLOW: Action = Action::new(0x7fff_0000);
    const DENY: Action = Action::new(0x0005_0000);
    const TRAP: Action = Action::new(0x0003_0000);

    fn new_fdb() -> Fdb<StubArch> {
        Fdb::new(StubArch, DENY)
    }

    fn eq_arg(idx: u8, datum: u64) -> ChainArg {
        ChainArg::new(idx, crate::op::CmpOp::Eq, datum)
    }

    #[test]
    fn s1_unconditional_rule() {
        let mut db = new_fdb();
        db.add_rule(ALLOW, 0, &[]).unwrap();
        let e = db.entry(0).unwrap();
        assert!(e.is_unconditional());
        assert_eq!(e.action, ALLOW);
        assert_eq!(e.node_count, 0);
    }

    #[test]
    fn s2_single_predicate_rule() {
        let mut db = new_fdb();
        db.add_rule(ALLOW, 5, &[eq_arg(0, 42)]).unwrap();
        let e = db.entry(5).unwrap();
        assert!(!e.is_unconditional());
        assert_eq!(e.node_count, 1);
        let node = db.node(e.chains);
        assert!(node.act_t_flag);
        assert_eq!(node.act_t, ALLOW);
        assert!(!node.act_f_flag);
        assert!(node.next_true.is_none() && node.next_false.is_none());
    }

    #[test]
    fn s3_two_predicate_chain() {
        let mut db = new_fdb();
        db.add_rule(ALLOW, 5, &[eq_arg(0, 1), eq_arg(1, 2)])
            .unwrap();
        let e = db.entry(5).unwrap();
        assert_eq!(e.node_count, 2);
        let root = db.node(e.chains);
        assert_eq!(root.predicate.arg_index, 0);
        let child = db.node(root.next_true);
        assert_eq!(child.predicate.arg_index, 1);
        assert_eq!(child.act_t, ALLOW);
    }

    #[test]
    fn s4_idempotent_duplicate_rule() {
        let mut db = new_fdb();
        db.add_rule(ALLOW, 5, &[eq_arg(0, 1)]).unwrap();
        db.add_rule(ALLOW, 5, &[eq_arg(0, 1)]).unwrap();
        let e = db.entry(5).unwrap();
        assert_eq!(e.node_count, 1);
    }

    #[test]
    fn s4_conflicting_duplicate_rule_fails() {
        let mut db = new_fdb();
        db.add_rule(ALLOW, 5, &[eq_arg(0, 1)]).unwrap();
        let err = db.add_rule(TRAP, 5, &[eq_arg(0, 1)]).unwrap_err();
        assert_eq!(err, FdbError::AlreadyExists);
        // failed merge must not have mutated node_count
        assert_eq!(db.entry(5).unwrap().node_count, 1);
    }

    #[test]
    fn s5_negated_predicate_leaves_other_branch_empty() {
        let mut db = new_fdb();
        db.add_rule(ALLOW, 5, &[ChainArg::new(0, crate::op::CmpOp::Ne, 5)])
            .unwrap();
        let e = db.entry(5).unwrap();
        let node = db.node(e.chains);
        assert_eq!(node.predicate.op, StoredOp::Eq);
        assert!(node.act_f_flag);
        assert_eq!(node.act_f, ALLOW);
        assert!(!node.act_t_flag);
        assert!(node.next_true.is_none());
    }

    #[test]
    fn s6_sibling_predicates_on_same_argument() {
        let mut db = new_fdb();
        db.add_rule(ALLOW, 5, &[eq_arg(0, 1)]).unwrap();
        db.add_rule(DENY, 5, &[eq_arg(0, 2)]).unwrap();
        let e = db.entry(5).unwrap();
        assert_eq!(e.node_count, 2);
        let head = db.node(e.chains);
        // two siblings at the same level, linked both ways
        let (a, b) = if head.predicate.datum == 1 {
            (e.chains, head.level_next)
        } else {
            (head.level_next, e.chains)
        };
        assert_eq!(db.node(a).predicate.datum, 1);
        assert_eq!(db.node(b).predicate.datum, 2);
        assert_eq!(db.node(b).level_prev, a);
    }

    #[test]
    fn sibling_insert_becomes_new_level_head() {
        let mut db = new_fdb();
        db.add_rule(ALLOW, 5, &[eq_arg(0, 5)]).unwrap();
        let old_head = db.entry(5).unwrap().chains;

        // A smaller datum must become the new level-list head, which means
        // `entries[idx].chains` (the root-pointer patch, not just a level
        // link) has to follow it.
        db.add_rule(DENY, 5, &[eq_arg(0, 2)]).unwrap();
        let e = db.entry(5).unwrap();
        assert_eq!(e.node_count, 2);

        let new_head = e.chains;
        assert_ne!(new_head, old_head);
        assert_eq!(db.node(new_head).predicate.datum, 2);
        assert_eq!(db.node(new_head).level_next, old_head);
        assert_eq!(db.node(old_head).level_prev, new_head);
    }

    #[test]
    fn sibling_insert_splices_between_existing_siblings() {
        let mut db = new_fdb();
        db.add_rule(ALLOW, 5, &[eq_arg(0, 1)]).unwrap();
        db.add_rule(DENY, 5, &[eq_arg(0, 5)]).unwrap();
        let head = db.entry(5).unwrap().chains;
        let tail = db.node(head).level_next;
        assert_eq!(db.node(tail).predicate.datum, 5);

        // A datum strictly between two existing siblings must splice in
        // between them, touching neither the level-list head nor tail.
        db.add_rule(TRAP, 5, &[eq_arg(0, 3)]).unwrap();
        let e = db.entry(5).unwrap();
        assert_eq!(e.node_count, 3);
        assert_eq!(e.chains, head, "a between-splice must not move the root pointer");

        let middle = db.node(head).level_next;
        assert_ne!(middle, tail);
        assert_eq!(db.node(middle).predicate.datum, 3);
        assert_eq!(db.node(middle).level_prev, head);
        assert_eq!(db.node(middle).level_next, tail);
        assert_eq!(db.node(tail).level_prev, middle);
    }

    #[test]
    fn unconditional_existing_subsumes_new_conditional() {
        let mut db = new_fdb();
        db.add_rule(ALLOW, 5, &[]).unwrap();
        db.add_rule(DENY, 5, &[eq_arg(0, 1)]).unwrap();
        let e = db.entry(5).unwrap();
        assert!(e.is_unconditional());
        assert_eq!(e.action, ALLOW);
    }

    #[test]
    fn new_unconditional_replaces_existing_chain() {
        let mut db = new_fdb();
        db.add_rule(ALLOW, 5, &[eq_arg(0, 1)]).unwrap();
        db.add_rule(DENY, 5, &[]).unwrap();
        let e = db.entry(5).unwrap();
        assert!(e.is_unconditional());
        assert_eq!(e.action, DENY);
        assert_eq!(e.node_count, 0);
    }

    #[test]
    fn shorter_new_chain_generalizes_and_discards_longer_existing() {
        let mut db = new_fdb();
        db.add_rule(ALLOW, 5, &[eq_arg(0, 1), eq_arg(1, 2)])
            .unwrap();
        db.add_rule(ALLOW, 5, &[eq_arg(0, 1)]).unwrap();
        let e = db.entry(5).unwrap();
        assert_eq!(e.node_count, 1);
        let node = db.node(e.chains);
        assert!(node.act_t_flag);
        assert_eq!(node.act_t, ALLOW);
        assert!(node.next_true.is_none());
    }

    #[test]
    fn shorter_new_chain_conflicts_with_incompatible_longer_existing() {
        let mut db = new_fdb();
        db.add_rule(ALLOW, 5, &[eq_arg(0, 1), eq_arg(1, 2)])
            .unwrap();
        let err = db.add_rule(TRAP, 5, &[eq_arg(0, 1)]).unwrap_err();
        assert_eq!(err, FdbError::AlreadyExists);
    }

    #[test]
    fn shorter_existing_with_matching_action_subsumes_longer_new_chain() {
        let mut db = new_fdb();
        db.add_rule(ALLOW, 5, &[eq_arg(0, 1)]).unwrap();
        db.add_rule(ALLOW, 5, &[eq_arg(0, 1), eq_arg(1, 2)])
            .unwrap();
        let e = db.entry(5).unwrap();
        // existing already decides the branch with the same action, so the
        // longer, more specific new chain contributes nothing.
        assert_eq!(e.node_count, 1);
        let root = db.node(e.chains);
        assert!(root.act_t_flag);
        assert_eq!(root.act_t, ALLOW);
        assert!(root.next_true.is_none());
    }

    #[test]
    fn shorter_existing_with_conflicting_action_rejects_longer_new_chain() {
        let mut db = new_fdb();
        db.add_rule(ALLOW, 5, &[eq_arg(0, 1)]).unwrap();
        let err = db
            .add_rule(TRAP, 5, &[eq_arg(0, 1), eq_arg(1, 2)])
            .unwrap_err();
        assert_eq!(err, FdbError::AlreadyExists);
        assert_eq!(db.entry(5).unwrap().node_count, 1);
    }

    #[test]
    fn graft_new_branch_onto_previously_undecided_side() {
        let mut db = new_fdb();
        // arg0 != 5 -> ALLOW leaves the true branch of the EQ-5 node empty.
        db.add_rule(ALLOW, 5, &[ChainArg::new(0, crate::op::CmpOp::Ne, 5)])
            .unwrap();
        // now decide the true branch (arg0 == 5) with a deeper chain.
        db.add_rule(DENY, 5, &[eq_arg(0, 5), eq_arg(1, 9)]).unwrap();
        let e = db.entry(5).unwrap();
        let root = db.node(e.chains);
        assert!(!root.act_t_flag);
        assert!(root.next_true.is_some());
        let grafted = db.node(root.next_true);
        assert_eq!(grafted.predicate.arg_index, 1);
        assert_eq!(grafted.act_t, DENY);
        assert_eq!(e.node_count, 2);
    }

    #[test]
    fn both_branches_agreeing_collapses_node_away() {
        let mut db = new_fdb();
        // arg0 == 5 -> ALLOW, then arg0 != 5 -> ALLOW: both branches of the
        // single decision node now agree, so the node is redundant (I5) and
        // the whole entry degenerates back to unconditional ALLOW.
        db.add_rule(ALLOW, 5, &[eq_arg(0, 5)]).unwrap();
        db.add_rule(ALLOW, 5, &[ChainArg::new(0, crate::op::CmpOp::Ne, 5)])
            .unwrap();
        let e = db.entry(5).unwrap();
        assert!(e.is_unconditional());
        assert_eq!(e.node_count, 0);
    }

    #[test]
    fn entries_stay_sorted_by_syscall_number() {
        let mut db = new_fdb();
        db.add_rule(ALLOW, 10, &[]).unwrap();
        db.add_rule(ALLOW, 2, &[]).unwrap();
        db.add_rule(ALLOW, 7, &[]).unwrap();
        let nums: Vec<i32> = db.iterate().map(|e| e.num).collect();
        assert_eq!(nums, vec![2, 7, 10]);
    }

    #[test]
    fn arena_capacity_hint_env_var_is_read() {
        std::env::set_var("FDB_ARENA_CAPACITY_HINT", "8");
        let db = new_fdb();
        assert!(db.arena.capacity() >= 8);
        std::env::remove_var("FDB_ARENA_CAPACITY_HINT");
    }

    #[test]
    fn out_of_memory_on_bounded_arena() {
        let mut db = Fdb::with_node_budget(StubArch, DENY, 1);
        db.add_rule(ALLOW, 5, &[eq_arg(0, 1)]).unwrap();
        let err = db
            .add_rule(ALLOW, 6, &[eq_arg(0, 1)])
            .unwrap_err();
        assert_eq!(err, FdbError::OutOfMemory);
        // the failed attempt must not have created a partial entry
        assert!(db.entry(6).is_none());
    }

    #[test]
    fn chain_beyond_arg_count_max_is_ignored() {
        let mut db = new_fdb();
        let chain: Vec<ChainArg> = (0..8u8).map(|i| eq_arg(i % 6, i as u64)).collect();
        db.add_rule(ALLOW, 5, &chain).unwrap();
        // arg_count_max() == 6, so only the first 6 valid slots are used
        assert_eq!(db.entry(5).unwrap().node_count, 6);
    }

    /// Xorshift32 — deterministic and seeded, so the randomized workload
    /// below is reproducible without pulling in a `rand` dependency.
    struct Xorshift32(u32);

    impl Xorshift32 {
        fn next_u32(&mut self) -> u32 {
            let mut x = self.0;
            x ^= x << 13;
            x ^= x >> 17;
            x ^= x << 5;
            self.0 = x;
            x
        }

        fn next_below(&mut self, bound: u32) -> u32 {
            self.next_u32() % bound
        }
    }

    /// Walks every stored entry's chain tree, checking I1 (no branch is both
    /// a successor and a leaf), I2 (level-list siblings strictly ascending
    /// and back-linked), I4 (`node_count` matches the reachable set) and I5
    /// (no uncollapsed node with agreeing leaf actions on both branches).
    /// I3 (entries strictly ascending by `num`) is checked up front. Panics
    /// with a descriptive message on the first violation found.
    fn check_invariants<A: ArchDescriptor>(db: &Fdb<A>) {
        use std::collections::HashSet;

        let nums: Vec<i32> = db.iterate().map(|e| e.num).collect();
        for w in nums.windows(2) {
            assert!(
                w[0] < w[1],
                "I3 violated: entries not strictly ascending: {:?}",
                nums
            );
        }

        for e in db.iterate() {
            if e.chains.is_none() {
                assert_eq!(
                    e.node_count, 0,
                    "unconditional entry {} must have node_count 0",
                    e.num
                );
                continue;
            }

            let mut reachable: HashSet<u32> = HashSet::new();
            let mut stack = vec![e.chains];
            while let Some(id) = stack.pop() {
                if !reachable.insert(id.as_u32()) {
                    continue;
                }
                let node = db.node(id);

                assert!(
                    !(node.next_true.is_some() && node.act_t_flag),
                    "I1 violated on entry {} node {:?}: true branch has both a successor and a leaf",
                    e.num, id
                );
                assert!(
                    !(node.next_false.is_some() && node.act_f_flag),
                    "I1 violated on entry {} node {:?}: false branch has both a successor and a leaf",
                    e.num, id
                );
                if node.act_t_flag && node.act_f_flag {
                    assert_ne!(
                        node.act_t, node.act_f,
                        "I5 violated on entry {} node {:?}: both branches leaf and agreeing but not collapsed",
                        e.num, id
                    );
                }

                if node.level_next.is_some() {
                    let next = db.node(node.level_next);
                    assert_eq!(
                        next.level_prev, id,
                        "I2 violated on entry {}: level_prev back-link broken at node {:?}",
                        e.num, id
                    );
                    assert!(
                        node.predicate < next.predicate,
                        "I2 violated on entry {}: siblings not strictly ascending at node {:?}",
                        e.num, id
                    );
                    stack.push(node.level_next);
                }
                if node.next_true.is_some() {
                    stack.push(node.next_true);
                }
                if node.next_false.is_some() {
                    stack.push(node.next_false);
                }
            }

            assert_eq!(
                reachable.len() as u32,
                e.node_count,
                "I4 violated on entry {}: node_count {} but {} nodes reachable",
                e.num, e.node_count, reachable.len()
            );
        }
    }

    #[test]
    fn randomized_workload_preserves_invariants() {
        let mut rng = Xorshift32(0xC0FF_EE01);
        let mut db = new_fdb();
        let actions = [ALLOW, DENY, TRAP];

        for _ in 0..500 {
            let syscall_num = rng.next_below(6) as i32;
            let action = actions[rng.next_below(actions.len() as u32) as usize];
            let chain_len = rng.next_below(4);
            let chain: Vec<ChainArg> = (0..chain_len)
                .map(|_| {
                    let arg_idx = rng.next_below(3) as u8;
                    let op = if rng.next_below(2) == 0 {
                        crate::op::CmpOp::Eq
                    } else {
                        crate::op::CmpOp::Ne
                    };
                    let datum = rng.next_below(4) as u64;
                    ChainArg::new(arg_idx, op, datum)
                })
                .collect();

            // Conflicting and duplicate rules are expected and rejected by
            // `add_rule`; only the invariants over whatever did get stored
            // are asserted.
            let _ = db.add_rule(action, syscall_num, &chain);
            check_invariants(&db);
        }
    }
}
