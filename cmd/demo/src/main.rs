//! Filter database demo
//!
//! Builds a small syscall policy, merges a few rules that interact with
//! each other, and dumps the resulting entries in evaluation order.

use fdb::{Action, ChainArg, CmpOp, Fdb, FdbError, SyscallResolver, X86_64, RESOLVE_ERROR};

const KILL: Action = Action::new(0);
const ALLOW: Action = Action::new(1);
const ERRNO_EPERM: Action = Action::new(0x0005_0001);

fn syscall(arch: &X86_64, name: &str) -> i32 {
    let num = arch.resolve_name(name);
    if num == RESOLVE_ERROR {
        panic!("unknown syscall on this architecture: {name}");
    }
    num
}

fn main() {
    println!("=== Filter Database Demo ===\n");

    let arch = X86_64;
    let mut db = Fdb::new(arch, KILL);

    println!("Adding rules...\n");

    // Unconditionally permit read/write/close.
    for name in ["read", "write", "close"] {
        let num = syscall(&arch, name);
        db.add_rule(ALLOW, num, &[]).expect("unconditional rule");
        println!("  allow {name} ({num})");
    }

    // Permit open(path, O_RDONLY) only.
    let open_num = syscall(&arch, "open");
    db.add_rule(ALLOW, open_num, &[ChainArg::new(1, CmpOp::Eq, 0)])
        .expect("conditional rule");
    println!("  allow open({open_num}) when arg1 == 0 (O_RDONLY)");

    // Return EPERM for open(path, O_WRONLY).
    db.add_rule(ERRNO_EPERM, open_num, &[ChainArg::new(1, CmpOp::Eq, 1)])
        .expect("conditional rule");
    println!("  errno(EPERM) open({open_num}) when arg1 == 1 (O_WRONLY)");

    // Conflicting duplicate: same predicate, different action. Rejected.
    match db.add_rule(KILL, open_num, &[ChainArg::new(1, CmpOp::Eq, 0)]) {
        Err(FdbError::AlreadyExists) => {
            println!("  (rejected conflicting rule for open() arg1 == 0, as expected)")
        }
        Err(e) => println!("  unexpected error: {e}"),
        Ok(()) => println!("  unexpectedly accepted a conflicting rule"),
    }

    println!("\nResulting entries (ascending syscall number, by priority):\n");
    for entry in db.iterate() {
        let name = arch.resolve_num(entry.num).unwrap_or("?");
        if entry.is_unconditional() {
            println!(
                "  {name:<8} ({:>3}): action={} priority={}",
                entry.num, entry.action, entry.priority
            );
        } else {
            println!(
                "  {name:<8} ({:>3}): conditional, {} node(s), priority={}",
                entry.num, entry.node_count, entry.priority
            );
        }
    }

    println!("\n=== Demo Complete ===");
}
