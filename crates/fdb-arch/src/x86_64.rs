//! x86_64 architecture descriptor
//!
//! The table below is a representative sample of the real x86_64 syscall
//! table (grounded in libseccomp's `arch-x86_64-syscalls.c`), not a
//! complete one — the full table is reference data the filter database
//! itself is indifferent to (spec §3, Non-goals); a production build would
//! generate this table from the kernel's own syscall headers rather than
//! hand-maintain it.

use fdb_core::{ArchDescriptor, SyscallResolver, RESOLVE_ERROR};

const SYSCALLS: &[(&str, i32)] = &[
    ("read", 0),
    ("write", 1),
    ("open", 2),
    ("close", 3),
    ("stat", 4),
    ("fstat", 5),
    ("lstat", 6),
    ("poll", 7),
    ("lseek", 8),
    ("mmap", 9),
    ("mprotect", 10),
    ("munmap", 11),
    ("brk", 12),
    ("rt_sigaction", 13),
    ("rt_sigprocmask", 14),
    ("ioctl", 16),
    ("pread64", 17),
    ("pwrite64", 18),
    ("readv", 19),
    ("writev", 20),
    ("access", 21),
    ("pipe", 22),
    ("select", 23),
    ("dup", 32),
    ("dup2", 33),
    ("nanosleep", 35),
    ("alarm", 37),
    ("connect", 42),
    ("accept", 43),
    ("socket", 41),
    ("bind", 49),
    ("listen", 50),
    ("clone", 56),
    ("fork", 57),
    ("vfork", 58),
    ("execve", 59),
    ("exit", 60),
    ("wait4", 61),
    ("kill", 62),
    ("fcntl", 72),
    ("flock", 73),
    ("fsync", 74),
    ("fdatasync", 75),
    ("chdir", 80),
    ("fchdir", 81),
    ("rename", 82),
    ("mkdir", 83),
    ("rmdir", 84),
    ("creat", 85),
    ("unlink", 87),
    ("chmod", 90),
    ("fchmod", 91),
    ("chown", 92),
    ("fchown", 93),
    ("chroot", 161),
    ("arch_prctl", 158),
    ("gettid", 186),
    ("futex", 202),
    ("epoll_create", 213),
    ("exit_group", 231),
];

/// x86_64's six-argument calling convention.
const ARG_COUNT_MAX: u8 = 6;

/// `ArchDescriptor`/`SyscallResolver` for x86_64, backed by a linear,
/// statically-allocated syscall table.
#[derive(Debug, Clone, Copy, Default)]
pub struct X86_64;

impl ArchDescriptor for X86_64 {
    fn name(&self) -> &'static str {
        "x86_64"
    }

    fn arg_count_max(&self) -> u8 {
        ARG_COUNT_MAX
    }
}

impl SyscallResolver for X86_64 {
    fn resolve_name(&self, name: &str) -> i32 {
        SYSCALLS
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, num)| *num)
            .unwrap_or(RESOLVE_ERROR)
    }

    fn resolve_num(&self, num: i32) -> Option<&str> {
        SYSCALLS.iter().find(|(_, n)| *n == num).map(|(name, _)| *name)
    }

    fn iterate(&self, index: usize) -> Option<(&str, i32)> {
        SYSCALLS.get(index).map(|(name, num)| (*name, *num))
    }
}
