//! Concrete per-architecture descriptors implementing `fdb_core::Arch`.

#[allow(non_camel_case_types)]
pub mod x86_64;

pub use x86_64::X86_64;
