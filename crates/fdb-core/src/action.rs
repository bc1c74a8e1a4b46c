//! Filter action

use core::fmt;

/// An opaque 32-bit filter decision.
///
/// `Action` carries no meaning to the filter database itself — it is
/// produced by a caller and later interpreted by the (out-of-scope) emitter.
/// The database only ever compares actions for equality, never orders or
/// decodes them.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct Action(pub u32);

impl Action {
    #[inline]
    pub const fn new(raw: u32) -> Self {
        Action(raw)
    }

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl From<u32> for Action {
    #[inline]
    fn from(raw: u32) -> Self {
        Action(raw)
    }
}

impl From<Action> for u32 {
    #[inline]
    fn from(action: Action) -> Self {
        action.0
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Action(0x{:08x})", self.0)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08x}", self.0)
    }
}
