//! Read-only inspection of component state.
//!
//! Hosts and debuggers look at registers and counters by path without
//! knowing the concrete component type. A query never changes the state
//! it reports on.

use std::fmt;

/// A dynamically-typed value returned by a state query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Value {
    /// A single flag.
    Bool(bool),
    /// An 8-bit register.
    U8(u8),
    /// A 16-bit register or address.
    U16(u16),
    /// A running counter.
    U64(u64),
}

impl Value {
    /// Widen any numeric value to `u64`; flags map to 0/1.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        match self {
            Value::Bool(v) => v as u64,
            Value::U8(v) => v as u64,
            Value::U16(v) => v as u64,
            Value::U64(v) => v,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(v) => write!(f, "{v}"),
            Value::U8(v) => write!(f, "${v:02X}"),
            Value::U16(v) => write!(f, "${v:04X}"),
            Value::U64(v) => write!(f, "{v}"),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<u8> for Value {
    fn from(v: u8) -> Self {
        Value::U8(v)
    }
}

impl From<u16> for Value {
    fn from(v: u16) -> Self {
        Value::U16(v)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::U64(v)
    }
}

/// A component whose state can be inspected by path.
pub trait Observable {
    /// Query a property such as `pc`, `a` or `flags.z`.
    ///
    /// Returns `None` if the path is not recognised.
    fn query(&self, path: &str) -> Option<Value>;

    /// Every path accepted by [`Observable::query`].
    fn query_paths(&self) -> &'static [&'static str];
}
