//! Core traits and types shared by emulated components.
//!
//! A CPU core talks to the rest of the machine through a [`Bus`], counts
//! time in [`Ticks`], and exposes its internals through [`Observable`].
//! Nothing here knows about any particular processor.

mod bus;
mod observable;
mod ticks;

pub use bus::{Bus, BusError, SimpleBus};
pub use observable::{Observable, Value};
pub use ticks::Ticks;
