//! Table-driven MOS 6502 instruction engine.
//!
//! Each opcode byte indexes three 256-entry tables (addressing mode,
//! instruction, base cycles). One call to [`Mos6502::step`] fetches, resolves
//! and executes a whole instruction, then charges its cycles: the table value
//! plus one for an eligible page cross, one or two for a taken branch, and one
//! for a decimal-mode correction.
//!
//! Processor state is a plain [`CpuState`] value owned by the host and passed
//! into every call alongside a [`Bus`](emu_core::Bus), so several processors
//! can run side by side. Engine options (undocumented opcodes, decimal mode)
//! live in a [`Config`] chosen when the engine is built.

mod addressing;
mod config;
mod engine;
pub mod flags;
mod instructions;
mod state;
pub mod tables;

pub use addressing::{Mode, Resolved, crosses_page, resolve};
pub use config::Config;
pub use engine::{Executed, Hook, Mos6502, NMI_VECTOR, RESET_VECTOR};
pub use instructions::{IRQ_VECTOR, Instr};
pub use state::{CpuState, STACK_BASE, read16};
