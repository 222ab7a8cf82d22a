//! 6502 addressing modes.
//!
//! The 6502 has 13 addressing modes:
//! - Implied: No operand (e.g., CLC, RTS)
//! - Accumulator: Operates on A register (e.g., ASL A)
//! - Immediate: #$nn (the operand is the next instruction byte)
//! - Zero Page: $nn (8-bit address in page zero)
//! - Zero Page,X: $nn,X (8-bit address + X, wraps in page zero)
//! - Zero Page,Y: $nn,Y (8-bit address + Y, wraps in page zero)
//! - Relative: Branch offset (-128 to +127)
//! - Absolute: $nnnn (16-bit address)
//! - Absolute,X: $nnnn,X (16-bit address + X, may cross page)
//! - Absolute,Y: $nnnn,Y (16-bit address + Y, may cross page)
//! - Indirect: ($nnnn) (JMP only, buggy page boundary behavior)
//! - Indexed Indirect: ($nn,X) (pointer in zero page indexed by X)
//! - Indirect Indexed: ($nn),Y (zero page pointer + Y)
//!
//! Resolution only computes the effective address. It never reads the
//! operand itself; that is left to the instruction handler.

use emu_core::Bus;

use crate::state::CpuState;

/// Addressing mode tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Mode {
    #[default]
    Implied,
    Accumulator,
    Immediate,
    ZeroPage,
    ZeroPageX,
    ZeroPageY,
    Relative,
    Absolute,
    AbsoluteX,
    AbsoluteY,
    Indirect,
    IndirectX,
    IndirectY,
}

impl Mode {
    /// Number of operand bytes that follow the opcode.
    #[must_use]
    pub const fn operand_len(self) -> u16 {
        match self {
            Mode::Implied | Mode::Accumulator => 0,
            Mode::Immediate
            | Mode::ZeroPage
            | Mode::ZeroPageX
            | Mode::ZeroPageY
            | Mode::Relative
            | Mode::IndirectX
            | Mode::IndirectY => 1,
            Mode::Absolute | Mode::AbsoluteX | Mode::AbsoluteY | Mode::Indirect => 2,
        }
    }
}

/// Outcome of resolving one addressing mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolved {
    /// The mode that was resolved.
    pub mode: Mode,
    /// Indexing carried into the high byte of the address.
    pub page_crossed: bool,
}

/// Resolve `mode` against the instruction stream at PC.
///
/// Consumes the operand bytes, stores the effective address in `cpu.ea`
/// (or the sign-extended displacement in `cpu.rel` for relative mode), and
/// records the mode and page-cross flag on the state.
pub fn resolve<B: Bus + ?Sized>(mode: Mode, cpu: &mut CpuState, bus: &mut B) -> Resolved {
    let mut page_crossed = false;

    match mode {
        Mode::Implied | Mode::Accumulator => {}
        Mode::Immediate => {
            cpu.ea = cpu.pc;
            cpu.pc = cpu.pc.wrapping_add(1);
        }
        Mode::ZeroPage => {
            cpu.ea = u16::from(cpu.fetch(bus));
        }
        Mode::ZeroPageX => {
            cpu.ea = u16::from(cpu.fetch(bus).wrapping_add(cpu.x));
        }
        Mode::ZeroPageY => {
            cpu.ea = u16::from(cpu.fetch(bus).wrapping_add(cpu.y));
        }
        Mode::Relative => {
            // Sign-extend the displacement so a plain wrapping add moves PC
            // backwards for negative offsets.
            cpu.rel = cpu.fetch(bus) as i8 as u16;
        }
        Mode::Absolute => {
            cpu.ea = cpu.fetch16(bus);
        }
        Mode::AbsoluteX => {
            let base = cpu.fetch16(bus);
            cpu.ea = base.wrapping_add(u16::from(cpu.x));
            page_crossed = crosses_page(base, cpu.ea);
        }
        Mode::AbsoluteY => {
            let base = cpu.fetch16(bus);
            cpu.ea = base.wrapping_add(u16::from(cpu.y));
            page_crossed = crosses_page(base, cpu.ea);
        }
        Mode::Indirect => {
            let ptr = cpu.fetch16(bus);
            // The high byte never carries out of the pointer's page.
            let ptr_hi = (ptr & 0xFF00) | (ptr.wrapping_add(1) & 0x00FF);
            cpu.ea = u16::from_le_bytes([bus.read(ptr), bus.read(ptr_hi)]);
        }
        Mode::IndirectX => {
            let ptr = cpu.fetch(bus).wrapping_add(cpu.x);
            cpu.ea = read_zero_page_word(bus, ptr);
        }
        Mode::IndirectY => {
            let ptr = cpu.fetch(bus);
            let base = read_zero_page_word(bus, ptr);
            cpu.ea = base.wrapping_add(u16::from(cpu.y));
            page_crossed = crosses_page(base, cpu.ea);
        }
    }

    cpu.mode = mode;
    cpu.penalty_addr = page_crossed;
    Resolved { mode, page_crossed }
}

/// Read a pointer from page zero; the second byte wraps to $00 after $FF.
fn read_zero_page_word<B: Bus + ?Sized>(bus: &mut B, ptr: u8) -> u16 {
    let lo = bus.read(u16::from(ptr));
    let hi = bus.read(u16::from(ptr.wrapping_add(1)));
    u16::from_le_bytes([lo, hi])
}

/// True if `from` and `to` lie in different 256-byte pages.
#[must_use]
pub const fn crosses_page(from: u16, to: u16) -> bool {
    from & 0xFF00 != to & 0xFF00
}
