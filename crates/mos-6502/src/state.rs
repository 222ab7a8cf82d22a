//! 6502 register file, per-instruction scratch and running counters.

use emu_core::{Bus, Observable, Ticks, Value};

use crate::addressing::Mode;
use crate::flags::{self, U};

/// Base of the hardware stack page.
pub const STACK_BASE: u16 = 0x0100;

/// The addressable and transient state of one 6502.
///
/// The value is owned by the host and handed to the engine by `&mut` for each
/// operation, so any number of processors can share one engine.
///
/// - A: 8-bit accumulator
/// - X, Y: 8-bit index registers
/// - SP: 8-bit stack pointer (stack at $0100-$01FF)
/// - PC: 16-bit program counter
/// - P: 8-bit processor status
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CpuState {
    /// Program counter.
    pub pc: u16,
    /// Stack pointer (points to next free location).
    pub sp: u8,
    /// Accumulator.
    pub a: u8,
    /// X index register.
    pub x: u8,
    /// Y index register.
    pub y: u8,
    /// Processor status flags (see [`crate::flags`]).
    pub status: u8,

    /// Effective address of the current instruction.
    pub ea: u16,
    /// Operand fetched by the current instruction.
    pub value: u16,
    /// Widened result of the current instruction, before truncation.
    pub result: u16,
    /// Sign-extended branch displacement.
    pub rel: u16,
    /// PC before a taken branch, for page-cross detection.
    pub old_pc: u16,
    /// Opcode being executed.
    pub opcode: u8,
    /// Addressing mode of the opcode being executed.
    pub mode: Mode,
    /// The handler is eligible for the page-cross penalty.
    pub penalty_op: bool,
    /// The addressing mode crossed a page.
    pub penalty_addr: bool,

    /// Cycles charged since power-on.
    pub cycles: Ticks,
    /// Cycle count `run` executes toward.
    pub goal: Ticks,
    /// Instructions completed since power-on.
    pub instructions: u64,
}

impl Default for CpuState {
    fn default() -> Self {
        Self::new()
    }
}

impl CpuState {
    /// Power-on state, as if reset had run with a zero reset vector.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            pc: 0,
            sp: 0xFD,
            a: 0,
            x: 0,
            y: 0,
            status: U,
            ea: 0,
            value: 0,
            result: 0,
            rel: 0,
            old_pc: 0,
            opcode: 0,
            mode: Mode::Implied,
            penalty_op: false,
            penalty_addr: false,
            cycles: Ticks::ZERO,
            goal: Ticks::ZERO,
            instructions: 0,
        }
    }

    /// Check if a flag is set.
    #[must_use]
    pub const fn flag(&self, flag: u8) -> bool {
        self.status & flag != 0
    }

    /// Set or clear a flag.
    pub fn set_flag(&mut self, flag: u8, condition: bool) {
        self.status = flags::set_if(self.status, flag, condition);
    }

    /// Current stack address without modifying SP.
    #[must_use]
    pub const fn stack_addr(&self) -> u16 {
        STACK_BASE | self.sp as u16
    }

    /// Push a byte, wrapping within the stack page.
    pub fn push8<B: Bus + ?Sized>(&mut self, bus: &mut B, value: u8) {
        bus.write(self.stack_addr(), value);
        self.sp = self.sp.wrapping_sub(1);
    }

    /// Pull a byte, wrapping within the stack page.
    pub fn pull8<B: Bus + ?Sized>(&mut self, bus: &mut B) -> u8 {
        self.sp = self.sp.wrapping_add(1);
        bus.read(self.stack_addr())
    }

    /// Push a word, high byte first.
    pub fn push16<B: Bus + ?Sized>(&mut self, bus: &mut B, value: u16) {
        let [lo, hi] = value.to_le_bytes();
        self.push8(bus, hi);
        self.push8(bus, lo);
    }

    /// Pull a word, low byte first.
    pub fn pull16<B: Bus + ?Sized>(&mut self, bus: &mut B) -> u16 {
        let lo = self.pull8(bus);
        let hi = self.pull8(bus);
        u16::from_le_bytes([lo, hi])
    }

    /// Fetch the byte at PC and advance PC.
    pub fn fetch<B: Bus + ?Sized>(&mut self, bus: &mut B) -> u8 {
        let byte = bus.read(self.pc);
        self.pc = self.pc.wrapping_add(1);
        byte
    }

    /// Fetch a little-endian word at PC and advance PC by two.
    pub fn fetch16<B: Bus + ?Sized>(&mut self, bus: &mut B) -> u16 {
        let lo = self.fetch(bus);
        let hi = self.fetch(bus);
        u16::from_le_bytes([lo, hi])
    }
}

/// Read a little-endian word, e.g. an interrupt vector.
pub fn read16<B: Bus + ?Sized>(bus: &mut B, address: u16) -> u16 {
    let lo = bus.read(address);
    let hi = bus.read(address.wrapping_add(1));
    u16::from_le_bytes([lo, hi])
}

const QUERY_PATHS: &[&str] = &[
    "pc",
    "a",
    "x",
    "y",
    "sp",
    "p",
    "flags.c",
    "flags.z",
    "flags.i",
    "flags.d",
    "flags.b",
    "flags.v",
    "flags.n",
    "cycles",
    "instructions",
];

impl Observable for CpuState {
    fn query(&self, path: &str) -> Option<Value> {
        let value = match path {
            "pc" => self.pc.into(),
            "a" => self.a.into(),
            "x" => self.x.into(),
            "y" => self.y.into(),
            "sp" => self.sp.into(),
            "p" => self.status.into(),
            "flags.c" => self.flag(flags::C).into(),
            "flags.z" => self.flag(flags::Z).into(),
            "flags.i" => self.flag(flags::I).into(),
            "flags.d" => self.flag(flags::D).into(),
            "flags.b" => self.flag(flags::B).into(),
            "flags.v" => self.flag(flags::V).into(),
            "flags.n" => self.flag(flags::N).into(),
            "cycles" => self.cycles.get().into(),
            "instructions" => self.instructions.into(),
            _ => return None,
        };
        Some(value)
    }

    fn query_paths(&self) -> &'static [&'static str] {
        QUERY_PATHS
    }
}
