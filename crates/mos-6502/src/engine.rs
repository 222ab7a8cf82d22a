//! The execution engine.
//!
//! `Mos6502` holds only configuration and the optional hook. Processor state
//! lives in a [`CpuState`] owned by the caller, so one engine can drive any
//! number of processors in turn.

use std::fmt;

use emu_core::{Bus, Ticks};
use tracing::{debug, trace};

use crate::addressing::{Mode, resolve};
use crate::config::Config;
use crate::flags::{I, U};
use crate::instructions::{Exec, IRQ_VECTOR, Instr};
use crate::state::{CpuState, read16};
use crate::tables;

/// NMI vector.
pub const NMI_VECTOR: u16 = 0xFFFA;

/// Reset vector.
pub const RESET_VECTOR: u16 = 0xFFFC;

/// Post-instruction callback. Receives the state after cycle accounting.
pub type Hook = Box<dyn FnMut(&CpuState)>;

/// What one `step` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Executed {
    /// Address the opcode was fetched from.
    pub pc: u16,
    /// Opcode byte as fetched.
    pub opcode: u8,
    /// Instruction that actually ran (NOP for a disabled undocumented opcode).
    pub instr: Instr,
    /// Addressing mode the opcode decoded to.
    pub mode: Mode,
    /// Cycles charged, including page-cross, branch and decimal extras.
    pub cycles: u8,
}

impl fmt::Display for Executed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "${:04X}  {:02X}  {} ({} cycles)",
            self.pc, self.opcode, self.instr, self.cycles
        )
    }
}

/// Table-driven 6502 engine.
///
/// ```
/// use emu_core::SimpleBus;
/// use mos_6502::{CpuState, Mos6502};
///
/// let mut bus = SimpleBus::new();
/// bus.load(0x0200, &[0xA9, 0x42]).expect("fits"); // LDA #$42
/// bus.set_vector(0xFFFC, 0x0200);
///
/// let mut engine = Mos6502::default();
/// let mut cpu = CpuState::new();
/// engine.reset(&mut cpu, &mut bus);
/// let done = engine.step(&mut cpu, &mut bus);
/// assert_eq!(cpu.a, 0x42);
/// assert_eq!(done.cycles, 2);
/// ```
pub struct Mos6502 {
    config: Config,
    hook: Option<Hook>,
}

impl Default for Mos6502 {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl fmt::Debug for Mos6502 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mos6502")
            .field("config", &self.config)
            .field("hook", &self.hook.is_some())
            .finish()
    }
}

impl Mos6502 {
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self { config, hook: None }
    }

    #[must_use]
    pub fn config(&self) -> Config {
        self.config
    }

    /// Register (`Some`) or remove (`None`) the post-instruction hook.
    pub fn set_hook(&mut self, hook: Option<Hook>) {
        self.hook = hook;
    }

    pub fn clear_hook(&mut self) {
        self.hook = None;
    }

    /// Execute exactly one instruction.
    pub fn step<B: Bus + ?Sized>(&mut self, cpu: &mut CpuState, bus: &mut B) -> Executed {
        let executed = self.execute(cpu, bus);
        cpu.goal = cpu.cycles;
        executed
    }

    /// Raise the cycle goal by `budget` and execute until it is reached.
    ///
    /// The last instruction may run past the goal; the overshoot is carried
    /// into the next call. Returns the number of instructions executed.
    pub fn run<B: Bus + ?Sized>(&mut self, cpu: &mut CpuState, bus: &mut B, budget: Ticks) -> u64 {
        cpu.goal += budget;
        let start = cpu.instructions;
        while cpu.cycles < cpu.goal {
            self.execute(cpu, bus);
        }
        cpu.instructions.wrapping_sub(start)
    }

    fn execute<B: Bus + ?Sized>(&mut self, cpu: &mut CpuState, bus: &mut B) -> Executed {
        let pc = cpu.pc;
        let opcode = cpu.fetch(bus);
        cpu.opcode = opcode;
        cpu.status |= U;
        cpu.penalty_op = false;
        cpu.penalty_addr = false;

        let (mode, mut instr, base) = tables::decode(opcode);
        if instr.is_undocumented() && !self.config.undocumented {
            instr = Instr::NOP;
        }

        let resolved = resolve(mode, cpu, bus);
        let mut exec = Exec::new(cpu, bus, self.config.decimal);
        exec.execute(instr);
        let extra = exec.extra;

        let cycles = base + extra + u8::from(cpu.penalty_op && resolved.page_crossed);
        cpu.cycles += cycles;
        cpu.instructions = cpu.instructions.wrapping_add(1);

        trace!(
            pc = format_args!("${pc:04X}"),
            opcode = format_args!("${opcode:02X}"),
            %instr,
            a = cpu.a,
            x = cpu.x,
            y = cpu.y,
            sp = cpu.sp,
            p = cpu.status,
            cycles,
            "step"
        );

        if let Some(hook) = self.hook.as_mut() {
            hook(cpu);
        }

        Executed {
            pc,
            opcode,
            instr,
            mode,
            cycles,
        }
    }
}

// Reset and interrupt entry read no configuration; they stay on the engine so
// a host drives every operation through one value.
#[allow(clippy::unused_self)]
impl Mos6502 {
    /// Load PC from the reset vector and clear the registers.
    ///
    /// Flags other than the constant bit and the cycle/instruction counters
    /// keep their values. Takes no cycles.
    pub fn reset<B: Bus + ?Sized>(&mut self, cpu: &mut CpuState, bus: &mut B) {
        cpu.pc = read16(bus, RESET_VECTOR);
        cpu.a = 0;
        cpu.x = 0;
        cpu.y = 0;
        cpu.sp = 0xFD;
        cpu.status |= U;
        debug!(pc = format_args!("${:04X}", cpu.pc), "reset");
    }

    /// Request a maskable interrupt.
    ///
    /// Ignored while I is set. Returns whether the interrupt was taken.
    pub fn irq<B: Bus + ?Sized>(&mut self, cpu: &mut CpuState, bus: &mut B) -> bool {
        if cpu.flag(I) {
            debug!(pc = format_args!("${:04X}", cpu.pc), "irq ignored, I set");
            return false;
        }
        debug!(pc = format_args!("${:04X}", cpu.pc), "irq");
        Self::interrupt(cpu, bus, IRQ_VECTOR);
        true
    }

    /// Non-maskable interrupt; always taken.
    pub fn nmi<B: Bus + ?Sized>(&mut self, cpu: &mut CpuState, bus: &mut B) {
        debug!(pc = format_args!("${:04X}", cpu.pc), "nmi");
        Self::interrupt(cpu, bus, NMI_VECTOR);
    }

    fn interrupt<B: Bus + ?Sized>(cpu: &mut CpuState, bus: &mut B, vector: u16) {
        cpu.push16(bus, cpu.pc);
        cpu.push8(bus, cpu.status);
        cpu.set_flag(I, true);
        cpu.pc = read16(bus, vector);
    }
}
