//! Instruction handlers.
//!
//! Every handler runs after addressing-mode resolution, so the effective
//! address (or branch displacement) is already on the state. Handlers read
//! through `Exec::operand` and write through `Exec::store`, which pick
//! the accumulator or the bus depending on the resolved mode.

use std::fmt;

use emu_core::Bus;

use crate::addressing::{Mode, crosses_page};
use crate::flags::{self, B, C, D, I, N, U, V, Z};
use crate::state::{CpuState, read16};

/// IRQ/BRK vector.
pub const IRQ_VECTOR: u16 = 0xFFFE;

/// Every mnemonic the engine decodes.
///
/// The last eight are undocumented opcodes modelled as two documented
/// operations run back to back.
#[rustfmt::skip]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Instr {
    ADC, AND, ASL, BCC, BCS, BEQ, BIT, BMI, BNE, BPL, BRK, BVC, BVS, CLC,
    CLD, CLI, CLV, CMP, CPX, CPY, DEC, DEX, DEY, EOR, INC, INX, INY, JMP,
    JSR, LDA, LDX, LDY, LSR, #[default] NOP, ORA, PHA, PHP, PLA, PLP, ROL, ROR, RTI,
    RTS, SBC, SEC, SED, SEI, STA, STX, STY, TAX, TAY, TSX, TXA, TXS, TYA,
    // Undocumented composites
    LAX, SAX, DCP, ISB, SLO, RLA, SRE, RRA,
}

impl Instr {
    /// True for the eight composite opcodes outside the official set.
    #[must_use]
    pub const fn is_undocumented(self) -> bool {
        matches!(
            self,
            Instr::LAX
                | Instr::SAX
                | Instr::DCP
                | Instr::ISB
                | Instr::SLO
                | Instr::RLA
                | Instr::SRE
                | Instr::RRA
        )
    }
}

impl fmt::Display for Instr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// NOP encodings that still pay for crossing a page on their abs,X read.
const PENALTY_NOPS: [u8; 6] = [0x1C, 0x3C, 0x5C, 0x7C, 0xDC, 0xFC];

/// One instruction's execution context.
pub(crate) struct Exec<'a, Bs: Bus + ?Sized> {
    pub cpu: &'a mut CpuState,
    pub bus: &'a mut Bs,
    /// Decimal mode is honoured by ADC/SBC.
    pub decimal: bool,
    /// Cycles added by the handler on top of the table value.
    pub extra: u8,
}

impl<'a, Bs: Bus + ?Sized> Exec<'a, Bs> {
    pub fn new(cpu: &'a mut CpuState, bus: &'a mut Bs, decimal: bool) -> Self {
        Self {
            cpu,
            bus,
            decimal,
            extra: 0,
        }
    }

    pub fn execute(&mut self, instr: Instr) {
        match instr {
            Instr::ADC => self.adc(),
            Instr::AND => self.and(),
            Instr::ASL => self.asl(),
            Instr::BCC => self.branch(!self.cpu.flag(C)),
            Instr::BCS => self.branch(self.cpu.flag(C)),
            Instr::BEQ => self.branch(self.cpu.flag(Z)),
            Instr::BIT => self.bit(),
            Instr::BMI => self.branch(self.cpu.flag(N)),
            Instr::BNE => self.branch(!self.cpu.flag(Z)),
            Instr::BPL => self.branch(!self.cpu.flag(N)),
            Instr::BRK => self.brk(),
            Instr::BVC => self.branch(!self.cpu.flag(V)),
            Instr::BVS => self.branch(self.cpu.flag(V)),
            Instr::CLC => self.cpu.set_flag(C, false),
            Instr::CLD => self.cpu.set_flag(D, false),
            Instr::CLI => self.cpu.set_flag(I, false),
            Instr::CLV => self.cpu.set_flag(V, false),
            Instr::CMP => self.compare(self.cpu.a, true),
            Instr::CPX => self.compare(self.cpu.x, false),
            Instr::CPY => self.compare(self.cpu.y, false),
            Instr::DEC => self.dec(),
            Instr::DEX => self.cpu.x = self.load_nz(self.cpu.x.wrapping_sub(1)),
            Instr::DEY => self.cpu.y = self.load_nz(self.cpu.y.wrapping_sub(1)),
            Instr::EOR => self.eor(),
            Instr::INC => self.inc(),
            Instr::INX => self.cpu.x = self.load_nz(self.cpu.x.wrapping_add(1)),
            Instr::INY => self.cpu.y = self.load_nz(self.cpu.y.wrapping_add(1)),
            Instr::JMP => self.cpu.pc = self.cpu.ea,
            Instr::JSR => self.jsr(),
            Instr::LDA => self.lda(),
            Instr::LDX => self.ldx(),
            Instr::LDY => self.ldy(),
            Instr::LSR => self.lsr(),
            Instr::NOP => self.nop(),
            Instr::ORA => self.ora(),
            Instr::PHA => self.cpu.push8(&mut *self.bus, self.cpu.a),
            Instr::PHP => self.cpu.push8(&mut *self.bus, self.cpu.status | B),
            Instr::PLA => {
                let value = self.cpu.pull8(&mut *self.bus);
                self.cpu.a = self.load_nz(value);
            }
            Instr::PLP => self.cpu.status = self.pull_status(),
            Instr::ROL => self.rol(),
            Instr::ROR => self.ror(),
            Instr::RTI => self.rti(),
            Instr::RTS => self.cpu.pc = self.cpu.pull16(&mut *self.bus).wrapping_add(1),
            Instr::SBC => self.sbc(),
            Instr::SEC => self.cpu.set_flag(C, true),
            Instr::SED => self.cpu.set_flag(D, true),
            Instr::SEI => self.cpu.set_flag(I, true),
            Instr::STA => self.store(u16::from(self.cpu.a)),
            Instr::STX => self.store(u16::from(self.cpu.x)),
            Instr::STY => self.store(u16::from(self.cpu.y)),
            Instr::TAX => self.cpu.x = self.load_nz(self.cpu.a),
            Instr::TAY => self.cpu.y = self.load_nz(self.cpu.a),
            Instr::TSX => self.cpu.x = self.load_nz(self.cpu.sp),
            Instr::TXA => self.cpu.a = self.load_nz(self.cpu.x),
            Instr::TXS => self.cpu.sp = self.cpu.x,
            Instr::TYA => self.cpu.a = self.load_nz(self.cpu.y),
            Instr::LAX => {
                self.lda();
                self.ldx();
            }
            Instr::SAX => self.store(u16::from(self.cpu.a & self.cpu.x)),
            Instr::DCP => self.composite(Self::dec, |e| e.compare(e.cpu.a, true)),
            Instr::ISB => self.composite(Self::inc, Self::sbc),
            Instr::SLO => self.composite(Self::asl, Self::ora),
            Instr::RLA => self.composite(Self::rol, Self::and),
            Instr::SRE => self.composite(Self::lsr, Self::eor),
            Instr::RRA => self.composite(Self::ror, Self::adc),
        }
    }

    /// Operand value: A in accumulator mode, otherwise memory at EA.
    fn operand(&mut self) -> u16 {
        self.cpu.value = if self.cpu.mode == Mode::Accumulator {
            u16::from(self.cpu.a)
        } else {
            u16::from(self.bus.read(self.cpu.ea))
        };
        self.cpu.value
    }

    /// Write the low byte of `value` to A or to memory at EA.
    fn store(&mut self, value: u16) {
        if self.cpu.mode == Mode::Accumulator {
            self.cpu.a = value as u8;
        } else {
            self.bus.write(self.cpu.ea, value as u8);
        }
    }

    /// Update N and Z for a register load and hand the value back.
    fn load_nz(&mut self, value: u8) -> u8 {
        self.cpu.status = flags::zero_sign(self.cpu.status, u16::from(value));
        value
    }

    /// Run a read-modify-write op then a read op on the same address.
    ///
    /// The indexed cycle is already in the base count, so the read op's
    /// page-cross penalty is absorbed.
    fn composite(&mut self, modify: fn(&mut Self), read: fn(&mut Self)) {
        modify(self);
        read(self);
        self.cpu.penalty_op = false;
    }

    fn adc(&mut self) {
        self.cpu.penalty_op = true;
        let value = self.operand();
        let a = self.cpu.a;
        let carry_in = u16::from(self.cpu.status & C);
        let mut result = u16::from(a) + value + carry_in;
        self.cpu.result = result;

        let mut p = flags::carry(self.cpu.status, result);
        p = flags::zero(p, result);
        p = flags::overflow(p, result, a, value);
        p = flags::sign(p, result);
        self.cpu.status = p;

        if self.decimal && self.cpu.flag(D) {
            let half_carry = (u16::from(a) ^ value ^ result) & 0x10 != 0;
            if result & 0x0F > 0x09 || half_carry {
                result += 0x06;
            }
            let high_adjust = result & 0x1F0 > 0x90;
            if high_adjust {
                result += 0x60;
            }
            self.cpu.set_flag(C, high_adjust);
            self.extra += 1;
        }

        self.cpu.a = result as u8;
    }

    fn sbc(&mut self) {
        self.cpu.penalty_op = true;
        let value = self.operand() ^ 0x00FF;
        let a = self.cpu.a;
        let carry_in = u16::from(self.cpu.status & C);
        let mut result = u16::from(a) + value + carry_in;
        self.cpu.result = result;

        let mut p = flags::carry(self.cpu.status, result);
        p = flags::zero(p, result);
        p = flags::overflow(p, result, a, value);
        p = flags::sign(p, result);
        self.cpu.status = p;

        if self.decimal && self.cpu.flag(D) {
            // Adding the inverted operand over-adds by $66 wherever a digit
            // borrowed; take the 6 back out of each such digit.
            let half_carry = (u16::from(a) ^ value ^ result) & 0x10 != 0;
            if !half_carry {
                result = result.wrapping_sub(0x06);
            }
            if !self.cpu.flag(C) {
                result = result.wrapping_sub(0x60);
            }
            self.extra += 1;
        }

        self.cpu.a = result as u8;
    }

    fn and(&mut self) {
        self.cpu.penalty_op = true;
        let result = u16::from(self.cpu.a) & self.operand();
        self.cpu.result = result;
        self.cpu.a = self.load_nz(result as u8);
    }

    fn ora(&mut self) {
        self.cpu.penalty_op = true;
        let result = u16::from(self.cpu.a) | self.operand();
        self.cpu.result = result;
        self.cpu.a = self.load_nz(result as u8);
    }

    fn eor(&mut self) {
        self.cpu.penalty_op = true;
        let result = u16::from(self.cpu.a) ^ self.operand();
        self.cpu.result = result;
        self.cpu.a = self.load_nz(result as u8);
    }

    fn bit(&mut self) {
        let value = self.operand();
        self.cpu.result = u16::from(self.cpu.a) & value;
        let p = flags::zero(self.cpu.status, self.cpu.result);
        self.cpu.status = (p & 0x3F) | (value as u8 & (N | V));
    }

    fn compare(&mut self, register: u8, penalty: bool) {
        if penalty {
            self.cpu.penalty_op = true;
        }
        let value = self.operand() as u8;
        self.cpu.result = u16::from(register).wrapping_sub(u16::from(value));
        let mut p = flags::set_if(self.cpu.status, C, register >= value);
        p = flags::set_if(p, Z, register == value);
        self.cpu.status = flags::sign(p, self.cpu.result);
    }

    fn asl(&mut self) {
        let result = self.operand() << 1;
        self.cpu.result = result;
        self.cpu.status = flags::zero_sign(flags::carry(self.cpu.status, result), result);
        self.store(result);
    }

    fn lsr(&mut self) {
        let value = self.operand();
        let result = value >> 1;
        self.cpu.result = result;
        let p = flags::set_if(self.cpu.status, C, value & 1 != 0);
        self.cpu.status = flags::zero_sign(p, result);
        self.store(result);
    }

    fn rol(&mut self) {
        let result = (self.operand() << 1) | u16::from(self.cpu.status & C);
        self.cpu.result = result;
        self.cpu.status = flags::zero_sign(flags::carry(self.cpu.status, result), result);
        self.store(result);
    }

    fn ror(&mut self) {
        let value = self.operand();
        let result = (value >> 1) | (u16::from(self.cpu.status & C) << 7);
        self.cpu.result = result;
        let p = flags::set_if(self.cpu.status, C, value & 1 != 0);
        self.cpu.status = flags::zero_sign(p, result);
        self.store(result);
    }

    fn inc(&mut self) {
        let result = self.operand().wrapping_add(1);
        self.cpu.result = result;
        self.cpu.status = flags::zero_sign(self.cpu.status, result);
        self.store(result);
    }

    fn dec(&mut self) {
        let result = self.operand().wrapping_sub(1);
        self.cpu.result = result;
        self.cpu.status = flags::zero_sign(self.cpu.status, result);
        self.store(result);
    }

    fn lda(&mut self) {
        self.cpu.penalty_op = true;
        let value = self.operand() as u8;
        self.cpu.a = self.load_nz(value);
    }

    fn ldx(&mut self) {
        self.cpu.penalty_op = true;
        let value = self.operand() as u8;
        self.cpu.x = self.load_nz(value);
    }

    fn ldy(&mut self) {
        self.cpu.penalty_op = true;
        let value = self.operand() as u8;
        self.cpu.y = self.load_nz(value);
    }

    fn nop(&mut self) {
        if PENALTY_NOPS.contains(&self.cpu.opcode) {
            self.cpu.penalty_op = true;
        }
    }

    /// Taken branches cost one cycle, two if PC lands in another page.
    fn branch(&mut self, taken: bool) {
        if !taken {
            return;
        }
        self.cpu.old_pc = self.cpu.pc;
        self.cpu.pc = self.cpu.pc.wrapping_add(self.cpu.rel);
        self.extra += if crosses_page(self.cpu.old_pc, self.cpu.pc) {
            2
        } else {
            1
        };
    }

    fn brk(&mut self) {
        self.cpu.pc = self.cpu.pc.wrapping_add(1);
        self.cpu.push16(&mut *self.bus, self.cpu.pc);
        self.cpu.push8(&mut *self.bus, self.cpu.status | B);
        self.cpu.set_flag(I, true);
        self.cpu.pc = read16(&mut *self.bus, IRQ_VECTOR);
    }

    fn jsr(&mut self) {
        self.cpu.push16(&mut *self.bus, self.cpu.pc.wrapping_sub(1));
        self.cpu.pc = self.cpu.ea;
    }

    /// Pull P from the stack. B only exists in pushed copies.
    fn pull_status(&mut self) -> u8 {
        (self.cpu.pull8(&mut *self.bus) & !B) | U
    }

    fn rti(&mut self) {
        self.cpu.status = self.pull_status();
        self.cpu.pc = self.cpu.pull16(&mut *self.bus);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use emu_core::SimpleBus;

    /// Run a single handler against an immediate operand.
    fn run_imm(instr: Instr, cpu: &mut CpuState, operand: u8, decimal: bool) -> u8 {
        let mut bus = SimpleBus::new();
        bus.poke(0x0300, operand);
        cpu.ea = 0x0300;
        cpu.mode = Mode::Immediate;
        let mut exec = Exec::new(cpu, &mut bus, decimal);
        exec.execute(instr);
        exec.extra
    }

    #[test]
    fn binary_adc_matches_modular_sum() {
        for a in 0..=0xFF_u16 {
            for b in 0..=0xFF_u16 {
                for c in 0..=1_u16 {
                    let mut cpu = CpuState::new();
                    cpu.a = a as u8;
                    cpu.set_flag(C, c == 1);
                    run_imm(Instr::ADC, &mut cpu, b as u8, true);
                    let sum = a + b + c;
                    assert_eq!(cpu.a, (sum % 256) as u8, "{a:02X}+{b:02X}+{c}");
                    assert_eq!(cpu.flag(C), sum > 255, "carry {a:02X}+{b:02X}+{c}");
                }
            }
        }
    }

    #[test]
    fn binary_sbc_borrows() {
        let mut cpu = CpuState::new();
        cpu.a = 0x10;
        cpu.set_flag(C, true);
        run_imm(Instr::SBC, &mut cpu, 0x20, false);
        assert_eq!(cpu.a, 0xF0);
        assert!(!cpu.flag(C), "borrow clears carry");
        assert!(cpu.flag(N));
    }

    #[test]
    fn sbc_overflow() {
        // $80 - $01 = $7F: negative minus positive gives positive.
        let mut cpu = CpuState::new();
        cpu.a = 0x80;
        cpu.set_flag(C, true);
        run_imm(Instr::SBC, &mut cpu, 0x01, false);
        assert_eq!(cpu.a, 0x7F);
        assert!(cpu.flag(V));
        assert!(cpu.flag(C));
    }

    #[test]
    fn decimal_adc_corrects_nibbles() {
        let cases = [
            (0x09, 0x01, false, 0x10, false),
            (0x58, 0x46, false, 0x04, true),
            (0x19, 0x28, false, 0x47, false),
            (0x99, 0x01, false, 0x00, true),
            (0x80, 0x80, false, 0x60, true),
            (0x99, 0x99, false, 0x98, true),
            (0x12, 0x34, true, 0x47, false),
        ];
        for (a, b, c, want, want_c) in cases {
            let mut cpu = CpuState::new();
            cpu.a = a;
            cpu.status |= D;
            cpu.set_flag(C, c);
            let extra = run_imm(Instr::ADC, &mut cpu, b, true);
            assert_eq!(cpu.a, want, "{a:02X}+{b:02X}");
            assert_eq!(cpu.flag(C), want_c, "carry {a:02X}+{b:02X}");
            assert_eq!(extra, 1, "decimal correction costs a cycle");
        }
    }

    #[test]
    fn decimal_sbc_corrects_nibbles() {
        let cases = [
            (0x10, 0x01, 0x09, true),
            (0x15, 0x03, 0x12, true),
            (0x00, 0x01, 0x99, false),
            (0x10, 0x20, 0x90, false),
            (0x99, 0x00, 0x99, true),
            (0x46, 0x12, 0x34, true),
        ];
        for (a, b, want, want_c) in cases {
            let mut cpu = CpuState::new();
            cpu.a = a;
            cpu.status |= D | C;
            let extra = run_imm(Instr::SBC, &mut cpu, b, true);
            assert_eq!(cpu.a, want, "{a:02X}-{b:02X}");
            assert_eq!(cpu.flag(C), want_c, "carry {a:02X}-{b:02X}");
            assert_eq!(extra, 1);
        }
    }

    #[test]
    fn decimal_flag_ignored_when_support_disabled() {
        let mut cpu = CpuState::new();
        cpu.a = 0x09;
        cpu.status |= D;
        let extra = run_imm(Instr::ADC, &mut cpu, 0x01, false);
        assert_eq!(cpu.a, 0x0A);
        assert_eq!(extra, 0);
    }

    #[test]
    fn bit_copies_high_bits_of_memory() {
        let mut cpu = CpuState::new();
        cpu.a = 0x01;
        run_imm(Instr::BIT, &mut cpu, 0xC0, false);
        assert!(cpu.flag(Z));
        assert!(cpu.flag(V));
        assert!(cpu.flag(N));
        assert!(cpu.flag(U));

        cpu.a = 0x40;
        run_imm(Instr::BIT, &mut cpu, 0x40, false);
        assert!(!cpu.flag(Z));
        assert!(cpu.flag(V));
        assert!(!cpu.flag(N));
    }

    #[test]
    fn compare_sets_carry_zero_sign() {
        let mut cpu = CpuState::new();
        cpu.a = 0x40;
        run_imm(Instr::CMP, &mut cpu, 0x40, false);
        assert!(cpu.flag(C) && cpu.flag(Z) && !cpu.flag(N));

        run_imm(Instr::CMP, &mut cpu, 0x41, false);
        assert!(!cpu.flag(C) && !cpu.flag(Z) && cpu.flag(N));

        cpu.x = 0x05;
        run_imm(Instr::CPX, &mut cpu, 0x01, false);
        assert!(cpu.flag(C) && !cpu.flag(Z) && !cpu.flag(N));
    }

    #[test]
    fn penalty_eligible_handlers() {
        for instr in [
            Instr::ADC,
            Instr::AND,
            Instr::CMP,
            Instr::EOR,
            Instr::LDA,
            Instr::LDX,
            Instr::LDY,
            Instr::ORA,
            Instr::SBC,
        ] {
            let mut cpu = CpuState::new();
            run_imm(instr, &mut cpu, 0x00, false);
            assert!(cpu.penalty_op, "{instr} should be penalty eligible");
        }
        for instr in [Instr::STA, Instr::ASL, Instr::CPX, Instr::BIT, Instr::INC] {
            let mut cpu = CpuState::new();
            run_imm(instr, &mut cpu, 0x00, false);
            assert!(!cpu.penalty_op, "{instr} should not be penalty eligible");
        }
    }

    #[test]
    fn composites_absorb_penalty() {
        let mut cpu = CpuState::new();
        run_imm(Instr::DCP, &mut cpu, 0x10, false);
        assert!(!cpu.penalty_op);

        let mut cpu = CpuState::new();
        run_imm(Instr::LAX, &mut cpu, 0x10, false);
        assert!(cpu.penalty_op, "LAX keeps its read penalty");
        assert_eq!(cpu.a, 0x10);
        assert_eq!(cpu.x, 0x10);
    }

    #[test]
    fn pulled_status_drops_break() {
        let mut bus = SimpleBus::new();
        let mut cpu = CpuState::new();
        cpu.push8(&mut bus, 0xFF);
        let mut exec = Exec::new(&mut cpu, &mut bus, false);
        exec.execute(Instr::PLP);
        assert_eq!(exec.cpu.status, 0xEF);
    }

    #[test]
    fn display_is_mnemonic() {
        assert_eq!(Instr::LDA.to_string(), "LDA");
        assert_eq!(Instr::ISB.to_string(), "ISB");
        assert!(Instr::RRA.is_undocumented());
        assert!(!Instr::SBC.is_undocumented());
    }
}
