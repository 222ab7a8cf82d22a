//! Opcode dispatch tables.
//!
//! Three parallel 256-entry tables indexed by opcode byte: addressing mode,
//! instruction, and base cycle count. Every byte decodes to something; the
//! reserved opcodes map to NOP (with the addressing mode the hardware uses
//! to skip their operand bytes) or to one of the undocumented composites.
//!
//! Base cycles already include the indexed-addressing cycle for stores and
//! read-modify-write instructions. Page-cross, branch and decimal cycles are
//! added at run time.

use crate::addressing::Mode;
use crate::addressing::Mode::{
    Absolute as ABS, AbsoluteX as ABX, AbsoluteY as ABY, Accumulator as ACC, Immediate as IMM,
    Implied as IMP, Indirect as IND, IndirectX as IZX, IndirectY as IZY, Relative as REL,
    ZeroPage as ZP0, ZeroPageX as ZPX, ZeroPageY as ZPY,
};
use crate::instructions::Instr;
#[allow(clippy::enum_glob_use)]
use crate::instructions::Instr::*;

/// Addressing mode for each opcode.
#[rustfmt::skip]
pub const MODES: [Mode; 256] = [
/*        0    1    2    3    4    5    6    7    8    9    A    B    C    D    E    F  */
/* 0 */  IMP, IZX, IMP, IZX, ZP0, ZP0, ZP0, ZP0, IMP, IMM, ACC, IMM, ABS, ABS, ABS, ABS,
/* 1 */  REL, IZY, IMP, IZY, ZPX, ZPX, ZPX, ZPX, IMP, ABY, IMP, ABY, ABX, ABX, ABX, ABX,
/* 2 */  ABS, IZX, IMP, IZX, ZP0, ZP0, ZP0, ZP0, IMP, IMM, ACC, IMM, ABS, ABS, ABS, ABS,
/* 3 */  REL, IZY, IMP, IZY, ZPX, ZPX, ZPX, ZPX, IMP, ABY, IMP, ABY, ABX, ABX, ABX, ABX,
/* 4 */  IMP, IZX, IMP, IZX, ZP0, ZP0, ZP0, ZP0, IMP, IMM, ACC, IMM, ABS, ABS, ABS, ABS,
/* 5 */  REL, IZY, IMP, IZY, ZPX, ZPX, ZPX, ZPX, IMP, ABY, IMP, ABY, ABX, ABX, ABX, ABX,
/* 6 */  IMP, IZX, IMP, IZX, ZP0, ZP0, ZP0, ZP0, IMP, IMM, ACC, IMM, IND, ABS, ABS, ABS,
/* 7 */  REL, IZY, IMP, IZY, ZPX, ZPX, ZPX, ZPX, IMP, ABY, IMP, ABY, ABX, ABX, ABX, ABX,
/* 8 */  IMM, IZX, IMM, IZX, ZP0, ZP0, ZP0, ZP0, IMP, IMM, IMP, IMM, ABS, ABS, ABS, ABS,
/* 9 */  REL, IZY, IMP, IZY, ZPX, ZPX, ZPY, ZPY, IMP, ABY, IMP, ABY, ABX, ABX, ABY, ABY,
/* A */  IMM, IZX, IMM, IZX, ZP0, ZP0, ZP0, ZP0, IMP, IMM, IMP, IMM, ABS, ABS, ABS, ABS,
/* B */  REL, IZY, IMP, IZY, ZPX, ZPX, ZPY, ZPY, IMP, ABY, IMP, ABY, ABX, ABX, ABY, ABY,
/* C */  IMM, IZX, IMM, IZX, ZP0, ZP0, ZP0, ZP0, IMP, IMM, IMP, IMM, ABS, ABS, ABS, ABS,
/* D */  REL, IZY, IMP, IZY, ZPX, ZPX, ZPX, ZPX, IMP, ABY, IMP, ABY, ABX, ABX, ABX, ABX,
/* E */  IMM, IZX, IMM, IZX, ZP0, ZP0, ZP0, ZP0, IMP, IMM, IMP, IMM, ABS, ABS, ABS, ABS,
/* F */  REL, IZY, IMP, IZY, ZPX, ZPX, ZPX, ZPX, IMP, ABY, IMP, ABY, ABX, ABX, ABX, ABX,
];

/// Instruction for each opcode.
#[rustfmt::skip]
pub const INSTRUCTIONS: [Instr; 256] = [
/*        0    1    2    3    4    5    6    7    8    9    A    B    C    D    E    F  */
/* 0 */  BRK, ORA, NOP, SLO, NOP, ORA, ASL, SLO, PHP, ORA, ASL, NOP, NOP, ORA, ASL, SLO,
/* 1 */  BPL, ORA, NOP, SLO, NOP, ORA, ASL, SLO, CLC, ORA, NOP, SLO, NOP, ORA, ASL, SLO,
/* 2 */  JSR, AND, NOP, RLA, BIT, AND, ROL, RLA, PLP, AND, ROL, NOP, BIT, AND, ROL, RLA,
/* 3 */  BMI, AND, NOP, RLA, NOP, AND, ROL, RLA, SEC, AND, NOP, RLA, NOP, AND, ROL, RLA,
/* 4 */  RTI, EOR, NOP, SRE, NOP, EOR, LSR, SRE, PHA, EOR, LSR, NOP, JMP, EOR, LSR, SRE,
/* 5 */  BVC, EOR, NOP, SRE, NOP, EOR, LSR, SRE, CLI, EOR, NOP, SRE, NOP, EOR, LSR, SRE,
/* 6 */  RTS, ADC, NOP, RRA, NOP, ADC, ROR, RRA, PLA, ADC, ROR, NOP, JMP, ADC, ROR, RRA,
/* 7 */  BVS, ADC, NOP, RRA, NOP, ADC, ROR, RRA, SEI, ADC, NOP, RRA, NOP, ADC, ROR, RRA,
/* 8 */  NOP, STA, NOP, SAX, STY, STA, STX, SAX, DEY, NOP, TXA, NOP, STY, STA, STX, SAX,
/* 9 */  BCC, STA, NOP, NOP, STY, STA, STX, SAX, TYA, STA, TXS, NOP, NOP, STA, NOP, NOP,
/* A */  LDY, LDA, LDX, LAX, LDY, LDA, LDX, LAX, TAY, LDA, TAX, NOP, LDY, LDA, LDX, LAX,
/* B */  BCS, LDA, NOP, LAX, LDY, LDA, LDX, LAX, CLV, LDA, TSX, LAX, LDY, LDA, LDX, LAX,
/* C */  CPY, CMP, NOP, DCP, CPY, CMP, DEC, DCP, INY, CMP, DEX, NOP, CPY, CMP, DEC, DCP,
/* D */  BNE, CMP, NOP, DCP, NOP, CMP, DEC, DCP, CLD, CMP, NOP, DCP, NOP, CMP, DEC, DCP,
/* E */  CPX, SBC, NOP, ISB, CPX, SBC, INC, ISB, INX, SBC, NOP, SBC, CPX, SBC, INC, ISB,
/* F */  BEQ, SBC, NOP, ISB, NOP, SBC, INC, ISB, SED, SBC, NOP, ISB, NOP, SBC, INC, ISB,
];

/// Base cycle count for each opcode.
#[rustfmt::skip]
pub const CYCLES: [u8; 256] = [
/*       0  1  2  3  4  5  6  7  8  9  A  B  C  D  E  F */
/* 0 */  7, 6, 2, 8, 3, 3, 5, 5, 3, 2, 2, 2, 4, 4, 6, 6,
/* 1 */  2, 5, 2, 8, 4, 4, 6, 6, 2, 4, 2, 7, 4, 4, 7, 7,
/* 2 */  6, 6, 2, 8, 3, 3, 5, 5, 4, 2, 2, 2, 4, 4, 6, 6,
/* 3 */  2, 5, 2, 8, 4, 4, 6, 6, 2, 4, 2, 7, 4, 4, 7, 7,
/* 4 */  6, 6, 2, 8, 3, 3, 5, 5, 3, 2, 2, 2, 3, 4, 6, 6,
/* 5 */  2, 5, 2, 8, 4, 4, 6, 6, 2, 4, 2, 7, 4, 4, 7, 7,
/* 6 */  6, 6, 2, 8, 3, 3, 5, 5, 4, 2, 2, 2, 5, 4, 6, 6,
/* 7 */  2, 5, 2, 8, 4, 4, 6, 6, 2, 4, 2, 7, 4, 4, 7, 7,
/* 8 */  2, 6, 2, 6, 3, 3, 3, 3, 2, 2, 2, 2, 4, 4, 4, 4,
/* 9 */  2, 6, 2, 6, 4, 4, 4, 4, 2, 5, 2, 5, 5, 5, 5, 5,
/* A */  2, 6, 2, 6, 3, 3, 3, 3, 2, 2, 2, 2, 4, 4, 4, 4,
/* B */  2, 5, 2, 5, 4, 4, 4, 4, 2, 4, 2, 4, 4, 4, 4, 4,
/* C */  2, 6, 2, 8, 3, 3, 5, 5, 2, 2, 2, 2, 4, 4, 6, 6,
/* D */  2, 5, 2, 8, 4, 4, 6, 6, 2, 4, 2, 7, 4, 4, 7, 7,
/* E */  2, 6, 2, 8, 3, 3, 5, 5, 2, 2, 2, 2, 4, 4, 6, 6,
/* F */  2, 5, 2, 8, 4, 4, 6, 6, 2, 4, 2, 7, 4, 4, 7, 7,
];

/// Decode one opcode byte into its table entries.
#[must_use]
pub const fn decode(opcode: u8) -> (Mode, Instr, u8) {
    let i = opcode as usize;
    (MODES[i], INSTRUCTIONS[i], CYCLES[i])
}
