//! 6502 processor status register (P).
//!
//! Flag updates are pure functions over the flag byte: each takes the current
//! P value and the 16-bit result of an operation (before truncation to eight
//! bits) and returns the new P value.

/// Carry flag - set if operation resulted in carry/borrow.
pub const C: u8 = 0x01;

/// Zero flag - set if result is zero.
pub const Z: u8 = 0x02;

/// Interrupt disable - when set, IRQ requests are ignored.
pub const I: u8 = 0x04;

/// Decimal mode - enables BCD arithmetic for ADC/SBC.
pub const D: u8 = 0x08;

/// Break flag - forced into the pushed copy of P by BRK and PHP.
pub const B: u8 = 0x10;

/// Constant bit - always reads as 1.
pub const U: u8 = 0x20;

/// Overflow flag - set if signed arithmetic overflowed.
pub const V: u8 = 0x40;

/// Negative (sign) flag - set if result has bit 7 set.
pub const N: u8 = 0x80;

/// Set or clear `flag` in `p` depending on `condition`.
#[must_use]
pub const fn set_if(p: u8, flag: u8, condition: bool) -> u8 {
    if condition { p | flag } else { p & !flag }
}

/// Z is set iff the low byte of `result` is zero.
#[must_use]
pub const fn zero(p: u8, result: u16) -> u8 {
    set_if(p, Z, result & 0x00FF == 0)
}

/// N is set iff bit 7 of `result` is set.
#[must_use]
pub const fn sign(p: u8, result: u16) -> u8 {
    set_if(p, N, result & 0x0080 != 0)
}

/// C is set iff anything spilled above bit 7.
#[must_use]
pub const fn carry(p: u8, result: u16) -> u8 {
    set_if(p, C, result & 0xFF00 != 0)
}

/// V is set iff both inputs share a sign and the result's sign differs.
#[must_use]
pub const fn overflow(p: u8, result: u16, accumulator: u8, operand: u16) -> u8 {
    set_if(
        p,
        V,
        (result ^ accumulator as u16) & (result ^ operand) & 0x0080 != 0,
    )
}

/// Z and N together, the common case for loads, transfers and logic ops.
#[must_use]
pub const fn zero_sign(p: u8, result: u16) -> u8 {
    sign(zero(p, result), result)
}
