// Copyright (c) 2024 Leela Aurelia, git@elia.garden
//
// Unless otherwise noted, this file is released and thus subject to the
// terms of the Mozilla Public License Version 2.0 (MPL-2.0) or the
// GNU General Public License Version 3 (GPL-3).
// If a copy of these licenses was not distributed with this file, you can
// obtain them at https://mozilla.org/MPL/2.0/ and http://www.gnu.org/licenses/.

//! The barrel shifter and the flag-setting ALU operations.
//! Shifts are pure: they take the carry flag and return the shifter's
//! carry-out next to the result, leaving it to the instruction to decide
//! whether it lands in CPSR.

use common::numutil::NumExt;
use num_derive::FromPrimitive;

use crate::{interface::Bus, state::Flag, Cpu};

#[derive(FromPrimitive, Debug, Copy, Clone, PartialEq, Eq)]
pub enum ShiftKind {
    Lsl,
    Lsr,
    Asr,
    Ror,
}

/// Logical shift left
pub fn lsl(value: u32, by: u32, carry: bool) -> (u32, bool) {
    match by {
        0 => (value, carry),
        1..=31 => (value << by, value.is_bit((32 - by) as u16)),
        32 => (0, value.is_bit(0)),
        _ => (0, false),
    }
}

/// Logical shift right
pub fn lsr(value: u32, by: u32, carry: bool) -> (u32, bool) {
    match by {
        0 => (value, carry),
        1..=31 => (value >> by, value.is_bit((by - 1) as u16)),
        32 => (0, value.is_bit(31)),
        _ => (0, false),
    }
}

/// Arithmetic shift right
pub fn asr(value: u32, by: u32, carry: bool) -> (u32, bool) {
    match by {
        0 => (value, carry),
        1..=31 => (((value as i32) >> by) as u32, value.is_bit((by - 1) as u16)),
        _ => (((value as i32) >> 31) as u32, value.is_bit(31)),
    }
}

/// Rotate right
pub fn ror(value: u32, by: u32, carry: bool) -> (u32, bool) {
    if by == 0 {
        return (value, carry);
    }
    match by & 31 {
        0 => (value, value.is_bit(31)),
        by => (value.rotate_right(by), value.is_bit((by - 1) as u16)),
    }
}

/// Rotate right by one, through carry
pub fn rrx(value: u32, carry: bool) -> (u32, bool) {
    ((value >> 1).set_bit(31, carry), value.is_bit(0))
}

/// Shift by an immediate amount. An amount of 0 encodes
/// LSR #32, ASR #32 and RRX for the right shifts.
pub fn shift_by_imm(kind: ShiftKind, value: u32, by: u32, carry: bool) -> (u32, bool) {
    match (kind, by) {
        (ShiftKind::Lsl, _) => lsl(value, by, carry),
        (ShiftKind::Lsr, 0) => lsr(value, 32, carry),
        (ShiftKind::Asr, 0) => asr(value, 32, carry),
        (ShiftKind::Ror, 0) => rrx(value, carry),
        (ShiftKind::Lsr, _) => lsr(value, by, carry),
        (ShiftKind::Asr, _) => asr(value, by, carry),
        (ShiftKind::Ror, _) => ror(value, by, carry),
    }
}

/// Shift by a register. Only the bottom byte of the amount is used.
pub fn shift_by_reg(kind: ShiftKind, value: u32, by: u32, carry: bool) -> (u32, bool) {
    let by = by & 0xFF;
    match kind {
        ShiftKind::Lsl => lsl(value, by, carry),
        ShiftKind::Lsr => lsr(value, by, carry),
        ShiftKind::Asr => asr(value, by, carry),
        ShiftKind::Ror => ror(value, by, carry),
    }
}

impl<S: Bus> Cpu<'_, S> {
    /// Addition
    pub fn add(&mut self, s: bool, rs: u32, rn: u32) -> u32 {
        let res = rs.wrapping_add(rn);
        self.set_nzc(s, res, (rs as u64) + (rn as u64) > 0xFFFF_FFFF);
        self.set_flag_cpsr(s, Flag::Overflow, (rs as i32).overflowing_add(rn as i32).1);
        res
    }

    /// Subtraction
    pub fn sub(&mut self, s: bool, rs: u32, rn: u32) -> u32 {
        let res = rs.wrapping_sub(rn);
        self.set_nzc(s, res, rn <= rs);
        self.set_flag_cpsr(s, Flag::Overflow, (rs as i32).overflowing_sub(rn as i32).1);
        res
    }

    /// Addition (c -> Carry)
    pub fn adc(&mut self, s: bool, rs: u32, rn: u32, c: bool) -> u32 {
        let res = (rs as u64) + (rn as u64) + (c as u64);
        self.set_nzc(s, res as u32, res > 0xFFFF_FFFF);
        self.set_flag_cpsr(
            s,
            Flag::Overflow,
            (!(rs ^ rn) & (rn ^ (res as u32))).is_bit(31),
        );
        res as u32
    }

    /// Subtraction (c -> Carry)
    pub fn sbc(&mut self, s: bool, rs: u32, rn: u32, c: bool) -> u32 {
        self.adc(s, rs, !rn, c)
    }

    /// Negate
    pub fn neg(&mut self, s: bool, value: u32) -> u32 {
        self.sub(s, 0, value)
    }

    pub fn set_nz(&mut self, enable: bool, value: u32) {
        if enable {
            let neg = value & (1 << 31);
            let zero = ((value == 0) as u32) << 30;
            self.state
                .set_cpsr_flags((self.state.cpsr() & 0x3FFF_FFFF) | zero | neg);
        }
    }

    pub fn set_nzc(&mut self, enable: bool, value: u32, carry: bool) {
        if enable {
            let neg = value & (1 << 31);
            let zero = ((value == 0) as u32) << 30;
            let carry = (carry as u32) << 29;
            self.state
                .set_cpsr_flags((self.state.cpsr() & 0x1FFF_FFFF) | zero | neg | carry);
        }
    }

    fn set_flag_cpsr(&mut self, enable: bool, flag: Flag, en: bool) {
        if enable {
            self.state.set_flag(flag, en);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn shift_left_edges() {
        assert_eq!(lsl(0x8000_0001, 0, true), (0x8000_0001, true));
        assert_eq!(lsl(0x8000_0001, 1, false), (0x2, true));
        assert_eq!(lsl(0x1, 32, false), (0, true));
        assert_eq!(lsl(0xFFFF_FFFF, 33, true), (0, false));
    }

    #[test]
    fn shift_right_edges() {
        assert_eq!(shift_by_imm(ShiftKind::Lsr, 0x8000_0000, 0, false), (0, true));
        assert_eq!(shift_by_reg(ShiftKind::Lsr, 0x8000_0000, 32, false), (0, true));
        assert_eq!(shift_by_reg(ShiftKind::Lsr, 0x8000_0000, 33, true), (0, false));
        assert_eq!(
            shift_by_imm(ShiftKind::Asr, 0x8000_0000, 0, false),
            (0xFFFF_FFFF, true)
        );
        assert_eq!(
            shift_by_reg(ShiftKind::Asr, 0x8000_0000, 200, false),
            (0xFFFF_FFFF, true)
        );
        assert_eq!(shift_by_reg(ShiftKind::Asr, 0x4000_0000, 40, true), (0, false));
    }

    #[test]
    fn rotates() {
        assert_eq!(shift_by_imm(ShiftKind::Ror, 0x3, 0, true), (0x8000_0001, true));
        assert_eq!(shift_by_imm(ShiftKind::Ror, 0x2, 0, false), (0x1, false));
        assert_eq!(shift_by_reg(ShiftKind::Ror, 0x8000_0000, 32, false), (0x8000_0000, true));
        assert_eq!(shift_by_reg(ShiftKind::Ror, 0x1, 64, false), (0x1, false));
        assert_eq!(shift_by_reg(ShiftKind::Ror, 0x1, 33, false), (0x8000_0000, true));
        assert_eq!(shift_by_reg(ShiftKind::Ror, 0x1, 0, true), (0x1, true));
    }

    #[test]
    fn register_shift_uses_low_byte() {
        assert_eq!(shift_by_reg(ShiftKind::Lsl, 0x1, 0x104, false), (0x10, false));
    }
}
