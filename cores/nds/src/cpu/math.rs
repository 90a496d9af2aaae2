// Copyright (c) 2024 Leela Aurelia, git@elia.garden
//
// Unless otherwise noted, this file is released and thus subject to the
// terms of the Mozilla Public License Version 2.0 (MPL-2.0) or the
// GNU General Public License Version 3 (GPL-3).
// If a copy of these licenses was not distributed with this file, you can
// obtain them at https://mozilla.org/MPL/2.0/ and http://www.gnu.org/licenses/.

//! The ARM9's division and square root units.

use common::{numutil::NumExt, TimeS};
use modular_bitfield::{bitfield, specifiers::*, BitfieldSpecifier};

#[derive(Debug, Default, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Div {
    pub ctrl: DivControl,
    pub numer: u64,
    pub denom: u64,
    pub result: u64,
    pub rem: u64,
}

impl Div {
    /// Calculate the result right away. The busy bit is handled by the
    /// caller.
    pub fn update(&mut self) {
        self.ctrl.set_by_zero(self.denom == 0);
        match self.ctrl.mode() {
            DivMode::All32 => {
                let numer = self.numer.u32() as i32;
                let denom = self.denom.u32() as i32;
                if denom == 0 {
                    // Sentinel of -1/1, with the upper half inverted
                    self.result = if numer < 0 {
                        1 | (0xFFFF_FFFF << 32)
                    } else {
                        0xFFFF_FFFF
                    };
                    self.rem = numer as i64 as u64;
                } else if numer == i32::MIN && denom == -1 {
                    // Overflows into the upper half
                    self.result = 0x8000_0000;
                    self.rem = 0;
                } else {
                    self.result = (numer / denom) as i64 as u64;
                    self.rem = (numer % denom) as i64 as u64;
                }
            }
            DivMode::Partial1 => self.div64(self.denom.u32() as i32 as i64),
            DivMode::All64 | DivMode::Reserved => self.div64(self.denom as i64),
        }
    }

    fn div64(&mut self, denom: i64) {
        let numer = self.numer as i64;
        if denom == 0 {
            self.result = if numer < 0 { 1 } else { u64::MAX };
            self.rem = self.numer;
        } else {
            self.result = numer.wrapping_div(denom) as u64;
            self.rem = numer.wrapping_rem(denom) as u64;
        }
    }

    /// Only the mode is writable.
    pub fn ctrl_write(&mut self, value: u16) {
        let old = u16::from(self.ctrl);
        self.ctrl = DivControl::from((old & !3) | (value & 3));
    }

    /// Cycles until the result is ready.
    pub fn latency(&self) -> TimeS {
        match self.ctrl.mode() {
            DivMode::All32 => 18,
            _ => 34,
        }
    }
}

#[bitfield]
#[repr(u16)]
#[derive(Debug, Default, Copy, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct DivControl {
    pub mode: DivMode,
    #[skip]
    __: B12,
    pub by_zero: bool,
    pub busy: bool,
}

#[derive(BitfieldSpecifier, Debug, Copy, Clone, PartialEq)]
#[bits = 2]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum DivMode {
    All32 = 0,
    Partial1 = 1,
    All64 = 2,
    Reserved = 3,
}

#[derive(Debug, Default, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Sqrt {
    pub ctrl: SqrtControl,
    pub input: u64,
    pub result: u32,
}

impl Sqrt {
    pub fn update(&mut self) {
        self.result = match self.ctrl.mode() {
            SqrtMode::Bit32 => self.input.u32().isqrt(),
            SqrtMode::Bit64 => self.input.isqrt() as u32,
        };
    }

    pub fn ctrl_write(&mut self, value: u16) {
        self.ctrl.set_mode(if value.is_bit(0) {
            SqrtMode::Bit64
        } else {
            SqrtMode::Bit32
        });
    }

    pub fn latency(&self) -> TimeS {
        13
    }
}

#[bitfield]
#[repr(u16)]
#[derive(Debug, Default, Copy, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct SqrtControl {
    pub mode: SqrtMode,
    #[skip]
    __: B14,
    pub busy: bool,
}

#[derive(BitfieldSpecifier, Debug, Copy, Clone, PartialEq)]
#[bits = 1]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum SqrtMode {
    Bit32 = 0,
    Bit64 = 1,
}
