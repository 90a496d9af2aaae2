// Copyright (c) 2024 Leela Aurelia, git@elia.garden
//
// Unless otherwise noted, this file is released and thus subject to the
// terms of the Mozilla Public License Version 2.0 (MPL-2.0) or the
// GNU General Public License Version 3 (GPL-3).
// If a copy of these licenses was not distributed with this file, you can
// obtain them at https://mozilla.org/MPL/2.0/ and http://www.gnu.org/licenses/.

use core::{
    fmt::Display,
    ops::{Add, AddAssign, Neg, Sub, SubAssign},
};

use common::{numutil::NumExt, Time};

use crate::{
    interface::{Bus, CpuVersion, RwType},
    state::Register,
    Cpu,
};

#[derive(Default, Debug, Copy, Clone, PartialEq, PartialOrd, Eq, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Address(pub u32);

impl Address {
    pub const BYTE: Address = Address(1);
    pub const HW: Address = Address(2);
    pub const WORD: Address = Address(4);

    pub fn add_rel(self, rel: RelativeOffset) -> Address {
        Address(self.0.wrapping_add_signed(rel.0))
    }

    pub fn add_signed(self, rhs: Address, positive: bool) -> Address {
        if positive {
            self + rhs
        } else {
            self - rhs
        }
    }

    pub fn align(self, to: u32) -> Address {
        Address(self.0 & !(to - 1))
    }
}

impl Add for Address {
    type Output = Address;

    fn add(self, rhs: Self) -> Self::Output {
        Address(self.0.wrapping_add(rhs.0))
    }
}

impl Sub for Address {
    type Output = Address;

    fn sub(self, rhs: Self) -> Self::Output {
        Address(self.0.wrapping_sub(rhs.0))
    }
}

impl AddAssign for Address {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl SubAssign for Address {
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl Display for Address {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "$0x{:X}", self.0)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RelativeOffset(pub i32);

impl Display for RelativeOffset {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        if self.0 >= 0 {
            write!(f, "$0x{:X}", self.0)
        } else {
            write!(f, "$-0x{:X}", self.0.unsigned_abs())
        }
    }
}

impl Neg for RelativeOffset {
    type Output = Self;

    fn neg(self) -> Self::Output {
        RelativeOffset(-self.0)
    }
}

/// Kind of a memory access; either sequential
/// or non-sequential, optionally an opcode fetch.
pub type Access = u8;

pub mod access {
    use super::Access;
    pub const NONSEQ: Access = 0;
    pub const SEQ: Access = 1 << 0;
    pub const CODE: Access = 1 << 1;
}

impl<S: Bus> Cpu<'_, S> {
    /// Get the value at the given memory address and add the access time
    /// to the cycle count.
    /// Unaligned halfword reads on ARMv4 return the halfword rotated by 8.
    pub fn read<T: RwType>(&mut self, addr: Address, access: Access) -> T::ReadOutput {
        let time = self.bus.wait_time::<T>(self.state, addr, access);
        self.tick(time as Time);

        let value = self.bus.get::<T>(self.state, addr).u32();
        let value = if !S::Version::IS_V5 && T::WIDTH == 2 && addr.0.is_bit(0) {
            value.rotate_right(8)
        } else {
            value
        };
        T::ReadOutput::from_u32(value)
    }

    /// Set the value at the given memory address and add the access time
    /// to the cycle count.
    pub fn write<T: RwType>(&mut self, addr: Address, value: T, access: Access) {
        let time = self.bus.wait_time::<T>(self.state, addr, access);
        self.tick(time as Time);
        self.bus.set(self.state, addr, value);
    }

    /// Read a word for LDR/SWP. Unaligned addresses read the aligned word,
    /// rotated right by the misalignment.
    pub fn read_word_ldrswp(&mut self, addr: Address, access: Access) -> u32 {
        let val = self.read::<u32>(addr, access);
        val.rotate_right((addr.0 & 3) << 3)
    }

    /// Read a sign-extended halfword for LDRSH.
    /// Unaligned on ARMv4, this instead sign-extends the odd byte.
    pub fn read_hword_ldrsh(&mut self, addr: Address, access: Access) -> u32 {
        let time = self.bus.wait_time::<u16>(self.state, addr, access);
        self.tick(time as Time);
        let val = self.bus.get::<u16>(self.state, addr).u32();
        if !S::Version::IS_V5 && addr.0.is_bit(0) {
            (val >> 8) as i8 as i32 as u32
        } else {
            val as u16 as i16 as i32 as u32
        }
    }

    /// Read a sign-extended byte for LDRSB.
    pub fn read_byte_ldrsb(&mut self, addr: Address, access: Access) -> u32 {
        self.read::<u8>(addr, access) as i8 as i32 as u32
    }

    /// Called by block transfers when the register list was empty:
    /// the base moves by 0x40, and ARMv4 also transfers PC.
    pub(crate) fn on_empty_rlist(&mut self, rb: Register, str: bool, up: bool, before: bool) {
        let addr = Address(self.state[rb]);
        self.set_reg(rb, addr.add_signed(Address(0x40), up).0);

        if S::Version::IS_V5 {
            return;
        }
        let addr = match (up, before) {
            (true, true) => addr + Address::WORD,
            (true, false) => addr,
            (false, true) => addr - Address(0x40),
            (false, false) => addr - Address(0x3C),
        };
        if str {
            let value = self.state.pc().0 + self.state.current_instruction_size();
            self.write::<u32>(addr, value, access::NONSEQ);
        } else {
            let val = self.read::<u32>(addr, access::NONSEQ);
            self.set_pc(Address(val));
        }
    }
}
