// Copyright (c) 2024 Leela Aurelia, git@elia.garden
//
// Unless otherwise noted, this file is released and thus subject to the
// terms of the Mozilla Public License Version 2.0 (MPL-2.0) or the
// GNU General Public License Version 3 (GPL-3).
// If a copy of these licenses was not distributed with this file, you can
// obtain them at https://mozilla.org/MPL/2.0/ and http://www.gnu.org/licenses/.

//! Small bit twiddling helpers used all over the CPU and the hardware
//! register code.

use core::ops::BitAnd;

/// Trait for common number operations.
pub trait NumExt: BitAnd<Output = Self> + Copy + PartialEq + Default {
    /// Get the state of the given bit. Returns 0/1.
    fn bit(self, bit: u16) -> Self;
    /// Is the given bit set?
    fn is_bit(self, bit: u16) -> bool;
    /// Set the given bit.
    fn set_bit(self, bit: u16, state: bool) -> Self;
    /// Get `len` bits starting at `start`.
    fn bits(self, start: u32, len: u32) -> Self;

    fn u8(self) -> u8;
    fn u16(self) -> u16;
    fn u32(self) -> u32;
    fn us(self) -> usize;

    /// Shift to the left, giving 0 if it does not fit.
    fn wshl(self, by: u32) -> Self;
    /// Shift to the right, giving 0 if it does not fit.
    fn wshr(self, by: u32) -> Self;
}

macro_rules! num_ext_impl {
    ($ty:ident) => {
        impl NumExt for $ty {
            #[inline(always)]
            fn bit(self, bit: u16) -> $ty {
                (self >> bit) & 1
            }

            #[inline(always)]
            fn is_bit(self, bit: u16) -> bool {
                (self & (1 << bit)) != 0
            }

            #[inline(always)]
            fn set_bit(self, bit: u16, state: bool) -> $ty {
                (self & !(1 << bit)) | ((state as $ty) << bit)
            }

            #[inline(always)]
            fn bits(self, start: u32, len: u32) -> $ty {
                self.wshr(start) & (1 as $ty).wshl(len).wrapping_sub(1)
            }

            #[inline(always)]
            fn u8(self) -> u8 {
                self as u8
            }

            #[inline(always)]
            fn u16(self) -> u16 {
                self as u16
            }

            #[inline(always)]
            fn u32(self) -> u32 {
                self as u32
            }

            #[inline(always)]
            fn us(self) -> usize {
                self as usize
            }

            #[inline(always)]
            fn wshl(self, by: u32) -> $ty {
                self.checked_shl(by).unwrap_or(0)
            }

            #[inline(always)]
            fn wshr(self, by: u32) -> $ty {
                self.checked_shr(by).unwrap_or(0)
            }
        }
    };
}

num_ext_impl!(u8);
num_ext_impl!(u16);
num_ext_impl!(u32);
num_ext_impl!(u64);
num_ext_impl!(usize);

pub trait U16Ext {
    /// Sign-extend the low 11 bits, used by Thumb branches.
    fn i11(self) -> i32;
}

impl U16Ext for u16 {
    #[inline(always)]
    fn i11(self) -> i32 {
        (((self & 0x7FF) << 5) as i16 >> 5) as i32
    }
}

pub trait U32Ext {
    /// Sign-extend the low 24 bits, used by ARM branches.
    fn i24(self) -> i32;
}

impl U32Ext for u32 {
    #[inline(always)]
    fn i24(self) -> i32 {
        ((self.bits(0, 24) << 8) as i32) >> 8
    }
}
