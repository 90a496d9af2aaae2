// Copyright (c) 2024 Leela Aurelia, git@elia.garden
//
// Unless otherwise noted, this file is released and thus subject to the
// terms of the Mozilla Public License Version 2.0 (MPL-2.0) or the
// GNU General Public License Version 3 (GPL-3).
// If a copy of these licenses was not distributed with this file, you can
// obtain them at https://mozilla.org/MPL/2.0/ and http://www.gnu.org/licenses/.

//! Memory-mapped IO registers.
//! Registers are matched with the `io*` macros, which return from the
//! handler once they match; an access wider than the register is split
//! up and handled one register at a time.

use core::marker::PhantomData;

use armchair::{
    interface::{CpuVersion, RwType},
    CpuState,
};
use common::numutil::NumExt;

use crate::{addr::*, scheduling::NdsEvent, NdsCpu, System};

/// Read result of an unknown register: 0, 1 byte wide.
pub const FAILED_READ: (u32, u32, u32) = (0, 0, 1);
/// Write result of an unknown register: 1 byte wide.
pub const FAILED_WRITE: (u32, u32) = (0, 1);

macro_rules! io08 {
    ($ma:expr, $addr:expr, $exec: expr) => {{
        if $ma == $addr {
            let exec: u8 = { $exec };
            return (exec as u32, 0, 1);
        }
    }};
}

macro_rules! io16 {
    ($ma:expr, $addr:expr, $exec: expr) => {{
        if ($ma & !1) == $addr {
            let exec: u16 = { $exec };
            return (exec as u32, $ma & 1, 2);
        }
    }};
}

macro_rules! io32 {
    ($ma:expr, $addr:expr, $exec: expr) => {{
        if ($ma & !3) == $addr {
            let exec: u32 = { $exec };
            return (exec, $ma & 3, 4);
        }
    }};
}

macro_rules! iow08 {
    ($a:expr, $addr:expr, $exec: expr) => {{
        if $a == $addr {
            let _exec: () = { $exec };
            return (0, 1);
        }
    }};
}

macro_rules! iow16 {
    ($a:expr, $addr:expr, $exec: expr) => {{
        if ($a & !1) == $addr {
            let _exec: () = { $exec };
            return ($a & 1, 2);
        }
    }};
}

macro_rules! iow32 {
    ($a:expr, $addr:expr, $exec: expr) => {{
        if ($a & !3) == $addr {
            let _exec: () = { $exec };
            return ($a & 3, 4);
        }
    }};
}

/// Read a value of type `T`, calling `inner` for every register the
/// read touches. `inner` returns (value, offset of the address into the
/// register, register width).
pub fn get_mmio_apply<T: RwType>(addr: u32, mut inner: impl FnMut(u32) -> (u32, u32, u32)) -> T {
    let addr = addr & 0xFF_FFFF;
    let mut out = 0;

    let mut current_byte = 0;
    while current_byte < T::WIDTH {
        let (value, from_start_offset, reg_size) = inner(addr + current_byte);
        out |= (value >> (from_start_offset * 8)) << (current_byte * 8);
        current_byte += reg_size - from_start_offset;
    }

    T::from_u32(out)
}

/// Write a value of type `T`, calling `inner` for every register the
/// write touches with the remaining value and a mask of the bytes
/// written. `inner` returns (offset of the address into the register,
/// register width).
pub fn set_mmio_apply<T: RwType>(
    addr: u32,
    value: T,
    mut inner: impl FnMut(u32, u32, u32) -> (u32, u32),
) {
    let addr = addr & 0xFF_FFFF;
    let mut value = value.u32();

    let mut current_byte = 0;
    let mut mask = u32::MAX >> ((4 - T::WIDTH) * 8);
    while current_byte < T::WIDTH {
        let (from_start_offset, reg_size) = inner(addr + current_byte, value, mask);
        let written = reg_size - from_start_offset;
        value = value.wrapping_shr(written * 8);
        mask = mask.wrapping_shr(written * 8);
        current_byte += written;
    }
}

/// Make a section for a register of type `T` from a write.
pub fn section<T: RwType>(addr: u32, new: u32, mask: u32) -> IoSection<T> {
    let offs = addr & (T::WIDTH - 1);
    IoSection {
        value: new << (offs * 8),
        mask: mask << (offs * 8),
        _ph: PhantomData,
    }
}

/// The part of a register that a write covers.
#[derive(Copy, Clone)]
pub struct IoSection<T> {
    value: u32,
    mask: u32,
    _ph: PhantomData<T>,
}

impl<T: RwType> IoSection<T> {
    pub fn apply(&self, to: &mut T) {
        *to = self.with(*to);
    }

    pub fn apply_io_ret<E>(&self, to: &mut E) -> E
    where
        T: From<E>,
        E: Copy + From<T>,
    {
        *to = self.with((*to).into()).into();
        *to
    }

    /// The register with this section written to it.
    pub fn with(&self, with: T) -> T {
        T::from_u32((with.u32() & !self.mask) | (self.value & self.mask))
    }

    /// Only the bits written, rest is 0.
    pub fn raw(&self) -> T {
        T::from_u32(self.value & self.mask)
    }
}

/// Write a section into one half of a 64-bit register.
fn apply_half(reg: &mut u64, high: bool, section: IoSection<u32>) {
    let shift = if high { 32 } else { 0 };
    let half = section.with((*reg >> shift) as u32);
    *reg = (*reg & !(0xFFFF_FFFF << shift)) | ((half as u64) << shift);
}

impl System {
    pub fn get_mmio<DS: NdsCpu>(&mut self, a: u32) -> (u32, u32, u32) {
        if DS::I == 1 {
            // Math
            io32!(a, DIVCNT, u16::from(self.div.ctrl).u32());
            io32!(a, DIV_NUMER_L, self.div.numer as u32);
            io32!(a, DIV_NUMER_H, (self.div.numer >> 32) as u32);
            io32!(a, DIV_DENOM_L, self.div.denom as u32);
            io32!(a, DIV_DENOM_H, (self.div.denom >> 32) as u32);
            io32!(a, DIV_RESULT_L, self.div.result as u32);
            io32!(a, DIV_RESULT_H, (self.div.result >> 32) as u32);
            io32!(a, DIVREM_RESULT_L, self.div.rem as u32);
            io32!(a, DIVREM_RESULT_H, (self.div.rem >> 32) as u32);
            io32!(a, SQRTCNT, u16::from(self.sqrt.ctrl).u32());
            io32!(a, SQRT_RESULT, self.sqrt.result);
            io32!(a, SQRT_PARAM_L, self.sqrt.input as u32);
            io32!(a, SQRT_PARAM_H, (self.sqrt.input >> 32) as u32);
        } else {
            io08!(a, HALTCNT, 0);
        }

        // Timers
        for idx in 0..4 {
            io16!(
                a,
                TM0CNT_L + (idx * 4),
                self.timers[DS::I].time_read(idx.us(), self.scheduler.now())
            );
            io16!(
                a,
                TM0CNT_H + (idx * 4),
                self.timers[DS::I].control[idx.us()].into()
            );
        }

        // IPC
        io16!(a, IPCSYNC, self.ipc.sync_read(DS::I));

        // Interrupts
        io32!(a, IME, self.intr[DS::I].ime as u32);
        io32!(a, IE, self.intr[DS::I].ie);
        io32!(a, IF, self.intr[DS::I].if_);

        io08!(a, POSTFLG, self.memory.postflg[DS::I]);

        log::info!("{} read from unknown IO register 0x{a:X}", DS::Version::NAME);
        FAILED_READ
    }

    pub fn set_mmio<DS: NdsCpu>(
        &mut self,
        cpu: &mut CpuState,
        a: u32,
        v: u32,
        m: u32,
    ) -> (u32, u32) {
        let s8 = section::<u8>(a, v, m);
        let s16 = section::<u16>(a, v, m);
        let s32 = section::<u32>(a, v, m);

        if DS::I == 1 {
            // Math
            iow32!(a, DIVCNT, {
                self.div.ctrl_write(s32.with(0).u16());
                self.start_div();
            });
            iow32!(a, DIV_NUMER_L, {
                apply_half(&mut self.div.numer, false, s32);
                self.start_div();
            });
            iow32!(a, DIV_NUMER_H, {
                apply_half(&mut self.div.numer, true, s32);
                self.start_div();
            });
            iow32!(a, DIV_DENOM_L, {
                apply_half(&mut self.div.denom, false, s32);
                self.start_div();
            });
            iow32!(a, DIV_DENOM_H, {
                apply_half(&mut self.div.denom, true, s32);
                self.start_div();
            });
            iow32!(a, SQRTCNT, {
                self.sqrt.ctrl_write(s32.with(0).u16());
                self.start_sqrt();
            });
            iow32!(a, SQRT_PARAM_L, {
                apply_half(&mut self.sqrt.input, false, s32);
                self.start_sqrt();
            });
            iow32!(a, SQRT_PARAM_H, {
                apply_half(&mut self.sqrt.input, true, s32);
                self.start_sqrt();
            });
        } else {
            iow08!(a, HALTCNT, {
                match s8.raw() >> 6 {
                    0 => (),
                    2 => {
                        log::debug!("ARM7 halted through HALTCNT");
                        cpu.is_halted = true;
                    }
                    mode => {
                        // There is no wakeup hardware, treat sleep like halt
                        log::debug!("ARM7 entered power mode {mode} through HALTCNT, halting");
                        cpu.is_halted = true;
                    }
                }
            });
        }

        // Timers
        for idx in 0..4 {
            iow16!(
                a,
                TM0CNT_L + (idx.u32() * 4),
                s16.apply(&mut self.timers[DS::I].reload[idx])
            );
            iow16!(a, TM0CNT_H + (idx.u32() * 4), {
                self.timers[DS::I].hi_write(DS::I == 1, &mut self.scheduler, idx, s16)
            });
        }

        // IPC
        iow16!(a, IPCSYNC, self.ipc.sync_write(&mut self.intr, DS::I, s16));

        // Interrupts
        iow32!(a, IME, self.intr[DS::I].ime = s32.with(0).is_bit(0));
        iow32!(a, IE, s32.apply(&mut self.intr[DS::I].ie));
        iow32!(a, IF, self.intr[DS::I].acknowledge(s32.raw()));

        iow08!(a, POSTFLG, {
            // Once set, it stays set
            self.memory.postflg[DS::I] |= s8.raw() & 1;
        });

        log::info!(
            "{} write 0x{v:X} to unknown IO register 0x{a:X}",
            DS::Version::NAME
        );
        FAILED_WRITE
    }

    fn start_div(&mut self) {
        self.div.update();
        self.div.ctrl.set_busy(true);
        self.scheduler.schedule(NdsEvent::DivDone, self.div.latency());
    }

    fn start_sqrt(&mut self) {
        self.sqrt.update();
        self.sqrt.ctrl.set_busy(true);
        self.scheduler.schedule(NdsEvent::SqrtDone, self.sqrt.latency());
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn section_keeps_unwritten_bits() {
        let section = section::<u32>(0, 0x4321, 0x0000_FFFF);
        assert_eq!(section.with(0x1234_5678), 0x1234_4321);
        assert_eq!(section.raw(), 0x4321);
    }

    #[test]
    fn byte_read_of_halfword_register() {
        let value = get_mmio_apply::<u8>(1, |a| {
            io16!(a, 0, 0x1234);
            FAILED_READ
        });
        assert_eq!(value, 0x12);
    }

    #[test]
    fn word_read_across_registers() {
        let value = get_mmio_apply::<u32>(0, |a| {
            io16!(a, 0, 0x5678);
            io08!(a, 2, 0x34);
            FAILED_READ
        });
        assert_eq!(value, 0x0034_5678);
    }

    #[test]
    fn byte_write_into_upper_half() {
        let mut value = 0x00FFu16;
        set_mmio_apply(1, 0x12u8, |a, v, m| {
            let s16 = section::<u16>(a, v, m);
            iow16!(a, 0, s16.apply(&mut value));
            FAILED_WRITE
        });
        assert_eq!(value, 0x12FF);
    }

    #[test]
    fn word_write_across_registers() {
        let (mut lo, mut hi) = (0u16, 0u16);
        set_mmio_apply(0, 0xAAAA_5555u32, |a, v, m| {
            let s16 = section::<u16>(a, v, m);
            iow16!(a, 0, s16.apply(&mut lo));
            iow16!(a, 2, s16.apply(&mut hi));
            FAILED_WRITE
        });
        assert_eq!((lo, hi), (0x5555, 0xAAAA));
    }

    #[test]
    fn write_to_upper_word_half() {
        let mut reg = 0x1111_1111_2222_2222u64;
        apply_half(&mut reg, true, section::<u32>(0, 0x3333_3333, u32::MAX));
        assert_eq!(reg, 0x3333_3333_2222_2222);
    }
}
