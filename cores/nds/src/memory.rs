// Copyright (c) 2024 Leela Aurelia, git@elia.garden
//
// Unless otherwise noted, this file is released and thus subject to the
// terms of the Mozilla Public License Version 2.0 (MPL-2.0) or the
// GNU General Public License Version 3 (GPL-3).
// If a copy of these licenses was not distributed with this file, you can
// obtain them at https://mozilla.org/MPL/2.0/ and http://www.gnu.org/licenses/.

//! Memory map of both CPUs.

use armchair::{interface::RwType, CpuState};
use common::numutil::NumExt;

use crate::{
    cpu::cp15::{Tcm, DTCM_SIZE, ITCM_SIZE},
    hw::bios,
    io, CpuDevice, NdsCpu, System,
};

pub const MAIN_RAM_SIZE: usize = 0x40_0000;
pub const SHARED_WRAM_SIZE: usize = 0x8000;
pub const WRAM7_SIZE: usize = 0x1_0000;

#[derive(Clone)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Memory {
    main: Box<[u8]>,
    shared_wram: Box<[u8]>,
    wram7: Box<[u8]>,
    #[cfg_attr(feature = "serde", serde(with = "serde_arrays"))]
    itcm: [u8; ITCM_SIZE],
    #[cfg_attr(feature = "serde", serde(with = "serde_arrays"))]
    dtcm: [u8; DTCM_SIZE],
    pub postflg: CpuDevice<u8>,
}

impl Default for Memory {
    fn default() -> Self {
        Self {
            main: vec![0; MAIN_RAM_SIZE].into_boxed_slice(),
            shared_wram: vec![0; SHARED_WRAM_SIZE].into_boxed_slice(),
            wram7: vec![0; WRAM7_SIZE].into_boxed_slice(),
            itcm: [0; ITCM_SIZE],
            dtcm: [0; DTCM_SIZE],
            postflg: [0; 2],
        }
    }
}

/// Little-endian read; `offset` must be aligned and in bounds.
fn read_le<T: RwType>(buf: &[u8], offset: usize) -> T {
    let mut value = 0;
    for byte in (0..T::WIDTH.us()).rev() {
        value = (value << 8) | buf[offset + byte].u32();
    }
    T::from_u32(value)
}

/// Little-endian write; `offset` must be aligned and in bounds.
fn write_le<T: RwType>(buf: &mut [u8], offset: usize, value: T) {
    let value = value.u32();
    for byte in 0..T::WIDTH.us() {
        buf[offset + byte] = (value >> (byte * 8)) as u8;
    }
}

impl System {
    /// Read from the memory map of the given CPU.
    pub fn read<DS: NdsCpu, T: RwType>(&mut self, addr: u32) -> T {
        let addr = addr & !(T::WIDTH - 1);
        if DS::I == 1 {
            if let Some(offs) = self.cp15.tcm_offset(Tcm::Inst, addr, false) {
                return read_le(&self.memory.itcm, offs);
            }
            if let Some(offs) = self.cp15.tcm_offset(Tcm::Data, addr, false) {
                return read_le(&self.memory.dtcm, offs);
            }
        }

        match addr >> 24 {
            0x00 if DS::I == 0 => T::from_u32(bios::stub_read(&bios::STUB7, addr)),
            0x02 => read_le(&self.memory.main, addr.us() & (MAIN_RAM_SIZE - 1)),
            0x03 if DS::I == 0 && addr >= 0x0380_0000 => {
                read_le(&self.memory.wram7, addr.us() & (WRAM7_SIZE - 1))
            }
            0x03 => read_le(&self.memory.shared_wram, addr.us() & (SHARED_WRAM_SIZE - 1)),
            0x04 => io::get_mmio_apply(addr, |a| self.get_mmio::<DS>(a)),
            0xFF if DS::I == 1 && addr >= 0xFFFF_0000 => {
                T::from_u32(bios::stub_read(&bios::STUB9, addr & 0xFFFF))
            }
            _ => T::from_u32(0),
        }
    }

    /// Write to the memory map of the given CPU.
    pub fn write<DS: NdsCpu, T: RwType>(&mut self, cpu: &mut CpuState, addr: u32, value: T) {
        let addr = addr & !(T::WIDTH - 1);
        if DS::I == 1 {
            if let Some(offs) = self.cp15.tcm_offset(Tcm::Inst, addr, true) {
                return write_le(&mut self.memory.itcm, offs, value);
            }
            if let Some(offs) = self.cp15.tcm_offset(Tcm::Data, addr, true) {
                return write_le(&mut self.memory.dtcm, offs, value);
            }
        }

        match addr >> 24 {
            0x02 => write_le(&mut self.memory.main, addr.us() & (MAIN_RAM_SIZE - 1), value),
            0x03 if DS::I == 0 && addr >= 0x0380_0000 => {
                write_le(&mut self.memory.wram7, addr.us() & (WRAM7_SIZE - 1), value)
            }
            0x03 => write_le(
                &mut self.memory.shared_wram,
                addr.us() & (SHARED_WRAM_SIZE - 1),
                value,
            ),
            0x04 => io::set_mmio_apply(addr, value, |a, v, m| self.set_mmio::<DS>(cpu, a, v, m)),
            _ => log::debug!("Write to unmapped address 0x{addr:08X} ignored"),
        }
    }
}
