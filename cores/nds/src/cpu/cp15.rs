// Copyright (c) 2024 Leela Aurelia, git@elia.garden
//
// Unless otherwise noted, this file is released and thus subject to the
// terms of the Mozilla Public License Version 2.0 (MPL-2.0) or the
// GNU General Public License Version 3 (GPL-3).
// If a copy of these licenses was not distributed with this file, you can
// obtain them at https://mozilla.org/MPL/2.0/ and http://www.gnu.org/licenses/.

//! CP15 of the ARM9: system control, protection unit and TCM.
//! The register interface is in `nds9.rs`, as part of the bus.

use core::ops::Range;

use armchair::Address;
use common::numutil::NumExt;
use modular_bitfield::{bitfield, specifiers::*};

/// Size of the ITCM; it is mirrored over its virtual size.
pub const ITCM_SIZE: usize = 0x8000;
/// Size of the DTCM; it is mirrored over its virtual size.
pub const DTCM_SIZE: usize = 0x4000;

#[bitfield]
#[repr(u32)]
#[derive(Debug, Default, Copy, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Control {
    pub pu_enable: bool,
    #[skip]
    __: B1,
    pub data_cache_enable: bool,
    #[skip]
    __: B4,
    pub big_endian: bool,
    #[skip]
    __: B4,

    pub inst_cache_enable: bool,
    pub exception_vectors_high: bool,
    pub cache_replacement: bool,
    pub pre_armv5: bool,

    pub dtcm_enable: bool,
    pub dtcm_load_mode: bool,
    pub itcm_enable: bool,
    pub itcm_load_mode: bool,

    #[skip]
    __: B12,
}

#[bitfield]
#[repr(u32)]
#[derive(Debug, Default, Copy, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct TcmControl {
    #[skip]
    __: B1,
    pub virtual_size: B5,
    #[skip]
    __: B6,
    pub region_base: B20,
}

/// How a TCM is currently mapped.
#[derive(Debug, Copy, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum TcmState {
    None,
    /// Load mode: writes go to the TCM, reads go to the bus.
    Wo,
    Rw,
}

/// Which TCM. Used as the index into TCM arrays.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Tcm {
    Data = 0,
    Inst = 1,
}

#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Cp15 {
    pub(crate) control: Control,
    pub(crate) cache_bits: [u8; 2],
    pub(crate) data_bufferable_bits: u8,

    pub(crate) access_protection_bits: [u16; 2],
    pub(crate) access_protection_bits_ext: [u32; 2],
    pub(crate) protection_unit_regions: [[u32; 8]; 2],

    pub(crate) cache_lockdown: [u32; 2],
    pub(crate) tcm_control: [TcmControl; 2],
    pub(crate) trace_process_id: u32,

    tcm_state: [TcmState; 2],
    tcm_range: [Range<u32>; 2],
}

impl Cp15 {
    pub fn get(&self, cn: u32, cm: u32, cp: u32) -> u32 {
        match (cn, cm, cp) {
            // ID registers
            (0, 0, 0 | 3..=7) => 0x4105_9461,
            (0, 0, 1) => 0x0F0D_2112,
            (0, 0, 2) => 0x0014_0180,

            (1, 0, 0) => self.control.into(),

            // PU
            (2, 0, 0 | 1) => self.cache_bits[cp.us()].u32(),
            (3, 0, 0) => self.data_bufferable_bits.u32(),
            (5, 0, 0 | 1) => self.access_protection_bits[cp.us()].u32(),
            (5, 0, 2 | 3) => self.access_protection_bits_ext[cp.us() - 2],
            (6, _, 0 | 1) => self.protection_unit_regions[cp.us()][cm.us() & 7],

            // Cache and TCM
            (9, 0, 0 | 1) => self.cache_lockdown[cp.us()],
            (9, 1, 0 | 1) => self.tcm_control[cp.us()].into(),

            (13, 0 | 1, 1) => self.trace_process_id,

            _ => {
                log::error!("Read from unknown CP15 register C{cn},C{cm},{cp}");
                0
            }
        }
    }

    /// Set a register. Returns if the CPU should halt.
    pub fn set(&mut self, cn: u32, cm: u32, cp: u32, rd: u32) -> bool {
        match (cn, cm, cp) {
            (0, 0, _) => (),

            (1, 0, 0) => self.control_update(rd),

            // PU
            (2, 0, 0 | 1) => self.cache_bits[cp.us()] = rd.u8(),
            (3, 0, 0) => self.data_bufferable_bits = rd.u8(),
            (5, 0, 0 | 1) => self.access_protection_bits[cp.us()] = rd.u16(),
            (5, 0, 2 | 3) => self.access_protection_bits_ext[cp.us() - 2] = rd,
            (6, _, 0 | 1) => self.protection_unit_regions[cp.us()][cm.us() & 7] = rd,

            (7, 0, 4) | (7, 8, 2) => return true,
            // Cache maintenance, no caches are emulated
            (7, _, _) => (),

            (9, 0, 0 | 1) => self.cache_lockdown[cp.us()] = rd,
            (9, 1, 0) => {
                self.tcm_control[0] = rd.into();
                self.dtcm_map_update();
            }
            (9, 1, 1) => {
                self.tcm_control[1] = rd.into();
                self.itcm_map_update();
            }

            (13, 0 | 1, 1) => self.trace_process_id = rd,

            _ => log::error!("Write 0x{rd:08X} to unknown CP15 register C{cn},C{cm},{cp}"),
        }
        false
    }

    /// Base address for exception vectors.
    pub fn vector_base(&self) -> Address {
        if self.control.exception_vectors_high() {
            Address(0xFFFF_0000)
        } else {
            Address(0)
        }
    }

    /// Offset into the given TCM for an access at `addr`, if it is mapped
    /// there. Reads only hit it when not in load mode.
    pub fn tcm_offset(&self, tcm: Tcm, addr: u32, write: bool) -> Option<usize> {
        let state = self.tcm_state[tcm as usize];
        let range = &self.tcm_range[tcm as usize];
        let mapped = match state {
            TcmState::None => false,
            TcmState::Wo => write,
            TcmState::Rw => true,
        };
        if mapped && range.contains(&addr) {
            let size = match tcm {
                Tcm::Data => DTCM_SIZE,
                Tcm::Inst => ITCM_SIZE,
            };
            Some((addr - range.start).us() & (size - 1))
        } else {
            None
        }
    }

    fn dtcm_map_update(&mut self) {
        let base = self.tcm_control[0].region_base() << 12;
        let size = tcm_size(self.tcm_control[0].virtual_size());
        self.tcm_range[0] = base..base.saturating_add(size);
        self.tcm_state[0] = Self::state(self.control.dtcm_enable(), self.control.dtcm_load_mode());
    }

    fn itcm_map_update(&mut self) {
        // The ITCM base is fixed at 0
        let size = tcm_size(self.tcm_control[1].virtual_size());
        self.tcm_range[1] = 0..size;
        self.tcm_state[1] = Self::state(self.control.itcm_enable(), self.control.itcm_load_mode());
    }

    fn state(enable: bool, load_mode: bool) -> TcmState {
        match (enable, load_mode) {
            (false, _) => TcmState::None,
            (true, true) => TcmState::Wo,
            (true, false) => TcmState::Rw,
        }
    }

    fn control_update(&mut self, ctrl: u32) {
        self.control = ctrl.into();
        self.dtcm_map_update();
        self.itcm_map_update();
    }
}

impl Default for Cp15 {
    fn default() -> Self {
        let mut cp15 = Self {
            control: Control::default()
                .with_exception_vectors_high(true)
                .with_dtcm_enable(true)
                .with_itcm_enable(true),
            cache_bits: [0; 2],
            data_bufferable_bits: 0,
            access_protection_bits: [0; 2],
            access_protection_bits_ext: [0; 2],
            protection_unit_regions: [[0; 8]; 2],
            cache_lockdown: [0; 2],
            tcm_control: [
                TcmControl::default()
                    .with_region_base(0x27C0)
                    .with_virtual_size(5),
                TcmControl::default().with_virtual_size(16),
            ],
            trace_process_id: 0,

            tcm_state: [TcmState::None; 2],
            tcm_range: [0..0, 0..0],
        };
        cp15.dtcm_map_update();
        cp15.itcm_map_update();
        cp15
    }
}

/// Bytes covered by a TCM region, 512 shifted by its virtual size.
/// Sizes past 4GiB are clamped to the end of the address space.
fn tcm_size(virtual_size: u8) -> u32 {
    u32::try_from(512u64 << virtual_size).unwrap_or(u32::MAX)
}
