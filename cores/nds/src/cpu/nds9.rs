// Copyright (c) 2024 Leela Aurelia, git@elia.garden
//
// Unless otherwise noted, this file is released and thus subject to the
// terms of the Mozilla Public License Version 2.0 (MPL-2.0) or the
// GNU General Public License Version 3 (GPL-3).
// If a copy of these licenses was not distributed with this file, you can
// obtain them at https://mozilla.org/MPL/2.0/ and http://www.gnu.org/licenses/.

use armchair::{
    interface::{Arm946Es, Bus, RwType},
    Access, Address, CpuState, InterruptController,
};
use common::Time;

use crate::{hw::bios, Nds9, NdsCpu};

impl Bus for Nds9<'_> {
    type Version = Arm946Es;

    fn get<T: RwType>(&mut self, _cpu: &mut CpuState, addr: Address) -> T {
        self.read::<Self, T>(addr.0)
    }

    fn set<T: RwType>(&mut self, cpu: &mut CpuState, addr: Address, value: T) {
        self.write::<Self, T>(cpu, addr.0, value)
    }

    fn wait_time<T: RwType>(
        &mut self,
        _cpu: &mut CpuState,
        _addr: Address,
        _access: Access,
    ) -> u16 {
        1
    }

    fn interrupts(&self) -> &InterruptController {
        &self.intr[Self::I]
    }

    fn exception_vector_base(&self) -> Address {
        self.cp15.vector_base()
    }

    fn hle_swi(&mut self, cpu: &mut CpuState, comment: u8) -> Option<Time> {
        if !self.config.hle_bios {
            return None;
        }
        Some(bios::hle_call(self, cpu, comment))
    }

    fn get_cp15(&mut self, _cpu: &mut CpuState, cn: u32, cm: u32, cp: u32) -> u32 {
        self.cp15.get(cn, cm, cp)
    }

    fn set_cp15(&mut self, cpu: &mut CpuState, cn: u32, cm: u32, cp: u32, value: u32) {
        if self.cp15.set(cn, cm, cp, value) {
            log::debug!("ARM9 halted through CP15");
            cpu.is_halted = true;
        }
    }
}
