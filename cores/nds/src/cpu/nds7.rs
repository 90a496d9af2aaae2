// Copyright (c) 2024 Leela Aurelia, git@elia.garden
//
// Unless otherwise noted, this file is released and thus subject to the
// terms of the Mozilla Public License Version 2.0 (MPL-2.0) or the
// GNU General Public License Version 3 (GPL-3).
// If a copy of these licenses was not distributed with this file, you can
// obtain them at https://mozilla.org/MPL/2.0/ and http://www.gnu.org/licenses/.

use armchair::{
    interface::{Arm7Tdmi, Bus, RwType},
    Access, Address, CpuState, InterruptController,
};
use common::Time;

use crate::{hw::bios, Nds7, NdsCpu};

impl Bus for Nds7<'_> {
    type Version = Arm7Tdmi;

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

    fn hle_swi(&mut self, cpu: &mut CpuState, comment: u8) -> Option<Time> {
        if !self.config.hle_bios {
            return None;
        }
        Some(bios::hle_call(self, cpu, comment))
    }
}
