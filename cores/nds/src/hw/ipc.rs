// Copyright (c) 2024 Leela Aurelia, git@elia.garden
//
// Unless otherwise noted, this file is released and thus subject to the
// terms of the Mozilla Public License Version 2.0 (MPL-2.0) or the
// GNU General Public License Version 3 (GPL-3).
// If a copy of these licenses was not distributed with this file, you can
// obtain them at https://mozilla.org/MPL/2.0/ and http://www.gnu.org/licenses/.

use armchair::{Interrupt, InterruptController};
use modular_bitfield::{bitfield, specifiers::*};

use crate::{io::IoSection, CpuDevice};

#[bitfield]
#[repr(u16)]
#[derive(Debug, Default, Copy, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct SyncRegister {
    data_in: B4,
    #[skip]
    __: B4,
    data_out: B4,
    #[skip]
    __: B1,
    send_irq: bool,
    irq_en: bool,
    #[skip]
    __: B1,
}

/// IPCSYNC: each CPU has 4 bits it shows to the other one, and can
/// poke the other CPU with an interrupt.
#[derive(Debug, Default, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct IpcSync {
    regs: CpuDevice<SyncRegister>,
}

impl IpcSync {
    pub fn sync_read(&self, cpu: usize) -> u16 {
        let remote = self.regs[cpu ^ 1];
        self.regs[cpu].with_data_in(remote.data_out()).into()
    }

    /// Write the register of `cpu`, raising IPCSYNC on the other CPU if
    /// requested and it has it enabled.
    pub fn sync_write(
        &mut self,
        intr: &mut CpuDevice<InterruptController>,
        cpu: usize,
        value: IoSection<u16>,
    ) {
        let new = SyncRegister::from(value.with(self.regs[cpu].into()));
        self.regs[cpu] = self.regs[cpu]
            .with_data_out(new.data_out())
            .with_irq_en(new.irq_en());

        if new.send_irq() && self.regs[cpu ^ 1].irq_en() {
            intr[cpu ^ 1].request(Interrupt::IpcSync);
        }
    }
}
