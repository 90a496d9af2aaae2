// Copyright (c) 2024 Leela Aurelia, git@elia.garden
//
// Unless otherwise noted, this file is released and thus subject to the
// terms of the Mozilla Public License Version 2.0 (MPL-2.0) or the
// GNU General Public License Version 3 (GPL-3).
// If a copy of these licenses was not distributed with this file, you can
// obtain them at https://mozilla.org/MPL/2.0/ and http://www.gnu.org/licenses/.

//! An interpreter for the ARMv4T and ARMv5TE instruction sets.
//! The system the CPU lives in is abstracted by the [interface::Bus] trait;
//! the CPU version is chosen by the bus.

#![no_std]

extern crate alloc;
#[cfg(test)]
extern crate std;

mod arm;
mod exceptions;
pub mod interface;
mod memory;
mod misc;
pub mod state;
mod thumb;

#[cfg(test)]
mod tests;

use alloc::string::{String, ToString};

pub use arm::{ArmInst, ArmInstruction};
use common::{numutil::NumExt, Time};
pub use exceptions::{Exception, Interrupt, InterruptController};
use interface::{Bus, CpuVersion, RwType};
pub use memory::{access, Access, Address, RelativeOffset};
pub use state::CpuState;
use state::Flag::Thumb;
pub use thumb::{ThumbInst, ThumbInstruction};

/// A CPU borrowed together with the system it lives in.
/// The CPU's state is owned by the system; this only exists for the
/// duration of a single instruction.
pub struct Cpu<'a, S: Bus> {
    pub state: &'a mut CpuState,
    pub bus: &'a mut S,
    cycles: Time,
}

impl<'a, S: Bus> Cpu<'a, S> {
    /// Execute the next instruction, or take a pending interrupt.
    /// Returns the amount of cycles that took, on the CPU's own clock.
    /// A halted CPU without pending interrupts takes no time.
    pub fn step(state: &'a mut CpuState, bus: &'a mut S) -> Time {
        let mut cpu = Cpu {
            state,
            bus,
            cycles: 0,
        };
        cpu.execute_next();
        cpu.cycles
    }

    fn execute_next(&mut self) {
        if self.state.is_halted {
            if !self.bus.interrupts().is_pending() {
                return;
            }
            log::debug!("{} woke up from halt", S::Version::NAME);
            self.state.is_halted = false;
        }
        if self.check_if_interrupt() {
            return;
        }

        self.revalidate_pipeline();
        if self.state.is_flag(Thumb) {
            let inst = self.fetch_next_inst::<u16>();
            self.trace_inst::<u16>(inst);
            self.interpret_thumb(inst.u16());
        } else {
            let inst = self.fetch_next_inst::<u32>();
            self.trace_inst::<u32>(inst);
            self.interpret_arm(inst);
        }
    }

    /// Fetch the next instruction of the CPU.
    fn fetch_next_inst<TY: RwType>(&mut self) -> u32 {
        let pc = self.state.bump_pc(TY::WIDTH);
        let access = self.state.access_type | access::CODE;
        let time = self.bus.wait_time::<TY>(self.state, pc, access);
        self.tick(time as Time);

        let future_inst = self.bus.get::<TY>(self.state, pc).u32();
        self.state.advance_pipeline(future_inst)
    }

    fn trace_inst<TY: RwType>(&self, inst: u32) {
        if log::log_enabled!(log::Level::Trace) {
            let pc = self.state.pc().0.wrapping_sub(self.state.pipeline_offset());
            let mnem = disassemble(inst, TY::WIDTH == 2);
            log::trace!(
                "{} 0x{pc:08X} | {inst:08X}: {mnem}, cpsr 0x{:08X}",
                S::Version::NAME,
                self.state.cpsr()
            );
        }
    }

    /// Add cycles to the time this step took.
    #[inline]
    pub(crate) fn tick(&mut self, cycles: Time) {
        self.cycles += cycles;
    }
}

/// Disassemble an instruction of either instruction set.
pub fn disassemble(inst: u32, thumb: bool) -> String {
    if thumb {
        ThumbInst(inst.u16()).to_string()
    } else {
        ArmInst(inst).to_string()
    }
}
