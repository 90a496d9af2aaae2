// Copyright (c) 2024 Leela Aurelia, git@elia.garden
//
// Unless otherwise noted, this file is released and thus subject to the
// terms of the Mozilla Public License Version 2.0 (MPL-2.0) or the
// GNU General Public License Version 3 (GPL-3).
// If a copy of these licenses was not distributed with this file, you can
// obtain them at https://mozilla.org/MPL/2.0/ and http://www.gnu.org/licenses/.

//! Core of a dual-CPU handheld: an ARM946E-S and an ARM7TDMI sharing
//! memory, timers, an IPC channel and a math unit, driven by a single
//! event scheduler.

mod addr;
mod cpu;
mod hw;
mod io;
mod memory;
mod scheduling;

#[cfg(test)]
mod tests;

use std::ops::{Deref, DerefMut};

use armchair::{
    interface::{Bus, RwType},
    Address, Cpu, CpuState, Interrupt, InterruptController,
};
#[cfg(feature = "serde")]
use common::serialize::{self, SerializeError};
use common::{components::scheduler::Scheduler, SystemConfig, Time, TimeS};

pub use crate::cpu::NDS9_CLOCK;
use crate::{
    cpu::{
        cp15::Cp15,
        math::{Div, Sqrt},
    },
    hw::{bios, ipc::IpcSync, timer::Timers},
    memory::Memory,
    scheduling::NdsEvent,
};

/// A device that exists once per CPU, indexed by [NdsCpu::I].
pub type CpuDevice<T> = [T; 2];

/// One of the two CPUs' view of the system. Both wrappers
/// dereference to the shared [System]; the bus implementations on them
/// pick the right memory map and interrupt controller.
pub trait NdsCpu: Bus + DerefMut<Target = System> {
    /// Index into [CpuDevice]s: 0 for the ARM7, 1 for the ARM9.
    const I: usize;
}

/// Macro for creating a wrapper of the system, specifically with
/// the use case of being able to implement ARM CPU support twice,
/// since the system has 2 CPUs.
macro_rules! nds_wrapper {
    ($name:ident, $idx:expr) => {
        /// Wrapper for one of the CPUs.
        pub struct $name<'a>(pub(crate) &'a mut System);

        impl Deref for $name<'_> {
            type Target = System;

            #[inline]
            fn deref(&self) -> &Self::Target {
                self.0
            }
        }

        impl DerefMut for $name<'_> {
            #[inline]
            fn deref_mut(&mut self) -> &mut Self::Target {
                self.0
            }
        }

        impl NdsCpu for $name<'_> {
            const I: usize = $idx;
        }
    };
}

nds_wrapper!(Nds7, 0);
nds_wrapper!(Nds9, 1);

/// Everything both CPUs share.
#[derive(Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct System {
    pub(crate) memory: Memory,
    pub(crate) intr: CpuDevice<InterruptController>,
    pub(crate) timers: CpuDevice<Timers>,
    pub(crate) ipc: IpcSync,
    pub(crate) cp15: Cp15,
    pub(crate) div: Div,
    pub(crate) sqrt: Sqrt,
    pub(crate) scheduler: Scheduler<NdsEvent>,

    #[cfg_attr(feature = "serde", serde(skip))]
    #[cfg_attr(feature = "serde", serde(default))]
    pub(crate) config: SystemConfig,
    /// Cleared by the pause event to stop [Nds::run_for].
    #[cfg_attr(feature = "serde", serde(skip))]
    pub(crate) ticking: bool,
}

/// An emulation session: both CPUs and the system they live in.
///
/// All clocks run at the ARM9's frequency. The ARM7 runs at half of
/// it, so each of its cycles counts twice.
#[derive(Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Nds {
    pub cpu7: CpuState,
    pub cpu9: CpuState,
    pub sys: System,
    /// Cycles each CPU has run for. The scheduler trails the lower one.
    time_7: Time,
    time_9: Time,
}

impl Nds {
    pub fn new(config: &SystemConfig) -> Box<Self> {
        let mut nds = Box::<Self>::default();
        nds.sys.config = config.clone();
        nds
    }

    /// Start both CPUs at the given entry points, with the state the
    /// BIOS leaves behind after booting a game.
    pub fn direct_boot(&mut self, arm9_entry: u32, arm7_entry: u32) {
        bios::boot(&mut self.cpu9, arm9_entry, &bios::STACKS9);
        bios::boot(&mut self.cpu7, arm7_entry, &bios::STACKS7);

        // DTCM at 0x0300_0000, ITCM at 0, high vectors
        self.sys.cp15.set(9, 1, 0, 0x0300_000A);
        self.sys.cp15.set(9, 1, 1, 0x20);
        self.sys.cp15.set(1, 0, 0, 0x0005_2078);
        self.sys.memory.postflg = [1, 1];
    }

    /// Run until the given amount of cycles have passed on the scheduler.
    pub fn run_for(&mut self, cycles: Time) {
        self.sys
            .scheduler
            .schedule(NdsEvent::PauseEmulation, cycles as TimeS);
        self.sys.ticking = true;
        while self.sys.ticking {
            self.advance();
        }
    }

    /// Run one instruction on the CPU that is further behind, then bring
    /// the scheduler up to the slower of the two.
    pub fn advance(&mut self) {
        if self.time_9 <= self.time_7 {
            let cycles = Cpu::step(&mut self.cpu9, &mut Nds9(&mut self.sys));
            self.time_9 = if cycles == 0 {
                self.idle_target(self.time_9, self.time_7, self.cpu7.is_halted)
            } else {
                self.time_9 + cycles
            };
        } else {
            let cycles = Cpu::step(&mut self.cpu7, &mut Nds7(&mut self.sys)) << 1;
            self.time_7 = if cycles == 0 {
                self.idle_target(self.time_7, self.time_9, self.cpu9.is_halted)
            } else {
                self.time_7 + cycles
            };
        }

        let now = self.time_7.min(self.time_9);
        while let Some(event) = self.sys.scheduler.pop_due(now) {
            event.kind.dispatch(&mut self.sys, event.late_by);
        }
        // Everything due was handled above, this only moves the clock
        self.sys.scheduler.advance_to(now, |_, _| ());

        let bias = self.sys.scheduler.reset_base();
        if bias != 0 {
            self.time_7 -= bias;
            self.time_9 -= bias;
            for timers in &mut self.sys.timers {
                timers.rebase(bias);
            }
        }
    }

    /// Where the clock of a halted CPU can skip to: the next event, but
    /// not past the other CPU while that one is still running.
    fn idle_target(&self, own: Time, other: Time, other_halted: bool) -> Time {
        let next = self.sys.scheduler.next_event_at();
        let target = match (next, other_halted) {
            (Some(next), true) => next,
            (Some(next), false) => next.min(other + 1),
            // Nothing will ever wake us
            (None, true) => own,
            (None, false) => other + 1,
        };
        target.max(own)
    }

    /// Raise an interrupt on one of the CPUs.
    pub fn request_interrupt(&mut self, is_arm9: bool, int: Interrupt) {
        self.sys.intr[is_arm9 as usize].request(int);
    }

    /// Read from the ARM7's memory map, with all side effects.
    pub fn get7<T: RwType>(&mut self, addr: u32) -> T {
        Nds7(&mut self.sys).get(&mut self.cpu7, Address(addr))
    }

    /// Read from the ARM9's memory map, with all side effects.
    pub fn get9<T: RwType>(&mut self, addr: u32) -> T {
        Nds9(&mut self.sys).get(&mut self.cpu9, Address(addr))
    }

    /// Write to the ARM7's memory map, with all side effects.
    pub fn set7<T: RwType>(&mut self, addr: u32, value: T) {
        Nds7(&mut self.sys).set(&mut self.cpu7, Address(addr), value)
    }

    /// Write to the ARM9's memory map, with all side effects.
    pub fn set9<T: RwType>(&mut self, addr: u32, value: T) {
        Nds9(&mut self.sys).set(&mut self.cpu9, Address(addr), value)
    }

    /// Cycles run so far on the scheduler clock.
    pub fn now(&self) -> Time {
        self.sys.scheduler.now()
    }

    /// Save the entire session to a binary blob.
    #[cfg(feature = "serde")]
    pub fn save_state(&self) -> Result<Vec<u8>, SerializeError> {
        serialize::serialize(self, self.sys.config.compress_savestates)
    }

    /// Restore a session saved with [Self::save_state]. The configuration
    /// is kept. On error, the session is left untouched.
    #[cfg(feature = "serde")]
    pub fn load_state(&mut self, state: &[u8]) -> Result<(), SerializeError> {
        let loaded: Nds = serialize::deserialize(state, self.sys.config.compress_savestates)
            .inspect_err(|err| log::error!("Failed to load save state: {err}"))?;
        let config = std::mem::take(&mut self.sys.config);
        *self = loaded;
        self.sys.config = config;
        Ok(())
    }
}
