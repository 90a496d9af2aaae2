// Copyright (c) 2024 Leela Aurelia, git@elia.garden
//
// Unless otherwise noted, this file is released and thus subject to the
// terms of the Mozilla Public License Version 2.0 (MPL-2.0) or the
// GNU General Public License Version 3 (GPL-3).
// If a copy of these licenses was not distributed with this file, you can
// obtain them at https://mozilla.org/MPL/2.0/ and http://www.gnu.org/licenses/.

use common::{numutil::NumExt, Time};

use crate::{
    exceptions::InterruptController,
    memory::{Access, Address},
    state::CpuState,
    Exception,
};

/// Trait for a system that contains this CPU.
/// The CPU borrows the bus for the duration of a single step.
pub trait Bus {
    /// CPU version to emulate for this bus.
    type Version: CpuVersion;

    /// Get the value at the given memory address.
    fn get<T: RwType>(&mut self, cpu: &mut CpuState, addr: Address) -> T;
    /// Set the value at the given memory address.
    fn set<T: RwType>(&mut self, cpu: &mut CpuState, addr: Address, value: T);
    /// Get the access time in cycles for the given memory address.
    fn wait_time<T: RwType>(&mut self, cpu: &mut CpuState, addr: Address, access: Access) -> u16;

    /// Interrupt registers of the CPU on this bus.
    fn interrupts(&self) -> &InterruptController;

    /// Base address for exception vectors.
    fn exception_vector_base(&self) -> Address {
        Address(0)
    }

    /// Callback to perform any system-specific behavior on an exception.
    fn exception_happened(&mut self, _cpu: &mut CpuState, _kind: Exception) {}

    /// Handle a software interrupt in place of the BIOS.
    /// Called after the CPU already entered supervisor mode.
    /// Returns the cycles the call took if it was handled, in which case
    /// the CPU returns to the caller right away; `None` runs the
    /// exception vector instead.
    fn hle_swi(&mut self, _cpu: &mut CpuState, _comment: u8) -> Option<Time> {
        None
    }

    /// Callback for getting a CP15 register.
    /// Only used when `IS_V5 == true`.
    fn get_cp15(&mut self, _cpu: &mut CpuState, cn: u32, cm: u32, cp: u32) -> u32 {
        log::error!("CP15 read from C{cn},C{cm},{cp} on a system without CP15");
        0
    }

    /// Callback for setting a CP15 register.
    /// Only used when `IS_V5 == true`.
    fn set_cp15(&mut self, _cpu: &mut CpuState, cn: u32, cm: u32, cp: u32, value: u32) {
        log::error!("CP15 write 0x{value:08X} to C{cn},C{cm},{cp} on a system without CP15");
    }
}

/// Trait for a CPU version to implement.
pub trait CpuVersion {
    /// If this version exhibits V5 behavior.
    const IS_V5: bool;
    /// Name used in logs.
    const NAME: &'static str;
}

/// The lesser CPU: ARMv4T.
pub struct Arm7Tdmi;

impl CpuVersion for Arm7Tdmi {
    const IS_V5: bool = false;
    const NAME: &'static str = "ARM7";
}

/// The main CPU: ARMv5TE.
pub struct Arm946Es;

impl CpuVersion for Arm946Es {
    const IS_V5: bool = true;
    const NAME: &'static str = "ARM9";
}

/// Trait for a type that the CPU can read/write memory with.
/// On this ARM CPU, it is u8, u16, u32.
pub trait RwType: NumExt + 'static {
    /// Width in bytes.
    const WIDTH: u32;
    type ReadOutput: RwType;

    /// Truncate a word to this type.
    fn from_u32(value: u32) -> Self;
}

impl RwType for u8 {
    const WIDTH: u32 = 1;
    type ReadOutput = Self;

    fn from_u32(value: u32) -> Self {
        value as u8
    }
}

impl RwType for u16 {
    const WIDTH: u32 = 2;
    /// u16 outputs u32: On unaligned reads, the CPU
    /// shifts the result, therefore making it 32bit.
    type ReadOutput = u32;

    fn from_u32(value: u32) -> Self {
        value as u16
    }
}

impl RwType for u32 {
    const WIDTH: u32 = 4;
    type ReadOutput = Self;

    fn from_u32(value: u32) -> Self {
        value
    }
}
