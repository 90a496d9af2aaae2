// Copyright (c) 2024 Leela Aurelia, git@elia.garden
//
// Unless otherwise noted, this file is released and thus subject to the
// terms of the Mozilla Public License Version 2.0 (MPL-2.0) or the
// GNU General Public License Version 3 (GPL-3).
// If a copy of these licenses was not distributed with this file, you can
// obtain them at https://mozilla.org/MPL/2.0/ and http://www.gnu.org/licenses/.

use core::fmt::UpperHex;

use common::numutil::NumExt;

use crate::{
    interface::{Bus, CpuVersion},
    memory::{
        access::{NONSEQ, SEQ},
        Address, RelativeOffset,
    },
    state::{Mode, Register},
    Cpu,
};

/// Configuration of a block transfer (LDM/STM and the THUMB
/// PUSH/POP/LDMIA/STMIA that share its logic).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct BlockTransfer {
    /// Load (LDM) or store (STM)?
    pub ldr: bool,
    /// Adjust the address before each transfer?
    pub pre: bool,
    /// Ascending addresses?
    pub up: bool,
    /// Write the final address back to the base?
    pub writeback: bool,
    /// The S bit: transfer user bank registers, or restore CPSR
    /// from SPSR when loading PC.
    pub s_bit: bool,
}

impl<S: Bus> Cpu<'_, S> {
    /// An opcode that is not valid on this CPU. It is logged and
    /// otherwise does nothing.
    pub(crate) fn und_inst<T: UpperHex>(&mut self, code: T) {
        log::error!(
            "{}: Unknown opcode '0x{code:X}' at 0x{:08X}",
            S::Version::NAME,
            self.state.pc().0.wrapping_sub(self.state.pipeline_offset())
        );
    }

    /// Idle for 1 cycle and set access type to non-sequential.
    pub(crate) fn idle_nonseq(&mut self) {
        self.tick(1);
        self.state.access_type = NONSEQ;
    }

    /// Calculate MUL instruction wait cycles and add them to the clock.
    /// More cycles are needed the more significant bytes of the
    /// multiplier are used.
    pub(crate) fn apply_mul_idle_ticks(&mut self, mut value: u32, signed: bool) {
        self.idle_nonseq();
        let mut mask = 0xFFFF_FF00;
        loop {
            value &= mask;
            if value == 0 || (signed && value == mask) {
                break;
            }
            self.tick(1);
            mask <<= 8;
        }
    }

    /// Perform a relative jump.
    pub(crate) fn relative_jump(&mut self, offset: RelativeOffset) {
        let target = self.state.pc().add_rel(offset);
        self.set_pc(target);
    }

    /// Transfer a list of registers from/to memory, with base writeback.
    /// Both the ARM and THUMB block transfers end up here.
    pub(crate) fn block_transfer(&mut self, n: Register, rlist: u16, cfg: BlockTransfer) {
        if rlist == 0 {
            self.on_empty_rlist(n, !cfg.ldr, cfg.up, cfg.pre);
            if cfg.ldr {
                self.idle_nonseq();
            } else {
                self.state.access_type = NONSEQ;
            }
            return;
        }

        let base = self.state[n];
        let count = rlist.count_ones();
        let first = rlist.trailing_zeros() as u16;
        let last = 15 - rlist.leading_zeros() as u16;
        let size = count * 4;
        let new_base = if cfg.up {
            base.wrapping_add(size)
        } else {
            base.wrapping_sub(size)
        };

        // Registers are always transferred lowest first, to the lowest address
        let mut addr = Address(match (cfg.pre, cfg.up) {
            (false, true) => base,
            (true, true) => base.wrapping_add(4),
            (false, false) => base.wrapping_sub(size).wrapping_add(4),
            (true, false) => base.wrapping_sub(size),
        });

        let pc_in_list = rlist.is_bit(15);
        let user_bank = cfg.s_bit && !(cfg.ldr && pc_in_list);
        let mut loaded_pc = None;
        let mut access = NONSEQ;

        for reg in Register::from_rlist(rlist) {
            if cfg.ldr {
                let value = self.read::<u32>(addr, access);
                if reg.is_pc() {
                    loaded_pc = Some(value);
                } else if user_bank {
                    self.state.set_reg_in_mode(Mode::User, reg, value);
                } else {
                    self.state.registers[reg.0.us()] = value;
                }
            } else {
                let value = if reg == n && reg.0 != first && !S::Version::IS_V5 {
                    // ARMv4 stores the already written-back base when
                    // it is not the first register
                    new_base
                } else if reg.is_pc() {
                    self.state.reg_pc4(reg)
                } else if user_bank {
                    self.state.reg_in_mode(Mode::User, reg)
                } else {
                    self.state[reg]
                };
                self.write::<u32>(addr, value, access);
            }
            access = SEQ;
            addr += Address::WORD;
        }

        let base_in_list = rlist.is_bit(n.0);
        // ARMv5 keeps the written-back base on loads, unless the base
        // is the last register of several
        let ldr_writeback = S::Version::IS_V5 && (count == 1 || last != n.0);
        if cfg.writeback && (!cfg.ldr || !base_in_list || ldr_writeback) {
            self.state.registers[n.0.us()] = new_base;
        }

        if cfg.ldr {
            self.idle_nonseq();
        } else {
            self.state.access_type = NONSEQ;
        }

        if let Some(pc) = loaded_pc {
            if cfg.s_bit {
                let spsr = self.state.spsr();
                self.state.set_cpsr(spsr);
                self.set_pc(Address(pc));
            } else {
                self.set_reg_allow_switch(Register::PC, pc);
            }
        }
    }
}
