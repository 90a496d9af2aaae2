// Copyright (c) 2024 Leela Aurelia, git@elia.garden
//
// Unless otherwise noted, this file is released and thus subject to the
// terms of the Mozilla Public License Version 2.0 (MPL-2.0) or the
// GNU General Public License Version 3 (GPL-3).
// If a copy of these licenses was not distributed with this file, you can
// obtain them at https://mozilla.org/MPL/2.0/ and http://www.gnu.org/licenses/.

use core::{
    fmt::Display,
    ops::{Index, IndexMut, Range},
};

use bitmatch::bitmatch;
use common::{numutil::NumExt, Time};

use crate::{
    interface::{Bus, CpuVersion},
    memory::{
        access::{CODE, NONSEQ, SEQ},
        Access, Address,
    },
    Cpu,
};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct LowRegister(pub u16);

impl LowRegister {
    pub fn all() -> impl DoubleEndedIterator<Item = LowRegister> {
        Self::range(0..8)
    }

    pub fn from_rlist(rlist: u8) -> impl DoubleEndedIterator<Item = LowRegister> {
        Self::all().filter(move |r| rlist.is_bit(r.0))
    }

    pub fn range(range: Range<u16>) -> impl DoubleEndedIterator<Item = LowRegister> {
        range.map(Self)
    }
}

impl Display for LowRegister {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "r{}", self.0)
    }
}

impl From<LowRegister> for Register {
    fn from(value: LowRegister) -> Self {
        Register(value.0)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Register(pub u16);

impl Register {
    pub const SP: Register = Register(13);
    pub const LR: Register = Register(14);
    pub const PC: Register = Register(15);

    pub fn is_pc(&self) -> bool {
        self.0 == 15
    }

    pub fn from_rlist(rlist: u16) -> impl DoubleEndedIterator<Item = Register> {
        (0..16).map(Self).filter(move |r| rlist.is_bit(r.0))
    }
}

impl Display for Register {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self.0 {
            15 => write!(f, "pc"),
            14 => write!(f, "lr"),
            13 => write!(f, "sp"),
            r => write!(f, "r{r}"),
        }
    }
}

/// A register with values for FIQ and all other modes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct FiqReg {
    pub reg: u32,
    pub fiq: u32,
}

/// A register with different values for the different CPU modes,
/// indexed by [Mode::bank].
type ModeReg = [u32; 6];

/// Where a register of a given mode is stored right now.
/// The registers of the current mode are always in the active set;
/// other modes' copies live in their banks.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RegSlot {
    Active(usize),
    Fiq { idx: usize, fiq: bool },
    Sp(usize),
    Lr(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct CpuState {
    // Registers
    pub registers: [u32; 16],
    fiqs: [FiqReg; 5],
    sp: ModeReg,
    lr: ModeReg,
    cpsr: u32,
    spsr: ModeReg,

    // Pipeline + Memory
    pipeline: [u32; 2],
    pipeline_valid: bool,
    pub access_type: Access,

    pub is_halted: bool,
}

impl CpuState {
    #[inline]
    pub fn sp(&self) -> u32 {
        self.registers[13]
    }

    #[inline]
    pub fn lr(&self) -> u32 {
        self.registers[14]
    }

    #[inline]
    pub fn pc(&self) -> Address {
        Address(self.registers[15])
    }

    #[inline]
    pub fn cpsr(&self) -> u32 {
        self.cpsr
    }

    #[inline]
    pub fn set_sp(&mut self, value: u32) {
        self.registers[13] = value;
    }

    #[inline]
    pub fn set_lr(&mut self, value: u32) {
        self.registers[14] = value;
    }

    /// Get the 'adjusted' value of the PC that some instructions need.
    #[inline]
    pub(crate) fn adj_pc(&self) -> Address {
        Address(self.registers[15] & !2)
    }

    #[inline]
    pub(crate) fn bump_pc(&mut self, count: u32) -> Address {
        self.registers[15] = self.registers[15].wrapping_add(count);
        Address(self.registers[15])
    }

    /// Get a register's value as seen by instructions that read it one
    /// cycle late, like stores and register-specified shifts:
    /// PC reads 4 further ahead than usual.
    pub(crate) fn reg_pc4(&self, reg: Register) -> u32 {
        if reg.is_pc() {
            self.registers[15].wrapping_add(4)
        } else {
            self.registers[reg.0.us()]
        }
    }

    /// Offset of the value read from PC relative to the address of the
    /// executing instruction: two instructions ahead.
    pub fn pipeline_offset(&self) -> u32 {
        self.current_instruction_size() * 2
    }

    /// Address of the instruction that will execute next.
    pub fn next_instruction_address(&self) -> Address {
        self.pc() - Address(self.current_instruction_size())
    }

    /// Point the CPU at `addr` in the current instruction set,
    /// without charging pipeline refill cycles.
    /// Used when booting.
    pub fn start_at(&mut self, addr: Address) {
        let size = self.current_instruction_size();
        self.registers[15] = addr.align(size).0.wrapping_add(size);
        self.invalidate_pipeline();
        self.access_type = NONSEQ;
    }

    #[inline]
    pub fn is_flag(&self, flag: Flag) -> bool {
        self.cpsr.is_bit(flag as u16)
    }

    #[inline]
    pub fn set_flag(&mut self, flag: Flag, en: bool) {
        self.cpsr = self.cpsr.set_bit(flag as u16, en);
    }

    /// Get the current CPU mode.
    pub fn mode(&self) -> Mode {
        Mode::get(self.cpsr & 0x1F)
    }

    /// Set the mode bits inside CPSR.
    pub fn set_mode(&mut self, ctx: Mode) {
        self.set_cpsr((self.cpsr & !0x1F) | ctx.to_u32());
    }

    /// Set the CPSR. This may only change flags; mode changes will not be
    /// handled.
    pub(crate) fn set_cpsr_flags(&mut self, value: u32) {
        self.cpsr = value;
    }

    /// Set the CPSR. Needs to consider mode switches, in which case
    /// the active registers are swapped with the new mode's banks.
    pub fn set_cpsr(&mut self, value: u32) {
        let old = self.mode();
        for reg in 8..=12 {
            if old == Mode::Fiq {
                self.fiqs[reg - 8].fiq = self.registers[reg];
            } else {
                self.fiqs[reg - 8].reg = self.registers[reg];
            }
        }
        self.sp[old.bank()] = self.registers[13];
        self.lr[old.bank()] = self.registers[14];

        self.cpsr = value;

        let new = self.mode();
        for reg in 8..=12 {
            self.registers[reg] = if new == Mode::Fiq {
                self.fiqs[reg - 8].fiq
            } else {
                self.fiqs[reg - 8].reg
            };
        }
        self.registers[13] = self.sp[new.bank()];
        self.registers[14] = self.lr[new.bank()];
    }

    /// Saved status register of the current mode.
    /// User and system mode have none, reading CPSR instead.
    pub fn spsr(&self) -> u32 {
        match self.mode() {
            Mode::User | Mode::System => self.cpsr,
            mode => self.spsr[mode.bank()],
        }
    }

    /// Set the saved status register of the current mode.
    /// Ignored in user and system mode.
    pub fn set_spsr(&mut self, value: u32) {
        match self.mode() {
            Mode::User | Mode::System => (),
            mode => self.spsr[mode.bank()] = value,
        }
    }

    /// Find where the given register of the given mode is stored.
    pub fn resolve(&self, mode: Mode, reg: Register) -> RegSlot {
        let current = self.mode();
        match reg.0 {
            8..=12 if (mode == Mode::Fiq) != (current == Mode::Fiq) => RegSlot::Fiq {
                idx: reg.0.us() - 8,
                fiq: mode == Mode::Fiq,
            },
            13 if mode.bank() != current.bank() => RegSlot::Sp(mode.bank()),
            14 if mode.bank() != current.bank() => RegSlot::Lr(mode.bank()),
            r => RegSlot::Active(r.us()),
        }
    }

    pub fn slot(&self, slot: RegSlot) -> u32 {
        match slot {
            RegSlot::Active(r) => self.registers[r],
            RegSlot::Fiq { idx, fiq: true } => self.fiqs[idx].fiq,
            RegSlot::Fiq { idx, fiq: false } => self.fiqs[idx].reg,
            RegSlot::Sp(bank) => self.sp[bank],
            RegSlot::Lr(bank) => self.lr[bank],
        }
    }

    pub fn slot_mut(&mut self, slot: RegSlot) -> &mut u32 {
        match slot {
            RegSlot::Active(r) => &mut self.registers[r],
            RegSlot::Fiq { idx, fiq: true } => &mut self.fiqs[idx].fiq,
            RegSlot::Fiq { idx, fiq: false } => &mut self.fiqs[idx].reg,
            RegSlot::Sp(bank) => &mut self.sp[bank],
            RegSlot::Lr(bank) => &mut self.lr[bank],
        }
    }

    /// Read a register as another mode would see it.
    pub fn reg_in_mode(&self, mode: Mode, reg: Register) -> u32 {
        self.slot(self.resolve(mode, reg))
    }

    /// Write a register as another mode would see it.
    /// Does not handle writes to PC specially.
    pub fn set_reg_in_mode(&mut self, mode: Mode, reg: Register, value: u32) {
        let slot = self.resolve(mode, reg);
        *self.slot_mut(slot) = value;
    }

    /// Evaluate a condition encoded into an instruction.
    pub(crate) fn eval_condition(&self, cond: u16) -> bool {
        // This condition table is taken from mGBA sources, which are licensed under
        // MPL2 at https://github.com/mgba-emu/mgba
        // Thank you to endrift and other mGBA contributors!
        const COND_MASKS: [u16; 16] = [
            0xF0F0, // EQ [-Z--]
            0x0F0F, // NE [-z--]
            0xCCCC, // CS [--C-]
            0x3333, // CC [--c-]
            0xFF00, // MI [N---]
            0x00FF, // PL [n---]
            0xAAAA, // VS [---V]
            0x5555, // VC [---v]
            0x0C0C, // HI [-zC-]
            0xF3F3, // LS [-Z--] || [--c-]
            0xAA55, // GE [N--V] || [n--v]
            0x55AA, // LT [N--v] || [n--V]
            0x0A05, // GT [Nz-V] || [nz-v]
            0xF5FA, // LE [-Z--] || [Nz-v] || [nz-V]
            0xFFFF, // AL [----]
            0x0000, // NV
        ];

        let flags = self.cpsr >> 28;
        (COND_MASKS[cond.us()] & (1 << flags)) != 0
    }

    pub fn current_instruction_size(&self) -> u32 {
        // 4 on ARM, 2 on THUMB
        4 - ((self.is_flag(Flag::Thumb) as u32) << 1)
    }
}

impl CpuState {
    pub(crate) fn invalidate_pipeline(&mut self) {
        self.pipeline_valid = false;
    }

    pub(crate) fn advance_pipeline(&mut self, next: u32) -> u32 {
        let inst = self.pipeline[0];
        self.pipeline[0] = self.pipeline[1];
        self.pipeline[1] = next;
        self.access_type = SEQ;
        inst
    }
}

impl Default for CpuState {
    fn default() -> Self {
        Self {
            registers: [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 4],
            fiqs: Default::default(),
            sp: Default::default(),
            lr: Default::default(),
            cpsr: 0xD3,
            spsr: Default::default(),
            pipeline: Default::default(),
            pipeline_valid: false,
            access_type: NONSEQ,
            is_halted: false,
        }
    }
}

impl<S: Bus> Cpu<'_, S> {
    /// Set the PC. Needs special behavior to fake the pipeline.
    pub(crate) fn set_pc(&mut self, val: Address) {
        // Align to 2/4 depending on mode
        let size = self.state.current_instruction_size();
        self.state.registers[15] = val.align(size).0;
        self.pipeline_stall();
    }

    /// Emulate a pipeline stall / fill; used when PC changes.
    fn pipeline_stall(&mut self) {
        if self.state.is_flag(Flag::Thumb) {
            self.stall_access::<u16>(NONSEQ | CODE);
            self.state.bump_pc(2);
            self.stall_access::<u16>(SEQ | CODE);
        } else {
            self.stall_access::<u32>(NONSEQ | CODE);
            self.state.bump_pc(4);
            self.stall_access::<u32>(SEQ | CODE);
        };
        self.state.invalidate_pipeline();
        self.state.access_type = SEQ;
    }

    fn stall_access<T: crate::interface::RwType>(&mut self, access: Access) {
        let pc = self.state.pc();
        let time = self.bus.wait_time::<T>(self.state, pc, access);
        self.tick(time as Time);
    }

    /// Update the pipeline to be valid again, without wait states or actual
    /// reads
    pub(crate) fn revalidate_pipeline(&mut self) {
        if self.state.pipeline_valid {
            return;
        }
        let pc = self.state.pc();
        self.state.pipeline = if self.state.is_flag(Flag::Thumb) {
            [
                self.bus.get::<u16>(self.state, pc - Address::HW).u32(),
                self.bus.get::<u16>(self.state, pc).u32(),
            ]
        } else {
            [
                self.bus.get::<u32>(self.state, pc - Address::WORD),
                self.bus.get::<u32>(self.state, pc),
            ]
        };
        self.state.pipeline_valid = true;
    }

    /// Set a register. Needs special behavior due to PC.
    pub(crate) fn set_reg(&mut self, reg: Register, val: u32) {
        if reg.is_pc() {
            self.set_pc(Address(val));
        } else {
            self.state.registers[reg.0.us()] = val;
        }
    }

    /// Set a register. Needs special behavior due to PC.
    /// Additionally allows a switch to THUMB when setting PC on ARMv5.
    pub(crate) fn set_reg_allow_switch(&mut self, reg: Register, val: u32) {
        if reg.is_pc() {
            if S::Version::IS_V5 {
                self.state.set_flag(Flag::Thumb, val.is_bit(0));
            }
            self.set_pc(Address(val));
        } else {
            self.state.registers[reg.0.us()] = val;
        }
    }

    /// Branch and exchange: switch instruction set depending on bit 0.
    pub(crate) fn interwork(&mut self, val: u32) {
        self.state.set_flag(Flag::Thumb, val.is_bit(0));
        self.set_pc(Address(val));
    }
}

/// Execution context of the CPU.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Mode {
    User,
    Fiq,
    Supervisor,
    Abort,
    Irq,
    Undefined,
    System,
}

impl Mode {
    /// Decode the mode bits of CPSR. Unused encodings behave like user mode.
    #[bitmatch]
    pub fn get(n: u32) -> Self {
        #[bitmatch]
        match n & 0x1F {
            "0??00" => Self::User,
            "0??01" => Self::Fiq,
            "0??10" => Self::Irq,
            "0??11" => Self::Supervisor,
            "10000" => Self::User,
            "10001" => Self::Fiq,
            "10010" => Self::Irq,
            "10011" => Self::Supervisor,
            "10111" => Self::Abort,
            "11011" => Self::Undefined,
            "11111" => Self::System,
            _ => Self::User,
        }
    }

    pub fn to_u32(self) -> u32 {
        match self {
            Self::User => 0b10000,
            Self::Fiq => 0b10001,
            Self::Irq => 0b10010,
            Self::Supervisor => 0b10011,
            Self::Abort => 0b10111,
            Self::Undefined => 0b11011,
            Self::System => 0b11111,
        }
    }

    /// Index of this mode's SP/LR/SPSR bank.
    /// User and system mode share one.
    pub fn bank(self) -> usize {
        match self {
            Self::User | Self::System => 0,
            Self::Fiq => 1,
            Self::Supervisor => 2,
            Self::Abort => 3,
            Self::Irq => 4,
            Self::Undefined => 5,
        }
    }
}

/// Flags inside CPSR.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Flag {
    Neg = 31,
    Zero = 30,
    Carry = 29,
    Overflow = 28,
    QClamped = 27,
    IrqDisable = 7,
    FiqDisable = 6,
    Thumb = 5,
}

impl Index<LowRegister> for CpuState {
    type Output = u32;

    fn index(&self, index: LowRegister) -> &Self::Output {
        &self.registers[index.0.us()]
    }
}

impl IndexMut<LowRegister> for CpuState {
    fn index_mut(&mut self, index: LowRegister) -> &mut Self::Output {
        &mut self.registers[index.0.us()]
    }
}

impl Index<Register> for CpuState {
    type Output = u32;

    fn index(&self, index: Register) -> &Self::Output {
        &self.registers[index.0.us()]
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn banks_swap_on_mode_change() {
        let mut state = CpuState::default();
        assert_eq!(state.mode(), Mode::Supervisor);
        state.registers[8] = 8;
        state.set_sp(0x100);
        state.set_lr(0x200);

        state.set_mode(Mode::Fiq);
        assert_eq!(state.registers[8], 0);
        assert_eq!(state.sp(), 0);
        state.registers[8] = 88;
        state.set_sp(0x300);

        state.set_mode(Mode::Supervisor);
        assert_eq!(state.registers[8], 8);
        assert_eq!(state.sp(), 0x100);
        assert_eq!(state.lr(), 0x200);
        assert_eq!(state.reg_in_mode(Mode::Fiq, Register(8)), 88);
        assert_eq!(state.reg_in_mode(Mode::Fiq, Register::SP), 0x300);
    }

    #[test]
    fn user_and_system_share_bank() {
        let mut state = CpuState::default();
        state.set_mode(Mode::System);
        state.set_sp(0x0380_FF00);
        state.set_mode(Mode::User);
        assert_eq!(state.sp(), 0x0380_FF00);
    }

    #[test]
    fn resolve_slots() {
        let mut state = CpuState::default();
        assert_eq!(state.resolve(Mode::Supervisor, Register::SP), RegSlot::Active(13));
        assert_eq!(state.resolve(Mode::Irq, Register::SP), RegSlot::Sp(4));
        assert_eq!(state.resolve(Mode::User, Register::LR), RegSlot::Lr(0));
        assert_eq!(state.resolve(Mode::Irq, Register(9)), RegSlot::Active(9));
        assert_eq!(
            state.resolve(Mode::Fiq, Register(9)),
            RegSlot::Fiq { idx: 1, fiq: true }
        );
        assert_eq!(state.resolve(Mode::Fiq, Register::PC), RegSlot::Active(15));

        state.set_reg_in_mode(Mode::Irq, Register::SP, 0x0380_FFA0);
        state.set_mode(Mode::Irq);
        assert_eq!(state.sp(), 0x0380_FFA0);
    }

    #[test]
    fn spsr_in_user_modes_is_cpsr() {
        let mut state = CpuState::default();
        state.set_spsr(0x1234_5610);
        assert_eq!(state.spsr(), 0x1234_5610);

        state.set_mode(Mode::System);
        state.set_spsr(0xFFFF_FFFF);
        assert_eq!(state.spsr(), state.cpsr());
        state.set_mode(Mode::Supervisor);
        assert_eq!(state.spsr(), 0x1234_5610);
    }

    #[test]
    fn invalid_mode_bits_do_not_panic() {
        assert_eq!(Mode::get(0b10100), Mode::User);
        assert_eq!(Mode::get(0b11011), Mode::Undefined);
    }

    #[test]
    fn conditions() {
        let mut state = CpuState::default();
        state.set_flag(Flag::Zero, true);
        assert!(state.eval_condition(0x0));
        assert!(!state.eval_condition(0x1));
        assert!(state.eval_condition(0xE));
        assert!(!state.eval_condition(0xF));
        state.set_flag(Flag::Neg, true);
        assert!(state.eval_condition(0xB)); // LT: N != V
    }

    #[test]
    fn start_at_sets_pipeline_pc() {
        let mut state = CpuState::default();
        state.start_at(Address(0x0200_0000));
        assert_eq!(state.pc(), Address(0x0200_0004));
        assert_eq!(state.next_instruction_address(), Address(0x0200_0000));
        assert_eq!(state.pipeline_offset(), 8);

        state.set_flag(Flag::Thumb, true);
        state.start_at(Address(0x0200_0101));
        assert_eq!(state.pc(), Address(0x0200_0102));
        assert_eq!(state.pipeline_offset(), 4);
    }
}
