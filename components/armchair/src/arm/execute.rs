// Copyright (c) 2024 Leela Aurelia, git@elia.garden
//
// Unless otherwise noted, this file is released and thus subject to the
// terms of the Mozilla Public License Version 2.0 (MPL-2.0) or the
// GNU General Public License Version 3 (GPL-3).
// If a copy of these licenses was not distributed with this file, you can
// obtain them at https://mozilla.org/MPL/2.0/ and http://www.gnu.org/licenses/.

use common::numutil::NumExt;

use super::decode::*;
use crate::{
    interface::{Bus, CpuVersion},
    memory::{
        access::{NONSEQ, SEQ},
        Address, RelativeOffset,
    },
    misc::{
        alu::{shift_by_imm, shift_by_reg},
        BlockTransfer,
    },
    state::{Flag::*, Mode, Register},
    Cpu,
};

impl<S: Bus> Cpu<'_, S> {
    /// Execute an ARM instruction, if its condition passes.
    pub(crate) fn interpret_arm(&mut self, inst: u32) {
        let inst = ArmInst(inst);
        let cond = inst.condition_code();
        // NV is reused for unconditional instructions on ARMv5
        if !(S::Version::IS_V5 && cond == 0xF) && !self.state.eval_condition(cond) {
            return;
        }

        match inst.decode(S::Version::IS_V5) {
            ArmInstruction::Unknown => self.und_inst(inst),
            ArmInstruction::Swi { comment } => self.software_interrupt(comment),

            ArmInstruction::B { offset, link } => {
                if link {
                    self.state.set_lr(self.state.pc().0.wrapping_sub(4));
                }
                self.relative_jump(offset);
            }
            ArmInstruction::BlxImm { offset } => self.arm_blx_imm(offset),
            ArmInstruction::Bx { m } => {
                let rn = self.state[m];
                self.interwork(rn);
            }
            ArmInstruction::BlxReg { m } => {
                let rn = self.state[m];
                self.state.set_lr(self.state.pc().0.wrapping_sub(4));
                self.interwork(rn);
            }

            ArmInstruction::Alu {
                op,
                s_bit,
                n,
                d,
                operand,
            } => self.arm_alu(op, s_bit, n, d, operand),
            ArmInstruction::Mul {
                op,
                s_bit,
                d,
                n,
                s,
                m,
            } => self.arm_mul(op, s_bit, d, n, s, m),
            ArmInstruction::ShMul {
                op,
                d,
                n,
                s,
                m,
                x_top,
                y_top,
            } => self.arm_sh_mul(op, d, n, s, m, x_top, y_top),
            ArmInstruction::Clz { d, m } => {
                let value = self.state[m].leading_zeros();
                self.set_reg(d, value);
            }
            ArmInstruction::Q { op, d, n, m } => self.arm_q(op, d, n, m),

            ArmInstruction::Mrs { d, spsr } => {
                let psr = if spsr {
                    self.state.spsr()
                } else {
                    self.state.cpsr()
                };
                self.set_reg(d, psr.set_bit(4, true));
            }
            ArmInstruction::Msr {
                src,
                flags,
                ctrl,
                spsr,
            } => self.arm_msr(src, flags, ctrl, spsr),

            ArmInstruction::LdrStr {
                n,
                d,
                offset,
                config,
            } => self.arm_ldrstr(n, d, offset, config),
            ArmInstruction::LdmStm {
                n,
                rlist,
                s_bit,
                config,
            } => self.block_transfer(
                n,
                rlist,
                BlockTransfer {
                    ldr: config.ldr,
                    pre: config.pre,
                    up: config.up,
                    writeback: config.writeback,
                    s_bit,
                },
            ),
            ArmInstruction::Swp { n, d, m, byte } => self.arm_swp(n, d, m, byte),

            ArmInstruction::Mrc(cop) => self.arm_mrc(inst, cop),
            ArmInstruction::Mcr(cop) => self.arm_mcr(inst, cop),
            ArmInstruction::Pld => (),
        }
    }

    fn arm_blx_imm(&mut self, offset: RelativeOffset) {
        let target = self.state.pc().add_rel(offset);
        self.state.set_lr(self.state.pc().0.wrapping_sub(4));
        self.state.set_flag(Thumb, true);
        self.set_pc(target);
    }

    fn arm_alu(&mut self, op: ArmAluOp, s: bool, n: Register, d: Register, operand: ArmAluOperand) {
        let carry = self.state.is_flag(Carry);
        let (a, (b, shifter_carry)) = match operand {
            ArmAluOperand::Immediate { value, rotate } => {
                let b = value.rotate_right(rotate);
                let c = if rotate == 0 { carry } else { b.is_bit(31) };
                (self.state[n], (b, c))
            }
            ArmAluOperand::ShiftedImmediate { m, shift, by } => {
                let rm = self.state[m];
                (self.state[n], shift_by_imm(shift, rm, by, carry))
            }
            ArmAluOperand::ShiftedRegister { m, shift, by } => {
                // The shift amount is read in an extra cycle, which
                // moves PC ahead
                self.idle_nonseq();
                let a = self.state.reg_pc4(n);
                let rm = self.state.reg_pc4(m);
                let by = self.state[by];
                (a, shift_by_reg(shift, rm, by, carry))
            }
        };
        self.alu_inner(op, a, b, carry, shifter_carry, d, s);
    }

    #[allow(clippy::too_many_arguments)]
    fn alu_inner(
        &mut self,
        op: ArmAluOp,
        a: u32,
        b: u32,
        carry: bool,
        shifter_carry: bool,
        d: Register,
        s: bool,
    ) {
        let value = match op {
            ArmAluOp::And | ArmAluOp::Tst => a & b,
            ArmAluOp::Eor | ArmAluOp::Teq => a ^ b,
            ArmAluOp::Sub | ArmAluOp::Cmp => self.sub(s, a, b),
            ArmAluOp::Rsb => self.sub(s, b, a),
            ArmAluOp::Add | ArmAluOp::Cmn => self.add(s, a, b),
            ArmAluOp::Adc => self.adc(s, a, b, carry),
            ArmAluOp::Sbc => self.sbc(s, a, b, carry),
            ArmAluOp::Rsc => self.sbc(s, b, a, carry),
            ArmAluOp::Orr => a | b,
            ArmAluOp::Mov => b,
            ArmAluOp::Bic => a & !b,
            ArmAluOp::Mvn => !b,
        };
        if op.is_logical() {
            self.set_nzc(s, value, shifter_carry);
        }

        if s && d.is_pc() && !matches!(self.state.mode(), Mode::User | Mode::System) {
            // Return from exception: restore CPSR before the jump,
            // so it lands in the right instruction set
            let spsr = self.state.spsr();
            self.state.set_cpsr(spsr);
        }
        if op.should_write() {
            self.set_reg(d, value);
        }
    }

    fn arm_mul(
        &mut self,
        op: ArmMulOp,
        s: bool,
        d: Register,
        n: Register,
        rs: Register,
        m: Register,
    ) {
        let a = self.state[m];
        let b = self.state[rs];
        let acc = self.state[n];

        match op {
            ArmMulOp::Mul | ArmMulOp::Mla => {
                let mut value = a.wrapping_mul(b);
                if op == ArmMulOp::Mla {
                    value = value.wrapping_add(acc);
                    self.tick(1);
                }
                self.set_nz(s, value);
                self.set_reg(d, value);
            }
            _ => {
                let hi_lo = ((self.state[d] as u64) << 32) | acc as u64;
                let signed = (a as i32 as i64).wrapping_mul(b as i32 as i64) as u64;
                let value = match op {
                    ArmMulOp::Umull => (a as u64).wrapping_mul(b as u64),
                    ArmMulOp::Umlal => (a as u64).wrapping_mul(b as u64).wrapping_add(hi_lo),
                    ArmMulOp::Smull => signed,
                    _ => signed.wrapping_add(hi_lo),
                };
                let accumulates = matches!(op, ArmMulOp::Umlal | ArmMulOp::Smlal);
                self.tick(1 + accumulates as u64);
                if s {
                    self.state.set_flag(Neg, value.is_bit(63));
                    self.state.set_flag(Zero, value == 0);
                }
                self.set_reg(n, value as u32);
                self.set_reg(d, (value >> 32) as u32);
            }
        }

        if s && !S::Version::IS_V5 {
            // ARMv4 leaves an unpredictable carry; it reads as cleared
            self.state.set_flag(Carry, false);
        }
        let signed = !matches!(op, ArmMulOp::Umull | ArmMulOp::Umlal);
        self.apply_mul_idle_ticks(b, signed);
    }

    #[allow(clippy::too_many_arguments)]
    fn arm_sh_mul(
        &mut self,
        op: ArmShMulOp,
        d: Register,
        n: Register,
        rs: Register,
        m: Register,
        x_top: bool,
        y_top: bool,
    ) {
        let half = |value: u32, top: bool| {
            if top {
                (value >> 16) as i16 as i32
            } else {
                value as i16 as i32
            }
        };
        let rm = self.state[m];
        let rn = self.state[n];
        let y = half(self.state[rs], y_top);

        match op {
            ArmShMulOp::SmlaXy => {
                let product = half(rm, x_top) * y;
                let (value, overflow) = product.overflowing_add(rn as i32);
                if overflow {
                    self.state.set_flag(QClamped, true);
                }
                self.set_reg(d, value as u32);
            }
            ArmShMulOp::SmlawY => {
                let product = ((rm as i32 as i64 * y as i64) >> 16) as i32;
                let (value, overflow) = product.overflowing_add(rn as i32);
                if overflow {
                    self.state.set_flag(QClamped, true);
                }
                self.set_reg(d, value as u32);
            }
            ArmShMulOp::SmulwY => {
                let product = (rm as i32 as i64 * y as i64) >> 16;
                self.set_reg(d, product as u32);
            }
            ArmShMulOp::SmlalXy => {
                let product = (half(rm, x_top) * y) as i64;
                let acc = (((self.state[d] as u64) << 32) | rn as u64) as i64;
                let value = acc.wrapping_add(product) as u64;
                self.tick(1);
                self.set_reg(n, value as u32);
                self.set_reg(d, (value >> 32) as u32);
            }
            ArmShMulOp::SmulXy => {
                let product = half(rm, x_top) * y;
                self.set_reg(d, product as u32);
            }
        }
    }

    fn arm_q(&mut self, op: ArmQOp, d: Register, n: Register, m: Register) {
        let rm = self.state[m] as i32;
        let rn = self.state[n] as i32;
        let (rn, mut saturated) = match op {
            ArmQOp::QdAdd | ArmQOp::QdSub => (rn.saturating_mul(2), rn.checked_mul(2).is_none()),
            _ => (rn, false),
        };
        let value = match op {
            ArmQOp::Qadd | ArmQOp::QdAdd => {
                saturated |= rm.checked_add(rn).is_none();
                rm.saturating_add(rn)
            }
            ArmQOp::Qsub | ArmQOp::QdSub => {
                saturated |= rm.checked_sub(rn).is_none();
                rm.saturating_sub(rn)
            }
        };
        if saturated {
            self.state.set_flag(QClamped, true);
        }
        self.set_reg(d, value as u32);
    }

    fn arm_msr(&mut self, src: ArmOperandKind, flags: bool, ctrl: bool, spsr: bool) {
        let src = match src {
            ArmOperandKind::Immediate(imm) => imm,
            ArmOperandKind::Register(reg) => self.state[reg],
        };

        let mut dest = if spsr {
            self.state.spsr()
        } else {
            self.state.cpsr()
        };

        if flags {
            dest = (dest & 0x00FF_FFFF) | (src & 0xFF00_0000)
        };
        if ctrl && self.state.mode() != Mode::User {
            dest = (dest & 0xFFFF_FF00) | (src & 0xFF)
        };

        if spsr {
            self.state.set_spsr(dest);
        } else {
            // Thumb flag may not be changed by MSR
            dest = dest.set_bit(5, false);
            self.state.set_cpsr(dest);
        }
    }

    fn arm_ldrstr(
        &mut self,
        n: Register,
        d: Register,
        offset: ArmLdrStrOperandKind,
        config: ArmLdrStrConfig,
    ) {
        let offset = match offset {
            ArmLdrStrOperandKind::Immediate(value) => value,
            ArmLdrStrOperandKind::Register(reg) => self.state[reg],
            ArmLdrStrOperandKind::ShiftedRegister { base, shift, by } => {
                let carry = self.state.is_flag(Carry);
                shift_by_imm(shift, self.state[base], by, carry).0
            }
        };
        let base = Address(self.state[n]);
        let offset_addr = base.add_signed(Address(offset), config.up);
        let addr = if config.pre { offset_addr } else { base };
        let ldr = config.kind.is_ldr();
        let d2 = Register(d.0 + 1);

        match config.kind {
            ArmLdrStrKind::LoadByte => {
                let value = self.read::<u8>(addr, NONSEQ) as u32;
                self.set_reg(d, value);
            }
            ArmLdrStrKind::LoadSignedByte => {
                let value = self.read_byte_ldrsb(addr, NONSEQ);
                self.set_reg(d, value);
            }
            ArmLdrStrKind::LoadHalfword => {
                let value = self.read::<u16>(addr, NONSEQ);
                self.set_reg(d, value);
            }
            ArmLdrStrKind::LoadSignedHalfword => {
                let value = self.read_hword_ldrsh(addr, NONSEQ);
                self.set_reg(d, value);
            }
            ArmLdrStrKind::LoadWord => {
                let value = self.read_word_ldrswp(addr, NONSEQ);
                self.set_reg_allow_switch(d, value);
            }
            ArmLdrStrKind::LoadDoubleWord => {
                let lo = self.read::<u32>(addr, NONSEQ);
                let hi = self.read::<u32>(addr + Address::WORD, SEQ);
                self.set_reg(d, lo);
                self.set_reg(d2, hi);
            }
            ArmLdrStrKind::StoreByte => {
                let value = self.state.reg_pc4(d) as u8;
                self.write::<u8>(addr, value, NONSEQ);
            }
            ArmLdrStrKind::StoreHalfword => {
                let value = self.state.reg_pc4(d) as u16;
                self.write::<u16>(addr, value, NONSEQ);
            }
            ArmLdrStrKind::StoreWord => {
                let value = self.state.reg_pc4(d);
                self.write::<u32>(addr, value, NONSEQ);
            }
            ArmLdrStrKind::StoreDoubleWord => {
                let lo = self.state.reg_pc4(d);
                let hi = self.state.reg_pc4(d2);
                self.write::<u32>(addr, lo, NONSEQ);
                self.write::<u32>(addr + Address::WORD, hi, SEQ);
            }
        }

        // A load into the base register wins over writeback
        let loaded_base =
            ldr && (n == d || (config.kind == ArmLdrStrKind::LoadDoubleWord && n == d2));
        if config.writeback && !loaded_base {
            self.set_reg(n, offset_addr.0);
        }

        if ldr {
            self.idle_nonseq();
        } else {
            self.state.access_type = NONSEQ;
        }
    }

    fn arm_swp(&mut self, n: Register, d: Register, m: Register, byte: bool) {
        let addr = Address(self.state[n]);
        let src = self.state[m];
        if byte {
            let value = self.read::<u8>(addr, NONSEQ) as u32;
            self.write::<u8>(addr, src as u8, NONSEQ);
            self.set_reg(d, value);
        } else {
            let value = self.read_word_ldrswp(addr, NONSEQ);
            self.write::<u32>(addr, src, NONSEQ);
            self.set_reg(d, value);
        }
        self.idle_nonseq();
    }

    fn arm_mrc(&mut self, inst: ArmInst, cop: Coprocessor) {
        if cop.pn != 15 {
            self.und_inst(inst);
            return;
        }
        let value = self.bus.get_cp15(self.state, cop.cn, cop.cm, cop.cp);
        if cop.d.is_pc() {
            // Only the flags are written
            let cpsr = (self.state.cpsr() & 0x0FFF_FFFF) | (value & 0xF000_0000);
            self.state.set_cpsr_flags(cpsr);
        } else {
            self.set_reg(cop.d, value);
        }
    }

    fn arm_mcr(&mut self, inst: ArmInst, cop: Coprocessor) {
        if cop.pn != 15 {
            self.und_inst(inst);
            return;
        }
        let value = self.state.reg_pc4(cop.d);
        self.bus.set_cp15(self.state, cop.cn, cop.cm, cop.cp, value);
    }
}
