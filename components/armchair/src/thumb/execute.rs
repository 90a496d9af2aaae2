// Copyright (c) 2024 Leela Aurelia, git@elia.garden
//
// Unless otherwise noted, this file is released and thus subject to the
// terms of the Mozilla Public License Version 2.0 (MPL-2.0) or the
// GNU General Public License Version 3 (GPL-3).
// If a copy of these licenses was not distributed with this file, you can
// obtain them at https://mozilla.org/MPL/2.0/ and http://www.gnu.org/licenses/.

use super::decode::*;
use crate::{
    interface::{Bus, CpuVersion},
    memory::{access::NONSEQ, Address},
    misc::{
        alu::{shift_by_imm, shift_by_reg, ShiftKind},
        BlockTransfer,
    },
    state::{Flag::*, LowRegister, Register},
    Cpu,
};

impl<S: Bus> Cpu<'_, S> {
    /// Execute a THUMB instruction.
    pub(crate) fn interpret_thumb(&mut self, inst: u16) {
        let inst = ThumbInst(inst);
        match inst.decode(S::Version::IS_V5) {
            ThumbInstruction::Unknown => self.und_inst(inst),

            // THUMB.1/2
            ThumbInstruction::AluImm(op, d, s, imm) => {
                let rs = self.state[s];
                let carry = self.state.is_flag(Carry);
                let value = match op {
                    Thumb1Op::Lsl => self.thumb_shift(ShiftKind::Lsl, rs, imm, carry),
                    Thumb1Op::Lsr => self.thumb_shift(ShiftKind::Lsr, rs, imm, carry),
                    Thumb1Op::Asr => self.thumb_shift(ShiftKind::Asr, rs, imm, carry),
                    Thumb1Op::Add => self.add(true, rs, imm),
                    Thumb1Op::Sub => self.sub(true, rs, imm),
                };
                self.state[d] = value;
            }
            ThumbInstruction::AddSubReg { sub, d, s, n } => {
                let (rs, rn) = (self.state[s], self.state[n]);
                let value = if sub {
                    self.sub(true, rs, rn)
                } else {
                    self.add(true, rs, rn)
                };
                self.state[d] = value;
            }

            // THUMB.3
            ThumbInstruction::Imm8(op, d, imm) => {
                let rd = self.state[d];
                match op {
                    Thumb3Op::Mov => {
                        self.set_nz(true, imm);
                        self.state[d] = imm;
                    }
                    Thumb3Op::Cmp => {
                        self.sub(true, rd, imm);
                    }
                    Thumb3Op::Add => {
                        let value = self.add(true, rd, imm);
                        self.state[d] = value;
                    }
                    Thumb3Op::Sub => {
                        let value = self.sub(true, rd, imm);
                        self.state[d] = value;
                    }
                }
            }

            ThumbInstruction::Alu(op, d, s) => self.thumb_alu(op, d, s),

            // THUMB.5
            ThumbInstruction::HiAdd((s, d)) => {
                let value = self.state[d].wrapping_add(self.state[s]);
                self.set_reg(d, value);
            }
            ThumbInstruction::HiCmp((s, d)) => {
                let (rd, rs) = (self.state[d], self.state[s]);
                self.sub(true, rd, rs);
            }
            ThumbInstruction::HiMov((s, d)) => {
                let value = self.state[s];
                self.set_reg(d, value);
            }
            ThumbInstruction::HiBx { s, blx } => {
                let target = self.state[s];
                if blx {
                    self.state.set_lr(self.state.pc().0.wrapping_sub(2) | 1);
                }
                self.interwork(target);
            }

            // THUMB.6
            ThumbInstruction::LdrPc { d, offset } => {
                let addr = self.state.adj_pc() + offset;
                let value = self.read::<u32>(addr, NONSEQ);
                self.state[d] = value;
                self.idle_nonseq();
            }
            // THUMB.7/8
            ThumbInstruction::LdrStrReg { op, d, b, o } => {
                let addr = Address(self.state[b].wrapping_add(self.state[o]));
                self.thumb_ldrstr(op, d, addr);
            }
            // THUMB.9/10
            ThumbInstruction::LdrStrImm { op, d, b, offset } => {
                let addr = Address(self.state[b]) + offset;
                self.thumb_ldrstr(op, d, addr);
            }
            // THUMB.11
            ThumbInstruction::LdrStrSp { ldr, d, offset } => {
                let addr = Address(self.state.sp()) + offset;
                let op = if ldr {
                    ThumbStrLdrOp::Ldr
                } else {
                    ThumbStrLdrOp::Str
                };
                self.thumb_ldrstr(op, d, addr);
            }

            // THUMB.12
            ThumbInstruction::RelAddr { sp, d, offset } => {
                let base = if sp {
                    Address(self.state.sp())
                } else {
                    self.state.adj_pc()
                };
                self.state[d] = (base + offset).0;
            }
            // THUMB.13
            ThumbInstruction::SpOffs(offset) => {
                let sp = Address(self.state.sp()).add_rel(offset);
                self.state.set_sp(sp.0);
            }

            // THUMB.14
            ThumbInstruction::Push { rlist, lr } => {
                let rlist = rlist as u16 | ((lr as u16) << 14);
                self.block_transfer(
                    Register::SP,
                    rlist,
                    BlockTransfer {
                        ldr: false,
                        pre: true,
                        up: false,
                        writeback: true,
                        s_bit: false,
                    },
                );
            }
            ThumbInstruction::Pop { rlist, pc } => {
                let rlist = rlist as u16 | ((pc as u16) << 15);
                self.block_transfer(
                    Register::SP,
                    rlist,
                    BlockTransfer {
                        ldr: true,
                        pre: false,
                        up: true,
                        writeback: true,
                        s_bit: false,
                    },
                );
            }

            // THUMB.15
            ThumbInstruction::Stmia { b, rlist } => self.thumb_ldmstm(false, b, rlist),
            ThumbInstruction::Ldmia { b, rlist } => self.thumb_ldmstm(true, b, rlist),

            // THUMB.16/17
            ThumbInstruction::BCond { cond, offset } => {
                if self.state.eval_condition(cond) {
                    self.relative_jump(offset);
                }
            }
            ThumbInstruction::Swi { comment } => self.software_interrupt(comment),

            // THUMB.18/19
            ThumbInstruction::B(offset) => self.relative_jump(offset),
            ThumbInstruction::SetLr(offset) => {
                let lr = self.state.pc().add_rel(offset);
                self.state.set_lr(lr.0);
            }
            ThumbInstruction::Bl { offset, thumb } => self.thumb_bl(offset, thumb),
        }
    }

    /// THUMB.1 shift: an immediate of 0 means 32 on LSR/ASR.
    fn thumb_shift(&mut self, kind: ShiftKind, value: u32, by: u32, carry: bool) -> u32 {
        let (value, carry) = shift_by_imm(kind, value, by, carry);
        self.set_nzc(true, value, carry);
        value
    }

    fn thumb_alu(&mut self, op: Thumb4Op, d: LowRegister, s: LowRegister) {
        let rd = self.state[d];
        let rs = self.state[s];
        let carry = self.state.is_flag(Carry);

        let value = match op {
            Thumb4Op::And | Thumb4Op::Tst => {
                let value = rd & rs;
                self.set_nz(true, value);
                value
            }
            Thumb4Op::Eor => {
                let value = rd ^ rs;
                self.set_nz(true, value);
                value
            }
            Thumb4Op::Lsl | Thumb4Op::Lsr | Thumb4Op::Asr | Thumb4Op::Ror => {
                let kind = match op {
                    Thumb4Op::Lsl => ShiftKind::Lsl,
                    Thumb4Op::Lsr => ShiftKind::Lsr,
                    Thumb4Op::Asr => ShiftKind::Asr,
                    _ => ShiftKind::Ror,
                };
                self.idle_nonseq();
                let (value, carry) = shift_by_reg(kind, rd, rs, carry);
                self.set_nzc(true, value, carry);
                value
            }
            Thumb4Op::Adc => self.adc(true, rd, rs, carry),
            Thumb4Op::Sbc => self.sbc(true, rd, rs, carry),
            Thumb4Op::Neg => self.neg(true, rs),
            Thumb4Op::Cmp => self.sub(true, rd, rs),
            Thumb4Op::Cmn => self.add(true, rd, rs),
            Thumb4Op::Orr => {
                let value = rd | rs;
                self.set_nz(true, value);
                value
            }
            Thumb4Op::Mul => {
                self.apply_mul_idle_ticks(rd, true);
                let value = rd.wrapping_mul(rs);
                self.set_nz(true, value);
                if !S::Version::IS_V5 {
                    self.state.set_flag(Carry, false);
                }
                value
            }
            Thumb4Op::Bic => {
                let value = rd & !rs;
                self.set_nz(true, value);
                value
            }
            Thumb4Op::Mvn => {
                let value = !rs;
                self.set_nz(true, value);
                value
            }
        };

        if !matches!(op, Thumb4Op::Tst | Thumb4Op::Cmp | Thumb4Op::Cmn) {
            self.state[d] = value;
        }
    }

    fn thumb_ldrstr(&mut self, op: ThumbStrLdrOp, d: LowRegister, addr: Address) {
        let value = self.state[d];
        let loaded = match op {
            ThumbStrLdrOp::Str => {
                self.write::<u32>(addr, value, NONSEQ);
                None
            }
            ThumbStrLdrOp::Strh => {
                self.write::<u16>(addr, value as u16, NONSEQ);
                None
            }
            ThumbStrLdrOp::Strb => {
                self.write::<u8>(addr, value as u8, NONSEQ);
                None
            }
            ThumbStrLdrOp::Ldsb => Some(self.read_byte_ldrsb(addr, NONSEQ)),
            ThumbStrLdrOp::Ldr => Some(self.read_word_ldrswp(addr, NONSEQ)),
            ThumbStrLdrOp::Ldrh => Some(self.read::<u16>(addr, NONSEQ)),
            ThumbStrLdrOp::Ldrb => Some(self.read::<u8>(addr, NONSEQ) as u32),
            ThumbStrLdrOp::Ldsh => Some(self.read_hword_ldrsh(addr, NONSEQ)),
        };

        match loaded {
            Some(value) => {
                self.state[d] = value;
                self.idle_nonseq();
            }
            None => self.state.access_type = NONSEQ,
        }
    }

    fn thumb_ldmstm(&mut self, ldr: bool, b: LowRegister, rlist: u8) {
        self.block_transfer(
            b.into(),
            rlist as u16,
            BlockTransfer {
                ldr,
                pre: false,
                up: true,
                writeback: true,
                s_bit: false,
            },
        );
    }

    /// Second half of BL/BLX: jump relative to the upper half
    /// stored in LR, leaving the return address in LR.
    fn thumb_bl(&mut self, offset: Address, thumb: bool) {
        let target = Address(self.state.lr()) + offset;
        self.state.set_lr(self.state.pc().0.wrapping_sub(2) | 1);
        if thumb {
            self.set_pc(target);
        } else {
            self.state.set_flag(Thumb, false);
            self.set_pc(target.align(4));
        }
    }
}
