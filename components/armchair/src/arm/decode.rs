// Copyright (c) 2024 Leela Aurelia, git@elia.garden
//
// Unless otherwise noted, this file is released and thus subject to the
// terms of the Mozilla Public License Version 2.0 (MPL-2.0) or the
// GNU General Public License Version 3 (GPL-3).
// If a copy of these licenses was not distributed with this file, you can
// obtain them at https://mozilla.org/MPL/2.0/ and http://www.gnu.org/licenses/.

use core::{fmt::UpperHex, ops::RangeInclusive};

use bitmatch::bitmatch;
use common::numutil::{NumExt, U32Ext};
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;

use crate::{memory::RelativeOffset, misc::alu::ShiftKind, state::Register};

/// A raw ARM instruction.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ArmInst(pub u32);

impl ArmInst {
    pub fn reg(self, idx: u32) -> Register {
        Register(self.0.bits(idx, 4) as u16)
    }

    pub fn is_bit(self, bit: u16) -> bool {
        self.0.is_bit(bit)
    }

    pub fn condition_code(self) -> u16 {
        (self.0 >> 28) as u16
    }

    #[inline]
    const fn bits(self, range: RangeInclusive<u32>) -> u32 {
        (self.0 >> *range.start()) & ((1 << ((*range.end() - *range.start()) + 1)) - 1)
    }

    fn shift_kind(self) -> ShiftKind {
        // 2 bits always map to a variant
        ShiftKind::from_u32(self.bits(5..=6)).unwrap_or(ShiftKind::Lsl)
    }

    fn alu_op(self) -> ArmAluOp {
        // 4 bits always map to a variant
        ArmAluOp::from_u32(self.bits(21..=24)).unwrap_or(ArmAluOp::And)
    }

    fn ldrstr_config(self, kind: ArmLdrStrKind) -> ArmLdrStrConfig {
        let pre = self.is_bit(24);
        ArmLdrStrConfig {
            pre,
            up: self.is_bit(23),
            kind,
            // Post-indexed transfers always write back
            writeback: self.is_bit(21) || !pre,
        }
    }

    fn ldrstr_shift_reg(self) -> ArmLdrStrOperandKind {
        ArmLdrStrOperandKind::ShiftedRegister {
            base: self.reg(0),
            shift: self.shift_kind(),
            by: self.bits(7..=11),
        }
    }

    fn ldrstr_halfword_offset(self) -> ArmLdrStrOperandKind {
        if self.is_bit(22) {
            ArmLdrStrOperandKind::Immediate(self.0 & 0xF | ((self.0 >> 4) & 0xF0))
        } else {
            ArmLdrStrOperandKind::Register(self.reg(0))
        }
    }

    fn psr_fields(self) -> (bool, bool, bool) {
        (self.is_bit(19), self.is_bit(16), self.is_bit(22))
    }

    fn coprocessor(self) -> Coprocessor {
        Coprocessor {
            opc: self.bits(21..=23),
            cn: self.bits(16..=19),
            d: self.reg(12),
            pn: self.bits(8..=11),
            cp: self.bits(5..=7),
            cm: self.bits(0..=3),
        }
    }

    /// Decode this instruction. Encodings only valid on ARMv5 decode as
    /// unknown when `is_v5` is unset.
    #[bitmatch]
    pub fn decode(self, is_v5: bool) -> ArmInstruction {
        if is_v5 && self.condition_code() == 0xF {
            return self.decode_unconditional();
        }

        let i = self;
        let v5 = |inst: ArmInstruction| {
            if is_v5 {
                inst
            } else {
                ArmInstruction::Unknown
            }
        };

        #[bitmatch]
        match arm_inst_to_lookup_idx(self.0) {
            // Branch and Branch with Link (B, BL, BX, BLX, SWI)
            "101?????_????" => ArmInstruction::B {
                offset: RelativeOffset(i.0.i24() * 4),
                link: i.is_bit(24),
            },
            "1111????_????" => ArmInstruction::Swi {
                comment: i.bits(16..=23) as u8,
            },

            // Coprocessor Register Transfers (MRC, MCR)
            "1110???1_???1" => v5(ArmInstruction::Mrc(i.coprocessor())),
            "1110???0_???1" => v5(ArmInstruction::Mcr(i.coprocessor())),

            // Multiply and Multiply-Accumulate (MUL, MLA, xMULL, xMLAL)
            "0000????_1001" => match i.bits(21..=23) {
                0 => i.mul(ArmMulOp::Mul),
                1 => i.mul(ArmMulOp::Mla),
                4 => i.mul(ArmMulOp::Umull),
                5 => i.mul(ArmMulOp::Umlal),
                6 => i.mul(ArmMulOp::Smull),
                7 => i.mul(ArmMulOp::Smlal),
                _ => ArmInstruction::Unknown,
            },

            // Memory: Single Data Swap (SWP)
            "00010?00_1001" => ArmInstruction::Swp {
                n: i.reg(16),
                d: i.reg(12),
                m: i.reg(0),
                byte: i.is_bit(22),
            },

            // Halfword Multiples
            "00010??0_1??0" => {
                let op = match i.bits(21..=22) {
                    0 => ArmShMulOp::SmlaXy,
                    1 if i.is_bit(5) => ArmShMulOp::SmulwY,
                    1 => ArmShMulOp::SmlawY,
                    2 => ArmShMulOp::SmlalXy,
                    _ => ArmShMulOp::SmulXy,
                };
                v5(ArmInstruction::ShMul {
                    op,
                    d: i.reg(16),
                    n: i.reg(12),
                    s: i.reg(8),
                    m: i.reg(0),
                    x_top: i.is_bit(5),
                    y_top: i.is_bit(6),
                })
            }

            "00010010_0001" => ArmInstruction::Bx { m: i.reg(0) },
            "00010010_0011" => v5(ArmInstruction::BlxReg { m: i.reg(0) }),

            // Special ARM9 Instructions (CLZ, QADD/QSUB)
            "00010110_0001" => v5(ArmInstruction::Clz {
                d: i.reg(12),
                m: i.reg(0),
            }),
            "00010??0_0101" => {
                let op = match i.bits(21..=22) {
                    0 => ArmQOp::Qadd,
                    1 => ArmQOp::Qsub,
                    2 => ArmQOp::QdAdd,
                    _ => ArmQOp::QdSub,
                };
                v5(ArmInstruction::Q {
                    op,
                    d: i.reg(12),
                    n: i.reg(16),
                    m: i.reg(0),
                })
            }

            // PSR Transfer (MRS, MSR)
            "00010?00_0000" => ArmInstruction::Mrs {
                d: i.reg(12),
                spsr: i.is_bit(22),
            },
            "00010?10_0000" => {
                let (flags, ctrl, spsr) = i.psr_fields();
                ArmInstruction::Msr {
                    src: ArmOperandKind::Register(i.reg(0)),
                    flags,
                    ctrl,
                    spsr,
                }
            }
            "00110?10_????" => {
                let (flags, ctrl, spsr) = i.psr_fields();
                ArmInstruction::Msr {
                    src: ArmOperandKind::Immediate(
                        (i.0 & 0xFF).rotate_right(i.bits(8..=11) << 1),
                    ),
                    flags,
                    ctrl,
                    spsr,
                }
            }

            // Memory: Halfword, Doubleword, and Signed Data Transfer
            "000?????_1??1" => {
                let kind = match (i.is_bit(20), i.bits(5..=6)) {
                    (true, 1) => ArmLdrStrKind::LoadHalfword,
                    (true, 2) => ArmLdrStrKind::LoadSignedByte,
                    (true, 3) => ArmLdrStrKind::LoadSignedHalfword,
                    (false, 1) => ArmLdrStrKind::StoreHalfword,
                    // Doubleword transfers need an even register pair
                    (false, 2) if is_v5 && !i.is_bit(12) => ArmLdrStrKind::LoadDoubleWord,
                    (false, 3) if is_v5 && !i.is_bit(12) => ArmLdrStrKind::StoreDoubleWord,
                    _ => return ArmInstruction::Unknown,
                };
                ArmInstruction::LdrStr {
                    n: i.reg(16),
                    d: i.reg(12),
                    offset: i.ldrstr_halfword_offset(),
                    config: i.ldrstr_config(kind),
                }
            }

            "00010??0_????" => ArmInstruction::Unknown,

            // Data Processing (ALU)
            "000?????_???0" => i.alu(ArmAluOperand::ShiftedImmediate {
                m: i.reg(0),
                shift: i.shift_kind(),
                by: i.bits(7..=11),
            }),
            "000?????_0??1" => i.alu(ArmAluOperand::ShiftedRegister {
                m: i.reg(0),
                shift: i.shift_kind(),
                by: i.reg(8),
            }),
            "00110?00_????" => ArmInstruction::Unknown,
            "001?????_????" => i.alu(ArmAluOperand::Immediate {
                value: i.0 & 0xFF,
                rotate: i.bits(8..=11) << 1,
            }),

            // Memory: Single Data Transfer (LDR, STR)
            "011?????_???1" => ArmInstruction::Unknown,
            "01??????_????" => {
                let kind = match (i.is_bit(20), i.is_bit(22)) {
                    (true, true) => ArmLdrStrKind::LoadByte,
                    (true, false) => ArmLdrStrKind::LoadWord,
                    (false, true) => ArmLdrStrKind::StoreByte,
                    (false, false) => ArmLdrStrKind::StoreWord,
                };
                let offset = if i.is_bit(25) {
                    i.ldrstr_shift_reg()
                } else {
                    ArmLdrStrOperandKind::Immediate(i.0 & 0xFFF)
                };
                ArmInstruction::LdrStr {
                    n: i.reg(16),
                    d: i.reg(12),
                    offset,
                    config: i.ldrstr_config(kind),
                }
            }

            // Memory: Block Data Transfer (LDM, STM)
            "100?????_????" => ArmInstruction::LdmStm {
                n: i.reg(16),
                rlist: i.0 as u16,
                s_bit: i.is_bit(22),
                config: ArmLdmStmConfig {
                    pre: i.is_bit(24),
                    up: i.is_bit(23),
                    ldr: i.is_bit(20),
                    writeback: i.is_bit(21),
                },
            },

            _ => ArmInstruction::Unknown,
        }
    }

    /// Instructions with the NV condition on ARMv5.
    fn decode_unconditional(self) -> ArmInstruction {
        if self.bits(25..=27) == 0b101 {
            // BLX, the H bit adds a halfword to the offset
            let offset = (self.0.i24() << 2) + ((self.is_bit(24) as i32) << 1);
            ArmInstruction::BlxImm {
                offset: RelativeOffset(offset),
            }
        } else if (self.0 & 0x0D70_F000) == 0x0550_F000 {
            ArmInstruction::Pld
        } else {
            ArmInstruction::Unknown
        }
    }

    fn mul(self, op: ArmMulOp) -> ArmInstruction {
        ArmInstruction::Mul {
            op,
            s_bit: self.is_bit(20),
            d: self.reg(16),
            n: self.reg(12),
            s: self.reg(8),
            m: self.reg(0),
        }
    }

    fn alu(self, operand: ArmAluOperand) -> ArmInstruction {
        ArmInstruction::Alu {
            op: self.alu_op(),
            s_bit: self.is_bit(20),
            n: self.reg(16),
            d: self.reg(12),
            operand,
        }
    }
}

impl UpperHex for ArmInst {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        UpperHex::fmt(&self.0, f)
    }
}

/// A decoded ARM instruction.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ArmInstruction {
    Unknown,
    Swi {
        comment: u8,
    },
    B {
        offset: RelativeOffset,
        link: bool,
    },
    BlxImm {
        offset: RelativeOffset,
    },
    Bx {
        m: Register,
    },
    BlxReg {
        m: Register,
    },
    Alu {
        op: ArmAluOp,
        s_bit: bool,
        n: Register,
        d: Register,
        operand: ArmAluOperand,
    },
    /// For long multiplies, `d` is the high and `n` the low word.
    Mul {
        op: ArmMulOp,
        s_bit: bool,
        d: Register,
        n: Register,
        s: Register,
        m: Register,
    },
    ShMul {
        op: ArmShMulOp,
        d: Register,
        n: Register,
        s: Register,
        m: Register,
        x_top: bool,
        y_top: bool,
    },
    Clz {
        d: Register,
        m: Register,
    },
    Q {
        op: ArmQOp,
        d: Register,
        n: Register,
        m: Register,
    },
    Mrs {
        d: Register,
        spsr: bool,
    },
    Msr {
        src: ArmOperandKind,
        flags: bool,
        ctrl: bool,
        spsr: bool,
    },
    LdrStr {
        n: Register,
        d: Register,
        offset: ArmLdrStrOperandKind,
        config: ArmLdrStrConfig,
    },
    LdmStm {
        n: Register,
        rlist: u16,
        s_bit: bool,
        config: ArmLdmStmConfig,
    },
    Swp {
        n: Register,
        d: Register,
        m: Register,
        byte: bool,
    },
    Mrc(Coprocessor),
    Mcr(Coprocessor),
    Pld,
}

#[derive(FromPrimitive, Copy, Clone, Debug, PartialEq, Eq, PartialOrd)]
pub enum ArmAluOp {
    And,
    Eor,
    Sub,
    Rsb,
    Add,
    Adc,
    Sbc,
    Rsc,
    Tst,
    Teq,
    Cmp,
    Cmn,
    Orr,
    Mov,
    Bic,
    Mvn,
}

impl ArmAluOp {
    pub fn should_write(self) -> bool {
        self < Self::Tst || self > Self::Cmn
    }

    /// Operations whose carry comes from the shifter instead of the adder.
    pub fn is_logical(self) -> bool {
        matches!(
            self,
            Self::And
                | Self::Eor
                | Self::Tst
                | Self::Teq
                | Self::Orr
                | Self::Mov
                | Self::Bic
                | Self::Mvn
        )
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ArmAluOperand {
    /// 8-bit immediate, rotated right by an even amount.
    Immediate { value: u32, rotate: u32 },
    ShiftedImmediate {
        m: Register,
        shift: ShiftKind,
        by: u32,
    },
    ShiftedRegister {
        m: Register,
        shift: ShiftKind,
        by: Register,
    },
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ArmOperandKind {
    Immediate(u32),
    Register(Register),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ArmLdrStrOperandKind {
    Immediate(u32),
    Register(Register),
    ShiftedRegister {
        base: Register,
        shift: ShiftKind,
        by: u32,
    },
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ArmMulOp {
    Mul,
    Mla,
    Umull,
    Umlal,
    Smull,
    Smlal,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ArmShMulOp {
    SmlaXy,
    SmlawY,
    SmulwY,
    SmlalXy,
    SmulXy,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ArmQOp {
    Qadd,
    Qsub,
    QdAdd,
    QdSub,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ArmLdrStrConfig {
    pub pre: bool,
    pub up: bool,
    pub kind: ArmLdrStrKind,
    pub writeback: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd)]
pub enum ArmLdrStrKind {
    LoadByte,
    LoadSignedByte,
    LoadHalfword,
    LoadSignedHalfword,
    LoadWord,
    LoadDoubleWord,

    StoreByte,
    StoreHalfword,
    StoreWord,
    StoreDoubleWord,
}

impl ArmLdrStrKind {
    pub fn is_ldr(self) -> bool {
        self < Self::StoreByte
    }

    pub fn is_str(self) -> bool {
        !self.is_ldr()
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ArmLdmStmConfig {
    pub pre: bool,
    pub up: bool,
    pub ldr: bool,
    pub writeback: bool,
}

/// Fields of a coprocessor register transfer.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Coprocessor {
    pub opc: u32,
    pub cn: u32,
    pub d: Register,
    pub pn: u32,
    pub cp: u32,
    pub cm: u32,
}

pub const fn arm_inst_to_lookup_idx(inst: u32) -> usize {
    ((inst as usize >> 16) & 0xFF0) | ((inst as usize >> 4) & 0xF)
}
