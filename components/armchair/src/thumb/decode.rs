// Copyright (c) 2024 Leela Aurelia, git@elia.garden
//
// Unless otherwise noted, this file is released and thus subject to the
// terms of the Mozilla Public License Version 2.0 (MPL-2.0) or the
// GNU General Public License Version 3 (GPL-3).
// If a copy of these licenses was not distributed with this file, you can
// obtain them at https://mozilla.org/MPL/2.0/ and http://www.gnu.org/licenses/.

use core::fmt::UpperHex;

use bitmatch::bitmatch;
use common::numutil::{NumExt, U16Ext};
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;

use crate::{
    memory::{Address, RelativeOffset},
    state::{LowRegister, Register},
};

/// A raw THUMB instruction.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ThumbInst(pub u16);

impl ThumbInst {
    pub fn reg(self, idx: u32) -> LowRegister {
        LowRegister(self.0.bits(idx, 3))
    }

    /// Registers of THUMB.5: source and destination, with their high bits.
    pub fn reg16(self) -> (Register, Register) {
        (
            Register(self.0.bits(3, 4)),
            Register(self.reg(0).0 | (self.0.bit(7) << 3)),
        )
    }

    pub fn imm5(self) -> u32 {
        self.0.bits(6, 5).u32()
    }

    pub fn imm7(self) -> u32 {
        ((self.0 & 0x7F) << 2) as u32
    }

    pub fn imm8(self) -> u32 {
        (self.0 & 0xFF).u32()
    }

    pub fn imm11(self) -> u32 {
        self.0.bits(0, 11).u32() << 1
    }

    pub fn is_bit(self, bit: u16) -> bool {
        self.0.is_bit(bit)
    }

    pub fn thumb4(self) -> Thumb4Op {
        // 4 bits always map to a variant
        Thumb4Op::from_u16(self.0.bits(6, 4)).unwrap_or(Thumb4Op::And)
    }

    fn ldrstr_op(self) -> ThumbStrLdrOp {
        ThumbStrLdrOp::from_u16(self.0.bits(9, 3)).unwrap_or(ThumbStrLdrOp::Str)
    }

    /// Decode this instruction. Encodings only valid on ARMv5 decode as
    /// unknown when `is_v5` is unset.
    #[bitmatch]
    pub fn decode(self, is_v5: bool) -> ThumbInstruction {
        use Thumb1Op as Op1;
        use ThumbInstruction as T;
        let i = self;

        #[bitmatch]
        match i.0 >> 6 {
            // THUMB.1/2
            "00000_?????" => T::AluImm(Op1::Lsl, i.reg(0), i.reg(3), i.imm5()),
            "00001_?????" => T::AluImm(Op1::Lsr, i.reg(0), i.reg(3), i.imm5()),
            "00010_?????" => T::AluImm(Op1::Asr, i.reg(0), i.reg(3), i.imm5()),
            "0001100_???" => T::AddSubReg {
                sub: false,
                d: i.reg(0),
                s: i.reg(3),
                n: i.reg(6),
            },
            "0001101_???" => T::AddSubReg {
                sub: true,
                d: i.reg(0),
                s: i.reg(3),
                n: i.reg(6),
            },
            "0001110_???" => T::AluImm(Op1::Add, i.reg(0), i.reg(3), i.reg(6).0.u32()),
            "0001111_???" => T::AluImm(Op1::Sub, i.reg(0), i.reg(3), i.reg(6).0.u32()),

            // THUMB.3
            "00100_?????" => T::Imm8(Thumb3Op::Mov, i.reg(8), i.imm8()),
            "00101_?????" => T::Imm8(Thumb3Op::Cmp, i.reg(8), i.imm8()),
            "00110_?????" => T::Imm8(Thumb3Op::Add, i.reg(8), i.imm8()),
            "00111_?????" => T::Imm8(Thumb3Op::Sub, i.reg(8), i.imm8()),

            // THUMB.4
            "010000_????" => T::Alu(i.thumb4(), i.reg(0), i.reg(3)),

            // THUMB.5
            "01000100_??" => T::HiAdd(i.reg16()),
            "01000101_??" => T::HiCmp(i.reg16()),
            "01000110_??" => T::HiMov(i.reg16()),
            "01000111_??" => {
                let (s, d) = i.reg16();
                let blx = d.0 > 7;
                if blx && !is_v5 {
                    T::Unknown
                } else {
                    T::HiBx { s, blx }
                }
            }

            // THUMB.6
            "01001_?????" => T::LdrPc {
                d: i.reg(8),
                offset: Address(i.imm8() << 2),
            },
            // THUMB.7/8
            "0101????_??" => T::LdrStrReg {
                op: i.ldrstr_op(),
                d: i.reg(0),
                b: i.reg(3),
                o: i.reg(6),
            },
            // THUMB.9
            "01100_?????" => T::LdrStrImm {
                op: ThumbStrLdrOp::Str,
                d: i.reg(0),
                b: i.reg(3),
                offset: Address(i.imm5() << 2),
            },
            "01101_?????" => T::LdrStrImm {
                op: ThumbStrLdrOp::Ldr,
                d: i.reg(0),
                b: i.reg(3),
                offset: Address(i.imm5() << 2),
            },
            "01110_?????" => T::LdrStrImm {
                op: ThumbStrLdrOp::Strb,
                d: i.reg(0),
                b: i.reg(3),
                offset: Address(i.imm5()),
            },
            "01111_?????" => T::LdrStrImm {
                op: ThumbStrLdrOp::Ldrb,
                d: i.reg(0),
                b: i.reg(3),
                offset: Address(i.imm5()),
            },
            // THUMB.10
            "1000?_?????" => T::LdrStrImm {
                op: if i.is_bit(11) {
                    ThumbStrLdrOp::Ldrh
                } else {
                    ThumbStrLdrOp::Strh
                },
                d: i.reg(0),
                b: i.reg(3),
                offset: Address(i.imm5() << 1),
            },

            // THUMB.11
            "1001?_?????" => T::LdrStrSp {
                ldr: i.is_bit(11),
                d: i.reg(8),
                offset: Address(i.imm8() << 2),
            },

            // THUMB.12
            "1010?_?????" => T::RelAddr {
                sp: i.is_bit(11),
                d: i.reg(8),
                offset: Address(i.imm8() << 2),
            },

            // THUMB.13
            "10110000_??" => {
                let offset = i.imm7() as i32;
                T::SpOffs(RelativeOffset(if i.is_bit(7) { -offset } else { offset }))
            }

            // THUMB.14
            "1011010?_??" => T::Push {
                rlist: i.0 as u8,
                lr: i.is_bit(8),
            },
            "1011110?_??" => T::Pop {
                rlist: i.0 as u8,
                pc: i.is_bit(8),
            },

            // THUMB.15
            "11000_?????" => T::Stmia {
                b: i.reg(8),
                rlist: i.0 as u8,
            },
            "11001_?????" => T::Ldmia {
                b: i.reg(8),
                rlist: i.0 as u8,
            },

            // THUMB.16/17
            "11011111_??" => T::Swi { comment: i.0 as u8 },
            "11011110_??" => T::Unknown,
            "1101????_??" => T::BCond {
                cond: (i.0 >> 8) & 0xF,
                offset: RelativeOffset((i.imm8() as i8 as i32) * 2),
            },

            // THUMB.18
            "11100_?????" => T::B(RelativeOffset(i.0.i11() * 2)),
            // THUMB.19
            "11110_?????" => T::SetLr(RelativeOffset(i.0.i11() << 12)),
            "11111_?????" => T::Bl {
                offset: Address(i.imm11()),
                thumb: true,
            },
            "11101_?????" => {
                if is_v5 {
                    T::Bl {
                        offset: Address(i.imm11()),
                        thumb: false,
                    }
                } else {
                    T::Unknown
                }
            }

            _ => T::Unknown,
        }
    }
}

impl UpperHex for ThumbInst {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        UpperHex::fmt(&self.0, f)
    }
}

/// A decoded THUMB instruction.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ThumbInstruction {
    Unknown,
    AluImm(Thumb1Op, LowRegister, LowRegister, u32),
    AddSubReg {
        sub: bool,
        d: LowRegister,
        s: LowRegister,
        n: LowRegister,
    },
    Imm8(Thumb3Op, LowRegister, u32),
    Alu(Thumb4Op, LowRegister, LowRegister),
    HiAdd((Register, Register)),
    HiCmp((Register, Register)),
    HiMov((Register, Register)),
    HiBx {
        s: Register,
        blx: bool,
    },
    LdrPc {
        d: LowRegister,
        offset: Address,
    },
    LdrStrReg {
        op: ThumbStrLdrOp,
        d: LowRegister,
        b: LowRegister,
        o: LowRegister,
    },
    LdrStrImm {
        op: ThumbStrLdrOp,
        d: LowRegister,
        b: LowRegister,
        offset: Address,
    },
    LdrStrSp {
        ldr: bool,
        d: LowRegister,
        offset: Address,
    },
    RelAddr {
        sp: bool,
        d: LowRegister,
        offset: Address,
    },
    SpOffs(RelativeOffset),
    Push {
        rlist: u8,
        lr: bool,
    },
    Pop {
        rlist: u8,
        pc: bool,
    },
    Stmia {
        b: LowRegister,
        rlist: u8,
    },
    Ldmia {
        b: LowRegister,
        rlist: u8,
    },
    BCond {
        cond: u16,
        offset: RelativeOffset,
    },
    Swi {
        comment: u8,
    },
    B(RelativeOffset),
    SetLr(RelativeOffset),
    /// Second half of a long branch; `thumb` is false for BLX.
    Bl {
        offset: Address,
        thumb: bool,
    },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Thumb1Op {
    Lsl,
    Lsr,
    Asr,
    Add,
    Sub,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Thumb3Op {
    Mov,
    Cmp,
    Add,
    Sub,
}

#[derive(FromPrimitive, Copy, Clone, Debug, PartialEq, Eq)]
pub enum Thumb4Op {
    And = 0,
    Eor,
    Lsl,
    Lsr,
    Asr,
    Adc,
    Sbc,
    Ror,
    Tst,
    Neg,
    Cmp,
    Cmn,
    Orr,
    Mul,
    Bic,
    Mvn,
}

#[derive(FromPrimitive, Copy, Clone, Debug, PartialEq, Eq)]
pub enum ThumbStrLdrOp {
    Str = 0,
    Strh,
    Strb,
    Ldsb,
    Ldr,
    Ldrh,
    Ldrb,
    Ldsh,
}
