// Copyright (c) 2024 Leela Aurelia, git@elia.garden
//
// Unless otherwise noted, this file is released and thus subject to the
// terms of the Mozilla Public License Version 2.0 (MPL-2.0) or the
// GNU General Public License Version 3 (GPL-3).
// If a copy of these licenses was not distributed with this file, you can
// obtain them at https://mozilla.org/MPL/2.0/ and http://www.gnu.org/licenses/.

use core::fmt::{Display, Formatter, Result};

use super::decode::*;
use crate::{
    misc::{self, print_op},
    state::LowRegister,
};

impl Display for ThumbInst {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        match self.decode(true) {
            ThumbInstruction::Unknown => write!(f, "{self:X}??"),
            ThumbInstruction::AluImm(op, d, s, n) => write!(f, "{} {d}, {s}, ${n}", print_op(op)),
            ThumbInstruction::AddSubReg { sub, d, s, n } => {
                write!(f, "{} {d}, {s}, {n}", if sub { "sub" } else { "add" })
            }
            ThumbInstruction::Imm8(op, d, n) => write!(f, "{} {d}, $0x{n:X}", print_op(op)),
            ThumbInstruction::Alu(Thumb4Op::Tst, _, s) => write!(f, "tst {s}"),
            ThumbInstruction::Alu(op, d, s) => write!(f, "{} {d}, {s}", print_op(op)),

            ThumbInstruction::HiAdd((s, d)) => write!(f, "add {d}, {s}"),
            ThumbInstruction::HiCmp((s, d)) => write!(f, "cmp {d}, {s}"),
            ThumbInstruction::HiMov((s, d)) => write!(f, "mov {d}, {s}"),
            ThumbInstruction::HiBx { s, blx } => {
                write!(f, "{} {s}", if blx { "blx" } else { "bx" })
            }

            ThumbInstruction::LdrPc { d, offset } => write!(f, "ldr {d}, [PC, {offset}]"),
            ThumbInstruction::LdrStrReg { op, d, b, o } => {
                write!(f, "{} {d}, [{b}, {o}]", print_op(op))
            }
            ThumbInstruction::LdrStrImm { op, d, b, offset } => {
                write!(f, "{} {d}, [{b}, {offset}]", print_op(op))
            }
            ThumbInstruction::LdrStrSp { ldr, d, offset } => {
                write!(f, "{} {d}, [sp, {offset}]", if ldr { "ldr" } else { "str" })
            }
            ThumbInstruction::RelAddr { sp, d, offset } => {
                write!(f, "add {d}, {}, {offset}", if sp { "sp" } else { "pc" })
            }
            ThumbInstruction::SpOffs(offset) => write!(f, "add sp, {offset}"),

            ThumbInstruction::Push { rlist, lr } => {
                write!(f, "push")?;
                write_rlist(f, rlist)?;
                if lr {
                    write!(f, " lr")?;
                }
                Ok(())
            }
            ThumbInstruction::Pop { rlist, pc } => {
                write!(f, "pop")?;
                write_rlist(f, rlist)?;
                if pc {
                    write!(f, " pc")?;
                }
                Ok(())
            }
            ThumbInstruction::Stmia { b, rlist } => {
                write!(f, "stmia {b}!,")?;
                write_rlist(f, rlist)
            }
            ThumbInstruction::Ldmia { b, rlist } => {
                write!(f, "ldmia {b}!,")?;
                write_rlist(f, rlist)
            }

            ThumbInstruction::BCond { cond, offset } => {
                write!(f, "b{} {offset}", misc::condition_mnemonic(cond))
            }
            ThumbInstruction::Swi { .. } => write!(f, "swi"),
            ThumbInstruction::B(offset) => write!(f, "b {offset}"),
            ThumbInstruction::SetLr(offset) => write!(f, "mov lr, (pc + {offset})"),
            ThumbInstruction::Bl { offset, thumb } => {
                write!(f, "{} lr + {offset}", if thumb { "bl" } else { "blx" })
            }
        }
    }
}

fn write_rlist(f: &mut Formatter<'_>, rlist: u8) -> Result {
    for r in LowRegister::from_rlist(rlist) {
        write!(f, " {r}")?;
    }
    Ok(())
}
