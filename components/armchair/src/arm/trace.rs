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
    misc::{self, alu::ShiftKind, print_op},
    state::Register,
};

impl Display for ArmInst {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        let cc = misc::condition_mnemonic(self.condition_code());
        match self.decode(true) {
            ArmInstruction::Unknown => write!(f, "{self:X}??"),
            ArmInstruction::Swi { .. } => write!(f, "swi{cc}"),
            ArmInstruction::B { offset, link } => {
                write!(f, "{}{cc} {offset}", if link { "bl" } else { "b" })
            }
            ArmInstruction::BlxImm { offset } => write!(f, "blx {offset}"),
            ArmInstruction::Bx { m } => write!(f, "bx{cc} {m}"),
            ArmInstruction::BlxReg { m } => write!(f, "blx{cc} {m}"),

            ArmInstruction::Alu {
                op,
                s_bit,
                n,
                d,
                operand,
            } => {
                // Comparisons always set flags
                let suffix = if s_bit && op.should_write() { "s" } else { "" };
                write!(f, "{}{cc}{suffix}", print_op(op))?;
                match op {
                    ArmAluOp::Mov | ArmAluOp::Mvn => write!(f, " {d}, ")?,
                    ArmAluOp::Tst | ArmAluOp::Teq | ArmAluOp::Cmp | ArmAluOp::Cmn => {
                        write!(f, " {n}, ")?
                    }
                    _ => write!(f, " {d}, {n}, ")?,
                }
                write_alu_operand(f, operand)
            }
            ArmInstruction::Mul {
                op,
                s_bit,
                d,
                n,
                s,
                m,
            } => {
                write!(f, "{}{cc}{}", print_op(op), if s_bit { "s" } else { "" })?;
                match op {
                    ArmMulOp::Mul => write!(f, " {d}, {m}, {s}"),
                    ArmMulOp::Mla => write!(f, " {d}, {m}, {s}, {n}"),
                    _ => write!(f, " {n}, {d}, {m}, {s}"),
                }
            }
            ArmInstruction::ShMul {
                op,
                d,
                n,
                s,
                m,
                x_top,
                y_top,
            } => {
                let half = |top| if top { "t" } else { "b" };
                let (x, y) = (half(x_top), half(y_top));
                match op {
                    ArmShMulOp::SmlaXy => write!(f, "smla{x}{y}{cc} {d}, {m}, {s}, {n}"),
                    ArmShMulOp::SmlawY => write!(f, "smlaw{y}{cc} {d}, {m}, {s}, {n}"),
                    ArmShMulOp::SmulwY => write!(f, "smulw{y}{cc} {d}, {m}, {s}"),
                    ArmShMulOp::SmlalXy => write!(f, "smlal{x}{y}{cc} {n}, {d}, {m}, {s}"),
                    ArmShMulOp::SmulXy => write!(f, "smul{x}{y}{cc} {d}, {m}, {s}"),
                }
            }
            ArmInstruction::Clz { d, m } => write!(f, "clz{cc} {d}, {m}"),
            ArmInstruction::Q { op, d, n, m } => write!(f, "{}{cc} {d}, {m}, {n}", print_op(op)),

            ArmInstruction::Mrs { d, spsr } => {
                write!(f, "mrs{cc} {d}, {}", if spsr { "spsr" } else { "cpsr" })
            }
            ArmInstruction::Msr {
                src,
                flags,
                ctrl,
                spsr,
            } => {
                write!(f, "msr{cc} {}", if spsr { "spsr" } else { "cpsr" })?;
                if ctrl {
                    write!(f, "_ctrl")?;
                }
                if flags {
                    write!(f, "_flg")?;
                }
                match src {
                    ArmOperandKind::Immediate(imm) => write!(f, ", $0x{imm:X}"),
                    ArmOperandKind::Register(reg) => write!(f, ", {reg}"),
                }
            }

            ArmInstruction::LdrStr {
                n,
                d,
                offset,
                config,
            } => write_ldrstr(f, cc, n, d, offset, config),
            ArmInstruction::LdmStm {
                n,
                rlist,
                s_bit,
                config,
            } => {
                let kind = match (config.pre, config.up) {
                    (true, true) => "ib",
                    (true, false) => "db",
                    (false, true) => "ia",
                    (false, false) => "da",
                };
                let op = if config.ldr { "ldm" } else { "stm" };
                write!(f, "{op}{cc}{kind} {n}")?;
                if config.writeback {
                    write!(f, "!")?;
                }
                write!(f, ",")?;
                for r in Register::from_rlist(rlist) {
                    write!(f, " {r}")?;
                }
                if s_bit {
                    write!(f, " ^")?;
                }
                Ok(())
            }
            ArmInstruction::Swp { n, d, m, byte } => {
                write!(f, "swp{cc}{} {d}, {m}, [{n}]", if byte { "b" } else { "" })
            }

            ArmInstruction::Mrc(cop) => write_coprocessor(f, "mrc", cc, cop),
            ArmInstruction::Mcr(cop) => write_coprocessor(f, "mcr", cc, cop),
            ArmInstruction::Pld => write!(f, "pld"),
        }
    }
}

fn write_alu_operand(f: &mut Formatter<'_>, operand: ArmAluOperand) -> Result {
    match operand {
        ArmAluOperand::Immediate { value, rotate } => {
            write!(f, "$0x{:X}", value.rotate_right(rotate))
        }
        ArmAluOperand::ShiftedImmediate {
            m,
            shift: ShiftKind::Lsl,
            by: 0,
        } => write!(f, "{m}"),
        ArmAluOperand::ShiftedImmediate {
            m,
            shift: ShiftKind::Ror,
            by: 0,
        } => write!(f, "{m} rrx"),
        ArmAluOperand::ShiftedImmediate { m, shift, by: 0 } => {
            write!(f, "{m} {} $32", print_op(shift))
        }
        ArmAluOperand::ShiftedImmediate { m, shift, by } => {
            write!(f, "{m} {} ${by}", print_op(shift))
        }
        ArmAluOperand::ShiftedRegister { m, shift, by } => {
            write!(f, "{m} {} {by}", print_op(shift))
        }
    }
}

fn write_ldrstr(
    f: &mut Formatter<'_>,
    cc: &str,
    n: Register,
    d: Register,
    offset: ArmLdrStrOperandKind,
    config: ArmLdrStrConfig,
) -> Result {
    let (op, suffix) = match config.kind {
        ArmLdrStrKind::LoadByte => ("ldr", "b"),
        ArmLdrStrKind::LoadSignedByte => ("ldr", "sb"),
        ArmLdrStrKind::LoadHalfword => ("ldr", "h"),
        ArmLdrStrKind::LoadSignedHalfword => ("ldr", "sh"),
        ArmLdrStrKind::LoadWord => ("ldr", ""),
        ArmLdrStrKind::LoadDoubleWord => ("ldr", "d"),
        ArmLdrStrKind::StoreByte => ("str", "b"),
        ArmLdrStrKind::StoreHalfword => ("str", "h"),
        ArmLdrStrKind::StoreWord => ("str", ""),
        ArmLdrStrKind::StoreDoubleWord => ("str", "d"),
    };
    write!(f, "{op}{cc}{suffix} {d}, [{n}")?;
    if !config.pre {
        write!(f, "]")?;
    }

    let sign = if config.up { "" } else { "-" };
    match offset {
        ArmLdrStrOperandKind::Immediate(0) => (),
        ArmLdrStrOperandKind::Immediate(imm) => write!(f, ", ${sign}0x{imm:X}")?,
        ArmLdrStrOperandKind::Register(reg) => write!(f, ", {sign}{reg}")?,
        ArmLdrStrOperandKind::ShiftedRegister { base, by: 0, .. } => {
            write!(f, ", {sign}{base}")?
        }
        ArmLdrStrOperandKind::ShiftedRegister { base, shift, by } => {
            write!(f, ", {sign}{base} {} ${by}", print_op(shift))?
        }
    }

    if config.pre {
        write!(f, "]")?;
        if config.writeback {
            write!(f, "!")?;
        }
    }
    Ok(())
}

fn write_coprocessor(f: &mut Formatter<'_>, op: &str, cc: &str, cop: Coprocessor) -> Result {
    write!(
        f,
        "{op}{cc} p{}, {}, {}, c{}, c{}, {}",
        cop.pn, cop.opc, cop.d, cop.cn, cop.cm, cop.cp
    )
}
