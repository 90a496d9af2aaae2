// Copyright (c) 2024 Leela Aurelia, git@elia.garden
//
// Unless otherwise noted, this file is released and thus subject to the
// terms of the Mozilla Public License Version 2.0 (MPL-2.0) or the
// GNU General Public License Version 3 (GPL-3).
// If a copy of these licenses was not distributed with this file, you can
// obtain them at https://mozilla.org/MPL/2.0/ and http://www.gnu.org/licenses/.

//! A replacement for the BIOS of both CPUs: software interrupts are
//! handled natively, and a small stub is mapped where the BIOS would be
//! to dispatch IRQs to the handler the game installed.

use armchair::{
    interface::{Bus, CpuVersion},
    state::{Mode, Register},
    Address, CpuState,
};
use common::{numutil::NumExt, Time};
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;

use crate::NdsCpu;

/// Cycles a call that is not implemented takes.
const FALLBACK_CYCLES: Time = 4;

/// ARM7 BIOS at 0x0000_0000. SWI returns right away, IRQ jumps to the
/// handler at 0x0380_FFFC.
pub const STUB7: [u32; 12] = [
    0, 0, 0xE1B0_F00E, // movs pc, lr
    0, 0, 0, //
    0xE92D_500F, // stmdb sp!, r0 r1 r2 r3 r12 lr
    0xE3A0_0301, // mov r0, $0x4000000
    0xE28F_E000, // add lr, pc, $0x0
    0xE510_F004, // ldr pc, [r0, $-0x4]
    0xE8BD_500F, // ldmia sp!, r0 r1 r2 r3 r12 lr
    0xE25E_F004, // subs pc, lr, $0x4
];

/// ARM9 BIOS at 0xFFFF_0000. IRQ jumps to the handler at the end of DTCM.
pub const STUB9: [u32; 15] = [
    0, 0, 0xE1B0_F00E, // movs pc, lr
    0, 0, 0, //
    0xE92D_500F, // stmdb sp!, r0 r1 r2 r3 r12 lr
    0xEE19_0F11, // mrc p15, 0, r0, c9, c1, 0
    0xE1A0_0620, // mov r0, r0 lsr $12
    0xE1A0_0600, // mov r0, r0 lsl $12
    0xE280_0901, // add r0, r0, $0x4000
    0xE28F_E000, // add lr, pc, $0x0
    0xE510_F004, // ldr pc, [r0, $-0x4]
    0xE8BD_500F, // ldmia sp!, r0 r1 r2 r3 r12 lr
    0xE25E_F004, // subs pc, lr, $0x4
];

/// Read from one of the stubs. Everything past it reads as 0.
pub fn stub_read(stub: &[u32], offset: u32) -> u32 {
    let word = stub.get(offset.us() >> 2).copied().unwrap_or(0);
    word >> ((offset & 3) * 8)
}

/// Stack pointers the BIOS leaves behind after boot.
pub struct BootStacks {
    pub sys: u32,
    pub irq: u32,
    pub svc: u32,
}

pub const STACKS7: BootStacks = BootStacks {
    sys: 0x0380_FD80,
    irq: 0x0380_FF80,
    svc: 0x0380_FFC0,
};

pub const STACKS9: BootStacks = BootStacks {
    sys: 0x0300_2F7C,
    irq: 0x0300_3F80,
    svc: 0x0300_3FC0,
};

/// Put a CPU into the state the BIOS leaves it in when starting a game:
/// system mode, interrupts enabled, ARM state, at the entry point.
pub fn boot(cpu: &mut CpuState, entry: u32, stacks: &BootStacks) {
    *cpu = CpuState::default();
    cpu.set_reg_in_mode(Mode::Irq, Register::SP, stacks.irq);
    cpu.set_reg_in_mode(Mode::Supervisor, Register::SP, stacks.svc);
    cpu.set_cpsr(Mode::System.to_u32());
    cpu.set_sp(stacks.sys);
    cpu.start_at(Address(entry));
}

/// BIOS functions, by SWI number.
#[derive(FromPrimitive, Debug, Copy, Clone, PartialEq, Eq)]
pub enum BiosCall {
    WaitByLoop = 0x03,
    IntrWait = 0x04,
    VBlankIntrWait = 0x05,
    Halt = 0x06,
    Sleep = 0x07,
    SoundBias = 0x08,
    Div = 0x09,
    CpuSet = 0x0B,
    CpuFastSet = 0x0C,
    Sqrt = 0x0D,
    GetCrc16 = 0x0E,
    IsDebugger = 0x0F,
    GetSineTable = 0x1A,
}

impl BiosCall {
    fn is_arm7_only(self) -> bool {
        matches!(self, Self::Sleep | Self::SoundBias | Self::GetSineTable)
    }
}

/// Execute a BIOS call. `cpu` is already in supervisor mode, with the
/// arguments in r0-r3. Returns the cycles the call took.
pub fn hle_call<DS: NdsCpu>(ds: &mut DS, cpu: &mut CpuState, comment: u8) -> Time {
    let call = BiosCall::from_u8(comment).filter(|c| DS::I == 0 || !c.is_arm7_only());
    let Some(call) = call else {
        log::warn!(
            "{} called unknown BIOS function 0x{comment:02X}, ignoring",
            DS::Version::NAME
        );
        return FALLBACK_CYCLES;
    };
    log::trace!("{} BIOS call {call:?}", DS::Version::NAME);

    let r = &mut cpu.registers;
    match call {
        BiosCall::WaitByLoop => {
            let loops = r[0] as i32;
            r[0] = 0;
            loops.max(0) as Time * 4
        }
        BiosCall::IntrWait => {
            let (discard, flags) = (r[0] != 0, r[1]);
            intr_wait(ds, cpu, discard, flags)
        }
        BiosCall::VBlankIntrWait => intr_wait(ds, cpu, true, 1),
        BiosCall::Halt => {
            log::debug!("{} halted through BIOS", DS::Version::NAME);
            cpu.is_halted = true;
            FALLBACK_CYCLES
        }
        BiosCall::Sleep => {
            // There is no wakeup hardware, treat sleep like halt
            log::debug!("ARM7 went to sleep through BIOS, halting");
            cpu.is_halted = true;
            FALLBACK_CYCLES
        }
        BiosCall::SoundBias => FALLBACK_CYCLES,

        BiosCall::Div => {
            let (quot, rem) = divide(r[0] as i32, r[1] as i32);
            r[0] = quot as u32;
            r[1] = rem as u32;
            r[3] = quot.unsigned_abs();
            40
        }
        BiosCall::Sqrt => {
            r[0] = r[0].isqrt();
            20
        }
        BiosCall::CpuSet => cpu_set(ds, cpu, false),
        BiosCall::CpuFastSet => cpu_set(ds, cpu, true),
        BiosCall::GetCrc16 => {
            let (crc, addr, len) = (r[0].u16(), r[1], r[2]);
            let mut bytes = (0..len).map(|i| ds.get::<u8>(cpu, Address(addr.wrapping_add(i))));
            let crc = crc16(crc, &mut bytes);
            cpu.registers[0] = crc.u32();
            len as Time * 2 + 10
        }
        BiosCall::IsDebugger => {
            r[0] = 0;
            FALLBACK_CYCLES
        }
        BiosCall::GetSineTable => {
            r[0] = SINE_TABLE[r[0].us() & 0x3F].u32();
            FALLBACK_CYCLES
        }
    }
}

/// Wait until one of the interrupts in `flags` is raised, optionally
/// discarding ones that were already raised.
/// This halts until any enabled interrupt arrives; the caller's IRQ
/// handler runs before the call returns.
fn intr_wait<DS: NdsCpu>(ds: &mut DS, cpu: &mut CpuState, discard: bool, flags: u32) -> Time {
    let intr = &mut ds.intr[DS::I];
    intr.ime = true;
    if discard {
        intr.acknowledge(flags);
    }
    if intr.if_ & flags == 0 {
        log::debug!("{} waiting for interrupts 0x{flags:X}", DS::Version::NAME);
        cpu.is_halted = true;
    }
    16
}

/// Signed division with the BIOS's result on division by zero.
fn divide(numer: i32, denom: i32) -> (i32, i32) {
    if denom == 0 {
        (if numer < 0 { 1 } else { -1 }, numer)
    } else {
        (numer.wrapping_div(denom), numer.wrapping_rem(denom))
    }
}

/// CpuSet and CpuFastSet: copy or fill (bit 24 of r2) r2 units from r0 to
/// r1. Units are halfwords or words (bit 26); CpuFastSet always copies
/// words, in blocks of 8.
fn cpu_set<DS: NdsCpu>(ds: &mut DS, cpu: &mut CpuState, fast: bool) -> Time {
    let (mut src, mut dst, ctrl) = (cpu.registers[0], cpu.registers[1], cpu.registers[2]);
    let fill = ctrl.is_bit(24);
    let words = fast || ctrl.is_bit(26);
    let mut count = ctrl & 0x1F_FFFF;
    if fast {
        count = (count + 7) & !7;
    }

    let width = if words { 4 } else { 2 };
    for _ in 0..count {
        if words {
            let value = ds.get::<u32>(cpu, Address(src));
            ds.set::<u32>(cpu, Address(dst), value);
        } else {
            let value = ds.get::<u16>(cpu, Address(src));
            ds.set::<u16>(cpu, Address(dst), value);
        }
        if !fill {
            src = src.wrapping_add(width);
        }
        dst = dst.wrapping_add(width);
    }

    count as Time * 2 + 20
}

/// CRC-16 with the 0xA001 polynomial, like the BIOS calculates it.
fn crc16(mut crc: u16, bytes: &mut impl Iterator<Item = u8>) -> u16 {
    for byte in bytes {
        crc ^= byte as u16;
        for _ in 0..8 {
            let carry = crc.is_bit(0);
            crc >>= 1;
            if carry {
                crc ^= 0xA001;
            }
        }
    }
    crc
}

/// First quarter of a sine wave, scaled to 0x7FFF.
const SINE_TABLE: [u16; 64] = [
    0x0000, 0x0324, 0x0648, 0x096A, 0x0C8C, 0x0FAB, 0x12C8, 0x15E2, 0x18F9, 0x1C0B, 0x1F1A,
    0x2223, 0x2528, 0x2826, 0x2B1F, 0x2E11, 0x30FB, 0x33DF, 0x36BA, 0x398C, 0x3C56, 0x3F17,
    0x41CE, 0x447A, 0x471C, 0x49B4, 0x4C3F, 0x4EBF, 0x5133, 0x539B, 0x55F5, 0x5842, 0x5A82,
    0x5CB3, 0x5ED7, 0x60EB, 0x62F1, 0x64E8, 0x66CF, 0x68A6, 0x6A6D, 0x6C23, 0x6DC9, 0x6F5E,
    0x70E2, 0x7254, 0x73B5, 0x7504, 0x7641, 0x776B, 0x7884, 0x7989, 0x7A7C, 0x7B5C, 0x7C29,
    0x7CE3, 0x7D89, 0x7E1D, 0x7E9C, 0x7F09, 0x7F61, 0x7FA6, 0x7FD8, 0x7FF5,
];
