// Copyright (c) 2024 Leela Aurelia, git@elia.garden
//
// Unless otherwise noted, this file is released and thus subject to the
// terms of the Mozilla Public License Version 2.0 (MPL-2.0) or the
// GNU General Public License Version 3 (GPL-3).
// If a copy of these licenses was not distributed with this file, you can
// obtain them at https://mozilla.org/MPL/2.0/ and http://www.gnu.org/licenses/.

//! Tests driving a whole session: both CPUs running small programs
//! against the real memory map and devices.

use armchair::{
    state::{Mode, Register},
    Interrupt,
};
use common::SystemConfig;

use crate::{addr::*, Nds};

/// `b .`
const LOOP: u32 = 0xEAFF_FFFE;
const ARM9_ENTRY: u32 = 0x0200_0000;
const ARM7_ENTRY: u32 = 0x0380_0000;
const IO: u32 = 0x0400_0000;

fn session_with(config: SystemConfig, arm9: &[u32], arm7: &[u32]) -> Box<Nds> {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut nds = Nds::new(&config);
    nds.direct_boot(ARM9_ENTRY, ARM7_ENTRY);
    for (i, inst) in arm9.iter().chain(&[LOOP]).enumerate() {
        nds.set9::<u32>(ARM9_ENTRY + (i as u32 * 4), *inst);
    }
    for (i, inst) in arm7.iter().chain(&[LOOP]).enumerate() {
        nds.set7::<u32>(ARM7_ENTRY + (i as u32 * 4), *inst);
    }
    nds
}

/// Both CPUs run the given programs, followed by an endless loop.
fn session(arm9: &[u32], arm7: &[u32]) -> Box<Nds> {
    session_with(SystemConfig::default(), arm9, arm7)
}

#[test]
fn cpus_stay_interleaved() {
    let mut nds = session(&[], &[]);
    nds.run_for(1000);
    assert!(nds.now() >= 1000);
    assert!(nds.time_7 >= 1000 && nds.time_9 >= 1000);
    assert!(nds.time_7.abs_diff(nds.time_9) < 32);
}

#[test]
fn direct_boot_state() {
    let mut nds = session(&[], &[]);
    for cpu in [&nds.cpu7, &nds.cpu9] {
        assert_eq!(cpu.mode(), Mode::System);
    }
    assert_eq!(nds.cpu9.sp(), 0x0300_2F7C);
    assert_eq!(nds.cpu7.sp(), 0x0380_FD80);
    assert_eq!(nds.cpu7.reg_in_mode(Mode::Irq, Register::SP), 0x0380_FF80);
    assert_eq!(nds.get9::<u8>(IO + POSTFLG), 1);
    assert_eq!(nds.get7::<u8>(IO + POSTFLG), 1);
}

#[test]
fn timer_overflow_raises_irq() {
    let mut nds = session(&[], &[]);
    nds.set7::<u16>(IO + TM0CNT_L, 0xFFF0);
    nds.set7::<u16>(IO + TM0CNT_H, 0xC0);
    nds.run_for(100);
    assert_ne!(nds.get7::<u32>(IO + IF) & (1 << 3), 0);
    // The ARM9 has its own timers
    assert_eq!(nds.get9::<u32>(IO + IF), 0);
}

#[test]
fn count_up_timer_cascades() {
    let mut nds = session(&[], &[]);
    nds.set9::<u16>(IO + TM0CNT_L + 4, 0);
    nds.set9::<u16>(IO + TM0CNT_H + 4, 0x84);
    nds.set9::<u16>(IO + TM0CNT_L, 0xFFFF);
    nds.set9::<u16>(IO + TM0CNT_H, 0x80);
    // Timer 0 overflows every 2 cycles
    nds.run_for(21);
    assert_eq!(nds.get9::<u16>(IO + TM0CNT_L + 4), 10);
}

#[test]
fn disabled_timer_does_nothing() {
    let mut nds = session(&[], &[]);
    nds.set7::<u16>(IO + TM0CNT_L, 0xFF00);
    nds.set7::<u16>(IO + TM0CNT_H, 0xC0);
    nds.run_for(100);
    nds.set7::<u16>(IO + TM0CNT_H, 0x40);
    let stopped_at = nds.get7::<u16>(IO + TM0CNT_L);
    nds.run_for(1000);
    assert_eq!(nds.get7::<u32>(IO + IF), 0);
    assert_eq!(nds.get7::<u16>(IO + TM0CNT_L), stopped_at);
}

#[test]
fn divider() {
    let mut nds = session(&[], &[]);
    nds.set9::<u32>(IO + DIVCNT, 0);
    nds.set9::<u32>(IO + DIV_NUMER_L, 100);
    nds.set9::<u32>(IO + DIV_DENOM_L, 7);
    assert_eq!(nds.get9::<u32>(IO + DIV_RESULT_L), 14);
    assert_eq!(nds.get9::<u32>(IO + DIVREM_RESULT_L), 2);
    assert_ne!(nds.get9::<u16>(IO + DIVCNT) & 0x8000, 0);

    nds.run_for(40);
    assert_eq!(nds.get9::<u16>(IO + DIVCNT) & 0x8000, 0);
}

#[test]
fn divider_by_zero() {
    let mut nds = session(&[], &[]);
    nds.set9::<u32>(IO + DIV_NUMER_L, 5);
    nds.set9::<u32>(IO + DIV_DENOM_L, 0);
    assert_ne!(nds.get9::<u16>(IO + DIVCNT) & 0x4000, 0);
    assert_eq!(nds.get9::<u32>(IO + DIV_RESULT_L), 0xFFFF_FFFF);
    assert_eq!(nds.get9::<u32>(IO + DIVREM_RESULT_L), 5);
}

#[test]
fn math_unit_is_arm9_only() {
    let mut nds = session(&[], &[]);
    nds.set7::<u32>(IO + DIV_NUMER_L, 100);
    assert_eq!(nds.get7::<u32>(IO + DIV_NUMER_L), 0);
    assert_eq!(nds.get9::<u32>(IO + DIV_NUMER_L), 0);
}

#[test]
fn square_root() {
    let mut nds = session(&[], &[]);
    nds.set9::<u32>(IO + SQRTCNT, 0);
    nds.set9::<u32>(IO + SQRT_PARAM_L, 144);
    assert_eq!(nds.get9::<u32>(IO + SQRT_RESULT), 12);
    assert_ne!(nds.get9::<u16>(IO + SQRTCNT) & 0x8000, 0);
    nds.run_for(20);
    assert_eq!(nds.get9::<u16>(IO + SQRTCNT) & 0x8000, 0);
}

#[test]
fn ipcsync_exchange() {
    let mut nds = session(&[], &[]);
    nds.set7::<u16>(IO + IPCSYNC, 0x500);
    assert_eq!(nds.get9::<u16>(IO + IPCSYNC) & 0xF, 5);
    assert_eq!(nds.get7::<u16>(IO + IPCSYNC) & 0xF00, 0x500);

    // IRQ only arrives if the receiver enabled it
    nds.set7::<u16>(IO + IPCSYNC, 0x2000);
    assert_eq!(nds.get9::<u32>(IO + IF), 0);
    nds.set9::<u16>(IO + IPCSYNC, 0x4000);
    nds.set7::<u16>(IO + IPCSYNC, 0x2000);
    assert_ne!(nds.get9::<u32>(IO + IF) & (1 << 16), 0);
}

#[test]
fn haltcnt_halts_until_irq() {
    let mut nds = session(&[], &[]);
    nds.set7::<u8>(IO + HALTCNT, 0x80);
    assert!(nds.cpu7.is_halted);
    nds.run_for(100);
    assert!(nds.cpu7.is_halted);

    // IME is off: the CPU only wakes up
    nds.set7::<u32>(IO + IE, 1 << 3);
    nds.set7::<u16>(IO + TM0CNT_L, 0xFFF0);
    nds.set7::<u16>(IO + TM0CNT_H, 0xC0);
    nds.run_for(100);
    assert!(!nds.cpu7.is_halted);
    assert_eq!(nds.cpu7.mode(), Mode::System);
}

#[test]
fn external_interrupt_wakes_cpu() {
    let mut nds = session(&[], &[]);
    nds.set9::<u32>(IO + IE, 1 << 1);
    nds.cpu9.is_halted = true;
    nds.run_for(50);
    assert!(nds.cpu9.is_halted);
    nds.request_interrupt(true, Interrupt::HBlank);
    nds.run_for(50);
    assert!(!nds.cpu9.is_halted);
}

#[test]
fn cp15_halt() {
    // mcr p15, 0, r0, c7, c0, 4
    let mut nds = session(&[0xEE07_0F90], &[]);
    nds.run_for(100);
    assert!(nds.cpu9.is_halted);
    assert!(!nds.cpu7.is_halted);
}

#[test]
fn hle_division() {
    // mov r0, #100; mov r1, #7; swi 0x09
    let mut nds = session(&[0xE3A0_0064, 0xE3A0_1007, 0xEF09_0000], &[]);
    nds.run_for(200);
    assert_eq!(nds.cpu9.registers[0], 14);
    assert_eq!(nds.cpu9.registers[1], 2);
    assert_eq!(nds.cpu9.registers[3], 14);
    assert_eq!(nds.cpu9.mode(), Mode::System);
}

#[test]
fn hle_cpu_set_copies_words() {
    // swi 0x0B
    let mut nds = session(&[0xEF0B_0000], &[]);
    for i in 0..4 {
        nds.set9::<u32>(0x0200_1000 + i * 4, 0x1111_1111 * (i + 1));
    }
    nds.cpu9.registers[0] = 0x0200_1000;
    nds.cpu9.registers[1] = 0x0200_2000;
    nds.cpu9.registers[2] = 4 | (1 << 26);
    nds.run_for(200);
    for i in 0..4 {
        assert_eq!(nds.get9::<u32>(0x0200_2000 + i * 4), 0x1111_1111 * (i + 1));
    }
    assert_eq!(nds.get9::<u32>(0x0200_2010), 0);
}

#[test]
fn hle_crc16() {
    // swi 0x0E
    let mut nds = session(&[], &[0xEF0E_0000]);
    for (i, byte) in b"123456789".iter().enumerate() {
        nds.set7::<u8>(0x0200_3000 + i as u32, *byte);
    }
    nds.cpu7.registers[0] = 0xFFFF;
    nds.cpu7.registers[1] = 0x0200_3000;
    nds.cpu7.registers[2] = 9;
    nds.run_for(200);
    assert_eq!(nds.cpu7.registers[0], 0x4B37);
}

#[test]
fn swi_without_hle_returns_through_stub() {
    let config = SystemConfig {
        hle_bios: false,
        ..Default::default()
    };
    // mov r0, #100; swi 0x09; mov r2, #5
    let mut nds = session_with(config, &[], &[0xE3A0_0064, 0xEF09_0000, 0xE3A0_2005]);
    nds.run_for(200);
    assert_eq!(nds.cpu7.registers[0], 100);
    assert_eq!(nds.cpu7.registers[2], 5);
    assert_eq!(nds.cpu7.mode(), Mode::System);
}

#[test]
fn irq_through_bios_handler() {
    let handler = [
        0xE3A0_0301, // mov r0, #0x4000000
        0xE3A0_1008, // mov r1, #8
        0xE580_1214, // str r1, [r0, #0x214]
        0xE3A0_2001, // mov r2, #1
        0xE3A0_3621, // mov r3, #0x2100000
        0xE583_2000, // str r2, [r3]
        0xE12F_FF1E, // bx lr
    ];
    let mut nds = session(&[], &[]);
    for (i, inst) in handler.iter().enumerate() {
        nds.set9::<u32>(0x0200_0100 + (i as u32 * 4), *inst);
    }
    // Handler address at the end of DTCM
    nds.set9::<u32>(0x0300_3FFC, 0x0200_0100);
    nds.set9::<u32>(IO + IE, 1 << 3);
    nds.set9::<u32>(IO + IME, 1);
    nds.set9::<u16>(IO + TM0CNT_L, 0xFF00);
    nds.set9::<u16>(IO + TM0CNT_H, 0xC0);

    nds.run_for(800);
    assert_eq!(nds.get9::<u32>(0x0210_0000), 1);
    assert_eq!(nds.get9::<u32>(IO + IF), 0);
    assert_eq!(nds.cpu9.mode(), Mode::System);
    assert_eq!(nds.cpu9.sp(), 0x0300_2F7C);
}

#[test]
fn long_idle_rebases_clocks() {
    let mut nds = session(&[], &[]);
    nds.cpu7.is_halted = true;
    nds.cpu9.is_halted = true;
    nds.set9::<u16>(IO + TM0CNT_L, 0);
    nds.set9::<u16>(IO + TM0CNT_H, 0x83);

    nds.run_for(0xF000_0000 + (2048 * 5) + 3);
    assert_eq!(nds.now(), (2048 * 5) + 3);
    assert_eq!(nds.get9::<u16>(IO + TM0CNT_L), 5);
}

#[test]
fn memory_mirrors() {
    let mut nds = session(&[], &[]);
    nds.set9::<u32>(0x0200_0010, 0xDEAD_BEEF);
    assert_eq!(nds.get7::<u32>(0x0240_0010), 0xDEAD_BEEF);

    nds.set7::<u16>(0x0300_0002, 0x1234);
    assert_eq!(nds.get7::<u16>(0x0300_8002), 0x1234);
    // The ARM9 sees its DTCM there
    assert_eq!(nds.get9::<u16>(0x0300_0002), 0);
    assert_eq!(nds.get9::<u16>(0x0300_8002), 0x1234);

    nds.set7::<u8>(0x0380_0100, 0x42);
    assert_eq!(nds.get7::<u8>(0x0381_0100), 0x42);
    assert_eq!(nds.get9::<u8>(0x0380_0100), 0);
}

#[test]
fn misaligned_word_is_force_aligned() {
    let mut nds = session(&[], &[]);
    nds.set9::<u32>(0x0200_0402, 0x1122_3344);
    assert_eq!(nds.get9::<u32>(0x0200_0400), 0x1122_3344);
}

#[test]
fn unknown_io_reads_zero() {
    let mut nds = session(&[], &[]);
    assert_eq!(nds.get9::<u32>(IO + 0x600), 0);
    assert_eq!(nds.get7::<u16>(IO + 0x600), 0);
    assert_eq!(nds.get9::<u8>(0x0800_0000), 0);
}

#[cfg(feature = "serde")]
mod save_state {
    use super::*;

    #[test]
    fn round_trip_continues_identically() {
        // mov r0, #1; add r0, r0, r0; b -8
        let mut nds = session(&[0xE3A0_0001, 0xE080_0000, 0xEAFF_FFFD], &[]);
        nds.set9::<u16>(IO + TM0CNT_L, 0xF000);
        nds.set9::<u16>(IO + TM0CNT_H, 0x81);
        nds.run_for(300);

        let state = nds.save_state().unwrap();
        nds.run_for(500);
        let expected = (nds.cpu9.clone(), nds.cpu7.clone(), nds.now());
        let counter = nds.get9::<u16>(IO + TM0CNT_L);

        nds.load_state(&state).unwrap();
        nds.run_for(500);
        assert_eq!((nds.cpu9.clone(), nds.cpu7.clone(), nds.now()), expected);
        assert_eq!(nds.get9::<u16>(IO + TM0CNT_L), counter);
    }

    #[test]
    fn garbage_is_rejected() {
        let mut nds = session(&[], &[]);
        nds.run_for(100);
        let before = nds.cpu9.clone();
        assert!(nds.load_state(&[1, 2, 3]).is_err());
        assert_eq!(nds.cpu9, before);
    }
}
