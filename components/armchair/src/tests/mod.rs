// Copyright (c) 2024 Leela Aurelia, git@elia.garden
//
// Unless otherwise noted, this file is released and thus subject to the
// terms of the Mozilla Public License Version 2.0 (MPL-2.0) or the
// GNU General Public License Version 3 (GPL-3).
// If a copy of these licenses was not distributed with this file, you can
// obtain them at https://mozilla.org/MPL/2.0/ and http://www.gnu.org/licenses/.

//! Tests running real instructions on a flat memory bus.

use alloc::{vec, vec::Vec};
use core::marker::PhantomData;

use common::{numutil::NumExt, Time};

use crate::{
    interface::{Arm7Tdmi, Arm946Es, Bus, CpuVersion, RwType},
    state::{Flag::*, Mode, Register},
    Access, Address, Cpu, CpuState, InterruptController,
};

const MEM_SIZE: usize = 0x1_0000;
const CODE: u32 = 0x100;

/// 64K of flat memory, every access takes 1 cycle.
struct TestBus<V: CpuVersion> {
    mem: Vec<u8>,
    intr: InterruptController,
    /// If SWIs should be handled natively.
    hle: bool,
    swis: Vec<u8>,
    _version: PhantomData<V>,
}

impl<V: CpuVersion> Bus for TestBus<V> {
    type Version = V;

    fn get<T: RwType>(&mut self, _cpu: &mut CpuState, addr: Address) -> T {
        let addr = (addr.0 & !(T::WIDTH - 1)).us() & (MEM_SIZE - 1);
        let mut value = 0;
        for byte in (0..T::WIDTH.us()).rev() {
            value = (value << 8) | self.mem[addr + byte] as u32;
        }
        T::from_u32(value)
    }

    fn set<T: RwType>(&mut self, _cpu: &mut CpuState, addr: Address, value: T) {
        let addr = (addr.0 & !(T::WIDTH - 1)).us() & (MEM_SIZE - 1);
        let value = value.u32();
        for byte in 0..T::WIDTH.us() {
            self.mem[addr + byte] = (value >> (byte * 8)) as u8;
        }
    }

    fn wait_time<T: RwType>(
        &mut self,
        _cpu: &mut CpuState,
        _addr: Address,
        _access: Access,
    ) -> u16 {
        1
    }

    fn interrupts(&self) -> &InterruptController {
        &self.intr
    }

    fn hle_swi(&mut self, _cpu: &mut CpuState, comment: u8) -> Option<Time> {
        self.swis.push(comment);
        self.hle.then_some(10)
    }
}

struct Harness<V: CpuVersion> {
    state: CpuState,
    bus: TestBus<V>,
}

impl<V: CpuVersion> Harness<V> {
    fn new() -> Self {
        let _ = env_logger::builder().is_test(true).try_init();
        let mut state = CpuState::default();
        state.set_cpsr(0x1F);
        Self {
            state,
            bus: TestBus {
                mem: vec![0; MEM_SIZE],
                intr: InterruptController::default(),
                hle: false,
                swis: Vec::new(),
                _version: PhantomData,
            },
        }
    }

    fn arm(code: &[u32]) -> Self {
        let mut this = Self::new();
        for (i, inst) in code.iter().enumerate() {
            this.write(CODE + i as u32 * 4, *inst);
        }
        this.state.start_at(Address(CODE));
        this
    }

    fn thumb(code: &[u16]) -> Self {
        let mut this = Self::new();
        for (i, inst) in code.iter().enumerate() {
            this.bus
                .set::<u16>(&mut this.state, Address(CODE + i as u32 * 2), *inst);
        }
        this.state.set_flag(Thumb, true);
        this.state.start_at(Address(CODE));
        this
    }

    fn step(&mut self) -> Time {
        Cpu::step(&mut self.state, &mut self.bus)
    }

    fn read(&mut self, addr: u32) -> u32 {
        self.bus.get::<u32>(&mut self.state, Address(addr))
    }

    fn write(&mut self, addr: u32, value: u32) {
        self.bus.set::<u32>(&mut self.state, Address(addr), value);
    }

    fn r(&self, reg: u16) -> u32 {
        self.state[Register(reg)]
    }

    fn set_r(&mut self, reg: u16, value: u32) {
        self.state.registers[reg.us()] = value;
    }

    fn next(&self) -> u32 {
        self.state.next_instruction_address().0
    }
}

type Arm7 = Harness<Arm7Tdmi>;
type Arm9 = Harness<Arm946Es>;

/// Run `adds`/`subs r0, r1, r2` and return (result, N, Z, C, V).
fn flags_of<V: CpuVersion>(inst: u32, a: u32, b: u32) -> (u32, bool, bool, bool, bool) {
    let mut cpu = Harness::<V>::arm(&[inst]);
    cpu.set_r(1, a);
    cpu.set_r(2, b);
    cpu.step();
    let s = &cpu.state;
    (
        cpu.r(0),
        s.is_flag(Neg),
        s.is_flag(Zero),
        s.is_flag(Carry),
        s.is_flag(Overflow),
    )
}

const ADDS: u32 = 0xE091_0002;
const SUBS: u32 = 0xE051_0002;

#[test]
fn add_overflow_boundaries() {
    let max = i32::MAX as u32;
    let min = i32::MIN as u32;
    assert_eq!(
        flags_of::<Arm946Es>(ADDS, max, 1),
        (min, true, false, false, true)
    );
    assert_eq!(
        flags_of::<Arm946Es>(ADDS, u32::MAX, 1),
        (0, false, true, true, false)
    );
    assert_eq!(flags_of::<Arm946Es>(ADDS, min, min), (0, false, true, true, true));
    assert_eq!(flags_of::<Arm946Es>(ADDS, 0, 0), (0, false, true, false, false));
}

#[test]
fn sub_overflow_boundaries() {
    let max = i32::MAX as u32;
    let min = i32::MIN as u32;
    assert_eq!(
        flags_of::<Arm946Es>(SUBS, min, 1),
        (max, false, false, true, true)
    );
    assert_eq!(
        flags_of::<Arm946Es>(SUBS, 0, 1),
        (u32::MAX, true, false, false, false)
    );
    assert_eq!(flags_of::<Arm946Es>(SUBS, 0, min), (min, true, false, false, true));
    assert_eq!(
        flags_of::<Arm946Es>(SUBS, u32::MAX, u32::MAX),
        (0, false, true, true, false)
    );
}

#[test]
fn register_shift_by_32_and_more() {
    // movs r0, r1, lsl r2
    let lsl = 0xE1B0_0211;
    // movs r0, r1, asr r2
    let asr = 0xE1B0_0251;
    // movs r0, r1, ror r2
    let ror = 0xE1B0_0271;

    let run = |inst, value, by| {
        let mut cpu = Arm7::arm(&[inst]);
        cpu.set_r(1, value);
        cpu.set_r(2, by);
        let cycles = cpu.step();
        assert_eq!(cycles, 2);
        (cpu.r(0), cpu.state.is_flag(Carry))
    };

    assert_eq!(run(lsl, 0x8000_0001, 32), (0, true));
    assert_eq!(run(lsl, 0x8000_0001, 33), (0, false));
    assert_eq!(run(asr, 0x8000_0000, 40), (u32::MAX, true));
    assert_eq!(run(ror, 0x8000_0001, 64), (0x8000_0001, true));
    // Only the low byte counts
    assert_eq!(run(lsl, 3, 0x101), (6, false));
}

#[test]
fn branch_timing() {
    // beq +0, not taken
    let mut cpu = Arm9::arm(&[0x0A00_0000]);
    assert_eq!(cpu.step(), 1);
    assert_eq!(cpu.next(), CODE + 4);

    // b +0, taken: lands 8 bytes ahead
    let mut cpu = Arm9::arm(&[0xEA00_0000]);
    assert_eq!(cpu.step(), 3);
    assert_eq!(cpu.next(), CODE + 8);
    assert_eq!(cpu.state.pc().0, CODE + 12);

    // THUMB beq, not taken, then taken
    let mut cpu = Arm7::thumb(&[0xD000]);
    assert_eq!(cpu.step(), 1);
    assert_eq!(cpu.next(), CODE + 2);
    let mut cpu = Arm7::thumb(&[0xD000]);
    cpu.state.set_flag(Zero, true);
    assert_eq!(cpu.step(), 3);
    assert_eq!(cpu.next(), CODE + 4);
}

#[test]
fn unaligned_ldr_rotates() {
    // ldr r0, [r1]
    let mut cpu = Arm7::arm(&[0xE591_0000]);
    cpu.write(0x1000, 0x1122_3344);
    cpu.set_r(1, 0x1002);
    assert_eq!(cpu.step(), 3);
    assert_eq!(cpu.r(0), 0x3344_1122);
}

#[test]
fn unaligned_halfword_loads() {
    // ldrh r0, [r1]
    let ldrh = 0xE1D1_00B0;
    // ldrsh r0, [r1]
    let ldrsh = 0xE1D1_00F0;

    let mut cpu = Arm7::arm(&[ldrh, ldrsh]);
    cpu.write(0x1000, 0x0000_80FF);
    cpu.set_r(1, 0x1001);
    cpu.step();
    assert_eq!(cpu.r(0), 0xFF00_0080);
    cpu.step();
    assert_eq!(cpu.r(0), 0xFFFF_FF80);

    let mut cpu = Arm9::arm(&[ldrh, ldrsh]);
    cpu.write(0x1000, 0x0000_80FF);
    cpu.set_r(1, 0x1001);
    cpu.step();
    assert_eq!(cpu.r(0), 0x80FF);
    cpu.step();
    assert_eq!(cpu.r(0), 0xFFFF_80FF);
}

#[test]
fn load_into_base_skips_writeback() {
    // ldr r1, [r1], #4
    let mut cpu = Arm9::arm(&[0xE491_1004]);
    cpu.write(0x1000, 0xCAFE);
    cpu.set_r(1, 0x1000);
    cpu.step();
    assert_eq!(cpu.r(1), 0xCAFE);
}

#[test]
fn doubleword_with_odd_register_is_unknown() {
    // ldrd r15, [r0]; strd r15, [r0]; ldrd r1, [r0]
    let mut cpu = Arm9::arm(&[0xE1C0_F0D0, 0xE1C0_F0F0, 0xE1C0_10D0]);
    cpu.write(0x1000, 0x1111);
    cpu.write(0x1004, 0x2222);
    cpu.set_r(0, 0x1000);
    cpu.set_r(1, 0xAB);

    cpu.step();
    assert_eq!(cpu.next(), CODE + 4);
    cpu.step();
    assert_eq!(cpu.next(), CODE + 8);
    assert_eq!(cpu.read(0x1000), 0x1111);
    assert_eq!(cpu.read(0x1004), 0x2222);
    cpu.step();
    assert_eq!(cpu.r(1), 0xAB);
    assert_eq!(cpu.r(2), 0);
    assert_eq!(cpu.next(), CODE + 12);

    // ldrd r2, [r0] still works
    let mut cpu = Arm9::arm(&[0xE1C0_20D0]);
    cpu.write(0x1000, 0x1111);
    cpu.write(0x1004, 0x2222);
    cpu.set_r(0, 0x1000);
    cpu.step();
    assert_eq!((cpu.r(2), cpu.r(3)), (0x1111, 0x2222));
}

#[test]
fn stm_base_in_list_ascending() {
    // stmia r1!, {r0, r1}
    let stmia = 0xE8A1_0003;
    let mut arm7 = Arm7::arm(&[stmia]);
    let mut arm9 = Arm9::arm(&[stmia]);
    for cpu in [&mut arm7.state, &mut arm9.state] {
        cpu.registers[0] = 0xAA;
        cpu.registers[1] = 0x1000;
    }
    arm7.step();
    arm9.step();

    assert_eq!(arm7.read(0x1004), 0x1008);
    assert_eq!(arm9.read(0x1004), 0x1000);
    assert_eq!(arm7.r(1), 0x1008);
    assert_eq!(arm9.r(1), 0x1008);

    // Base first in list: old base on both
    // stmia r0!, {r0, r1}
    let mut arm7 = Arm7::arm(&[0xE8A0_0003]);
    arm7.set_r(0, 0x1000);
    arm7.step();
    assert_eq!(arm7.read(0x1000), 0x1000);
    assert_eq!(arm7.r(0), 0x1008);
}

#[test]
fn stm_base_in_list_descending() {
    // stmdb r1!, {r0, r1}
    let stmdb = 0xE921_0003;
    let mut arm7 = Arm7::arm(&[stmdb]);
    let mut arm9 = Arm9::arm(&[stmdb]);
    for cpu in [&mut arm7.state, &mut arm9.state] {
        cpu.registers[0] = 0xAA;
        cpu.registers[1] = 0x1000;
    }
    arm7.step();
    arm9.step();

    assert_eq!(arm7.read(0xFF8), 0xAA);
    assert_eq!(arm7.read(0xFFC), 0xFF8);
    assert_eq!(arm9.read(0xFFC), 0x1000);
    assert_eq!(arm7.r(1), 0xFF8);
    assert_eq!(arm9.r(1), 0xFF8);
}

fn setup_ldm<V: CpuVersion>(cpu: &mut Harness<V>) {
    cpu.write(0x1000, 0x11);
    cpu.write(0x1004, 0x22);
    cpu.set_r(0, 0x1000);
}

#[test]
fn ldm_base_in_list_ascending() {
    // ldmia r0!, {r0, r1}: base first of several
    let mut arm7 = Arm7::arm(&[0xE8B0_0003]);
    setup_ldm(&mut arm7);
    arm7.step();
    assert_eq!(arm7.r(0), 0x11);

    let mut arm9 = Arm9::arm(&[0xE8B0_0003]);
    setup_ldm(&mut arm9);
    arm9.step();
    assert_eq!(arm9.r(0), 0x1008);
    assert_eq!(arm9.r(1), 0x22);

    // ldmia r0!, {r0}: base is the only register
    let mut arm9 = Arm9::arm(&[0xE8B0_0001]);
    setup_ldm(&mut arm9);
    arm9.step();
    assert_eq!(arm9.r(0), 0x1004);

    // ldmia r1!, {r0, r1}: base last of several
    let mut arm9 = Arm9::arm(&[0xE8B1_0003]);
    setup_ldm(&mut arm9);
    arm9.set_r(1, 0x1000);
    arm9.step();
    assert_eq!(arm9.r(1), 0x22);
}

#[test]
fn ldm_base_in_list_descending() {
    // ldmdb r0!, {r0, r1}
    let ldmdb = 0xE930_0003;
    let mut arm7 = Arm7::arm(&[ldmdb]);
    let mut arm9 = Arm9::arm(&[ldmdb]);
    arm7.write(0x1000, 0x11);
    arm7.write(0x1004, 0x22);
    arm7.set_r(0, 0x1008);
    arm9.write(0x1000, 0x11);
    arm9.write(0x1004, 0x22);
    arm9.set_r(0, 0x1008);
    arm7.step();
    arm9.step();

    assert_eq!(arm7.r(0), 0x11);
    assert_eq!(arm7.r(1), 0x22);
    assert_eq!(arm9.r(0), 0x1000);
    assert_eq!(arm9.r(1), 0x22);
}

#[test]
fn empty_rlist() {
    // stmia r0!, {}
    let mut arm7 = Arm7::arm(&[0xE8A0_0000]);
    arm7.set_r(0, 0x1000);
    arm7.step();
    assert_eq!(arm7.r(0), 0x1040);
    assert_eq!(arm7.read(0x1000), CODE + 12);

    let mut arm9 = Arm9::arm(&[0xE8A0_0000]);
    arm9.set_r(0, 0x1000);
    arm9.step();
    assert_eq!(arm9.r(0), 0x1040);
    assert_eq!(arm9.read(0x1000), 0);
}

#[test]
fn user_bank_block_transfer() {
    // stmia r0, {sp}^; ldmia r1, {sp}^
    let mut cpu = Arm9::arm(&[0xE8C0_2000, 0xE8D1_2000]);
    cpu.state.set_sp(0xAAAA);
    cpu.state.set_mode(Mode::Irq);
    cpu.state.set_sp(0xBBBB);
    cpu.set_r(0, 0x1000);
    cpu.set_r(1, 0x2000);
    cpu.write(0x2000, 0xCCCC);

    cpu.step();
    assert_eq!(cpu.read(0x1000), 0xAAAA);
    cpu.step();
    assert_eq!(cpu.state.reg_in_mode(Mode::User, Register::SP), 0xCCCC);
    assert_eq!(cpu.state.sp(), 0xBBBB);
    assert_eq!(cpu.state.mode(), Mode::Irq);
}

#[test]
fn ldm_with_pc_restores_cpsr() {
    // ldmia r0, {pc}^
    let mut cpu = Arm9::arm(&[0xE8D0_8000]);
    cpu.state.set_mode(Mode::Irq);
    // System mode, THUMB
    cpu.state.set_spsr(0x3F);
    cpu.set_r(0, 0x1000);
    cpu.write(0x1000, 0x300);

    cpu.step();
    assert_eq!(cpu.state.mode(), Mode::System);
    assert!(cpu.state.is_flag(Thumb));
    assert_eq!(cpu.next(), 0x300);
}

#[test]
fn bx_and_blx_interwork() {
    // bx r0
    let mut cpu = Arm7::arm(&[0xE12F_FF10]);
    cpu.set_r(0, 0x201);
    cpu.step();
    assert!(cpu.state.is_flag(Thumb));
    assert_eq!(cpu.next(), 0x200);
    assert_eq!(cpu.state.pc().0, 0x202);

    // blx r0
    let mut cpu = Arm9::arm(&[0xE12F_FF30]);
    cpu.set_r(0, 0x301);
    cpu.step();
    assert!(cpu.state.is_flag(Thumb));
    assert_eq!(cpu.next(), 0x300);
    assert_eq!(cpu.state.lr(), CODE + 4);

    // blx +2, with the H bit selecting the halfword
    let mut cpu = Arm9::arm(&[0xFB00_0000]);
    cpu.step();
    assert!(cpu.state.is_flag(Thumb));
    assert_eq!(cpu.next(), CODE + 10);
    assert_eq!(cpu.state.lr(), CODE + 4);

    // Unknown on the ARM7
    let mut cpu = Arm7::arm(&[0xE12F_FF30]);
    cpu.set_r(0, 0x301);
    cpu.step();
    assert!(!cpu.state.is_flag(Thumb));
    assert_eq!(cpu.next(), CODE + 4);
}

#[test]
fn multiply_carry_depends_on_version() {
    // muls r0, r1, r2
    let muls = 0xE010_0291;
    let mut arm7 = Arm7::arm(&[muls]);
    let mut arm9 = Arm9::arm(&[muls]);
    for cpu in [&mut arm7.state, &mut arm9.state] {
        cpu.set_flag(Carry, true);
        cpu.registers[1] = 3;
        cpu.registers[2] = 5;
    }
    arm7.step();
    arm9.step();
    assert_eq!(arm7.r(0), 15);
    assert!(!arm7.state.is_flag(Carry));
    assert!(arm9.state.is_flag(Carry));

    // muls r0, r1 in THUMB
    let mut arm7 = Arm7::thumb(&[0x4348]);
    let mut arm9 = Arm9::thumb(&[0x4348]);
    for cpu in [&mut arm7.state, &mut arm9.state] {
        cpu.set_flag(Carry, true);
        cpu.registers[0] = 7;
        cpu.registers[1] = 6;
    }
    arm7.step();
    arm9.step();
    assert_eq!(arm9.r(0), 42);
    assert!(!arm7.state.is_flag(Carry));
    assert!(arm9.state.is_flag(Carry));
}

#[test]
fn qadd_saturates_and_sticks() {
    // qadd r0, r1, r2; qadd r0, r2, r2
    let mut cpu = Arm9::arm(&[0xE102_0051, 0xE102_0052]);
    cpu.set_r(1, i32::MAX as u32);
    cpu.set_r(2, 1);
    cpu.step();
    assert_eq!(cpu.r(0), i32::MAX as u32);
    assert!(cpu.state.is_flag(QClamped));
    cpu.step();
    assert_eq!(cpu.r(0), 2);
    assert!(cpu.state.is_flag(QClamped));

    // Unknown on the ARM7: a no-op that still costs the fetch
    let mut cpu = Arm7::arm(&[0xE102_0051]);
    cpu.set_r(1, i32::MAX as u32);
    assert_eq!(cpu.step(), 1);
    assert_eq!(cpu.r(0), 0);
    assert_eq!(cpu.next(), CODE + 4);
}

#[test]
fn swi_enters_supervisor() {
    // swi 0x50000
    let mut cpu = Arm7::arm(&[0xEF05_0000]);
    cpu.step();
    assert_eq!(cpu.state.mode(), Mode::Supervisor);
    assert_eq!(cpu.next(), 0x8);
    assert_eq!(cpu.state.lr(), CODE + 4);
    assert_eq!(cpu.state.spsr(), 0x1F);
    assert!(cpu.state.is_flag(IrqDisable));
    assert_eq!(cpu.bus.swis, [5]);
}

#[test]
fn swi_with_hle_returns() {
    let mut cpu = Arm9::arm(&[0xEF06_0000]);
    cpu.bus.hle = true;
    let cycles = cpu.step();
    assert_eq!(cycles, 1 + 2 + 10 + 2);
    assert_eq!(cpu.state.mode(), Mode::System);
    assert_eq!(cpu.next(), CODE + 4);

    // THUMB swi returns to THUMB
    let mut cpu = Arm9::thumb(&[0xDF06]);
    cpu.bus.hle = true;
    cpu.step();
    assert!(cpu.state.is_flag(Thumb));
    assert_eq!(cpu.next(), CODE + 2);
    assert_eq!(cpu.bus.swis, [6]);
}

#[test]
fn halt_and_irq() {
    let mut cpu = Arm9::arm(&[0xE1A0_0000]);
    cpu.state.is_halted = true;
    assert_eq!(cpu.step(), 0);
    assert!(cpu.state.is_halted);

    // Enabled and raised wakes up even without IME
    cpu.bus.intr.ie = 1;
    cpu.bus.intr.if_ = 1;
    cpu.step();
    assert!(!cpu.state.is_halted);
    assert_eq!(cpu.next(), CODE + 4);

    // With IME and I clear, an IRQ is taken
    cpu.bus.intr.ime = true;
    cpu.state.set_flag(IrqDisable, false);
    cpu.step();
    assert_eq!(cpu.state.mode(), Mode::Irq);
    assert_eq!(cpu.next(), 0x18);
    // subs pc, lr, #4 returns to the interrupted instruction
    assert_eq!(cpu.state.lr(), CODE + 8);
}

#[test]
fn thumb_pop_pc_interworks_on_v5() {
    // pop {pc}
    let mut arm7 = Arm7::thumb(&[0xBD00]);
    let mut arm9 = Arm9::thumb(&[0xBD00]);
    arm7.write(0x1000, 0x300);
    arm7.state.set_sp(0x1000);
    arm9.write(0x1000, 0x300);
    arm9.state.set_sp(0x1000);
    arm7.step();
    arm9.step();

    assert!(arm7.state.is_flag(Thumb));
    assert!(!arm9.state.is_flag(Thumb));
    assert_eq!(arm7.next(), 0x300);
    assert_eq!(arm9.next(), 0x300);
    assert_eq!(arm9.state.sp(), 0x1004);
}

#[test]
fn thumb_long_branch() {
    // bl +4, in two halves
    let mut cpu = Arm7::thumb(&[0xF000, 0xF802]);
    cpu.step();
    assert_eq!(cpu.state.lr(), CODE + 4);
    cpu.step();
    assert_eq!(cpu.next(), CODE + 8);
    assert_eq!(cpu.state.lr(), (CODE + 4) | 1);
}

#[test]
fn thumb_stmia_base_in_list() {
    // stmia r1!, {r0, r1}
    let mut arm7 = Arm7::thumb(&[0xC103]);
    arm7.set_r(0, 0xAA);
    arm7.set_r(1, 0x1000);
    arm7.step();
    assert_eq!(arm7.read(0x1004), 0x1008);

    // ldmia r0!, {r0, r1}
    let mut arm7 = Arm7::thumb(&[0xC803]);
    arm7.write(0x1000, 0x11);
    arm7.set_r(0, 0x1000);
    arm7.step();
    assert_eq!(arm7.r(0), 0x11);
}

#[test]
fn thumb_ldmia_base_in_list_on_v5() {
    // ldmia r0!, {r0, r1}: base not last, written back
    let mut arm9 = Arm9::thumb(&[0xC803]);
    setup_ldm(&mut arm9);
    arm9.step();
    assert_eq!(arm9.r(0), 0x1008);
    assert_eq!(arm9.r(1), 0x22);

    // ldmia r1!, {r0, r1}: base last, loaded value wins
    let mut arm9 = Arm9::thumb(&[0xC903]);
    setup_ldm(&mut arm9);
    arm9.set_r(1, 0x1000);
    arm9.step();
    assert_eq!(arm9.r(0), 0x11);
    assert_eq!(arm9.r(1), 0x22);
}

#[test]
fn thumb_lsr_immediate_zero_is_32() {
    // lsrs r0, r1, #0
    let mut cpu = Arm7::thumb(&[0x0808]);
    cpu.set_r(1, 0x8000_0000);
    cpu.step();
    assert_eq!(cpu.r(0), 0);
    assert!(cpu.state.is_flag(Carry));
    assert!(cpu.state.is_flag(Zero));
}

#[cfg(feature = "serde")]
#[test]
fn state_round_trip() {
    let mut cpu = Arm9::arm(&[0xE3A0_0001, 0xE3A0_1002]);
    cpu.step();
    cpu.state.set_mode(Mode::Irq);
    cpu.state.set_sp(0x1234);

    let bytes = common::serialize::serialize(&cpu.state, false).unwrap();
    let state: CpuState = common::serialize::deserialize(&bytes, false).unwrap();
    assert_eq!(state, cpu.state);
    assert_eq!(state.next_instruction_address(), cpu.state.next_instruction_address());

    let mut restored = Arm9 {
        state,
        bus: Arm9::arm(&[0xE3A0_0001, 0xE3A0_1002]).bus,
    };
    restored.step();
    cpu.step();
    assert_eq!(restored.state, cpu.state);
    assert_eq!(restored.r(1), 2);
}
