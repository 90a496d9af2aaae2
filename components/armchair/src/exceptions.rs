// Copyright (c) 2024 Leela Aurelia, git@elia.garden
//
// Unless otherwise noted, this file is released and thus subject to the
// terms of the Mozilla Public License Version 2.0 (MPL-2.0) or the
// GNU General Public License Version 3 (GPL-3).
// If a copy of these licenses was not distributed with this file, you can
// obtain them at https://mozilla.org/MPL/2.0/ and http://www.gnu.org/licenses/.

use common::numutil::NumExt;

use crate::{
    interface::{Bus, CpuVersion},
    memory::Address,
    state::{
        Flag::{FiqDisable, IrqDisable, Thumb},
        Mode,
    },
    Cpu,
};

impl<S: Bus> Cpu<'_, S> {
    /// An exception occurred, jump to the handler and deal with it.
    pub(crate) fn exception_occured(&mut self, kind: Exception) {
        self.bus.exception_happened(self.state, kind);
        if self.state.is_flag(Thumb) {
            self.state.bump_pc(2);
        }

        let cpsr = self.state.cpsr();
        self.state.set_mode(kind.mode());

        self.state.set_flag(Thumb, false);
        self.state.set_flag(IrqDisable, true);
        if let Exception::Reset | Exception::Fiq = kind {
            self.state.set_flag(FiqDisable, true);
        }

        let lr = self.state.pc() - Address(self.state.current_instruction_size());
        self.state.set_lr(lr.0);
        self.state.set_spsr(cpsr);
        let vector = self.bus.exception_vector_base() + kind.vector();
        self.set_pc(vector);
    }

    /// Take an IRQ if one is pending and enabled.
    /// Returns if the IRQ was taken.
    pub(crate) fn check_if_interrupt(&mut self) -> bool {
        if self.bus.interrupts().should_interrupt() && !self.state.is_flag(IrqDisable) {
            log::trace!("{} taking IRQ", S::Version::NAME);
            self.state.bump_pc(4);
            self.exception_occured(Exception::Irq);
            true
        } else {
            false
        }
    }

    /// Software interrupt. The BIOS call is given to the bus first, which
    /// may handle it in place of the BIOS code; the CPU then returns to the
    /// caller like the BIOS would.
    pub(crate) fn software_interrupt(&mut self, comment: u8) {
        self.exception_occured(Exception::Swi);
        if let Some(cycles) = self.bus.hle_swi(self.state, comment) {
            self.tick(cycles);
            let lr = self.state.lr();
            let spsr = self.state.spsr();
            self.state.set_cpsr(spsr);
            self.set_pc(Address(lr));
        }
    }
}

/// Possible interrupts, in the order of their IE/IF bits.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Interrupt {
    VBlank,
    HBlank,
    VCounter,
    Timer0,
    Timer1,
    Timer2,
    Timer3,
    Serial,
    Dma0,
    Dma1,
    Dma2,
    Dma3,
    Joypad,
    GamePak,
    Unused1,
    Unused2,
    IpcSync,
    IpcSendFifoEmpty,
    IpcRecvFifoNotEmpty,
    CardTransferComplete,
    CardIreqMc,
    GeometryFifo,
    ScreensOpen,
    SpiBus,
    Wifi,
}

/// Possible exceptions, in the order of their vectors.
/// Only SWI and IRQ ever get raised here; the rest are listed
/// to keep the vector offsets right.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Exception {
    Reset,
    Undefined,
    Swi,
    PrefetchAbort,
    DataAbort,
    AddressExceeded,
    Irq,
    Fiq,
}

impl Exception {
    /// Vector to set the PC to when this exception occurs.
    fn vector(self) -> Address {
        Address(self as u32 * 4)
    }

    /// Mode to execute the exception in.
    fn mode(self) -> Mode {
        const MODE: [Mode; 8] = [
            Mode::Supervisor,
            Mode::Undefined,
            Mode::Supervisor,
            Mode::Abort,
            Mode::Abort,
            Mode::Supervisor,
            Mode::Irq,
            Mode::Fiq,
        ];
        MODE[self as usize]
    }
}

/// IME/IE/IF registers of one CPU.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct InterruptController {
    pub ime: bool,
    pub ie: u32,
    pub if_: u32,
}

impl InterruptController {
    /// Raise the given interrupt in IF.
    pub fn request(&mut self, int: Interrupt) {
        self.if_ = self.if_.set_bit(int as u16, true);
    }

    /// Is any enabled interrupt raised? Wakes the CPU from halt
    /// regardless of IME.
    pub fn is_pending(&self) -> bool {
        (self.ie & self.if_) != 0
    }

    /// Should the CPU take an IRQ, ignoring its own I flag?
    pub fn should_interrupt(&self) -> bool {
        self.ime && self.is_pending()
    }

    /// Acknowledge interrupts: write-1-to-clear.
    pub fn acknowledge(&mut self, bits: u32) {
        self.if_ &= !bits;
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn controller_pending_and_ack() {
        let mut intr = InterruptController::default();
        intr.request(Interrupt::Timer1);
        assert_eq!(intr.if_, 1 << 4);
        assert!(!intr.is_pending());

        intr.ie = 1 << 4;
        assert!(intr.is_pending());
        assert!(!intr.should_interrupt());
        intr.ime = true;
        assert!(intr.should_interrupt());

        intr.acknowledge(1 << 4);
        assert!(!intr.is_pending());
    }

    #[test]
    fn exception_vectors() {
        assert_eq!(Exception::Swi.vector(), Address(8));
        assert_eq!(Exception::Irq.vector(), Address(0x18));
        assert_eq!(Exception::Irq.mode(), Mode::Irq);
        assert_eq!(Exception::Swi.mode(), Mode::Supervisor);
    }
}
