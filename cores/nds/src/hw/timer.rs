// Copyright (c) 2024 Leela Aurelia, git@elia.garden
//
// Unless otherwise noted, this file is released and thus subject to the
// terms of the Mozilla Public License Version 2.0 (MPL-2.0) or the
// GNU General Public License Version 3 (GPL-3).
// If a copy of these licenses was not distributed with this file, you can
// obtain them at https://mozilla.org/MPL/2.0/ and http://www.gnu.org/licenses/.

use armchair::Interrupt;
use common::{components::scheduler::Scheduler, numutil::NumExt, Time, TimeS};
use modular_bitfield::{bitfield, specifiers::*};

use crate::{io::IoSection, scheduling::NdsEvent, System};

/// Prescalers, all 2x to account for the scheduler running on the
/// ARM9's clock, which is double the bus clock the timers count on.
const DIVS: [u16; 4] = [2, 128, 512, 2048];

const IRQS: [Interrupt; 4] = [
    Interrupt::Timer0,
    Interrupt::Timer1,
    Interrupt::Timer2,
    Interrupt::Timer3,
];

#[bitfield]
#[repr(u16)]
#[derive(Debug, Default, Copy, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct TimerCtrl {
    pub prescaler: B2,
    pub count_up: bool,
    #[skip]
    __: B3,
    pub irq_en: bool,
    pub enable: bool,
    #[skip]
    __: B8,
}

impl TimerCtrl {
    /// If a timer with this control runs on the scheduler, instead of
    /// counting overflows of the previous one.
    /// Timer 0 has no previous timer and ignores count-up.
    fn is_scheduled(self, timer: usize) -> bool {
        self.enable() && (timer == 0 || !self.count_up())
    }
}

/// The 4 timers of one CPU.
/// Counting timers run on the scheduler and have their counter
/// calculated on read; count-up timers are incremented by the
/// previous timer's overflow.
#[derive(Debug, Default, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Timers {
    // Registers
    pub reload: [u16; 4],
    pub control: [TimerCtrl; 4],

    /// Counter value. Used for cascading counters; for scheduled counters this
    /// is the value at `scheduled_at`.
    counters: [u16; 4],
    /// The time the counter was last reloaded, if it is on the scheduler.
    scheduled_at: [Time; 4],
}

impl Timers {
    /// Handle overflow of a scheduled timer of CPU `cpu`.
    pub fn handle_overflow_event(sys: &mut System, cpu: usize, timer: usize, late_by: TimeS) {
        if !sys.timers[cpu].control[timer].is_scheduled(timer) {
            // Disabled or switched to count-up since it was scheduled
            return;
        }

        let until_ov = Self::overflow(sys, cpu, timer) as TimeS;
        let now = sys.scheduler.now();
        sys.timers[cpu].scheduled_at[timer] = now.wrapping_sub(late_by as Time);
        // With high reload and fast timers, late_by can exceed until_ov;
        // the next overflow then fires right away.
        sys.scheduler.schedule(
            NdsEvent::TimerOverflow {
                timer: timer.u8(),
                is_arm9: cpu == 1,
            },
            until_ov - late_by,
        );
    }

    /// Read current counter of the given timer.
    pub fn time_read(&self, timer: usize, now: Time) -> u16 {
        let ctrl = self.control[timer];
        if ctrl.is_scheduled(timer) {
            let scaler = DIVS[ctrl.prescaler().us()] as Time;
            let elapsed = now.wrapping_sub(self.scheduled_at[timer]);
            self.counters[timer].wrapping_add((elapsed / scaler) as u16)
        } else {
            self.counters[timer]
        }
    }

    /// Handle CTRL write by scheduling the timer as appropriate.
    pub fn hi_write(
        &mut self,
        is_arm9: bool,
        sched: &mut Scheduler<NdsEvent>,
        timer: usize,
        new_ctrl: IoSection<u16>,
    ) {
        let now = sched.now();
        // Catch up the counter first, it might stop counting now
        self.counters[timer] = self.time_read(timer, now);

        let old_ctrl = self.control[timer];
        let new_ctrl = new_ctrl.apply_io_ret(&mut self.control[timer]);
        if !old_ctrl.enable() && new_ctrl.enable() {
            self.counters[timer] = self.reload[timer];
        }

        if new_ctrl.is_scheduled(timer) {
            // Replaces the pending overflow if it was already running
            let until_ov = Self::next_overflow_time(self.counters[timer], new_ctrl);
            self.scheduled_at[timer] = now;
            sched.schedule(
                NdsEvent::TimerOverflow {
                    timer: timer.u8(),
                    is_arm9,
                },
                until_ov as TimeS,
            );
        }
    }

    /// The scheduler moved its clock back by `bias`.
    pub fn rebase(&mut self, bias: Time) {
        for at in &mut self.scheduled_at {
            *at = at.wrapping_sub(bias);
        }
    }

    /// Handle an overflow and return time until the next.
    fn overflow(sys: &mut System, cpu: usize, timer: usize) -> u32 {
        let timers = &mut sys.timers[cpu];
        let ctrl = timers.control[timer];
        let reload = timers.reload[timer];
        timers.counters[timer] = reload;

        if ctrl.irq_en() {
            sys.intr[cpu].request(IRQS[timer]);
        }
        if timer != 3 {
            let next = sys.timers[cpu].control[timer + 1];
            if next.enable() && next.count_up() {
                Self::inc_timer(sys, cpu, timer + 1);
            }
        }

        Self::next_overflow_time(reload, ctrl)
    }

    /// Time until next overflow, for scheduling.
    fn next_overflow_time(counter: u16, ctrl: TimerCtrl) -> u32 {
        let scaler = DIVS[ctrl.prescaler().us()].u32();
        scaler * (0x1_0000 - counter.u32())
    }

    /// Increment a count-up timer.
    fn inc_timer(sys: &mut System, cpu: usize, timer: usize) {
        match sys.timers[cpu].counters[timer].checked_add(1) {
            Some(val) => sys.timers[cpu].counters[timer] = val,
            None => {
                Self::overflow(sys, cpu, timer);
            }
        }
    }
}
