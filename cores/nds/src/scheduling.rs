// Copyright (c) 2024 Leela Aurelia, git@elia.garden
//
// Unless otherwise noted, this file is released and thus subject to the
// terms of the Mozilla Public License Version 2.0 (MPL-2.0) or the
// GNU General Public License Version 3 (GPL-3).
// If a copy of these licenses was not distributed with this file, you can
// obtain them at https://mozilla.org/MPL/2.0/ and http://www.gnu.org/licenses/.

use common::{components::scheduler::Kind, TimeS};
use NdsEvent::*;

use crate::{hw::timer::Timers, System};

/// Tasks that run on the scheduler.
/// Rescheduling a task that is already pending replaces it; there is no
/// way to cancel one, so handlers check if they still apply.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum NdsEvent {
    /// Stop running, see [crate::Nds::run_for].
    PauseEmulation,
    /// A timer overflow.
    TimerOverflow { timer: u8, is_arm9: bool },
    /// The divider finished.
    DivDone,
    /// The square root unit finished.
    SqrtDone,
}

impl NdsEvent {
    pub fn dispatch(self, sys: &mut System, late_by: TimeS) {
        log::trace!("Firing {self:?} ({late_by} late)");
        match self {
            PauseEmulation => sys.ticking = false,
            TimerOverflow { timer, is_arm9 } => {
                Timers::handle_overflow_event(sys, is_arm9 as usize, timer as usize, late_by)
            }
            DivDone => sys.div.ctrl.set_busy(false),
            SqrtDone => sys.sqrt.ctrl.set_busy(false),
        }
    }
}

impl Kind for NdsEvent {}

impl Default for NdsEvent {
    fn default() -> Self {
        Self::PauseEmulation
    }
}
