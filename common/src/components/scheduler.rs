// Copyright (c) 2024 Leela Aurelia, git@elia.garden
//
// Unless otherwise noted, this file is released and thus subject to the
// terms of the Mozilla Public License Version 2.0 (MPL-2.0) or the
// GNU General Public License Version 3 (GPL-3).
// If a copy of these licenses was not distributed with this file, you can
// obtain them at https://mozilla.org/MPL/2.0/ and http://www.gnu.org/licenses/.

use core::fmt::Debug;

use arrayvec::ArrayVec;

/// Absolute time in system clock cycles.
pub type Time = u64;
/// Signed time, used for deltas.
pub type TimeS = i64;

/// Once the clock passes this point, [Scheduler::reset_base] rebases
/// it and every pending event.
const REBASE_AT: Time = 0xF000_0000;

/// A scheduler used by the emulation cores to schedule peripherals.
/// It is generic over the possible events and keeps them in a
/// sorted list, with the soonest event at the end.
#[derive(Clone)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Scheduler<E: Kind> {
    /// Current time of the scheduler.
    time: Time,
    /// Time of the next event. Signed, since events scheduled with a
    /// negative delay, or still pending across a rebase, can lie before 0.
    next: TimeS,
    /// Events currently awaiting execution.
    #[cfg_attr(feature = "serde", serde(bound = ""))]
    events: ArrayVec<ScheduledEvent<E>, 32>,
}

impl<E: Kind> Scheduler<E> {
    /// Schedule an event of the given kind after the given amount
    /// of cycles have elapsed from now.
    /// The delay can be zero or negative; such events fire on the next
    /// call to [Self::advance_to].
    /// If an event of the same kind is already pending, it is replaced.
    pub fn schedule(&mut self, kind: E, after: TimeS) {
        if let Some(idx) = self.events.iter().position(|e| e.kind == kind) {
            self.events.remove(idx);
        }
        if self.events.is_full() {
            log::warn!("Scheduler queue full, dropping event {kind:?}");
            return;
        }

        let time = (self.time as TimeS).saturating_add(after);
        let event = ScheduledEvent {
            kind,
            execute_at: time,
        };
        self.events.push(event);

        // Keep the list sorted by swapping the new element further back
        // until it is in the right spot. Events with the same time stay
        // in insertion order.
        let mut idx = self.events.len() - 1;
        while idx > 0 {
            let other = self.events[idx - 1];
            if time >= other.execute_at {
                self.events[idx] = other;
                idx -= 1;
            } else {
                break;
            }
        }
        self.events[idx] = event;
        self.update_next();
    }

    /// Fire every event due at or before `target`, in order, then set the
    /// clock to `target`.
    /// The handler is given the scheduler with its clock set to the time of
    /// the event, so it can schedule followups relative to it.
    pub fn advance_to(&mut self, target: Time, mut handler: impl FnMut(&mut Self, Event<E>)) {
        while let Some(event) = self.pop_due(target) {
            handler(self, event);
        }
        self.time = self.time.max(target);
    }

    /// Take the next event if it is due at or before `target`.
    /// Moves the clock forward to the event's time.
    pub fn pop_due(&mut self, target: Time) -> Option<Event<E>> {
        if self.next > target as TimeS {
            return None;
        }
        let event = self.events.pop()?;
        self.time = self.time.max(event.execute_at.max(0) as Time);
        self.update_next();
        Some(Event {
            kind: event.kind,
            late_by: self.time as TimeS - event.execute_at,
        })
    }

    /// Is there an event due right now?
    #[inline]
    pub fn has_events(&self) -> bool {
        self.next <= self.time as TimeS
    }

    /// Time of the next event, if any. Overdue events report 0.
    pub fn next_event_at(&self) -> Option<Time> {
        self.events.last().map(|e| e.execute_at.max(0) as Time)
    }

    /// Kind of the next event, if any.
    pub fn next_event(&self) -> Option<E> {
        self.events.last().map(|e| e.kind)
    }

    /// Is an event of this exact kind pending?
    pub fn is_scheduled(&self, kind: E) -> bool {
        self.events.iter().any(|e| e.kind == kind)
    }

    /// Amount of pending events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    #[inline]
    pub fn now(&self) -> Time {
        self.time
    }

    /// Keep the clock from growing forever by subtracting a fixed bias
    /// from it and from all pending events, once it is large enough.
    /// Relative order and distances are unchanged.
    /// Returns the bias that was subtracted (0 if nothing happened);
    /// owners of other clocks derived from this one must subtract it too.
    pub fn reset_base(&mut self) -> Time {
        if self.time < REBASE_AT {
            return 0;
        }
        self.time -= REBASE_AT;
        for event in &mut self.events {
            event.execute_at -= REBASE_AT as TimeS;
        }
        self.update_next();
        REBASE_AT
    }

    fn update_next(&mut self) {
        self.next = self.events.last().map_or(TimeS::MAX, |e| e.execute_at);
    }
}

impl<E: Kind> Default for Scheduler<E> {
    fn default() -> Self {
        Self {
            time: 0,
            next: TimeS::MAX,
            events: ArrayVec::new(),
        }
    }
}

/// An event awaiting execution
#[derive(Copy, Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
struct ScheduledEvent<E: Kind> {
    /// Kind of event to execute
    #[cfg_attr(feature = "serde", serde(bound = ""))]
    kind: E,
    /// Time of the scheduler to execute it at
    execute_at: TimeS,
}

/// Trait for event kinds.
#[cfg(feature = "serde")]
pub trait Kind:
    for<'de> serde::Deserialize<'de> + serde::Serialize + PartialEq + Copy + Clone + Debug
{
}
#[cfg(not(feature = "serde"))]
pub trait Kind: PartialEq + Copy + Clone + Debug {}

/// Event that is ready to be handled.
#[derive(Copy, Clone, Debug)]
pub struct Event<E: Kind> {
    /// The kind of event to handle
    pub kind: E,
    /// By how many ticks the event was delayed by. This is only non-zero
    /// for events that were scheduled in the past with a negative delay.
    pub late_by: TimeS,
}
