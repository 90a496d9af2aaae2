// Copyright (c) 2024 Leela Aurelia, git@elia.garden
//
// Unless otherwise noted, this file is released and thus subject to the
// terms of the Mozilla Public License Version 2.0 (MPL-2.0) or the
// GNU General Public License Version 3 (GPL-3).
// If a copy of these licenses was not distributed with this file, you can
// obtain them at https://mozilla.org/MPL/2.0/ and http://www.gnu.org/licenses/.

//! CPU implementations: the bus each CPU sees.
//! Both CPUs run on the ARM9's clock; the ARM7 runs at half its speed,
//! so its cycles count double.

pub mod cp15;
pub mod math;
mod nds7;
mod nds9;

pub const NDS9_CLOCK: u32 = 67_027_964;
