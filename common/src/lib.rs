// Copyright (c) 2024 Leela Aurelia, git@elia.garden
//
// Unless otherwise noted, this file is released and thus subject to the
// terms of the Mozilla Public License Version 2.0 (MPL-2.0) or the
// GNU General Public License Version 3 (GPL-3).
// If a copy of these licenses was not distributed with this file, you can
// obtain them at https://mozilla.org/MPL/2.0/ and http://www.gnu.org/licenses/.

//! Pieces shared between the CPU component and the system cores:
//! the event scheduler, number helpers, configuration and save state
//! serialization.

pub use components::scheduler::{Time, TimeS};
pub use options::SystemConfig;

pub mod components;
pub mod numutil;
pub mod options;
#[cfg(feature = "serde")]
pub mod serialize;
