// Copyright (c) 2024 Leela Aurelia, git@elia.garden
//
// Unless otherwise noted, this file is released and thus subject to the
// terms of the Mozilla Public License Version 2.0 (MPL-2.0) or the
// GNU General Public License Version 3 (GPL-3).
// If a copy of these licenses was not distributed with this file, you can
// obtain them at https://mozilla.org/MPL/2.0/ and http://www.gnu.org/licenses/.

/// Configuration used when initializing the system.
/// These options don't change at runtime.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde_config", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde_config", serde(default))]
pub struct SystemConfig {
    /// If BIOS calls should be handled natively instead of running
    /// BIOS code. Without a BIOS image, this is the only way to service
    /// software interrupts.
    pub hle_bios: bool,
    /// If save states should be compressed.
    pub compress_savestates: bool,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            hle_bios: true,
            compress_savestates: false,
        }
    }
}
