// Copyright (c) 2024 Leela Aurelia, git@elia.garden
//
// Unless otherwise noted, this file is released and thus subject to the
// terms of the Mozilla Public License Version 2.0 (MPL-2.0) or the
// GNU General Public License Version 3 (GPL-3).
// If a copy of these licenses was not distributed with this file, you can
// obtain them at https://mozilla.org/MPL/2.0/ and http://www.gnu.org/licenses/.

//! IO register offsets, relative to 0x0400_0000.

// Timers
pub const TM0CNT_L: u32 = 0x100;
pub const TM0CNT_H: u32 = 0x102;

// IPC
pub const IPCSYNC: u32 = 0x180;

// Interrupts
pub const IME: u32 = 0x208;
pub const IE: u32 = 0x210;
pub const IF: u32 = 0x214;

// Math (ARM9)
pub const DIVCNT: u32 = 0x280;
pub const DIV_NUMER_L: u32 = 0x290;
pub const DIV_NUMER_H: u32 = 0x294;
pub const DIV_DENOM_L: u32 = 0x298;
pub const DIV_DENOM_H: u32 = 0x29C;
pub const DIV_RESULT_L: u32 = 0x2A0;
pub const DIV_RESULT_H: u32 = 0x2A4;
pub const DIVREM_RESULT_L: u32 = 0x2A8;
pub const DIVREM_RESULT_H: u32 = 0x2AC;
pub const SQRTCNT: u32 = 0x2B0;
pub const SQRT_RESULT: u32 = 0x2B4;
pub const SQRT_PARAM_L: u32 = 0x2B8;
pub const SQRT_PARAM_H: u32 = 0x2BC;

// System
pub const POSTFLG: u32 = 0x300;
pub const HALTCNT: u32 = 0x301;
