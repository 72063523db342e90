// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 Oxide Computer Company

//! Parser and classifier rule management for the Marvell PP2 packet
//! processor.
//!
//! The parser is a TCAM-driven decision tree: every TCAM line matches
//! a lookup stage, a port bitmap, a few ancillary-info bits and up to
//! eight header bytes, and its paired SRAM line says what to record
//! about the packet and where to look next. This crate lays down the
//! fixed tree at bring-up, keeps a shadow copy of which line is used
//! for what, and updates port membership of individual lines as ports
//! change their filtering needs.

#![cfg_attr(not(any(feature = "std", test)), no_std)]
#![deny(unreachable_patterns)]
#![deny(unused_must_use)]

extern crate alloc;

#[macro_use]
extern crate cfg_if;

pub use pp2_api as api;

pub mod cls;
pub mod dev;
pub mod prs;
pub mod ptp;
pub mod regs;

cfg_if! {
    if #[cfg(any(feature = "std", test))] {
        pub mod print;
        pub mod sim;
    }
}

pub use dev::Pp2;

/// Return value with `bit` set.
pub const fn bit(bit: u32) -> u32 {
    0x1 << bit
}
