// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 Oxide Computer Company

//! Types shared between the PP2 parser engine, its administration
//! tool, and anything else that wants to describe parser state.

#![no_std]
#![deny(unreachable_patterns)]
#![deny(unused_must_use)]

#[cfg(any(feature = "std", test))]
#[macro_use]
extern crate std;

#[macro_use]
extern crate alloc;

pub mod cfg;
pub mod dump;
pub mod error;
pub mod mac;
pub mod prs;

pub use cfg::*;
pub use dump::*;
pub use error::*;
pub use mac::*;
pub use prs::*;

/// The overall version of the API. Bump this whenever a type in this
/// crate changes shape, since dumps produced by one version are fed to
/// tooling built from another.
pub const API_VERSION: u64 = 3;

/// Number of ports a single packet processor can address in the
/// parser's port bitmap.
pub const MAX_PORTS: u8 = 8;
