// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 Oxide Computer Company

use super::prs::L3Cast;
use alloc::string::String;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

pub type Result<T> = core::result::Result<T, Pp2Error>;

// Values match the illumos/Linux errno numbering; callers on the C
// side of the boundary expect the negated value.
const EIO: i32 = 5;
const ENOMEM: i32 = 12;
const EINVAL: i32 = 22;
const ERANGE: i32 = 34;

#[derive(Clone, Debug, Deserialize, Eq, Error, PartialEq, Serialize)]
pub enum Pp2Error {
    #[error("no free TCAM index in {start}..={end}")]
    NoFreeIndex { start: u16, end: u16 },

    #[error("TCAM index {0} is out of range")]
    BadIndex(u16),

    #[error("TCAM entry {0} is invalidated")]
    EntryInvalid(u16),

    #[error("invalid port {0}")]
    BadPort(u8),

    #[error("unsupported L4 protocol {0}")]
    BadProto(u8),

    #[error("unsupported L3 cast: {0}")]
    BadCast(L3Cast),

    #[error("unsupported tag mode {0}")]
    BadTagMode(u8),

    #[error("invalid argument: {0}")]
    InvalidArg(String),

    #[error("double VLAN AI values exhausted")]
    DblVlanAiExhausted,

    #[error("VLAN entry at {tid} would cross the partition boundary {boundary}")]
    VlanOrder { tid: u16, boundary: u16 },

    #[error("time capture not ready after {retries} retries")]
    CaptureTimeout { retries: u32 },
}

impl Pp2Error {
    /// The negative errno a C caller of the equivalent driver entry
    /// point would have received.
    pub fn to_errno(&self) -> i32 {
        let errno = match self {
            Self::NoFreeIndex { .. }
            | Self::BadIndex(_)
            | Self::EntryInvalid(_)
            | Self::BadPort(_)
            | Self::BadProto(_)
            | Self::BadCast(_)
            | Self::BadTagMode(_)
            | Self::InvalidArg(_) => EINVAL,
            Self::DblVlanAiExhausted => ENOMEM,
            Self::VlanOrder { .. } => ERANGE,
            Self::CaptureTimeout { .. } => EIO,
        };
        -errno
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn errno_classes() {
        assert_eq!(Pp2Error::NoFreeIndex { start: 1, end: 225 }.to_errno(), -22);
        assert_eq!(Pp2Error::VlanOrder { tid: 9, boundary: 8 }.to_errno(), -34);
        assert_eq!(Pp2Error::DblVlanAiExhausted.to_errno(), -12);
        assert_eq!(Pp2Error::CaptureTimeout { retries: 8 }.to_errno(), -5);
    }
}
