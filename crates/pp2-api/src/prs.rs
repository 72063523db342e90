// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 Oxide Computer Company

//! Parser vocabulary: lookup stages, tag modes and the small enums
//! that select between rule variants.

use super::error::Pp2Error;
use alloc::string::String;
use core::fmt;
use core::fmt::Display;
use core::str::FromStr;
use serde::Deserialize;
use serde::Serialize;

/// A parser lookup stage.
///
/// Each TCAM line matches exactly one stage, and each SRAM line names
/// the stage the next iteration runs against.
#[repr(u8)]
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Deserialize,
    Eq,
    Hash,
    Ord,
    PartialEq,
    PartialOrd,
    Serialize,
)]
pub enum LookupId {
    /// Marvell header.
    #[default]
    Mh = 0,
    Mac = 1,
    Dsa = 2,
    Vlan = 3,
    /// Ethertype.
    L2 = 4,
    Pppoe = 5,
    Ip4 = 6,
    Ip6 = 7,
    Flows = 8,
    Last = 9,
}

impl LookupId {
    pub const ALL: [LookupId; 10] = [
        LookupId::Mh,
        LookupId::Mac,
        LookupId::Dsa,
        LookupId::Vlan,
        LookupId::L2,
        LookupId::Pppoe,
        LookupId::Ip4,
        LookupId::Ip6,
        LookupId::Flows,
        LookupId::Last,
    ];
}

impl From<LookupId> for u8 {
    fn from(lu: LookupId) -> Self {
        lu as u8
    }
}

impl TryFrom<u8> for LookupId {
    type Error = Pp2Error;

    fn try_from(raw: u8) -> Result<Self, Self::Error> {
        LookupId::ALL
            .into_iter()
            .find(|lu| *lu as u8 == raw)
            .ok_or_else(|| {
                Pp2Error::InvalidArg(format!("bad lookup id: {raw}"))
            })
    }
}

impl Display for LookupId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            LookupId::Mh => "MH",
            LookupId::Mac => "MAC",
            LookupId::Dsa => "DSA",
            LookupId::Vlan => "VLAN",
            LookupId::L2 => "L2",
            LookupId::Pppoe => "PPPOE",
            LookupId::Ip4 => "IP4",
            LookupId::Ip6 => "IP6",
            LookupId::Flows => "FLOWS",
            LookupId::Last => "LAST",
        };
        write!(f, "{s}")
    }
}

/// The kind of switch tag a port expects ahead of the Ethernet
/// payload.
#[repr(u8)]
#[derive(
    Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize,
)]
#[serde(rename_all = "lowercase")]
pub enum TagMode {
    None = 0,
    /// Marvell header.
    #[default]
    Mh = 1,
    Dsa = 2,
    /// Extended DSA.
    Edsa = 3,
}

impl TryFrom<u8> for TagMode {
    type Error = Pp2Error;

    fn try_from(raw: u8) -> Result<Self, Self::Error> {
        match raw {
            0 => Ok(TagMode::None),
            1 => Ok(TagMode::Mh),
            2 => Ok(TagMode::Dsa),
            3 => Ok(TagMode::Edsa),
            _ => Err(Pp2Error::BadTagMode(raw)),
        }
    }
}

impl FromStr for TagMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(TagMode::None),
            "mh" => Ok(TagMode::Mh),
            "dsa" => Ok(TagMode::Dsa),
            "edsa" => Ok(TagMode::Edsa),
            _ => Err(format!("invalid tag mode: {s}")),
        }
    }
}

impl Display for TagMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            TagMode::None => "none",
            TagMode::Mh => "mh",
            TagMode::Dsa => "dsa",
            TagMode::Edsa => "edsa",
        };
        write!(f, "{s}")
    }
}

/// Which of the two multicast placeholder rules to toggle.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum McastKind {
    /// Every DA with first octet 0x01.
    All,
    /// IPv6 multicast DAs (first octet 0x33).
    Ip6,
}

impl McastKind {
    /// First DA octet this rule matches on.
    pub fn da_prefix(&self) -> u8 {
        match self {
            McastKind::All => 0x01,
            McastKind::Ip6 => 0x33,
        }
    }
}

impl FromStr for McastKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "all" => Ok(McastKind::All),
            "ip6" => Ok(McastKind::Ip6),
            _ => Err(format!("invalid multicast kind: {s}")),
        }
    }
}

/// An L3 destination address class.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum L3Cast {
    Unicast,
    Multicast,
    Broadcast,
}

impl Display for L3Cast {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            L3Cast::Unicast => "unicast",
            L3Cast::Multicast => "multicast",
            L3Cast::Broadcast => "broadcast",
        };
        write!(f, "{s}")
    }
}

/// Software-only tag recorded in the shadow table describing which
/// family of user-defined rule owns a line.
#[repr(u8)]
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Deserialize,
    Eq,
    Hash,
    PartialEq,
    Serialize,
)]
pub enum UdfKind {
    #[default]
    MacDef = 0,
    MacRange = 1,
    L2Def = 2,
    L2DefCopy = 3,
    L2User = 4,
}

impl Display for UdfKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            UdfKind::MacDef => "mac-def",
            UdfKind::MacRange => "mac-range",
            UdfKind::L2Def => "l2-def",
            UdfKind::L2DefCopy => "l2-def-copy",
            UdfKind::L2User => "l2-user",
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn lookup_id_raw() {
        for lu in LookupId::ALL {
            assert_eq!(LookupId::try_from(u8::from(lu)).unwrap(), lu);
        }
        assert!(LookupId::try_from(10).is_err());
    }

    #[test]
    fn tag_mode_raw() {
        assert_eq!(TagMode::try_from(3).unwrap(), TagMode::Edsa);
        assert_eq!(TagMode::try_from(7), Err(Pp2Error::BadTagMode(7)));
        assert_eq!("EDSA".parse::<TagMode>().unwrap(), TagMode::Edsa);
    }
}
