// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 Oxide Computer Company

use alloc::str::FromStr;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;
use core::fmt::Debug;
use core::fmt::Display;
use core::ops::Deref;
use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde::Serializer;
use serde::de;

pub const ETHER_ADDR_LEN: usize = 6;

/// A MAC address.
#[derive(Clone, Copy, Default, Eq, Ord, PartialEq, PartialOrd, Hash)]
pub struct MacAddr {
    inner: [u8; ETHER_ADDR_LEN],
}

impl MacAddr {
    pub const BROADCAST: Self = Self { inner: [0xFF; ETHER_ADDR_LEN] };
    pub const ZERO: Self = Self { inner: [0x00; ETHER_ADDR_LEN] };

    /// Return the bytes of the MAC address.
    #[inline]
    pub fn bytes(&self) -> [u8; ETHER_ADDR_LEN] {
        self.inner
    }

    pub const fn from_const(bytes: [u8; ETHER_ADDR_LEN]) -> Self {
        Self { inner: bytes }
    }

    pub fn is_broadcast(&self) -> bool {
        *self == Self::BROADCAST
    }

    /// The group bit is the least significant bit of the first octet.
    /// Broadcast is a multicast address too.
    pub fn is_multicast(&self) -> bool {
        self.inner[0] & 0x01 != 0
    }
}

impl From<[u8; ETHER_ADDR_LEN]> for MacAddr {
    fn from(bytes: [u8; ETHER_ADDR_LEN]) -> Self {
        Self { inner: bytes }
    }
}

impl From<&[u8; ETHER_ADDR_LEN]> for MacAddr {
    fn from(bytes: &[u8; ETHER_ADDR_LEN]) -> Self {
        Self { inner: *bytes }
    }
}

impl AsRef<[u8]> for MacAddr {
    fn as_ref(&self) -> &[u8] {
        &self.inner
    }
}

impl Deref for MacAddr {
    type Target = [u8];
    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl FromStr for MacAddr {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let octets: Vec<u8> = s
            .split(':')
            .map(|s| {
                u8::from_str_radix(s, 16).map_err(|_| format!("bad octet: {s}"))
            })
            .collect::<Result<Vec<u8>, _>>()?;

        let inner: [u8; ETHER_ADDR_LEN] =
            octets.as_slice().try_into().map_err(|_| {
                format!("incorrect number of bytes: {}", octets.len())
            })?;

        Ok(MacAddr { inner })
    }
}

impl Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            self.inner[0],
            self.inner[1],
            self.inner[2],
            self.inner[3],
            self.inner[4],
            self.inner[5]
        )
    }
}

impl Debug for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "MacAddr({self})")
    }
}

// Configuration files spell addresses the way people do, so the serde
// form is the colon-separated string rather than a byte array.
impl Serialize for MacAddr {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MacAddr {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let s = String::deserialize(d)?;
        s.parse().map_err(de::Error::custom)
    }
}
