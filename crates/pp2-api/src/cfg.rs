// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 Oxide Computer Company

use super::MAX_PORTS;
use super::error::Pp2Error;
use super::error::Result;
use super::mac::MacAddr;
use super::prs::McastKind;
use super::prs::TagMode;
use alloc::vec::Vec;
use serde::Deserialize;
use serde::Serialize;

fn default_num_ports() -> u8 {
    4
}

/// Device-wide configuration.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Pp2Cfg {
    /// Number of ports the parser is initialized for. Each gets a
    /// default flow line and its own pipeline entry configuration.
    #[serde(default = "default_num_ports")]
    pub num_ports: u8,

    /// Per-port settings applied when a port is opened.
    #[serde(default)]
    pub ports: Vec<PortCfg>,
}

impl Default for Pp2Cfg {
    fn default() -> Self {
        Self { num_ports: default_num_ports(), ports: Vec::new() }
    }
}

impl Pp2Cfg {
    pub fn validate(&self) -> Result<()> {
        if self.num_ports == 0 || self.num_ports > MAX_PORTS {
            return Err(Pp2Error::InvalidArg(format!(
                "num_ports must be in 1..={MAX_PORTS}, got {}",
                self.num_ports
            )));
        }

        for (i, port) in self.ports.iter().enumerate() {
            if port.id >= self.num_ports {
                return Err(Pp2Error::BadPort(port.id));
            }

            if self.ports[..i].iter().any(|p| p.id == port.id) {
                return Err(Pp2Error::InvalidArg(format!(
                    "port {} configured twice",
                    port.id
                )));
            }
        }

        Ok(())
    }

    pub fn port(&self, id: u8) -> Option<&PortCfg> {
        self.ports.iter().find(|p| p.id == id)
    }
}

/// Settings for a single port.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct PortCfg {
    pub id: u8,

    /// The port's own unicast address; accepted on open when present.
    #[serde(default)]
    pub mac: Option<MacAddr>,

    /// The first receive queue owned by the port. Used as the default
    /// classifier queue and the oversize-packet queue.
    #[serde(default)]
    pub first_rxq: u8,

    #[serde(default)]
    pub tag_mode: TagMode,

    #[serde(default)]
    pub promisc: bool,

    /// Multicast placeholder rules to join on open.
    #[serde(default)]
    pub mcast: Vec<McastKind>,
}

impl PortCfg {
    pub fn new(id: u8) -> Self {
        Self {
            id,
            mac: None,
            first_rxq: 0,
            tag_mode: TagMode::default(),
            promisc: false,
            mcast: Vec::new(),
        }
    }
}
