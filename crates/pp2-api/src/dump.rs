// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 Oxide Computer Company

//! Serializable snapshots of parser and classifier state.

use super::prs::LookupId;
use super::prs::UdfKind;
use alloc::vec::Vec;
use serde::Deserialize;
use serde::Serialize;

/// One valid line of the shadow table.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct ShadowEntryDump {
    pub index: u16,
    pub lu: LookupId,
    pub ri: u32,
    pub ri_mask: u32,
    pub udf: UdfKind,
    pub finish: bool,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct ShadowDump {
    pub entries: Vec<ShadowEntryDump>,
}

/// A decoded TCAM/SRAM line as read back from hardware.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct EntryDump {
    pub index: u16,
    pub lu: u8,
    pub port_map: u8,
    pub ai: u8,
    pub ai_en: u8,
    /// Header bytes as (data, enable) pairs.
    pub data: [(u8, u8); 8],
    pub ri: u32,
    pub ri_ctrl: u32,
    pub sram_ai: u8,
    pub sram_ai_ctrl: u8,
    pub next_lu: u8,
    pub shift: i16,
    pub udf_type: u8,
    pub udf_offset: i16,
    pub lu_done: bool,
    pub flow_gen: bool,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct ClsLkpEntryDump {
    pub lkpid: u8,
    pub way: u8,
    pub rxq: u8,
    pub lookup_en: bool,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct ClsLkpDump {
    pub entries: Vec<ClsLkpEntryDump>,
}
