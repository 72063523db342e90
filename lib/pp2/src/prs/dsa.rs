// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 Oxide Computer Company

//! Marvell switch tags (DSA and extended DSA).

use super::PrsEntry;
use super::entry::AI_MASK;
use super::entry::OP_SEL_SHIFT_ADD;
use super::entry::PORT_MASK;
use super::hdr;
use super::ri;
use super::tid;
use crate::Pp2;
use crate::regs::Pp2Rw;
use pp2_api::error::Result;
use pp2_api::prs::LookupId;
use pp2_api::prs::TagMode;

/// Which tag flavour a DSA-stage line handles.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DsaKind {
    Dsa,
    Edsa,
}

impl DsaKind {
    fn tag_size(self) -> i16 {
        match self {
            Self::Dsa => hdr::DSA_TAG_SIZE,
            Self::Edsa => hdr::EDSA_TAG_SIZE,
        }
    }
}

impl<R: Pp2Rw> Pp2<R> {
    /// Add or remove `port` from the line recognizing a bare tag of
    /// the given kind.
    pub fn dsa_tag_set(
        &mut self,
        port: u8,
        add: bool,
        tagged: bool,
        kind: DsaKind,
    ) -> Result<()> {
        self.check_port(port)?;
        let index = match (kind, tagged) {
            (DsaKind::Edsa, true) => tid::EDSA_TAGGED,
            (DsaKind::Edsa, false) => tid::EDSA_UNTAGGED,
            (DsaKind::Dsa, true) => tid::DSA_TAGGED,
            (DsaKind::Dsa, false) => tid::DSA_UNTAGGED,
        };

        let mut pe = self.prs_fixed_entry(index, |index| {
            let mut pe = PrsEntry::new(index);
            pe.tcam_lu_set(LookupId::Dsa);
            pe.sram_shift_set(kind.tag_size(), OP_SEL_SHIFT_ADD);

            if tagged {
                pe.tcam_data_byte_set(
                    0,
                    hdr::DSA_TAGGED_BIT,
                    hdr::DSA_TAGGED_BIT,
                );
                pe.sram_ai_update(0, AI_MASK);
                pe.sram_next_lu_set(LookupId::Vlan);
            } else {
                pe.sram_ri_update(ri::VLAN_NONE, ri::VLAN_MASK);
                pe.sram_next_lu_set(LookupId::L2);
            }

            pe.tcam_port_map_set(0);
            pe
        })?;

        pe.tcam_port_set(port, add);
        self.prs_hw_write(&pe)?;
        self.prs.shadow.set(pe.index, LookupId::Dsa);
        Ok(())
    }

    /// Add or remove `port` from the line recognizing a tag carried
    /// behind the EDSA ethertype.
    pub fn dsa_tag_ethertype_set(
        &mut self,
        port: u8,
        add: bool,
        tagged: bool,
        kind: DsaKind,
    ) -> Result<()> {
        self.check_port(port)?;
        let (index, port_mask) = match (kind, tagged) {
            (DsaKind::Edsa, true) => (tid::ETYPE_EDSA_TAGGED, 0),
            (DsaKind::Edsa, false) => (tid::ETYPE_EDSA_UNTAGGED, 0),
            (DsaKind::Dsa, true) => (tid::ETYPE_DSA_TAGGED, PORT_MASK),
            (DsaKind::Dsa, false) => (tid::ETYPE_DSA_UNTAGGED, PORT_MASK),
        };

        let mut pe = self.prs_fixed_entry(index, |index| {
            let mut pe = PrsEntry::new(index);
            pe.tcam_lu_set(LookupId::Dsa);

            // Ethertype, then two reserved bytes.
            pe.tcam_match_etype(0, hdr::ETH_P_EDSA);
            pe.tcam_match_etype(2, 0);

            pe.sram_ri_update(ri::DSA, ri::DSA);
            pe.sram_shift_set(
                2 + hdr::ETH_TYPE_LEN + kind.tag_size(),
                OP_SEL_SHIFT_ADD,
            );

            if tagged {
                pe.tcam_data_byte_set(
                    (hdr::ETH_TYPE_LEN + 2 + 3) as usize,
                    hdr::DSA_TAGGED_BIT,
                    hdr::DSA_TAGGED_BIT,
                );
                pe.sram_ai_update(0, AI_MASK);
                pe.sram_next_lu_set(LookupId::Vlan);
            } else {
                pe.sram_ri_update(ri::VLAN_NONE, ri::VLAN_MASK);
                pe.sram_next_lu_set(LookupId::L2);
            }

            pe.tcam_port_map_set(port_mask);
            pe
        })?;

        pe.tcam_port_set(port, add);
        self.prs_hw_write(&pe)?;
        self.prs.shadow.set(pe.index, LookupId::Dsa);
        Ok(())
    }

    /// Switch which switch-tag lines `port` belongs to.
    pub fn tag_mode_set(&mut self, port: u8, mode: TagMode) -> Result<()> {
        self.check_port(port)?;
        let (edsa, dsa) = match mode {
            TagMode::Edsa => (true, false),
            TagMode::Dsa => (false, true),
            TagMode::Mh | TagMode::None => (false, false),
        };

        for tagged in [true, false] {
            self.dsa_tag_set(port, edsa, tagged, DsaKind::Edsa)?;
        }
        for tagged in [true, false] {
            self.dsa_tag_set(port, dsa, tagged, DsaKind::Dsa)?;
        }

        slog::debug!(self.log, "tag mode set"; "port" => port, "mode" => %mode);
        Ok(())
    }

    /// The fixed DSA stage: every tag line with no ports, the DSA
    /// ethertype lines, and a default that skips straight to VLAN.
    pub(crate) fn dsa_init(&mut self) -> Result<()> {
        for kind in [DsaKind::Edsa, DsaKind::Dsa] {
            self.dsa_tag_set(0, false, false, kind)?;
            self.dsa_tag_set(0, false, true, kind)?;
        }

        self.dsa_tag_ethertype_set(0, false, false, DsaKind::Edsa)?;
        self.dsa_tag_ethertype_set(0, false, true, DsaKind::Edsa)?;
        self.dsa_tag_ethertype_set(0, true, false, DsaKind::Dsa)?;
        self.dsa_tag_ethertype_set(0, true, true, DsaKind::Dsa)?;

        let mut pe = PrsEntry::new(tid::DSA_DEFAULT);
        pe.tcam_lu_set(LookupId::Dsa);
        pe.sram_next_lu_set(LookupId::Vlan);
        pe.sram_shift_set(0, OP_SEL_SHIFT_ADD);
        pe.sram_ai_update(0, AI_MASK);
        pe.tcam_port_map_set(PORT_MASK);
        self.prs_hw_write(&pe)?;
        self.prs.shadow.set(pe.index, LookupId::Dsa);
        Ok(())
    }
}
