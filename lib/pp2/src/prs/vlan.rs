// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 Oxide Computer Company

//! VLAN tag recognition.
//!
//! Single, double and triple tag lines share the VLAN stage and the
//! dynamic pool. The TCAM picks the lowest matching index, so every
//! double-tag line must sit below every single/triple line: a double
//! tag would otherwise be taken for a single one. Pairs take the lowest
//! free line and singles/triples the highest, and both adds check the
//! new index against the other family before placing a line.

use super::PrsEntry;
use super::entry::AI_MASK;
use super::entry::OP_SEL_SHIFT_ADD;
use super::entry::PORT_MASK;
use super::ai;
use super::hdr;
use super::ri;
use super::tid;
use alloc::vec::Vec;
use crate::Pp2;
use crate::regs::Pp2Rw;
use pp2_api::error::Pp2Error;
use pp2_api::error::Result;
use pp2_api::prs::LookupId;
use slog::debug;

fn is_single_or_triple(pe: &PrsEntry) -> bool {
    let bits = pe.sram_ri() & ri::VLAN_MASK;
    bits == ri::VLAN_SINGLE || bits == ri::VLAN_TRIPLE
}

fn is_double(pe: &PrsEntry) -> bool {
    pe.sram_ri() & ri::VLAN_MASK == ri::VLAN_DOUBLE
}

impl<R: Pp2Rw> Pp2<R> {
    /// Pool indices of VLAN-stage lines, ascending.
    fn vlan_indices(&self) -> Vec<u16> {
        self.prs
            .shadow
            .lu_indices(LookupId::Vlan, tid::FIRST_FREE..=tid::LAST_FREE)
            .collect()
    }

    /// Find the single/triple line for `tpid` preceded by AI `ai_bits`.
    pub fn vlan_find(
        &mut self,
        tpid: u16,
        ai_bits: u8,
    ) -> Result<Option<PrsEntry>> {
        for index in self.vlan_indices() {
            let pe = self.prs_hw_read(index)?;
            if !pe.tcam_data_cmp(0, tpid) {
                continue;
            }

            let (tcam_ai, _) = pe.tcam_ai();
            if tcam_ai & !ai::DBL_VLAN != ai_bits {
                continue;
            }

            if is_single_or_triple(&pe) {
                return Ok(Some(pe));
            }
        }

        Ok(None)
    }

    /// Recognize a single tag `tpid` (`ai_bits == SINGLE_VLAN`) or the
    /// last tag of a triple following double-tag AI `ai_bits`, on
    /// exactly the ports in `port_map`.
    pub fn vlan_add(
        &mut self,
        tpid: u16,
        ai_bits: u8,
        port_map: u8,
    ) -> Result<()> {
        let mut pe = match self.vlan_find(tpid, ai_bits)? {
            Some(pe) => pe,
            None => {
                // Singles grow down from the top of the pool, pairs up
                // from the bottom.
                let index = self
                    .prs
                    .shadow
                    .last_free(tid::FIRST_FREE, tid::LAST_FREE)?;

                // The highest double-tag line; zero when there is none.
                let mut boundary = tid::FIRST_FREE - 1;
                for i in self.vlan_indices().into_iter().rev() {
                    if is_double(&self.prs_hw_read(i)?) {
                        boundary = i;
                        break;
                    }
                }

                if index <= boundary {
                    return Err(Pp2Error::VlanOrder { tid: index, boundary });
                }

                let mut pe = PrsEntry::new(index);
                pe.tcam_lu_set(LookupId::Vlan);
                pe.tcam_match_etype(0, tpid);
                pe.sram_next_lu_set(LookupId::L2);
                pe.sram_shift_set(hdr::VLAN_TAG_LEN, OP_SEL_SHIFT_ADD);
                pe.sram_ai_update(0, AI_MASK);

                let tcam_ai = if ai_bits == ai::SINGLE_VLAN {
                    pe.sram_ri_update(ri::VLAN_SINGLE, ri::VLAN_MASK);
                    ai_bits
                } else {
                    pe.sram_ri_update(ri::VLAN_TRIPLE, ri::VLAN_MASK);
                    ai_bits | ai::DBL_VLAN
                };
                pe.tcam_ai_update(tcam_ai, AI_MASK);

                debug!(
                    self.log, "new VLAN rule";
                    "index" => index, "tpid" => tpid,
                );
                pe
            }
        };

        pe.tcam_port_map_set(port_map);
        self.prs_hw_write(&pe)?;
        self.prs.shadow.set(pe.index, LookupId::Vlan);
        Ok(())
    }

    /// Find the double-tag line for the outer/inner pair.
    pub fn double_vlan_find(
        &mut self,
        tpid1: u16,
        tpid2: u16,
    ) -> Result<Option<PrsEntry>> {
        for index in self.vlan_indices() {
            let pe = self.prs_hw_read(index)?;
            if pe.tcam_data_cmp(0, tpid1)
                && pe.tcam_data_cmp(4, tpid2)
                && is_double(&pe)
            {
                return Ok(Some(pe));
            }
        }

        Ok(None)
    }

    /// Recognize the outer/inner tag pair on exactly the ports in
    /// `port_map`. A new pair takes a fresh AI value, which tags the
    /// packet for a possible third tag.
    pub fn double_vlan_add(
        &mut self,
        tpid1: u16,
        tpid2: u16,
        port_map: u8,
    ) -> Result<()> {
        let mut pe = match self.double_vlan_find(tpid1, tpid2)? {
            Some(pe) => pe,
            None => {
                let index = self.prs_next_free()?;
                let dbl_ai = self
                    .prs
                    .dbl_vlan_ai_free()
                    .ok_or(Pp2Error::DblVlanAiExhausted)?;

                // The lowest single/triple line; one past the pool when
                // there is none.
                let mut boundary = tid::LAST_FREE + 1;
                for i in self.vlan_indices() {
                    if is_single_or_triple(&self.prs_hw_read(i)?) {
                        boundary = i;
                        break;
                    }
                }

                if index >= boundary {
                    return Err(Pp2Error::VlanOrder { tid: index, boundary });
                }

                self.prs.dbl_vlan_ai_take(dbl_ai);

                let mut pe = PrsEntry::new(index);
                pe.tcam_lu_set(LookupId::Vlan);
                pe.tcam_match_etype(0, tpid1);
                pe.tcam_match_etype(4, tpid2);
                pe.sram_next_lu_set(LookupId::Vlan);
                pe.sram_shift_set(2 * hdr::VLAN_TAG_LEN, OP_SEL_SHIFT_ADD);
                pe.sram_ri_update(ri::VLAN_DOUBLE, ri::VLAN_MASK);
                pe.sram_ai_update(dbl_ai | ai::DBL_VLAN, AI_MASK);

                debug!(
                    self.log,
                    "new double VLAN rule";
                    "index" => index,
                    "tpid1" => tpid1,
                    "tpid2" => tpid2,
                    "ai" => dbl_ai,
                );
                pe
            }
        };

        pe.tcam_port_map_set(port_map);
        self.prs_hw_write(&pe)?;
        self.prs.shadow.set(pe.index, LookupId::Vlan);
        Ok(())
    }

    /// The fixed VLAN stage: the standard double and single tags, a
    /// catch-all for a double tag with no matching third, and a
    /// catch-all for untagged traffic.
    pub(crate) fn vlan_init(&mut self) -> Result<()> {
        self.double_vlan_add(hdr::ETH_P_8021Q, hdr::ETH_P_8021AD, PORT_MASK)?;
        self.double_vlan_add(hdr::ETH_P_8021Q, hdr::ETH_P_8021Q, PORT_MASK)?;
        self.vlan_add(hdr::ETH_P_8021AD, ai::SINGLE_VLAN, PORT_MASK)?;
        self.vlan_add(hdr::ETH_P_8021Q, ai::SINGLE_VLAN, PORT_MASK)?;

        let mut pe = PrsEntry::new(tid::VLAN_DBL);
        pe.tcam_lu_set(LookupId::Vlan);
        pe.sram_next_lu_set(LookupId::L2);
        pe.sram_ai_update(0, AI_MASK);
        pe.sram_ri_update(ri::VLAN_DOUBLE, ri::VLAN_MASK);
        pe.tcam_ai_update(ai::DBL_VLAN, ai::DBL_VLAN);
        pe.tcam_port_map_set(PORT_MASK);
        self.prs_hw_write(&pe)?;
        self.prs.shadow.set(pe.index, LookupId::Vlan);

        let mut pe = PrsEntry::new(tid::VLAN_NONE);
        pe.tcam_lu_set(LookupId::Vlan);
        pe.sram_next_lu_set(LookupId::L2);
        pe.sram_ri_update(ri::VLAN_NONE, ri::VLAN_MASK);
        pe.tcam_port_map_set(PORT_MASK);
        self.prs_hw_write(&pe)?;
        self.prs.shadow.set(pe.index, LookupId::Vlan);
        Ok(())
    }
}
