// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 Oxide Computer Company

//! MAC destination address filtering.

use super::PrsEntry;
use super::entry::OP_SEL_SHIFT_ADD;
use super::hdr::MAC_DA_SHIFT;
use super::ri;
use super::tid;
use alloc::format;
use alloc::vec::Vec;
use crate::Pp2;
use crate::regs::Pp2Rw;
use pp2_api::error::Pp2Error;
use pp2_api::error::Result;
use pp2_api::mac::MacAddr;
use pp2_api::prs::LookupId;
use pp2_api::prs::McastKind;
use pp2_api::prs::UdfKind;
use slog::debug;

const MAC_ALEN: usize = 6;
const ALL_ONES: [u8; MAC_ALEN] = [0xff; MAC_ALEN];

impl<R: Pp2Rw> Pp2<R> {
    /// Drop everything arriving on `port` (`add`) or stop doing so.
    pub fn mac_drop_all_set(&mut self, port: u8, add: bool) -> Result<()> {
        self.check_port(port)?;
        let mut pe = self.prs_fixed_entry(tid::DROP_ALL, |index| {
            let mut pe = PrsEntry::new(index);
            pe.tcam_lu_set(LookupId::Mac);
            pe.sram_ri_update(ri::DROP_MASK, ri::DROP_MASK);
            pe.sram_flow_gen_set();
            pe.sram_next_lu_set(LookupId::Flows);
            pe.tcam_port_map_set(0);
            pe
        })?;

        pe.tcam_port_set(port, add);
        self.prs_hw_write(&pe)?;
        self.prs.shadow.set(pe.index, LookupId::Mac);
        Ok(())
    }

    /// Accept every unicast DA on `port` (`add`) or stop doing so.
    pub fn mac_promisc_set(&mut self, port: u8, add: bool) -> Result<()> {
        self.check_port(port)?;
        let mut pe = self.prs_fixed_entry(tid::MAC_PROMISCUOUS, |index| {
            let mut pe = PrsEntry::new(index);
            pe.tcam_lu_set(LookupId::Mac);
            pe.sram_next_lu_set(LookupId::Dsa);
            pe.sram_ri_update(ri::L2_UCAST, ri::L2_CAST_MASK);
            pe.sram_shift_set(MAC_DA_SHIFT, OP_SEL_SHIFT_ADD);
            pe.tcam_port_map_set(0);
            pe
        })?;

        pe.tcam_port_set(port, add);
        self.prs_hw_write(&pe)?;
        self.prs.shadow.set(pe.index, LookupId::Mac);
        Ok(())
    }

    /// Accept every multicast DA of `kind` on `port` (`add`) or stop
    /// doing so.
    pub fn mac_multi_set(
        &mut self,
        kind: McastKind,
        port: u8,
        add: bool,
    ) -> Result<()> {
        self.check_port(port)?;
        let index = match kind {
            McastKind::All => tid::MAC_MC_ALL,
            McastKind::Ip6 => tid::MAC_MC_IP6,
        };

        let mut pe = self.prs_fixed_entry(index, |index| {
            let mut pe = PrsEntry::new(index);
            pe.tcam_lu_set(LookupId::Mac);
            pe.tcam_data_byte_set(0, kind.da_prefix(), 0xff);
            pe.sram_next_lu_set(LookupId::Dsa);
            pe.sram_ri_update(ri::L2_MCAST, ri::L2_CAST_MASK);
            pe.sram_shift_set(MAC_DA_SHIFT, OP_SEL_SHIFT_ADD);
            pe.tcam_port_map_set(0);
            pe
        })?;

        pe.tcam_port_set(port, add);
        self.prs_hw_write(&pe)?;
        self.prs.shadow.set(pe.index, LookupId::Mac);
        Ok(())
    }

    /// Find the MAC line matching `da` under `mask` for exactly the
    /// ports in `pmap`.
    pub fn mac_da_range_find(
        &mut self,
        pmap: u8,
        da: &MacAddr,
        mask: &[u8; MAC_ALEN],
        udf: UdfKind,
    ) -> Result<Option<PrsEntry>> {
        let candidates: Vec<u16> = self
            .prs
            .shadow
            .lu_indices(LookupId::Mac, tid::FIRST_FREE..=tid::LAST_FREE)
            .filter(|i| self.prs.shadow.get(*i).is_some_and(|e| e.udf == udf))
            .collect();

        for index in candidates {
            let pe = self.prs_hw_read(index)?;
            if mac_range_equals(&pe, da, mask) && pe.tcam_port_map() == pmap {
                return Ok(Some(pe));
            }
        }

        Ok(None)
    }

    /// Add (`add`) or remove `port` from the rule accepting DA `da`.
    ///
    /// A rule is created on first add. Once its last port is removed
    /// the line is invalidated and forgotten, so a later add builds a
    /// fresh one.
    pub fn mac_da_accept(
        &mut self,
        port: u8,
        da: MacAddr,
        add: bool,
    ) -> Result<()> {
        self.check_port(port)?;

        let found =
            self.mac_da_range_find(1 << port, &da, &ALL_ONES, UdfKind::MacDef)?;

        let mut pe = match found {
            Some(pe) => pe,
            None if !add => return Ok(()),
            None => {
                let index = self.prs_next_free()?;
                let mut pe = PrsEntry::new(index);
                pe.tcam_lu_set(LookupId::Mac);
                pe.tcam_port_map_set(0);
                debug!(
                    self.log, "new MAC DA rule";
                    "index" => index, "da" => %da,
                );
                pe
            }
        };

        pe.tcam_port_set(port, add);

        if pe.tcam_port_map() == 0 {
            if add {
                return Err(Pp2Error::InvalidArg(format!(
                    "MAC DA rule {} has no ports after adding port {port}",
                    pe.index
                )));
            }
            self.prs_hw_inv(pe.index)?;
            debug!(
                self.log, "removed MAC DA rule";
                "index" => pe.index, "da" => %da,
            );
            return Ok(());
        }

        pe.sram_next_lu_set(LookupId::Dsa);
        for (i, b) in da.bytes().iter().enumerate() {
            pe.tcam_data_byte_set(i, *b, 0xff);
        }

        let ri_bits = if da.is_broadcast() {
            ri::L2_BCAST
        } else if da.is_multicast() {
            ri::L2_MCAST
        } else {
            ri::L2_UCAST | ri::MAC_ME
        };
        let ri_mask = ri::L2_CAST_MASK | ri::MAC_ME;
        pe.sram_ri_update(ri_bits, ri_mask);
        pe.sram_shift_set(MAC_DA_SHIFT, OP_SEL_SHIFT_ADD);

        self.prs_hw_write(&pe)?;
        self.prs.shadow.set(pe.index, LookupId::Mac);
        self.prs.shadow.ri_set(pe.index, ri_bits, ri_mask);
        self.prs.shadow.udf_set(pe.index, UdfKind::MacDef);
        Ok(())
    }

    /// The fixed MAC stage: drop unknown unicast, plus the drop-all,
    /// promiscuous and multicast placeholders with no ports.
    pub(crate) fn mac_init(&mut self) -> Result<()> {
        let mut pe = PrsEntry::new(tid::MAC_NON_PROMISCUOUS);
        pe.tcam_lu_set(LookupId::Mac);
        pe.sram_ri_update(ri::DROP_MASK, ri::DROP_MASK);
        pe.sram_flow_gen_set();
        pe.sram_next_lu_set(LookupId::Flows);
        pe.tcam_port_map_set(0xff);
        self.prs_hw_write(&pe)?;
        self.prs.shadow.set(pe.index, LookupId::Mac);

        self.mac_drop_all_set(0, false)?;
        self.mac_promisc_set(0, false)?;
        self.mac_multi_set(McastKind::All, 0, false)?;
        self.mac_multi_set(McastKind::Ip6, 0, false)?;
        Ok(())
    }
}

/// Whether every DA byte of `pe` is enabled exactly as `mask` and
/// matches `da` under it.
fn mac_range_equals(
    pe: &PrsEntry,
    da: &MacAddr,
    mask: &[u8; MAC_ALEN],
) -> bool {
    da.bytes().iter().zip(mask.iter()).enumerate().all(|(i, (d, m))| {
        let (byte, en) = pe.tcam_data_byte(i);
        en == *m && byte & en == d & m
    })
}
