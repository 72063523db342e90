// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 Oxide Computer Company

//! The Marvell header, ethertype and PPPoE stages.

use super::PrsEntry;
use super::entry::OP_SEL_SHIFT_ADD;
use super::entry::OP_SEL_UDF_ADD;
use super::entry::PORT_MASK;
use super::entry::UdfType;
use super::hdr;
use super::ri;
use super::tid;
use crate::Pp2;
use crate::regs::Pp2Rw;
use pp2_api::error::Result;
use pp2_api::prs::LookupId;
use pp2_api::prs::UdfKind;

/// IPv4 header bytes skipped ahead of the identification field.
const IPV4_PRE_ID: i16 = 4;

/// IPv6 header bytes ahead of the source address.
const IPV6_PRE_SIP: i16 = 8;

const MAX_L3_ADDR_SIZE: i16 = 16;

impl<R: Pp2Rw> Pp2<R> {
    /// Write an ethertype-stage line and record what it classifies.
    fn etype_commit(
        &mut self,
        pe: &PrsEntry,
        ri_bits: u32,
        ri_mask: u32,
        finish: bool,
    ) -> Result<()> {
        self.prs_hw_write(pe)?;
        let shadow = &mut self.prs.shadow;
        shadow.set(pe.index, LookupId::L2);
        shadow.udf_set(pe.index, UdfKind::L2Def);
        shadow.ri_set(pe.index, ri_bits, ri_mask);
        shadow.finish_set(pe.index, finish);
        Ok(())
    }

    /// Skip the two byte Marvell header on every port.
    pub(crate) fn mh_init(&mut self) -> Result<()> {
        let mut pe = PrsEntry::new(tid::MH_DEFAULT);
        pe.tcam_lu_set(LookupId::Mh);
        pe.sram_shift_set(hdr::MH_SIZE, OP_SEL_SHIFT_ADD);
        pe.sram_next_lu_set(LookupId::Mac);
        pe.tcam_port_map_set(PORT_MASK);
        self.prs_hw_write(&pe)?;
        self.prs.shadow.set(pe.index, LookupId::Mh);
        Ok(())
    }

    /// The ethertype stage: PPPoE, ARP, loop detection, IPv4 with and
    /// without options, IPv6, and a catch-all for the rest.
    pub(crate) fn etype_init(&mut self) -> Result<()> {
        // PPPoE session.
        let mut pe = PrsEntry::new(self.prs_next_free()?);
        pe.tcam_lu_set(LookupId::L2);
        pe.tcam_match_etype(0, hdr::ETH_P_PPP_SES);
        pe.sram_shift_set(hdr::PPPOE_HDR_SIZE, OP_SEL_SHIFT_ADD);
        pe.sram_next_lu_set(LookupId::Pppoe);
        pe.sram_ri_update(ri::PPPOE, ri::PPPOE);
        self.etype_commit(&pe, ri::PPPOE, ri::PPPOE, false)?;

        // ARP.
        let mut pe = PrsEntry::new(self.prs_next_free()?);
        pe.tcam_lu_set(LookupId::L2);
        pe.tcam_match_etype(0, hdr::ETH_P_ARP);
        pe.sram_next_lu_set(LookupId::Flows);
        pe.sram_flow_gen_set();
        pe.sram_ri_update(ri::L3_ARP, ri::L3_PROTO_MASK);
        pe.sram_offset_set(UdfType::L3, hdr::ETH_TYPE_LEN, OP_SEL_UDF_ADD);
        self.etype_commit(&pe, ri::L3_ARP, ri::L3_PROTO_MASK, true)?;

        // Loop detection, handed to the CPU.
        let lbtd_ri = ri::CPU_CODE_RX_SPEC | ri::UDF3_RX_SPECIAL;
        let lbtd_mask = ri::CPU_CODE_MASK | ri::UDF3_MASK;
        let mut pe = PrsEntry::new(self.prs_next_free()?);
        pe.tcam_lu_set(LookupId::L2);
        pe.tcam_match_etype(0, hdr::ETH_P_LBTD);
        pe.sram_next_lu_set(LookupId::Flows);
        pe.sram_flow_gen_set();
        pe.sram_ri_update(lbtd_ri, lbtd_mask);
        pe.sram_offset_set(UdfType::L3, hdr::ETH_TYPE_LEN, OP_SEL_UDF_ADD);
        self.etype_commit(&pe, lbtd_ri, lbtd_mask, true)?;

        // IPv4 with a bare 20 byte header.
        let mut pe = PrsEntry::new(self.prs_next_free()?);
        pe.tcam_lu_set(LookupId::L2);
        pe.tcam_match_etype(0, hdr::ETH_P_IP);
        pe.tcam_data_byte_set(
            hdr::ETH_TYPE_LEN as usize,
            hdr::IPV4_HEAD | hdr::IPV4_IHL,
            hdr::IPV4_HEAD_MASK | hdr::IPV4_IHL_MASK,
        );
        pe.sram_next_lu_set(LookupId::Ip4);
        pe.sram_ri_update(ri::L3_IP4, ri::L3_PROTO_MASK);
        pe.sram_shift_set(hdr::ETH_TYPE_LEN + IPV4_PRE_ID, OP_SEL_SHIFT_ADD);
        pe.sram_offset_set(UdfType::L3, hdr::ETH_TYPE_LEN, OP_SEL_UDF_ADD);
        self.etype_commit(&pe, ri::L3_IP4, ri::L3_PROTO_MASK, false)?;

        // IPv4 with options: the same line with a looser version byte.
        pe.index = self.prs_next_free()?;
        pe.tcam_data_byte_set(
            hdr::ETH_TYPE_LEN as usize,
            hdr::IPV4_HEAD,
            hdr::IPV4_HEAD_MASK,
        );
        pe.sram_ri_reset();
        pe.sram_ri_update(ri::L3_IP4_OPT, ri::L3_PROTO_MASK);
        self.etype_commit(&pe, ri::L3_IP4_OPT, ri::L3_PROTO_MASK, false)?;

        // IPv6: jump to the destination address.
        let mut pe = PrsEntry::new(self.prs_next_free()?);
        pe.tcam_lu_set(LookupId::L2);
        pe.tcam_match_etype(0, hdr::ETH_P_IPV6);
        pe.sram_shift_set(
            hdr::ETH_TYPE_LEN + IPV6_PRE_SIP + MAX_L3_ADDR_SIZE,
            OP_SEL_SHIFT_ADD,
        );
        pe.sram_next_lu_set(LookupId::Ip6);
        pe.sram_ri_update(ri::L3_IP6, ri::L3_PROTO_MASK);
        pe.sram_offset_set(UdfType::L3, hdr::ETH_TYPE_LEN, OP_SEL_UDF_ADD);
        self.etype_commit(&pe, ri::L3_IP6, ri::L3_PROTO_MASK, false)?;

        // Anything else.
        let mut pe = PrsEntry::new(tid::ETH_TYPE_UN);
        pe.tcam_lu_set(LookupId::L2);
        pe.tcam_port_map_set(PORT_MASK);
        pe.sram_flow_gen_set();
        pe.sram_next_lu_set(LookupId::Flows);
        pe.sram_ri_update(ri::L3_UN, ri::L3_PROTO_MASK);
        pe.sram_offset_set(UdfType::L3, hdr::ETH_TYPE_LEN, OP_SEL_UDF_ADD);
        self.etype_commit(&pe, ri::L3_UN, ri::L3_PROTO_MASK, true)?;

        Ok(())
    }

    fn pppoe_commit(&mut self, pe: &PrsEntry) -> Result<()> {
        self.prs_hw_write(pe)?;
        self.prs.shadow.set(pe.index, LookupId::Pppoe);
        Ok(())
    }

    /// The PPPoE stage: IPv4 with and without options, IPv6, and
    /// everything else.
    pub(crate) fn pppoe_init(&mut self) -> Result<()> {
        let mut pe = PrsEntry::new(self.prs_next_free()?);
        pe.tcam_lu_set(LookupId::Pppoe);
        pe.tcam_match_etype(0, hdr::PPP_IP);
        pe.sram_next_lu_set(LookupId::Ip4);
        pe.sram_ri_update(ri::L3_IP4_OPT, ri::L3_PROTO_MASK);
        pe.sram_shift_set(hdr::ETH_TYPE_LEN + IPV4_PRE_ID, OP_SEL_SHIFT_ADD);
        pe.sram_offset_set(UdfType::L3, hdr::ETH_TYPE_LEN, OP_SEL_UDF_ADD);
        self.pppoe_commit(&pe)?;

        pe.index = self.prs_next_free()?;
        pe.tcam_data_byte_set(
            hdr::ETH_TYPE_LEN as usize,
            hdr::IPV4_HEAD | hdr::IPV4_IHL,
            hdr::IPV4_HEAD_MASK | hdr::IPV4_IHL_MASK,
        );
        pe.sram_ri_reset();
        pe.sram_ri_update(ri::L3_IP4, ri::L3_PROTO_MASK);
        self.pppoe_commit(&pe)?;

        let mut pe = PrsEntry::new(self.prs_next_free()?);
        pe.tcam_lu_set(LookupId::Pppoe);
        pe.tcam_match_etype(0, hdr::PPP_IPV6);
        pe.sram_next_lu_set(LookupId::Ip6);
        pe.sram_ri_update(ri::L3_IP6, ri::L3_PROTO_MASK);
        pe.sram_shift_set(hdr::ETH_TYPE_LEN + IPV4_PRE_ID, OP_SEL_SHIFT_ADD);
        pe.sram_offset_set(UdfType::L3, hdr::ETH_TYPE_LEN, OP_SEL_UDF_ADD);
        self.pppoe_commit(&pe)?;

        let mut pe = PrsEntry::new(self.prs_next_free()?);
        pe.tcam_lu_set(LookupId::Pppoe);
        pe.sram_ri_update(ri::L3_UN, ri::L3_PROTO_MASK);
        pe.sram_next_lu_set(LookupId::Flows);
        pe.sram_flow_gen_set();
        pe.sram_offset_set(UdfType::L3, hdr::ETH_TYPE_LEN, OP_SEL_UDF_ADD);
        self.pppoe_commit(&pe)?;

        Ok(())
    }
}
