// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 Oxide Computer Company

//! The IPv4 and IPv6 stages.
//!
//! Each runs twice per packet. The first pass looks at the protocol
//! field, records the L4 protocol and sets an AI bit; the second pass,
//! which only matches with that bit set, classifies the destination
//! address and hands off to flow generation.

use super::PrsEntry;
use super::ai;
use super::entry::OP_SEL_SHIFT_ADD;
use super::entry::OP_SEL_UDF_ADD;
use super::entry::PORT_MASK;
use super::entry::UdfType;
use super::hdr;
use super::ri;
use super::tid;
use crate::Pp2;
use crate::regs::Pp2Rw;
use pp2_api::error::Pp2Error;
use pp2_api::error::Result;
use pp2_api::prs::L3Cast;
use pp2_api::prs::LookupId;

/// From the IPv4 identification field to the destination address.
const IPV4_ID_TO_DIP: i16 = 12;

/// L4 offset exported by the IPv4 protocol lines.
const IPV4_L4_OFFS: i16 = 16;

/// From the IPv6 destination address back to the next-header field.
const IPV6_DIP_TO_NH: i16 = -18;

/// L4 offset exported by the IPv6 protocol lines.
const IPV6_L4_OFFS: i16 = 34;

/// L4 offset exported by the unknown IPv6 protocol line.
const IPV6_UN_L4_OFFS: i16 = 36;

impl<R: Pp2Rw> Pp2<R> {
    fn ip_commit(&mut self, pe: &PrsEntry, lu: LookupId) -> Result<()> {
        self.prs_hw_write(pe)?;
        self.prs.shadow.set(pe.index, lu);
        Ok(())
    }

    /// Recognize IPv4 protocol `proto`, recording `ri_bits` under
    /// `ri_mask`. Builds two lines: one for whole datagrams and one for
    /// fragments.
    pub fn ip4_proto(
        &mut self,
        proto: u8,
        ri_bits: u32,
        ri_mask: u32,
    ) -> Result<()> {
        if !matches!(
            proto,
            hdr::IPPROTO_TCP | hdr::IPPROTO_UDP | hdr::IPPROTO_IGMP
        ) {
            return Err(Pp2Error::BadProto(proto));
        }

        let mut pe = PrsEntry::new(self.prs_next_free()?);
        pe.tcam_lu_set(LookupId::Ip4);
        pe.sram_next_lu_set(LookupId::Ip4);
        pe.sram_shift_set(IPV4_ID_TO_DIP, OP_SEL_SHIFT_ADD);
        pe.sram_offset_set(UdfType::L4, IPV4_L4_OFFS, OP_SEL_UDF_ADD);
        pe.sram_ai_update(ai::IPV4_DIP, ai::IPV4_DIP);
        pe.sram_ri_update(
            ri_bits | ri::IP_FRAG_FALSE,
            ri_mask | ri::IP_FRAG_MASK,
        );

        // Fragment offset and MF clear.
        pe.tcam_data_byte_set(2, 0x00, hdr::IPV4_FRAG_MASK_L);
        pe.tcam_data_byte_set(3, 0x00, 0xff);
        pe.tcam_data_byte_set(5, proto, hdr::PROTO_MASK);
        pe.tcam_ai_update(0, ai::IPV4_DIP);
        pe.tcam_port_map_set(PORT_MASK);
        self.ip_commit(&pe, LookupId::Ip4)?;

        pe.index = self.prs_next_free()?;
        pe.sram_ri_reset();
        pe.sram_ri_update(ri_bits, ri_mask);
        pe.sram_ri_update(
            ri_bits | ri::IP_FRAG_TRUE,
            ri_mask | ri::IP_FRAG_MASK,
        );
        pe.tcam_data_byte_set(2, 0x00, 0x00);
        pe.tcam_data_byte_set(3, 0x00, 0x00);
        self.ip_commit(&pe, LookupId::Ip4)
    }

    /// Classify IPv4 multicast or broadcast destinations.
    pub fn ip4_cast(&mut self, cast: L3Cast) -> Result<()> {
        let mut pe = PrsEntry::new(0);
        match cast {
            L3Cast::Multicast => {
                pe.tcam_data_byte_set(0, hdr::IPV4_MC, hdr::IPV4_MC_MASK);
                pe.sram_ri_update(ri::L3_MCAST, ri::L3_ADDR_MASK);
            }
            L3Cast::Broadcast => {
                for i in 0..4 {
                    pe.tcam_data_byte_set(i, hdr::IPV4_BC, 0xff);
                }
                pe.sram_ri_update(ri::L3_BCAST, ri::L3_ADDR_MASK);
            }
            L3Cast::Unicast => return Err(Pp2Error::BadCast(cast)),
        }

        pe.index = self.prs_next_free()?;
        pe.tcam_lu_set(LookupId::Ip4);
        pe.tcam_ai_update(ai::IPV4_DIP, ai::IPV4_DIP);
        pe.sram_next_lu_set(LookupId::Flows);
        pe.sram_flow_gen_set();
        pe.tcam_port_map_set(PORT_MASK);
        self.ip_commit(&pe, LookupId::Ip4)
    }

    /// Recognize IPv6 next header `proto`, recording `ri_bits` under
    /// `ri_mask`.
    pub fn ip6_proto(
        &mut self,
        proto: u8,
        ri_bits: u32,
        ri_mask: u32,
    ) -> Result<()> {
        if !matches!(
            proto,
            hdr::IPPROTO_TCP
                | hdr::IPPROTO_UDP
                | hdr::IPPROTO_ICMPV6
                | hdr::IPPROTO_IPIP
        ) {
            return Err(Pp2Error::BadProto(proto));
        }

        let mut pe = PrsEntry::new(self.prs_next_free()?);
        pe.tcam_lu_set(LookupId::Ip6);
        pe.sram_next_lu_set(LookupId::Flows);
        pe.sram_flow_gen_set();
        pe.sram_ri_update(ri_bits, ri_mask);
        pe.sram_offset_set(UdfType::L4, IPV6_L4_OFFS, OP_SEL_UDF_ADD);
        pe.tcam_data_byte_set(0, proto, hdr::PROTO_MASK);
        pe.tcam_ai_update(ai::IPV6_NO_EXT, ai::IPV6_NO_EXT);
        pe.tcam_port_map_set(PORT_MASK);
        self.ip_commit(&pe, LookupId::Ip6)
    }

    /// Classify IPv6 multicast destinations. Only multicast exists.
    pub fn ip6_cast(&mut self, cast: L3Cast) -> Result<()> {
        if cast != L3Cast::Multicast {
            return Err(Pp2Error::BadCast(cast));
        }

        let mut pe = PrsEntry::new(self.prs_next_free()?);
        pe.tcam_lu_set(LookupId::Ip6);
        pe.sram_next_lu_set(LookupId::Ip6);
        pe.sram_ri_update(ri::L3_MCAST, ri::L3_ADDR_MASK);
        pe.sram_ai_update(ai::IPV6_NO_EXT, ai::IPV6_NO_EXT);
        pe.sram_shift_set(IPV6_DIP_TO_NH, OP_SEL_SHIFT_ADD);
        pe.tcam_data_byte_set(0, hdr::IPV6_MC, hdr::IPV6_MC_MASK);
        pe.tcam_ai_update(0, ai::IPV6_NO_EXT);
        pe.tcam_port_map_set(PORT_MASK);
        self.ip_commit(&pe, LookupId::Ip6)
    }

    pub(crate) fn ip4_init(&mut self) -> Result<()> {
        self.ip4_proto(hdr::IPPROTO_TCP, ri::L4_TCP, ri::L4_PROTO_MASK)?;
        self.ip4_proto(hdr::IPPROTO_UDP, ri::L4_UDP, ri::L4_PROTO_MASK)?;
        self.ip4_proto(
            hdr::IPPROTO_IGMP,
            ri::CPU_CODE_RX_SPEC | ri::UDF3_RX_SPECIAL,
            ri::CPU_CODE_MASK | ri::UDF3_MASK,
        )?;
        self.ip4_cast(L3Cast::Broadcast)?;
        self.ip4_cast(L3Cast::Multicast)?;

        // Unknown protocol: still go on to the address pass.
        let mut pe = PrsEntry::new(tid::IP4_PROTO_UN);
        pe.tcam_lu_set(LookupId::Ip4);
        pe.sram_next_lu_set(LookupId::Ip4);
        pe.sram_shift_set(IPV4_ID_TO_DIP, OP_SEL_SHIFT_ADD);
        pe.sram_offset_set(UdfType::L4, IPV4_L4_OFFS, OP_SEL_UDF_ADD);
        pe.sram_ai_update(ai::IPV4_DIP, ai::IPV4_DIP);
        pe.sram_ri_update(ri::L4_OTHER, ri::L4_PROTO_MASK);
        pe.tcam_ai_update(0, ai::IPV4_DIP);
        pe.tcam_port_map_set(PORT_MASK);
        self.ip_commit(&pe, LookupId::Ip4)?;

        // Unicast destination.
        let mut pe = PrsEntry::new(tid::IP4_ADDR_UN);
        pe.tcam_lu_set(LookupId::Ip4);
        pe.sram_next_lu_set(LookupId::Flows);
        pe.sram_flow_gen_set();
        pe.sram_ri_update(ri::L3_UCAST, ri::L3_ADDR_MASK);
        pe.tcam_ai_update(ai::IPV4_DIP, ai::IPV4_DIP);
        pe.tcam_port_map_set(PORT_MASK);
        self.ip_commit(&pe, LookupId::Ip4)
    }

    pub(crate) fn ip6_init(&mut self) -> Result<()> {
        self.ip6_proto(hdr::IPPROTO_TCP, ri::L4_TCP, ri::L4_PROTO_MASK)?;
        self.ip6_proto(hdr::IPPROTO_UDP, ri::L4_UDP, ri::L4_PROTO_MASK)?;
        self.ip6_proto(
            hdr::IPPROTO_ICMPV6,
            ri::CPU_CODE_RX_SPEC | ri::UDF3_RX_SPECIAL,
            ri::CPU_CODE_MASK | ri::UDF3_MASK,
        )?;
        // IPv4 in IPv6 is parsed no further.
        self.ip6_proto(hdr::IPPROTO_IPIP, ri::UDF7_IP6_LITE, ri::UDF7_MASK)?;
        self.ip6_cast(L3Cast::Multicast)?;

        // Hop limit zero: drop.
        let mut pe = PrsEntry::new(self.prs_next_free()?);
        pe.tcam_lu_set(LookupId::Ip6);
        pe.sram_next_lu_set(LookupId::Flows);
        pe.sram_flow_gen_set();
        pe.sram_ri_update(
            ri::L3_UN | ri::DROP_MASK,
            ri::L3_PROTO_MASK | ri::DROP_MASK,
        );
        pe.tcam_data_byte_set(1, 0x00, hdr::IPV6_HOP_MASK);
        pe.tcam_ai_update(ai::IPV6_NO_EXT, ai::IPV6_NO_EXT);
        self.ip_commit(&pe, LookupId::Ip6)?;

        // Unknown protocol.
        let mut pe = PrsEntry::new(tid::IP6_PROTO_UN);
        pe.tcam_lu_set(LookupId::Ip6);
        pe.sram_next_lu_set(LookupId::Flows);
        pe.sram_flow_gen_set();
        pe.sram_ri_update(ri::L4_OTHER, ri::L4_PROTO_MASK);
        pe.sram_offset_set(UdfType::L4, IPV6_UN_L4_OFFS, OP_SEL_UDF_ADD);
        pe.tcam_ai_update(ai::IPV6_NO_EXT, ai::IPV6_NO_EXT);
        pe.tcam_port_map_set(PORT_MASK);
        self.ip_commit(&pe, LookupId::Ip6)?;

        // Unknown protocol behind extension headers.
        let mut pe = PrsEntry::new(tid::IP6_EXT_PROTO_UN);
        pe.tcam_lu_set(LookupId::Ip6);
        pe.sram_next_lu_set(LookupId::Flows);
        pe.sram_flow_gen_set();
        pe.sram_ri_update(ri::L4_OTHER, ri::L4_PROTO_MASK);
        pe.tcam_ai_update(ai::IPV6_EXT, ai::IPV6_EXT);
        pe.tcam_port_map_set(PORT_MASK);
        self.ip_commit(&pe, LookupId::Ip6)?;

        // Unicast destination: back up to the next-header field.
        let mut pe = PrsEntry::new(tid::IP6_ADDR_UN);
        pe.tcam_lu_set(LookupId::Ip6);
        pe.sram_next_lu_set(LookupId::Ip6);
        pe.sram_ri_update(ri::L3_UCAST, ri::L3_ADDR_MASK);
        pe.sram_ai_update(ai::IPV6_NO_EXT, ai::IPV6_NO_EXT);
        pe.sram_shift_set(IPV6_DIP_TO_NH, OP_SEL_SHIFT_ADD);
        pe.tcam_ai_update(0, ai::IPV6_NO_EXT);
        pe.tcam_port_map_set(PORT_MASK);
        self.ip_commit(&pe, LookupId::Ip6)
    }
}
