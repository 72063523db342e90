// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 Oxide Computer Company

//! The header parser.
//!
//! Rules are built per lookup stage by the submodules below, each of
//! which adds methods to [`crate::Pp2`]. Every builder follows the same
//! shape: search the shadow table for an existing line, create one if
//! there is none, update the calling port's membership, then write the
//! whole line back.

pub mod dsa;
pub mod entry;
pub mod etype;
pub mod flow;
pub mod hw;
pub mod init;
pub mod ip;
pub mod mac;
pub mod shadow;
pub mod vlan;

pub use entry::PrsEntry;
pub use shadow::ShadowEntry;
pub use shadow::ShadowTable;

/// Number of TCAM/SRAM lines.
pub const TCAM_SIZE: u16 = 256;

/// Highest valid line index.
pub const LAST_INDEX: u16 = TCAM_SIZE - 1;

/// Number of double-VLAN AI values; value 0 is never handed out.
pub const DBL_VLANS_MAX: usize = 100;

/// Largest value `port_hw_init` accepts for the first lookup stage.
pub const PORT_LU_MAX: u8 = 0xf;

/// Line indices.
///
/// The dynamic pool is `FIRST_FREE..=LAST_FREE`; everything above it
/// is reserved for rules that are addressed directly and never
/// searched for.
pub mod tid {
    pub const DROP_ALL: u16 = 0;
    pub const FIRST_FREE: u16 = 1;
    pub const LAST_FREE: u16 = 225;
    pub const IP6_EXT_PROTO_UN: u16 = 226;
    pub const MAC_MC_IP6: u16 = 227;
    pub const IP6_ADDR_UN: u16 = 228;
    pub const IP4_ADDR_UN: u16 = 229;
    pub const LAST_DEFAULT_FLOW: u16 = 230;
    pub const FIRST_DEFAULT_FLOW: u16 = 237;
    pub const EDSA_TAGGED: u16 = 238;
    pub const EDSA_UNTAGGED: u16 = 239;
    pub const DSA_TAGGED: u16 = 240;
    pub const DSA_UNTAGGED: u16 = 241;
    pub const ETYPE_EDSA_TAGGED: u16 = 242;
    pub const ETYPE_EDSA_UNTAGGED: u16 = 243;
    pub const ETYPE_DSA_TAGGED: u16 = 244;
    pub const ETYPE_DSA_UNTAGGED: u16 = 245;
    pub const MH_DEFAULT: u16 = 246;
    pub const DSA_DEFAULT: u16 = 247;
    pub const IP6_PROTO_UN: u16 = 248;
    pub const IP4_PROTO_UN: u16 = 249;
    pub const ETH_TYPE_UN: u16 = 250;
    pub const VLAN_DBL: u16 = 251;
    pub const VLAN_NONE: u16 = 252;
    pub const MAC_MC_ALL: u16 = 253;
    pub const MAC_PROMISCUOUS: u16 = 254;
    pub const MAC_NON_PROMISCUOUS: u16 = 255;

    /// The default flow line of `port`.
    pub const fn default_flow(port: u8) -> u16 {
        FIRST_DEFAULT_FLOW - port as u16
    }
}

/// Result-info bits and the masks selecting their fields.
pub mod ri {
    pub const MAC_ME: u32 = 0x1;
    pub const DSA: u32 = 0x2;

    pub const VLAN_MASK: u32 = 0xc;
    pub const VLAN_NONE: u32 = 0x0;
    pub const VLAN_SINGLE: u32 = 0x4;
    pub const VLAN_DOUBLE: u32 = 0x8;
    pub const VLAN_TRIPLE: u32 = 0xc;

    pub const CPU_CODE_MASK: u32 = 0x70;
    pub const CPU_CODE_RX_SPEC: u32 = 0x10;

    pub const L2_CAST_MASK: u32 = 0x600;
    pub const L2_UCAST: u32 = 0x0;
    pub const L2_MCAST: u32 = 0x200;
    pub const L2_BCAST: u32 = 0x400;

    pub const PPPOE: u32 = 0x800;

    pub const L3_PROTO_MASK: u32 = 0x7000;
    pub const L3_UN: u32 = 0x0;
    pub const L3_IP4: u32 = 0x1000;
    pub const L3_IP4_OPT: u32 = 0x2000;
    pub const L3_IP4_OTHER: u32 = 0x3000;
    pub const L3_IP6: u32 = 0x4000;
    pub const L3_IP6_EXT: u32 = 0x5000;
    pub const L3_ARP: u32 = 0x6000;

    pub const L3_ADDR_MASK: u32 = 0x18000;
    pub const L3_UCAST: u32 = 0x0;
    pub const L3_MCAST: u32 = 0x8000;
    pub const L3_BCAST: u32 = 0x18000;

    pub const IP_FRAG_MASK: u32 = 0x20000;
    pub const IP_FRAG_TRUE: u32 = 0x20000;
    pub const IP_FRAG_FALSE: u32 = 0x0;

    pub const UDF3_MASK: u32 = 0x300000;
    pub const UDF3_RX_SPECIAL: u32 = 0x200000;

    pub const L4_PROTO_MASK: u32 = 0x1c00000;
    pub const L4_TCP: u32 = 0x400000;
    pub const L4_UDP: u32 = 0x800000;
    pub const L4_OTHER: u32 = 0xc00000;

    pub const UDF7_MASK: u32 = 0x60000000;
    pub const UDF7_IP6_LITE: u32 = 0x20000000;

    pub const DROP_MASK: u32 = 0x80000000;
}

/// Ancillary-info bits passed between stages.
pub mod ai {
    pub const IPV4_DIP: u8 = 0x1;
    pub const IPV6_NO_EXT: u8 = 0x1;
    pub const IPV6_EXT: u8 = 0x2;
    pub const SINGLE_VLAN: u8 = 0x0;
    pub const DBL_VLAN: u8 = 0x80;
    pub const FLOW_ID_MASK: u8 = 0x3f;
}

/// Header values the fixed tree matches on.
pub mod hdr {
    pub const ETH_P_EDSA: u16 = 0xdada;
    pub const ETH_P_PPP_SES: u16 = 0x8864;
    pub const ETH_P_ARP: u16 = 0x0806;
    pub const ETH_P_LBTD: u16 = 0xfffa;
    pub const ETH_P_IP: u16 = 0x0800;
    pub const ETH_P_IPV6: u16 = 0x86dd;
    pub const ETH_P_8021Q: u16 = 0x8100;
    pub const ETH_P_8021AD: u16 = 0x88a8;
    pub const PPP_IP: u16 = 0x0021;
    pub const PPP_IPV6: u16 = 0x0057;

    pub const IPPROTO_IPIP: u8 = 4;
    pub const IPPROTO_IGMP: u8 = 2;
    pub const IPPROTO_TCP: u8 = 6;
    pub const IPPROTO_UDP: u8 = 17;
    pub const IPPROTO_ICMPV6: u8 = 58;

    pub const IPV4_HEAD: u8 = 0x40;
    pub const IPV4_HEAD_MASK: u8 = 0xf0;
    pub const IPV4_IHL: u8 = 0x5;
    pub const IPV4_IHL_MASK: u8 = 0xf;
    pub const IPV4_MC: u8 = 0xe0;
    pub const IPV4_MC_MASK: u8 = 0xf0;
    pub const IPV4_BC: u8 = 0xff;
    pub const IPV6_MC: u8 = 0xff;
    pub const IPV6_MC_MASK: u8 = 0xff;
    pub const IPV6_HOP_MASK: u8 = 0xff;

    /// Fragment offset and MF bits of the IPv4 flags word, high byte.
    pub const IPV4_FRAG_MASK_L: u8 = 0x3f;
    pub const PROTO_MASK: u8 = 0xff;
    pub const DSA_TAGGED_BIT: u8 = 0x20;

    pub const ETH_TYPE_LEN: i16 = 2;
    pub const VLAN_TAG_LEN: i16 = 4;
    pub const PPPOE_HDR_SIZE: i16 = 8;
    pub const MH_SIZE: i16 = 2;
    pub const DSA_TAG_SIZE: i16 = 4;
    pub const EDSA_TAG_SIZE: i16 = 8;
    pub const MAC_DA_SHIFT: i16 = 12;
}

/// Software state of the parser: the shadow table plus the set of
/// double-VLAN AI values handed out so far.
#[derive(Clone, Debug)]
pub struct ParserState {
    pub(crate) shadow: ShadowTable,
    pub(crate) dbl_vlan_ai: [bool; DBL_VLANS_MAX],
}

impl Default for ParserState {
    fn default() -> Self {
        Self::new()
    }
}

impl ParserState {
    pub fn new() -> Self {
        Self {
            shadow: ShadowTable::new(),
            dbl_vlan_ai: [false; DBL_VLANS_MAX],
        }
    }

    pub fn shadow(&self) -> &ShadowTable {
        &self.shadow
    }

    /// Forget every line and AI value.
    pub fn clear(&mut self) {
        self.shadow.clear();
        self.dbl_vlan_ai = [false; DBL_VLANS_MAX];
    }

    /// The lowest free double-VLAN AI value, if any.
    pub(crate) fn dbl_vlan_ai_free(&self) -> Option<u8> {
        (1..DBL_VLANS_MAX).find(|ai| !self.dbl_vlan_ai[*ai]).map(|ai| ai as u8)
    }

    pub(crate) fn dbl_vlan_ai_take(&mut self, ai: u8) {
        if let Some(used) = self.dbl_vlan_ai.get_mut(usize::from(ai)) {
            *used = true;
        }
    }

    pub fn dbl_vlan_ai_used(&self) -> impl Iterator<Item = u8> + '_ {
        self.dbl_vlan_ai
            .iter()
            .enumerate()
            .filter(|(_, used)| **used)
            .map(|(ai, _)| ai as u8)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn index_layout() {
        assert!(tid::LAST_FREE < tid::IP6_EXT_PROTO_UN);
        assert_eq!(tid::default_flow(0), tid::FIRST_DEFAULT_FLOW);
        assert_eq!(tid::default_flow(7), tid::LAST_DEFAULT_FLOW);
        assert_eq!(tid::MAC_NON_PROMISCUOUS, LAST_INDEX);
    }

    #[test]
    fn dbl_vlan_ai_allocation() {
        let mut st = ParserState::new();
        assert_eq!(st.dbl_vlan_ai_free(), Some(1));
        st.dbl_vlan_ai_take(1);
        assert_eq!(st.dbl_vlan_ai_free(), Some(2));

        for ai in 2..DBL_VLANS_MAX {
            st.dbl_vlan_ai_take(ai as u8);
        }
        assert_eq!(st.dbl_vlan_ai_free(), None);
        assert_eq!(st.dbl_vlan_ai_used().count(), DBL_VLANS_MAX - 1);

        st.clear();
        assert_eq!(st.dbl_vlan_ai_free(), Some(1));
    }
}
