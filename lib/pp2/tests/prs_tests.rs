// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 Oxide Computer Company

//! Parser integration tests.
//!
//! These drive the rule builders against the simulated register
//! window and check the results both through the shadow table and by
//! reading lines back from "hardware".

pub mod common;

use common::*;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::Mutex;
use std::thread;

// Pool lines the default tree allocates, stage by stage.
// Single tags fill from the top of the pool, everything else from the
// bottom.
const POOL_L2: std::ops::RangeInclusive<u16> = 1..=6;
const POOL_VLAN_DBL: std::ops::RangeInclusive<u16> = 7..=8;
const POOL_PPPOE: std::ops::RangeInclusive<u16> = 9..=12;
const POOL_IP6: std::ops::RangeInclusive<u16> = 13..=18;
const POOL_IP4: std::ops::RangeInclusive<u16> = 19..=26;
const POOL_VLAN_SINGLE: std::ops::RangeInclusive<u16> = 224..=225;

fn mac_pool_lines(pp2: &Pp2<SimRegs>) -> Vec<u16> {
    pp2.shadow()
        .lu_indices(LookupId::Mac, tid::FIRST_FREE..=tid::LAST_FREE)
        .collect()
}

// Bring-up on a fresh device leaves valid lines at exactly the
// reserved indices plus a fixed run of pool lines.
#[test]
fn default_init_layout() {
    let mut pp2 = init_dev(Pp2Cfg::default());

    let mut expected: BTreeSet<u16> = [
        tid::DROP_ALL,
        tid::IP6_EXT_PROTO_UN,
        tid::MAC_MC_IP6,
        tid::IP6_ADDR_UN,
        tid::IP4_ADDR_UN,
    ]
    .into_iter()
    .collect();
    expected.extend((0..4).map(tid::default_flow));
    expected.extend(tid::EDSA_TAGGED..=tid::MAC_NON_PROMISCUOUS);
    expected.extend(1..=*POOL_IP4.end());
    expected.extend(POOL_VLAN_SINGLE);

    let valid: BTreeSet<u16> = pp2.shadow().valid_indices().collect();
    assert_eq!(valid, expected);

    let stage = |i: u16| pp2.shadow().get(i).unwrap().lu;
    assert_eq!(stage(tid::MH_DEFAULT), LookupId::Mh);
    assert_eq!(stage(tid::DSA_DEFAULT), LookupId::Dsa);
    assert_eq!(stage(tid::ETH_TYPE_UN), LookupId::L2);
    assert_eq!(stage(tid::IP6_PROTO_UN), LookupId::Ip6);
    assert_eq!(stage(tid::IP4_PROTO_UN), LookupId::Ip4);
    assert_eq!(stage(tid::VLAN_NONE), LookupId::Vlan);
    assert_eq!(stage(tid::default_flow(3)), LookupId::Flows);

    for (range, lu) in [
        (POOL_L2, LookupId::L2),
        (POOL_VLAN_DBL, LookupId::Vlan),
        (POOL_VLAN_SINGLE, LookupId::Vlan),
        (POOL_PPPOE, LookupId::Pppoe),
        (POOL_IP6, LookupId::Ip6),
        (POOL_IP4, LookupId::Ip4),
    ] {
        for i in range {
            assert_eq!(stage(i), lu, "pool line {i}");
        }
    }

    // Unused default flow slots stay free with four ports.
    assert!(!pp2.shadow().is_valid(tid::default_flow(4)));
    assert!(!pp2.shadow().is_valid(tid::LAST_DEFAULT_FLOW));

    assert_shadow_consistent(&mut pp2);
    assert_vlan_order(&mut pp2);
}

#[test]
fn default_init_port_memberships() {
    let mut pp2 = init_dev(Pp2Cfg::default());

    let map = |pp2: &mut Pp2<SimRegs>, i| {
        pp2.prs_hw_read(i).unwrap().tcam_port_map()
    };
    assert_eq!(map(&mut pp2, tid::MAC_NON_PROMISCUOUS), 0xff);
    assert_eq!(map(&mut pp2, tid::MH_DEFAULT), 0xff);
    assert_eq!(map(&mut pp2, tid::ETYPE_DSA_TAGGED), 0xff);

    // Placeholders wait for a port to join.
    for i in [
        tid::DROP_ALL,
        tid::MAC_PROMISCUOUS,
        tid::MAC_MC_ALL,
        tid::MAC_MC_IP6,
        tid::EDSA_TAGGED,
        tid::DSA_UNTAGGED,
        tid::ETYPE_EDSA_TAGGED,
        tid::default_flow(0),
    ] {
        assert_eq!(map(&mut pp2, i), 0, "line {i}");
    }

    // Every port starts at the Marvell header with full loop budget.
    let lookup = pp2.regs().read(hw::INIT_LOOKUP);
    for port in 0..4 {
        let lu = (lookup >> (port * 4)) & 0xf;
        assert_eq!(lu, u32::from(u8::from(LookupId::Mh)));
    }
    assert_eq!(pp2.regs().read(hw::max_loop(0)), 0x0f0f_0f0f);
    assert_eq!(pp2.regs().read(hw::init_offs(0)), 0);
    assert_eq!(pp2.regs().read(hw::TCAM_CTRL), hw::TCAM_EN);
}

#[test]
fn default_init_is_repeatable() {
    let mut pp2 = init_dev(Pp2Cfg::default());
    let first = pp2.shadow_dump();

    pp2.mac_da_accept(0, macaddr("02:08:20:00:00:01"), true).unwrap();
    pp2.vlan_add(0x9100, ai::SINGLE_VLAN, 0x1).unwrap();
    assert_ne!(pp2.shadow_dump(), first);

    pp2.parser_default_init().unwrap();
    assert_eq!(pp2.shadow_dump(), first);
    assert_eq!(pp2.parser().dbl_vlan_ai_used().collect::<Vec<_>>(), [1, 2]);
    assert_shadow_consistent(&mut pp2);
}

#[test]
fn mac_da_accept_is_idempotent() {
    let mut pp2 = init_dev(Pp2Cfg::default());
    let da = macaddr("02:08:20:00:00:01");

    pp2.mac_da_accept(1, da, true).unwrap();
    let after_one = pp2.shadow_dump();
    pp2.mac_da_accept(1, da, true).unwrap();
    assert_eq!(pp2.shadow_dump(), after_one);

    let lines = mac_pool_lines(&pp2);
    assert_eq!(lines.len(), 1);
    let pe = pp2.prs_hw_read(lines[0]).unwrap();
    assert_eq!(pe.tcam_port_map(), 0b0010);
    for (i, b) in da.bytes().iter().enumerate() {
        assert_eq!(pe.tcam_data_byte(i), (*b, 0xff));
    }
    assert_eq!(pe.sram_ri() & ri::MAC_ME, ri::MAC_ME);
    assert_eq!(pe.sram_next_lu(), u8::from(LookupId::Dsa));
    assert_eq!(pe.sram_shift(), hdr::MAC_DA_SHIFT);
}

#[test]
fn mac_da_cast_classes() {
    let mut pp2 = init_dev(Pp2Cfg::default());
    pp2.mac_da_accept(0, MacAddr::BROADCAST, true).unwrap();
    pp2.mac_da_accept(0, macaddr("01:00:5e:00:00:fb"), true).unwrap();

    let lines = mac_pool_lines(&pp2);
    assert_eq!(lines.len(), 2);

    let bcast = pp2.prs_hw_read(lines[0]).unwrap();
    assert_eq!(bcast.sram_ri() & ri::L2_CAST_MASK, ri::L2_BCAST);
    assert_eq!(bcast.sram_ri() & ri::MAC_ME, 0);

    let mcast = pp2.prs_hw_read(lines[1]).unwrap();
    assert_eq!(mcast.sram_ri() & ri::L2_CAST_MASK, ri::L2_MCAST);
}

#[test]
fn mac_da_delete_and_recreate() {
    let mut pp2 = init_dev(Pp2Cfg::default());
    let da = macaddr("02:08:20:00:00:07");

    pp2.mac_da_accept(2, da, true).unwrap();
    let index = mac_pool_lines(&pp2)[0];

    pp2.mac_da_accept(2, da, false).unwrap();
    assert!(!pp2.shadow().is_valid(index));
    assert_eq!(pp2.prs_hw_read(index), Err(Pp2Error::EntryInvalid(index)));
    assert!(mac_pool_lines(&pp2).is_empty());

    // Removing again is a no-op.
    pp2.mac_da_accept(2, da, false).unwrap();

    pp2.mac_da_accept(2, da, true).unwrap();
    let lines = mac_pool_lines(&pp2);
    assert_eq!(lines.len(), 1);
    let pe = pp2.prs_hw_read(lines[0]).unwrap();
    assert!(!pe.tcam_invalid());
    assert_eq!(pe.tcam_port_map(), 0b0100);
    assert_shadow_consistent(&mut pp2);
}

#[test]
fn mac_da_rules_are_per_port() {
    let mut pp2 = init_dev(Pp2Cfg::default());
    let da = macaddr("02:08:20:00:00:09");

    pp2.mac_da_accept(0, da, true).unwrap();
    pp2.mac_da_accept(1, da, true).unwrap();

    let lines = mac_pool_lines(&pp2);
    assert_eq!(lines.len(), 2);
    let maps: Vec<u8> = lines
        .iter()
        .map(|i| pp2.prs_hw_read(*i).unwrap().tcam_port_map())
        .collect();
    assert_eq!(maps, [0b01, 0b10]);
}

#[test]
fn port_map_inversion() {
    let mut pe = PrsEntry::new(30);
    pe.tcam_port_map_set(0b0101);
    // Enable byte of the port field is the top byte of word 4.
    assert_eq!((pe.tcam_word(4) >> 24) as u8, !0b0101u8);
    assert_eq!(pe.tcam_port_map(), 0b0101);

    pe.tcam_port_set(1, true);
    pe.tcam_port_set(0, false);
    assert_eq!(pe.tcam_port_map(), 0b0110);
    assert_eq!((pe.tcam_word(4) >> 24) as u8, !0b0110u8);

    let mut regs = SimRegs::new();
    hw::write(&mut regs, &pe).unwrap();
    assert_eq!(hw::read(&mut regs, 30).unwrap().tcam_port_map(), 0b0110);
}

#[test]
fn port_membership_toggles() {
    let mut pp2 = init_dev(Pp2Cfg::default());

    pp2.mac_promisc_set(2, true).unwrap();
    pp2.mac_promisc_set(0, true).unwrap();
    pp2.mac_promisc_set(2, false).unwrap();
    let pe = pp2.prs_hw_read(tid::MAC_PROMISCUOUS).unwrap();
    assert_eq!(pe.tcam_port_map(), 0b0001);

    pp2.mac_multi_set(McastKind::Ip6, 3, true).unwrap();
    let pe = pp2.prs_hw_read(tid::MAC_MC_IP6).unwrap();
    assert_eq!(pe.tcam_port_map(), 0b1000);
    assert_eq!(pe.tcam_data_byte(0), (0x33, 0xff));

    pp2.mac_drop_all_set(1, true).unwrap();
    let pe = pp2.prs_hw_read(tid::DROP_ALL).unwrap();
    assert_eq!(pe.tcam_port_map(), 0b0010);
    assert_eq!(pe.sram_ri() & ri::DROP_MASK, ri::DROP_MASK);

    assert_eq!(pp2.mac_promisc_set(4, true), Err(Pp2Error::BadPort(4)));
}

#[test]
fn tag_mode_moves_port() {
    let mut pp2 = init_dev(Pp2Cfg::default());
    let map = |pp2: &mut Pp2<SimRegs>, i| {
        pp2.prs_hw_read(i).unwrap().tcam_port_map()
    };

    pp2.tag_mode_set(1, TagMode::Dsa).unwrap();
    assert_eq!(map(&mut pp2, tid::DSA_TAGGED), 0b10);
    assert_eq!(map(&mut pp2, tid::DSA_UNTAGGED), 0b10);
    assert_eq!(map(&mut pp2, tid::EDSA_TAGGED), 0);

    pp2.tag_mode_set(1, TagMode::Edsa).unwrap();
    assert_eq!(map(&mut pp2, tid::DSA_TAGGED), 0);
    assert_eq!(map(&mut pp2, tid::EDSA_TAGGED), 0b10);
    assert_eq!(map(&mut pp2, tid::EDSA_UNTAGGED), 0b10);

    pp2.tag_mode_set(1, TagMode::Mh).unwrap();
    for i in tid::EDSA_TAGGED..=tid::DSA_UNTAGGED {
        assert_eq!(map(&mut pp2, i), 0, "line {i}");
    }

    let edsa = pp2.prs_hw_read(tid::EDSA_TAGGED).unwrap();
    assert_eq!(edsa.sram_shift(), hdr::EDSA_TAG_SIZE);
    assert_eq!(edsa.sram_next_lu(), u8::from(LookupId::Vlan));
    let dsa = pp2.prs_hw_read(tid::DSA_UNTAGGED).unwrap();
    assert_eq!(dsa.sram_shift(), hdr::DSA_TAG_SIZE);
    assert_eq!(dsa.sram_next_lu(), u8::from(LookupId::L2));
}

#[test]
fn double_vlan_pairs_on_fresh_device() {
    let mut pp2 = fresh_dev(Pp2Cfg::default());

    pp2.double_vlan_add(hdr::ETH_P_8021Q, hdr::ETH_P_8021AD, 0b0011).unwrap();
    pp2.double_vlan_add(hdr::ETH_P_8021Q, hdr::ETH_P_8021Q, 0b0001).unwrap();

    let a = pp2
        .double_vlan_find(hdr::ETH_P_8021Q, hdr::ETH_P_8021AD)
        .unwrap()
        .unwrap();
    let b = pp2
        .double_vlan_find(hdr::ETH_P_8021Q, hdr::ETH_P_8021Q)
        .unwrap()
        .unwrap();

    assert_ne!(a.index, b.index);
    assert_eq!(a.tcam_port_map(), 0b0011);
    assert_eq!(b.tcam_port_map(), 0b0001);

    let (a_ai, b_ai) = (a.sram_ai(), b.sram_ai());
    assert_ne!(a_ai, b_ai);
    assert_eq!(a_ai & ai::DBL_VLAN, ai::DBL_VLAN);
    assert_eq!(b_ai & ai::DBL_VLAN, ai::DBL_VLAN);
    assert_eq!(pp2.parser().dbl_vlan_ai_used().collect::<Vec<_>>(), [1, 2]);

    // A single tag lands above both pairs.
    pp2.vlan_add(hdr::ETH_P_8021Q, ai::SINGLE_VLAN, 0b0001).unwrap();
    let single =
        pp2.vlan_find(hdr::ETH_P_8021Q, ai::SINGLE_VLAN).unwrap().unwrap();
    assert!(single.index > a.index.max(b.index));
    assert_vlan_order(&mut pp2);

    // Re-adding a pair reuses its line and AI.
    pp2.double_vlan_add(hdr::ETH_P_8021Q, hdr::ETH_P_8021AD, 0b0100).unwrap();
    let again = pp2
        .double_vlan_find(hdr::ETH_P_8021Q, hdr::ETH_P_8021AD)
        .unwrap()
        .unwrap();
    assert_eq!(again.index, a.index);
    assert_eq!(again.sram_ai(), a_ai);
    assert_eq!(again.tcam_port_map(), 0b0100);
    assert_eq!(pp2.parser().dbl_vlan_ai_used().count(), 2);
}

#[test]
fn triple_vlan_follows_pair_ai() {
    let mut pp2 = fresh_dev(Pp2Cfg::default());
    pp2.double_vlan_add(hdr::ETH_P_8021AD, hdr::ETH_P_8021Q, 0xff).unwrap();
    let pair = pp2
        .double_vlan_find(hdr::ETH_P_8021AD, hdr::ETH_P_8021Q)
        .unwrap()
        .unwrap();
    let pair_ai = pair.sram_ai() & !ai::DBL_VLAN;

    pp2.vlan_add(hdr::ETH_P_8021Q, pair_ai, 0xff).unwrap();
    let triple = pp2.vlan_find(hdr::ETH_P_8021Q, pair_ai).unwrap().unwrap();
    assert_eq!(triple.sram_ri() & ri::VLAN_MASK, ri::VLAN_TRIPLE);
    assert_eq!(triple.tcam_ai(), (pair_ai | ai::DBL_VLAN, 0xff));
    assert!(triple.index > pair.index);

    // The single-tag search doesn't see the triple.
    let single = pp2.vlan_find(hdr::ETH_P_8021Q, ai::SINGLE_VLAN).unwrap();
    assert!(single.is_none());
}

// Fill the whole pool on a fresh device with DA rules on port 0. The
// rule for `line` is removed by `free_line`.
fn fill_pool(pp2: &mut Pp2<SimRegs>) {
    for line in tid::FIRST_FREE..=tid::LAST_FREE {
        pp2.mac_da_accept(0, pool_da(line), true).unwrap();
    }
}

fn pool_da(line: u16) -> MacAddr {
    MacAddr::from([0x02, 0, 0, 0, (line >> 8) as u8, line as u8])
}

fn free_line(pp2: &mut Pp2<SimRegs>, line: u16) {
    pp2.mac_da_accept(0, pool_da(line), false).unwrap();
    assert!(!pp2.shadow().is_valid(line));
}

#[test]
fn double_vlan_above_single_fails() {
    let mut pp2 = fresh_dev(Pp2Cfg::default());
    fill_pool(&mut pp2);

    free_line(&mut pp2, 200);
    pp2.vlan_add(hdr::ETH_P_8021Q, ai::SINGLE_VLAN, 0x1).unwrap();
    assert!(pp2.shadow().is_lu(200, LookupId::Vlan));

    // The only free line is above the single.
    free_line(&mut pp2, 210);
    assert_eq!(
        pp2.double_vlan_add(hdr::ETH_P_8021Q, hdr::ETH_P_8021Q, 0x1),
        Err(Pp2Error::VlanOrder { tid: 210, boundary: 200 })
    );

    // Nothing was consumed by the failed add.
    assert_eq!(pp2.parser().dbl_vlan_ai_used().count(), 0);
    assert!(!pp2.shadow().is_valid(210));
    assert_vlan_order(&mut pp2);
}

#[test]
fn single_vlan_below_double_fails() {
    let mut pp2 = fresh_dev(Pp2Cfg::default());
    fill_pool(&mut pp2);

    free_line(&mut pp2, 100);
    pp2.double_vlan_add(hdr::ETH_P_8021Q, hdr::ETH_P_8021Q, 0x1).unwrap();

    // The only free line is below the pair.
    free_line(&mut pp2, 50);
    let err = pp2
        .vlan_add(hdr::ETH_P_8021Q, ai::SINGLE_VLAN, 0x1)
        .unwrap_err();
    assert_eq!(err, Pp2Error::VlanOrder { tid: 50, boundary: 100 });
    assert_eq!(err.to_errno(), -34);
    assert!(!pp2.shadow().is_valid(50));
    assert_vlan_order(&mut pp2);
}

#[test]
fn vlan_order_after_init() {
    let mut pp2 = init_dev(Pp2Cfg::default());
    let (dbl, single) = vlan_families(&mut pp2);
    assert_eq!(dbl, [7, 8]);
    assert_eq!(single, [224, 225]);

    // New singles go below the init singles, new pairs above the init
    // pairs, leaving the free middle of the pool between them.
    pp2.vlan_add(0x9100, ai::SINGLE_VLAN, 0x3).unwrap();
    let new_single = pp2.vlan_find(0x9100, ai::SINGLE_VLAN).unwrap().unwrap();
    assert_eq!(new_single.index, 223);

    pp2.double_vlan_add(0x9100, 0x9100, 0x3).unwrap();
    let new_pair = pp2.double_vlan_find(0x9100, 0x9100).unwrap().unwrap();
    assert_eq!(new_pair.index, *POOL_IP4.end() + 1);
    assert_eq!(new_pair.tcam_port_map(), 0x3);
    assert_eq!(
        pp2.parser().dbl_vlan_ai_used().collect::<Vec<_>>(),
        [1, 2, 3]
    );
    assert_vlan_order(&mut pp2);

    // A triple after the new pair also lands with the singles.
    let pair_ai = new_pair.sram_ai() & !ai::DBL_VLAN;
    pp2.vlan_add(hdr::ETH_P_8021Q, pair_ai, 0x3).unwrap();
    let triple = pp2.vlan_find(hdr::ETH_P_8021Q, pair_ai).unwrap().unwrap();
    assert_eq!(triple.index, 222);
    assert_vlan_order(&mut pp2);

    // Existing pairs still take port changes.
    pp2.double_vlan_add(hdr::ETH_P_8021Q, hdr::ETH_P_8021Q, 0x1).unwrap();
    let pe = pp2
        .double_vlan_find(hdr::ETH_P_8021Q, hdr::ETH_P_8021Q)
        .unwrap()
        .unwrap();
    assert_eq!(pe.tcam_port_map(), 0x1);
    assert_shadow_consistent(&mut pp2);
}

#[test]
fn default_flow_per_port() {
    let mut pp2 = init_dev(Pp2Cfg::default());
    pp2.default_flow_set(2).unwrap();

    let pe = pp2.prs_hw_read(tid::default_flow(2)).unwrap();
    assert_eq!(pe.tcam_port_map(), 0b0100);
    assert_eq!(pe.sram_ai() & ai::FLOW_ID_MASK, 2);
    assert!(pe.sram_bit(pp2::prs::entry::SRAM_LU_DONE_BIT));

    // The other ports' lines are untouched.
    let pe = pp2.prs_hw_read(tid::default_flow(1)).unwrap();
    assert_eq!(pe.tcam_port_map(), 0);

    let found = pp2.flow_find(2, 0, 0).unwrap().unwrap();
    assert_eq!(found.index, tid::default_flow(2));
    assert_eq!(pp2.default_flow_set(9), Err(Pp2Error::BadPort(9)));
}

#[test]
fn ethertype_lines() {
    let mut pp2 = init_dev(Pp2Cfg::default());

    let arp = pp2.prs_hw_read(2).unwrap();
    assert!(arp.tcam_data_cmp(0, hdr::ETH_P_ARP));
    assert_eq!(arp.sram_ri() & ri::L3_PROTO_MASK, ri::L3_ARP);
    assert_eq!(arp.sram_offset(), (1, hdr::ETH_TYPE_LEN));
    let sh = pp2.shadow().get(2).unwrap();
    assert!(sh.finish);
    assert_eq!(sh.ri, ri::L3_ARP);

    let ip4 = pp2.prs_hw_read(4).unwrap();
    assert_eq!(ip4.tcam_data_byte(2), (0x45, 0xff));
    let ip4_opt = pp2.prs_hw_read(5).unwrap();
    assert_eq!(ip4_opt.tcam_data_byte(2), (0x40, 0xf0));
    assert_eq!(ip4_opt.sram_ri() & ri::L3_PROTO_MASK, ri::L3_IP4_OPT);
    assert!(!pp2.shadow().get(5).unwrap().finish);
}

#[test]
fn port_hw_init_registers() {
    let mut pp2 = fresh_dev(Pp2Cfg { num_ports: 8, ports: vec![] });
    pp2.port_hw_init(5, LookupId::Mac, 0x20, 0x3f).unwrap();
    pp2.port_hw_init(6, LookupId::Vlan, 0xff, 0x41).unwrap();

    let lookup = pp2.regs().read(hw::INIT_LOOKUP);
    assert_eq!((lookup >> 20) & 0xf, u32::from(u8::from(LookupId::Mac)));
    assert_eq!((lookup >> 24) & 0xf, u32::from(u8::from(LookupId::Vlan)));

    let max_loop = pp2.regs().read(hw::max_loop(5));
    assert_eq!((max_loop >> 8) & 0xff, 0x20);
    assert_eq!((max_loop >> 16) & 0xff, 0xff);

    // Offsets are six bits wide.
    let offs = pp2.regs().read(hw::init_offs(6));
    assert_eq!((offs >> 8) & 0xff, 0x3f);
    assert_eq!((offs >> 16) & 0xff, 0x01);

    assert_eq!(
        pp2.port_hw_init(8, LookupId::Mh, 0, 0),
        Err(Pp2Error::BadPort(8))
    );
}

#[test]
fn mac_da_uses_whole_pool() {
    let mut pp2 = fresh_dev(Pp2Cfg::default());
    fill_pool(&mut pp2);
    assert!(pp2.shadow().is_lu(tid::LAST_FREE, LookupId::Mac));

    // A freed first line is reused and the drop-all line stays clear.
    free_line(&mut pp2, tid::FIRST_FREE);
    pp2.mac_da_accept(1, pool_da(0), true).unwrap();
    assert!(pp2.shadow().is_lu(tid::FIRST_FREE, LookupId::Mac));
    assert!(!pp2.shadow().is_valid(tid::DROP_ALL));
    assert_shadow_consistent(&mut pp2);
}

#[test]
fn pool_exhaustion() {
    let mut pp2 = fresh_dev(Pp2Cfg::default());
    let pool = usize::from(tid::LAST_FREE - tid::FIRST_FREE + 1);

    for i in 0..pool {
        let da = MacAddr::from([0x02, 0, 0, 0, (i >> 8) as u8, i as u8]);
        pp2.mac_da_accept(0, da, true).unwrap();
    }

    let err = pp2
        .mac_da_accept(0, macaddr("02:ff:ff:ff:ff:ff"), true)
        .unwrap_err();
    assert!(matches!(err, Pp2Error::NoFreeIndex { .. }));
}

#[test]
fn entry_dump_decodes_line() {
    let mut pp2 = init_dev(Pp2Cfg::default());
    let dump = pp2.entry_dump(tid::MH_DEFAULT).unwrap();
    assert_eq!(dump.lu, u8::from(LookupId::Mh));
    assert_eq!(dump.port_map, 0xff);
    assert_eq!(dump.shift, hdr::MH_SIZE);
    assert_eq!(dump.next_lu, u8::from(LookupId::Mac));

    let json = serde_json::to_string(&pp2.shadow_dump()).unwrap();
    assert!(json.contains("\"index\":246"));

    assert_eq!(pp2.entry_dump(256), Err(Pp2Error::BadIndex(256)));
    assert_eq!(
        pp2.entry_dump(tid::LAST_DEFAULT_FLOW),
        Err(Pp2Error::EntryInvalid(tid::LAST_DEFAULT_FLOW))
    );
}

// Concurrent callers behind a mutex never duplicate a rule.
#[test]
fn concurrent_accepts_share_one_rule() {
    let pp2 = Arc::new(Mutex::new(init_dev(Pp2Cfg::default())));
    let da = macaddr("02:08:20:00:00:42");

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let pp2 = Arc::clone(&pp2);
            thread::spawn(move || {
                pp2.lock().unwrap().mac_da_accept(3, da, true).unwrap();
            })
        })
        .collect();

    for h in handles {
        h.join().unwrap();
    }

    let mut pp2 = pp2.lock().unwrap();
    assert_eq!(mac_pool_lines(&pp2).len(), 1);
    assert_shadow_consistent(&mut pp2);
}
