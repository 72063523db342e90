// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 Oxide Computer Company

//! Common routines for integration tests.

// This type of pedantry is more trouble than its worth here.
#![allow(dead_code)]

// Let's make our lives easier and pub use a bunch of stuff.
pub use pp2::Pp2;
pub use pp2::api::cfg::PortCfg;
pub use pp2::api::cfg::Pp2Cfg;
pub use pp2::api::error::Pp2Error;
pub use pp2::api::mac::MacAddr;
pub use pp2::api::prs::LookupId;
pub use pp2::api::prs::McastKind;
pub use pp2::api::prs::TagMode;
pub use pp2::prs::PrsEntry;
pub use pp2::prs::ai;
pub use pp2::prs::hdr;
pub use pp2::prs::hw;
pub use pp2::prs::ri;
pub use pp2::prs::tid;
pub use pp2::regs::Pp2Rw;
pub use pp2::sim::SimRegs;

pub fn test_logger() -> slog::Logger {
    slog::Logger::root(slog::Discard, slog::o!())
}

/// A device over a fresh simulated window; nothing initialized.
pub fn fresh_dev(cfg: Pp2Cfg) -> Pp2<SimRegs> {
    Pp2::new(SimRegs::new(), cfg, &test_logger()).unwrap()
}

/// A device with the default parser tree and classifier in place.
pub fn init_dev(cfg: Pp2Cfg) -> Pp2<SimRegs> {
    let mut pp2 = fresh_dev(cfg);
    pp2.bringup().unwrap();
    pp2
}

/// A four port configuration where every port is described.
pub fn four_port_cfg() -> Pp2Cfg {
    let ports = (0..4)
        .map(|id| {
            let mut p = PortCfg::new(id);
            p.mac = Some(MacAddr::from([0x02, 0x08, 0x20, 0, 0, id]));
            p.first_rxq = id * 8;
            p
        })
        .collect();

    Pp2Cfg { num_ports: 4, ports }
}

pub fn macaddr(s: &str) -> MacAddr {
    s.parse().unwrap()
}

/// Every shadow-valid line must read back valid from hardware with the
/// same lookup stage.
pub fn assert_shadow_consistent(pp2: &mut Pp2<SimRegs>) {
    let valid: Vec<(u16, LookupId)> = pp2
        .shadow()
        .valid_indices()
        .map(|i| (i, pp2.shadow().get(i).unwrap().lu))
        .collect();

    for (index, lu) in valid {
        let pe = pp2
            .prs_hw_read(index)
            .unwrap_or_else(|e| panic!("line {index}: {e}"));
        assert!(!pe.tcam_invalid(), "line {index} invalid in hardware");
        assert_eq!(pe.tcam_lu(), u8::from(lu), "line {index} stage mismatch");
    }
}

/// Indices of VLAN lines in the pool, split into (double, single/triple).
pub fn vlan_families(pp2: &mut Pp2<SimRegs>) -> (Vec<u16>, Vec<u16>) {
    let indices: Vec<u16> = pp2
        .shadow()
        .lu_indices(LookupId::Vlan, tid::FIRST_FREE..=tid::LAST_FREE)
        .collect();

    let mut dbl = vec![];
    let mut single = vec![];
    for i in indices {
        let pe = pp2.prs_hw_read(i).unwrap();
        if pe.sram_ri() & ri::VLAN_MASK == ri::VLAN_DOUBLE {
            dbl.push(i);
        } else {
            single.push(i);
        }
    }
    (dbl, single)
}

/// Every double-tag line sits below every single/triple line.
pub fn assert_vlan_order(pp2: &mut Pp2<SimRegs>) {
    let (dbl, single) = vlan_families(pp2);
    if let (Some(hi), Some(lo)) = (dbl.iter().max(), single.iter().min()) {
        assert!(hi < lo, "double {hi} not below single {lo}");
    }
}
