// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 Oxide Computer Company

//! The classifier's direct-indexed tables.
//!
//! The lookup-ID table maps a (way, lookup ID) pair to a default
//! receive queue; the flow table holds per-flow decision data. Neither
//! is searched, so neither has a shadow.

use crate::Pp2;
use crate::regs::Pp2Rw;
use pp2_api::dump::ClsLkpEntryDump;
use pp2_api::error::Pp2Error;
use pp2_api::error::Result;

pub const MODE: u32 = 0x1800;
pub const MODE_ACTIVE: u32 = crate::bit(0);
pub const PORT_WAY: u32 = 0x1810;
pub const LKP_INDEX: u32 = 0x1814;
pub const LKP_WAY_SHIFT: u32 = 6;
pub const LKP_LKPID_MASK: u32 = 0x3f;
pub const LKP_TBL: u32 = 0x1818;
pub const LKP_TBL_RXQ_MASK: u32 = 0xff;
pub const LKP_TBL_LOOKUP_EN: u32 = crate::bit(25);
pub const FLOW_INDEX: u32 = 0x1820;
pub const FLOW_TBL0: u32 = 0x1824;
pub const FLOW_TBL1: u32 = 0x1828;
pub const FLOW_TBL2: u32 = 0x182c;
pub const OVERSIZE_RXQ_LOW_BASE: u32 = 0x1980;
pub const OVERSIZE_RXQ_LOW_MASK: u32 = 0x7;

pub const FLOW_TBL_SIZE: usize = 512;
pub const LKP_TBL_SIZE: usize = 64;
pub const LKP_WAYS: usize = 2;

pub const fn oversize_rxq_low(port: u8) -> u32 {
    OVERSIZE_RXQ_LOW_BASE + 4 * port as u32
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ClsLkpEntry {
    pub lkpid: u8,
    pub way: u8,
    pub data: u32,
}

impl ClsLkpEntry {
    pub fn rxq(&self) -> u8 {
        (self.data & LKP_TBL_RXQ_MASK) as u8
    }

    pub fn lookup_en(&self) -> bool {
        self.data & LKP_TBL_LOOKUP_EN != 0
    }

    fn index(&self) -> u32 {
        (u32::from(self.way & 1) << LKP_WAY_SHIFT)
            | (u32::from(self.lkpid) & LKP_LKPID_MASK)
    }

    pub fn to_dump(&self) -> ClsLkpEntryDump {
        ClsLkpEntryDump {
            lkpid: self.lkpid,
            way: self.way,
            rxq: self.rxq(),
            lookup_en: self.lookup_en(),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ClsFlowEntry {
    pub index: u16,
    pub data: [u32; 3],
}

impl<R: Pp2Rw> Pp2<R> {
    /// Enable the classifier and clear both of its tables.
    pub fn cls_default_init(&mut self) {
        self.regs.write(MODE, MODE_ACTIVE);

        for index in 0..FLOW_TBL_SIZE as u16 {
            self.cls_flow_write_raw(&ClsFlowEntry { index, data: [0; 3] });
        }

        for way in 0..LKP_WAYS as u8 {
            for lkpid in 0..LKP_TBL_SIZE as u8 {
                self.cls_lkp_write(&ClsLkpEntry { lkpid, way, data: 0 });
            }
        }
    }

    pub fn cls_lkp_write(&mut self, le: &ClsLkpEntry) {
        self.regs.write(LKP_INDEX, le.index());
        self.regs.write(LKP_TBL, le.data);
    }

    pub fn cls_lkp_read(&mut self, lkpid: u8, way: u8) -> ClsLkpEntry {
        let mut le = ClsLkpEntry { lkpid, way, data: 0 };
        self.regs.write(LKP_INDEX, le.index());
        le.data = self.regs.read(LKP_TBL);
        le
    }

    fn cls_flow_write_raw(&mut self, fe: &ClsFlowEntry) {
        self.regs.write(FLOW_INDEX, u32::from(fe.index));
        self.regs.write(FLOW_TBL0, fe.data[0]);
        self.regs.write(FLOW_TBL1, fe.data[1]);
        self.regs.write(FLOW_TBL2, fe.data[2]);
    }

    pub fn cls_flow_write(&mut self, fe: &ClsFlowEntry) -> Result<()> {
        if usize::from(fe.index) >= FLOW_TBL_SIZE {
            return Err(Pp2Error::BadIndex(fe.index));
        }
        self.cls_flow_write_raw(fe);
        Ok(())
    }

    pub fn cls_flow_read(&mut self, index: u16) -> Result<ClsFlowEntry> {
        if usize::from(index) >= FLOW_TBL_SIZE {
            return Err(Pp2Error::BadIndex(index));
        }

        self.regs.write(FLOW_INDEX, u32::from(index));
        let data = [
            self.regs.read(FLOW_TBL0),
            self.regs.read(FLOW_TBL1),
            self.regs.read(FLOW_TBL2),
        ];
        Ok(ClsFlowEntry { index, data })
    }

    /// Put `port` on way 0 and give it a lookup entry that sends
    /// everything to `first_rxq` with classification disabled.
    pub fn cls_port_default_config(
        &mut self,
        port: u8,
        first_rxq: u8,
    ) -> Result<()> {
        self.check_port(port)?;
        self.regs.modify(PORT_WAY, |v| *v &= !crate::bit(u32::from(port)));

        let mut le = ClsLkpEntry { lkpid: port, way: 0, data: 0 };
        le.data &= !LKP_TBL_RXQ_MASK;
        le.data |= u32::from(first_rxq);
        le.data &= !LKP_TBL_LOOKUP_EN;
        self.cls_lkp_write(&le);
        Ok(())
    }

    /// Send `port`'s oversize packets to `rxq`; only the low bits of
    /// the queue number are kept.
    pub fn cls_oversize_rxq_set(&mut self, port: u8, rxq: u8) -> Result<()> {
        self.check_port(port)?;
        self.regs.write(
            oversize_rxq_low(port),
            u32::from(rxq) & OVERSIZE_RXQ_LOW_MASK,
        );
        Ok(())
    }
}
