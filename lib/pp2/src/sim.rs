// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 Oxide Computer Company

//! A simulated register window.
//!
//! Models the indirect windows the parser and classifier drive: the
//! TCAM and SRAM line arrays behind their index/data registers, and
//! the classifier lookup and flow tables behind theirs. Any other
//! offset behaves as a plain read/write register.

use crate::cls;
use crate::prs::TCAM_SIZE;
use crate::prs::hw;
use crate::regs::Pp2Rw;
use std::cell::RefCell;
use std::collections::BTreeMap;

#[derive(Clone, Debug)]
pub struct SimRegs {
    tcam_idx: u32,
    sram_idx: u32,
    tcam: Vec<[u32; hw::TCAM_WORDS]>,
    sram: Vec<[u32; hw::SRAM_WORDS]>,
    lkp_idx: u32,
    lkp: Vec<u32>,
    flow_idx: u32,
    flows: Vec<[u32; 3]>,
    plain: BTreeMap<u32, u32>,
    reads: RefCell<BTreeMap<u32, usize>>,
}

impl Default for SimRegs {
    fn default() -> Self {
        Self::new()
    }
}

impl SimRegs {
    /// A window with every line zeroed. Note that a zeroed TCAM line
    /// is *valid*; bring-up is expected to invalidate them.
    pub fn new() -> Self {
        Self {
            tcam_idx: 0,
            sram_idx: 0,
            tcam: vec![[0; hw::TCAM_WORDS]; usize::from(TCAM_SIZE)],
            sram: vec![[0; hw::SRAM_WORDS]; usize::from(TCAM_SIZE)],
            lkp_idx: 0,
            lkp: vec![0; cls::LKP_TBL_SIZE * cls::LKP_WAYS],
            flow_idx: 0,
            flows: vec![[0; 3]; cls::FLOW_TBL_SIZE],
            plain: BTreeMap::new(),
            reads: RefCell::new(BTreeMap::new()),
        }
    }

    /// Seed a plain register without going through `write`.
    pub fn poke(&mut self, offset: u32, val: u32) {
        self.plain.insert(offset, val);
    }

    /// Number of times `offset` has been read.
    pub fn reads_of(&self, offset: u32) -> usize {
        self.reads.borrow().get(&offset).copied().unwrap_or(0)
    }

    /// The raw TCAM words of line `index`.
    pub fn tcam_line(&self, index: u16) -> Option<[u32; hw::TCAM_WORDS]> {
        self.tcam.get(usize::from(index)).copied()
    }

    /// The raw SRAM words of line `index`.
    pub fn sram_line(&self, index: u16) -> Option<[u32; hw::SRAM_WORDS]> {
        self.sram.get(usize::from(index)).copied()
    }

    fn tcam_word(offset: u32) -> Option<usize> {
        let word = offset.checked_sub(hw::TCAM_DATA_BASE)? / 4;
        let aligned = (offset - hw::TCAM_DATA_BASE) % 4 == 0;
        (aligned && (word as usize) < hw::TCAM_WORDS).then_some(word as usize)
    }

    fn sram_word(offset: u32) -> Option<usize> {
        let word = offset.checked_sub(hw::SRAM_DATA_BASE)? / 4;
        let aligned = (offset - hw::SRAM_DATA_BASE) % 4 == 0;
        (aligned && (word as usize) < hw::SRAM_WORDS).then_some(word as usize)
    }

    fn flow_word(offset: u32) -> Option<usize> {
        [cls::FLOW_TBL0, cls::FLOW_TBL1, cls::FLOW_TBL2]
            .iter()
            .position(|o| *o == offset)
    }

    fn lkp_slot(&self) -> usize {
        let way = ((self.lkp_idx >> cls::LKP_WAY_SHIFT) & 1) as usize;
        let lkpid = (self.lkp_idx & cls::LKP_LKPID_MASK) as usize;
        way * cls::LKP_TBL_SIZE + lkpid
    }
}

impl Pp2Rw for SimRegs {
    fn read(&self, offset: u32) -> u32 {
        *self.reads.borrow_mut().entry(offset).or_default() += 1;

        if let Some(w) = Self::tcam_word(offset) {
            return self
                .tcam
                .get(self.tcam_idx as usize)
                .map_or(0, |line| line[w]);
        }

        if let Some(w) = Self::sram_word(offset) {
            return self
                .sram
                .get(self.sram_idx as usize)
                .map_or(0, |line| line[w]);
        }

        if let Some(w) = Self::flow_word(offset) {
            return self
                .flows
                .get(self.flow_idx as usize)
                .map_or(0, |line| line[w]);
        }

        match offset {
            hw::TCAM_IDX => self.tcam_idx,
            hw::SRAM_IDX => self.sram_idx,
            cls::LKP_INDEX => self.lkp_idx,
            cls::LKP_TBL => self.lkp[self.lkp_slot()],
            cls::FLOW_INDEX => self.flow_idx,
            _ => self.plain.get(&offset).copied().unwrap_or(0),
        }
    }

    fn write(&mut self, offset: u32, val: u32) {
        if let Some(w) = Self::tcam_word(offset) {
            if let Some(line) = self.tcam.get_mut(self.tcam_idx as usize) {
                line[w] = val;
            }
            return;
        }

        if let Some(w) = Self::sram_word(offset) {
            if let Some(line) = self.sram.get_mut(self.sram_idx as usize) {
                line[w] = val;
            }
            return;
        }

        if let Some(w) = Self::flow_word(offset) {
            if let Some(line) = self.flows.get_mut(self.flow_idx as usize) {
                line[w] = val;
            }
            return;
        }

        match offset {
            hw::TCAM_IDX => self.tcam_idx = val,
            hw::SRAM_IDX => self.sram_idx = val,
            cls::LKP_INDEX => self.lkp_idx = val,
            cls::LKP_TBL => {
                let slot = self.lkp_slot();
                self.lkp[slot] = val;
            }
            cls::FLOW_INDEX => self.flow_idx = val,
            _ => {
                self.plain.insert(offset, val);
            }
        }
    }
}
