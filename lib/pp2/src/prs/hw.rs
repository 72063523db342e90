// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 Oxide Computer Company

//! Moving parser lines between memory and hardware.

use super::LAST_INDEX;
use super::PORT_LU_MAX;
use super::PrsEntry;
use super::tid;
use crate::Pp2;
use crate::regs::Pp2Rw;
use pp2_api::error::Pp2Error;
use pp2_api::error::Result;
use pp2_api::prs::LookupId;

pub const TCAM_WORDS: usize = 6;
pub const SRAM_WORDS: usize = 4;

pub const INIT_LOOKUP: u32 = 0x1000;
pub const INIT_OFFS_BASE: u32 = 0x1004;
pub const MAX_LOOP_BASE: u32 = 0x100c;
pub const TCAM_IDX: u32 = 0x1100;
pub const TCAM_DATA_BASE: u32 = 0x1104;
pub const SRAM_IDX: u32 = 0x1200;
pub const SRAM_DATA_BASE: u32 = 0x1204;
pub const TCAM_CTRL: u32 = 0x1230;
pub const TCAM_EN: u32 = crate::bit(0);

/// Word 5 bit 31.
pub const TCAM_INV_WORD: usize = 5;
pub const TCAM_INV_MASK: u32 = crate::bit(31);

const PORT_LU_BITS: u32 = 4;
const INIT_OFF_MASK: u32 = 0x3f;
const MAX_LOOP_MASK: u32 = 0xff;

pub const fn tcam_data(word: usize) -> u32 {
    TCAM_DATA_BASE + 4 * word as u32
}

pub const fn sram_data(word: usize) -> u32 {
    SRAM_DATA_BASE + 4 * word as u32
}

/// Init-offset register of `port`; four ports share a register.
pub const fn init_offs(port: u8) -> u32 {
    INIT_OFFS_BASE + (port as u32 & 4)
}

/// Max-loop register of `port`; four ports share a register.
pub const fn max_loop(port: u8) -> u32 {
    MAX_LOOP_BASE + (port as u32 & 4)
}

const fn byte_shift(port: u8) -> u32 {
    (port as u32 % 4) * 8
}

fn check_index(index: u16) -> Result<()> {
    if index > LAST_INDEX {
        return Err(Pp2Error::BadIndex(index));
    }
    Ok(())
}

/// Write a whole line, clearing its invalidation bit.
pub fn write<R: Pp2Rw>(regs: &mut R, pe: &PrsEntry) -> Result<()> {
    check_index(pe.index)?;

    let mut tcam = pe.tcam_words();
    tcam[TCAM_INV_WORD] &= !TCAM_INV_MASK;

    regs.write(TCAM_IDX, u32::from(pe.index));
    for (i, w) in tcam.iter().enumerate() {
        regs.write(tcam_data(i), *w);
    }

    regs.write(SRAM_IDX, u32::from(pe.index));
    for (i, w) in pe.sram_words().iter().enumerate() {
        regs.write(sram_data(i), *w);
    }

    Ok(())
}

/// Read a whole line. An invalidated line is an error rather than a
/// half-meaningful entry.
pub fn read<R: Pp2Rw>(regs: &mut R, index: u16) -> Result<PrsEntry> {
    check_index(index)?;

    regs.write(TCAM_IDX, u32::from(index));
    if regs.read(tcam_data(TCAM_INV_WORD)) & TCAM_INV_MASK != 0 {
        return Err(Pp2Error::EntryInvalid(index));
    }

    let tcam = core::array::from_fn(|i| regs.read(tcam_data(i)));

    regs.write(SRAM_IDX, u32::from(index));
    let sram = core::array::from_fn(|i| regs.read(sram_data(i)));

    Ok(PrsEntry::from_words(index, tcam, sram))
}

/// Disable matching on a line.
pub fn invalidate<R: Pp2Rw>(regs: &mut R, index: u16) -> Result<()> {
    check_index(index)?;
    regs.write(TCAM_IDX, u32::from(index));
    regs.write(tcam_data(TCAM_INV_WORD), TCAM_INV_MASK);
    Ok(())
}

impl<R: Pp2Rw> Pp2<R> {
    /// Read line `index` back from hardware.
    pub fn prs_hw_read(&mut self, index: u16) -> Result<PrsEntry> {
        read(&mut self.regs, index)
    }

    pub(crate) fn prs_hw_write(&mut self, pe: &PrsEntry) -> Result<()> {
        write(&mut self.regs, pe)
    }

    /// Invalidate line `index` in hardware and drop it from the shadow.
    pub(crate) fn prs_hw_inv(&mut self, index: u16) -> Result<()> {
        invalidate(&mut self.regs, index)?;
        self.prs.shadow.invalidate(index);
        Ok(())
    }

    /// The lowest free line of the dynamic pool.
    pub(crate) fn prs_next_free(&self) -> Result<u16> {
        self.prs.shadow.first_free(tid::FIRST_FREE, tid::LAST_FREE)
    }

    /// The line at a reserved index: read back if the shadow says it is
    /// in use, otherwise whatever `create` builds.
    pub(crate) fn prs_fixed_entry<F>(
        &mut self,
        index: u16,
        create: F,
    ) -> Result<PrsEntry>
    where
        F: FnOnce(u16) -> PrsEntry,
    {
        if self.prs.shadow.is_valid(index) {
            self.prs_hw_read(index)
        } else {
            Ok(create(index))
        }
    }

    /// Configure where parsing starts for `port`: the first lookup
    /// stage, the maximum number of lookup iterations and the initial
    /// header offset.
    pub fn port_hw_init(
        &mut self,
        port: u8,
        lu_first: LookupId,
        max_loop_cnt: u8,
        offset: u8,
    ) -> Result<()> {
        self.check_port(port)?;

        let lu = u32::from(u8::from(lu_first) & PORT_LU_MAX);
        let lu_shift = u32::from(port) * PORT_LU_BITS;
        self.regs.modify(INIT_LOOKUP, |v| {
            *v &= !(u32::from(PORT_LU_MAX) << lu_shift);
            *v |= lu << lu_shift;
        });

        let shift = byte_shift(port);
        self.regs.modify(max_loop(port), |v| {
            *v &= !(MAX_LOOP_MASK << shift);
            *v |= (u32::from(max_loop_cnt) & MAX_LOOP_MASK) << shift;
        });

        self.regs.modify(init_offs(port), |v| {
            *v &= !(INIT_OFF_MASK << shift);
            *v |= (u32::from(offset) & INIT_OFF_MASK) << shift;
        });

        Ok(())
    }
}
