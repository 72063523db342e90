// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 Oxide Computer Company

//! The TCAM/SRAM line codec.
//!
//! A [`PrsEntry`] is an in-memory image of one hardware line: 24
//! bytes of TCAM (six words) and 16 bytes of SRAM (four words). Bytes
//! map to words little-endian, so byte `n` lives in word `n / 4` at
//! bit `8 * (n % 4)`.
//!
//! TCAM layout, by byte:
//!
//! ```text
//!  0  1  2  3 | 4  5  6  7 | 8  9 10 11 |12 13 14 15 |16 17 18 19 |20 21 22 23
//! d0 d1 e0 e1 |d2 d3 e2 e3 |d4 d5 e4 e5 |d6 d7 e6 e7 |ai pt aE pE |lu -- lE --
//! ```
//!
//! where `dN`/`eN` are header byte N and its enable mask, `ai`/`aE`
//! the ancillary bits and their enable, `pt`/`pE` the port field
//! (enable is inverted: a set bit excludes the port) and `lu`/`lE`
//! the lookup stage. Bit 31 of word 5 invalidates the whole line.
//!
//! SRAM fields are addressed by absolute bit number and may straddle
//! bytes; every write clears the field before setting it.

use super::hw::SRAM_WORDS;
use super::hw::TCAM_WORDS;
use pp2_api::dump::EntryDump;
use pp2_api::prs::LookupId;

pub const TCAM_BYTES: usize = TCAM_WORDS * 4;
pub const SRAM_BYTES: usize = SRAM_WORDS * 4;

/// Number of header bytes a single line can match on.
pub const TCAM_DATA_BYTES: usize = 8;

const TCAM_AI_BYTE: usize = 16;
const TCAM_PORT_BYTE: usize = 17;
const TCAM_LU_BYTE: usize = 20;
const TCAM_INV_BYTE: usize = 23;
const TCAM_INV_BIT: u8 = 0x80;

pub const PORT_MASK: u8 = 0xff;
pub const LU_MASK: u8 = 0xf;
pub const AI_MASK: u8 = 0xff;

const fn tcam_data_byte(offs: usize) -> usize {
    (offs - offs % 2) * 2 + offs % 2
}

const fn tcam_en_offs(byte: usize) -> usize {
    byte + 2
}

// SRAM bit positions.
pub const SRAM_RI_OFFS: usize = 0;
pub const SRAM_RI_CTRL_OFFS: usize = 32;
pub const SRAM_SHIFT_OFFS: usize = 64;
pub const SRAM_SHIFT_SIGN_BIT: usize = 72;
pub const SRAM_UDF_OFFS: usize = 73;
pub const SRAM_UDF_BITS: usize = 8;
pub const SRAM_UDF_SIGN_BIT: usize = 81;
pub const SRAM_UDF_TYPE_OFFS: usize = 82;
pub const SRAM_UDF_TYPE_BITS: usize = 3;
pub const SRAM_OP_SEL_SHIFT_OFFS: usize = 85;
pub const SRAM_OP_SEL_SHIFT_BITS: usize = 2;
pub const SRAM_OP_SEL_UDF_OFFS: usize = 87;
pub const SRAM_OP_SEL_UDF_BITS: usize = 2;
pub const SRAM_OP_SEL_BASE_BIT: usize = 89;
pub const SRAM_AI_OFFS: usize = 90;
pub const SRAM_AI_CTRL_OFFS: usize = 98;
pub const SRAM_NEXT_LU_OFFS: usize = 106;
pub const SRAM_NEXT_LU_BITS: usize = 4;
pub const SRAM_LU_DONE_BIT: usize = 110;
pub const SRAM_LU_GEN_BIT: usize = 111;

/// Kind of offset exported through the UDF field.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[repr(u8)]
pub enum UdfType {
    L3 = 1,
    L4 = 4,
}

/// Shift operation selector.
pub const OP_SEL_SHIFT_ADD: u32 = 1;

/// UDF operation selector.
pub const OP_SEL_UDF_ADD: u32 = 0;

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PrsEntry {
    pub index: u16,
    pub tcam: [u8; TCAM_BYTES],
    pub sram: [u8; SRAM_BYTES],
}

impl PrsEntry {
    /// A zeroed line. Every header byte is a wildcard and every port
    /// is included until the caller says otherwise.
    pub fn new(index: u16) -> Self {
        Self { index, tcam: [0; TCAM_BYTES], sram: [0; SRAM_BYTES] }
    }

    pub fn from_words(
        index: u16,
        tcam: [u32; TCAM_WORDS],
        sram: [u32; SRAM_WORDS],
    ) -> Self {
        let mut pe = Self::new(index);
        for (i, w) in tcam.iter().enumerate() {
            pe.tcam[i * 4..i * 4 + 4].copy_from_slice(&w.to_le_bytes());
        }
        for (i, w) in sram.iter().enumerate() {
            pe.sram[i * 4..i * 4 + 4].copy_from_slice(&w.to_le_bytes());
        }
        pe
    }

    pub fn tcam_word(&self, i: usize) -> u32 {
        let mut b = [0u8; 4];
        b.copy_from_slice(&self.tcam[i * 4..i * 4 + 4]);
        u32::from_le_bytes(b)
    }

    pub fn sram_word(&self, i: usize) -> u32 {
        let mut b = [0u8; 4];
        b.copy_from_slice(&self.sram[i * 4..i * 4 + 4]);
        u32::from_le_bytes(b)
    }

    pub fn tcam_words(&self) -> [u32; TCAM_WORDS] {
        core::array::from_fn(|i| self.tcam_word(i))
    }

    pub fn sram_words(&self) -> [u32; SRAM_WORDS] {
        core::array::from_fn(|i| self.sram_word(i))
    }

    // ================================================================
    // TCAM
    // ================================================================

    /// Match exactly on lookup stage `lu`.
    pub fn tcam_lu_set(&mut self, lu: LookupId) {
        self.tcam[TCAM_LU_BYTE] = u8::from(lu);
        self.tcam[tcam_en_offs(TCAM_LU_BYTE)] = LU_MASK;
    }

    pub fn tcam_lu(&self) -> u8 {
        self.tcam[TCAM_LU_BYTE] & self.tcam[tcam_en_offs(TCAM_LU_BYTE)]
    }

    /// Include (`add`) or exclude a single port.
    pub fn tcam_port_set(&mut self, port: u8, add: bool) {
        let en = &mut self.tcam[tcam_en_offs(TCAM_PORT_BYTE)];
        let bit = 1u8 << (port & 7);
        if add {
            *en &= !bit;
        } else {
            *en |= bit;
        }
    }

    /// Set the full set of included ports.
    pub fn tcam_port_map_set(&mut self, ports: u8) {
        self.tcam[TCAM_PORT_BYTE] = 0;
        let en = &mut self.tcam[tcam_en_offs(TCAM_PORT_BYTE)];
        *en &= !PORT_MASK;
        *en |= !ports & PORT_MASK;
    }

    pub fn tcam_port_map(&self) -> u8 {
        !self.tcam[tcam_en_offs(TCAM_PORT_BYTE)] & PORT_MASK
    }

    /// Set header byte `offs` (0..8) to `byte` under `enable`.
    pub fn tcam_data_byte_set(&mut self, offs: usize, byte: u8, enable: u8) {
        debug_assert!(offs < TCAM_DATA_BYTES);
        let pos = tcam_data_byte(offs);
        self.tcam[pos] = byte;
        self.tcam[tcam_en_offs(pos)] = enable;
    }

    /// Header byte `offs` and its enable.
    pub fn tcam_data_byte(&self, offs: usize) -> (u8, u8) {
        let pos = tcam_data_byte(offs);
        (self.tcam[pos], self.tcam[tcam_en_offs(pos)])
    }

    /// Set four header bytes starting at `4 * dw` from a little-endian
    /// data/enable pair.
    pub fn tcam_data_dword_set(&mut self, dw: usize, data: u32, enable: u32) {
        let d = data.to_le_bytes();
        let e = enable.to_le_bytes();
        for i in 0..4 {
            self.tcam_data_byte_set(dw * 4 + i, d[i], e[i]);
        }
    }

    pub fn tcam_data_dword(&self, dw: usize) -> (u32, u32) {
        let mut d = [0u8; 4];
        let mut e = [0u8; 4];
        for i in 0..4 {
            (d[i], e[i]) = self.tcam_data_byte(dw * 4 + i);
        }
        (u32::from_le_bytes(d), u32::from_le_bytes(e))
    }

    /// Match an ethertype, in network order, at header bytes `offs`
    /// and `offs + 1`.
    pub fn tcam_match_etype(&mut self, offs: usize, ethertype: u16) {
        let [hi, lo] = ethertype.to_be_bytes();
        self.tcam_data_byte_set(offs, hi, 0xff);
        self.tcam_data_byte_set(offs + 1, lo, 0xff);
    }

    /// Whether header bytes `offs` and `offs + 1` exact-match `data`
    /// in network order. A window that is not fully enabled never
    /// matches.
    pub fn tcam_data_cmp(&self, offs: usize, data: u16) -> bool {
        let (hi, hi_en) = self.tcam_data_byte(offs);
        let (lo, lo_en) = self.tcam_data_byte(offs + 1);
        hi_en == 0xff && lo_en == 0xff && u16::from_be_bytes([hi, lo]) == data
    }

    /// Update the AI bits selected by `enable`. The enable mask only
    /// ever grows.
    pub fn tcam_ai_update(&mut self, bits: u8, enable: u8) {
        for i in 0..8 {
            let b = 1u8 << i;
            if enable & b == 0 {
                continue;
            }

            if bits & b != 0 {
                self.tcam[TCAM_AI_BYTE] |= b;
            } else {
                self.tcam[TCAM_AI_BYTE] &= !b;
            }
        }

        self.tcam[tcam_en_offs(TCAM_AI_BYTE)] |= enable;
    }

    /// The AI bits and their enable.
    pub fn tcam_ai(&self) -> (u8, u8) {
        (self.tcam[TCAM_AI_BYTE], self.tcam[tcam_en_offs(TCAM_AI_BYTE)])
    }

    pub fn tcam_invalid(&self) -> bool {
        self.tcam[TCAM_INV_BYTE] & TCAM_INV_BIT != 0
    }

    pub fn tcam_valid_set(&mut self) {
        self.tcam[TCAM_INV_BYTE] &= !TCAM_INV_BIT;
    }

    // ================================================================
    // SRAM
    // ================================================================

    /// Write a `width`-bit field at absolute bit `lo`.
    pub fn sram_field_set(&mut self, lo: usize, width: usize, val: u32) {
        for i in 0..width {
            let bit = lo + i;
            let mask = 1u8 << (bit % 8);
            self.sram[bit / 8] &= !mask;
            if (val >> i) & 1 != 0 {
                self.sram[bit / 8] |= mask;
            }
        }
    }

    pub fn sram_field(&self, lo: usize, width: usize) -> u32 {
        (0..width).fold(0, |acc, i| {
            let bit = lo + i;
            let set = (self.sram[bit / 8] >> (bit % 8)) & 1;
            acc | (u32::from(set) << i)
        })
    }

    pub fn sram_bit_set(&mut self, bit: usize, on: bool) {
        self.sram_field_set(bit, 1, u32::from(on));
    }

    pub fn sram_bit(&self, bit: usize) -> bool {
        self.sram_field(bit, 1) != 0
    }

    /// Set the result bits selected by `mask`, along with their
    /// control bits.
    pub fn sram_ri_update(&mut self, bits: u32, mask: u32) {
        for i in 0..32 {
            if (mask >> i) & 1 == 0 {
                continue;
            }
            self.sram_bit_set(SRAM_RI_OFFS + i, (bits >> i) & 1 != 0);
            self.sram_bit_set(SRAM_RI_CTRL_OFFS + i, true);
        }
    }

    pub fn sram_ri(&self) -> u32 {
        self.sram_field(SRAM_RI_OFFS, 32)
    }

    pub fn sram_ri_ctrl(&self) -> u32 {
        self.sram_field(SRAM_RI_CTRL_OFFS, 32)
    }

    /// Clear every result bit and control bit.
    pub fn sram_ri_reset(&mut self) {
        self.sram_field_set(SRAM_RI_OFFS, 32, 0);
        self.sram_field_set(SRAM_RI_CTRL_OFFS, 32, 0);
    }

    /// Set the AI bits passed to the next stage selected by `mask`,
    /// along with their control bits.
    pub fn sram_ai_update(&mut self, bits: u8, mask: u8) {
        for i in 0..8 {
            if (mask >> i) & 1 == 0 {
                continue;
            }
            self.sram_bit_set(SRAM_AI_OFFS + i, (bits >> i) & 1 != 0);
            self.sram_bit_set(SRAM_AI_CTRL_OFFS + i, true);
        }
    }

    pub fn sram_ai(&self) -> u8 {
        self.sram_field(SRAM_AI_OFFS, 8) as u8
    }

    pub fn sram_ai_ctrl(&self) -> u8 {
        self.sram_field(SRAM_AI_CTRL_OFFS, 8) as u8
    }

    pub fn sram_next_lu_set(&mut self, lu: LookupId) {
        self.sram_field_set(
            SRAM_NEXT_LU_OFFS,
            SRAM_NEXT_LU_BITS,
            u32::from(u8::from(lu)),
        );
    }

    pub fn sram_next_lu(&self) -> u8 {
        self.sram_field(SRAM_NEXT_LU_OFFS, SRAM_NEXT_LU_BITS) as u8
    }

    /// Advance the next stage's window by `shift` bytes.
    pub fn sram_shift_set(&mut self, shift: i16, op: u32) {
        self.sram_bit_set(SRAM_SHIFT_SIGN_BIT, shift < 0);
        self.sram_field_set(
            SRAM_SHIFT_OFFS,
            8,
            u32::from(shift.unsigned_abs() & 0xff),
        );
        self.sram_field_set(
            SRAM_OP_SEL_SHIFT_OFFS,
            SRAM_OP_SEL_SHIFT_BITS,
            op,
        );
        self.sram_bit_set(SRAM_OP_SEL_BASE_BIT, false);
    }

    pub fn sram_shift(&self) -> i16 {
        let mag = self.sram_field(SRAM_SHIFT_OFFS, 8) as i16;
        if self.sram_bit(SRAM_SHIFT_SIGN_BIT) { -mag } else { mag }
    }

    /// Export an L3 or L4 header offset to the classifier.
    pub fn sram_offset_set(&mut self, ty: UdfType, offset: i16, op: u32) {
        self.sram_bit_set(SRAM_UDF_SIGN_BIT, offset < 0);
        self.sram_field_set(
            SRAM_UDF_OFFS,
            SRAM_UDF_BITS,
            u32::from(offset.unsigned_abs() & 0xff),
        );
        self.sram_field_set(
            SRAM_UDF_TYPE_OFFS,
            SRAM_UDF_TYPE_BITS,
            u32::from(ty as u8),
        );
        self.sram_field_set(SRAM_OP_SEL_UDF_OFFS, SRAM_OP_SEL_UDF_BITS, op);
        self.sram_bit_set(SRAM_OP_SEL_BASE_BIT, false);
    }

    /// The raw UDF type and signed offset.
    pub fn sram_offset(&self) -> (u8, i16) {
        let ty = self.sram_field(SRAM_UDF_TYPE_OFFS, SRAM_UDF_TYPE_BITS) as u8;
        let mag = self.sram_field(SRAM_UDF_OFFS, SRAM_UDF_BITS) as i16;
        let off = if self.sram_bit(SRAM_UDF_SIGN_BIT) { -mag } else { mag };
        (ty, off)
    }

    /// Mark the line as ending the lookup.
    pub fn sram_lu_done_set(&mut self) {
        self.sram_bit_set(SRAM_LU_DONE_BIT, true);
    }

    /// Generate the flow ID when this line matches.
    pub fn sram_flow_gen_set(&mut self) {
        self.sram_bit_set(SRAM_LU_GEN_BIT, true);
    }

    pub fn to_dump(&self) -> EntryDump {
        let (ai, ai_en) = self.tcam_ai();
        let (udf_type, udf_offset) = self.sram_offset();
        EntryDump {
            index: self.index,
            lu: self.tcam_lu(),
            port_map: self.tcam_port_map(),
            ai,
            ai_en,
            data: core::array::from_fn(|i| self.tcam_data_byte(i)),
            ri: self.sram_ri(),
            ri_ctrl: self.sram_ri_ctrl(),
            sram_ai: self.sram_ai(),
            sram_ai_ctrl: self.sram_ai_ctrl(),
            next_lu: self.sram_next_lu(),
            shift: self.sram_shift(),
            udf_type,
            udf_offset,
            lu_done: self.sram_bit(SRAM_LU_DONE_BIT),
            flow_gen: self.sram_bit(SRAM_LU_GEN_BIT),
        }
    }
}
