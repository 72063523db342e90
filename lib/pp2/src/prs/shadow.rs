// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 Oxide Computer Company

//! The shadow table: what each TCAM line is used for, without a
//! hardware read.

use super::LAST_INDEX;
use super::TCAM_SIZE;
use alloc::vec;
use alloc::vec::Vec;
use core::ops::RangeInclusive;
use pp2_api::dump::ShadowDump;
use pp2_api::dump::ShadowEntryDump;
use pp2_api::error::Pp2Error;
use pp2_api::error::Result;
use pp2_api::prs::LookupId;
use pp2_api::prs::UdfKind;

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ShadowEntry {
    pub valid: bool,
    pub lu: LookupId,
    pub ri: u32,
    pub ri_mask: u32,
    pub udf: UdfKind,
    pub finish: bool,
}

/// One [`ShadowEntry`] per TCAM line.
///
/// A line is valid here iff its hardware invalidation bit is clear.
/// Callers keep the two in step by updating this table in the same
/// operation that writes or invalidates the hardware line.
#[derive(Clone, Debug)]
pub struct ShadowTable {
    entries: Vec<ShadowEntry>,
}

impl Default for ShadowTable {
    fn default() -> Self {
        Self::new()
    }
}

impl ShadowTable {
    pub fn new() -> Self {
        Self { entries: vec![ShadowEntry::default(); usize::from(TCAM_SIZE)] }
    }

    pub fn clear(&mut self) {
        self.entries.fill(ShadowEntry::default());
    }

    pub fn get(&self, index: u16) -> Option<&ShadowEntry> {
        self.entries.get(usize::from(index))
    }

    pub fn is_valid(&self, index: u16) -> bool {
        self.get(index).is_some_and(|e| e.valid)
    }

    /// Whether `index` is valid and belongs to stage `lu`.
    pub fn is_lu(&self, index: u16, lu: LookupId) -> bool {
        self.get(index).is_some_and(|e| e.valid && e.lu == lu)
    }

    /// Mark `index` valid for stage `lu`.
    pub fn set(&mut self, index: u16, lu: LookupId) {
        if let Some(e) = self.entries.get_mut(usize::from(index)) {
            e.valid = true;
            e.lu = lu;
        }
    }

    pub fn ri_set(&mut self, index: u16, ri: u32, ri_mask: u32) {
        if let Some(e) = self.entries.get_mut(usize::from(index)) {
            e.ri = ri;
            e.ri_mask = ri_mask;
        }
    }

    pub fn udf_set(&mut self, index: u16, udf: UdfKind) {
        if let Some(e) = self.entries.get_mut(usize::from(index)) {
            e.udf = udf;
        }
    }

    pub fn finish_set(&mut self, index: u16, finish: bool) {
        if let Some(e) = self.entries.get_mut(usize::from(index)) {
            e.finish = finish;
        }
    }

    pub fn invalidate(&mut self, index: u16) {
        if let Some(e) = self.entries.get_mut(usize::from(index)) {
            e.valid = false;
        }
    }

    /// Valid lines of stage `lu` within `range`, in ascending order.
    pub fn lu_indices(
        &self,
        lu: LookupId,
        range: RangeInclusive<u16>,
    ) -> impl DoubleEndedIterator<Item = u16> + '_ {
        range.filter(move |i| self.is_lu(*i, lu))
    }

    /// Indices of every valid line.
    pub fn valid_indices(&self) -> impl Iterator<Item = u16> + '_ {
        (0..TCAM_SIZE).filter(|i| self.is_valid(*i))
    }

    /// The lowest free index between `start` and `end` inclusive.
    ///
    /// The bounds may be given in either order; they are normalized
    /// before the scan, which always runs upward. An `end` past the
    /// table is clamped to the last line.
    pub fn first_free(&self, start: u16, end: u16) -> Result<u16> {
        let (start, end) =
            if start > end { (end, start) } else { (start, end) };
        let end = end.min(LAST_INDEX);

        (start..=end)
            .find(|i| !self.is_valid(*i))
            .ok_or(Pp2Error::NoFreeIndex { start, end })
    }

    /// The highest free index between `start` and `end` inclusive.
    ///
    /// Bounds are normalized and clamped as for [`Self::first_free`],
    /// but the scan runs downward from `end`.
    pub fn last_free(&self, start: u16, end: u16) -> Result<u16> {
        let (start, end) =
            if start > end { (end, start) } else { (start, end) };
        let end = end.min(LAST_INDEX);

        (start..=end)
            .rev()
            .find(|i| !self.is_valid(*i))
            .ok_or(Pp2Error::NoFreeIndex { start, end })
    }

    pub fn to_dump(&self) -> ShadowDump {
        let entries = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.valid)
            .map(|(i, e)| ShadowEntryDump {
                index: i as u16,
                lu: e.lu,
                ri: e.ri,
                ri_mask: e.ri_mask,
                udf: e.udf,
                finish: e.finish,
            })
            .collect();

        ShadowDump { entries }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn first_free_normalizes_bounds() {
        let mut st = ShadowTable::new();
        st.set(1, LookupId::Mac);
        st.set(2, LookupId::Mac);

        assert_eq!(st.first_free(1, 10), Ok(3));
        assert_eq!(st.first_free(10, 1), Ok(3));
        assert_eq!(st.first_free(0, 10), Ok(0));
    }

    #[test]
    fn first_free_clamps_and_exhausts() {
        let mut st = ShadowTable::new();
        for i in 250..TCAM_SIZE {
            st.set(i, LookupId::Flows);
        }

        assert_eq!(
            st.first_free(250, 1000),
            Err(Pp2Error::NoFreeIndex { start: 250, end: 255 })
        );
        assert_eq!(st.first_free(249, 1000), Ok(249));
    }

    #[test]
    fn last_free_scans_down() {
        let mut st = ShadowTable::new();
        st.set(225, LookupId::Vlan);
        st.set(224, LookupId::Vlan);

        assert_eq!(st.last_free(1, 225), Ok(223));
        assert_eq!(st.last_free(225, 1), Ok(223));
        assert_eq!(st.last_free(1, 1000), Ok(255));

        for i in 1..=223 {
            st.set(i, LookupId::Mac);
        }
        assert_eq!(
            st.last_free(1, 225),
            Err(Pp2Error::NoFreeIndex { start: 1, end: 225 })
        );
    }

    #[test]
    fn set_and_invalidate() {
        let mut st = ShadowTable::new();
        st.set(10, LookupId::Vlan);
        st.ri_set(10, 0x4, 0xc);
        st.udf_set(10, UdfKind::L2Def);
        st.finish_set(10, true);

        assert!(st.is_lu(10, LookupId::Vlan));
        assert!(!st.is_lu(10, LookupId::Mac));
        let vlans: Vec<u16> =
            st.lu_indices(LookupId::Vlan, 0..=255).collect();
        assert_eq!(vlans, [10]);

        let dump = st.to_dump();
        assert_eq!(dump.entries.len(), 1);
        assert_eq!(dump.entries[0].ri_mask, 0xc);
        assert!(dump.entries[0].finish);

        st.invalidate(10);
        assert!(!st.is_valid(10));
        assert_eq!(st.valid_indices().count(), 0);

        // Out of range is ignored.
        st.set(300, LookupId::Mac);
        assert!(!st.is_valid(300));
    }
}
