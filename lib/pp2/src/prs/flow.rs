// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 Oxide Computer Company

//! The flows stage: turning the accumulated result into a classifier
//! flow ID.

use super::LAST_INDEX;
use super::PrsEntry;
use super::ai;
use super::tid;
use alloc::vec::Vec;
use crate::Pp2;
use crate::regs::Pp2Rw;
use pp2_api::error::Result;
use pp2_api::prs::LookupId;
use slog::debug;

impl<R: Pp2Rw> Pp2<R> {
    /// Find the flows line for flow ID `flow` matching result bits
    /// `ri_bits` under `ri_mask`. Scans from the top of the table.
    pub fn flow_find(
        &mut self,
        flow: u8,
        ri_bits: u32,
        ri_mask: u32,
    ) -> Result<Option<PrsEntry>> {
        let candidates: Vec<u16> = self
            .prs
            .shadow
            .lu_indices(LookupId::Flows, 0..=LAST_INDEX)
            .rev()
            .collect();

        for index in candidates {
            let pe = self.prs_hw_read(index)?;
            if pe.tcam_data_dword(0) != (ri_bits, ri_mask) {
                continue;
            }

            if pe.sram_ai() & ai::FLOW_ID_MASK == flow {
                return Ok(Some(pe));
            }
        }

        Ok(None)
    }

    /// Point `port`'s default flow line at `port` alone.
    pub fn default_flow_set(&mut self, port: u8) -> Result<()> {
        self.check_port(port)?;

        let mut pe = match self.flow_find(port, 0, 0)? {
            Some(pe) => pe,
            None => {
                let index = self
                    .prs
                    .shadow
                    .first_free(tid::LAST_FREE, tid::FIRST_FREE)?;
                let mut pe = default_flow_entry(index, port);
                pe.tcam_port_map_set(0);
                debug!(
                    self.log, "new default flow";
                    "port" => port, "index" => index,
                );
                pe
            }
        };

        pe.tcam_port_map_set(1 << port);
        self.prs_hw_write(&pe)?;
        self.prs.shadow.set(pe.index, LookupId::Flows);
        Ok(())
    }

    /// One default flow line per port at its reserved index, joined by
    /// no port until the port is opened.
    pub(crate) fn def_flow_init(&mut self) -> Result<()> {
        for port in 0..self.cfg.num_ports {
            let mut pe = default_flow_entry(tid::default_flow(port), port);
            pe.tcam_port_map_set(0);
            self.prs_hw_write(&pe)?;
            self.prs.shadow.set(pe.index, LookupId::Flows);
        }
        Ok(())
    }
}

/// Matches anything in the flows stage and ends the lookup with flow
/// ID `port`.
fn default_flow_entry(index: u16, port: u8) -> PrsEntry {
    let mut pe = PrsEntry::new(index);
    pe.tcam_lu_set(LookupId::Flows);
    pe.sram_ai_update(port, ai::FLOW_ID_MASK);
    pe.sram_lu_done_set();
    pe
}
