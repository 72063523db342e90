// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 Oxide Computer Company

use super::PORT_LU_MAX;
use super::TCAM_SIZE;
use super::hw;
use crate::Pp2;
use crate::regs::Pp2Rw;
use pp2_api::error::Result;
use pp2_api::prs::LookupId;
use slog::info;

impl<R: Pp2Rw> Pp2<R> {
    /// Reset the parser and lay down the default tree.
    ///
    /// Every line is cleared and invalidated, all software state is
    /// forgotten, each port is pointed at the MH stage, and then each
    /// stage's fixed lines are written in pipeline order. Running this
    /// again discards everything added since.
    pub fn parser_default_init(&mut self) -> Result<()> {
        self.regs.write(hw::TCAM_CTRL, hw::TCAM_EN);

        for index in 0..TCAM_SIZE {
            self.regs.write(hw::TCAM_IDX, u32::from(index));
            for w in 0..hw::TCAM_WORDS {
                self.regs.write(hw::tcam_data(w), 0);
            }

            self.regs.write(hw::SRAM_IDX, u32::from(index));
            for w in 0..hw::SRAM_WORDS {
                self.regs.write(hw::sram_data(w), 0);
            }
        }

        for index in 0..TCAM_SIZE {
            hw::invalidate(&mut self.regs, index)?;
        }

        self.prs.clear();

        for port in 0..self.cfg.num_ports {
            self.port_hw_init(port, LookupId::Mh, PORT_LU_MAX, 0)?;
        }

        self.def_flow_init()?;
        self.mh_init()?;
        self.mac_init()?;
        self.dsa_init()?;
        self.etype_init()?;
        self.vlan_init()?;
        self.pppoe_init()?;
        self.ip6_init()?;
        self.ip4_init()?;

        info!(
            self.log,
            "parser initialized";
            "lines" => self.prs.shadow.valid_indices().count(),
        );
        Ok(())
    }
}
