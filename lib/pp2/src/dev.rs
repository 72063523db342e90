// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 Oxide Computer Company

//! The device handle.

use alloc::format;
use crate::prs::ParserState;
use crate::prs::ShadowTable;
use crate::regs::Pp2Rw;
use pp2_api::cfg::Pp2Cfg;
use pp2_api::dump::ClsLkpDump;
use pp2_api::dump::EntryDump;
use pp2_api::dump::ShadowDump;
use pp2_api::error::Pp2Error;
use pp2_api::error::Result;
use pp2_api::mac::MacAddr;
use slog::Logger;
use slog::error;
use slog::info;

/// One packet processor instance.
///
/// Owns the register window and all parser software state. Every
/// operation that touches rules takes `&mut self`, so a search and
/// the create that follows it can never interleave with another
/// caller. Share it across threads behind a `Mutex`.
pub struct Pp2<R: Pp2Rw> {
    pub(crate) regs: R,
    pub(crate) prs: ParserState,
    pub(crate) cfg: Pp2Cfg,
    pub(crate) log: Logger,
}

impl<R: Pp2Rw> Pp2<R> {
    pub fn new(regs: R, cfg: Pp2Cfg, log: &Logger) -> Result<Self> {
        cfg.validate()?;
        let log = log.new(slog::o!("num_ports" => cfg.num_ports));
        Ok(Self { regs, prs: ParserState::new(), cfg, log })
    }

    pub fn cfg(&self) -> &Pp2Cfg {
        &self.cfg
    }

    pub fn regs(&self) -> &R {
        &self.regs
    }

    pub fn regs_mut(&mut self) -> &mut R {
        &mut self.regs
    }

    pub fn parser(&self) -> &ParserState {
        &self.prs
    }

    pub fn shadow(&self) -> &ShadowTable {
        &self.prs.shadow
    }

    pub(crate) fn check_port(&self, port: u8) -> Result<()> {
        if port >= self.cfg.num_ports {
            return Err(Pp2Error::BadPort(port));
        }
        Ok(())
    }

    /// Lay down the default parser tree and reset the classifier.
    pub fn bringup(&mut self) -> Result<()> {
        self.parser_default_init()?;
        self.cls_default_init();
        info!(self.log, "parser and classifier initialized");
        Ok(())
    }

    /// Bring a configured port's filtering up: accept broadcast and
    /// the port's own address, apply its tag mode, add its default
    /// flow, apply promiscuous and multicast settings and point the
    /// classifier at its first receive queue.
    pub fn port_open(&mut self, port: u8) -> Result<()> {
        let res = self.port_open_steps(port);
        match &res {
            Ok(()) => info!(self.log, "port {} opened", port),
            Err(e) => error!(self.log, "port {} open failed: {}", port, e),
        }
        res
    }

    fn port_open_steps(&mut self, port: u8) -> Result<()> {
        self.check_port(port)?;
        let pcfg = self.cfg.port(port).cloned().ok_or_else(|| {
            Pp2Error::InvalidArg(format!("port {port} is not configured"))
        })?;

        self.mac_da_accept(port, MacAddr::BROADCAST, true)?;
        if let Some(mac) = pcfg.mac {
            self.mac_da_accept(port, mac, true)?;
        }

        self.tag_mode_set(port, pcfg.tag_mode)?;
        self.default_flow_set(port)?;

        if pcfg.promisc {
            self.mac_promisc_set(port, true)?;
        }

        for kind in pcfg.mcast.iter() {
            self.mac_multi_set(*kind, port, true)?;
        }

        self.cls_port_default_config(port, pcfg.first_rxq)?;
        self.cls_oversize_rxq_set(port, pcfg.first_rxq)?;
        Ok(())
    }

    pub fn shadow_dump(&self) -> ShadowDump {
        self.prs.shadow.to_dump()
    }

    /// Decode line `index` as it currently sits in hardware.
    pub fn entry_dump(&mut self, index: u16) -> Result<EntryDump> {
        Ok(self.prs_hw_read(index)?.to_dump())
    }

    /// The way-0 lookup entries of every configured port.
    pub fn cls_lkp_dump(&mut self) -> ClsLkpDump {
        let entries = (0..self.cfg.num_ports)
            .map(|port| self.cls_lkp_read(port, 0).to_dump())
            .collect();
        ClsLkpDump { entries }
    }
}
