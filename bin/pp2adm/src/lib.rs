// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 Oxide Computer Company

//! PP2 parser administration library

use pp2::Pp2;
use pp2::sim::SimRegs;
use pp2_api::cfg::Pp2Cfg;
use pp2_api::error::Pp2Error;
use slog::Drain;
use slog::Logger;
use slog::info;
use std::ops::Deref;
use std::ops::DerefMut;
use std::path::Path;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("bad config: {0}")]
    Config(#[from] toml::de::Error),

    #[error(transparent)]
    Pp2(#[from] Pp2Error),
}

/// Load a device configuration from a TOML file.
pub fn load_cfg(path: &Path) -> Result<Pp2Cfg, Error> {
    let text = std::fs::read_to_string(path)
        .map_err(|source| Error::Io { path: path.to_path_buf(), source })?;
    parse_cfg(&text)
}

pub fn parse_cfg(text: &str) -> Result<Pp2Cfg, Error> {
    let cfg: Pp2Cfg = toml::from_str(text)?;
    cfg.validate()?;
    Ok(cfg)
}

/// A terminal logger filtered by `RUST_LOG`.
pub fn build_logger() -> Logger {
    let decorator = slog_term::TermDecorator::new().stderr().build();
    let drain = slog_term::FullFormat::new(decorator).build().fuse();
    let drain = slog_envlogger::new(drain).fuse();
    let drain = slog_async::Async::new(drain).build().fuse();
    Logger::root(drain, slog::o!("component" => "pp2adm"))
}

/// A parser over a simulated register window, brought up and with
/// every configured port opened.
///
/// Commands run against this to show the rule layout a configuration
/// and a sequence of changes produce.
pub struct Pp2Adm(Pp2<SimRegs>);

impl Deref for Pp2Adm {
    type Target = Pp2<SimRegs>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for Pp2Adm {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl Pp2Adm {
    pub fn open(cfg: Pp2Cfg, log: &Logger) -> Result<Self, Error> {
        let ports: Vec<u8> = cfg.ports.iter().map(|p| p.id).collect();
        let mut pp2 = Pp2::new(SimRegs::new(), cfg, log)?;
        pp2.bringup()?;

        for port in ports {
            pp2.port_open(port)?;
        }

        let lines = pp2.shadow().valid_indices().count();
        info!(log, "device ready"; "lines" => lines);
        Ok(Self(pp2))
    }
}
