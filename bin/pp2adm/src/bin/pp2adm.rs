// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 Oxide Computer Company

use std::path::PathBuf;

use clap::Args;
use clap::Parser;
use clap::Subcommand;

use pp2::print::print_cls_lkp;
use pp2::print::print_entry;
use pp2::print::print_shadow;
use pp2::prs::ai;
use pp2_api::API_VERSION;
use pp2_api::cfg::Pp2Cfg;
use pp2_api::mac::MacAddr;
use pp2_api::prs::L3Cast;
use pp2_api::prs::McastKind;
use pp2_api::prs::TagMode;
use pp2adm::Pp2Adm;
use slog::debug;

/// Inspect the parser rules a PP2 configuration produces.
#[derive(Debug, Parser)]
#[command(version = pkg_version())]
struct Cli {
    #[command(flatten)]
    global: GlobalOpts,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Args, Debug)]
struct GlobalOpts {
    /// Device configuration (TOML). Without one, four bare ports.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Print dumps as JSON.
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Bring the device up and dump the shadow table.
    DumpShadow,

    /// Decode a single TCAM/SRAM line.
    DumpEntry { index: u16 },

    /// Dump each port's classifier lookup entry.
    DumpCls,

    /// Accept (or stop accepting) a destination MAC on a port.
    AcceptMac {
        #[arg(short)]
        port: u8,
        mac: MacAddr,
        #[arg(long)]
        remove: bool,
    },

    /// Set the switch tag mode of a port.
    TagMode {
        #[arg(short)]
        port: u8,
        mode: TagMode,
    },

    /// Toggle promiscuous unicast on a port.
    Promisc {
        #[arg(short)]
        port: u8,
        #[arg(long)]
        off: bool,
    },

    /// Toggle a multicast class on a port.
    Mcast {
        #[arg(short)]
        port: u8,
        kind: McastKind,
        #[arg(long)]
        off: bool,
    },

    /// Drop everything arriving on a port.
    DropAll {
        #[arg(short)]
        port: u8,
        #[arg(long)]
        off: bool,
    },

    /// Recognize a single VLAN tag on the ports in `port_map`.
    Vlan {
        #[arg(long, value_parser = parse_hex_u16)]
        tpid: u16,
        #[arg(long, value_parser = parse_hex_u8, default_value = "0xff")]
        port_map: u8,
    },

    /// Recognize a double VLAN tag on the ports in `port_map`.
    DoubleVlan {
        #[arg(long, value_parser = parse_hex_u16)]
        outer: u16,
        #[arg(long, value_parser = parse_hex_u16)]
        inner: u16,
        #[arg(long, value_parser = parse_hex_u8, default_value = "0xff")]
        port_map: u8,
    },

    /// Add an IPv4 broadcast or multicast classification line.
    Ip4Cast { cast: CastArg },
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
enum CastArg {
    Multicast,
    Broadcast,
}

impl From<CastArg> for L3Cast {
    fn from(c: CastArg) -> Self {
        match c {
            CastArg::Multicast => L3Cast::Multicast,
            CastArg::Broadcast => L3Cast::Broadcast,
        }
    }
}

fn parse_hex_u16(s: &str) -> Result<u16, String> {
    let digits = s.trim_start_matches("0x");
    u16::from_str_radix(digits, 16).map_err(|e| format!("{s}: {e}"))
}

fn parse_hex_u8(s: &str) -> Result<u8, String> {
    let digits = s.trim_start_matches("0x");
    u8::from_str_radix(digits, 16).map_err(|e| format!("{s}: {e}"))
}

fn pkg_version() -> String {
    format!("{}.{API_VERSION}", env!("CARGO_PKG_VERSION"))
}

fn print_json<T: serde::Serialize>(val: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(val)?);
    Ok(())
}

fn dump_shadow(adm: &Pp2Adm, json: bool) -> anyhow::Result<()> {
    let dump = adm.shadow_dump();
    if json {
        print_json(&dump)
    } else {
        Ok(print_shadow(&dump)?)
    }
}

fn main() -> anyhow::Result<()> {
    let Cli { global, cmd } = Cli::parse();
    let log = pp2adm::build_logger();

    let cfg = match &global.config {
        Some(path) => pp2adm::load_cfg(path)?,
        None => Pp2Cfg::default(),
    };
    let mut adm = Pp2Adm::open(cfg, &log)?;
    debug!(log, "running"; "cmd" => ?cmd);

    match cmd {
        Command::DumpShadow => {}

        Command::DumpEntry { index } => {
            let dump = adm.entry_dump(index)?;
            if global.json {
                print_json(&dump)?;
            } else {
                print_entry(&dump)?;
            }
            return Ok(());
        }

        Command::DumpCls => {
            let dump = adm.cls_lkp_dump();
            if global.json {
                print_json(&dump)?;
            } else {
                print_cls_lkp(&dump)?;
            }
            return Ok(());
        }

        Command::AcceptMac { port, mac, remove } => {
            adm.mac_da_accept(port, mac, !remove)?;
        }

        Command::TagMode { port, mode } => {
            adm.tag_mode_set(port, mode)?;
        }

        Command::Promisc { port, off } => {
            adm.mac_promisc_set(port, !off)?;
        }

        Command::Mcast { port, kind, off } => {
            adm.mac_multi_set(kind, port, !off)?;
        }

        Command::DropAll { port, off } => {
            adm.mac_drop_all_set(port, !off)?;
        }

        Command::Vlan { tpid, port_map } => {
            adm.vlan_add(tpid, ai::SINGLE_VLAN, port_map)?;
        }

        Command::DoubleVlan { outer, inner, port_map } => {
            adm.double_vlan_add(outer, inner, port_map)?;
        }

        Command::Ip4Cast { cast } => {
            adm.ip4_cast(cast.into())?;
        }
    }

    dump_shadow(&adm, global.json)
}
