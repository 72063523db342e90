// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 Oxide Computer Company

//! Print parser and classifier dumps in a human-friendly manner.
//!
//! Shared by pp2adm and the integration tests.

use crate::api::dump::ClsLkpDump;
use crate::api::dump::EntryDump;
use crate::api::dump::ShadowDump;
use crate::api::prs::LookupId;
use std::io::Write;
use std::string::String;
use tabwriter::TabWriter;

/// Print a [`ShadowDump`].
pub fn print_shadow(dump: &ShadowDump) -> std::io::Result<()> {
    print_shadow_into(&mut std::io::stdout(), dump)
}

/// Print a [`ShadowDump`] into a given writer.
pub fn print_shadow_into(
    writer: &mut impl Write,
    dump: &ShadowDump,
) -> std::io::Result<()> {
    let mut t = TabWriter::new(writer);
    writeln!(t, "INDEX\tLU\tRI\tRI MASK\tUDF\tFINISH")?;

    for e in &dump.entries {
        writeln!(
            t,
            "{}\t{}\t{:#010x}\t{:#010x}\t{}\t{}",
            e.index,
            e.lu,
            e.ri,
            e.ri_mask,
            e.udf,
            if e.finish { "yes" } else { "" },
        )?;
    }
    t.flush()
}

/// Print an [`EntryDump`].
pub fn print_entry(dump: &EntryDump) -> std::io::Result<()> {
    print_entry_into(&mut std::io::stdout(), dump)
}

/// Print an [`EntryDump`] into a given writer.
pub fn print_entry_into(
    writer: &mut impl Write,
    dump: &EntryDump,
) -> std::io::Result<()> {
    let mut t = TabWriter::new(writer);

    let lu = match LookupId::try_from(dump.lu) {
        Ok(lu) => lu.to_string(),
        Err(_) => format!("{:#x}", dump.lu),
    };

    writeln!(t, "Entry {}", dump.index)?;
    write_hr(&mut t)?;
    writeln!(t, "TCAM")?;
    writeln!(t, "  LU\t{lu}")?;
    writeln!(t, "  PORTS\t{:#04x}", dump.port_map)?;
    writeln!(t, "  AI\t{:#04x}/{:#04x}", dump.ai, dump.ai_en)?;
    writeln!(t, "  DATA\t{}", data_string(&dump.data))?;
    t.flush()?;

    writeln!(t, "SRAM")?;
    writeln!(t, "  RI\t{:#010x}/{:#010x}", dump.ri, dump.ri_ctrl)?;
    writeln!(t, "  AI\t{:#04x}/{:#04x}", dump.sram_ai, dump.sram_ai_ctrl)?;
    writeln!(t, "  NEXT LU\t{}", dump.next_lu)?;
    writeln!(t, "  SHIFT\t{}", dump.shift)?;
    writeln!(t, "  UDF\t{} @ {}", dump.udf_type, dump.udf_offset)?;
    writeln!(t, "  LU DONE\t{}", dump.lu_done)?;
    writeln!(t, "  FLOW GEN\t{}", dump.flow_gen)?;
    t.flush()
}

/// Print a [`ClsLkpDump`].
pub fn print_cls_lkp(dump: &ClsLkpDump) -> std::io::Result<()> {
    print_cls_lkp_into(&mut std::io::stdout(), dump)
}

/// Print a [`ClsLkpDump`] into a given writer.
pub fn print_cls_lkp_into(
    writer: &mut impl Write,
    dump: &ClsLkpDump,
) -> std::io::Result<()> {
    let mut t = TabWriter::new(writer);
    writeln!(t, "LKPID\tWAY\tRXQ\tLOOKUP")?;

    for e in &dump.entries {
        writeln!(
            t,
            "{}\t{}\t{}\t{}",
            e.lkpid,
            e.way,
            e.rxq,
            if e.lookup_en { "enabled" } else { "disabled" },
        )?;
    }
    t.flush()
}

/// Header bytes as `dd/ee` pairs; bytes that match anything print as
/// `*`.
fn data_string(data: &[(u8, u8); 8]) -> String {
    data.iter()
        .map(|(d, e)| match e {
            0 => String::from("*"),
            0xff => format!("{d:02x}"),
            _ => format!("{d:02x}/{e:02x}"),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Print horizontal rule.
fn write_hr(t: &mut impl Write) -> std::io::Result<()> {
    writeln!(t, "{:-<40}", "")
}
