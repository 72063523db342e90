// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 Oxide Computer Company

//! Hardware timestamps from the PTP and TAI blocks.
//!
//! Only the two reads the rest of the driver consumes live here: the
//! per-port egress timestamp queues and the TAI's captured time of
//! day. Clock discipline is someone else's job.

use alloc::format;
use crate::regs::Pp2Rw;
use pp2_api::error::Pp2Error;
use pp2_api::error::Result;
use slog::Logger;
use slog::error;
use slog::info;

pub const PTP_PORT_BASE: u32 = 0x7800;
pub const PTP_PORT_STRIDE: u32 = 0x1000;
pub const TX_TS_QUEUE0: u32 = 0x0c;
pub const TX_TS_QUEUE1: u32 = 0x18;
pub const TX_TS_VALID: u32 = crate::bit(0);

pub const TAI_CAPTURE_STATUS: u32 = 0x0058;
pub const TAI_CAPTURE0_VALID: u32 = crate::bit(0);
pub const TAI_CAPTURE_VALUE0: u32 = 0x0060;
pub const TAI_CAPTURE_VALUE1: u32 = 0x0080;

/// Status polls before a capture is given up on.
pub const CAPTURE_WAIT_MAX: u32 = 8;

// Offsets within a capture slot.
const SEC_HIGH: u32 = 0x00;
const SEC_MED: u32 = 0x04;
const SEC_LOW: u32 = 0x08;
const NANO_HIGH: u32 = 0x0c;
const NANO_LOW: u32 = 0x10;
const FRAC_HIGH: u32 = 0x14;
const FRAC_LOW: u32 = 0x18;

/// Register 0 of egress timestamp queue `queue` on `port`.
pub const fn tx_ts_queue_base(port: u8, queue: u8) -> u32 {
    let q = if queue == 0 { TX_TS_QUEUE0 } else { TX_TS_QUEUE1 };
    PTP_PORT_BASE + port as u32 * PTP_PORT_STRIDE + q
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TxTimestamp {
    /// Nothing queued.
    Empty,
    Valid(u32),
    /// The entry was valid but all zero. The packet went out with a bad
    /// FCS; reading again won't help.
    BadFcs,
}

/// A TAI time of day. Seconds are 48 bits split across two fields.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct TaiTod {
    pub sec_msb_16b: u32,
    pub sec_lsb_32b: u32,
    pub nsec: u32,
    pub nfrac: u32,
}

/// Anything that can hand out egress timestamps.
pub trait TimestampSource {
    fn tx_timestamp(&mut self, port: u8, queue: u8) -> Result<TxTimestamp>;
}

pub struct Ptp<R: Pp2Rw> {
    regs: R,
    log: Logger,
}

impl<R: Pp2Rw> Ptp<R> {
    pub fn new(regs: R, log: &Logger) -> Self {
        Self { regs, log: log.new(slog::o!("unit" => "ptp")) }
    }

    pub fn regs(&self) -> &R {
        &self.regs
    }

    /// Combine the high/low halves of a split 32-bit capture field.
    fn read_split(&self, hi: u32, lo: u32) -> u32 {
        (self.regs.read(hi) << 16) | (self.regs.read(lo) & 0xffff)
    }

    fn read_capture(&self, slot: u32) -> TaiTod {
        // SEC_HIGH and the fraction are read even when unused: the
        // reads are what release the slot.
        let sec_msb_16b = self.regs.read(slot + SEC_HIGH);
        let sec_lsb_32b = self.read_split(slot + SEC_MED, slot + SEC_LOW);
        let nsec = self.read_split(slot + NANO_HIGH, slot + NANO_LOW);
        let nfrac = self.read_split(slot + FRAC_HIGH, slot + FRAC_LOW);
        TaiTod { sec_msb_16b, sec_lsb_32b, nsec, nfrac }
    }

    /// Read the time of day latched in capture slot 0.
    ///
    /// With `wait` the capture status is polled until slot 0 is valid,
    /// at most [`CAPTURE_WAIT_MAX`] times. Without it the slot is read
    /// whatever the status says. When more than slot 0 is marked, slot
    /// 1 is drained as well so the capture queue does not stall.
    pub fn tod_read_captured(&mut self, wait: bool) -> Result<TaiTod> {
        let status = if wait {
            let mut polls = 0;
            loop {
                if polls == CAPTURE_WAIT_MAX {
                    error!(
                        self.log, "TAI capture not ready";
                        "retries" => CAPTURE_WAIT_MAX,
                    );
                    return Err(Pp2Error::CaptureTimeout {
                        retries: CAPTURE_WAIT_MAX,
                    });
                }
                polls += 1;

                let status = self.regs.read(TAI_CAPTURE_STATUS);
                if status & TAI_CAPTURE0_VALID != 0 {
                    break status;
                }
            }
        } else {
            self.regs.read(TAI_CAPTURE_STATUS)
        };

        let tod = self.read_capture(TAI_CAPTURE_VALUE0);

        if status > 1 {
            let lost = self.read_capture(TAI_CAPTURE_VALUE1);
            info!(
                self.log, "capture-0 loss, taken from capture-1";
                "status" => status,
                "sec" => lost.sec_lsb_32b,
                "nsec" => lost.nsec,
            );
        }

        Ok(tod)
    }
}

impl<R: Pp2Rw> TimestampSource for Ptp<R> {
    fn tx_timestamp(&mut self, port: u8, queue: u8) -> Result<TxTimestamp> {
        if queue > 1 {
            return Err(Pp2Error::InvalidArg(format!(
                "timestamp queue {queue} out of range"
            )));
        }

        let base = tx_ts_queue_base(port, queue);
        let reg0 = self.regs.read(base);
        if reg0 & TX_TS_VALID == 0 {
            return Ok(TxTimestamp::Empty);
        }

        let mut ts = (reg0 >> 13) & 0x7;
        ts |= (self.regs.read(base + 4) & 0xffff) << 3;
        ts |= (self.regs.read(base + 8) & 0x1fff) << 19;

        if ts == 0 {
            return Ok(TxTimestamp::BadFcs);
        }
        Ok(TxTimestamp::Valid(ts))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::sim::SimRegs;

    fn ptp(regs: SimRegs) -> Ptp<SimRegs> {
        Ptp::new(regs, &Logger::root(slog::Discard, slog::o!()))
    }

    #[test]
    fn tx_timestamp_assembly() {
        let base = tx_ts_queue_base(2, 1);
        assert_eq!(base, 0x7800 + 0x2000 + 0x18);

        let mut regs = SimRegs::new();
        regs.poke(base, (0x5 << 13) | 1);
        regs.poke(base + 4, 0xabcd);
        regs.poke(base + 8, 0x1fff);
        let mut ptp = ptp(regs);

        let expected = 0x5 | (0xabcd << 3) | (0x1fff << 19);
        assert_eq!(ptp.tx_timestamp(2, 1), Ok(TxTimestamp::Valid(expected)));
        assert_eq!(ptp.tx_timestamp(2, 0), Ok(TxTimestamp::Empty));
        assert!(matches!(
            ptp.tx_timestamp(2, 2),
            Err(Pp2Error::InvalidArg(_))
        ));
    }

    #[test]
    fn tx_timestamp_zero_is_bad_fcs() {
        let mut regs = SimRegs::new();
        regs.poke(tx_ts_queue_base(0, 0), 1);
        let mut ptp = ptp(regs);
        assert_eq!(ptp.tx_timestamp(0, 0), Ok(TxTimestamp::BadFcs));
    }

    #[test]
    fn capture_times_out() {
        let mut ptp = ptp(SimRegs::new());
        assert_eq!(
            ptp.tod_read_captured(true),
            Err(Pp2Error::CaptureTimeout { retries: CAPTURE_WAIT_MAX })
        );
        assert_eq!(
            ptp.regs().reads_of(TAI_CAPTURE_STATUS),
            CAPTURE_WAIT_MAX as usize
        );
        // Nothing was read from the slot.
        assert_eq!(ptp.regs().reads_of(TAI_CAPTURE_VALUE0 + SEC_MED), 0);
    }

    #[test]
    fn capture_read_and_drain() {
        let mut regs = SimRegs::new();
        regs.poke(TAI_CAPTURE_STATUS, 0x3);
        regs.poke(TAI_CAPTURE_VALUE0 + SEC_HIGH, 0);
        regs.poke(TAI_CAPTURE_VALUE0 + SEC_MED, 0x1234);
        regs.poke(TAI_CAPTURE_VALUE0 + SEC_LOW, 0xf_5678);
        regs.poke(TAI_CAPTURE_VALUE0 + NANO_HIGH, 0x3b9a);
        regs.poke(TAI_CAPTURE_VALUE0 + NANO_LOW, 0xc9ff);
        regs.poke(TAI_CAPTURE_VALUE0 + FRAC_LOW, 0x7);
        let mut ptp = ptp(regs);

        let tod = ptp.tod_read_captured(true).unwrap();
        assert_eq!(
            tod,
            TaiTod {
                sec_msb_16b: 0,
                sec_lsb_32b: 0x1234_5678,
                nsec: 0x3b9a_c9ff,
                nfrac: 0x7,
            }
        );

        for off in [SEC_HIGH, SEC_MED, SEC_LOW, NANO_HIGH, FRAC_LOW] {
            assert_eq!(ptp.regs().reads_of(TAI_CAPTURE_VALUE1 + off), 1);
        }
    }

    #[test]
    fn capture_without_wait() {
        let mut ptp = ptp(SimRegs::new());
        assert_eq!(ptp.tod_read_captured(false), Ok(TaiTod::default()));
        assert_eq!(ptp.regs().reads_of(TAI_CAPTURE_STATUS), 1);
        assert_eq!(ptp.regs().reads_of(TAI_CAPTURE_VALUE1 + SEC_MED), 0);
    }
}
