// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 Oxide Computer Company

//! Register window access.
//!
//! Every table the parser and classifier own is reached indirectly:
//! software writes a line index to an index register and then moves
//! whole words through a data register. The trait below is the only
//! thing the rest of the crate needs from the hardware.

use core::ptr::NonNull;

/// 32-bit register access into the packet processor's window.
pub trait Pp2Rw {
    fn read(&self, offset: u32) -> u32;

    fn write(&mut self, offset: u32, val: u32);

    /// Read-modify-write of a single register.
    fn modify<F>(&mut self, offset: u32, f: F)
    where
        F: FnOnce(&mut u32),
    {
        let mut val = self.read(offset);
        f(&mut val);
        self.write(offset, val);
    }
}

/// A memory-mapped register window.
pub struct Mmio {
    base: NonNull<u32>,
    len: usize,
}

impl Mmio {
    /// Wrap a mapped window of `len` bytes starting at `base`.
    ///
    /// # Safety
    ///
    /// `base` must point to a live, 4-byte aligned mapping of at least
    /// `len` bytes that stays mapped for the lifetime of the returned
    /// value, and nothing else may hold a mutable alias of it.
    pub unsafe fn new(base: NonNull<u32>, len: usize) -> Self {
        Self { base, len }
    }

    fn word(&self, offset: u32) -> Option<*mut u32> {
        let offset = offset as usize;
        let in_window = offset % 4 == 0 && offset + 4 <= self.len;
        debug_assert!(
            in_window,
            "register {offset:#x} outside {:#x} byte window",
            self.len
        );
        if !in_window {
            return None;
        }
        // SAFETY: in bounds of the window handed to `new`.
        Some(unsafe { self.base.as_ptr().add(offset / 4) })
    }
}

impl Pp2Rw for Mmio {
    /// Unaligned or out-of-window reads return all ones, which is what
    /// the bus reports for an unclaimed address. Debug builds panic
    /// instead.
    fn read(&self, offset: u32) -> u32 {
        match self.word(offset) {
            // SAFETY: see `Mmio::new`.
            Some(p) => unsafe { p.read_volatile() },
            None => u32::MAX,
        }
    }

    fn write(&mut self, offset: u32, val: u32) {
        if let Some(p) = self.word(offset) {
            // SAFETY: see `Mmio::new`.
            unsafe { p.write_volatile(val) }
        }
    }
}
