//! Shadow-vs-device line differencing
//!
//! The differ keeps a backing copy of the last pixels transmitted to the
//! device and narrows each damaged span to the sub-range that actually
//! changed. After a mode set or an explicit invalidation the backing copy
//! is untrustworthy; the differ then reports every requested span as fully
//! dirty until a whole-surface repaint marks it synced again.

use alloc::vec::Vec;
use core::ops::Range;

use crate::device::DeviceError;

pub struct FrameDiffer {
    width: usize,
    backing: Vec<u16>,
    stale: bool,
}

impl FrameDiffer {
    pub fn new(width: usize, height: usize) -> Result<Self, DeviceError> {
        let len = width
            .checked_mul(height)
            .ok_or(DeviceError::Allocation)?;
        let mut backing = Vec::new();
        backing
            .try_reserve_exact(len)
            .map_err(|_| DeviceError::Allocation)?;
        backing.resize(len, 0);
        Ok(Self {
            width,
            backing,
            stale: true,
        })
    }

    /// Reallocate for a new geometry. The backing copy no longer matches
    /// device memory, so the differ goes stale.
    pub fn resize(&mut self, width: usize, height: usize) -> Result<(), DeviceError> {
        *self = Self::new(width, height)?;
        Ok(())
    }

    /// Declare device memory unknown; every span is dirty until the next
    /// full repaint.
    pub fn invalidate(&mut self) {
        self.stale = true;
    }

    /// Declare device memory in sync with the backing copy. Only valid
    /// after a whole-surface repaint has committed every line.
    pub fn mark_synced(&mut self) {
        self.stale = false;
    }

    pub fn is_stale(&self) -> bool {
        self.stale
    }

    /// Narrow `cols` of `row` to the `(first, last)` pixel pair that
    /// differs from device memory. `None` means the span is already
    /// up to date. Scans forward then backward so only the dirty middle
    /// gets encoded.
    pub fn diff_line(&self, row: usize, cols: Range<usize>, fb_row: &[u16]) -> Option<(usize, usize)> {
        if cols.is_empty() {
            return None;
        }
        if self.stale {
            return Some((cols.start, cols.end - 1));
        }
        let back = &self.backing[row * self.width..][..self.width];
        let first = cols.clone().find(|&c| back[c] != fb_row[c])?;
        // A backward find is cheap: the forward scan proved a difference
        // exists, so this terminates at or after `first`.
        let last = cols.rev().find(|&c| back[c] != fb_row[c])?;
        Some((first, last))
    }

    /// Record that `cols` of `row` now matches `fb_row` on the device
    pub fn commit_line(&mut self, row: usize, cols: Range<usize>, fb_row: &[u16]) {
        let back = &mut self.backing[row * self.width..][..self.width];
        back[cols.clone()].copy_from_slice(&fb_row[cols]);
    }
}
