//! Outbound command buffering
//!
//! Commands accumulate in a fixed buffer and are flushed to the transport
//! when the remaining headroom drops below a high-water mark. The mark is
//! sized so a command being built never has to straddle a flush boundary:
//! encoders stop early, the unusable tail is padded with sync no-ops, and
//! the next command starts in a fresh buffer.

use alloc::vec::Vec;

use pixlink_protocol::commands::EncodeError;
use pixlink_protocol::rlx::{self, MIN_RLX_CMD_BYTES};

use crate::device::DeviceError;

/// Default output buffer size
pub const BUFFER_CAPACITY: usize = 64 * 1024;

/// Default flush threshold: flush when less than this much room remains
pub const HIGH_WATER_BYTES: usize = 1024;

pub struct CommandBuffer {
    buf: Vec<u8>,
    cursor: usize,
    high_water: usize,
}

impl CommandBuffer {
    pub fn new() -> Result<Self, DeviceError> {
        Self::with_capacity(BUFFER_CAPACITY, HIGH_WATER_BYTES)
    }

    /// Build a buffer with explicit sizing. The high-water mark must
    /// exceed the minimum command size or encoders could be handed a
    /// window too small for any output, and must fit in the buffer.
    pub fn with_capacity(capacity: usize, high_water: usize) -> Result<Self, DeviceError> {
        assert!(high_water > MIN_RLX_CMD_BYTES);
        assert!(capacity >= high_water);
        let mut buf = Vec::new();
        buf.try_reserve_exact(capacity)
            .map_err(|_| DeviceError::Allocation)?;
        buf.resize(capacity, 0);
        Ok(Self {
            buf,
            cursor: 0,
            high_water,
        })
    }

    /// True when the remaining headroom is below the high-water mark and
    /// the buffer should be flushed before encoding more
    pub fn needs_flush(&self) -> bool {
        self.buf.len() - self.cursor < self.high_water
    }

    /// The writable tail for an encoder to fill; pair with [`Self::advance`]
    pub fn window_mut(&mut self) -> &mut [u8] {
        let cursor = self.cursor;
        &mut self.buf[cursor..]
    }

    /// Account for bytes an encoder wrote into the window
    pub fn advance(&mut self, bytes: usize) {
        debug_assert!(self.cursor + bytes <= self.buf.len());
        self.cursor += bytes;
    }

    /// Append pre-built command bytes (mode sequences, sentinels)
    pub fn append(&mut self, bytes: &[u8]) -> Result<(), DeviceError> {
        if self.buf.len() - self.cursor < bytes.len() {
            return Err(DeviceError::Encode(EncodeError::BufferFull));
        }
        self.buf[self.cursor..self.cursor + bytes.len()].copy_from_slice(bytes);
        self.cursor += bytes.len();
        Ok(())
    }

    /// Everything accumulated and not yet flushed
    pub fn pending(&self) -> &[u8] {
        &self.buf[..self.cursor]
    }

    pub fn is_empty(&self) -> bool {
        self.cursor == 0
    }

    /// Discard accumulated bytes after a flush (or a failed one)
    pub fn clear(&mut self) {
        self.cursor = 0;
    }

    /// Pad the remaining tail with sync no-ops so the full buffer can be
    /// transmitted. Only called when the tail is too small for a command.
    pub fn pad_tail(&mut self) {
        let cursor = self.cursor;
        self.cursor += rlx::pad_tail(&mut self.buf[cursor..]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_buffer_has_full_headroom() {
        let mut b = CommandBuffer::with_capacity(64, 16).unwrap();
        assert!(!b.needs_flush());
        assert!(b.is_empty());
        assert_eq!(b.window_mut().len(), 64);
    }

    #[test]
    fn test_high_water_triggers_flush() {
        let mut b = CommandBuffer::with_capacity(64, 16).unwrap();
        b.advance(48);
        assert!(!b.needs_flush()); // exactly 16 left
        b.advance(1);
        assert!(b.needs_flush());
    }

    #[test]
    fn test_append_and_pending() {
        let mut b = CommandBuffer::with_capacity(64, 16).unwrap();
        b.append(&[0xAF, 0xA0]).unwrap();
        assert_eq!(b.pending(), &[0xAF, 0xA0]);
        b.clear();
        assert!(b.is_empty());
    }

    #[test]
    fn test_append_overflow_rejected() {
        let mut b = CommandBuffer::with_capacity(16, 10).unwrap();
        assert!(b.append(&[0u8; 17]).is_err());
        assert!(b.is_empty());
    }

    #[test]
    fn test_pad_tail_fills_remainder() {
        let mut b = CommandBuffer::with_capacity(16, 10).unwrap();
        b.advance(9);
        b.pad_tail();
        assert_eq!(b.pending().len(), 16);
        assert_eq!(&b.pending()[9..], &[0xAF; 7]);
    }
}
