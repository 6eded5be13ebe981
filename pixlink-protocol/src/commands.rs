//! Register-write command grammar
//!
//! Device configuration happens through atomic 4-byte register writes,
//! `[0xAF, 0x20, address, value]`. Multi-byte logical registers are written
//! as consecutive single-byte commands; the device latches the composite
//! value on the last write, so callers must not interleave unrelated writes
//! into a composite sequence.

use crate::lfsr::lfsr16;

/// Command synchronization byte; also a benign no-op pad value
pub const SYNC_BYTE: u8 = 0xAF;

/// Opcode: single register write
pub const OP_REGISTER_WRITE: u8 = 0x20;
/// Opcode: raw pixel span, uncompressed big-endian pixels (legacy fallback)
pub const OP_RAW_SPAN: u8 = 0x68;
/// Opcode: solid fill span
pub const OP_FILL_SPAN: u8 = 0x69;
/// Opcode: copy span, device memory to device memory
pub const OP_COPY_SPAN: u8 = 0x6A;
/// Opcode: hybrid raw/RLE span (primary pixel encoding)
pub const OP_RLX_SPAN: u8 = 0x6B;
/// Opcode: commit/flush sentinel, no payload
pub const OP_COMMIT: u8 = 0xA0;

/// Size of one register-write command in bytes
pub const REGISTER_CMD_BYTES: usize = 4;

/// Highest linear device address the 3-byte wire format can carry
pub const MAX_DEVICE_ADDRESS: u32 = 0x00FF_FFFF;

/// Errors that can occur while building commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EncodeError {
    /// Destination buffer cannot hold the command
    BufferFull,
    /// Timing descriptor whose geometry the registers cannot represent
    InvalidTiming,
}

/// Builder that appends protocol commands to a borrowed byte buffer.
///
/// Owns a write cursor into the buffer; every method either appends a
/// complete command or fails with [`EncodeError::BufferFull`] leaving the
/// cursor untouched. A partially written command is never left behind.
pub struct CommandStream<'a> {
    buf: &'a mut [u8],
    len: usize,
}

impl<'a> CommandStream<'a> {
    /// Create a builder writing from the start of `buf`
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, len: 0 }
    }

    /// Number of bytes written so far
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check whether nothing has been written yet
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The bytes written so far
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    fn append(&mut self, bytes: &[u8]) -> Result<(), EncodeError> {
        if self.buf.len() - self.len < bytes.len() {
            return Err(EncodeError::BufferFull);
        }
        self.buf[self.len..self.len + bytes.len()].copy_from_slice(bytes);
        self.len += bytes.len();
        Ok(())
    }

    /// Append a single register write: `[0xAF, 0x20, reg, value]`
    pub fn write_register(&mut self, reg: u8, value: u8) -> Result<(), EncodeError> {
        self.append(&[SYNC_BYTE, OP_REGISTER_WRITE, reg, value])
    }

    /// Write a 16-bit value as two register writes, high byte to `reg`,
    /// low byte to `reg + 1`
    pub fn write_register16(&mut self, reg: u8, value: u16) -> Result<(), EncodeError> {
        self.write_register(reg, (value >> 8) as u8)?;
        self.write_register(reg + 1, value as u8)
    }

    /// Write a 16-bit value low byte first.
    ///
    /// A few registers latch their composite value in the opposite byte
    /// order from the rest; the pixel clock pair is one of them.
    pub fn write_register16_le(&mut self, reg: u8, value: u16) -> Result<(), EncodeError> {
        self.write_register(reg, value as u8)?;
        self.write_register(reg + 1, (value >> 8) as u8)
    }

    /// Write a 16-bit count value through the LFSR pre-image transform.
    ///
    /// See [`crate::lfsr::lfsr16`] for why counter registers need this.
    pub fn write_register_lfsr16(&mut self, reg: u8, value: u16) -> Result<(), EncodeError> {
        self.write_register16(reg, lfsr16(value))
    }

    /// Program the 16-bpp segment base address (registers `0x20..=0x22`,
    /// high byte first)
    pub fn write_base16bpp(&mut self, base: u32) -> Result<(), EncodeError> {
        debug_assert!(base <= MAX_DEVICE_ADDRESS);
        self.write_register(0x20, (base >> 16) as u8)?;
        self.write_register(0x21, (base >> 8) as u8)?;
        self.write_register(0x22, base as u8)
    }

    /// Program the 8-bpp segment base address (registers `0x26..=0x28`)
    pub fn write_base8bpp(&mut self, base: u32) -> Result<(), EncodeError> {
        debug_assert!(base <= MAX_DEVICE_ADDRESS);
        self.write_register(0x26, (base >> 16) as u8)?;
        self.write_register(0x27, (base >> 8) as u8)?;
        self.write_register(0x28, base as u8)
    }

    /// Append a solid fill span: `count` repetitions of `color` starting at
    /// `address`. A count of 0 would mean 256 to the hardware and is never
    /// emitted; callers split larger fills.
    pub fn write_fill_span(&mut self, address: u32, count: u8, color: u16) -> Result<(), EncodeError> {
        debug_assert!(address <= MAX_DEVICE_ADDRESS);
        debug_assert!(count != 0);
        let c = color.to_be_bytes();
        self.append(&[
            SYNC_BYTE,
            OP_FILL_SPAN,
            (address >> 16) as u8,
            (address >> 8) as u8,
            address as u8,
            count,
            c[0],
            c[1],
        ])
    }

    /// Append a device-to-device copy span: `count` pixels from `src` to
    /// `dst`
    pub fn write_copy_span(&mut self, dst: u32, count: u8, src: u32) -> Result<(), EncodeError> {
        debug_assert!(dst <= MAX_DEVICE_ADDRESS && src <= MAX_DEVICE_ADDRESS);
        debug_assert!(count != 0);
        self.append(&[
            SYNC_BYTE,
            OP_COPY_SPAN,
            (dst >> 16) as u8,
            (dst >> 8) as u8,
            dst as u8,
            count,
            (src >> 16) as u8,
            (src >> 8) as u8,
            src as u8,
        ])
    }

    /// Append the commit/flush sentinel `[0xAF, 0xA0]`
    pub fn commit(&mut self) -> Result<(), EncodeError> {
        self.append(&[SYNC_BYTE, OP_COMMIT])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_write_bytes() {
        let mut buf = [0u8; 8];
        let mut cmds = CommandStream::new(&mut buf);
        cmds.write_register(0x1F, 0x00).unwrap();
        assert_eq!(cmds.as_bytes(), &[0xAF, 0x20, 0x1F, 0x00]);
    }

    #[test]
    fn test_register16_high_byte_first() {
        let mut buf = [0u8; 8];
        let mut cmds = CommandStream::new(&mut buf);
        cmds.write_register16(0x0F, 0x0400).unwrap();
        assert_eq!(
            cmds.as_bytes(),
            &[0xAF, 0x20, 0x0F, 0x04, 0xAF, 0x20, 0x10, 0x00]
        );
    }

    #[test]
    fn test_register16_le_low_byte_first() {
        let mut buf = [0u8; 8];
        let mut cmds = CommandStream::new(&mut buf);
        cmds.write_register16_le(0x1B, 0x32C8).unwrap();
        assert_eq!(
            cmds.as_bytes(),
            &[0xAF, 0x20, 0x1B, 0xC8, 0xAF, 0x20, 0x1C, 0x32]
        );
    }

    #[test]
    fn test_lfsr16_write_matches_transform() {
        let mut buf = [0u8; 8];
        let mut cmds = CommandStream::new(&mut buf);
        cmds.write_register_lfsr16(0x01, 296).unwrap();
        let expected = crate::lfsr::lfsr16(296);
        assert_eq!(cmds.as_bytes()[3], (expected >> 8) as u8);
        assert_eq!(cmds.as_bytes()[7], expected as u8);
    }

    #[test]
    fn test_base_address_writes() {
        let mut buf = [0u8; 24];
        let mut cmds = CommandStream::new(&mut buf);
        cmds.write_base16bpp(0).unwrap();
        cmds.write_base8bpp(0x18_0000).unwrap();
        assert_eq!(
            cmds.as_bytes(),
            &[
                0xAF, 0x20, 0x20, 0x00, 0xAF, 0x20, 0x21, 0x00, 0xAF, 0x20, 0x22, 0x00, //
                0xAF, 0x20, 0x26, 0x18, 0xAF, 0x20, 0x27, 0x00, 0xAF, 0x20, 0x28, 0x00,
            ]
        );
    }

    #[test]
    fn test_fill_and_copy_spans() {
        let mut buf = [0u8; 32];
        let mut cmds = CommandStream::new(&mut buf);
        cmds.write_fill_span(0x010203, 64, 0xF800).unwrap();
        cmds.write_copy_span(0x000010, 8, 0x000800).unwrap();
        assert_eq!(
            cmds.as_bytes(),
            &[
                0xAF, 0x69, 0x01, 0x02, 0x03, 64, 0xF8, 0x00, //
                0xAF, 0x6A, 0x00, 0x00, 0x10, 8, 0x00, 0x08, 0x00,
            ]
        );
    }

    #[test]
    fn test_commit_sentinel() {
        let mut buf = [0u8; 2];
        let mut cmds = CommandStream::new(&mut buf);
        cmds.commit().unwrap();
        assert_eq!(cmds.as_bytes(), &[0xAF, 0xA0]);
    }

    #[test]
    fn test_buffer_full_leaves_cursor_untouched() {
        let mut buf = [0u8; 6];
        let mut cmds = CommandStream::new(&mut buf);
        cmds.write_register(0x00, 0x00).unwrap();
        assert_eq!(cmds.write_register(0x01, 0x01), Err(EncodeError::BufferFull));
        assert_eq!(cmds.len(), 4);
    }
}
