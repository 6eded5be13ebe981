//! Extended display descriptor parsing and repair
//!
//! The monitor's capabilities arrive as a fixed 128-byte descriptor block
//! fetched byte-by-byte over the control channel. This module validates the
//! block, extracts the preferred detailed timing into a
//! [`TimingDescriptor`], and repairs blocks from known-bad devices that ship
//! a placeholder identity (all-0xFF manufacturer/product fields) with
//! known-good 640x480 @ 60 Hz values.

use crate::mode::TimingDescriptor;

/// Size of one descriptor block in bytes
pub const EDID_LENGTH: usize = 128;

/// Offset of the first detailed timing descriptor
const DTD_OFFSET: usize = 54;

/// Fixed 8-byte header pattern every valid block starts with
const HEADER: [u8; 8] = [0x00, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x00];

/// Errors that can occur while parsing a descriptor block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EdidError {
    /// Header pattern mismatch
    BadHeader,
    /// Block bytes do not sum to zero modulo 256
    BadChecksum,
    /// First detailed timing descriptor is absent or empty
    NoDetailedTiming,
}

/// Compute the checksum byte: two's complement of the sum of the first 127
/// bytes, so the whole block sums to zero modulo 256
pub fn checksum(block: &[u8; EDID_LENGTH]) -> u8 {
    let sum = block[..EDID_LENGTH - 1]
        .iter()
        .fold(0u8, |acc, &b| acc.wrapping_add(b));
    0u8.wrapping_sub(sum)
}

/// Parse the preferred detailed timing out of a descriptor block.
///
/// Validates the header pattern and checksum first; a block that fails
/// either is rejected wholesale rather than risking garbage geometry.
pub fn parse_timing(block: &[u8; EDID_LENGTH]) -> Result<TimingDescriptor, EdidError> {
    if block[..8] != HEADER {
        return Err(EdidError::BadHeader);
    }
    if block.iter().fold(0u8, |acc, &b| acc.wrapping_add(b)) != 0 {
        return Err(EdidError::BadChecksum);
    }

    let d = &block[DTD_OFFSET..DTD_OFFSET + 18];

    // Pixel clock in 10 kHz units, little endian; zero marks a display
    // descriptor rather than a timing.
    let clock_10khz = u16::from_le_bytes([d[0], d[1]]);
    if clock_10khz == 0 {
        return Err(EdidError::NoDetailedTiming);
    }

    // Active/blank extents carry their high nibbles in shared bytes.
    let active_width = d[2] as u16 | ((d[4] as u16 & 0xF0) << 4);
    let h_blank = d[3] as u16 | ((d[4] as u16 & 0x0F) << 8);
    let active_height = d[5] as u16 | ((d[7] as u16 & 0xF0) << 4);
    let v_blank = d[6] as u16 | ((d[7] as u16 & 0x0F) << 8);

    // Sync fields: 8 (h) / 4 (v) low bits plus 2 high bits each in byte 11.
    let h_sync_offset = d[8] as u16 | ((d[11] as u16 & 0xC0) << 2);
    let h_sync_width = d[9] as u16 | ((d[11] as u16 & 0x30) << 4);
    let v_sync_offset = (d[10] as u16 >> 4) | ((d[11] as u16 & 0x0C) << 2);
    let v_sync_width = (d[10] as u16 & 0x0F) | ((d[11] as u16 & 0x03) << 4);

    // Period in picoseconds: 10^12 / (units * 10^4), rounded.
    let pixel_clock_ps = (100_000_000 + clock_10khz as u32 / 2) / clock_10khz as u32;

    Ok(TimingDescriptor {
        active_width,
        active_height,
        h_blank,
        v_blank,
        h_sync_offset,
        v_sync_offset,
        h_sync_width,
        v_sync_width,
        pixel_clock_ps,
    })
}

/// Detailed timing block for 640x480 @ 60 Hz (25.17 MHz), the known-good
/// fallback mode
const FALLBACK_DTD: [u8; 18] = [
    0xD5, 0x09, // pixel clock: 2517 x 10 kHz
    0x80, 0xA0, 0x20, // hactive 640, hblank 160
    0xE0, 0x2D, 0x10, // vactive 480, vblank 45
    0x10, 0x60, // hsync offset 16, width 96
    0xA2, 0x00, // vsync offset 10, width 2
    0x40, 0xF0, 0x10, // image size 320 x 240 mm (4:3)
    0x00, 0x00, // no border
    0x1E, // analog, separate sync, both polarities negative
];

/// sRGB chromaticity coordinates (block offsets 25..=34)
const SRGB_CHROMATICITY: [u8; 10] = [0xEE, 0x91, 0xA3, 0x54, 0x4C, 0x99, 0x26, 0x0F, 0x50, 0x54];

/// Repair a descriptor block from a known-bad device.
///
/// Some controller revisions ship an internal descriptor with the
/// manufacturer and product identity left as the all-0xFF placeholder; the
/// rest of such a block cannot be trusted either. When the placeholder is
/// detected, physical size, gamma, chromaticity and the preferred detailed
/// timing are overwritten with known-good values and the checksum byte is
/// recomputed. Returns whether the block was rewritten.
pub fn fixup_known_bad(block: &mut [u8; EDID_LENGTH]) -> bool {
    if block[8..12] != [0xFF; 4] {
        return false;
    }

    // Physical size in cm (4:3) and gamma 2.2.
    block[21] = 32;
    block[22] = 24;
    block[23] = 120;
    block[25..35].copy_from_slice(&SRGB_CHROMATICITY);
    block[DTD_OFFSET..DTD_OFFSET + 18].copy_from_slice(&FALLBACK_DTD);
    block[EDID_LENGTH - 1] = checksum(block);
    true
}
