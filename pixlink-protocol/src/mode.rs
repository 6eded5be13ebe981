//! Scanout geometry programming
//!
//! Translates a monitor timing descriptor into the register sequence that
//! configures the controller's scanout: unlock, frame base addresses, color
//! depth, horizontal/vertical geometry, pixel clock, unblank, lock, commit.
//! Counter registers go through the LFSR pre-image transform; see
//! [`crate::lfsr`].

use heapless::Vec;

use crate::commands::{CommandStream, EncodeError};

/// Color depth selector value for 16-bpp RGB565 scanout
pub const COLOR_DEPTH_16BPP: u8 = 0x00;

/// Upper bound on the mode sequence: 9 single-byte register writes, 13
/// 16-bit composites, two 3-byte base addresses, plus the commit sentinel
pub const MODE_SEQUENCE_MAX: usize = 160;

/// Display timing parameters for one video mode.
///
/// Produced by parsing an extended display descriptor
/// ([`crate::edid::parse_timing`]) or constructed directly from override
/// values. Immutable once built; the register sequence is a pure function
/// of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TimingDescriptor {
    /// Active (visible) pixels per line
    pub active_width: u16,
    /// Active lines per frame
    pub active_height: u16,
    /// Total horizontal blanking in pixels
    pub h_blank: u16,
    /// Total vertical blanking in lines
    pub v_blank: u16,
    /// Horizontal sync offset (front porch) in pixels
    pub h_sync_offset: u16,
    /// Vertical sync offset (front porch) in lines
    pub v_sync_offset: u16,
    /// Horizontal sync pulse width in pixels
    pub h_sync_width: u16,
    /// Vertical sync pulse width in lines
    pub v_sync_width: u16,
    /// Pixel clock period in picoseconds
    pub pixel_clock_ps: u32,
}

impl TimingDescriptor {
    /// Pixel clock in the 5 kHz units the controller is programmed with,
    /// rounded from the picosecond period and clamped to the register
    /// range. A zero period clamps to the fastest programmable clock.
    pub fn pixel_clock_5khz(&self) -> u16 {
        if self.pixel_clock_ps == 0 {
            return u16::MAX;
        }
        // 10^12 ps/s divided by 5000 Hz per unit
        let units = (200_000_000 + self.pixel_clock_ps / 2) / self.pixel_clock_ps;
        units.min(u32::from(u16::MAX)) as u16
    }
}

/// Explicit mode overrides supplied by the caller.
///
/// A zero field means "use the descriptor's native value".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ModeOverrides {
    /// Replacement active width in pixels, 0 to keep the descriptor's
    pub width: u16,
    /// Replacement active height in lines, 0 to keep the descriptor's
    pub height: u16,
    /// Requested refresh rate in Hz. Accepted and recorded, but pixel clock
    /// recomputation from it is a declared, unimplemented extension point:
    /// callers must not rely on it altering the clock.
    pub freq: u16,
}

impl ModeOverrides {
    /// Apply non-zero overrides to a descriptor
    pub fn apply(&self, timing: &TimingDescriptor) -> TimingDescriptor {
        let mut applied = *timing;
        if self.width != 0 {
            applied.active_width = self.width;
        }
        if self.height != 0 {
            applied.active_height = self.height;
        }
        applied
    }
}

/// Build the full register-programming sequence for one mode set.
///
/// `screen_bytes` is the size of the 16-bpp segment; the 8-bpp segment base
/// is placed directly behind it. The result is byte-identical across calls
/// with equal inputs. Descriptors whose geometry the registers cannot
/// represent are rejected with [`EncodeError::InvalidTiming`].
pub fn build_mode_sequence(
    timing: &TimingDescriptor,
    overrides: &ModeOverrides,
    depth: u8,
    screen_bytes: u32,
) -> Result<Vec<u8, MODE_SEQUENCE_MAX>, EncodeError> {
    let t = overrides.apply(timing);

    let mut buf = [0u8; MODE_SEQUENCE_MAX];
    let mut cmds = CommandStream::new(&mut buf);

    // Unlock the video registers for programming.
    cmds.write_register(0xFF, 0x00)?;

    // Frame base addresses: 16-bpp segment at 0, 8-bpp segment behind it.
    cmds.write_base16bpp(0)?;
    cmds.write_base8bpp(screen_bytes)?;

    cmds.write_register(0x00, depth)?;

    // Geometry the registers cannot represent is rejected up front: a
    // checksum-valid descriptor block can still carry sync intervals wider
    // than their blanking (which would wrap the subtractions below) or
    // zero active extents. Composite counts must also fit 16 bits.
    if t.active_width == 0 || t.active_height == 0 {
        return Err(EncodeError::InvalidTiming);
    }
    if u32::from(t.h_sync_offset) + u32::from(t.h_sync_width) > u32::from(t.h_blank)
        || t.v_sync_offset > t.v_blank
    {
        return Err(EncodeError::InvalidTiming);
    }

    let x_display_start = t.h_blank - t.h_sync_offset;
    let y_display_start = t.v_blank - t.v_sync_offset;
    let blank_tail = x_display_start - t.h_sync_width;
    let x_display_end = u32::from(x_display_start) + u32::from(t.active_width);
    let y_display_end = u32::from(y_display_start) + u32::from(t.active_height);
    // Horizontal end count: display end plus the blanking tail.
    let x_end_count = x_display_end + u32::from(blank_tail) - 1;
    // Vertical end count covers active plus all blanking.
    let y_end_count = u32::from(t.active_height) + u32::from(t.v_blank);

    if x_display_end > 0xFFFF
        || x_end_count > 0xFFFF
        || y_end_count > 0xFFFF
        || u32::from(t.h_sync_width) + 1 > 0xFFFF
    {
        return Err(EncodeError::InvalidTiming);
    }

    // Counter registers take LFSR pre-images; the raw active-extent
    // registers do not.
    cmds.write_register_lfsr16(0x01, x_display_start)?;
    cmds.write_register_lfsr16(0x03, x_display_end as u16)?;
    cmds.write_register_lfsr16(0x05, y_display_start)?;
    cmds.write_register_lfsr16(0x07, y_display_end as u16)?;
    cmds.write_register_lfsr16(0x09, x_end_count as u16)?;

    // hsync start is hardwired to 1, hsync end is pulse width + 1.
    cmds.write_register_lfsr16(0x0B, 1)?;
    cmds.write_register_lfsr16(0x0D, t.h_sync_width + 1)?;
    cmds.write_register16(0x0F, t.active_width)?;

    cmds.write_register_lfsr16(0x11, y_end_count as u16)?;

    // vsync start is hardwired to 0, vsync end is the pulse width.
    cmds.write_register_lfsr16(0x13, 0)?;
    cmds.write_register_lfsr16(0x15, t.v_sync_width)?;
    cmds.write_register16(0x17, t.active_height)?;

    // The pixel clock pair latches low byte first.
    cmds.write_register16_le(0x1B, t.pixel_clock_5khz())?;

    // Unblank, relock, commit.
    cmds.write_register(0x1F, 0x00)?;
    cmds.write_register(0xFF, 0xFF)?;
    cmds.commit()?;

    Vec::from_slice(cmds.as_bytes()).map_err(|_| EncodeError::BufferFull)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{OP_COMMIT, OP_REGISTER_WRITE, SYNC_BYTE};
    use crate::lfsr::lfsr16;

    /// XGA 1024x768 @ 60 Hz, 65 MHz pixel clock
    fn xga_timing() -> TimingDescriptor {
        TimingDescriptor {
            active_width: 1024,
            active_height: 768,
            h_blank: 320,
            v_blank: 38,
            h_sync_offset: 24,
            v_sync_offset: 3,
            h_sync_width: 136,
            v_sync_width: 6,
            pixel_clock_ps: 15384,
        }
    }

    /// Collect (register, value) pairs from a sequence
    fn register_writes(seq: &[u8]) -> std::vec::Vec<(u8, u8)> {
        let mut writes = std::vec::Vec::new();
        let mut i = 0;
        while i < seq.len() {
            assert_eq!(seq[i], SYNC_BYTE);
            match seq[i + 1] {
                OP_REGISTER_WRITE => {
                    writes.push((seq[i + 2], seq[i + 3]));
                    i += 4;
                }
                OP_COMMIT => i += 2,
                other => panic!("unexpected opcode {:#04x}", other),
            }
        }
        writes
    }

    fn value16(writes: &[(u8, u8)], reg: u8) -> u16 {
        let hi = writes.iter().find(|w| w.0 == reg).unwrap().1;
        let lo = writes.iter().find(|w| w.0 == reg + 1).unwrap().1;
        (hi as u16) << 8 | lo as u16
    }

    #[test]
    fn test_sequence_is_deterministic() {
        let timing = xga_timing();
        let a = build_mode_sequence(&timing, &ModeOverrides::default(), COLOR_DEPTH_16BPP, 1024 * 768 * 2).unwrap();
        let b = build_mode_sequence(&timing, &ModeOverrides::default(), COLOR_DEPTH_16BPP, 1024 * 768 * 2).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_sequence_framing() {
        let seq =
            build_mode_sequence(&xga_timing(), &ModeOverrides::default(), COLOR_DEPTH_16BPP, 0)
                .unwrap();

        // Starts with the unlock write, ends with lock then commit.
        assert_eq!(&seq[..4], &[0xAF, 0x20, 0xFF, 0x00]);
        let n = seq.len();
        assert_eq!(&seq[n - 6..], &[0xAF, 0x20, 0xFF, 0xFF, 0xAF, 0xA0]);
    }

    #[test]
    fn test_xga_geometry_values() {
        let seq =
            build_mode_sequence(&xga_timing(), &ModeOverrides::default(), COLOR_DEPTH_16BPP, 1024 * 768 * 2)
                .unwrap();
        let writes = register_writes(&seq);

        // x display start = 320 - 24 = 296; end = 296 + 1024 = 1320
        assert_eq!(value16(&writes, 0x01), lfsr16(296));
        assert_eq!(value16(&writes, 0x03), lfsr16(1320));
        // y display start = 38 - 3 = 35; end = 35 + 768 = 803
        assert_eq!(value16(&writes, 0x05), lfsr16(35));
        assert_eq!(value16(&writes, 0x07), lfsr16(803));
        // x end count = 1320 + (320 - 24 - 136) - 1 = 1479
        assert_eq!(value16(&writes, 0x09), lfsr16(1479));
        assert_eq!(value16(&writes, 0x0B), lfsr16(1));
        assert_eq!(value16(&writes, 0x0D), lfsr16(137));
        // active extents are raw, not transformed
        assert_eq!(value16(&writes, 0x0F), 1024);
        assert_eq!(value16(&writes, 0x17), 768);
        // y end count = 768 + 38
        assert_eq!(value16(&writes, 0x11), lfsr16(806));
        assert_eq!(value16(&writes, 0x13), lfsr16(0));
        assert_eq!(value16(&writes, 0x15), lfsr16(6));
    }

    #[test]
    fn test_sync_wider_than_blanking_rejected() {
        // A checksum-valid descriptor block can carry these; they must be
        // rejected, not wrapped into garbage register values.
        let mut t = xga_timing();
        t.h_blank = 16;
        t.h_sync_offset = 32;
        assert_eq!(
            build_mode_sequence(&t, &ModeOverrides::default(), COLOR_DEPTH_16BPP, 0),
            Err(EncodeError::InvalidTiming)
        );

        let mut t = xga_timing();
        t.h_sync_width = 300; // 24 + 300 exceeds the 320-pixel blanking
        assert_eq!(
            build_mode_sequence(&t, &ModeOverrides::default(), COLOR_DEPTH_16BPP, 0),
            Err(EncodeError::InvalidTiming)
        );

        let mut t = xga_timing();
        t.v_sync_offset = 50; // exceeds the 38-line vertical blanking
        assert_eq!(
            build_mode_sequence(&t, &ModeOverrides::default(), COLOR_DEPTH_16BPP, 0),
            Err(EncodeError::InvalidTiming)
        );
    }

    #[test]
    fn test_zero_active_extent_rejected() {
        let mut t = xga_timing();
        t.active_width = 0;
        assert_eq!(
            build_mode_sequence(&t, &ModeOverrides::default(), COLOR_DEPTH_16BPP, 0),
            Err(EncodeError::InvalidTiming)
        );
    }

    #[test]
    fn test_oversized_end_count_rejected() {
        let mut t = xga_timing();
        t.active_width = 65000;
        t.h_blank = 5000;
        t.h_sync_offset = 0;
        t.h_sync_width = 0;
        assert_eq!(
            build_mode_sequence(&t, &ModeOverrides::default(), COLOR_DEPTH_16BPP, 0),
            Err(EncodeError::InvalidTiming)
        );
    }

    #[test]
    fn test_pixel_clock_guards() {
        let mut t = xga_timing();
        t.pixel_clock_ps = 0;
        assert_eq!(t.pixel_clock_5khz(), u16::MAX);
        // a period short enough to overflow the register clamps too
        t.pixel_clock_ps = 1000;
        assert_eq!(t.pixel_clock_5khz(), u16::MAX);
        t.pixel_clock_ps = 15384;
        assert_eq!(t.pixel_clock_5khz(), 13001);
    }

    #[test]
    fn test_pixel_clock_low_byte_first() {
        // 65 MHz = 13001 units of 5 kHz after rounding 2e8 / 15384.
        let t = xga_timing();
        assert_eq!(t.pixel_clock_5khz(), 13001);

        let seq =
            build_mode_sequence(&t, &ModeOverrides::default(), COLOR_DEPTH_16BPP, 0).unwrap();
        let writes = register_writes(&seq);
        let lo = writes.iter().find(|w| w.0 == 0x1B).unwrap().1;
        let hi = writes.iter().find(|w| w.0 == 0x1C).unwrap().1;
        assert_eq!((hi as u16) << 8 | lo as u16, 13001);
    }

    #[test]
    fn test_base_addresses() {
        let seq = build_mode_sequence(
            &xga_timing(),
            &ModeOverrides::default(),
            COLOR_DEPTH_16BPP,
            1024 * 768 * 2,
        )
        .unwrap();
        let writes = register_writes(&seq);

        for reg in [0x20u8, 0x21, 0x22] {
            assert_eq!(writes.iter().find(|w| w.0 == reg).unwrap().1, 0);
        }
        // 1024 * 768 * 2 = 0x180000
        assert_eq!(writes.iter().find(|w| w.0 == 0x26).unwrap().1, 0x18);
        assert_eq!(writes.iter().find(|w| w.0 == 0x27).unwrap().1, 0x00);
        assert_eq!(writes.iter().find(|w| w.0 == 0x28).unwrap().1, 0x00);
    }

    #[test]
    fn test_overrides_replace_dimensions() {
        let timing = xga_timing();
        let overrides = ModeOverrides {
            width: 800,
            height: 600,
            freq: 0,
        };
        let seq =
            build_mode_sequence(&timing, &overrides, COLOR_DEPTH_16BPP, 800 * 600 * 2).unwrap();
        let writes = register_writes(&seq);

        assert_eq!(value16(&writes, 0x0F), 800);
        assert_eq!(value16(&writes, 0x17), 600);
        // display end shifts with the overridden width
        assert_eq!(value16(&writes, 0x03), lfsr16(296 + 800));
    }

    #[test]
    fn test_zero_override_keeps_native_values() {
        let timing = xga_timing();
        let seq_native =
            build_mode_sequence(&timing, &ModeOverrides::default(), COLOR_DEPTH_16BPP, 0).unwrap();
        let seq_zero = build_mode_sequence(
            &timing,
            &ModeOverrides {
                width: 0,
                height: 0,
                freq: 60,
            },
            COLOR_DEPTH_16BPP,
            0,
        )
        .unwrap();
        // freq alone never alters the sequence (unimplemented extension point)
        assert_eq!(seq_native, seq_zero);
    }
}
