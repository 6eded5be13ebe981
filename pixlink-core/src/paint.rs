//! Paint operations and damage repaint
//!
//! Every operation follows the same shape: mutate the shadow surface, then
//! repaint the damaged rectangle. The repaint walks the damage line by
//! line, narrows each line through the differ, encodes the dirty span as
//! `0x6B` commands and flushes the output buffer as it fills. The backing
//! copy is updated as lines are encoded; if the transport then fails, the
//! differ is invalidated so the next full repaint resynchronizes the
//! device.

use pixlink_protocol::rlx;

use crate::device::{flush_pending, Device, DeviceError};
use crate::surface::BYTES_PER_PIXEL;
use crate::traits::BulkTransport;

impl<T: BulkTransport> Device<T> {
    /// Fill a rectangle with a solid RGB565 color
    pub fn fill_rect(
        &mut self,
        x: usize,
        y: usize,
        width: usize,
        height: usize,
        color: u16,
    ) -> Result<(), DeviceError> {
        if !self.attached {
            return Ok(());
        }
        if width == 0 || height == 0 {
            return Ok(());
        }
        self.check_rect(x, y, width, height)?;
        self.surface.fill_rect(x, y, width, height, color);
        self.repaint_rect(x, y, width, height)
    }

    /// Copy a rectangle within the surface, overlap-safe
    pub fn copy_area(
        &mut self,
        dst_x: usize,
        dst_y: usize,
        width: usize,
        height: usize,
        src_x: usize,
        src_y: usize,
    ) -> Result<(), DeviceError> {
        if !self.attached {
            return Ok(());
        }
        if width == 0 || height == 0 {
            return Ok(());
        }
        self.check_rect(dst_x, dst_y, width, height)?;
        self.check_rect(src_x, src_y, width, height)?;
        self.surface.copy_area(dst_x, dst_y, width, height, src_x, src_y);
        self.repaint_rect(dst_x, dst_y, width, height)
    }

    /// Copy a caller-supplied pixel rectangle onto the surface. `pixels`
    /// is row-major, `width` pixels per row.
    pub fn blit_image(
        &mut self,
        x: usize,
        y: usize,
        width: usize,
        height: usize,
        pixels: &[u16],
    ) -> Result<(), DeviceError> {
        if !self.attached {
            return Ok(());
        }
        if width == 0 || height == 0 {
            return Ok(());
        }
        self.check_rect(x, y, width, height)?;
        if pixels.len() < width * height {
            return Err(DeviceError::InvalidRegion);
        }
        self.surface.blit(x, y, width, height, pixels);
        self.repaint_rect(x, y, width, height)
    }

    /// Write raw bytes at a linear byte offset into the 16-bpp segment,
    /// clamped to the surface. Returns how many bytes were written. The
    /// lines the write touches are repainted whole; the differ trims what
    /// did not change.
    pub fn write_raw(&mut self, byte_offset: usize, bytes: &[u8]) -> Result<usize, DeviceError> {
        if !self.attached {
            return Ok(bytes.len());
        }
        if bytes.is_empty() {
            return Ok(0);
        }
        let total = self.surface.len_bytes();
        if byte_offset >= total {
            return Err(DeviceError::InvalidRegion);
        }
        let count = bytes.len().min(total - byte_offset);
        self.surface.write_bytes(byte_offset, &bytes[..count]);

        let stride = self.surface.stride_bytes();
        let first_row = byte_offset / stride;
        let last_row = (byte_offset + count - 1) / stride;
        let width = self.surface.width();
        self.repaint_rect(0, first_row, width, last_row - first_row + 1)?;
        Ok(count)
    }

    /// Retransmit the whole surface: dirty lines normally, every line when
    /// the differ is stale (after a mode set, an invalidation or a
    /// transport error)
    pub fn refresh(&mut self) -> Result<(), DeviceError> {
        if !self.attached {
            return Ok(());
        }
        let width = self.surface.width();
        let height = self.surface.height();
        if width == 0 || height == 0 {
            return Ok(());
        }
        self.repaint_rect(0, 0, width, height)
    }

    fn check_rect(&self, x: usize, y: usize, width: usize, height: usize) -> Result<(), DeviceError> {
        let fits_x = x.checked_add(width).is_some_and(|r| r <= self.surface.width());
        let fits_y = y.checked_add(height).is_some_and(|r| r <= self.surface.height());
        if fits_x && fits_y {
            Ok(())
        } else {
            Err(DeviceError::InvalidRegion)
        }
    }

    /// Encode and transmit the damaged rectangle. Bounds already checked.
    fn repaint_rect(&mut self, x: usize, y: usize, width: usize, height: usize) -> Result<(), DeviceError> {
        let full_surface =
            x == 0 && y == 0 && width == self.surface.width() && height == self.surface.height();
        let stride = self.surface.stride_bytes();
        let base = self.base16;

        let Device {
            surface,
            differ,
            out,
            transport,
            ..
        } = self;

        let result = (|| {
            for row in y..y + height {
                let fb_row = surface.row(row);
                let Some((first, last)) = differ.diff_line(row, x..x + width, fb_row) else {
                    continue;
                };

                let mut span = &fb_row[first..=last];
                let mut address = base + (row * stride + first * BYTES_PER_PIXEL) as u32;
                while !span.is_empty() {
                    if out.needs_flush() {
                        flush_pending(out, transport)?;
                    }
                    let progress = rlx::encode_hline(span, address, out.window_mut());
                    out.advance(progress.bytes_written);
                    span = &span[progress.pixels_consumed..];
                    address += (progress.pixels_consumed * BYTES_PER_PIXEL) as u32;
                    if !span.is_empty() {
                        // tail too small for another command
                        out.pad_tail();
                    }
                }
                differ.commit_line(row, x..x + width, fb_row);
            }
            flush_pending(out, transport)
        })();

        match result {
            Ok(()) => {
                if full_surface {
                    differ.mark_synced();
                }
                Ok(())
            }
            Err(e) => {
                // The device may have executed a prefix of the stream.
                differ.invalidate();
                Err(e)
            }
        }
    }
}
