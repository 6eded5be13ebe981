//! Host-side shadow framebuffer
//!
//! The surface holds the authoritative RGB565 image of what the screen
//! should show. Paint operations mutate it first, then the damaged region
//! is diffed and encoded for the device; the device never holds state the
//! surface does not.

use alloc::vec::Vec;

use crate::device::DeviceError;

/// Bytes per RGB565 pixel
pub const BYTES_PER_PIXEL: usize = 2;

/// A width x height RGB565 pixel store, row-major, zero-initialized
pub struct Surface {
    width: usize,
    height: usize,
    pixels: Vec<u16>,
}

impl Surface {
    /// Allocate a zeroed surface. Allocation is fallible: mode sets can
    /// request multi-megabyte surfaces and the host may refuse.
    pub fn new(width: usize, height: usize) -> Result<Self, DeviceError> {
        let len = width
            .checked_mul(height)
            .ok_or(DeviceError::Allocation)?;
        let mut pixels = Vec::new();
        pixels
            .try_reserve_exact(len)
            .map_err(|_| DeviceError::Allocation)?;
        pixels.resize(len, 0);
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Length of one row in device-memory bytes
    pub fn stride_bytes(&self) -> usize {
        self.width * BYTES_PER_PIXEL
    }

    /// Total size of the surface in device-memory bytes
    pub fn len_bytes(&self) -> usize {
        self.pixels.len() * BYTES_PER_PIXEL
    }

    /// One full row of pixels
    pub fn row(&self, y: usize) -> &[u16] {
        &self.pixels[y * self.width..(y + 1) * self.width]
    }

    /// Fill a rectangle with a solid color. Caller has validated bounds.
    pub fn fill_rect(&mut self, x: usize, y: usize, width: usize, height: usize, color: u16) {
        debug_assert!(x + width <= self.width && y + height <= self.height);
        for row in y..y + height {
            let start = row * self.width + x;
            self.pixels[start..start + width].fill(color);
        }
    }

    /// Copy a rectangle within the surface. Source and destination may
    /// overlap; row order is chosen so unread source rows are never
    /// clobbered, and `copy_within` handles overlap inside a row.
    pub fn copy_area(
        &mut self,
        dst_x: usize,
        dst_y: usize,
        width: usize,
        height: usize,
        src_x: usize,
        src_y: usize,
    ) {
        debug_assert!(dst_x + width <= self.width && dst_y + height <= self.height);
        debug_assert!(src_x + width <= self.width && src_y + height <= self.height);

        let copy_row = |pixels: &mut Vec<u16>, w: usize, i: usize| {
            let src = (src_y + i) * w + src_x;
            let dst = (dst_y + i) * w + dst_x;
            pixels.copy_within(src..src + width, dst);
        };

        if dst_y <= src_y {
            for i in 0..height {
                copy_row(&mut self.pixels, self.width, i);
            }
        } else {
            for i in (0..height).rev() {
                copy_row(&mut self.pixels, self.width, i);
            }
        }
    }

    /// Copy a caller-supplied pixel rectangle in. `data` is row-major,
    /// `width` pixels per row, at least `width * height` long.
    pub fn blit(&mut self, x: usize, y: usize, width: usize, height: usize, data: &[u16]) {
        debug_assert!(x + width <= self.width && y + height <= self.height);
        for (i, src_row) in data.chunks_exact(width).take(height).enumerate() {
            let start = (y + i) * self.width + x;
            self.pixels[start..start + width].copy_from_slice(src_row);
        }
    }

    /// Write raw bytes at a linear byte offset, little endian within each
    /// pixel, matching the device's 16-bpp segment layout. Caller has
    /// clamped `bytes` to the surface.
    pub fn write_bytes(&mut self, byte_offset: usize, bytes: &[u8]) {
        debug_assert!(byte_offset + bytes.len() <= self.len_bytes());
        for (i, &b) in bytes.iter().enumerate() {
            let offset = byte_offset + i;
            let pixel = &mut self.pixels[offset / 2];
            if offset % 2 == 0 {
                *pixel = (*pixel & 0xFF00) | b as u16;
            } else {
                *pixel = (*pixel & 0x00FF) | ((b as u16) << 8);
            }
        }
    }
}
