//! Hybrid raw/run-length span encoding (opcode `0x6B`)
//!
//! One command carries one contiguous horizontal span of RGB565 pixels:
//!
//! ```text
//! ┌──────┬──────┬─────────────────┬───────┬────────────────────────┐
//! │ 0xAF │ 0x6B │ address (3B BE) │ total │ alternating sub-spans  │
//! └──────┴──────┴─────────────────┴───────┴────────────────────────┘
//! raw sub-span: [count][pix_hi, pix_lo] * count
//! RLE sub-span: [count][pix_hi, pix_lo]       (count repetitions)
//! ```
//!
//! Sub-spans strictly alternate starting with raw, which is how the hardware
//! tells them apart. The hardware reads a count byte of 0 as 256; the encoder
//! caps every count at 255 and splits instead, so the ambiguous value is
//! never emitted. The `total` byte is backpatched in place once the command
//! closes: at 255 pixels, at the end of the span, or when the output buffer
//! runs out of room, whichever comes first.
//!
//! Two equal consecutive pixels trigger the switch to an RLE sub-span even
//! though a two-pixel run saves nothing over raw encoding; this break-even
//! trade is part of the documented format and deliberately kept. An RLE
//! sub-span can only close an open raw sub-span: mid-line it absorbs the
//! whole run, but when a run begins while no raw sub-span is open (at the
//! start of a command, or directly after another run) its first pixel is
//! emitted as a one-pixel raw sub-span and the remainder becomes the RLE
//! sub-span.

use crate::commands::{MAX_DEVICE_ADDRESS, OP_RAW_SPAN, OP_RLX_SPAN, SYNC_BYTE};

/// Maximum pixels a single command may carry
pub const MAX_CMD_PIXELS: usize = 255;

/// Minimum useful command size: sync, opcode, 3 address bytes, total count,
/// sub-span count, one 2-byte pixel
pub const MIN_RLX_CMD_BYTES: usize = 9;

/// Progress report of one encoder call.
///
/// `pixels_consumed` may be less than the input length when the output
/// buffer filled up; the caller flushes, advances the device address by
/// `pixels_consumed * 2` bytes and calls again with the remainder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SpanProgress {
    /// Pixels consumed from the input span
    pub pixels_consumed: usize,
    /// Bytes written to the output buffer
    pub bytes_written: usize,
}

/// Length of the run of identical pixels starting at `start`, capped at
/// `limit`
fn run_length(pixels: &[u16], start: usize, limit: usize) -> usize {
    let value = pixels[start];
    let mut end = start + 1;
    while end < limit && pixels[end] == value {
        end += 1;
    }
    end - start
}

/// Encode one horizontal pixel span into as many `0x6B` commands as fit in
/// `out`.
///
/// `device_address` is the 24-bit linear offset of the first pixel in the
/// controller's scanout memory; exceeding 24 bits is a contract violation.
pub fn encode_hline(pixels: &[u16], device_address: u32, out: &mut [u8]) -> SpanProgress {
    let mut pixel = 0usize;
    let mut cursor = 0usize;
    let mut dev_addr = device_address;

    while pixel < pixels.len() && out.len() - cursor > MIN_RLX_CMD_BYTES {
        debug_assert!(dev_addr <= MAX_DEVICE_ADDRESS, "device address overflow");

        out[cursor] = SYNC_BYTE;
        out[cursor + 1] = OP_RLX_SPAN;
        out[cursor + 2] = (dev_addr >> 16) as u8;
        out[cursor + 3] = (dev_addr >> 8) as u8;
        out[cursor + 4] = dev_addr as u8;
        let total_count_idx = cursor + 5;
        cursor += 6;

        let cmd_start = pixel;
        let cmd_limit = cmd_start + (pixels.len() - pixel).min(MAX_CMD_PIXELS);

        // Index of the open raw sub-span's count byte, backpatched when the
        // span closes. RLE counts are known up front and written directly.
        let mut raw_count_idx: Option<usize> = None;
        let mut raw_len = 0usize;

        while pixel < cmd_limit {
            let run = run_length(pixels, pixel, cmd_limit);
            let pix = pixels[pixel].to_be_bytes();

            if run >= 2 && raw_count_idx.is_some() {
                // Close the raw sub-span and emit the whole run.
                if out.len() - cursor < 3 {
                    break;
                }
                if let Some(idx) = raw_count_idx.take() {
                    out[idx] = raw_len as u8;
                }
                raw_len = 0;
                out[cursor] = run as u8;
                out[cursor + 1] = pix[0];
                out[cursor + 2] = pix[1];
                cursor += 3;
                pixel += run;
            } else {
                // Raw pixel. A run's first pixel also lands here when no raw
                // sub-span is open yet (command start, or directly after a
                // run): sub-spans must alternate starting raw, and the
                // remainder of the run becomes the RLE sub-span on the next
                // pass.
                let need = if raw_count_idx.is_none() { 3 } else { 2 };
                if out.len() - cursor < need {
                    break;
                }
                if raw_count_idx.is_none() {
                    raw_count_idx = Some(cursor);
                    cursor += 1;
                }
                out[cursor] = pix[0];
                out[cursor + 1] = pix[1];
                cursor += 2;
                raw_len += 1;
                pixel += 1;
            }
        }

        if let Some(idx) = raw_count_idx {
            out[idx] = raw_len as u8;
        }

        // The outer headroom check guarantees at least one sub-span fit.
        debug_assert!(pixel > cmd_start);
        out[total_count_idx] = (pixel - cmd_start) as u8;
        dev_addr += ((pixel - cmd_start) * 2) as u32;
    }

    SpanProgress {
        pixels_consumed: pixel,
        bytes_written: cursor,
    }
}

/// Encode up to 255 pixels as a legacy `0x68` raw stripe: 6-byte header
/// followed by uncompressed big-endian pixels. Fallback path for hardware
/// revisions without the RLX decoder.
pub fn encode_raw_stripe(pixels: &[u16], device_address: u32, out: &mut [u8]) -> SpanProgress {
    debug_assert!(device_address <= MAX_DEVICE_ADDRESS, "device address overflow");

    if out.len() < 6 + 2 {
        return SpanProgress {
            pixels_consumed: 0,
            bytes_written: 0,
        };
    }

    let count = pixels.len().min(MAX_CMD_PIXELS).min((out.len() - 6) / 2);

    out[0] = SYNC_BYTE;
    out[1] = OP_RAW_SPAN;
    out[2] = (device_address >> 16) as u8;
    out[3] = (device_address >> 8) as u8;
    out[4] = device_address as u8;
    out[5] = count as u8;

    let mut cursor = 6;
    for &p in &pixels[..count] {
        let be = p.to_be_bytes();
        out[cursor] = be[0];
        out[cursor + 1] = be[1];
        cursor += 2;
    }

    SpanProgress {
        pixels_consumed: count,
        bytes_written: cursor,
    }
}

/// Fill a buffer tail too small for a minimal command with sync-byte
/// no-ops so it is never transmitted uninitialized. Returns the number of
/// bytes padded.
pub fn pad_tail(out: &mut [u8]) -> usize {
    debug_assert!(out.len() <= MIN_RLX_CMD_BYTES);
    for byte in out.iter_mut() {
        *byte = SYNC_BYTE;
    }
    out.len()
}
