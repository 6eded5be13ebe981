//! Descriptor retrieval over the control channel
//!
//! Fetches the attached display's 128-byte descriptor block one byte at a
//! time through the [`EdidSource`] seam, repairs known-bad blocks, and
//! parses the preferred timing. Parsing itself lives in
//! `pixlink_protocol::edid`; this module only adds the I/O.

use pixlink_protocol::edid::{self, EdidError, EDID_LENGTH};
use pixlink_protocol::mode::TimingDescriptor;

use crate::traits::{EdidSource, TransportError};

/// Errors from fetching or interpreting the descriptor block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EdidFetchError {
    /// Control channel failed while reading a byte
    Transport(TransportError),
    /// The fetched block did not parse
    Parse(EdidError),
}

impl From<TransportError> for EdidFetchError {
    fn from(e: TransportError) -> Self {
        Self::Transport(e)
    }
}

impl From<EdidError> for EdidFetchError {
    fn from(e: EdidError) -> Self {
        Self::Parse(e)
    }
}

/// Fetch the full descriptor block
pub fn fetch_block<S: EdidSource>(source: &mut S) -> Result<[u8; EDID_LENGTH], EdidFetchError> {
    let mut block = [0u8; EDID_LENGTH];
    for (index, byte) in block.iter_mut().enumerate() {
        *byte = source.read_byte(index as u8)?;
    }
    Ok(block)
}

/// Fetch the descriptor block, repair it if it matches a known-bad device
/// signature, and parse the preferred timing
pub fn fetch_timing<S: EdidSource>(source: &mut S) -> Result<TimingDescriptor, EdidFetchError> {
    let mut block = fetch_block(source)?;
    edid::fixup_known_bad(&mut block);
    Ok(edid::parse_timing(&block)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Source backed by an in-memory block
    struct BlockSource {
        block: [u8; EDID_LENGTH],
        fail_at: Option<u8>,
    }

    impl EdidSource for BlockSource {
        fn read_byte(&mut self, index: u8) -> Result<u8, TransportError> {
            if self.fail_at == Some(index) {
                return Err(TransportError::Timeout);
            }
            Ok(self.block[index as usize])
        }
    }

    fn known_bad_block() -> [u8; EDID_LENGTH] {
        let mut block = [0u8; EDID_LENGTH];
        block[..8].copy_from_slice(&[0x00, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x00]);
        block[8..12].copy_from_slice(&[0xFF; 4]);
        block
    }

    #[test]
    fn test_fetch_block_reads_every_byte() {
        let mut source = BlockSource {
            block: known_bad_block(),
            fail_at: None,
        };
        let block = fetch_block(&mut source).unwrap();
        assert_eq!(block, known_bad_block());
    }

    #[test]
    fn test_fetch_timing_repairs_known_bad_block() {
        // The raw block has no valid checksum or timing; the fixup path
        // must make it parse as the 640x480 fallback.
        let mut source = BlockSource {
            block: known_bad_block(),
            fail_at: None,
        };
        let timing = fetch_timing(&mut source).unwrap();
        assert_eq!(timing.active_width, 640);
        assert_eq!(timing.active_height, 480);
    }

    #[test]
    fn test_transport_failure_propagates() {
        let mut source = BlockSource {
            block: known_bad_block(),
            fail_at: Some(100),
        };
        assert_eq!(
            fetch_timing(&mut source),
            Err(EdidFetchError::Transport(TransportError::Timeout))
        );
    }

    #[test]
    fn test_garbage_block_rejected() {
        // Healthy-looking identity but corrupt header: no fixup, no parse.
        let mut block = [0u8; EDID_LENGTH];
        block[8..12].copy_from_slice(&[0x10, 0xAC, 0x01, 0x00]);
        let mut source = BlockSource {
            block,
            fail_at: None,
        };
        assert_eq!(
            fetch_timing(&mut source),
            Err(EdidFetchError::Parse(EdidError::BadHeader))
        );
    }
}
