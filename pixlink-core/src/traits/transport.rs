//! Blocking transport traits implemented by the host USB stack

/// Errors a transport implementation can report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransportError {
    /// The transfer did not complete within the transport's deadline
    /// (about one second for bulk submissions)
    Timeout,
    /// The device is gone and will not come back
    Disconnected,
}

/// Synchronous bulk-out channel carrying the command stream.
///
/// A single transfer is outstanding at a time: `submit` blocks until the
/// device has accepted some prefix of `bytes` or the deadline passes. A
/// successful return reports how many bytes were accepted and must be at
/// least one; the caller resubmits the remainder.
pub trait BulkTransport {
    fn submit(&mut self, bytes: &[u8]) -> Result<usize, TransportError>;
}

/// Byte-addressed reader for the attached display's descriptor block.
///
/// Backed by a control-channel request per byte on real hardware, which is
/// why the engine fetches the block once and parses from a copy.
pub trait EdidSource {
    fn read_byte(&mut self, index: u8) -> Result<u8, TransportError>;
}
