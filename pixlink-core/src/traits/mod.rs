//! I/O seams between the engine and the host USB stack

pub mod transport;

pub use transport::{BulkTransport, EdidSource, TransportError};
