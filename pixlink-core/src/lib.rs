//! Device Engine for USB Display Controllers
//!
//! This crate owns the stateful side of driving a DisplayLink-class display:
//! a host-side shadow framebuffer, line-by-line differencing against what
//! the device last received, output command buffering with a high-water
//! flush discipline, and the paint operations that tie them together. The
//! pure wire codec lives in `pixlink-protocol`; everything that touches I/O
//! goes through the [`traits::BulkTransport`] and [`traits::EdidSource`]
//! seams so the engine stays independent of any particular USB stack.
//!
//! Requires `alloc` for the shadow and backing buffers; no `std`.

#![no_std]
#![deny(unsafe_code)]

extern crate alloc;

#[cfg(test)]
extern crate std;

pub mod device;
pub mod diff;
pub mod edid;
pub mod surface;
pub mod traits;
pub mod writer;

mod paint;

pub use device::{Device, DeviceError};
pub use edid::EdidFetchError;
pub use surface::Surface;
pub use traits::{BulkTransport, EdidSource, TransportError};
