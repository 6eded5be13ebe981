//! Wire Protocol Codec for USB Display Controllers
//!
//! This crate encodes the command stream understood by DisplayLink-class
//! external display controllers attached over a byte-stream transport.
//! Everything here is a pure function of its inputs: no I/O, no allocation
//! beyond caller-supplied buffers.
//!
//! # Command grammar
//!
//! Every command begins with the sync byte `0xAF` followed by an opcode:
//!
//! ```text
//! ┌──────┬────────┬──────────────────────────────────────────┐
//! │ 0xAF │ opcode │ payload                                  │
//! ├──────┼────────┼──────────────────────────────────────────┤
//! │      │ 0x20   │ register write: [address][value]         │
//! │      │ 0x68   │ raw pixel span (legacy, uncompressed)    │
//! │      │ 0x69   │ solid fill span                          │
//! │      │ 0x6A   │ copy span (device-to-device)             │
//! │      │ 0x6B   │ hybrid raw/RLE span (primary encoding)   │
//! │      │ 0xA0   │ commit/flush sentinel (no payload)       │
//! └──────┴────────┴──────────────────────────────────────────┘
//! ```
//!
//! The command set is closed: nothing else is ever emitted.

#![no_std]
#![deny(unsafe_code)]

#[cfg(test)]
extern crate std;

pub mod commands;
pub mod edid;
pub mod lfsr;
pub mod mode;
pub mod rlx;

pub use commands::{CommandStream, EncodeError, SYNC_BYTE};
pub use edid::{EdidError, EDID_LENGTH};
pub use lfsr::lfsr16;
pub use mode::{ModeOverrides, TimingDescriptor};
pub use rlx::SpanProgress;
