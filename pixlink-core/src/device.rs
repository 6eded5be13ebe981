//! Device session and mode programming
//!
//! [`Device`] ties the shadow surface, the differ and the output buffer to
//! a transport. Taking `&mut self` on every operation is the concurrency
//! story: the exclusive borrow is the protocol lock, so commands from
//! different operations can never interleave on the wire.

use pixlink_protocol::commands::EncodeError;
use pixlink_protocol::mode::{self, ModeOverrides, TimingDescriptor, COLOR_DEPTH_16BPP};

use crate::diff::FrameDiffer;
use crate::edid::{self, EdidFetchError};
use crate::surface::{Surface, BYTES_PER_PIXEL};
use crate::traits::{BulkTransport, EdidSource, TransportError};
use crate::writer::CommandBuffer;

/// Errors surfaced by device operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DeviceError {
    /// Requested region falls outside the current surface
    InvalidRegion,
    /// The transport failed to carry the command stream
    Transport(TransportError),
    /// Host memory for the surface or buffers could not be allocated
    Allocation,
    /// Command encoding overflowed its buffer
    Encode(EncodeError),
}

impl From<TransportError> for DeviceError {
    fn from(e: TransportError) -> Self {
        Self::Transport(e)
    }
}

impl From<EncodeError> for DeviceError {
    fn from(e: EncodeError) -> Self {
        Self::Encode(e)
    }
}

/// One attached display controller session
pub struct Device<T: BulkTransport> {
    pub(crate) transport: T,
    pub(crate) attached: bool,
    pub(crate) surface: Surface,
    pub(crate) differ: FrameDiffer,
    pub(crate) out: CommandBuffer,
    /// Device address of the 16-bpp scanout segment, programmed at mode set
    pub(crate) base16: u32,
}

impl<T: BulkTransport> Device<T> {
    /// Open a session over `transport`. No mode is programmed yet; the
    /// surface is empty until [`Self::set_video_mode`] runs.
    pub fn new(transport: T) -> Result<Self, DeviceError> {
        Ok(Self {
            transport,
            attached: true,
            surface: Surface::new(0, 0)?,
            differ: FrameDiffer::new(0, 0)?,
            out: CommandBuffer::new()?,
            base16: 0,
        })
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    /// Mark the device gone. Every subsequent operation degrades to a
    /// successful no-op: callers tearing down asynchronously should not
    /// have to special-case a display that was unplugged under them.
    pub fn detach(&mut self) {
        self.attached = false;
        self.out.clear();
    }

    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Program a video mode and resize the host state to match.
    ///
    /// Pending commands for the old geometry are flushed first, then the
    /// register sequence goes out in one piece. The new surface starts
    /// black and the differ is stale, so the next full repaint transmits
    /// everything.
    pub fn set_video_mode(
        &mut self,
        timing: &TimingDescriptor,
        overrides: &ModeOverrides,
    ) -> Result<(), DeviceError> {
        if !self.attached {
            return Ok(());
        }

        let applied = overrides.apply(timing);
        let width = applied.active_width as usize;
        let height = applied.active_height as usize;
        let screen_bytes = (width * height * BYTES_PER_PIXEL) as u32;

        let sequence = mode::build_mode_sequence(timing, overrides, COLOR_DEPTH_16BPP, screen_bytes)?;

        // The surface and differ are replaced as a pair: nothing is
        // committed until both allocations have succeeded, so a failed
        // mode set leaves the old geometry fully consistent.
        let surface = Surface::new(width, height)?;
        self.differ.resize(width, height)?;
        self.surface = surface;
        // The sequence places the 16-bpp segment at the bottom of device
        // memory, with the 8-bpp segment behind it.
        self.base16 = 0;

        flush_pending(&mut self.out, &mut self.transport)?;
        self.out.append(&sequence)?;
        flush_pending(&mut self.out, &mut self.transport)
    }

    /// Fetch and parse the attached display's preferred timing through a
    /// control-channel descriptor source
    pub fn fetch_edid<S: EdidSource>(
        &mut self,
        source: &mut S,
    ) -> Result<TimingDescriptor, EdidFetchError> {
        if !self.attached {
            return Err(EdidFetchError::Transport(TransportError::Disconnected));
        }
        edid::fetch_timing(source)
    }
}

/// Submit everything pending and reset the buffer.
///
/// Synchronous: a single transfer is outstanding at a time, resubmitting
/// until the transport has accepted every byte. On transport failure the
/// pending bytes are dropped; the device may have executed a prefix, which
/// the stale-on-error caller path repairs with a full repaint.
pub(crate) fn flush_pending<T: BulkTransport>(
    out: &mut CommandBuffer,
    transport: &mut T,
) -> Result<(), DeviceError> {
    if out.is_empty() {
        return Ok(());
    }

    let pending = out.pending();
    let mut sent = 0;
    let mut failure = None;
    while sent < pending.len() {
        match transport.submit(&pending[sent..]) {
            Ok(n) => {
                debug_assert!(n > 0, "transport must make progress");
                sent += n;
            }
            Err(e) => {
                failure = Some(e);
                break;
            }
        }
    }

    out.clear();
    match failure {
        Some(e) => Err(DeviceError::Transport(e)),
        None => Ok(()),
    }
}
