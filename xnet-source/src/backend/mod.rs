// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Where a packet source gets its bytes.
//!
//! Backends come in two shapes. A [`ChunkReader`] hands over arbitrary
//! slices of one continuous stream, so datagrams may straddle reads. A
//! [`FrameDispatcher`] hands over whole captured frames, each of which is
//! scanned on its own.

use crate::Fault;
use bytes::Bytes;
use std::fmt;

#[cfg(feature = "pcap")]
mod capture;
mod memory;
#[cfg(target_os = "linux")]
mod socket;

#[cfg(feature = "pcap")]
pub use capture::PcapCapture;
pub use memory::{channel, MemoryFeed, MemoryReader};
#[cfg(target_os = "linux")]
pub use socket::RawSocket;

/// Result of one non-blocking read.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ReadStatus {
    Chunk(Bytes),
    WouldBlock,
}

/// A non-blocking reader over a continuous byte stream.
pub trait ChunkReader: Send {
    /// Reads whatever is available right now, without waiting.
    fn try_read_chunk(&mut self) -> Result<ReadStatus, Fault>;
}

/// A non-blocking source of whole captured frames.
pub trait FrameDispatcher: Send {
    /// Passes up to `budget` available frames to `on_frame`, returning how
    /// many were delivered. Returns as soon as nothing more is pending.
    fn dispatch(
        &mut self,
        budget: usize,
        on_frame: &mut dyn FnMut(&[u8]),
    ) -> Result<usize, Fault>;
}

/// The backend owned by a packet source.
pub enum Backend {
    Stream(Box<dyn ChunkReader>),
    Frames(Box<dyn FrameDispatcher>),
    /// No reader: bytes arrive only through
    /// [`PacketSource::feed`](crate::PacketSource::feed).
    Detached,
}

impl Backend {
    pub fn stream<R: ChunkReader + 'static>(reader: R) -> Self {
        Self::Stream(Box::new(reader))
    }

    pub fn frames<D: FrameDispatcher + 'static>(dispatcher: D) -> Self {
        Self::Frames(Box::new(dispatcher))
    }
}

impl fmt::Debug for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Stream(_) => f.write_str("Stream"),
            Backend::Frames(_) => f.write_str("Frames"),
            Backend::Detached => f.write_str("Detached"),
        }
    }
}
