// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::{
    backend::{Backend, ChunkReader, FrameDispatcher, ReadStatus},
    framing::{self, Scan},
    ConfigError, Fault, SourceConfig, SourceError,
};
use bytes::{Buf, Bytes, BytesMut};
use std::{collections::VecDeque, mem};
use tracing::{debug, error, trace, warn};
use xnet::ip::PacketView;

#[cfg(target_os = "linux")]
use crate::{backend::RawSocket, OpenError};

/// Running totals for one packet source.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct SourceStats {
    /// Successful backend reads (chunks or frames).
    pub reads: u64,
    /// Bytes delivered by the backend.
    pub bytes_read: u64,
    /// Datagrams framed and queued.
    pub packets: u64,
    /// Bytes thrown away: noise before a datagram start, frame leftovers,
    /// and bytes dropped to respect the buffer cap.
    pub bytes_discarded: u64,
}

/// Turns raw bytes from a backend into a queue of complete, checksum-valid
/// IPv4 datagrams.
///
/// The source never blocks. Each [`process`](Self::process) call drains
/// whatever the backend has ready, then frames as many datagrams as the
/// buffered bytes allow. Bytes which do not (yet) form a datagram stay
/// buffered, up to [`SourceConfig::max_buffered`].
///
/// A backend failure poisons the source: the fault is returned by that call
/// and by every later call.
#[derive(Debug)]
pub struct PacketSource {
    backend: Backend,
    raw: BytesMut,
    queue: VecDeque<Bytes>,
    fault: Option<Fault>,
    config: SourceConfig,
    stats: SourceStats,
}

impl PacketSource {
    pub fn new(backend: Backend, config: SourceConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        Ok(Self {
            backend,
            raw: BytesMut::new(),
            queue: VecDeque::new(),
            fault: None,
            config,
            stats: SourceStats::default(),
        })
    }

    pub fn from_reader<R: ChunkReader + 'static>(
        reader: R,
        config: SourceConfig,
    ) -> Result<Self, ConfigError> {
        Self::new(Backend::stream(reader), config)
    }

    pub fn from_dispatcher<D: FrameDispatcher + 'static>(
        dispatcher: D,
        config: SourceConfig,
    ) -> Result<Self, ConfigError> {
        Self::new(Backend::frames(dispatcher), config)
    }

    /// A source with no backend, fed through [`feed`](Self::feed).
    pub fn detached(config: SourceConfig) -> Result<Self, ConfigError> {
        Self::new(Backend::Detached, config)
    }

    /// Opens a raw socket of [`SourceConfig::socket_kind`].
    #[cfg(target_os = "linux")]
    pub fn open_socket(config: SourceConfig) -> Result<Self, OpenError> {
        config.validate()?;
        let socket = RawSocket::open(config.socket_kind)?;

        Ok(Self::from_reader(socket, config)?)
    }

    /// Opens a libpcap capture on `device`.
    #[cfg(feature = "pcap")]
    pub fn open_capture(
        device: &str,
        config: SourceConfig,
    ) -> Result<Self, crate::OpenError> {
        config.validate()?;
        let capture =
            crate::backend::PcapCapture::open(device, config.snaplen)?;

        Ok(Self::from_dispatcher(capture, config)?)
    }

    fn check(&self) -> Result<(), Fault> {
        match &self.fault {
            Some(fault) => Err(fault.clone()),
            None => Ok(()),
        }
    }

    fn latch(&mut self, fault: Fault) -> Fault {
        error!(%fault, "packet source faulted");
        self.fault = Some(fault.clone());

        fault
    }

    /// Appends bytes to the stream buffer as if a reader had produced
    /// them. They are framed on the next [`process`](Self::process).
    pub fn feed(&mut self, bytes: &[u8]) -> Result<(), Fault> {
        self.check()?;
        self.stats.bytes_read += bytes.len() as u64;
        self.raw.extend_from_slice(bytes);

        Ok(())
    }

    /// Reads everything the backend has ready and frames what it can.
    pub fn process(&mut self) -> Result<(), Fault> {
        self.check()?;

        if let Err(fault) = self.pull() {
            return Err(self.latch(fault));
        }

        let scan = framing::extract(&mut self.raw, &mut self.queue);
        self.record(scan);
        self.enforce_cap();

        Ok(())
    }

    fn pull(&mut self) -> Result<(), Fault> {
        match &mut self.backend {
            Backend::Stream(reader) => {
                for _ in 0..self.config.max_reads_per_process {
                    match reader.try_read_chunk()? {
                        ReadStatus::Chunk(chunk) => {
                            debug!(bytes = chunk.len(), "read chunk");
                            self.stats.reads += 1;
                            self.stats.bytes_read += chunk.len() as u64;
                            self.raw.extend_from_slice(&chunk);
                        }
                        ReadStatus::WouldBlock => break,
                    }
                }
            }
            Backend::Frames(dispatcher) => {
                let stats = &mut self.stats;
                let queue = &mut self.queue;
                let mut on_frame = |frame: &[u8]| {
                    stats.reads += 1;
                    stats.bytes_read += frame.len() as u64;

                    let mut buf = BytesMut::from(frame);
                    let before = queue.len();
                    let scan = framing::extract(&mut buf, queue);
                    let leftover = buf.len();
                    debug!(
                        bytes = frame.len(),
                        packets = queue.len() - before,
                        leftover,
                        "scanned frame"
                    );

                    stats.packets += scan.framed as u64;
                    stats.bytes_discarded += (scan.discarded + leftover) as u64;
                };
                dispatcher.dispatch(
                    self.config.max_reads_per_process,
                    &mut on_frame,
                )?;
            }
            Backend::Detached => {}
        }

        Ok(())
    }

    fn record(&mut self, scan: Scan) {
        if scan.discarded > 0 {
            debug!(bytes = scan.discarded, "resynchronised stream");
        }

        for packet in self.queue.iter().rev().take(scan.framed) {
            trace!(bytes = packet.len(), "framed datagram");
        }

        self.stats.packets += scan.framed as u64;
        self.stats.bytes_discarded += scan.discarded as u64;
    }

    fn enforce_cap(&mut self) {
        let excess = self.raw.len().saturating_sub(self.config.max_buffered);
        if excess == 0 {
            return;
        }

        warn!(
            bytes = excess,
            cap = self.config.max_buffered,
            "buffer cap exceeded, dropping oldest bytes"
        );
        self.raw.advance(excess);
        self.stats.bytes_discarded += excess as u64;
    }

    /// The datagram at the head of the queue, if any.
    pub fn active_packet(&self) -> Result<Option<PacketView<'_>>, Fault> {
        self.check()?;

        Ok(self.queue.front().map(|packet| PacketView::new(packet)))
    }

    /// Removes and returns the datagram at the head of the queue.
    ///
    /// An empty queue is reported as [`SourceError::Empty`] and leaves the
    /// source usable.
    pub fn pop(&mut self) -> Result<Bytes, SourceError> {
        self.check()?;

        self.queue.pop_front().ok_or(SourceError::Empty)
    }

    /// Number of queued datagrams.
    #[inline]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Bytes held that are not yet part of a framed datagram.
    #[inline]
    pub fn buffered(&self) -> usize {
        self.raw.len()
    }

    #[inline]
    pub fn stats(&self) -> SourceStats {
        self.stats
    }

    #[inline]
    pub fn fault(&self) -> Option<&Fault> {
        self.fault.as_ref()
    }

    #[inline]
    pub fn config(&self) -> &SourceConfig {
        &self.config
    }

    /// Moves the backend and all buffered state into a new source.
    ///
    /// `self` is left without a backend and faulted with [`Fault::Moved`].
    pub fn take(&mut self) -> Result<PacketSource, Fault> {
        self.check()?;

        let taken = PacketSource {
            backend: mem::replace(&mut self.backend, Backend::Detached),
            raw: mem::take(&mut self.raw),
            queue: mem::take(&mut self.queue),
            fault: None,
            config: self.config.clone(),
            stats: mem::take(&mut self.stats),
        };
        self.fault = Some(Fault::Moved);
        debug!("packet source state moved");

        Ok(taken)
    }
}
