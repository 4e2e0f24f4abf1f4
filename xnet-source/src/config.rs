// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Packet source configuration.

use crate::ConfigError;

/// Largest datagram an IPv4 total-length field can describe.
pub const MAX_DATAGRAM_LENGTH: usize = u16::MAX as usize;

/// Default cap on bytes held while waiting for a datagram to complete.
pub const DEFAULT_MAX_BUFFERED: usize = 256 * 1024;

/// Default number of backend reads per [`PacketSource::process`] call.
///
/// [`PacketSource::process`]: crate::PacketSource::process
pub const DEFAULT_MAX_READS_PER_PROCESS: usize = 64;

/// Default capture length for frame backends.
pub const DEFAULT_SNAPLEN: i32 = 65535;

/// Which raw socket a kernel-backed source reads from.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SocketKind {
    /// `AF_INET` raw socket receiving UDP datagrams with their IPv4
    /// header.
    #[default]
    Ip,
    /// `AF_PACKET` socket receiving every frame on every interface, link
    /// headers included.
    Packet,
}

/// Configuration for a [`PacketSource`](crate::PacketSource).
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct SourceConfig {
    /// Most bytes kept while no complete datagram can be framed. Oldest
    /// bytes are dropped beyond this.
    pub max_buffered: usize,
    /// Backend reads per `process` call before yielding.
    pub max_reads_per_process: usize,
    /// Socket family for [`PacketSource::open_socket`].
    ///
    /// [`PacketSource::open_socket`]: crate::PacketSource::open_socket
    pub socket_kind: SocketKind,
    /// Bytes captured per frame by capture-library backends.
    pub snaplen: i32,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            max_buffered: DEFAULT_MAX_BUFFERED,
            max_reads_per_process: DEFAULT_MAX_READS_PER_PROCESS,
            socket_kind: SocketKind::default(),
            snaplen: DEFAULT_SNAPLEN,
        }
    }
}

impl SourceConfig {
    pub fn with_max_buffered(mut self, max_buffered: usize) -> Self {
        self.max_buffered = max_buffered;
        self
    }

    pub fn with_max_reads_per_process(mut self, reads: usize) -> Self {
        self.max_reads_per_process = reads;
        self
    }

    pub fn with_socket_kind(mut self, socket_kind: SocketKind) -> Self {
        self.socket_kind = socket_kind;
        self
    }

    pub fn with_snaplen(mut self, snaplen: i32) -> Self {
        self.snaplen = snaplen;
        self
    }

    /// Checks that the buffer cap can hold the largest possible datagram,
    /// and that each `process` call may read at least once.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_buffered < MAX_DATAGRAM_LENGTH {
            return Err(ConfigError::BufferTooSmall {
                value: self.max_buffered,
                minimum: MAX_DATAGRAM_LENGTH,
            });
        }

        if self.max_reads_per_process == 0 {
            return Err(ConfigError::NoReadBudget);
        }

        if self.snaplen <= 0 {
            return Err(ConfigError::BadSnaplen(self.snaplen));
        }

        Ok(())
    }
}
