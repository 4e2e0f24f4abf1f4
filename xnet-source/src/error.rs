// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for packet sources.

use thiserror::Error;

/// A condition which leaves a packet source unusable.
///
/// Faults are latched: once a source reports one, every later call on it
/// reports the same fault again.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum Fault {
    #[error("readiness reported for descriptor {found}, expected {expected}")]
    UnexpectedDescriptor { expected: i32, found: u64 },

    #[error("read returned {read} bytes after {promised} were announced")]
    ReadOverrun { promised: usize, read: usize },

    #[error("{op} failed: {}", os_error(.errno))]
    Os { op: &'static str, errno: i32 },

    #[error("capture failed: {0}")]
    Capture(String),

    #[error("source state was moved to another instance")]
    Moved,
}

fn os_error(errno: &i32) -> std::io::Error {
    std::io::Error::from_raw_os_error(*errno)
}

/// Error returned by [`PacketSource::pop`](crate::PacketSource::pop).
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum SourceError {
    /// Nothing is queued. The source remains usable.
    #[error("no packet is queued")]
    Empty,

    #[error(transparent)]
    Fault(#[from] Fault),
}

/// A [`SourceConfig`](crate::SourceConfig) value outside its legal range.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ConfigError {
    #[error("max_buffered of {value} bytes cannot hold a {minimum}-byte datagram")]
    BufferTooSmall { value: usize, minimum: usize },

    #[error("max_reads_per_process must be at least 1")]
    NoReadBudget,

    #[error("snaplen must be positive, got {0}")]
    BadSnaplen(i32),
}

/// Failure to set up a backend.
#[derive(Debug, Error)]
pub enum OpenError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("{op} failed: {source}")]
    Io {
        op: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[cfg(feature = "pcap")]
    #[error("capture setup failed: {0}")]
    Capture(#[from] pcap::Error),
}
