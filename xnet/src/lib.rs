// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Zero-copy wire codecs for IPv4, UDP and DHCP.
//!
//! Each protocol module offers borrowed views which validate and read
//! headers in place, plain owned `Header` structs, and serialisers that
//! write those headers back out bit-exactly. Nothing here allocates unless
//! the `alloc` feature is enabled, in which case whole datagrams can be
//! copied out into owned [`bytes::Bytes`].

#![no_std]

#[cfg(feature = "alloc")]
extern crate alloc;

#[cfg(test)]
#[macro_use]
extern crate std;

pub mod dhcp;
pub mod ip;
pub mod udp;

/// Traits and primitive types shared by every codec.
pub mod types {
    pub use xnet_types::*;
}

#[cfg(test)]
mod tests;
