// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Types and traits shared by the `xnet` protocol codecs.
//!
//! Everything here is `no_std`: byte-order helpers, the IPv4 address type
//! used inside zero-copy header layouts, the Internet checksum accumulator,
//! and the [`Emit`] trait used to serialise owned headers.

#![no_std]
#![deny(missing_docs)]

#[cfg(feature = "alloc")]
extern crate alloc;

#[cfg(test)]
#[macro_use]
extern crate std;

pub mod checksum;
mod emit;
mod error;
pub mod ip;
pub mod primitives;
pub mod util;

pub use checksum::Checksum;
pub use emit::*;
pub use error::*;
pub use ip::Ipv4Addr;
pub use zerocopy::{ByteSlice, ByteSliceMut, SplitByteSlice, SplitByteSliceMut};

#[cfg(feature = "alloc")]
pub use alloc::vec::Vec;

/// Length information for a header or a whole packet.
pub trait HeaderLen {
    /// The length of this header when it carries no variable-length
    /// fields.
    const MINIMUM_LENGTH: usize;

    /// The number of bytes this header occupies on the wire.
    fn packet_length(&self) -> usize;
}

/// Conversion between a field's wire representation and the richer type
/// exposed by a parsed header.
pub trait NetworkRepr<U> {
    /// Convert this value into its on-the-wire form.
    fn to_network(self) -> U;

    /// Build a value from its on-the-wire form.
    fn from_network(val: U) -> Self;
}
