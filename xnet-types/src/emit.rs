// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::{HeaderLen, ParseError, ParseResult};
use zerocopy::{ByteSliceMut, SplitByteSliceMut};

#[cfg(feature = "alloc")]
use alloc::vec::Vec;

/// Serialise a network header into a byte buffer.
pub trait Emit: HeaderLen {
    /// Writes this header's contents into a target buffer without
    /// performing length or value checks.
    ///
    /// `buf` must have a length of at least [`HeaderLen::packet_length`].
    fn emit_raw<V: ByteSliceMut>(&self, buf: V) -> usize;

    /// Checks that every field can be represented on the wire.
    ///
    /// Owned headers hold wider integers than some of their wire fields, so
    /// an out-of-range value is refused here rather than silently masked.
    #[inline]
    fn check_emit(&self) -> ParseResult<()> {
        Ok(())
    }

    /// Writes this header's contents into a target buffer.
    #[inline]
    fn emit<V: ByteSliceMut>(&self, buf: V) -> ParseResult<usize> {
        self.check_emit()?;

        if buf.len() != self.packet_length() {
            return Err(ParseError::TooSmall);
        }

        Ok(self.emit_raw(buf))
    }

    /// Writes this header's contents into the start of a target buffer,
    /// returning the unused remainder.
    #[inline]
    fn emit_prefix<V: SplitByteSliceMut>(&self, buf: V) -> ParseResult<V> {
        self.check_emit()?;

        let (into, out) = buf
            .split_at(self.packet_length())
            .map_err(|_| ParseError::TooSmall)?;

        self.emit_raw(into);
        Ok(out)
    }

    /// Writes this header's contents into a newly allocated `Vec` of length
    /// [`HeaderLen::packet_length`].
    #[cfg(feature = "alloc")]
    #[inline]
    fn to_vec(&self) -> ParseResult<Vec<u8>> {
        let mut out = alloc::vec![0u8; self.packet_length()];
        self.emit(&mut out[..])?;

        Ok(out)
    }
}

impl<E: Emit> Emit for &E {
    #[inline]
    fn emit_raw<V: ByteSliceMut>(&self, buf: V) -> usize {
        E::emit_raw(self, buf)
    }

    #[inline]
    fn check_emit(&self) -> ParseResult<()> {
        E::check_emit(self)
    }
}

impl<H: HeaderLen> HeaderLen for &H {
    const MINIMUM_LENGTH: usize = H::MINIMUM_LENGTH;

    #[inline]
    fn packet_length(&self) -> usize {
        H::packet_length(self)
    }
}
