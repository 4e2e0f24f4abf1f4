// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Primitive types -- integers of known width and endianness, and the
//! conversions between them and their byte representations.

// The type aliases here are *fairly* self-describing.
#![allow(non_camel_case_types)]
#![allow(missing_docs)]

pub type u3 = u8;
pub type u4 = u8;
pub type u13 = u16;

mod sealed {
    pub trait Sealed {}
}

/// An unsigned integer with a fixed-width byte representation.
pub trait NetworkInt: Copy + sealed::Sealed {
    /// `[u8; size_of::<Self>()]`.
    type Bytes: Copy + Default + AsRef<[u8]> + AsMut<[u8]>;

    fn to_be_array(self) -> Self::Bytes;
    fn to_le_array(self) -> Self::Bytes;
    fn from_be_array(bytes: Self::Bytes) -> Self;
    fn from_le_array(bytes: Self::Bytes) -> Self;
}

macro_rules! network_int {
    ($($t:ty),* $(,)?) => {
        $(
            impl sealed::Sealed for $t {}

            impl NetworkInt for $t {
                type Bytes = [u8; core::mem::size_of::<$t>()];

                #[inline]
                fn to_be_array(self) -> Self::Bytes {
                    self.to_be_bytes()
                }

                #[inline]
                fn to_le_array(self) -> Self::Bytes {
                    self.to_le_bytes()
                }

                #[inline]
                fn from_be_array(bytes: Self::Bytes) -> Self {
                    <$t>::from_be_bytes(bytes)
                }

                #[inline]
                fn from_le_array(bytes: Self::Bytes) -> Self {
                    <$t>::from_le_bytes(bytes)
                }
            }
        )*
    };
}

network_int!(u8, u16, u32, u64);

/// Big-endian (network order) bytes of `value`.
#[inline]
pub fn to_big_endian<I: NetworkInt>(value: I) -> I::Bytes {
    value.to_be_array()
}

/// Little-endian bytes of `value`.
#[inline]
pub fn to_little_endian<I: NetworkInt>(value: I) -> I::Bytes {
    value.to_le_array()
}

/// Integer encoded by big-endian `bytes`.
#[inline]
pub fn from_big_endian<I: NetworkInt>(bytes: I::Bytes) -> I {
    I::from_be_array(bytes)
}

/// Integer encoded by little-endian `bytes`.
#[inline]
pub fn from_little_endian<I: NetworkInt>(bytes: I::Bytes) -> I {
    I::from_le_array(bytes)
}

/// Reads a big-endian `I` at `offset`, or `None` if `data` is too short.
#[inline]
pub fn read_be<I: NetworkInt>(data: &[u8], offset: usize) -> Option<I> {
    let mut out = I::Bytes::default();
    let end = offset.checked_add(out.as_ref().len())?;
    out.as_mut().copy_from_slice(data.get(offset..end)?);

    Some(I::from_be_array(out))
}
