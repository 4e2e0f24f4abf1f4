// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Helpers for declaring fixed-width field types.

/// Declares a newtype over a byte array which can be embedded in a
/// zero-copy wire layout.
///
/// The generated type carries the zerocopy derives and the usual value
/// traits, converts from its array, and implements `HeaderLen` and `Emit`
/// by copying its bytes verbatim.
#[macro_export]
macro_rules! zerocopy_type {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $field_vis:vis $field:ident: [u8; $len:literal] $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(
            Clone,
            Copy,
            Debug,
            Eq,
            Hash,
            Ord,
            PartialEq,
            PartialOrd,
            ::zerocopy::FromBytes,
            ::zerocopy::IntoBytes,
            ::zerocopy::KnownLayout,
            ::zerocopy::Immutable,
            ::zerocopy::Unaligned,
        )]
        #[repr(transparent)]
        $vis struct $name {
            $field_vis $field: [u8; $len],
        }

        impl From<[u8; $len]> for $name {
            #[inline]
            fn from($field: [u8; $len]) -> Self {
                Self { $field }
            }
        }

        impl From<$name> for [u8; $len] {
            #[inline]
            fn from(val: $name) -> Self {
                val.$field
            }
        }

        impl $crate::HeaderLen for $name {
            const MINIMUM_LENGTH: usize = $len;

            #[inline]
            fn packet_length(&self) -> usize {
                $len
            }
        }

        impl $crate::Emit for $name {
            #[inline]
            fn emit_raw<V: $crate::ByteSliceMut>(&self, mut buf: V) -> usize {
                buf[..$len].copy_from_slice(&self.$field);
                $len
            }
        }
    };
}
