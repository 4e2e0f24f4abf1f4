// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The Internet checksum (RFC 1071): a 16-bit one's-complement sum of
//! big-endian words.

/// Running one's-complement sum over 16-bit big-endian words.
///
/// Carries are accumulated in a wide register and folded back in when the
/// sum is read, so words may be added in any order and in any number of
/// calls. A trailing odd byte passed to [`Checksum::add_bytes`] is padded
/// with a zero low byte.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Checksum {
    sum: u64,
}

impl Checksum {
    /// An empty sum.
    #[inline]
    pub const fn new() -> Self {
        Self { sum: 0 }
    }

    /// Adds one 16-bit word.
    #[inline]
    pub fn add_u16(&mut self, word: u16) {
        self.sum += u64::from(word);
    }

    /// Adds `bytes` as a sequence of big-endian words.
    #[inline]
    pub fn add_bytes(&mut self, bytes: &[u8]) {
        let mut words = bytes.chunks_exact(2);
        for word in &mut words {
            self.add_u16(u16::from_be_bytes([word[0], word[1]]));
        }

        if let [last] = words.remainder() {
            self.add_u16(u16::from(*last) << 8);
        }
    }

    /// The one's-complement sum with every carry folded back in.
    #[inline]
    pub fn fold(&self) -> u16 {
        fold(self.sum)
    }

    /// The checksum value to store in a header: the complement of
    /// [`Checksum::fold`].
    #[inline]
    pub fn finalize(&self) -> u16 {
        !self.fold()
    }
}

/// Folds end-around carries until the value fits in 16 bits.
#[inline]
pub fn fold(mut sum: u64) -> u16 {
    while sum > 0xffff {
        sum = (sum & 0xffff) + (sum >> 16);
    }

    sum as u16
}

/// Checks a stored checksum against one freshly computed over the same
/// words with the checksum field omitted.
///
/// The complement of `computed` is added to `stored`; the two agree iff the
/// complemented, carry-folded result is zero.
#[inline]
pub fn verify(computed: u16, stored: u16) -> bool {
    let sum = u64::from(!computed) + u64::from(stored);

    !fold(sum) == 0
}
