// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Minimal type for IPv4 addresses.
//!
//! These addresses can be translated into [`core::net`] addresses at no cost,
//! but they also implement traits from [`zerocopy`] for zero-copy parsing.

use crate::zerocopy_type;

zerocopy_type!(
    /// An IPv4 address, stored most-significant byte first.
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct Ipv4Addr {
        inner: [u8; 4],
    }
);

impl Ipv4Addr {
    /// An IPv4 address representing an unspecified address: `0.0.0.0`
    pub const UNSPECIFIED: Self = Self { inner: [0; 4] };

    /// The limited broadcast address: `255.255.255.255`
    pub const BROADCAST: Self = Self { inner: [255; 4] };

    /// Return the bytes of the address.
    #[inline]
    pub const fn octets(&self) -> [u8; 4] {
        self.inner
    }

    /// Builds a new address from bytes
    #[inline]
    pub const fn from_octets(bytes: [u8; 4]) -> Self {
        Self { inner: bytes }
    }

    /// Builds a new address from its 32-bit value, e.g. `0xc0a8_0001` for
    /// `192.168.0.1`.
    #[inline]
    pub const fn from_msbf(addr: u32) -> Self {
        Self { inner: addr.to_be_bytes() }
    }

    /// The 32-bit value of this address.
    #[inline]
    pub const fn to_msbf(&self) -> u32 {
        u32::from_be_bytes(self.inner)
    }

    /// Returns true if the address is `0.0.0.0`.
    #[inline]
    pub fn is_unspecified(&self) -> bool {
        *self == Self::UNSPECIFIED
    }

    /// Returns true if the address is a multicast address.
    #[inline]
    pub fn is_multicast(&self) -> bool {
        self.inner[0] >= 224 && self.inner[0] <= 239
    }

    /// Returns true if the address is a broadcast address.
    #[inline]
    pub fn is_broadcast(&self) -> bool {
        *self == Self::BROADCAST
    }

    /// Returns true if the address is a private address.
    #[inline]
    pub fn is_private(&self) -> bool {
        match self.inner {
            [10, ..] => true,
            [172, b, ..] => (16..=31).contains(&b),
            [192, 168, ..] => true,
            _ => false,
        }
    }

    /// Returns true if the address lies in `127.0.0.0/8`.
    #[inline]
    pub fn is_loopback(&self) -> bool {
        self.inner[0] == 127
    }
}

impl From<core::net::Ipv4Addr> for Ipv4Addr {
    #[inline]
    fn from(ip4: core::net::Ipv4Addr) -> Self {
        Self { inner: ip4.octets() }
    }
}

impl From<Ipv4Addr> for core::net::Ipv4Addr {
    #[inline]
    fn from(ip4: Ipv4Addr) -> Self {
        Self::from(ip4.inner)
    }
}

impl core::fmt::Display for Ipv4Addr {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&core::net::Ipv4Addr::from(*self), f)
    }
}
