// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! IPv4 (RFC 791) headers and datagrams.

use bitflags::bitflags;
use xnet_types::{
    checksum::{self, Checksum},
    primitives::*,
    ByteSliceMut, Emit, HeaderLen, NetworkRepr, ParseError, ParseResult,
};
use zerocopy::{
    byteorder::network_endian::U16, FromBytes, Immutable, IntoBytes,
    KnownLayout, Unaligned,
};

#[cfg(feature = "alloc")]
use bytes::Bytes;

pub use xnet_types::Ipv4Addr as Address;

/// The value of the version nibble for IPv4.
pub const VERSION: u8 = 4;

/// Length of a header carrying no options.
pub const MINIMUM_HEADER_LENGTH: usize = 20;

/// Length of a header carrying the most options the IHL field can describe.
pub const MAXIMUM_HEADER_LENGTH: usize = 60;

const CHECKSUM_OFFSET: usize = 10;

/// An IP protocol number.
#[derive(Clone, Copy, Default, Hash, Debug, PartialEq, Eq, Ord, PartialOrd)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IpProtocol(pub u8);

impl IpProtocol {
    pub const ICMP: Self = Self(1);
    pub const IGMP: Self = Self(2);
    pub const TCP: Self = Self(6);
    pub const UDP: Self = Self(17);
}

impl NetworkRepr<u8> for IpProtocol {
    #[inline]
    fn to_network(self) -> u8 {
        self.0
    }

    #[inline]
    fn from_network(val: u8) -> Self {
        Self(val)
    }
}

bitflags! {
/// The three control bits preceding the fragment offset.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct Ipv4Flags: u3 {
    const RESERVED       = 0b100;
    const DONT_FRAGMENT  = 0b010;
    const MORE_FRAGMENTS = 0b001;
}
}

impl NetworkRepr<u3> for Ipv4Flags {
    #[inline]
    fn to_network(self) -> u3 {
        self.bits()
    }

    #[inline]
    fn from_network(val: u3) -> Self {
        Ipv4Flags::from_bits_truncate(val)
    }
}

/// The fixed 20 bytes at the front of every IPv4 header.
#[derive(FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned)]
#[repr(C)]
struct Ipv4Base {
    version_ihl: u8,
    type_of_service: u8,
    total_length: U16,
    identification: U16,
    flags_fragment_offset: U16,
    time_to_live: u8,
    protocol: u8,
    checksum: U16,
    source: Address,
    destination: Address,
}

/// An owned IPv4 header.
///
/// `header_length` and `total_length` are in bytes. Options are not
/// carried: a header emitted with `header_length > 20` has its option
/// bytes zero-filled.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Header {
    pub header_length: u8,
    pub type_of_service: u8,
    pub total_length: u16,
    pub identification: u16,
    pub flags: u3,
    pub fragment_offset: u13,
    pub time_to_live: u8,
    pub protocol: IpProtocol,
    pub checksum: u16,
    pub source: Address,
    pub destination: Address,
}

impl Default for Header {
    fn default() -> Self {
        Self {
            header_length: MINIMUM_HEADER_LENGTH as u8,
            type_of_service: 0,
            total_length: MINIMUM_HEADER_LENGTH as u16,
            identification: 0,
            flags: 0,
            fragment_offset: 0,
            time_to_live: 64,
            protocol: IpProtocol::default(),
            checksum: 0,
            source: Address::UNSPECIFIED,
            destination: Address::UNSPECIFIED,
        }
    }
}

impl Header {
    /// Checks every structural invariant of the header: a header length
    /// in `20..=60` and a multiple of 4, a total length covering at least
    /// the header, and flag/offset values that fit their bit widths.
    ///
    /// The checksum is not examined; see [`Header::with_checksum`].
    pub fn validate(&self) -> ParseResult<()> {
        let hl = usize::from(self.header_length);
        if !(MINIMUM_HEADER_LENGTH..=MAXIMUM_HEADER_LENGTH).contains(&hl)
            || hl % 4 != 0
        {
            return Err(ParseError::IllegalValue);
        }

        if usize::from(self.total_length) < hl {
            return Err(ParseError::IllegalValue);
        }

        if self.flags > 0b111 || self.fragment_offset > 0x1fff {
            return Err(ParseError::IllegalValue);
        }

        Ok(())
    }

    /// Returns this header with `checksum` set to the value a receiver
    /// will verify against.
    #[must_use]
    pub fn with_checksum(mut self) -> Self {
        self.checksum = 0;
        let mut csum = Checksum::new();
        csum.add_bytes(self.base().as_bytes());
        self.checksum = csum.finalize();

        self
    }

    /// The control bits as typed flags.
    #[inline]
    pub fn ipv4_flags(&self) -> Ipv4Flags {
        Ipv4Flags::from_network(self.flags)
    }

    /// Length of the payload this header announces.
    #[inline]
    pub fn payload_length(&self) -> usize {
        usize::from(self.total_length)
            .saturating_sub(usize::from(self.header_length))
    }

    fn base(&self) -> Ipv4Base {
        let flags = u16::from(self.flags & 0b111) << 13;
        Ipv4Base {
            version_ihl: (VERSION << 4) | ((self.header_length / 4) & 0xf),
            type_of_service: self.type_of_service,
            total_length: self.total_length.into(),
            identification: self.identification.into(),
            flags_fragment_offset: (flags | (self.fragment_offset & 0x1fff))
                .into(),
            time_to_live: self.time_to_live,
            protocol: self.protocol.to_network(),
            checksum: self.checksum.into(),
            source: self.source,
            destination: self.destination,
        }
    }

    fn from_base(base: &Ipv4Base) -> Self {
        let flags_fragment_offset = base.flags_fragment_offset.get();
        Self {
            header_length: (base.version_ihl & 0xf) * 4,
            type_of_service: base.type_of_service,
            total_length: base.total_length.get(),
            identification: base.identification.get(),
            flags: (flags_fragment_offset >> 13) as u3,
            fragment_offset: flags_fragment_offset & 0x1fff,
            time_to_live: base.time_to_live,
            protocol: IpProtocol::from_network(base.protocol),
            checksum: base.checksum.get(),
            source: base.source,
            destination: base.destination,
        }
    }
}

impl HeaderLen for Header {
    const MINIMUM_LENGTH: usize = MINIMUM_HEADER_LENGTH;

    #[inline]
    fn packet_length(&self) -> usize {
        usize::from(self.header_length)
    }
}

impl Emit for Header {
    #[inline]
    fn emit_raw<V: ByteSliceMut>(&self, mut buf: V) -> usize {
        let len = self.packet_length();
        buf[..MINIMUM_HEADER_LENGTH].copy_from_slice(self.base().as_bytes());
        buf[MINIMUM_HEADER_LENGTH..len].fill(0);

        len
    }

    #[inline]
    fn check_emit(&self) -> ParseResult<()> {
        self.validate()
    }
}

/// Writes the fixed 20-byte part of `header`.
///
/// Byte 0 always carries version 4 alongside `header_length / 4`, and the
/// flags share a single big-endian word with the fragment offset. This is
/// the inverse of [`HeaderView::parse`] for option-less headers.
pub fn serialize(header: &Header) -> [u8; MINIMUM_HEADER_LENGTH] {
    let mut out = [0u8; MINIMUM_HEADER_LENGTH];
    out.copy_from_slice(header.base().as_bytes());

    out
}

/// A borrowed, unvalidated view of an IPv4 header at the front of a
/// buffer.
///
/// Field accessors return `None` when the buffer is too short to hold the
/// field; they do not require the header as a whole to be valid.
#[derive(Clone, Copy, Debug)]
pub struct HeaderView<'a> {
    data: &'a [u8],
}

impl<'a> HeaderView<'a> {
    #[inline]
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    /// Checks that the buffer starts with a complete, well-formed IPv4
    /// header with a correct checksum.
    pub fn try_validate(&self) -> ParseResult<()> {
        let first = *self.data.first().ok_or(ParseError::TooSmall)?;
        if first >> 4 != VERSION {
            return Err(ParseError::BadVersion);
        }

        let hl = usize::from(first & 0xf) * 4;
        if hl < MINIMUM_HEADER_LENGTH {
            return Err(ParseError::IllegalValue);
        }

        if self.data.len() < hl {
            return Err(ParseError::TooSmall);
        }

        if !self.verify_checksum() {
            return Err(ParseError::BadChecksum);
        }

        Ok(())
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.try_validate().is_ok()
    }

    /// Reads every field into an owned [`Header`], if the header is
    /// valid.
    pub fn try_parse(&self) -> ParseResult<Header> {
        self.try_validate()?;
        let (base, _) = Ipv4Base::ref_from_prefix(self.data)
            .map_err(|_| ParseError::TooSmall)?;

        Ok(Header::from_base(base))
    }

    #[inline]
    pub fn parse(&self) -> Option<Header> {
        self.try_parse().ok()
    }

    /// Header length in bytes, as declared by the IHL nibble.
    #[inline]
    pub fn header_length(&self) -> Option<usize> {
        self.data.first().map(|b| usize::from(b & 0xf) * 4)
    }

    #[inline]
    pub fn type_of_service(&self) -> Option<u8> {
        read_be(self.data, 1)
    }

    #[inline]
    pub fn total_length(&self) -> Option<u16> {
        read_be(self.data, 2)
    }

    #[inline]
    pub fn identification(&self) -> Option<u16> {
        read_be(self.data, 4)
    }

    #[inline]
    pub fn flags(&self) -> Option<u3> {
        read_be::<u16>(self.data, 6).map(|v| (v >> 13) as u3)
    }

    #[inline]
    pub fn fragment_offset(&self) -> Option<u13> {
        read_be::<u16>(self.data, 6).map(|v| v & 0x1fff)
    }

    #[inline]
    pub fn time_to_live(&self) -> Option<u8> {
        read_be(self.data, 8)
    }

    #[inline]
    pub fn protocol(&self) -> Option<IpProtocol> {
        read_be(self.data, 9).map(IpProtocol)
    }

    #[inline]
    pub fn checksum(&self) -> Option<u16> {
        read_be(self.data, CHECKSUM_OFFSET)
    }

    #[inline]
    pub fn source(&self) -> Option<Address> {
        read_be(self.data, 12).map(Address::from_msbf)
    }

    #[inline]
    pub fn destination(&self) -> Option<Address> {
        read_be(self.data, 16).map(Address::from_msbf)
    }

    /// The option bytes between the fixed header and the payload.
    #[inline]
    pub fn options(&self) -> Option<&'a [u8]> {
        self.header_bytes()?.get(MINIMUM_HEADER_LENGTH..)
    }

    /// All bytes of the header, options included.
    #[inline]
    pub fn header_bytes(&self) -> Option<&'a [u8]> {
        let hl = self.header_length()?;
        if hl < MINIMUM_HEADER_LENGTH {
            return None;
        }

        self.data.get(..hl)
    }

    /// Computes the checksum the header should carry: the complemented
    /// one's-complement sum of every header word except the checksum
    /// itself.
    pub fn compute_checksum(&self) -> Option<u16> {
        let header = self.header_bytes()?;
        let mut csum = Checksum::new();
        csum.add_bytes(&header[..CHECKSUM_OFFSET]);
        csum.add_bytes(&header[CHECKSUM_OFFSET + 2..]);

        Some(csum.finalize())
    }

    /// Checks the stored checksum against a freshly computed one.
    pub fn verify_checksum(&self) -> bool {
        match (self.compute_checksum(), self.checksum()) {
            (Some(computed), Some(stored)) => checksum::verify(computed, stored),
            _ => false,
        }
    }
}

/// A borrowed view of an IPv4 datagram at the front of a buffer.
///
/// A valid datagram has a valid header, and its payload of exactly
/// `total_length - header_length` bytes lies within the buffer. Bytes
/// beyond `total_length` are ignored.
#[derive(Clone, Copy, Debug)]
pub struct PacketView<'a> {
    data: &'a [u8],
}

impl<'a> PacketView<'a> {
    #[inline]
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    /// Returns `(header_length, total_length)` of a valid datagram.
    fn extent(&self) -> ParseResult<(usize, usize)> {
        let header = self.header_view();
        header.try_validate()?;

        let hl = header.header_length().ok_or(ParseError::TooSmall)?;
        let total = usize::from(
            header.total_length().ok_or(ParseError::TooSmall)?,
        );
        if total < hl {
            return Err(ParseError::IllegalValue);
        }

        if self.data.len() < total {
            return Err(ParseError::TooSmall);
        }

        Ok((hl, total))
    }

    #[inline]
    pub fn try_validate(&self) -> ParseResult<()> {
        self.extent().map(|_| ())
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.extent().is_ok()
    }

    #[inline]
    pub fn header_view(&self) -> HeaderView<'a> {
        HeaderView::new(self.data)
    }

    /// Header plus payload length of a valid datagram.
    #[inline]
    pub fn total_size(&self) -> Option<usize> {
        self.extent().ok().map(|(_, total)| total)
    }

    #[inline]
    pub fn payload(&self) -> Option<&'a [u8]> {
        let (hl, total) = self.extent().ok()?;
        Some(&self.data[hl..total])
    }

    /// The datagram's bytes, without anything trailing it in the buffer.
    #[inline]
    pub fn as_bytes(&self) -> Option<&'a [u8]> {
        let (_, total) = self.extent().ok()?;
        Some(&self.data[..total])
    }

    /// Copies exactly the datagram's bytes into a new owned buffer.
    #[cfg(feature = "alloc")]
    pub fn clone_owned(&self) -> Option<Bytes> {
        self.as_bytes().map(Bytes::copy_from_slice)
    }
}
