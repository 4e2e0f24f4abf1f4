// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! UDP (RFC 768) headers, with the IPv4 pseudo-header checksum.

use crate::ip::{Address, IpProtocol};
use xnet_types::{
    checksum::{self, Checksum},
    ByteSliceMut, Emit, HeaderLen, ParseError, ParseResult,
};
use zerocopy::{
    byteorder::network_endian::U16, FromBytes, Immutable, IntoBytes,
    KnownLayout, Unaligned,
};

/// Length of a UDP header.
pub const HEADER_LENGTH: usize = 8;

#[derive(FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned)]
#[repr(C)]
struct UdpBase {
    source_port: U16,
    destination_port: U16,
    length: U16,
    checksum: U16,
}

/// An owned UDP header. `length` counts the header as well as the payload.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Header {
    pub source_port: u16,
    pub destination_port: u16,
    pub length: u16,
    pub checksum: u16,
}

impl Default for Header {
    fn default() -> Self {
        Self {
            source_port: 0,
            destination_port: 0,
            length: HEADER_LENGTH as u16,
            checksum: 0,
        }
    }
}

impl Header {
    /// Length of the payload this header announces.
    #[inline]
    pub fn payload_length(&self) -> usize {
        usize::from(self.length).saturating_sub(HEADER_LENGTH)
    }

    fn base(&self) -> UdpBase {
        UdpBase {
            source_port: self.source_port.into(),
            destination_port: self.destination_port.into(),
            length: self.length.into(),
            checksum: self.checksum.into(),
        }
    }
}

impl HeaderLen for Header {
    const MINIMUM_LENGTH: usize = HEADER_LENGTH;

    #[inline]
    fn packet_length(&self) -> usize {
        HEADER_LENGTH
    }
}

impl Emit for Header {
    #[inline]
    fn emit_raw<V: ByteSliceMut>(&self, mut buf: V) -> usize {
        buf[..HEADER_LENGTH].copy_from_slice(self.base().as_bytes());

        HEADER_LENGTH
    }

    #[inline]
    fn check_emit(&self) -> ParseResult<()> {
        if usize::from(self.length) < HEADER_LENGTH {
            return Err(ParseError::IllegalValue);
        }

        Ok(())
    }
}

/// Reads the header at the front of `data`, rejecting a declared length
/// shorter than the header itself.
pub fn try_parse_header(data: &[u8]) -> ParseResult<Header> {
    let (base, _) =
        UdpBase::ref_from_prefix(data).map_err(|_| ParseError::TooSmall)?;

    let header = Header {
        source_port: base.source_port.get(),
        destination_port: base.destination_port.get(),
        length: base.length.get(),
        checksum: base.checksum.get(),
    };
    header.check_emit()?;

    Ok(header)
}

#[inline]
pub fn parse_header(data: &[u8]) -> Option<Header> {
    try_parse_header(data).ok()
}

/// The `length - 8` bytes following the header, if all of them are
/// present.
pub fn payload(data: &[u8]) -> Option<&[u8]> {
    let header = parse_header(data)?;
    data.get(HEADER_LENGTH..usize::from(header.length))
}

/// Builds the header for `payload`, carried from `pseudo_source` to
/// `pseudo_destination` in an IPv4 datagram of protocol `pseudo_protocol`.
///
/// The checksum covers the IPv4 pseudo-header, this header with a zero
/// checksum, and the payload. A computed checksum of zero is sent as
/// `0xffff`, since zero on the wire means no checksum was computed.
///
/// Returns `None` if the datagram length does not fit in 16 bits.
pub fn build_header(
    pseudo_source: Address,
    pseudo_destination: Address,
    pseudo_protocol: IpProtocol,
    source_port: u16,
    destination_port: u16,
    payload: &[u8],
) -> Option<Header> {
    let length = u16::try_from(payload.len().checked_add(HEADER_LENGTH)?).ok()?;
    let mut header =
        Header { source_port, destination_port, length, checksum: 0 };

    let mut csum = Checksum::new();
    add_pseudo_header(
        &mut csum,
        pseudo_source,
        pseudo_destination,
        pseudo_protocol,
        length,
    );
    csum.add_bytes(header.base().as_bytes());
    csum.add_bytes(payload);

    header.checksum = match csum.finalize() {
        0 => 0xffff,
        sum => sum,
    };

    Some(header)
}

/// Checks the checksum of the UDP datagram at the front of `data`, which
/// travelled between the given IPv4 addresses.
///
/// A stored checksum of zero means the sender did not compute one, and is
/// accepted.
pub fn verify_checksum(
    pseudo_source: Address,
    pseudo_destination: Address,
    data: &[u8],
) -> bool {
    let Some(header) = parse_header(data) else {
        return false;
    };
    let Some(body) = payload(data) else {
        return false;
    };

    if header.checksum == 0 {
        return true;
    }

    let mut csum = Checksum::new();
    add_pseudo_header(
        &mut csum,
        pseudo_source,
        pseudo_destination,
        IpProtocol::UDP,
        header.length,
    );
    csum.add_bytes(Header { checksum: 0, ..header }.base().as_bytes());
    csum.add_bytes(body);

    checksum::verify(csum.finalize(), header.checksum)
}

fn add_pseudo_header(
    csum: &mut Checksum,
    source: Address,
    destination: Address,
    protocol: IpProtocol,
    length: u16,
) {
    csum.add_bytes(&source.octets());
    csum.add_bytes(&destination.octets());
    csum.add_u16(u16::from(protocol.0));
    csum.add_u16(length);
}
