// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! DHCP (RFC 2131) messages: the fixed BOOTP header, the magic cookie, and
//! the TLV options area which follows it.

use crate::ip::Address;
use bitflags::bitflags;
use core::ffi::CStr;
use macaddr::MacAddr6;
use xnet_types::{
    zerocopy_type, ByteSliceMut, Emit, HeaderLen, NetworkRepr, ParseError,
    ParseResult,
};
use zerocopy::{
    byteorder::network_endian::{U16, U32},
    FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned,
};

#[cfg(feature = "alloc")]
use alloc::vec::Vec;

/// Length of the fixed header preceding the magic cookie.
pub const HEADER_LENGTH: usize = 236;

/// Marks the start of the options area.
pub const MAGIC_COOKIE: [u8; 4] = [99, 130, 83, 99];

/// Single-byte filler option.
pub const PAD: u8 = 0;

/// Single-byte option ending the options area.
pub const END: u8 = 255;

/// `htype` of a 10Mb Ethernet hardware address.
pub const HTYPE_ETHERNET: u8 = 1;

const SNAME_LENGTH: usize = 64;
const FILE_LENGTH: usize = 128;

/// The BOOTP message direction.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
#[repr(u8)]
pub enum OpCode {
    /// Client to server, `BOOTREQUEST`.
    #[default]
    Request = 1,
    /// Server to client, `BOOTREPLY`.
    Reply = 2,
}

impl TryFrom<u8> for OpCode {
    type Error = ParseError;

    #[inline]
    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(OpCode::Request),
            2 => Ok(OpCode::Reply),
            _ => Err(ParseError::IllegalValue),
        }
    }
}

impl From<OpCode> for u8 {
    #[inline]
    fn from(op: OpCode) -> Self {
        op as u8
    }
}

bitflags! {
/// The `flags` word. Only the most significant bit is defined.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct DhcpFlags: u16 {
    const BROADCAST = 0x8000;
}
}

impl NetworkRepr<u16> for DhcpFlags {
    #[inline]
    fn to_network(self) -> u16 {
        self.bits()
    }

    #[inline]
    fn from_network(val: u16) -> Self {
        DhcpFlags::from_bits_retain(val)
    }
}

zerocopy_type!(
    /// The 16-byte client hardware address field, `chaddr`.
    pub struct HardwareAddr {
        inner: [u8; 16],
    }
);

impl HardwareAddr {
    #[inline]
    pub const fn octets(&self) -> [u8; 16] {
        self.inner
    }

    /// Places an Ethernet address in the first six bytes, zeroing the
    /// rest.
    pub fn from_mac(mac: MacAddr6) -> Self {
        let mut inner = [0u8; 16];
        inner[..6].copy_from_slice(mac.as_bytes());

        Self { inner }
    }

    /// The Ethernet address held here, when `htype`/`hlen` describe one.
    pub fn mac(&self, htype: u8, hlen: u8) -> Option<MacAddr6> {
        if htype != HTYPE_ETHERNET || hlen != 6 {
            return None;
        }

        let [a, b, c, d, e, f, ..] = self.inner;
        Some(MacAddr6::new(a, b, c, d, e, f))
    }
}

impl Default for HardwareAddr {
    fn default() -> Self {
        Self { inner: [0; 16] }
    }
}

#[derive(FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned)]
#[repr(C)]
struct DhcpBase {
    op: u8,
    htype: u8,
    hlen: u8,
    hops: u8,
    xid: U32,
    secs: U16,
    flags: U16,
    ciaddr: Address,
    yiaddr: Address,
    siaddr: Address,
    giaddr: Address,
    chaddr: HardwareAddr,
    sname: [u8; SNAME_LENGTH],
    file: [u8; FILE_LENGTH],
}

/// An owned DHCP header.
///
/// `sname` and `file` are raw, NUL-padded fields; read them as text through
/// [`Header::server_name`] and [`Header::boot_file_name`].
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Header {
    pub op: OpCode,
    pub htype: u8,
    pub hlen: u8,
    pub hops: u8,
    pub xid: u32,
    pub secs: u16,
    pub flags: u16,
    /// Client address, when the client already holds one.
    pub ciaddr: Address,
    /// "Your" address, offered to the client.
    pub yiaddr: Address,
    /// Address of the next server to use in bootstrap.
    pub siaddr: Address,
    /// Relay agent address.
    pub giaddr: Address,
    pub chaddr: HardwareAddr,
    pub sname: [u8; SNAME_LENGTH],
    pub file: [u8; FILE_LENGTH],
}

impl Default for Header {
    fn default() -> Self {
        Self {
            op: OpCode::Request,
            htype: HTYPE_ETHERNET,
            hlen: 6,
            hops: 0,
            xid: 0,
            secs: 0,
            flags: 0,
            ciaddr: Address::UNSPECIFIED,
            yiaddr: Address::UNSPECIFIED,
            siaddr: Address::UNSPECIFIED,
            giaddr: Address::UNSPECIFIED,
            chaddr: HardwareAddr::default(),
            sname: [0; SNAME_LENGTH],
            file: [0; FILE_LENGTH],
        }
    }
}

impl Header {
    /// The server host name.
    ///
    /// Fails with [`ParseError::Unterminated`] if the field holds no NUL,
    /// and with [`ParseError::IllegalValue`] if the text is not UTF-8.
    #[inline]
    pub fn server_name(&self) -> ParseResult<&str> {
        field_text(&self.sname)
    }

    /// The boot file name, under the same rules as
    /// [`Header::server_name`].
    #[inline]
    pub fn boot_file_name(&self) -> ParseResult<&str> {
        field_text(&self.file)
    }

    /// Stores `name` as the server host name. The name must leave room
    /// for its terminator.
    #[inline]
    pub fn set_server_name(&mut self, name: &str) -> ParseResult<()> {
        set_field_text(&mut self.sname, name)
    }

    #[inline]
    pub fn set_boot_file_name(&mut self, name: &str) -> ParseResult<()> {
        set_field_text(&mut self.file, name)
    }

    #[inline]
    pub fn dhcp_flags(&self) -> DhcpFlags {
        DhcpFlags::from_network(self.flags)
    }

    /// Whether the client asked for replies to be broadcast.
    #[inline]
    pub fn is_broadcast(&self) -> bool {
        self.dhcp_flags().contains(DhcpFlags::BROADCAST)
    }

    #[inline]
    pub fn client_mac(&self) -> Option<MacAddr6> {
        self.chaddr.mac(self.htype, self.hlen)
    }

    fn base(&self) -> DhcpBase {
        DhcpBase {
            op: self.op.into(),
            htype: self.htype,
            hlen: self.hlen,
            hops: self.hops,
            xid: self.xid.into(),
            secs: self.secs.into(),
            flags: self.flags.into(),
            ciaddr: self.ciaddr,
            yiaddr: self.yiaddr,
            siaddr: self.siaddr,
            giaddr: self.giaddr,
            chaddr: self.chaddr,
            sname: self.sname,
            file: self.file,
        }
    }
}

fn field_text(field: &[u8]) -> ParseResult<&str> {
    CStr::from_bytes_until_nul(field)
        .map_err(|_| ParseError::Unterminated)?
        .to_str()
        .map_err(|_| ParseError::IllegalValue)
}

fn set_field_text(field: &mut [u8], text: &str) -> ParseResult<()> {
    let text = text.as_bytes();
    if text.contains(&0) {
        return Err(ParseError::IllegalValue);
    }

    if text.len() >= field.len() {
        return Err(ParseError::TooLarge);
    }

    field.fill(0);
    field[..text.len()].copy_from_slice(text);

    Ok(())
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
}

/// Reads the fixed header at the front of `data`.
pub fn try_parse_header(data: &[u8]) -> ParseResult<Header> {
    let (base, _) =
        DhcpBase::ref_from_prefix(data).map_err(|_| ParseError::TooSmall)?;

    Ok(Header {
        op: OpCode::try_from(base.op)?,
        htype: base.htype,
        hlen: base.hlen,
        hops: base.hops,
        xid: base.xid.get(),
        secs: base.secs.get(),
        flags: base.flags.get(),
        ciaddr: base.ciaddr,
        yiaddr: base.yiaddr,
        siaddr: base.siaddr,
        giaddr: base.giaddr,
        chaddr: base.chaddr,
        sname: base.sname,
        file: base.file,
    })
}

#[inline]
pub fn parse_header(data: &[u8]) -> Option<Header> {
    try_parse_header(data).ok()
}

/// Writes the fixed header; the inverse of [`parse_header`].
pub fn serialize(header: &Header) -> [u8; HEADER_LENGTH] {
    let mut out = [0u8; HEADER_LENGTH];
    out.copy_from_slice(header.base().as_bytes());

    out
}

/// Walks an options area (the bytes after the cookie) and checks that no
/// record runs past its end.
///
/// `PAD` and `END` occupy one byte; every other code is followed by a
/// length byte and that many value bytes. Records after an `END` are still
/// checked.
pub fn try_validate_options(options: &[u8]) -> ParseResult<()> {
    let mut offset = 0;
    while let Some(&code) = options.get(offset) {
        if code == PAD || code == END {
            offset += 1;
            continue;
        }

        let len = *options
            .get(offset + 1)
            .ok_or(ParseError::MalformedOption)?;
        offset += 2 + usize::from(len);
        if offset > options.len() {
            return Err(ParseError::MalformedOption);
        }
    }

    Ok(())
}

#[inline]
pub fn validate_options(options: &[u8]) -> bool {
    try_validate_options(options).is_ok()
}

/// A borrowed view of a DHCP message at the front of a buffer.
#[derive(Clone, Copy, Debug)]
pub struct PacketView<'a> {
    data: &'a [u8],
}

impl<'a> PacketView<'a> {
    #[inline]
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    #[inline]
    pub fn header(&self) -> Option<Header> {
        parse_header(self.data)
    }

    /// The options area following the magic cookie, if the message has a
    /// full header, the exact cookie, and well-formed options.
    pub fn try_options(&self) -> ParseResult<&'a [u8]> {
        let rest = self
            .data
            .get(HEADER_LENGTH..)
            .ok_or(ParseError::TooSmall)?;
        let (cookie, options) = rest
            .split_first_chunk::<4>()
            .ok_or(ParseError::TooSmall)?;
        if *cookie != MAGIC_COOKIE {
            return Err(ParseError::BadCookie);
        }

        try_validate_options(options)?;

        Ok(options)
    }

    #[inline]
    pub fn options(&self) -> Option<&'a [u8]> {
        self.try_options().ok()
    }

    #[inline]
    pub fn options_iter(&self) -> Option<OptionsIter<'a>> {
        self.options().map(OptionsIter::new)
    }
}

/// A single TLV record. `PAD` and `END` have an empty value.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct DhcpOption<'a> {
    pub code: u8,
    pub value: &'a [u8],
}

/// Iterates over the records of an options area, stopping at `END`.
///
/// `PAD` bytes are skipped. Iteration also stops at the first record which
/// does not fit; run [`validate_options`] first to tell that apart from a
/// clean end.
#[derive(Clone, Debug)]
pub struct OptionsIter<'a> {
    rest: &'a [u8],
}

impl<'a> OptionsIter<'a> {
    #[inline]
    pub fn new(options: &'a [u8]) -> Self {
        Self { rest: options }
    }
}

impl<'a> Iterator for OptionsIter<'a> {
    type Item = DhcpOption<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (&code, rest) = self.rest.split_first()?;
            match code {
                PAD => self.rest = rest,
                END => {
                    self.rest = &[];
                    return None;
                }
                _ => {
                    let Some((&len, rest)) = rest.split_first() else {
                        self.rest = &[];
                        return None;
                    };
                    let len = usize::from(len);
                    if rest.len() < len {
                        self.rest = &[];
                        return None;
                    }

                    let (value, rest) = rest.split_at(len);
                    self.rest = rest;
                    return Some(DhcpOption { code, value });
                }
            }
        }
    }
}

/// Assembles a complete DHCP message: header, magic cookie, options and a
/// closing `END`.
#[cfg(feature = "alloc")]
#[derive(Clone, Debug)]
pub struct MessageBuilder {
    header: Header,
    options: Vec<u8>,
}

#[cfg(feature = "alloc")]
impl MessageBuilder {
    pub fn new(header: Header) -> Self {
        Self { header, options: Vec::new() }
    }

    /// Appends one `(code, length, value)` record.
    ///
    /// `PAD` and `END` are refused since they carry no length, as is a
    /// value longer than 255 bytes.
    pub fn push_option(
        &mut self,
        code: u8,
        value: &[u8],
    ) -> ParseResult<&mut Self> {
        if code == PAD || code == END {
            return Err(ParseError::IllegalValue);
        }

        let len = u8::try_from(value.len()).map_err(|_| ParseError::TooLarge)?;
        self.options.push(code);
        self.options.push(len);
        self.options.extend_from_slice(value);

        Ok(self)
    }

    /// Serialises the message.
    pub fn build(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(
            HEADER_LENGTH + MAGIC_COOKIE.len() + self.options.len() + 1,
        );
        out.extend_from_slice(&serialize(&self.header));
        out.extend_from_slice(&MAGIC_COOKIE);
        out.extend_from_slice(&self.options);
        out.push(END);

        out
    }
}
