// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::{
    dhcp::{self, DhcpOption, HardwareAddr, MessageBuilder, OpCode},
    ip::{self, Address, HeaderView, IpProtocol, Ipv4Flags, PacketView},
    udp,
};
use alloc::vec::Vec;
use macaddr::MacAddr6;
use xnet_types::{Emit, HeaderLen, ParseError};

#[rustfmt::skip]
const KNOWN_V4: [u8; 20] = [
    0x45, 0x00, 0x00, 0x73,
    0x00, 0x00, 0x40, 0x00,
    0x40, 0x11, 0xb8, 0x61,
    0xc0, 0xa8, 0x00, 0x01,
    0xc0, 0xa8, 0x00, 0xc7,
];

fn sample_v4() -> ip::Header {
    ip::Header {
        identification: 0x1c46,
        flags: Ipv4Flags::DONT_FRAGMENT.bits(),
        total_length: 28,
        protocol: IpProtocol::UDP,
        source: Address::from_octets([10, 0, 0, 1]),
        destination: Address::from_octets([10, 0, 0, 2]),
        ..Default::default()
    }
    .with_checksum()
}

#[test]
fn known_header_reads_back() {
    let view = HeaderView::new(&KNOWN_V4);
    assert!(view.is_valid());
    assert_eq!(view.compute_checksum(), Some(0xb861));

    let hdr = view.parse().unwrap();
    assert_eq!(hdr.header_length, 20);
    assert_eq!(hdr.total_length, 0x73);
    assert_eq!(hdr.ipv4_flags(), Ipv4Flags::DONT_FRAGMENT);
    assert_eq!(hdr.fragment_offset, 0);
    assert_eq!(hdr.time_to_live, 64);
    assert_eq!(hdr.protocol, IpProtocol::UDP);
    assert_eq!(hdr.checksum, 0xb861);
    assert_eq!(hdr.source, Address::from_octets([192, 168, 0, 1]));
    assert_eq!(hdr.destination, Address::from_octets([192, 168, 0, 199]));

    assert_eq!(ip::serialize(&hdr), KNOWN_V4);
    assert_eq!(hdr.with_checksum(), hdr);
}

#[test]
fn checksum_detects_every_single_bit_flip() {
    let bytes = ip::serialize(&sample_v4());
    assert!(HeaderView::new(&bytes).verify_checksum());

    for bit in 0..bytes.len() * 8 {
        let mut flipped = bytes;
        flipped[bit / 8] ^= 1 << (bit % 8);
        assert!(
            !HeaderView::new(&flipped).is_valid(),
            "bit {bit} flip went unnoticed"
        );
    }
}

#[test]
fn parse_inverts_serialize() {
    let hdr = ip::Header {
        type_of_service: 0xb8,
        fragment_offset: 0x1abc,
        flags: 0b101,
        time_to_live: 3,
        ..sample_v4()
    }
    .with_checksum();

    let bytes = ip::serialize(&hdr);
    assert_eq!(bytes[0], 0x45);
    assert_eq!(&bytes[6..8], &[0xba, 0xbc]);
    assert_eq!(HeaderView::new(&bytes).parse(), Some(hdr));
}

#[test]
fn header_length_boundaries() {
    // IHL 4 is below the minimum even when 20 bytes are present.
    let mut short = ip::serialize(&sample_v4());
    short[0] = 0x44;
    assert_eq!(
        HeaderView::new(&short).try_validate(),
        Err(ParseError::IllegalValue)
    );

    let min = sample_v4().to_vec().unwrap();
    assert_eq!(min.len(), 20);
    assert!(HeaderView::new(&min).is_valid());

    let max = ip::Header {
        header_length: 60,
        total_length: 60,
        ..sample_v4()
    }
    .with_checksum();
    let bytes = max.to_vec().unwrap();
    assert_eq!(bytes.len(), 60);
    assert_eq!(bytes[0], 0x4f);
    let view = HeaderView::new(&bytes);
    assert!(view.is_valid());
    assert_eq!(view.options(), Some(&[0u8; 40][..]));
    assert_eq!(view.parse(), Some(max));

    // Truncated options.
    assert_eq!(
        HeaderView::new(&bytes[..56]).try_validate(),
        Err(ParseError::TooSmall)
    );

    for bad in [19, 61, 22, 0] {
        let hdr = ip::Header { header_length: bad, ..sample_v4() };
        assert_eq!(hdr.to_vec(), Err(ParseError::IllegalValue));
    }
}

#[test]
fn emit_refuses_inconsistent_headers() {
    let too_short = ip::Header { total_length: 19, ..sample_v4() };
    assert_eq!(too_short.validate(), Err(ParseError::IllegalValue));

    let wide_flags = ip::Header { flags: 8, ..sample_v4() };
    assert_eq!(wide_flags.to_vec(), Err(ParseError::IllegalValue));

    let hdr = sample_v4();
    let mut buf = [0u8; 24];
    assert_eq!(hdr.emit(&mut buf[..]), Err(ParseError::TooSmall));
    let rest = hdr.emit_prefix(&mut buf[..]).unwrap();
    assert_eq!(rest.len(), 4);
    assert_eq!(&buf[..20], &ip::serialize(&hdr));
}

#[test]
fn bad_version_is_rejected() {
    let mut bytes = KNOWN_V4;
    bytes[0] = 0x65;
    assert_eq!(
        HeaderView::new(&bytes).try_validate(),
        Err(ParseError::BadVersion)
    );
    assert_eq!(HeaderView::new(&[]).try_validate(), Err(ParseError::TooSmall));
}

#[test]
fn accessors_stop_at_buffer_end() {
    let view = HeaderView::new(&KNOWN_V4[..3]);
    assert_eq!(view.header_length(), Some(20));
    assert_eq!(view.type_of_service(), Some(0));
    assert_eq!(view.total_length(), None);
    assert_eq!(view.source(), None);
    assert_eq!(view.options(), None);
    assert_eq!(view.compute_checksum(), None);
    assert!(!view.verify_checksum());

    let view = HeaderView::new(&KNOWN_V4);
    assert_eq!(view.identification(), Some(0));
    assert_eq!(view.flags(), Some(0b010));
    assert_eq!(view.time_to_live(), Some(64));
    assert_eq!(view.protocol(), Some(IpProtocol::UDP));
    assert_eq!(view.destination(), Some(Address::from_msbf(0xc0a8_00c7)));
    assert_eq!(view.options(), Some(&[][..]));
}

#[test]
fn packet_must_fit_declared_total_length() {
    let hdr = ip::Header { total_length: 30, ..sample_v4() }.with_checksum();
    let mut buf = hdr.to_vec().unwrap();
    buf.extend_from_slice(&[0xaa; 9]);

    let pkt = PacketView::new(&buf);
    assert_eq!(pkt.try_validate(), Err(ParseError::TooSmall));
    assert_eq!(pkt.payload(), None);
    assert_eq!(pkt.clone_owned(), None);

    buf.push(0xbb);
    let pkt = PacketView::new(&buf);
    assert!(pkt.is_valid());
    assert_eq!(pkt.total_size(), Some(30));
    assert_eq!(pkt.payload().map(<[u8]>::len), Some(10));

    // Trailing bytes are not part of the datagram.
    buf.extend_from_slice(&[0xcc; 5]);
    let pkt = PacketView::new(&buf);
    assert_eq!(pkt.as_bytes().map(<[u8]>::len), Some(30));
    let owned = pkt.clone_owned().unwrap();
    assert_eq!(&owned[..], &buf[..30]);
    assert_eq!(pkt.header_view().parse(), Some(hdr));
}

#[test]
fn packet_with_total_below_header_is_invalid() {
    let mut bytes = KNOWN_V4;
    bytes[2] = 0;
    bytes[3] = 19;
    let csum = HeaderView::new(&bytes).compute_checksum().unwrap();
    bytes[10..12].copy_from_slice(&csum.to_be_bytes());

    assert!(HeaderView::new(&bytes).is_valid());
    assert_eq!(
        PacketView::new(&bytes).try_validate(),
        Err(ParseError::IllegalValue)
    );
}

#[test]
fn udp_checksum_over_pseudo_header() {
    let src = Address::from_octets([192, 168, 0, 1]);
    let dst = Address::from_octets([192, 168, 0, 199]);
    let body = [1u8, 2, 3];

    let hdr =
        udp::build_header(src, dst, IpProtocol::UDP, 1234, 5678, &body)
            .unwrap();
    assert_eq!(hdr.length, 11);
    assert_eq!(hdr.checksum, 0x5ebd);

    let mut dgram = hdr.to_vec().unwrap();
    dgram.extend_from_slice(&body);
    assert_eq!(udp::parse_header(&dgram), Some(hdr));
    assert_eq!(udp::payload(&dgram), Some(&body[..]));
    assert!(udp::verify_checksum(src, dst, &dgram));
    assert!(!udp::verify_checksum(dst, dst, &dgram));

    dgram[10] ^= 0x40;
    assert!(!udp::verify_checksum(src, dst, &dgram));

    // No checksum computed by the sender.
    dgram[6..8].copy_from_slice(&[0, 0]);
    assert!(udp::verify_checksum(src, dst, &dgram));
}

#[test]
fn udp_length_bounds() {
    assert_eq!(
        udp::try_parse_header(&[0, 1, 0, 2, 0, 7, 0, 0]),
        Err(ParseError::IllegalValue)
    );
    assert_eq!(
        udp::try_parse_header(&[0, 1, 0, 2, 0, 8, 0]),
        Err(ParseError::TooSmall)
    );

    // Declared payload missing from the buffer.
    assert_eq!(udp::payload(&[0, 1, 0, 2, 0, 10, 0, 0, 0xff]), None);
    assert_eq!(udp::payload(&[0, 1, 0, 2, 0, 8, 0, 0, 0xff]), Some(&[][..]));

    let any = Address::UNSPECIFIED;
    let largest = vec![0u8; 0xffff - udp::HEADER_LENGTH];
    let hdr = udp::build_header(any, any, IpProtocol::UDP, 1, 2, &largest)
        .unwrap();
    assert_eq!(hdr.length, 0xffff);
    assert_eq!(hdr.payload_length(), largest.len());

    let too_big = vec![0u8; 0x1_0000 - udp::HEADER_LENGTH];
    assert_eq!(
        udp::build_header(any, any, IpProtocol::UDP, 1, 2, &too_big),
        None
    );
}

#[test]
fn udp_zero_checksum_is_sent_as_ones() {
    let any = Address::UNSPECIFIED;
    // Pseudo-header and header sum to 0x0011 + 0x000a + 0x000a, so a
    // payload word of 0xffff - 0x0025 makes the complemented sum zero.
    let hdr =
        udp::build_header(any, any, IpProtocol::UDP, 0, 0, &[0xff, 0xda])
            .unwrap();
    assert_eq!(hdr.length, 10);
    assert_eq!(hdr.checksum, 0xffff);

    let mut dgram = hdr.to_vec().unwrap();
    dgram.extend_from_slice(&[0xff, 0xda]);
    assert!(udp::verify_checksum(any, any, &dgram));
}

fn sample_dhcp() -> dhcp::Header {
    let mut hdr = dhcp::Header {
        op: OpCode::Request,
        hops: 1,
        xid: 0x3903_f326,
        secs: 7,
        flags: dhcp::DhcpFlags::BROADCAST.bits(),
        giaddr: Address::from_octets([10, 0, 0, 254]),
        chaddr: HardwareAddr::from_mac(MacAddr6::new(
            0x00, 0x0b, 0x82, 0x01, 0xfc, 0x42,
        )),
        ..Default::default()
    };
    hdr.set_server_name("boot.example").unwrap();
    hdr.set_boot_file_name("pxelinux.0").unwrap();

    hdr
}

#[test]
fn dhcp_header_layout() {
    let hdr = sample_dhcp();
    let bytes = dhcp::serialize(&hdr);

    assert_eq!(&bytes[..4], &[1, 1, 6, 1]);
    assert_eq!(&bytes[4..8], &[0x39, 0x03, 0xf3, 0x26]);
    assert_eq!(&bytes[8..12], &[0, 7, 0x80, 0]);
    assert_eq!(&bytes[24..28], &[10, 0, 0, 254]);
    assert_eq!(&bytes[28..34], &[0x00, 0x0b, 0x82, 0x01, 0xfc, 0x42]);
    assert_eq!(&bytes[44..57], b"boot.example\0");
    assert_eq!(&bytes[108..119], b"pxelinux.0\0");

    assert_eq!(dhcp::parse_header(&bytes), Some(hdr));
    assert_eq!(hdr.to_vec().unwrap(), bytes.to_vec());
    assert_eq!(hdr.packet_length(), dhcp::HEADER_LENGTH);

    let parsed = dhcp::parse_header(&bytes).unwrap();
    assert!(parsed.is_broadcast());
    assert_eq!(
        parsed.client_mac(),
        Some(MacAddr6::new(0x00, 0x0b, 0x82, 0x01, 0xfc, 0x42))
    );
    assert_eq!(parsed.server_name(), Ok("boot.example"));
    assert_eq!(parsed.boot_file_name(), Ok("pxelinux.0"));
}

#[test]
fn dhcp_header_rejections() {
    let mut bytes = dhcp::serialize(&sample_dhcp());
    assert_eq!(
        dhcp::try_parse_header(&bytes[..235]),
        Err(ParseError::TooSmall)
    );

    bytes[0] = 3;
    assert_eq!(dhcp::try_parse_header(&bytes), Err(ParseError::IllegalValue));

    let mut hdr = sample_dhcp();
    hdr.htype = 6;
    assert_eq!(hdr.client_mac(), None);

    hdr.sname = [b'a'; 64];
    assert_eq!(hdr.server_name(), Err(ParseError::Unterminated));
    hdr.file[0] = 0xff;
    assert_eq!(hdr.boot_file_name(), Err(ParseError::IllegalValue));

    assert_eq!(
        hdr.set_server_name(&"x".repeat(64)),
        Err(ParseError::TooLarge)
    );
    assert_eq!(hdr.set_server_name("a\0b"), Err(ParseError::IllegalValue));
    hdr.set_server_name(&"x".repeat(63)).unwrap();
    assert_eq!(hdr.server_name().map(str::len), Ok(63));
}

#[test]
fn dhcp_option_walk() {
    assert!(dhcp::validate_options(&[]));
    assert!(dhcp::validate_options(&[0xff]));
    assert!(dhcp::validate_options(&[0, 0, 53, 1, 5, 0xff]));
    assert!(dhcp::validate_options(&[53, 1, 5, 0xff, 0, 3, 0]));
    assert!(!dhcp::validate_options(&[0x01, 0x02, 0xaa]));
    // Code byte with no length byte.
    assert!(!dhcp::validate_options(&[53, 1, 5, 12]));
    // Problems past END still count.
    assert!(!dhcp::validate_options(&[0xff, 12, 4, 0]));
}

#[test]
fn dhcp_options_follow_cookie() {
    let mut msg = MessageBuilder::new(sample_dhcp());
    msg.push_option(53, &[1])
        .unwrap()
        .push_option(55, &[1, 3, 6, 15])
        .unwrap();
    let bytes = msg.build();
    assert_eq!(bytes.len(), dhcp::HEADER_LENGTH + 4 + 3 + 6 + 1);
    assert_eq!(&bytes[236..240], &dhcp::MAGIC_COOKIE);
    assert_eq!(bytes.last(), Some(&dhcp::END));

    let view = dhcp::PacketView::new(&bytes);
    assert_eq!(view.header(), Some(sample_dhcp()));
    assert_eq!(view.options(), Some(&bytes[240..]));

    let opts: Vec<_> = view.options_iter().unwrap().collect();
    assert_eq!(
        opts,
        [
            DhcpOption { code: 53, value: &[1] },
            DhcpOption { code: 55, value: &[1, 3, 6, 15] },
        ]
    );

    // Header only.
    assert_eq!(
        dhcp::PacketView::new(&bytes[..236]).try_options(),
        Err(ParseError::TooSmall)
    );
    // Cookie only: empty options area.
    assert_eq!(dhcp::PacketView::new(&bytes[..240]).options(), Some(&[][..]));

    let mut bad = bytes.clone();
    bad[239] = 0x64;
    assert_eq!(
        dhcp::PacketView::new(&bad).try_options(),
        Err(ParseError::BadCookie)
    );

    // Truncate inside the second option's value.
    let cut = &bytes[..bytes.len() - 3];
    assert_eq!(
        dhcp::PacketView::new(cut).try_options(),
        Err(ParseError::MalformedOption)
    );
    assert!(dhcp::PacketView::new(cut).options_iter().is_none());
}

#[test]
fn dhcp_builder_refuses_bad_records() {
    let mut msg = MessageBuilder::new(dhcp::Header::default());
    assert_eq!(
        msg.push_option(dhcp::PAD, &[]).err(),
        Some(ParseError::IllegalValue)
    );
    assert_eq!(
        msg.push_option(dhcp::END, &[]).err(),
        Some(ParseError::IllegalValue)
    );
    assert_eq!(
        msg.push_option(12, &[b'a'; 256]).err(),
        Some(ParseError::TooLarge)
    );

    let bytes = msg.build();
    assert_eq!(bytes.len(), 241);
    assert_eq!(dhcp::PacketView::new(&bytes).options(), Some(&[0xff][..]));
}
