// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Locating and slicing IPv4 datagrams in an unstructured byte stream.
//!
//! Nothing in the stream marks where a datagram begins, so the scan relies
//! on the header itself: a position is a datagram start when the bytes there
//! form a checksum-valid IPv4 header whose total length covers at least the
//! header. Datagrams are then split off one after another using their
//! declared total length.

use bytes::{Buf, Bytes, BytesMut};
use std::collections::VecDeque;
use xnet::ip::{HeaderView, PacketView, VERSION};

/// Outcome of one [`extract`] pass.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Scan {
    /// Bytes skipped while looking for a datagram start.
    pub discarded: usize,
    /// Datagrams moved to the queue.
    pub framed: usize,
}

fn is_start(data: &[u8]) -> bool {
    let header = HeaderView::new(data);
    if !header.is_valid() {
        return false;
    }

    match (header.header_length(), header.total_length()) {
        (Some(hl), Some(total)) => usize::from(total) >= hl,
        _ => false,
    }
}

/// Offset of the first plausible datagram start in `data`.
///
/// Only positions whose high nibble reads 4 are probed. A start whose
/// payload has not fully arrived is still a start.
pub fn find_start(data: &[u8]) -> Option<usize> {
    (0..data.len())
        .find(|&off| data[off] >> 4 == VERSION && is_start(&data[off..]))
}

/// Moves every complete datagram at the front of `buf` into `out`, stopping
/// at the first position which does not hold one.
pub fn frame(buf: &mut BytesMut, out: &mut VecDeque<Bytes>) -> usize {
    let mut framed = 0;
    while let Some(packet) = PacketView::new(&buf[..]).clone_owned() {
        buf.advance(packet.len());
        out.push_back(packet);
        framed += 1;
    }

    framed
}

/// Alternates resynchronisation and framing until neither makes progress.
///
/// Bytes ahead of the first datagram start are dropped. When no start is
/// found the buffer is left as is: its tail may be the front of a header
/// still in flight.
pub fn extract(buf: &mut BytesMut, out: &mut VecDeque<Bytes>) -> Scan {
    let mut scan = Scan::default();
    loop {
        match find_start(&buf[..]) {
            Some(start) => {
                buf.advance(start);
                scan.discarded += start;
            }
            None => break,
        }

        let framed = frame(buf, out);
        if framed == 0 {
            break;
        }
        scan.framed += framed;
    }

    scan
}

#[cfg(test)]
mod test {
    use super::*;
    use xnet::ip::{self, Address, IpProtocol};

    fn datagram(payload: &[u8]) -> Vec<u8> {
        let header = ip::Header {
            total_length: (ip::MINIMUM_HEADER_LENGTH + payload.len()) as u16,
            protocol: IpProtocol::UDP,
            source: Address::from_octets([10, 0, 0, 1]),
            destination: Address::from_octets([10, 0, 0, 2]),
            ..Default::default()
        }
        .with_checksum();

        let mut out = ip::serialize(&header).to_vec();
        out.extend_from_slice(payload);
        out
    }

    #[test]
    fn start_needs_a_valid_header() {
        let pkt = datagram(&[1, 2, 3, 4]);
        assert_eq!(find_start(&pkt), Some(0));

        let mut noisy = vec![0x45, 0x00, 0x99];
        noisy.extend_from_slice(&pkt);
        assert_eq!(find_start(&noisy), Some(3));

        // Incomplete headers never qualify.
        assert_eq!(find_start(&pkt[..19]), None);
        assert_eq!(find_start(&[]), None);
    }

    #[test]
    fn start_may_await_its_payload() {
        let pkt = datagram(&[7; 30]);
        assert_eq!(find_start(&pkt[..25]), Some(0));

        let mut buf = BytesMut::from(&pkt[..25]);
        let mut out = VecDeque::new();
        assert_eq!(extract(&mut buf, &mut out), Scan::default());
        assert_eq!(buf.len(), 25);
    }

    #[test]
    fn total_length_below_header_is_not_a_start() {
        let mut pkt = datagram(&[]);
        pkt[3] = 16;
        let csum = HeaderView::new(&pkt).compute_checksum().unwrap();
        pkt[10..12].copy_from_slice(&csum.to_be_bytes());

        assert!(HeaderView::new(&pkt).is_valid());
        assert_eq!(find_start(&pkt), None);
    }

    #[test]
    fn noise_between_datagrams_is_skipped_in_one_pass() {
        let first = datagram(&[1; 8]);
        let second = datagram(&[2; 12]);

        let mut buf = BytesMut::new();
        buf.extend_from_slice(&[0xee; 5]);
        buf.extend_from_slice(&first);
        buf.extend_from_slice(&[0xee; 2]);
        buf.extend_from_slice(&second);
        buf.extend_from_slice(&[0xee; 3]);

        let mut out = VecDeque::new();
        let scan = extract(&mut buf, &mut out);
        assert_eq!(scan, Scan { discarded: 7, framed: 2 });
        assert_eq!(out, [Bytes::from(first), Bytes::from(second)]);
        assert_eq!(&buf[..], &[0xee; 3]);
    }

    #[test]
    fn frame_stops_at_first_gap() {
        let pkt = datagram(&[3; 4]);
        let mut buf = BytesMut::from(&pkt[..]);
        buf.extend_from_slice(&[0x00]);
        buf.extend_from_slice(&pkt);

        let mut out = VecDeque::new();
        assert_eq!(frame(&mut buf, &mut out), 1);
        assert_eq!(buf.len(), pkt.len() + 1);
    }
}
