// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Capture through libpcap.

use super::FrameDispatcher;
use crate::{Fault, OpenError};
use pcap::{Active, Capture};
use tracing::{debug, info};

/// A live libpcap capture in immediate, non-blocking mode.
///
/// Each captured frame still carries its link-layer header; the packet
/// source skips it while searching the frame for a datagram.
pub struct PcapCapture {
    capture: Capture<Active>,
}

impl PcapCapture {
    /// Opens `device` for capture, keeping at most `snaplen` bytes of each
    /// frame.
    pub fn open(device: &str, snaplen: i32) -> Result<Self, OpenError> {
        let capture = Capture::from_device(device)?
            .immediate_mode(true)
            .snaplen(snaplen)
            .open()?
            .setnonblock()?;

        info!(device, snaplen, "opened capture");

        Ok(Self { capture })
    }

    /// Restricts the capture with a BPF filter expression.
    pub fn set_filter(&mut self, program: &str) -> Result<(), OpenError> {
        self.capture.filter(program, true)?;
        debug!(program, "applied capture filter");

        Ok(())
    }
}

impl FrameDispatcher for PcapCapture {
    fn dispatch(
        &mut self,
        budget: usize,
        on_frame: &mut dyn FnMut(&[u8]),
    ) -> Result<usize, Fault> {
        let mut delivered = 0;
        while delivered < budget {
            match self.capture.next_packet() {
                Ok(packet) => on_frame(packet.data),
                Err(pcap::Error::TimeoutExpired) => break,
                Err(e) => return Err(Fault::Capture(e.to_string())),
            }
            delivered += 1;
        }

        Ok(delivered)
    }
}
