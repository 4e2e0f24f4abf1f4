// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Linux raw sockets polled through epoll.

use super::{ChunkReader, ReadStatus};
use crate::{Fault, OpenError, SocketKind};
use bytes::BytesMut;
use std::{
    io,
    os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd},
    ptr,
};
use tracing::info;

/// A non-blocking raw socket, registered with its own epoll instance.
///
/// Every read first asks epoll whether the socket is readable, then peeks at
/// the size of the pending datagram and reads exactly that datagram.
#[derive(Debug)]
pub struct RawSocket {
    socket: OwnedFd,
    epoll: OwnedFd,
    kind: SocketKind,
}

fn last_errno() -> i32 {
    io::Error::last_os_error().raw_os_error().unwrap_or(0)
}

fn check(ret: libc::c_int, op: &'static str) -> Result<libc::c_int, OpenError> {
    if ret < 0 {
        return Err(OpenError::Io { op, source: io::Error::last_os_error() });
    }

    Ok(ret)
}

impl RawSocket {
    /// Opens the socket described by `kind`. Requires `CAP_NET_RAW`.
    pub fn open(kind: SocketKind) -> Result<Self, OpenError> {
        let epoll = check(
            unsafe { libc::epoll_create1(libc::EPOLL_CLOEXEC) },
            "epoll_create1",
        )?;
        // SAFETY: `epoll` is a fresh descriptor owned by nobody else.
        let epoll = unsafe { OwnedFd::from_raw_fd(epoll) };

        let (domain, protocol) = match kind {
            SocketKind::Ip => (libc::AF_INET, libc::IPPROTO_UDP),
            SocketKind::Packet => (
                libc::AF_PACKET,
                libc::c_int::from((libc::ETH_P_ALL as u16).to_be()),
            ),
        };
        let socket = check(
            unsafe {
                libc::socket(
                    domain,
                    libc::SOCK_RAW | libc::SOCK_NONBLOCK | libc::SOCK_CLOEXEC,
                    protocol,
                )
            },
            "socket",
        )?;
        // SAFETY: as above.
        let socket = unsafe { OwnedFd::from_raw_fd(socket) };

        let mut event = libc::epoll_event {
            events: libc::EPOLLIN as u32,
            u64: socket.as_raw_fd() as u64,
        };
        check(
            unsafe {
                libc::epoll_ctl(
                    epoll.as_raw_fd(),
                    libc::EPOLL_CTL_ADD,
                    socket.as_raw_fd(),
                    &mut event,
                )
            },
            "epoll_ctl",
        )?;

        info!(?kind, fd = socket.as_raw_fd(), "opened raw socket");

        Ok(Self { socket, epoll, kind })
    }

    #[inline]
    pub fn kind(&self) -> SocketKind {
        self.kind
    }

    fn readable(&self) -> Result<bool, Fault> {
        let mut event = libc::epoll_event { events: 0, u64: 0 };
        let ready =
            unsafe { libc::epoll_wait(self.epoll.as_raw_fd(), &mut event, 1, 0) };
        if ready < 0 {
            return match last_errno() {
                libc::EINTR => Ok(false),
                errno => Err(Fault::Os { op: "epoll_wait", errno }),
            };
        }

        if ready == 0 {
            return Ok(false);
        }

        let token = { event.u64 };
        let expected: RawFd = self.socket.as_raw_fd();
        if token != expected as u64 {
            return Err(Fault::UnexpectedDescriptor { expected, found: token });
        }

        Ok(true)
    }

    /// Runs a `recv`-style call, mapping `EAGAIN` to `None`.
    fn recv(
        &self,
        buf: *mut libc::c_void,
        len: usize,
        flags: libc::c_int,
    ) -> Result<Option<usize>, Fault> {
        let ret = unsafe { libc::recv(self.socket.as_raw_fd(), buf, len, flags) };
        if ret < 0 {
            return match last_errno() {
                libc::EAGAIN | libc::EINTR => Ok(None),
                errno => Err(Fault::Os { op: "recv", errno }),
            };
        }

        Ok(Some(ret as usize))
    }
}

impl ChunkReader for RawSocket {
    fn try_read_chunk(&mut self) -> Result<ReadStatus, Fault> {
        if !self.readable()? {
            return Ok(ReadStatus::WouldBlock);
        }

        let Some(promised) = self.recv(
            ptr::null_mut(),
            0,
            libc::MSG_PEEK | libc::MSG_TRUNC,
        )?
        else {
            return Ok(ReadStatus::WouldBlock);
        };

        let mut buf = BytesMut::zeroed(promised);
        // MSG_TRUNC makes the kernel report the datagram's full length even
        // if it grew past the buffer since the peek.
        let Some(read) =
            self.recv(buf.as_mut_ptr().cast(), buf.len(), libc::MSG_TRUNC)?
        else {
            return Ok(ReadStatus::WouldBlock);
        };

        if read > promised {
            return Err(Fault::ReadOverrun { promised, read });
        }

        buf.truncate(read);
        Ok(ReadStatus::Chunk(buf.freeze()))
    }
}
