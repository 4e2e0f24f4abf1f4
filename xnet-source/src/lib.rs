// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! A non-blocking packet source: raw bytes in, validated IPv4 datagrams
//! out.
//!
//! [`PacketSource`] owns a [`Backend`] (a raw socket, a libpcap capture,
//! or an in-memory feed), accumulates whatever bytes it delivers, and
//! splits them into a queue of owned datagrams. Partial reads, noise before
//! the first datagram, and malformed data are all tolerated; backend
//! failures are not, and poison the source for good.
//!
//! ```
//! use xnet_source::{backend, PacketSource, SourceConfig};
//!
//! let (feed, reader) = backend::channel();
//! let mut source = PacketSource::from_reader(reader, SourceConfig::default())?;
//!
//! feed.push(vec![0xde, 0xad]);
//! source.process()?;
//! assert!(source.is_empty());
//! assert_eq!(source.buffered(), 2);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod backend;
mod config;
mod error;
pub mod framing;
mod source;

pub use backend::Backend;
pub use config::*;
pub use error::*;
pub use source::*;
