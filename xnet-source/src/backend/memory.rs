// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! A scripted in-memory backend, for replays and tests.

use super::{ChunkReader, FrameDispatcher, ReadStatus};
use crate::Fault;
use bytes::Bytes;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};

/// Creates a connected feed and reader pair.
pub fn channel() -> (MemoryFeed, MemoryReader) {
    let (tx, rx) = mpsc::channel();
    (MemoryFeed { tx }, MemoryReader { rx })
}

/// Writing half: queues chunks (or frames) for the reader.
#[derive(Clone, Debug)]
pub struct MemoryFeed {
    tx: Sender<Result<Bytes, Fault>>,
}

impl MemoryFeed {
    /// Queues one chunk. Returns false once the reader is gone.
    pub fn push(&self, chunk: impl Into<Bytes>) -> bool {
        self.tx.send(Ok(chunk.into())).is_ok()
    }

    /// Makes the reader fail with `fault` once everything queued before
    /// it has been read.
    pub fn fail(&self, fault: Fault) -> bool {
        self.tx.send(Err(fault)).is_ok()
    }
}

/// Reading half. Reports `WouldBlock` whenever the queue is empty,
/// including after every feed has been dropped.
#[derive(Debug)]
pub struct MemoryReader {
    rx: Receiver<Result<Bytes, Fault>>,
}

impl MemoryReader {
    fn next(&self) -> Option<Result<Bytes, Fault>> {
        match self.rx.try_recv() {
            Ok(item) => Some(item),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }
}

impl ChunkReader for MemoryReader {
    fn try_read_chunk(&mut self) -> Result<ReadStatus, Fault> {
        match self.next() {
            Some(chunk) => chunk.map(ReadStatus::Chunk),
            None => Ok(ReadStatus::WouldBlock),
        }
    }
}

impl FrameDispatcher for MemoryReader {
    fn dispatch(
        &mut self,
        budget: usize,
        on_frame: &mut dyn FnMut(&[u8]),
    ) -> Result<usize, Fault> {
        let mut delivered = 0;
        while delivered < budget {
            let Some(frame) = self.next() else {
                break;
            };
            on_frame(&frame?);
            delivered += 1;
        }

        Ok(delivered)
    }
}
