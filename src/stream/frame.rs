// convo_kit — Sticky-scroll and streaming reveal engines for chat transcripts
// Copyright (C) 2025  Simon Peter Rothgang
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as
// published by the Free Software Foundation, either version 3 of the
// License, or (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Length-prefixed framing for a single streamed response body.
//!
//! Each frame is a 4-byte big-endian byte count followed by that many bytes
//! of UTF-8. The first frame is an opaque header string; every later frame is
//! a JSON [`StreamedItem`].

use crate::error::StreamError;
use crate::model::ChatMessage;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::bytes::{BufMut, BytesMut};

/// Largest frame accepted in either direction (16 MiB).
pub const MAX_FRAME_BYTES: usize = 16 * 1024 * 1024;

const LENGTH_PREFIX: usize = 4;

/// One item of a streamed response after the header frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StreamedItem<D = serde_json::Value> {
    Msg {
        key: String,
        msg: ChatMessage,
        /// Milliseconds since the Unix epoch.
        timestamp: i64,
        committed: bool,
        #[serde(rename = "messageData")]
        message_data: D,
    },
    Done,
    Error {
        error: String,
    },
}

/// Reads length-prefixed frames from an async reader.
pub struct FrameReader<R> {
    reader: R,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    /// Read the next frame body.
    ///
    /// Returns `Ok(None)` on a clean end of stream between frames and
    /// [`StreamError::Truncated`] when the stream ends inside a frame.
    pub async fn read_frame(&mut self) -> Result<Option<Vec<u8>>, StreamError> {
        let mut prefix = [0u8; LENGTH_PREFIX];
        let got = self.fill(&mut prefix).await?;
        if got == 0 {
            return Ok(None);
        }
        if got < LENGTH_PREFIX {
            return Err(StreamError::Truncated { expected: LENGTH_PREFIX, received: got });
        }

        let len = u32::from_be_bytes(prefix) as usize;
        if len > MAX_FRAME_BYTES {
            return Err(StreamError::FrameTooLarge { len, max: MAX_FRAME_BYTES });
        }

        let mut body = vec![0u8; len];
        let got = self.fill(&mut body).await?;
        if got < len {
            return Err(StreamError::Truncated { expected: len, received: got });
        }
        Ok(Some(body))
    }

    /// Read until `buf` is full or the stream ends; returns bytes read.
    async fn fill(&mut self, buf: &mut [u8]) -> Result<usize, StreamError> {
        let mut filled = 0;
        while filled < buf.len() {
            let n = self.reader.read(&mut buf[filled..]).await?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        Ok(filled)
    }
}

/// Writes length-prefixed frames to an async writer.
pub struct FrameWriter<W> {
    writer: W,
}

impl<W: AsyncWrite + Unpin> FrameWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    /// Write one frame and flush so the peer sees it immediately.
    pub async fn write_frame(&mut self, body: &[u8]) -> Result<(), StreamError> {
        if body.len() > MAX_FRAME_BYTES {
            return Err(StreamError::FrameTooLarge { len: body.len(), max: MAX_FRAME_BYTES });
        }
        let len = u32::try_from(body.len())
            .map_err(|_| StreamError::FrameTooLarge { len: body.len(), max: MAX_FRAME_BYTES })?;

        let mut frame = BytesMut::with_capacity(LENGTH_PREFIX + body.len());
        frame.put_u32(len);
        frame.put_slice(body);
        self.writer.write_all(&frame).await?;
        self.writer.flush().await?;
        Ok(())
    }

    pub async fn write_header(&mut self, header: &str) -> Result<(), StreamError> {
        self.write_frame(header.as_bytes()).await
    }

    pub async fn write_item<D: Serialize>(&mut self, item: &StreamedItem<D>) -> Result<(), StreamError> {
        let body = serde_json::to_vec(item)?;
        self.write_frame(&body).await
    }

    pub async fn shutdown(&mut self) -> Result<(), StreamError> {
        self.writer.shutdown().await?;
        Ok(())
    }
}
