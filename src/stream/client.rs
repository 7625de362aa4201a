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

use super::frame::{FrameReader, StreamedItem};
use crate::error::StreamError;
use futures::Stream;
use serde::de::DeserializeOwned;
use std::marker::PhantomData;
use tokio::io::AsyncRead;

/// A response body whose header frame has been consumed.
pub struct StreamingBody<R, D = serde_json::Value> {
    header: String,
    frames: FrameReader<R>,
    _data: PhantomData<fn() -> D>,
}

/// Read the header frame and return a reader for the remaining items.
///
/// A body that ends before any frame is [`StreamError::MissingHeader`].
pub async fn read_streaming_body<R, D>(reader: R) -> Result<StreamingBody<R, D>, StreamError>
where
    R: AsyncRead + Unpin,
    D: DeserializeOwned,
{
    let mut frames = FrameReader::new(reader);
    let header = frames.read_frame().await?.ok_or(StreamError::MissingHeader)?;
    let header = String::from_utf8(header)?;
    tracing::debug!(header_len = header.len(), "streaming body opened");
    Ok(StreamingBody { header, frames, _data: PhantomData })
}

impl<R, D> StreamingBody<R, D>
where
    R: AsyncRead + Unpin,
    D: DeserializeOwned,
{
    pub fn header(&self) -> &str {
        &self.header
    }

    /// Next decoded item, or `None` once the body ends cleanly.
    pub async fn next_item(&mut self) -> Result<Option<StreamedItem<D>>, StreamError> {
        let Some(frame) = self.frames.read_frame().await? else {
            return Ok(None);
        };
        match serde_json::from_slice(&frame) {
            Ok(item) => Ok(Some(item)),
            Err(err) => {
                tracing::warn!(%err, "undecodable stream item");
                Err(err.into())
            }
        }
    }

    /// Adapt into a `Stream`. The stream ends after the first error.
    pub fn into_stream(self) -> impl Stream<Item = Result<StreamedItem<D>, StreamError>> {
        futures::stream::unfold(Some(self), |state| async move {
            let mut body = state?;
            match body.next_item().await {
                Ok(Some(item)) => Some((Ok(item), Some(body))),
                Ok(None) => None,
                Err(err) => Some((Err(err), None)),
            }
        })
    }
}
