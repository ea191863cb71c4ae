// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Line-delimited JSON-RPC framing over a child's pipes.
//!
//! One UTF-8 JSON object per line, terminated by `\n`. The framing layer
//! serializes outbound frames and reads + classifies inbound lines; it does
//! not correlate ids (that is the session's job). Unparseable inbound lines
//! are logged and discarded without terminating the stream; EOF and write
//! failures propagate to the caller.

use serde::Serialize;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, BufWriter};
use tracing::warn;

use super::protocol::{InboundFrame, RpcNotification, RpcRequest};

/// Errors surfaced by the framing layer.
#[derive(Debug, thiserror::Error)]
pub enum FramingError {
    /// IO error during read/write (includes broken pipes).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to serialize an outbound frame.
    #[error("failed to serialize frame: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Writes outbound frames to a child's stdin.
pub struct FrameWriter<W> {
    inner: BufWriter<W>,
}

impl<W: AsyncWrite + Unpin> FrameWriter<W> {
    /// Wrap a writable stream.
    pub fn new(stream: W) -> Self {
        Self {
            inner: BufWriter::new(stream),
        }
    }

    /// Write a request frame followed by a newline and flush.
    pub async fn write_request(&mut self, request: &RpcRequest) -> Result<(), FramingError> {
        self.write_frame(request).await
    }

    /// Write a notification frame followed by a newline and flush.
    pub async fn write_notification(
        &mut self,
        notification: &RpcNotification,
    ) -> Result<(), FramingError> {
        self.write_frame(notification).await
    }

    async fn write_frame<T: Serialize>(&mut self, frame: &T) -> Result<(), FramingError> {
        let json = serde_json::to_string(frame)?;
        self.inner.write_all(json.as_bytes()).await?;
        self.inner.write_all(b"\n").await?;
        self.inner.flush().await?;
        Ok(())
    }

    /// Flush and drop the underlying stream, signalling EOF to the child.
    pub async fn close(mut self) {
        let _ = self.inner.flush().await;
        let _ = self.inner.shutdown().await;
    }
}

/// Reads and classifies inbound frames from a child's stdout.
pub struct FrameReader<R> {
    inner: BufReader<R>,
    /// Label used in diagnostics for skipped lines.
    label: String,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    /// Wrap a readable stream. `label` identifies the child in diagnostics.
    pub fn new(stream: R, label: impl Into<String>) -> Self {
        Self {
            inner: BufReader::new(stream),
            label: label.into(),
        }
    }

    /// Read the next classifiable frame.
    ///
    /// Returns `Ok(None)` at EOF. Lines that are not valid JSON, or that are
    /// JSON but neither response nor notification, produce one diagnostic
    /// each and are skipped.
    pub async fn read_frame(&mut self) -> Result<Option<InboundFrame>, FramingError> {
        loop {
            let mut line = String::new();
            let bytes = self.inner.read_line(&mut line).await?;
            if bytes == 0 {
                return Ok(None);
            }

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            let value: serde_json::Value = match serde_json::from_str(trimmed) {
                Ok(value) => value,
                Err(err) => {
                    warn!(server = %self.label, error = %err, "discarding unparseable line");
                    continue;
                }
            };

            match InboundFrame::classify(value) {
                Some(frame) => return Ok(Some(frame)),
                None => {
                    warn!(server = %self.label, line = %trimmed, "discarding unclassifiable frame");
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "framing_tests.rs"]
mod tests;
