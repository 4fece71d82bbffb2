use std::io::{ErrorKind, Write};

use bytes::BytesMut;
#[cfg(unix)]
use hdrstrip_transport::PipeWriter;
use tracing::trace;

use crate::codec::{encode_frame, FrameConfig, HEADER_SIZE};
use crate::error::{FrameError, Result};
use crate::kind::FrameKind;

/// Writes complete frames to any `Write` stream.
pub struct FrameWriter<T> {
    inner: T,
    buf: BytesMut,
    config: FrameConfig,
}

impl<T: Write> FrameWriter<T> {
    /// Create a new frame writer with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame writer with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(HEADER_SIZE + config.max_payload_size),
            config,
        }
    }

    /// Frame and send one line.
    pub fn send_line(&mut self, line: &[u8]) -> Result<()> {
        self.send(FrameKind::Line, line)
    }

    /// Send the end-of-stream marker.
    pub fn send_end_of_stream(&mut self) -> Result<()> {
        self.send(FrameKind::EndOfStream, &[])
    }

    fn send(&mut self, kind: FrameKind, payload: &[u8]) -> Result<()> {
        if payload.len() > self.config.max_payload_size {
            return Err(FrameError::PayloadTooLarge {
                size: payload.len(),
                max: self.config.max_payload_size,
            });
        }

        self.buf.clear();
        encode_frame(kind, payload, &mut self.buf)?;

        let mut offset = 0usize;
        while offset < self.buf.len() {
            match self.inner.write(&self.buf[offset..]) {
                Ok(0) => return Err(FrameError::ConnectionClosed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
        trace!(kind = kind.name(), len = payload.len(), "frame sent");

        self.flush()
    }

    /// Flush the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Consume the writer and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }
}

#[cfg(unix)]
impl FrameWriter<PipeWriter> {
    /// Create a frame writer for a pipe whose buffer holds one full frame.
    ///
    /// A frame of `max_payload_size` bytes must fit in the pipe so that a
    /// single send never waits on a reader that has not been scheduled yet.
    pub fn with_config_pipe(inner: PipeWriter, config: FrameConfig) -> Result<Self> {
        inner.ensure_capacity(HEADER_SIZE + config.max_payload_size)?;
        Ok(Self::with_config(inner, config))
    }
}
