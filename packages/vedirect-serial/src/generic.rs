//! A [`Connection`] over any async byte stream.

use std::time::Duration;

use log::trace;
use thiserror::Error;
use tokio::{
    io::{AsyncRead, AsyncReadExt},
    select,
    time::sleep,
};
use vedirect::{Decoder, DecoderConfig, DecoderStats};

use crate::{trim_frames, Connection, FromFrame, ReceivedFrame};

/// Size of a single read from the underlying stream.
const READ_CHUNK_SIZE: usize = 256;

/// Decodes VE.Direct frames from an [`AsyncRead`].
///
/// Works with serial ports, TCP bridges, or an in-memory pipe in tests.
#[derive(Debug)]
pub struct StreamConnection<R> {
    reader: R,
    decoder: Decoder,
    incoming_frames: Vec<ReceivedFrame>,
}

impl<R: AsyncRead + Unpin> StreamConnection<R> {
    pub fn new(reader: R) -> Self {
        Self::with_config(reader, DecoderConfig::default())
    }

    pub fn with_config(reader: R, config: DecoderConfig) -> Self {
        Self {
            reader,
            decoder: Decoder::with_config(config),
            incoming_frames: Vec::new(),
        }
    }

    pub fn decoder(&self) -> &Decoder {
        &self.decoder
    }

    pub fn get_ref(&self) -> &R {
        &self.reader
    }

    pub fn into_inner(self) -> R {
        self.reader
    }

    /// Reads one chunk and queues every frame it completes.
    async fn receive_chunk(&mut self) -> Result<(), StreamError> {
        let mut buf = [0u8; READ_CHUNK_SIZE];
        let read = self.reader.read(&mut buf).await?;
        if read == 0 {
            return Err(StreamError::Closed);
        }

        trace!("Received {} bytes: {:x?}", read, &buf[..read]);

        for frame in self.decoder.frames(buf[..read].iter().copied()) {
            self.incoming_frames.push(ReceivedFrame::new(frame));
        }

        Ok(())
    }

    async fn next_frame<F: FromFrame>(&mut self) -> Result<F, StreamError> {
        loop {
            for frame in self.incoming_frames.iter_mut() {
                if let Some(value) = frame.take::<F>() {
                    trim_frames(&mut self.incoming_frames);
                    return Ok(value);
                }
            }

            trim_frames(&mut self.incoming_frames);
            self.receive_chunk().await?;
        }
    }
}

impl<R: AsyncRead + Unpin> Connection for StreamConnection<R> {
    type Error = StreamError;

    async fn recv<F: FromFrame>(&mut self, timeout: Duration) -> Result<F, StreamError> {
        // Return an error if no matching frame arrives within the timeout
        select! {
            result = self.next_frame() => result,
            _ = sleep(timeout) => Err(StreamError::Timeout),
        }
    }

    fn stats(&self) -> &DecoderStats {
        self.decoder.stats()
    }
}

#[derive(Error, Debug)]
pub enum StreamError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Timed out waiting for a frame")]
    Timeout,

    #[error("The stream was closed")]
    Closed,
}
