//! Async transport for Victron VE.Direct devices.
//!
//! A [`Connection`] reads raw bytes from a device, runs them through a
//! [`protocol::Decoder`], and queues every completed frame until the caller
//! asks for one. Any [`tokio::io::AsyncRead`] can be wrapped in a
//! [`generic::StreamConnection`]; with the `serial` feature,
//! [`serial::find_devices`] locates VE.Direct USB interfaces and opens them at
//! the right line settings.

pub use vedirect as protocol;

use std::{
    future::Future,
    time::{Duration, Instant},
};

use log::trace;
use vedirect::{hex::Response, DecoderStats, Frame, HexFrame, Record, Snapshot};

pub mod generic;
#[cfg(feature = "serial")]
pub mod serial;

pub use generic::{StreamConnection, StreamError};

/// How long a received frame stays queued before it is considered stale.
///
/// Devices send a text block every second, so anything older than this has
/// been superseded.
pub const FRAME_LIFETIME: Duration = Duration::from_secs(2);

/// A kind of frame a [`Connection`] can be asked for.
pub trait FromFrame: Sized {
    /// Extracts `Self` from `frame`, or returns `None` if the frame is of
    /// another kind.
    fn from_frame(frame: &Frame) -> Option<Self>;
}

impl FromFrame for Frame {
    fn from_frame(frame: &Frame) -> Option<Self> {
        Some(frame.clone())
    }
}

impl FromFrame for Record {
    fn from_frame(frame: &Frame) -> Option<Self> {
        frame.as_record().cloned()
    }
}

impl FromFrame for HexFrame {
    fn from_frame(frame: &Frame) -> Option<Self> {
        frame.as_hex().cloned()
    }
}

impl FromFrame for Response {
    fn from_frame(frame: &Frame) -> Option<Self> {
        frame.as_hex()?.response().ok()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ReceivedFrame {
    pub frame: Frame,
    pub used: bool,
    pub timestamp: Instant,
}

impl ReceivedFrame {
    pub fn new(frame: Frame) -> Self {
        Self {
            frame,
            used: false,
            timestamp: Instant::now(),
        }
    }

    pub fn is_obsolete(&self, lifetime: Duration) -> bool {
        self.timestamp.elapsed() > lifetime || self.used
    }

    /// Converts the frame, marking it as used if it is of the requested kind.
    pub fn take<F: FromFrame>(&mut self) -> Option<F> {
        if self.used {
            return None;
        }
        let value = F::from_frame(&self.frame)?;
        self.used = true;
        Some(value)
    }
}

/// Removes stale and used frames from the incoming frame queue.
pub(crate) fn trim_frames(frames: &mut Vec<ReceivedFrame>) {
    let before = frames.len();
    frames.retain(|frame| !frame.is_obsolete(FRAME_LIFETIME));
    trace!("Trimmed frames. Length {} -> {}", before, frames.len());
}

/// An open connection to a VE.Direct device.
#[allow(async_fn_in_trait)]
pub trait Connection {
    type Error: std::error::Error;

    /// Waits for the oldest queued frame of kind `F`.
    ///
    /// Frames of other kinds stay queued until they are requested or go
    /// stale.
    fn recv<F: FromFrame>(
        &mut self,
        timeout: Duration,
    ) -> impl Future<Output = Result<F, Self::Error>>;

    /// Decoder counters for everything received so far.
    fn stats(&self) -> &DecoderStats;

    /// Waits for the next text block and applies it to `snapshot`.
    async fn refresh(
        &mut self,
        snapshot: &mut Snapshot,
        timeout: Duration,
    ) -> Result<(), Self::Error> {
        let record = self.recv::<Record>(timeout).await?;
        snapshot.update(&record);
        Ok(())
    }
}
