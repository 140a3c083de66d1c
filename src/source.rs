//! Frame source and encoder seams
//!
//! Capture devices and image compression live outside this crate. The
//! streaming loop only needs something that yields raw frames and something
//! that turns a raw frame into encoded bytes.

use std::time::Instant;

use crate::Result;

/// One captured, not yet encoded image.
#[derive(Debug, Clone)]
pub struct RawFrame {
    pub width: u32,
    pub height: u32,
    /// Bytes per pixel in `data`
    pub channels: u8,
    pub data: Vec<u8>,
    pub captured_at: Instant,
}

impl RawFrame {
    pub fn new(width: u32, height: u32, channels: u8, data: Vec<u8>) -> Self {
        Self { width, height, channels, data, captured_at: Instant::now() }
    }

    /// Expected `data` length for the declared geometry, `None` if it
    /// does not fit in `usize`.
    pub fn expected_len(&self) -> Option<usize> {
        (self.width as usize)
            .checked_mul(self.height as usize)?
            .checked_mul(usize::from(self.channels))
    }
}

/// Trait for frame acquisition devices
///
/// Mirrors a blocking camera read: each call yields the next frame.
#[async_trait::async_trait]
pub trait FrameSource: Send + 'static {
    /// Get the next captured frame
    ///
    /// Returns:
    /// - `Ok(Some(frame))` - New frame captured
    /// - `Ok(None)` - Source ended (normal termination)
    /// - `Err(e)` - Acquisition failed; the streaming loop stops
    async fn next_frame(&mut self) -> Result<Option<RawFrame>>;

    /// Human-readable description for logs
    fn describe(&self) -> String {
        "frame source".to_string()
    }
}

/// Turns a raw frame into the bytes that go on the wire.
pub trait FrameEncoder: Send + 'static {
    /// Encode one frame. Errors drop the frame; the loop continues.
    fn encode(&mut self, frame: &RawFrame) -> Result<Vec<u8>>;
}
