//! Synthetic animated source for running without a camera

use tracing::{debug, info};

use crate::source::{FrameEncoder, FrameSource, RawFrame};
use crate::{Result, StreamError};

const BLOCK_SIZE: u32 = 16;

/// Grayscale gradient that scrolls each frame, with a block orbiting the centre.
#[derive(Debug)]
pub struct TestPatternSource {
    width: u32,
    height: u32,
    frame_limit: Option<u64>,
    produced: u64,
}

impl TestPatternSource {
    /// Open a pattern source of the given size.
    pub fn open(width: u32, height: u32) -> Result<Self> {
        if width < BLOCK_SIZE || height < BLOCK_SIZE {
            return Err(StreamError::source_unavailable(format!(
                "test pattern needs at least {}x{} pixels, got {}x{}",
                BLOCK_SIZE, BLOCK_SIZE, width, height
            )));
        }

        info!("Opened test pattern source {}x{}", width, height);
        Ok(Self { width, height, frame_limit: None, produced: 0 })
    }

    /// End the source after `limit` frames.
    pub fn with_frame_limit(mut self, limit: u64) -> Self {
        self.frame_limit = Some(limit);
        self
    }

    pub fn frames_produced(&self) -> u64 {
        self.produced
    }

    fn render(&self, n: u64) -> Vec<u8> {
        let (w, h) = (self.width as usize, self.height as usize);
        let shift = (n * 5 % 256) as usize;
        let mut data: Vec<u8> = (0..w * h).map(|i| ((i % w + shift) % 256) as u8).collect();

        let phase = n as f64 * 0.1;
        let radius_x = (self.width - BLOCK_SIZE) as f64 / 2.0;
        let radius_y = (self.height - BLOCK_SIZE) as f64 / 2.0;
        let left = (radius_x + radius_x * phase.sin()) as usize;
        let top = (radius_y + radius_y * phase.cos()) as usize;

        for row in top..(top + BLOCK_SIZE as usize).min(h) {
            let start = row * w + left;
            let end = (start + BLOCK_SIZE as usize).min(row * w + w);
            data[start..end].fill(0xFF);
        }
        data
    }
}

#[async_trait::async_trait]
impl FrameSource for TestPatternSource {
    async fn next_frame(&mut self) -> Result<Option<RawFrame>> {
        if self.frame_limit.is_some_and(|limit| self.produced >= limit) {
            debug!("Test pattern reached frame limit {}", self.produced);
            return Ok(None);
        }

        let data = self.render(self.produced);
        self.produced += 1;
        Ok(Some(RawFrame::new(self.width, self.height, 1, data)))
    }

    fn describe(&self) -> String {
        format!("test pattern {}x{}", self.width, self.height)
    }
}

/// Encoder that ships the raw pixel bytes unchanged.
///
/// Rejects frames whose buffer does not match their declared geometry.
#[derive(Debug, Default, Clone, Copy)]
pub struct PassthroughEncoder;

impl FrameEncoder for PassthroughEncoder {
    fn encode(&mut self, frame: &RawFrame) -> Result<Vec<u8>> {
        let Some(expected) = frame.expected_len() else {
            return Err(StreamError::encode_failed(format!(
                "{}x{}x{} frame size overflows",
                frame.width, frame.height, frame.channels
            )));
        };
        if frame.data.len() != expected {
            return Err(StreamError::encode_failed(format!(
                "{}x{}x{} frame has {} bytes, expected {}",
                frame.width,
                frame.height,
                frame.channels,
                frame.data.len(),
                expected
            )));
        }
        Ok(frame.data.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn frames_match_geometry_and_animate() {
        let mut source = TestPatternSource::open(64, 48).unwrap();

        let first = source.next_frame().await.unwrap().unwrap();
        let second = source.next_frame().await.unwrap().unwrap();

        assert_eq!(first.data.len(), 64 * 48);
        assert_eq!(first.expected_len(), Some(first.data.len()));
        assert_ne!(first.data, second.data);
        assert!(first.data.contains(&0xFF));
    }

    #[tokio::test]
    async fn frame_limit_ends_source() {
        let mut source = TestPatternSource::open(32, 32).unwrap().with_frame_limit(2);

        assert!(source.next_frame().await.unwrap().is_some());
        assert!(source.next_frame().await.unwrap().is_some());
        assert!(source.next_frame().await.unwrap().is_none());
        assert_eq!(source.frames_produced(), 2);
    }

    #[test]
    fn tiny_geometry_is_unavailable() {
        let result = TestPatternSource::open(8, 8);
        assert!(matches!(result, Err(StreamError::SourceUnavailable { .. })));
    }

    #[test]
    fn passthrough_validates_geometry() {
        let mut encoder = PassthroughEncoder;
        let good = RawFrame::new(4, 2, 1, vec![1; 8]);
        assert_eq!(encoder.encode(&good).unwrap(), vec![1; 8]);

        let bad = RawFrame::new(4, 2, 3, vec![1; 8]);
        assert!(matches!(encoder.encode(&bad), Err(StreamError::Encode { .. })));
    }

    #[test]
    fn passthrough_rejects_overflowing_geometry() {
        let huge = RawFrame::new(u32::MAX, u32::MAX, 255, Vec::new());
        assert_eq!(huge.expected_len(), None);

        let mut encoder = PassthroughEncoder;
        assert!(matches!(encoder.encode(&huge), Err(StreamError::Encode { .. })));
    }
}
