//! Transmission of one encoded frame.
//!
//! A frame goes out as one Complete packet or as an ordered run of fragments.
//! Sending stops at the first fragment that fails: the remaining fragments
//! are never sent and no signal tells the receiver the frame was cut short,
//! so that frame cannot be reassembled. There is no mid-frame recovery.

use std::sync::Arc;
use tracing::{debug, trace};

use crate::clock::{Clock, MonotonicClock};
use crate::pacer::FragmentPacer;
use crate::packetizer::{FramePlan, Packetizer};
use crate::transport::{DatagramTransport, send_packet};
use crate::{Result, StreamError};

/// Outcome of a fully transmitted frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameReport {
    pub frame_id: u32,
    pub plan: FramePlan,
    pub packets_sent: u16,
    pub bytes_sent: usize,
}

/// Sends frames through a [`DatagramTransport`].
pub struct FrameSender<T> {
    transport: T,
    packetizer: Packetizer,
    fragment_pacer: FragmentPacer,
    clock: Arc<dyn Clock>,
    scratch: Vec<u8>,
}

impl<T: DatagramTransport> FrameSender<T> {
    pub fn new(transport: T, packetizer: Packetizer, fragment_pacer: FragmentPacer) -> Self {
        Self::with_clock(transport, packetizer, fragment_pacer, Arc::new(MonotonicClock::new()))
    }

    /// Create a sender with an explicit timestamp source.
    pub fn with_clock(
        transport: T,
        packetizer: Packetizer,
        fragment_pacer: FragmentPacer,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let scratch = Vec::with_capacity(packetizer.max_datagram_size());
        Self { transport, packetizer, fragment_pacer, clock, scratch }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn packetizer(&self) -> &Packetizer {
        &self.packetizer
    }

    /// Send `payload` as frame `frame_id`.
    ///
    /// On failure the error is [`StreamError::FrameAbandoned`] naming the
    /// fragment that failed, or [`StreamError::PayloadTooLarge`] if nothing
    /// was sent.
    pub async fn send_frame(&mut self, payload: &[u8], frame_id: u32) -> Result<FrameReport> {
        let fragments = self.packetizer.packetize(payload, frame_id, self.clock.as_ref())?;
        let plan = fragments.plan();
        let total = fragments.total_fragments();

        debug!("Frame {}: {} bytes as {:?}", frame_id, payload.len(), plan);

        let mut bytes_sent = 0;
        for fragment in fragments {
            let index = fragment.header.fragment_index;
            fragment.write_datagram(&mut self.scratch);

            if let Err(e) = send_packet(&self.transport, &self.scratch).await {
                return Err(StreamError::FrameAbandoned {
                    frame_id,
                    fragment_index: index,
                    total_fragments: total,
                    source: Box::new(e),
                });
            }

            bytes_sent += self.scratch.len();
            trace!(
                "Frame {} fragment {}/{} sent ({} bytes)",
                frame_id,
                index + 1,
                total,
                self.scratch.len()
            );

            if index + 1 != total {
                self.fragment_pacer.pause().await;
            }
        }

        Ok(FrameReport { frame_id, plan, packets_sent: total, bytes_sent })
    }
}
