//! The capture → encode → send → pace loop
//!
//! ```text
//! Idle → Capturing → Encoding → Sending (1..n packets) → Pacing → Capturing …
//!                       │            │
//!                       │ fail       └ fail: abandon rest of frame, warn, pace
//!                       └ warn, skip straight back to Capturing
//! Capturing ─ acquisition error / source end / cancel ─→ Stopped
//! ```
//!
//! The frame counter advances exactly once per captured frame, whether the
//! frame was encoded and sent or dropped along the way, so receivers see a
//! gap in `frame_id` for every lost frame. Control flow is strictly
//! sequential: fragments of one frame leave in index order and frame ids
//! leave in increasing order.

use serde::Serialize;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::WatchStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::SenderConfig;
use crate::pacer::{FragmentPacer, FramePacer};
use crate::packetizer::Packetizer;
use crate::sender::FrameSender;
use crate::source::{FrameEncoder, FrameSource, RawFrame};
use crate::transport::DatagramTransport;
use crate::{Result, StreamError};

/// Per-process frame id sequence, wrapping at `u32::MAX`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameCounter(u32);

impl FrameCounter {
    pub fn starting_at(id: u32) -> Self {
        Self(id)
    }

    /// Id the next captured frame will get.
    pub fn current(&self) -> u32 {
        self.0
    }

    /// Claim the id for this cycle and move to the next one.
    pub fn advance(&mut self) -> u32 {
        let id = self.0;
        self.0 = self.0.wrapping_add(1);
        id
    }
}

/// Running totals for one streaming session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StreamStats {
    pub frames_captured: u64,
    pub frames_sent: u64,
    pub encode_failures: u64,
    pub send_failures: u64,
    pub packets_sent: u64,
    pub bytes_sent: u64,
    pub last_frame_id: Option<u32>,
}

/// Why the loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StopReason {
    /// Source reported no more frames
    SourceEnded,
    /// Source failed to deliver a frame
    AcquisitionFailed,
    /// Cancellation token fired
    Cancelled,
    /// Streaming task panicked or was aborted
    Aborted,
}

enum CycleOutcome {
    Sent,
    EncodeFailed,
    SendFailed,
}

/// Owns the source, encoder and sender and drives them in sequence.
pub struct Streamer<S, E, T> {
    source: S,
    encoder: E,
    sender: FrameSender<T>,
    pacer: FramePacer,
    counter: FrameCounter,
    stats: StreamStats,
    stats_tx: watch::Sender<StreamStats>,
}

impl<S, E, T> Streamer<S, E, T>
where
    S: FrameSource,
    E: FrameEncoder,
    T: DatagramTransport,
{
    pub fn new(source: S, encoder: E, sender: FrameSender<T>, pacer: FramePacer) -> Self {
        let (stats_tx, _) = watch::channel(StreamStats::default());
        Self {
            source,
            encoder,
            sender,
            pacer,
            counter: FrameCounter::default(),
            stats: StreamStats::default(),
            stats_tx,
        }
    }

    /// Assemble a streamer from a validated configuration.
    pub fn from_config(config: &SenderConfig, source: S, encoder: E, transport: T) -> Result<Self> {
        config.validate()?;
        let packetizer = Packetizer::new(config.vehicle_id, config.max_datagram_size)?;
        let sender =
            FrameSender::new(transport, packetizer, FragmentPacer::new(config.fragment_delay()));
        let pacer = FramePacer::new(config.frame_interval()?, config.pacing);
        Ok(Self::new(source, encoder, sender, pacer))
    }

    /// Start numbering frames at `id` instead of zero.
    pub fn with_first_frame_id(mut self, id: u32) -> Self {
        self.counter = FrameCounter::starting_at(id);
        self
    }

    pub fn counter(&self) -> FrameCounter {
        self.counter
    }

    pub fn stats(&self) -> &StreamStats {
        &self.stats
    }

    pub fn sender(&self) -> &FrameSender<T> {
        &self.sender
    }

    /// Watch receiver updated after every cycle.
    pub fn subscribe(&self) -> watch::Receiver<StreamStats> {
        self.stats_tx.subscribe()
    }

    /// Run until the source ends, acquisition fails, or `cancel` fires.
    pub async fn run(&mut self, cancel: &CancellationToken) -> StopReason {
        info!(
            "Streaming {} as vehicle {} (every {:?}, {:?} pacing)",
            self.source.describe(),
            self.sender.packetizer().vehicle_id(),
            self.pacer.interval(),
            self.pacer.mode()
        );

        let reason = loop {
            if cancel.is_cancelled() {
                break StopReason::Cancelled;
            }

            let captured = tokio::select! {
                _ = cancel.cancelled() => break StopReason::Cancelled,
                result = self.source.next_frame() => result,
            };

            let frame = match captured {
                Ok(Some(frame)) => frame,
                Ok(None) => {
                    info!("Frame source ended");
                    break StopReason::SourceEnded;
                }
                Err(e) => {
                    error!("Frame acquisition failed: {}", e);
                    break StopReason::AcquisitionFailed;
                }
            };

            self.stats.frames_captured += 1;
            let frame_id = self.counter.advance();
            let outcome = self.encode_and_send(&frame, frame_id).await;
            self.stats.last_frame_id = Some(frame_id);
            self.publish();

            if matches!(outcome, CycleOutcome::EncodeFailed) {
                continue;
            }

            tokio::select! {
                _ = cancel.cancelled() => break StopReason::Cancelled,
                _ = self.pacer.wait_for_next_frame() => {}
            }
        };

        info!(
            "Streaming stopped ({:?}): {} captured, {} sent, {} encode failures, {} send failures",
            reason,
            self.stats.frames_captured,
            self.stats.frames_sent,
            self.stats.encode_failures,
            self.stats.send_failures
        );
        self.publish();
        reason
    }

    /// Move the streamer onto a tokio task.
    pub fn spawn(mut self) -> StreamerHandle {
        let cancel = CancellationToken::new();
        let stats = self.subscribe();
        let task_cancel = cancel.clone();
        let task = tokio::spawn(async move { self.run(&task_cancel).await });

        StreamerHandle { stats, cancel, task: Some(task) }
    }

    async fn encode_and_send(&mut self, frame: &RawFrame, frame_id: u32) -> CycleOutcome {
        let payload = match self.encoder.encode(frame) {
            Ok(payload) => payload,
            Err(e) => {
                warn!("Frame {} dropped, encoding failed: {}", frame_id, e);
                self.stats.encode_failures += 1;
                return CycleOutcome::EncodeFailed;
            }
        };

        match self.sender.send_frame(&payload, frame_id).await {
            Ok(report) => {
                debug!(
                    "Frame {} sent: {} packets, {} bytes",
                    frame_id, report.packets_sent, report.bytes_sent
                );
                self.stats.frames_sent += 1;
                self.stats.packets_sent += u64::from(report.packets_sent);
                self.stats.bytes_sent += report.bytes_sent as u64;
                CycleOutcome::Sent
            }
            Err(e) => {
                if let StreamError::FrameAbandoned { fragment_index, .. } = &e {
                    self.stats.packets_sent += u64::from(*fragment_index);
                }
                warn!("Frame {} send failed: {}", frame_id, e);
                self.stats.send_failures += 1;
                CycleOutcome::SendFailed
            }
        }
    }

    fn publish(&self) {
        self.stats_tx.send_replace(self.stats.clone());
    }
}

/// Control handle for a spawned [`Streamer`].
pub struct StreamerHandle {
    stats: watch::Receiver<StreamStats>,
    cancel: CancellationToken,
    task: Option<JoinHandle<StopReason>>,
}

impl StreamerHandle {
    /// Stats snapshots, starting with the current one.
    pub fn stats(&self) -> WatchStream<StreamStats> {
        WatchStream::new(self.stats.clone())
    }

    pub fn current_stats(&self) -> StreamStats {
        self.stats.borrow().clone()
    }

    /// Ask the loop to stop at its next suspension point.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Wait for the loop to finish.
    pub async fn join(mut self) -> StopReason {
        let Some(task) = self.task.take() else {
            return StopReason::Aborted;
        };
        match task.await {
            Ok(reason) => reason,
            Err(e) => {
                error!("Streaming task failed: {}", e);
                StopReason::Aborted
            }
        }
    }
}

impl Drop for StreamerHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Cancel `token` once `after` has elapsed.
///
/// The timer task ends early if the token is cancelled by someone else.
pub fn cancel_after(token: CancellationToken, after: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            _ = token.cancelled() => {}
            _ = tokio::time::sleep(after) => {
                info!("Run duration of {:?} reached, stopping", after);
                token.cancel();
            }
        }
    })
}
