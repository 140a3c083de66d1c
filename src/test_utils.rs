//! Test doubles for the transport, source and clock seams
//!
//! Shared by unit tests and benchmarks across the crate.

#![cfg(any(test, feature = "benchmark"))]

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::time::Instant;

use crate::clock::Clock;
use crate::source::{FrameSource, RawFrame};
use crate::transport::DatagramTransport;
use crate::{Result, StreamError};

/// Deterministic payload of `len` bytes.
pub fn patterned_payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

/// Clock that returns `start`, `start + step`, `start + 2*step`, ...
#[derive(Debug)]
pub struct StepClock {
    next: AtomicU64,
    step: u64,
}

impl StepClock {
    pub const fn new(start: u64, step: u64) -> Self {
        Self { next: AtomicU64::new(start), step }
    }
}

impl Clock for StepClock {
    fn now_millis(&self) -> u64 {
        self.next.fetch_add(self.step, Ordering::Relaxed)
    }
}

/// Failure injected on one send attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportFault {
    /// Accept only this many bytes
    ShortWrite(usize),
    /// Fail with an I/O error
    Error,
}

#[derive(Debug, Default)]
struct Recording {
    attempts: usize,
    sent: Vec<Vec<u8>>,
    sent_at: Vec<Instant>,
}

/// In-memory transport that records every fully accepted datagram.
#[derive(Debug, Default)]
pub struct RecordingTransport {
    fault: Option<(usize, TransportFault)>,
    recording: Mutex<Recording>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inject `fault` on the zero-based send attempt `attempt`.
    pub fn with_fault(attempt: usize, fault: TransportFault) -> Self {
        Self { fault: Some((attempt, fault)), recording: Mutex::default() }
    }

    /// Datagrams accepted in full, in send order.
    pub fn sent(&self) -> Vec<Vec<u8>> {
        self.lock().sent.clone()
    }

    /// When each accepted datagram was sent.
    pub fn sent_at(&self) -> Vec<Instant> {
        self.lock().sent_at.clone()
    }

    /// Number of send attempts, including failed ones.
    pub fn attempts(&self) -> usize {
        self.lock().attempts
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Recording> {
        self.recording.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait::async_trait]
impl DatagramTransport for RecordingTransport {
    async fn send_datagram(&self, datagram: &[u8]) -> std::io::Result<usize> {
        let mut recording = self.lock();
        let attempt = recording.attempts;
        recording.attempts += 1;

        match self.fault {
            Some((at, TransportFault::ShortWrite(written))) if at == attempt => {
                Ok(written.min(datagram.len()))
            }
            Some((at, TransportFault::Error)) if at == attempt => {
                Err(std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "injected fault"))
            }
            _ => {
                recording.sent.push(datagram.to_vec());
                recording.sent_at.push(Instant::now());
                Ok(datagram.len())
            }
        }
    }
}

/// One scripted source result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptStep {
    /// Valid 1-channel frame with this many bytes
    Frame(usize),
    /// Frame whose buffer disagrees with its geometry, so encoding fails
    Corrupt,
    /// Acquisition error
    Fail,
}

/// Source that replays a fixed script, then ends.
#[derive(Debug)]
pub struct ScriptedSource {
    steps: VecDeque<ScriptStep>,
}

impl ScriptedSource {
    pub fn new(steps: Vec<ScriptStep>) -> Self {
        Self { steps: steps.into() }
    }
}

#[async_trait::async_trait]
impl FrameSource for ScriptedSource {
    async fn next_frame(&mut self) -> Result<Option<RawFrame>> {
        match self.steps.pop_front() {
            None => Ok(None),
            Some(ScriptStep::Frame(len)) => {
                let width = u32::try_from(len)
                    .map_err(|_| StreamError::acquisition_failed("scripted frame too large"))?;
                Ok(Some(RawFrame::new(width, 1, 1, patterned_payload(len))))
            }
            Some(ScriptStep::Corrupt) => Ok(Some(RawFrame::new(10, 10, 3, vec![0; 7]))),
            Some(ScriptStep::Fail) => Err(StreamError::acquisition_failed("scripted failure")),
        }
    }

    fn describe(&self) -> String {
        format!("scripted source ({} steps left)", self.steps.len())
    }
}
