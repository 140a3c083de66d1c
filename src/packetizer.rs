//! Splitting encoded frames into datagrams.
//!
//! A payload of `S` bytes with maximum datagram size `M` and header size
//! `H = 23`:
//!
//! - `S + H <= M`: one [`FrameType::Complete`](crate::protocol::FrameType::Complete) packet carrying the whole payload
//! - otherwise: `ceil(S / (M - H))` fragments of at most `M - H` bytes, typed
//!   First / Middle... / Last, sharing `frame_id` and `total_fragments`
//!
//! Fragments are produced lazily and each header samples the clock when it
//! is built, so a fragment sent after an inter-fragment delay carries its own
//! send time rather than the frame's start time.

use crate::clock::Clock;
use crate::protocol::{Fragment, HEADER_SIZE, PacketHeader};
use crate::{Result, StreamError};

/// Default maximum datagram size (header + payload)
pub const DEFAULT_MAX_DATAGRAM_SIZE: usize = 1400;

/// How a payload will be transmitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramePlan {
    /// Whole payload in one Complete packet
    Single,
    /// Split into `total_fragments` pieces of at most `fragment_payload` bytes
    Fragmented { total_fragments: u16, fragment_payload: usize },
}

impl FramePlan {
    /// Number of datagrams this plan produces.
    pub fn packet_count(&self) -> u16 {
        match self {
            FramePlan::Single => 1,
            FramePlan::Fragmented { total_fragments, .. } => *total_fragments,
        }
    }
}

/// Splits payloads for one sender identity and datagram size.
#[derive(Debug, Clone, Copy)]
pub struct Packetizer {
    vehicle_id: u8,
    max_datagram_size: usize,
}

impl Packetizer {
    /// Create a packetizer. `max_datagram_size` must leave room for at least
    /// one payload byte after the header.
    pub fn new(vehicle_id: u8, max_datagram_size: usize) -> Result<Self> {
        if max_datagram_size <= HEADER_SIZE {
            return Err(StreamError::config(format!(
                "max_datagram_size {} must exceed the {}-byte header",
                max_datagram_size, HEADER_SIZE
            )));
        }
        Ok(Self { vehicle_id, max_datagram_size })
    }

    pub fn vehicle_id(&self) -> u8 {
        self.vehicle_id
    }

    pub fn max_datagram_size(&self) -> usize {
        self.max_datagram_size
    }

    /// Largest payload slice one fragment can carry.
    pub fn max_fragment_payload(&self) -> usize {
        self.max_datagram_size - HEADER_SIZE
    }

    /// Decide single vs fragmented transmission for `payload_len` bytes.
    pub fn plan(&self, payload_len: usize) -> Result<FramePlan> {
        if u32::try_from(payload_len).is_err() {
            return Err(StreamError::PayloadTooLarge {
                length: payload_len,
                reason: "data_length field is 32 bits".to_string(),
            });
        }

        if payload_len.saturating_add(HEADER_SIZE) <= self.max_datagram_size {
            return Ok(FramePlan::Single);
        }

        let fragment_payload = self.max_fragment_payload();
        let count = payload_len.div_ceil(fragment_payload);
        let total_fragments = u16::try_from(count).map_err(|_| StreamError::PayloadTooLarge {
            length: payload_len,
            reason: format!("needs {} fragments, at most {} allowed", count, u16::MAX),
        })?;

        Ok(FramePlan::Fragmented { total_fragments, fragment_payload })
    }

    /// Produce the ordered fragments of `payload` for frame `frame_id`.
    ///
    /// Timestamps are read from `clock` as each fragment is yielded.
    pub fn packetize<'a>(
        &self,
        payload: &'a [u8],
        frame_id: u32,
        clock: &'a dyn Clock,
    ) -> Result<Fragments<'a>> {
        let plan = self.plan(payload.len())?;
        let (total, chunk) = match plan {
            FramePlan::Single => (1, payload.len()),
            FramePlan::Fragmented { total_fragments, fragment_payload } => {
                (total_fragments, fragment_payload)
            }
        };

        Ok(Fragments {
            payload,
            vehicle_id: self.vehicle_id,
            frame_id,
            plan,
            total,
            chunk,
            next_index: 0,
            clock,
        })
    }
}

/// Lazy iterator over the datagrams of one frame, in `fragment_index` order.
pub struct Fragments<'a> {
    payload: &'a [u8],
    vehicle_id: u8,
    frame_id: u32,
    plan: FramePlan,
    total: u16,
    chunk: usize,
    next_index: u16,
    clock: &'a dyn Clock,
}

impl<'a> Fragments<'a> {
    pub fn plan(&self) -> FramePlan {
        self.plan
    }

    pub fn frame_id(&self) -> u32 {
        self.frame_id
    }

    pub fn total_fragments(&self) -> u16 {
        self.total
    }
}

impl<'a> Iterator for Fragments<'a> {
    type Item = Fragment<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next_index >= self.total {
            return None;
        }

        let index = self.next_index;
        self.next_index += 1;

        let start = usize::from(index) * self.chunk;
        let end = (start + self.chunk).min(self.payload.len());
        let slice = &self.payload[start..end];
        // plan() bounded the payload to u32
        let data_length = slice.len() as u32;
        let timestamp = self.clock.now_millis();

        let header = match self.plan {
            FramePlan::Single => {
                PacketHeader::complete(self.vehicle_id, self.frame_id, timestamp, data_length)
            }
            FramePlan::Fragmented { .. } => PacketHeader::fragment(
                self.vehicle_id,
                self.frame_id,
                index,
                self.total,
                timestamp,
                data_length,
            ),
        };

        Some(Fragment { header, payload: slice })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = usize::from(self.total - self.next_index);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Fragments<'_> {}
