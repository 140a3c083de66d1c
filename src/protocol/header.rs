//! Fixed 23-byte packet header.
//!
//! ## Layout
//!
//! ```text
//! offset  size  field
//! 0       1     version            (= PROTOCOL_VERSION)
//! 1       1     frame_type         (1=Complete, 2=FragFirst, 3=FragMiddle, 4=FragLast)
//! 2       1     vehicle_id
//! 3       4     frame_id
//! 7       2     fragment_index
//! 9       2     total_fragments
//! 11      8     timestamp          (monotonic milliseconds, not epoch)
//! 19      4     data_length
//! ```
//!
//! Multi-byte fields are written in [`WIRE_ENDIANNESS`] (little-endian), NOT
//! network byte order. Deployed receivers read the fields in host order on
//! little-endian machines, so the order is pinned here rather than left to
//! the build platform.
//!
//! ## Timestamp
//!
//! `timestamp` is milliseconds since an arbitrary monotonic origin chosen by
//! the sender (see [`crate::clock`]). It only orders packets from one sender
//! process; it cannot be compared with a receiver's clock to compute latency.

use crate::{Result, StreamError};

/// Protocol version written into every header.
pub const PROTOCOL_VERSION: u8 = 1;

/// Serialized header length in bytes.
pub const HEADER_SIZE: usize = 23;

/// Byte order of multi-byte header fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endianness {
    Little,
    Big,
}

/// Byte order used on the wire.
pub const WIRE_ENDIANNESS: Endianness = Endianness::Little;

/// Role of a packet within its frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum FrameType {
    /// Whole frame in one packet
    Complete = 0x01,
    /// First fragment of a fragmented frame
    FragmentFirst = 0x02,
    /// Interior fragment
    FragmentMiddle = 0x03,
    /// Last fragment of a fragmented frame
    FragmentLast = 0x04,
}

impl FrameType {
    /// Frame type for fragment `index` of a frame split into `total` fragments.
    pub fn for_fragment(index: u16, total: u16) -> Self {
        if total <= 1 {
            FrameType::Complete
        } else if index == 0 {
            FrameType::FragmentFirst
        } else if index == total - 1 {
            FrameType::FragmentLast
        } else {
            FrameType::FragmentMiddle
        }
    }

    /// Whether this type marks one piece of a multi-packet frame.
    pub fn is_fragment(self) -> bool {
        self != FrameType::Complete
    }
}

impl TryFrom<u8> for FrameType {
    type Error = StreamError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0x01 => Ok(FrameType::Complete),
            0x02 => Ok(FrameType::FragmentFirst),
            0x03 => Ok(FrameType::FragmentMiddle),
            0x04 => Ok(FrameType::FragmentLast),
            _ => Err(StreamError::InvalidFrameType { value }),
        }
    }
}

/// Header preceding every datagram payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketHeader {
    pub version: u8,
    pub frame_type: FrameType,
    pub vehicle_id: u8,
    pub frame_id: u32,
    pub fragment_index: u16,
    pub total_fragments: u16,
    pub timestamp: u64,
    pub data_length: u32,
}

impl PacketHeader {
    /// Size of the serialized header in bytes
    pub const SIZE: usize = HEADER_SIZE;

    /// Header for a frame carried whole in one packet.
    pub fn complete(vehicle_id: u8, frame_id: u32, timestamp: u64, data_length: u32) -> Self {
        Self {
            version: PROTOCOL_VERSION,
            frame_type: FrameType::Complete,
            vehicle_id,
            frame_id,
            fragment_index: 0,
            total_fragments: 1,
            timestamp,
            data_length,
        }
    }

    /// Header for fragment `fragment_index` of `total_fragments`.
    pub fn fragment(
        vehicle_id: u8,
        frame_id: u32,
        fragment_index: u16,
        total_fragments: u16,
        timestamp: u64,
        data_length: u32,
    ) -> Self {
        Self {
            version: PROTOCOL_VERSION,
            frame_type: FrameType::for_fragment(fragment_index, total_fragments),
            vehicle_id,
            frame_id,
            fragment_index,
            total_fragments,
            timestamp,
            data_length,
        }
    }

    /// Serialize into a fixed-size buffer.
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut bytes = [0u8; HEADER_SIZE];
        bytes[0] = self.version;
        bytes[1] = self.frame_type as u8;
        bytes[2] = self.vehicle_id;
        bytes[3..7].copy_from_slice(&self.frame_id.to_le_bytes());
        bytes[7..9].copy_from_slice(&self.fragment_index.to_le_bytes());
        bytes[9..11].copy_from_slice(&self.total_fragments.to_le_bytes());
        bytes[11..19].copy_from_slice(&self.timestamp.to_le_bytes());
        bytes[19..23].copy_from_slice(&self.data_length.to_le_bytes());
        bytes
    }

    /// Append the serialized header to `buf`.
    pub fn encode_into(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.encode());
    }

    /// Parse a header from the first [`HEADER_SIZE`] bytes of `bytes`.
    ///
    /// This is the receiver's view of the codec. Besides the layout it checks
    /// the protocol version and the header invariants, see [`Self::validate`].
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(StreamError::parse(
                "Packet header",
                format!("need {} bytes, have {}", HEADER_SIZE, bytes.len()),
            ));
        }

        let version = bytes[0];
        if version != PROTOCOL_VERSION {
            return Err(StreamError::UnsupportedVersion {
                expected: PROTOCOL_VERSION,
                found: version,
            });
        }

        let header = Self {
            version,
            frame_type: FrameType::try_from(bytes[1])?,
            vehicle_id: bytes[2],
            frame_id: read_u32_le(bytes, 3),
            fragment_index: read_u16_le(bytes, 7),
            total_fragments: read_u16_le(bytes, 9),
            timestamp: read_u64_le(bytes, 11),
            data_length: read_u32_le(bytes, 19),
        };
        header.validate()?;
        Ok(header)
    }

    /// Check the structural invariants of a header.
    ///
    /// - `total_fragments >= 1` and `fragment_index < total_fragments`
    /// - `frame_type == Complete` exactly when `total_fragments == 1`
    /// - the frame type agrees with the fragment position
    pub fn validate(&self) -> Result<()> {
        if self.total_fragments == 0 {
            return Err(StreamError::parse("Header validation", "total_fragments is zero"));
        }

        if self.fragment_index >= self.total_fragments {
            return Err(StreamError::parse(
                "Header validation",
                format!(
                    "fragment_index {} out of range for {} fragments",
                    self.fragment_index, self.total_fragments
                ),
            ));
        }

        let expected = FrameType::for_fragment(self.fragment_index, self.total_fragments);
        if self.frame_type != expected {
            return Err(StreamError::parse(
                "Header validation",
                format!(
                    "frame_type {:?} does not match fragment {} of {} (expected {:?})",
                    self.frame_type, self.fragment_index, self.total_fragments, expected
                ),
            ));
        }

        Ok(())
    }
}

// Callers guarantee the buffer holds HEADER_SIZE bytes.
fn read_u16_le(data: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([data[offset], data[offset + 1]])
}

fn read_u32_le(data: &[u8], offset: usize) -> u32 {
    let mut raw = [0u8; 4];
    raw.copy_from_slice(&data[offset..offset + 4]);
    u32::from_le_bytes(raw)
}

fn read_u64_le(data: &[u8], offset: usize) -> u64 {
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&data[offset..offset + 8]);
    u64::from_le_bytes(raw)
}
