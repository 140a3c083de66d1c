//! One datagram: a header plus a borrowed slice of the frame payload.

use super::header::{HEADER_SIZE, PacketHeader};
use crate::{Result, StreamError};

/// A header paired with the payload bytes it describes.
///
/// Borrows from the encoded frame buffer; lives only as long as one send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fragment<'a> {
    pub header: PacketHeader,
    pub payload: &'a [u8],
}

impl<'a> Fragment<'a> {
    /// Total datagram length (header + payload).
    pub fn len(&self) -> usize {
        HEADER_SIZE + self.payload.len()
    }

    /// Whether the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// Write the datagram into `buf`, replacing its contents.
    ///
    /// Lets a sender reuse one buffer across fragments.
    pub fn write_datagram(&self, buf: &mut Vec<u8>) {
        buf.clear();
        buf.reserve(self.len());
        self.header.encode_into(buf);
        buf.extend_from_slice(self.payload);
    }

    /// Assemble the datagram into a fresh buffer.
    pub fn to_datagram(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.len());
        self.write_datagram(&mut buf);
        buf
    }

    /// Parse a received datagram.
    ///
    /// The payload must be exactly `data_length` bytes.
    pub fn parse(datagram: &'a [u8]) -> Result<Self> {
        let header = PacketHeader::decode(datagram)?;
        let payload = &datagram[HEADER_SIZE..];

        if payload.len() != header.data_length as usize {
            return Err(StreamError::parse(
                "Datagram payload",
                format!(
                    "data_length is {} but {} bytes follow the header",
                    header.data_length,
                    payload.len()
                ),
            ));
        }

        Ok(Self { header, payload })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::FrameType;

    #[test]
    fn datagram_is_header_then_payload() {
        let payload = [0xAA, 0xBB, 0xCC];
        let fragment = Fragment {
            header: PacketHeader::complete(5, 10, 1000, payload.len() as u32),
            payload: &payload,
        };

        let datagram = fragment.to_datagram();
        assert_eq!(datagram.len(), HEADER_SIZE + 3);
        assert_eq!(fragment.len(), datagram.len());
        assert_eq!(&datagram[HEADER_SIZE..], &payload);

        let parsed = Fragment::parse(&datagram).expect("datagram should parse");
        assert_eq!(parsed, fragment);
        assert_eq!(parsed.header.frame_type, FrameType::Complete);
    }

    #[test]
    fn write_datagram_reuses_buffer() {
        let mut buf = vec![0xFF; 64];
        let payload = [1u8, 2];
        let fragment = Fragment {
            header: PacketHeader::fragment(1, 2, 1, 2, 0, payload.len() as u32),
            payload: &payload,
        };

        fragment.write_datagram(&mut buf);
        assert_eq!(buf.len(), HEADER_SIZE + 2);
        assert_eq!(buf[1], FrameType::FragmentLast as u8);
    }

    #[test]
    fn parse_rejects_length_mismatch() {
        let payload = [0u8; 10];
        let fragment = Fragment {
            header: PacketHeader::complete(1, 1, 0, payload.len() as u32),
            payload: &payload,
        };
        let datagram = fragment.to_datagram();

        let truncated = &datagram[..datagram.len() - 1];
        assert!(matches!(Fragment::parse(truncated), Err(StreamError::Parse { .. })));

        let mut padded = datagram.clone();
        padded.push(0);
        assert!(Fragment::parse(&padded).is_err());
    }

    #[test]
    fn empty_payload_parses() {
        let fragment = Fragment { header: PacketHeader::complete(1, 1, 0, 0), payload: &[] };
        let datagram = fragment.to_datagram();
        assert_eq!(datagram.len(), HEADER_SIZE);
        assert!(Fragment::parse(&datagram).unwrap().is_empty());
    }
}
