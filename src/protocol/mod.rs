//! Wire protocol: header codec and datagram framing.
//!
//! Every datagram is a [`PacketHeader`] followed by `data_length` payload
//! bytes. A frame that fits in one datagram is sent as a single
//! [`FrameType::Complete`] packet; larger frames are split into ordered
//! fragments sharing one `frame_id` (see [`crate::packetizer`]).

mod fragment;
mod header;

pub use fragment::Fragment;
pub use header::{
    Endianness, FrameType, HEADER_SIZE, PROTOCOL_VERSION, PacketHeader, WIRE_ENDIANNESS,
};
