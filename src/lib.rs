//! Fragmenting UDP sender for encoded image frames.
//!
//! Framelink streams periodically produced, variably sized encoded images over
//! UDP to one fixed destination. Each datagram carries a fixed 23-byte header
//! followed by payload; frames too large for one datagram are split into
//! ordered fragments that a receiver can stitch back together.
//!
//! # Features
//!
//! - **Wire codec**: fixed little-endian header with a decode counterpart
//! - **Packetizer**: single-packet vs fragmented transmission under an MTU bound
//! - **Pacing**: target frame rate plus a small gap between fragments
//! - **Failure policy**: short writes fail, a failed fragment abandons its frame
//!
//! The protocol has no acknowledgements, retransmission or reassembly on the
//! sending side. A frame that loses a fragment is lost.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use framelink::{PassthroughEncoder, SenderConfig, Streamer, TestPatternSource, UdpTransport};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> framelink::Result<()> {
//!     let config = SenderConfig::default();
//!     let transport = UdpTransport::open(&config.host, config.port).await?;
//!     let source = TestPatternSource::open(160, 120)?.with_frame_limit(300);
//!
//!     let mut streamer = Streamer::from_config(&config, source, PassthroughEncoder, transport)?;
//!     let reason = streamer.run(&CancellationToken::new()).await;
//!     println!("stopped: {:?}", reason);
//!     Ok(())
//! }
//! ```

// Core types and error handling
pub mod clock;
pub mod config;
mod error;
pub mod protocol;
#[cfg_attr(any(test, feature = "benchmark"), path = "test_utils.rs")]
#[cfg(any(test, feature = "benchmark"))]
pub mod test_utils;

// Framing and transmission
pub mod pacer;
pub mod packetizer;
pub mod sender;
pub mod transport;

// Capture loop and collaborators
pub mod source;
pub mod sources;
pub mod streamer;

pub use clock::{Clock, MonotonicClock};
pub use config::SenderConfig;
pub use error::*;
pub use pacer::{FragmentPacer, FramePacer, PacingMode, interval_for_rate};
pub use packetizer::{FramePlan, Fragments, Packetizer};
pub use protocol::{Fragment, FrameType, HEADER_SIZE, PROTOCOL_VERSION, PacketHeader};
pub use sender::{FrameReport, FrameSender};
pub use source::{FrameEncoder, FrameSource, RawFrame};
pub use sources::{PassthroughEncoder, TestPatternSource};
pub use streamer::{
    FrameCounter, StopReason, StreamStats, Streamer, StreamerHandle, cancel_after,
};
pub use transport::{DatagramTransport, UdpTransport, send_packet};
