//! Error types for frame streaming.
//!
//! Errors fall into two classes that drive the streaming loop:
//!
//! - **Fatal**: the frame source or the datagram socket could not be opened,
//!   or frame acquisition failed mid-run. The loop stops.
//! - **Recoverable**: a captured frame could not be encoded, or one of its
//!   packets could not be sent. The frame is dropped and the loop continues
//!   with the next capture.
//!
//! Nothing in this crate retries automatically. [`StreamError::is_retryable`]
//! only tells a wrapping layer whether a retry policy could make sense.
//!
//! ```rust
//! use framelink::StreamError;
//!
//! let error = StreamError::short_write(1400, 1024);
//! assert!(!error.is_fatal());
//! for suggestion in error.recovery_suggestions() {
//!     println!("  - {}", suggestion);
//! }
//! ```

use thiserror::Error;

/// Result type alias for streaming operations.
pub type Result<T, E = StreamError> = std::result::Result<T, E>;

/// Main error type for streaming operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum StreamError {
    #[error("Frame source unavailable: {reason}")]
    SourceUnavailable {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Frame acquisition failed: {reason}")]
    Acquisition {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Frame encoding failed: {details}")]
    Encode { details: String },

    #[error("Datagram socket error: {operation}")]
    Socket {
        operation: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Datagram send failed")]
    Transport {
        #[source]
        source: std::io::Error,
    },

    #[error("Short datagram write: {written} of {expected} bytes accepted")]
    ShortWrite { expected: usize, written: usize },

    #[error(
        "Frame {frame_id} abandoned at fragment {fragment_index} of {total_fragments}"
    )]
    FrameAbandoned {
        frame_id: u32,
        fragment_index: u16,
        total_fragments: u16,
        #[source]
        source: Box<StreamError>,
    },

    #[error("Payload of {length} bytes cannot be framed: {reason}")]
    PayloadTooLarge { length: usize, reason: String },

    #[error("Invalid configuration: {reason}")]
    Config { reason: String },

    #[error("Parse error in {context}: {details}")]
    Parse { context: String, details: String },

    #[error("Protocol version mismatch: expected {expected}, found {found}")]
    UnsupportedVersion { expected: u8, found: u8 },

    #[error("Unknown frame type {value:#04x}")]
    InvalidFrameType { value: u8 },
}

impl StreamError {
    /// Returns whether this error ends the streaming loop.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            StreamError::SourceUnavailable { .. }
                | StreamError::Acquisition { .. }
                | StreamError::Socket { .. }
                | StreamError::Config { .. }
        )
    }

    /// Returns whether this error is potentially recoverable through retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            StreamError::Transport { .. } => true,
            StreamError::ShortWrite { .. } => true,
            StreamError::FrameAbandoned { source, .. } => source.is_retryable(),
            StreamError::Encode { .. } => true,
            StreamError::SourceUnavailable { .. } => false,
            StreamError::Acquisition { .. } => false,
            StreamError::Socket { .. } => false,
            StreamError::PayloadTooLarge { .. } => false,
            StreamError::Config { .. } => false,
            StreamError::Parse { .. } => false,
            StreamError::UnsupportedVersion { .. } => false,
            StreamError::InvalidFrameType { .. } => false,
        }
    }

    /// Returns suggested recovery actions for this error.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            StreamError::SourceUnavailable { .. } => vec![
                "Check that the capture device exists and is not in use",
                "Verify device permissions for the current user",
            ],
            StreamError::Acquisition { .. } => vec![
                "Check the capture device connection",
                "Restart the sender once the device is back",
            ],
            StreamError::Encode { .. } => vec![
                "Check the captured frame dimensions and pixel format",
                "Lower the encoder quality setting",
            ],
            StreamError::Socket { .. } => vec![
                "Check that the destination host resolves",
                "Verify the process may open UDP sockets",
            ],
            StreamError::Transport { .. } | StreamError::ShortWrite { .. } => vec![
                "Check the network route to the destination",
                "Reduce the maximum datagram size",
                "Increase the inter-fragment delay",
            ],
            StreamError::FrameAbandoned { .. } => vec![
                "Check the network route to the destination",
                "Increase the inter-fragment delay to reduce burst loss",
            ],
            StreamError::PayloadTooLarge { .. } => vec![
                "Lower the capture resolution or encoder quality",
                "Increase the maximum datagram size if the path allows it",
            ],
            StreamError::Config { .. } => vec![
                "Check the configuration file against the documented fields",
            ],
            StreamError::Parse { .. }
            | StreamError::UnsupportedVersion { .. }
            | StreamError::InvalidFrameType { .. } => vec![
                "Verify the peer speaks the same protocol version",
                "Check that the datagram was not truncated in transit",
            ],
        }
    }

    /// Helper constructor for a source that could not be opened.
    pub fn source_unavailable(reason: impl Into<String>) -> Self {
        StreamError::SourceUnavailable { reason: reason.into(), source: None }
    }

    /// Helper constructor for a failed frame read.
    pub fn acquisition_failed(reason: impl Into<String>) -> Self {
        StreamError::Acquisition { reason: reason.into(), source: None }
    }

    /// Helper constructor for a failed frame read with source.
    pub fn acquisition_failed_with_source(
        reason: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        StreamError::Acquisition { reason: reason.into(), source: Some(source) }
    }

    /// Helper constructor for encoder failures.
    pub fn encode_failed(details: impl Into<String>) -> Self {
        StreamError::Encode { details: details.into() }
    }

    /// Helper constructor for socket setup errors.
    pub fn socket_error(operation: impl Into<String>, source: std::io::Error) -> Self {
        StreamError::Socket { operation: operation.into(), source }
    }

    /// Helper constructor for partially accepted datagrams.
    pub fn short_write(expected: usize, written: usize) -> Self {
        StreamError::ShortWrite { expected, written }
    }

    /// Helper constructor for configuration errors.
    pub fn config(reason: impl Into<String>) -> Self {
        StreamError::Config { reason: reason.into() }
    }

    /// Helper constructor for parse errors.
    pub fn parse(context: impl Into<String>, details: impl Into<String>) -> Self {
        StreamError::Parse { context: context.into(), details: details.into() }
    }
}

impl From<std::io::Error> for StreamError {
    fn from(err: std::io::Error) -> Self {
        StreamError::Transport { source: err }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn error_messages_carry_their_context(
                reason in ".*",
                expected in 24usize..65_535usize,
                frame_id in any::<u32>(),
                fragment_index in 0u16..100u16,
            ) {
                let source_err = StreamError::source_unavailable(reason.clone());
                prop_assert!(source_err.to_string().contains(&reason));

                let short = StreamError::short_write(expected, expected - 1);
                let msg = short.to_string();
                prop_assert!(msg.contains(&expected.to_string()));
                prop_assert!(msg.contains(&(expected - 1).to_string()));

                let abandoned = StreamError::FrameAbandoned {
                    frame_id,
                    fragment_index,
                    total_fragments: fragment_index + 1,
                    source: Box::new(short),
                };
                let msg = abandoned.to_string();
                prop_assert!(msg.contains(&frame_id.to_string()));
                prop_assert!(!abandoned.is_fatal());
            }
        }
    }

    #[test]
    fn fatal_classification_follows_taxonomy() {
        assert!(StreamError::source_unavailable("camera 0").is_fatal());
        assert!(StreamError::acquisition_failed("read returned nothing").is_fatal());
        assert!(
            StreamError::socket_error("bind", std::io::Error::other("denied")).is_fatal()
        );

        assert!(!StreamError::encode_failed("bad frame").is_fatal());
        assert!(!StreamError::short_write(100, 10).is_fatal());
        assert!(!StreamError::from(std::io::Error::other("unreachable")).is_fatal());
    }

    #[test]
    fn abandoned_frame_exposes_underlying_cause() {
        let error = StreamError::FrameAbandoned {
            frame_id: 7,
            fragment_index: 2,
            total_fragments: 5,
            source: Box::new(StreamError::short_write(1400, 3)),
        };

        let cause = std::error::Error::source(&error).expect("cause should be chained");
        assert!(cause.to_string().contains("3 of 1400"));
        assert!(error.is_retryable());
    }

    #[test]
    fn error_traits_validation() {
        fn assert_send_sync_static<T: Send + Sync + 'static>() {}
        assert_send_sync_static::<StreamError>();
    }

    #[test]
    fn recovery_suggestions_are_descriptive() {
        let errors = [
            StreamError::source_unavailable("x"),
            StreamError::encode_failed("x"),
            StreamError::short_write(2, 1),
            StreamError::config("x"),
            StreamError::InvalidFrameType { value: 9 },
        ];
        for error in &errors {
            let suggestions = error.recovery_suggestions();
            assert!(!suggestions.is_empty());
            assert!(suggestions.iter().all(|s| s.len() > 5));
        }
    }
}
