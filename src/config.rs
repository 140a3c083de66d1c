//! Sender configuration.
//!
//! Every tunable is carried in one [`SenderConfig`] value handed to the
//! components that need it; nothing is read from process-wide state.
//!
//! ```yaml
//! host: 192.168.1.20
//! port: 8080
//! vehicle_id: 3
//! target_fps: 15.0
//! max_datagram_size: 1400
//! fragment_delay_ms: 1
//! pacing: drift_compensated
//! run_duration_secs: 60
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::pacer::{PacingMode, interval_for_rate};
use crate::packetizer::DEFAULT_MAX_DATAGRAM_SIZE;
use crate::protocol::HEADER_SIZE;
use crate::{Result, StreamError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SenderConfig {
    /// Destination host name or address
    pub host: String,
    /// Destination UDP port
    pub port: u16,
    /// Sender identity carried in every header
    pub vehicle_id: u8,
    /// Target frames per second
    pub target_fps: f64,
    /// Largest datagram (header + payload) to emit
    pub max_datagram_size: usize,
    /// Header length; fixed by the protocol, present so configs can state it
    pub header_size: usize,
    /// Gap between fragments of one frame, in milliseconds
    pub fragment_delay_ms: u64,
    /// Inter-frame scheduling strategy
    pub pacing: PacingMode,
    /// Stop streaming after this many seconds; unset runs until stopped
    pub run_duration_secs: Option<u64>,
    /// Stop after this many captured frames; unset runs until stopped
    pub max_frames: Option<u64>,
}

impl Default for SenderConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            vehicle_id: 1,
            target_fps: 30.0,
            max_datagram_size: DEFAULT_MAX_DATAGRAM_SIZE,
            header_size: HEADER_SIZE,
            fragment_delay_ms: 1,
            pacing: PacingMode::SingleInterval,
            run_duration_secs: None,
            max_frames: None,
        }
    }
}

impl SenderConfig {
    /// Parse and validate a YAML document.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml_ng::from_str(yaml)
            .map_err(|e| StreamError::parse("Sender configuration", e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|e| {
            StreamError::config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_yaml_str(&yaml)
    }

    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(StreamError::config("host must not be empty"));
        }

        interval_for_rate(self.target_fps)?;

        if self.header_size != HEADER_SIZE {
            return Err(StreamError::config(format!(
                "header_size is fixed at {} bytes by protocol version 1, got {}",
                HEADER_SIZE, self.header_size
            )));
        }

        if self.max_datagram_size <= self.header_size {
            return Err(StreamError::config(format!(
                "max_datagram_size {} leaves no room for payload after the {}-byte header",
                self.max_datagram_size, self.header_size
            )));
        }

        if self.run_duration_secs == Some(0) {
            return Err(StreamError::config("run_duration_secs must be at least 1 when set"));
        }

        if self.max_frames == Some(0) {
            return Err(StreamError::config("max_frames must be at least 1 when set"));
        }

        Ok(())
    }

    /// Time budget of one capture cycle.
    pub fn frame_interval(&self) -> Result<Duration> {
        interval_for_rate(self.target_fps)
    }

    /// How long to stream before stopping, if bounded.
    pub fn run_duration(&self) -> Option<Duration> {
        self.run_duration_secs.map(Duration::from_secs)
    }

    pub fn fragment_delay(&self) -> Duration {
        Duration::from_millis(self.fragment_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_sender() {
        let config = SenderConfig::default();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 8080);
        assert_eq!(config.vehicle_id, 1);
        assert_eq!(config.max_datagram_size, 1400);
        assert_eq!(config.header_size, 23);
        assert_eq!(config.fragment_delay(), Duration::from_millis(1));
        assert_eq!(config.pacing, PacingMode::SingleInterval);
        assert_eq!(config.run_duration(), None);
        assert_eq!(config.max_frames, None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_yaml_fills_defaults() {
        let config = SenderConfig::from_yaml_str(
            "host: 10.0.0.5\nvehicle_id: 7\ntarget_fps: 10\npacing: drift_compensated\n",
        )
        .unwrap();

        assert_eq!(config.host, "10.0.0.5");
        assert_eq!(config.vehicle_id, 7);
        assert_eq!(config.frame_interval().unwrap(), Duration::from_millis(100));
        assert_eq!(config.pacing, PacingMode::DriftCompensated);
        assert_eq!(config.port, 8080);
    }

    #[test]
    fn unknown_fields_rejected() {
        let result = SenderConfig::from_yaml_str("camera_index: 0\n");
        assert!(matches!(result, Err(StreamError::Parse { .. })));
    }

    #[test]
    fn invalid_values_rejected() {
        let cases = [
            "target_fps: 0\n",
            "target_fps: -5\n",
            "host: ''\n",
            "header_size: 26\n",
            "max_datagram_size: 23\n",
            "run_duration_secs: 0\n",
            "max_frames: 0\n",
        ];
        for yaml in cases {
            let result = SenderConfig::from_yaml_str(yaml);
            assert!(matches!(result, Err(StreamError::Config { .. })), "accepted {:?}", yaml);
        }
    }

    #[test]
    fn unrepresentable_frame_interval_rejected() {
        for yaml in ["target_fps: 1.0e-300\n", "target_fps: 1.0e-20\n", "target_fps: .inf\n"] {
            let result = SenderConfig::from_yaml_str(yaml);
            assert!(matches!(result, Err(StreamError::Config { .. })), "accepted {:?}", yaml);
        }

        let unchecked = SenderConfig { target_fps: 1.0e-300, ..SenderConfig::default() };
        assert!(matches!(unchecked.frame_interval(), Err(StreamError::Config { .. })));
    }

    #[test]
    fn run_bounds_parsed() {
        let config =
            SenderConfig::from_yaml_str("run_duration_secs: 30\nmax_frames: 900\n").unwrap();
        assert_eq!(config.run_duration(), Some(Duration::from_secs(30)));
        assert_eq!(config.max_frames, Some(900));
    }

    #[test]
    fn missing_file_is_config_error() {
        let result = SenderConfig::load("/nonexistent/framelink.yaml");
        assert!(matches!(result, Err(StreamError::Config { .. })));
    }
}
