//! `framelink-send [config.yaml]`
//!
//! Streams the built-in test pattern to the configured destination. Exits
//! non-zero when the socket or the source cannot be opened, zero once the
//! loop ends. `run_duration_secs` and `max_frames` bound the run; Ctrl-C
//! stops it early.

use std::process::ExitCode;

use anyhow::Context;
use framelink::{
    PassthroughEncoder, SenderConfig, Streamer, TestPatternSource, UdpTransport, cancel_after,
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const PATTERN_WIDTH: u32 = 160;
const PATTERN_HEIGHT: u32 = 120;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config_path = std::env::args().nth(1);
    match run(config_path.as_deref()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(config_path: Option<&str>) -> anyhow::Result<()> {
    let config = match config_path {
        Some(path) => SenderConfig::load(path)
            .with_context(|| format!("loading configuration from {}", path))?,
        None => SenderConfig::default(),
    };
    stream(config).await
}

async fn stream(config: SenderConfig) -> anyhow::Result<()> {
    config.validate().context("validating configuration")?;

    let transport = UdpTransport::open(&config.host, config.port)
        .await
        .context("creating UDP socket")?;
    let mut source = TestPatternSource::open(PATTERN_WIDTH, PATTERN_HEIGHT)
        .context("opening frame source")?;
    if let Some(limit) = config.max_frames {
        source = source.with_frame_limit(limit);
    }

    info!(
        "UDP video sender started: vehicle={} target={}:{} fps={}",
        config.vehicle_id, config.host, config.port, config.target_fps
    );

    let mut streamer = Streamer::from_config(&config, source, PassthroughEncoder, transport)?;

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        tokio::select! {
            _ = ctrl_c.cancelled() => {}
            result = tokio::signal::ctrl_c() => match result {
                Ok(()) => {
                    info!("Interrupt received, stopping");
                    ctrl_c.cancel();
                }
                Err(e) => warn!("Cannot listen for interrupt: {}", e),
            },
        }
    });
    if let Some(duration) = config.run_duration() {
        cancel_after(cancel.clone(), duration);
    }

    let reason = streamer.run(&cancel).await;
    cancel.cancel();
    info!("Sender exiting ({:?}), {} frames sent", reason, streamer.stats().frames_sent);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::UdpSocket;

    #[tokio::test]
    async fn unresolvable_host_is_failure() {
        let config = SenderConfig {
            host: "framelink-receiver.invalid".to_string(),
            ..SenderConfig::default()
        };
        let err = stream(config).await.unwrap_err();
        assert!(format!("{:#}", err).contains("creating UDP socket"), "{:#}", err);
    }

    #[tokio::test]
    async fn invalid_configuration_is_failure() {
        let config = SenderConfig { max_datagram_size: 16, ..SenderConfig::default() };
        assert!(stream(config).await.is_err());
    }

    #[tokio::test]
    async fn missing_config_file_is_failure() {
        assert!(run(Some("/nonexistent/framelink-send.yaml")).await.is_err());
    }

    #[tokio::test]
    async fn bounded_run_ends_successfully() {
        let receiver = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let config = SenderConfig {
            port: receiver.local_addr().unwrap().port(),
            target_fps: 200.0,
            max_frames: Some(2),
            ..SenderConfig::default()
        };
        stream(config).await.unwrap();

        // 160x120 grayscale is 14 fragments per frame
        let mut buf = vec![0u8; 2048];
        let (len, _) = receiver.recv_from(&mut buf).await.unwrap();
        assert!(len <= 1400);
    }
}
