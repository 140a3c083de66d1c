//! End-to-end streaming over a loopback UDP socket

use std::collections::BTreeMap;
use std::time::Duration;

use framelink::{
    Fragment, FrameType, PacingMode, PassthroughEncoder, RawFrame, SenderConfig, StopReason,
    Streamer, TestPatternSource, UdpTransport,
};
use framelink::{FrameEncoder, FrameSource};
use tokio::net::UdpSocket;
use tokio_util::sync::CancellationToken;

const WIDTH: u32 = 64;
const HEIGHT: u32 = 64;
const FRAMES: u64 = 5;

/// Reproduce the payloads the sender will produce for the same pattern.
async fn expected_payloads() -> Vec<Vec<u8>> {
    let mut source = TestPatternSource::open(WIDTH, HEIGHT).unwrap().with_frame_limit(FRAMES);
    let mut encoder = PassthroughEncoder;
    let mut payloads = Vec::new();
    while let Some(frame) = source.next_frame().await.unwrap() {
        payloads.push(encoder.encode(&frame).unwrap());
    }
    payloads
}

#[tokio::test]
async fn fragmented_frames_arrive_in_order_and_reassemble() {
    let _ = tracing_subscriber::fmt::try_init();

    let receiver = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let port = receiver.local_addr().unwrap().port();

    let config = SenderConfig {
        host: "127.0.0.1".to_string(),
        port,
        vehicle_id: 9,
        target_fps: 200.0,
        pacing: PacingMode::DriftCompensated,
        ..SenderConfig::default()
    };

    let transport = UdpTransport::open(&config.host, config.port).await.unwrap();
    let source = TestPatternSource::open(WIDTH, HEIGHT).unwrap().with_frame_limit(FRAMES);
    let mut streamer = Streamer::from_config(&config, source, PassthroughEncoder, transport).unwrap();

    let reason = streamer.run(&CancellationToken::new()).await;
    assert_eq!(reason, StopReason::SourceEnded);
    assert_eq!(streamer.stats().frames_sent, FRAMES);

    let packets_expected = streamer.stats().packets_sent as usize;
    assert_eq!(packets_expected, FRAMES as usize * 3);

    let mut frames: BTreeMap<u32, Vec<(u16, FrameType, Vec<u8>)>> = BTreeMap::new();
    let mut order = Vec::new();
    let mut buf = vec![0u8; 2048];
    for _ in 0..packets_expected {
        let (len, _) = tokio::time::timeout(Duration::from_secs(2), receiver.recv_from(&mut buf))
            .await
            .expect("datagram should arrive on loopback")
            .unwrap();
        assert!(len <= config.max_datagram_size);

        let fragment = Fragment::parse(&buf[..len]).unwrap();
        assert_eq!(fragment.header.vehicle_id, 9);
        assert_eq!(fragment.header.total_fragments, 3);
        order.push((fragment.header.frame_id, fragment.header.fragment_index));
        frames.entry(fragment.header.frame_id).or_default().push((
            fragment.header.fragment_index,
            fragment.header.frame_type,
            fragment.payload.to_vec(),
        ));
    }

    // Strict wire order: frame ids increasing, fragments 0..n within each frame
    let mut sorted = order.clone();
    sorted.sort();
    assert_eq!(order, sorted);

    let expected = expected_payloads().await;
    assert_eq!(frames.len(), expected.len());
    for (frame_id, parts) in &frames {
        let types: Vec<FrameType> = parts.iter().map(|(_, t, _)| *t).collect();
        assert_eq!(
            types,
            vec![FrameType::FragmentFirst, FrameType::FragmentMiddle, FrameType::FragmentLast]
        );

        let joined: Vec<u8> = parts.iter().flat_map(|(_, _, p)| p.iter().copied()).collect();
        assert_eq!(joined, expected[*frame_id as usize]);
    }
}

#[tokio::test]
async fn small_frames_travel_as_complete_packets() {
    let receiver = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let port = receiver.local_addr().unwrap().port();

    struct TinySource(u8);

    #[async_trait::async_trait]
    impl FrameSource for TinySource {
        async fn next_frame(&mut self) -> framelink::Result<Option<RawFrame>> {
            if self.0 == 0 {
                return Ok(None);
            }
            self.0 -= 1;
            Ok(Some(RawFrame::new(20, 10, 1, vec![self.0; 200])))
        }
    }

    let config = SenderConfig { port, target_fps: 500.0, ..SenderConfig::default() };
    let transport = UdpTransport::open(&config.host, config.port).await.unwrap();
    let mut streamer =
        Streamer::from_config(&config, TinySource(3), PassthroughEncoder, transport).unwrap();
    streamer.run(&CancellationToken::new()).await;

    let mut buf = vec![0u8; 2048];
    for expected_id in 0..3u32 {
        let (len, _) = tokio::time::timeout(Duration::from_secs(2), receiver.recv_from(&mut buf))
            .await
            .unwrap()
            .unwrap();
        let fragment = Fragment::parse(&buf[..len]).unwrap();
        assert_eq!(fragment.header.frame_type, FrameType::Complete);
        assert_eq!(fragment.header.frame_id, expected_id);
        assert_eq!(fragment.header.data_length, 200);
        assert_eq!(len, 223);
    }
}
