//! Integration tests for the status listener and frame sources
//!
//! These tests verify end-to-end behavior over real sockets and streams:
//! - Status datagrams on a loopback socket, valid and invalid
//! - Magic check policy, pinned down in both directions
//! - Discovery with and without a sonar present
//! - Playback of a recording mixed with corrupted frames through the dispatcher

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use oculus_protocol::encode::{PingBuilder, StatusBuilder};
use oculus_protocol::{AssemblerConfig, RejectKind, Revision, OCULUS_CHECK_ID};
use oculus_rx::{
    discover, FramePlayer, FrameRecorder, ListenerConfig, MagicCheck, PingDispatcher, RxError,
    StatusCounters, StatusListener, StatusListenerHandle,
};
use tokio::net::UdpSocket;
use tokio::sync::watch;
use tokio::time::timeout;

// ============================================================================
// Helper Functions
// ============================================================================

mod helpers {
    use super::*;

    pub type Delivered = Arc<Mutex<Vec<(u32, bool)>>>;

    pub fn loopback_config(magic_check: MagicCheck) -> ListenerConfig {
        ListenerConfig {
            bind_addr: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 0,
            magic_check,
            ..Default::default()
        }
    }

    /// Bind a listener on an ephemeral port and record what it delivers
    pub async fn start_listener(
        magic_check: MagicCheck,
    ) -> (StatusListenerHandle, SocketAddr, Delivered) {
        let mut listener = StatusListener::bind(loopback_config(magic_check))
            .await
            .expect("bind loopback");
        let addr = listener.local_addr().unwrap();
        let delivered: Delivered = Arc::new(Mutex::new(Vec::new()));
        let sink = delivered.clone();
        listener.on_status(move |record, valid| {
            sink.lock().unwrap().push((record.device_id(), valid));
        });
        (listener.spawn(), addr, delivered)
    }

    pub async fn sender() -> UdpSocket {
        UdpSocket::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap()
    }

    /// Wait until the published counters reach `expected`
    pub async fn wait_for(rx: &mut watch::Receiver<StatusCounters>, expected: StatusCounters) {
        timeout(Duration::from_secs(5), rx.wait_for(|c| *c == expected))
            .await
            .expect("counters never reached the expected value")
            .expect("listener stopped");
    }

    pub fn status(device_id: u32, oculus_id: u16) -> Vec<u8> {
        StatusBuilder::new(device_id, Ipv4Addr::new(10, 0, 0, 2))
            .oculus_id(oculus_id)
            .build()
    }
}

use helpers::*;

// ============================================================================
// Status Listener
// ============================================================================

#[tokio::test]
async fn test_empty_datagram_increments_invalid_only() {
    let (handle, addr, delivered) = start_listener(MagicCheck::Require).await;
    let mut counters = handle.subscribe();
    let tx = sender().await;

    tx.send_to(&[], addr).await.unwrap();
    wait_for(&mut counters, StatusCounters { valid: 0, invalid: 1 }).await;

    assert!(delivered.lock().unwrap().is_empty());
    let totals = handle.shutdown().await.unwrap();
    assert_eq!(totals, StatusCounters { valid: 0, invalid: 1 });
}

#[tokio::test]
async fn test_valid_status_delivered() {
    let (handle, addr, delivered) = start_listener(MagicCheck::Require).await;
    let mut counters = handle.subscribe();
    let tx = sender().await;

    tx.send_to(&status(41, OCULUS_CHECK_ID), addr).await.unwrap();
    tx.send_to(&status(42, OCULUS_CHECK_ID), addr).await.unwrap();
    wait_for(&mut counters, StatusCounters { valid: 2, invalid: 0 }).await;

    assert_eq!(*delivered.lock().unwrap(), vec![(41, true), (42, true)]);
    assert_eq!(handle.counters().valid, 2);
    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_bad_magic_is_invalid_when_required() {
    let (handle, addr, delivered) = start_listener(MagicCheck::Require).await;
    let mut counters = handle.subscribe();
    let tx = sender().await;

    tx.send_to(&status(5, 0x1234), addr).await.unwrap();
    wait_for(&mut counters, StatusCounters { valid: 0, invalid: 1 }).await;

    assert_eq!(*delivered.lock().unwrap(), vec![(5, false)]);
    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_bad_magic_is_valid_when_ignored() {
    let (handle, addr, delivered) = start_listener(MagicCheck::Ignore).await;
    let mut counters = handle.subscribe();
    let tx = sender().await;

    tx.send_to(&status(5, 0x1234), addr).await.unwrap();
    wait_for(&mut counters, StatusCounters { valid: 1, invalid: 0 }).await;

    assert_eq!(*delivered.lock().unwrap(), vec![(5, true)]);
    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_oversized_datagram_dropped() {
    let (handle, addr, delivered) = start_listener(MagicCheck::Require).await;
    let mut counters = handle.subscribe();
    let tx = sender().await;

    let mut long = status(1, OCULUS_CHECK_ID);
    long.extend_from_slice(&[0u8; 16]);
    tx.send_to(&long, addr).await.unwrap();
    wait_for(&mut counters, StatusCounters { valid: 0, invalid: 1 }).await;

    assert!(delivered.lock().unwrap().is_empty());
    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_bind_conflict_reported() {
    let (handle, addr, _) = start_listener(MagicCheck::Require).await;
    let config = ListenerConfig {
        port: addr.port(),
        ..loopback_config(MagicCheck::Require)
    };
    let result = StatusListener::bind(config).await;
    assert!(matches!(result, Err(RxError::Bind { .. })));
    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_discovery_times_out() {
    let result = discover(loopback_config(MagicCheck::Require), Duration::from_millis(50)).await;
    assert!(matches!(result, Err(RxError::DiscoveryTimeout(_))));
}

#[tokio::test]
async fn test_discovery_finds_sonar() {
    // Reserve a port, release it, then broadcast to it until discovery answers
    let probe = UdpSocket::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
    let port = probe.local_addr().unwrap().port();
    drop(probe);

    let config = ListenerConfig {
        port,
        ..loopback_config(MagicCheck::Require)
    };
    let discovery = tokio::spawn(discover(config, Duration::from_secs(5)));

    let tx = sender().await;
    let target = SocketAddr::from((Ipv4Addr::LOCALHOST, port));
    let record = loop {
        tx.send_to(&status(0x77, OCULUS_CHECK_ID), target).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        if discovery.is_finished() {
            break discovery.await.unwrap().unwrap();
        }
    };

    assert_eq!(record.device_id(), 0x77);
    assert_eq!(record.status.ip_addr, Ipv4Addr::new(10, 0, 0, 2));
    assert!(record.valid_count >= 1);
}

// ============================================================================
// Playback and Dispatch
// ============================================================================

#[test]
fn test_recording_with_corrupt_frames_keeps_streaming() {
    let mut recorder = FrameRecorder::new(Vec::new());
    recorder
        .record(&PingBuilder::new(Revision::Legacy, 4, 2).ping_id(1).build())
        .unwrap();
    // Well framed but internally inconsistent
    recorder
        .record(&PingBuilder::new(Revision::Current, 4, 2).image_size(3).build())
        .unwrap();
    recorder
        .record(&PingBuilder::new(Revision::Current, 8, 8).ping_id(3).build())
        .unwrap();
    let bytes = recorder.into_inner().unwrap();

    let ids = Arc::new(Mutex::new(Vec::new()));
    let mut dispatcher = PingDispatcher::new();
    let legacy_ids = ids.clone();
    dispatcher.on_legacy(move |ping| legacy_ids.lock().unwrap().push(ping.ping_id()));
    let current_ids = ids.clone();
    dispatcher.on_current(move |ping| current_ids.lock().unwrap().push(ping.ping_id()));

    for frame in FramePlayer::new(std::io::Cursor::new(bytes)) {
        let _ = dispatcher.supply(&frame.unwrap());
    }

    assert_eq!(*ids.lock().unwrap(), vec![1, 3]);
    let stats = dispatcher.stats();
    assert_eq!(stats.legacy, 1);
    assert_eq!(stats.current, 1);
    assert_eq!(stats.rejected.get(RejectKind::SizeMismatch), 1);
}

#[test]
fn test_playback_from_file() {
    let path = std::env::temp_dir().join(format!("oculus-rx-playback-{}.bin", std::process::id()));
    {
        let mut recorder = FrameRecorder::create(&path).unwrap();
        for id in 0..5 {
            let frame = PingBuilder::new(Revision::Current, 32, 16).ping_id(id).build();
            recorder.record(&frame).unwrap();
        }
        recorder.flush().unwrap();
    }

    let mut player = FramePlayer::open(&path).unwrap();
    let mut ids = Vec::new();
    while let Some(frame) = player.next_frame().unwrap() {
        ids.push(frame.decode().unwrap().ping_id());
    }
    std::fs::remove_file(&path).unwrap();

    assert_eq!(ids, vec![0, 1, 2, 3, 4]);
    assert_eq!(player.discarded(), 0);
}

#[test]
fn test_playback_from_file_with_frame_limit() {
    let path = std::env::temp_dir().join(format!("oculus-rx-limit-{}.bin", std::process::id()));
    {
        let mut recorder = FrameRecorder::create(&path).unwrap();
        recorder
            .record(&PingBuilder::new(Revision::Legacy, 2, 2).ping_id(1).build())
            .unwrap();
        recorder
            .record(&PingBuilder::new(Revision::Current, 32, 16).ping_id(2).build())
            .unwrap();
        recorder
            .record(&PingBuilder::new(Revision::Legacy, 2, 2).ping_id(3).build())
            .unwrap();
        recorder.flush().unwrap();
    }

    let config = AssemblerConfig { max_frame_len: 256 };
    let player = FramePlayer::open_with_config(&path, config).unwrap();
    let ids: Vec<u32> = player
        .map(|frame| frame.unwrap().decode().unwrap().ping_id())
        .collect();
    std::fs::remove_file(&path).unwrap();

    // The oversized ping is skipped, its neighbours survive
    assert_eq!(ids, vec![1, 3]);
}

#[test]
fn test_open_missing_recording_is_io_error() {
    let result = FramePlayer::open_with_config("/nonexistent/oculus.bin", AssemblerConfig::default());
    assert!(matches!(result, Err(RxError::Io(_))));
}

// ============================================================================
// Property Tests
// ============================================================================

mod proptest_tests {
    use super::*;
    use oculus_protocol::STATUS_MSG_SIZE;
    use oculus_rx::StatusTally;
    use proptest::prelude::*;

    proptest! {
        /// Any datagram that is not exactly one status message is invalid
        #[test]
        fn wrong_sized_datagrams_never_valid(
            bytes in proptest::collection::vec(any::<u8>(), 0..512)
                .prop_filter("must not be status sized", |b| b.len() != STATUS_MSG_SIZE),
            ignore in any::<bool>(),
        ) {
            let policy = if ignore { MagicCheck::Ignore } else { MagicCheck::Require };
            let mut tally = StatusTally::new(policy);
            let source = SocketAddr::from((Ipv4Addr::LOCALHOST, 1));
            prop_assert!(tally.ingest(&bytes, source).is_none());
            prop_assert_eq!(tally.counters(), StatusCounters { valid: 0, invalid: 1 });
        }

        /// Correctly sized datagrams are always delivered
        #[test]
        fn status_sized_datagrams_delivered(
            bytes in proptest::collection::vec(any::<u8>(), STATUS_MSG_SIZE),
        ) {
            let mut tally = StatusTally::new(MagicCheck::Require);
            let source = SocketAddr::from((Ipv4Addr::LOCALHOST, 1));
            let (record, valid) = tally.ingest(&bytes, source).unwrap();
            prop_assert_eq!(valid, record.status.magic_valid());
            prop_assert_eq!(record.valid_count + record.invalid_count, 1);
        }
    }
}
