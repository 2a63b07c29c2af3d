//! Integration tests — full pipeline runs, reconnect behavior, and
//! large-frame transport over a real TCP connection on localhost.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use bytes::Bytes;
use vstream_core::{
    CapturePump, DecodedFrame, EncodedFrame, FrameBuffer, Metrics, NullSink, OverflowPolicy,
    PatternSource, PlaybackPump, ReceivePump, SenderConnection, SessionInfo, TransmitPump,
};

// ── Helpers ──────────────────────────────────────────────────────

struct Receiver {
    addr: std::net::SocketAddr,
    buffer: Arc<FrameBuffer<DecodedFrame>>,
    metrics: Arc<Metrics>,
    session_rx: tokio::sync::watch::Receiver<Option<SessionInfo>>,
    handle: tokio::task::JoinHandle<Result<(), vstream_core::StreamError>>,
}

/// Spin up a receive pump on an OS-assigned port.
async fn spawn_receiver(running: &Arc<AtomicBool>) -> Receiver {
    let buffer = Arc::new(FrameBuffer::new(5, OverflowPolicy::DropOldest));
    let metrics = Arc::new(Metrics::new());
    let mut pump = ReceivePump::bind(
        "127.0.0.1:0".parse().unwrap(),
        Arc::clone(&buffer),
        Arc::clone(&metrics),
        Arc::clone(running),
    )
    .await
    .unwrap();
    let addr = pump.local_addr().unwrap();
    let session_rx = pump.session_watch();
    let handle = tokio::spawn(async move { pump.run().await });
    Receiver {
        addr,
        buffer,
        metrics,
        session_rx,
        handle,
    }
}

async fn wait_until(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
    tokio::time::timeout(timeout, async {
        while !cond() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .is_ok()
}

// ── End-to-end pipeline ──────────────────────────────────────────

#[tokio::test]
async fn end_to_end_pipeline_delivers_frames() {
    let running = Arc::new(AtomicBool::new(true));
    let rx = spawn_receiver(&running).await;

    // Sender side: synthetic source → capture → buffer → transmit.
    let send_buffer = Arc::new(FrameBuffer::new(5, OverflowPolicy::RejectNewest));
    let send_metrics = Arc::new(Metrics::new());
    let mut capture = CapturePump::new(
        PatternSource::new(64, 48, 30.0),
        Arc::clone(&send_buffer),
        Arc::clone(&send_metrics),
        Arc::clone(&running),
        30.0,
        1.0,
        80,
    );
    let session = capture.session_info();
    let mut transmit = TransmitPump::new(
        rx.addr,
        session.clone(),
        Arc::clone(&send_buffer),
        Arc::clone(&send_metrics),
        Arc::clone(&running),
    );
    let capture_handle = tokio::spawn(async move { capture.run().await });
    let transmit_handle = tokio::spawn(async move { transmit.run().await });

    // Receiver side: playback drains into a null sink.
    let mut playback = PlaybackPump::new(
        Arc::clone(&rx.buffer),
        Box::new(NullSink),
        Arc::clone(&rx.metrics),
        Arc::clone(&running),
        rx.session_rx.clone(),
        None,
    );
    let playback_handle = tokio::spawn(async move { playback.run().await });

    let rx_metrics = Arc::clone(&rx.metrics);
    assert!(
        wait_until(Duration::from_secs(10), || {
            rx_metrics.snapshot().frames_displayed >= 5
        })
        .await,
        "pipeline never delivered frames"
    );

    let snap = rx.metrics.snapshot();
    assert!(snap.frames_received >= snap.frames_displayed);
    assert_eq!(snap.resolution.as_deref(), Some("64x48"));
    assert_eq!(rx.session_rx.borrow().as_ref(), Some(&session));

    running.store(false, Ordering::SeqCst);
    capture_handle.await.unwrap().unwrap();
    transmit_handle.await.unwrap().unwrap();
    playback_handle.await.unwrap().unwrap();
    rx.handle.await.unwrap().unwrap();
}

// ── Playback pacing ──────────────────────────────────────────────

struct TimestampSink(Arc<std::sync::Mutex<Vec<std::time::Instant>>>);

impl vstream_core::DisplaySink for TimestampSink {
    fn present(&mut self, _frame: &DecodedFrame) -> Result<(), vstream_core::StreamError> {
        self.0.lock().unwrap().push(std::time::Instant::now());
        Ok(())
    }
}

#[tokio::test]
async fn playback_paces_frames_at_the_session_interval() {
    let fps = 20.0;
    let frames = 10usize;
    let running = Arc::new(AtomicBool::new(true));
    let buffer = Arc::new(FrameBuffer::new(16, OverflowPolicy::DropOldest));
    for _ in 0..frames {
        buffer.push(DecodedFrame::new(image::RgbImage::new(8, 8)));
    }
    let shown = Arc::new(std::sync::Mutex::new(Vec::new()));
    let (_tx, session_rx) =
        tokio::sync::watch::channel(Some(SessionInfo::new(8, 8, fps, 80)));

    let mut playback = PlaybackPump::new(
        Arc::clone(&buffer),
        Box::new(TimestampSink(Arc::clone(&shown))),
        Arc::new(Metrics::new()),
        Arc::clone(&running),
        session_rx,
        None,
    );
    let handle = tokio::spawn(async move { playback.run().await });

    let probe = Arc::clone(&shown);
    assert!(
        wait_until(Duration::from_secs(10), || probe.lock().unwrap().len() >= frames).await,
        "playback never drained the buffer"
    );
    running.store(false, Ordering::SeqCst);
    handle.await.unwrap().unwrap();

    // Mean inter-frame gap should sit near 1/fps. Loose bounds: sleep
    // never undershoots the interval by much, and CI jitter only adds.
    let stamps = shown.lock().unwrap();
    let gaps: Vec<f64> = stamps
        .windows(2)
        .map(|w| (w[1] - w[0]).as_secs_f64())
        .collect();
    let mean = gaps.iter().sum::<f64>() / gaps.len() as f64;
    let interval = 1.0 / fps;
    assert!(
        mean >= interval * 0.7 && mean <= interval * 2.0,
        "mean inter-frame gap {mean:.4}s, expected near {interval:.4}s"
    );
}

// ── Reconnect ────────────────────────────────────────────────────

#[tokio::test]
async fn each_connection_starts_with_its_own_handshake() {
    let running = Arc::new(AtomicBool::new(true));
    let rx = spawn_receiver(&running).await;
    let mut session_rx = rx.session_rx.clone();

    let session = SessionInfo::new(32, 32, 30.0, 75);
    let frame = EncodedFrame::from_image(
        &image::RgbImage::from_pixel(32, 32, image::Rgb([40, 80, 120])),
        75,
    )
    .unwrap();

    // First connection: handshake plus two frames.
    let mut conn = SenderConnection::establish(rx.addr, &session).await.unwrap();
    conn.send(frame.payload.clone()).await.unwrap();
    conn.send(frame.payload.clone()).await.unwrap();
    tokio::time::timeout(Duration::from_secs(5), session_rx.changed())
        .await
        .expect("first handshake not seen")
        .unwrap();
    drop(conn);

    // Second connection must re-handshake before its frame.
    let mut conn = SenderConnection::establish(rx.addr, &session).await.unwrap();
    conn.send(frame.payload.clone()).await.unwrap();
    tokio::time::timeout(Duration::from_secs(5), session_rx.changed())
        .await
        .expect("second handshake not seen")
        .unwrap();
    assert_eq!(session_rx.borrow().as_ref(), Some(&session));

    let rx_metrics = Arc::clone(&rx.metrics);
    assert!(
        wait_until(Duration::from_secs(5), || {
            rx_metrics.snapshot().frames_received >= 3
        })
        .await,
        "frames from both connections not received"
    );

    running.store(false, Ordering::SeqCst);
    drop(conn);
    rx.handle.await.unwrap().unwrap();
}

// ── Large frames ─────────────────────────────────────────────────

#[tokio::test]
async fn multi_segment_frame_survives_transport_intact() {
    let running = Arc::new(AtomicBool::new(true));
    let rx = spawn_receiver(&running).await;

    // Big enough to span many TCP segments.
    let image = image::RgbImage::from_fn(1280, 720, |x, y| {
        image::Rgb([(x % 251) as u8, (y % 241) as u8, ((x ^ y) % 239) as u8])
    });
    let frame = EncodedFrame::from_image(&image, 95).unwrap();
    assert!(frame.len() > 64 * 1024);

    let session = SessionInfo::new(1280, 720, 10.0, 95);
    let mut conn = SenderConnection::establish(rx.addr, &session).await.unwrap();
    conn.send(frame.payload.clone()).await.unwrap();

    let buffer = Arc::clone(&rx.buffer);
    assert!(
        wait_until(Duration::from_secs(10), || buffer.len() > 0).await,
        "large frame never arrived"
    );
    let decoded = rx.buffer.pop().unwrap();
    assert_eq!(decoded.image.dimensions(), (1280, 720));

    running.store(false, Ordering::SeqCst);
    drop(conn);
    rx.handle.await.unwrap().unwrap();
}

// ── Transmit keeps running across a receiver restart ─────────────

#[tokio::test]
async fn transmit_reconnects_after_receiver_restart() {
    let rx_running = Arc::new(AtomicBool::new(true));
    let tx_running = Arc::new(AtomicBool::new(true));
    let rx = spawn_receiver(&rx_running).await;

    let session = SessionInfo::new(16, 16, 60.0, 80);
    let send_buffer = Arc::new(FrameBuffer::new(64, OverflowPolicy::RejectNewest));
    let send_metrics = Arc::new(Metrics::new());
    let mut transmit = TransmitPump::new(
        rx.addr,
        session.clone(),
        Arc::clone(&send_buffer),
        Arc::clone(&send_metrics),
        Arc::clone(&tx_running),
    );
    let transmit_handle = tokio::spawn(async move { transmit.run().await });

    let frame = EncodedFrame::new(Bytes::from_static(b"not-a-real-jpeg"));
    let feeder_buffer = Arc::clone(&send_buffer);
    let feeder_running = Arc::clone(&tx_running);
    let feeder_frame = frame.clone();
    let feeder = tokio::spawn(async move {
        while feeder_running.load(Ordering::SeqCst) {
            feeder_buffer.push(feeder_frame.clone());
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    });

    // Undecodable payloads still count as received, then dropped.
    let rx_metrics = Arc::clone(&rx.metrics);
    assert!(
        wait_until(Duration::from_secs(10), || {
            rx_metrics.snapshot().frames_received >= 2
        })
        .await,
        "first connection never carried frames"
    );
    let snap = rx.metrics.snapshot();
    assert_eq!(snap.frames_received, snap.frames_dropped);

    // Kill the receiver and bring a fresh one up on the same port.
    rx_running.store(false, Ordering::SeqCst);
    rx.handle.await.unwrap().unwrap();

    let rx2_running = Arc::new(AtomicBool::new(true));
    let rx2_buffer = Arc::new(FrameBuffer::new(5, OverflowPolicy::DropOldest));
    let rx2_metrics = Arc::new(Metrics::new());
    let mut pump2 = ReceivePump::bind(
        rx.addr,
        Arc::clone(&rx2_buffer),
        Arc::clone(&rx2_metrics),
        Arc::clone(&rx2_running),
    )
    .await
    .unwrap();
    let session_rx2 = pump2.session_watch();
    let rx2_handle = tokio::spawn(async move { pump2.run().await });

    // The transmit pump must reconnect and re-handshake on its own.
    let probe = Arc::clone(&rx2_metrics);
    assert!(
        wait_until(Duration::from_secs(15), || {
            probe.snapshot().frames_received >= 1
        })
        .await,
        "transmit pump never reconnected"
    );
    assert_eq!(session_rx2.borrow().as_ref(), Some(&session));

    tx_running.store(false, Ordering::SeqCst);
    rx2_running.store(false, Ordering::SeqCst);
    feeder.await.unwrap();
    transmit_handle.await.unwrap().unwrap();
    rx2_handle.await.unwrap().unwrap();
}
