//! End-to-end tests: a real StreamingSession with in-memory gateways, served
//! over a loopback WebSocket.
//!
//! No X server is needed; capture, encode and injection are the mocks from
//! `screen_relay_server::infrastructure::mock`.

use std::sync::{atomic::AtomicBool, atomic::Ordering, Arc};
use std::time::{Duration, Instant};

use futures_util::{SinkExt, StreamExt};
use tokio::time::timeout;
use tokio_tungstenite::{connect_async, tungstenite::Message};

use screen_relay_core::{Keysym, PointerButton, SessionParams};
use screen_relay_server::application::{DiagnosticsOptions, SessionGateways, StreamingSession};
use screen_relay_server::infrastructure::mock::{
    FixedSizeEncoder, InjectedInput, MockInputInjector, ScriptedCapturer,
};
use screen_relay_server::infrastructure::{bind_listener, serve};

const FRAME_BYTES: usize = 256;
const WAIT: Duration = Duration::from_secs(5);

fn start_session(injector: Arc<MockInputInjector>) -> StreamingSession {
    StreamingSession::start(
        SessionParams {
            target_fps: 20,
            capture_multiplier: 2.0,
            size_budget_bytes: 60 * 1024,
        },
        SessionGateways {
            capturer: Box::new(ScriptedCapturer::solid(16, 16, 0xFF20_4060)),
            encoder: Box::new(FixedSizeEncoder::new(FRAME_BYTES)),
            injector,
        },
        DiagnosticsOptions::default(),
    )
    .unwrap()
}

/// Polls `condition` until it holds or [`WAIT`] elapses.
async fn eventually(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + WAIT;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}

#[test]
fn test_session_publishes_frames_within_budget() {
    // Arrange
    let session = start_session(Arc::new(MockInputInjector::new()));

    // Act
    let deadline = Instant::now() + WAIT;
    let mut latest = None;
    while latest.is_none() && Instant::now() < deadline {
        latest = session.mailbox().latest();
        std::thread::sleep(Duration::from_millis(10));
    }

    // Assert
    let frame = latest.expect("no frame published");
    assert_eq!(frame.len(), FRAME_BYTES);
    assert!(session.stats().quality() >= 1);
    session.shutdown();
}

#[tokio::test]
async fn test_viewer_receives_frames_and_drives_session() {
    // Arrange: session + server on an ephemeral port
    let injector = Arc::new(MockInputInjector::new());
    let session = start_session(Arc::clone(&injector));
    let listener = bind_listener("127.0.0.1:0".parse().unwrap()).await.unwrap();
    let addr = listener.local_addr().unwrap();
    let running = Arc::new(AtomicBool::new(true));
    let server = tokio::spawn(serve(
        listener,
        Arc::clone(session.registry()),
        session.control_channel(),
        Arc::clone(&running),
    ));

    let (mut ws, _) = connect_async(format!("ws://{addr}")).await.unwrap();

    // Act / Assert: a binary frame arrives
    let frame = timeout(WAIT, async {
        loop {
            match ws.next().await {
                Some(Ok(Message::Binary(bytes))) => break bytes,
                Some(Ok(_)) => continue,
                other => panic!("stream ended before a frame arrived: {other:?}"),
            }
        }
    })
    .await
    .unwrap();
    assert_eq!(frame.len(), FRAME_BYTES);

    // Act / Assert: parameter commands reach the session
    ws.send(Message::Text("f 30".into())).await.unwrap();
    ws.send(Message::Text("q 90".into())).await.unwrap();
    let control = Arc::clone(session.control());
    assert!(
        eventually(|| {
            let params = control.params();
            params.target_fps == 30 && params.size_budget_bytes == 90 * 1024
        })
        .await
    );

    // Act / Assert: input commands reach the injector in order
    ws.send(Message::Text("2+1+KeyA".into())).await.unwrap();
    ws.send(Message::Text("1+5+-3".into())).await.unwrap();
    ws.send(Message::Text("3+0+1".into())).await.unwrap();
    assert!(eventually(|| injector.events().len() == 3).await);
    assert_eq!(
        injector.events(),
        vec![
            InjectedInput::Key(Keysym(0x61), true),
            InjectedInput::Motion(5, -3),
            InjectedInput::Button(PointerButton::Primary, false),
        ]
    );

    // Act / Assert: malformed commands change nothing
    ws.send(Message::Text("z nonsense".into())).await.unwrap();
    ws.send(Message::Text("f 0".into())).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(control.params().target_fps, 30);

    // Act / Assert: closing unregisters the viewer
    ws.close(None).await.unwrap();
    let registry = Arc::clone(session.registry());
    assert!(eventually(|| registry.is_empty()).await);

    // Cleanup
    running.store(false, Ordering::Relaxed);
    assert!(timeout(WAIT, server).await.unwrap().unwrap().is_ok());
    session.shutdown();
}

#[tokio::test]
async fn test_every_viewer_receives_the_stream() {
    // Arrange
    let session = start_session(Arc::new(MockInputInjector::new()));
    let listener = bind_listener("127.0.0.1:0".parse().unwrap()).await.unwrap();
    let addr = listener.local_addr().unwrap();
    let running = Arc::new(AtomicBool::new(true));
    let server = tokio::spawn(serve(
        listener,
        Arc::clone(session.registry()),
        session.control_channel(),
        Arc::clone(&running),
    ));

    // Act
    let (mut first, _) = connect_async(format!("ws://{addr}")).await.unwrap();
    let (mut second, _) = connect_async(format!("ws://{addr}")).await.unwrap();

    // Assert
    for ws in [&mut first, &mut second] {
        let got_frame = timeout(WAIT, async {
            loop {
                if let Some(Ok(Message::Binary(bytes))) = ws.next().await {
                    break bytes.len();
                }
            }
        })
        .await
        .unwrap();
        assert_eq!(got_frame, FRAME_BYTES);
    }
    let registry = Arc::clone(session.registry());
    assert!(eventually(|| registry.len() == 2).await);

    // Cleanup: dropping one socket removes only that viewer
    drop(first);
    assert!(eventually(|| registry.len() == 1).await);

    running.store(false, Ordering::Relaxed);
    let _ = timeout(WAIT, server).await;
    session.shutdown();
}
