//! Event channel tests against a mock WebSocket server.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use mailpit_client::{Client, Event, EventType};
use parking_lot::Mutex;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;

/// A WebSocket server that pushes queued frames to whichever client is
/// currently connected, counting accepted connections.
struct MockEventServer {
    addr: SocketAddr,
    frames_tx: mpsc::UnboundedSender<String>,
    accepted: Arc<AtomicUsize>,
}

impl MockEventServer {
    async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (frames_tx, mut frames_rx) = mpsc::unbounded_channel::<String>();
        let accepted = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&accepted);
        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    return;
                };
                counter.fetch_add(1, Ordering::SeqCst);
                let Ok(mut socket) = tokio_tungstenite::accept_async(stream).await else {
                    continue;
                };
                loop {
                    tokio::select! {
                        frame = frames_rx.recv() => match frame {
                            Some(text) => {
                                if socket.send(Message::Text(text.into())).await.is_err() {
                                    break;
                                }
                            }
                            None => return,
                        },
                        message = socket.next() => match message {
                            Some(Ok(_)) => {}
                            // Client went away; wait for the next connection.
                            _ => break,
                        }
                    }
                }
            }
        });

        Self {
            addr,
            frames_tx,
            accepted,
        }
    }

    fn client(&self) -> Client {
        Client::new(format!("http://{}", self.addr)).unwrap()
    }

    fn push(&self, frame: &str) {
        self.frames_tx.send(frame.to_string()).unwrap();
    }

    fn connections(&self) -> usize {
        self.accepted.load(Ordering::SeqCst)
    }
}

/// Polls `condition` until it holds or five seconds pass.
async fn wait_until(condition: impl Fn() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !condition() {
        if tokio::time::Instant::now() > deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    true
}

#[tokio::test]
async fn pushed_frames_fan_out_to_exact_and_wildcard_listeners() {
    let server = MockEventServer::start().await;
    let client = server.client();

    let all_events: Arc<Mutex<Vec<Event>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&all_events);
    client.on_event("*", move |event| {
        sink.lock().push(event.clone());
    });

    let new_hits = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&new_hits);
    client.on_event("new", move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    client.connect_websocket();
    assert!(wait_until(|| server.connections() == 1).await);

    server.push(r#"{"Type":"new","Data":{"ID":"m1"}}"#);
    server.push(r#"{"Type":"stats","Data":{"Total":1,"Unread":1,"Version":"v1"}}"#);

    assert!(wait_until(|| all_events.lock().len() == 2).await);
    {
        let events = all_events.lock();
        assert!(events.iter().any(|event| event.kind == EventType::New));
        assert!(events.iter().any(|event| event.kind == EventType::Stats));
    }
    assert_eq!(new_hits.load(Ordering::SeqCst), 1);
    client.disconnect();
}

#[tokio::test]
async fn malformed_frames_are_dropped_silently() {
    let server = MockEventServer::start().await;
    let client = server.client();

    let hits = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&hits);
    client.on_event("*", move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    client.connect_websocket();
    assert!(wait_until(|| server.connections() == 1).await);

    server.push("this is not json");
    server.push(r#"{"Data": 1}"#);
    server.push(r#"{"Type":"delete","Data":{"IDs":["m1"]}}"#);

    // The valid frame is last, so once it arrives the bad ones are behind us.
    assert!(wait_until(|| hits.load(Ordering::SeqCst) == 1).await);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(hits.load(Ordering::SeqCst), 1);
    client.disconnect();
}

#[tokio::test]
async fn repeated_connect_reuses_the_connection() {
    let server = MockEventServer::start().await;
    let client = server.client();

    let hits = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&hits);
    client.on_event("new", move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    client.connect_websocket();
    client.connect_websocket();
    assert!(wait_until(|| server.connections() == 1).await);

    server.push(r#"{"Type":"new","Data":null}"#);
    assert!(wait_until(|| hits.load(Ordering::SeqCst) == 1).await);

    // A second transport or doubled handler would dispatch twice.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(hits.load(Ordering::SeqCst), 1);
    assert_eq!(server.connections(), 1);
    client.disconnect();
}

#[tokio::test]
async fn wait_for_event_resolves_end_to_end() {
    let server = MockEventServer::start().await;
    let client = Arc::new(server.client());

    let waiter = Arc::clone(&client);
    let wait = tokio::spawn(async move { waiter.wait_for_event("new").await });

    assert!(wait_until(|| server.connections() == 1).await);
    server.push(r#"{"Type":"new","Data":{"ID":"m1"}}"#);

    let event = wait.await.unwrap().unwrap();
    assert_eq!(event.kind, EventType::New);
    assert_eq!(event.data, serde_json::json!({"ID": "m1"}));
    client.disconnect();
}

#[tokio::test]
async fn disconnect_is_idempotent_and_subscriptions_survive_it() {
    let server = MockEventServer::start().await;
    let client = server.client();

    let hits = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&hits);
    client.on_event("*", move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    client.connect_websocket();
    assert!(wait_until(|| server.connections() == 1).await);
    server.push(r#"{"Type":"new","Data":null}"#);
    assert!(wait_until(|| hits.load(Ordering::SeqCst) == 1).await);

    client.disconnect();
    // Disconnecting twice, or with nothing connected, must not panic.
    client.disconnect();

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(hits.load(Ordering::SeqCst), 1);

    // The same listener keeps working on a fresh connection.
    client.connect_websocket();
    assert!(wait_until(|| server.connections() == 2).await);
    server.push(r#"{"Type":"stats","Data":{}}"#);
    assert!(wait_until(|| hits.load(Ordering::SeqCst) >= 2).await);
    client.disconnect();
}

#[tokio::test]
async fn unsubscribed_listener_receives_nothing_more() {
    let server = MockEventServer::start().await;
    let client = server.client();

    let hits = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&hits);
    let subscription = client.on_event("*", move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    client.connect_websocket();
    assert!(wait_until(|| server.connections() == 1).await);
    server.push(r#"{"Type":"new","Data":null}"#);
    assert!(wait_until(|| hits.load(Ordering::SeqCst) == 1).await);

    subscription.unsubscribe();
    subscription.unsubscribe();

    server.push(r#"{"Type":"new","Data":null}"#);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(hits.load(Ordering::SeqCst), 1);
    client.disconnect();
}
