//! Integration tests for the WebSocket stream client
//!
//! Each test runs a one-connection WebSocket server on 127.0.0.1 and checks:
//! - valid messages are forwarded as appends, malformed ones dropped
//! - remote close and transport failure are terminal
//! - teardown sends exactly one close frame however often close is requested

#[cfg(test)]
mod stream_client_tests {
    use chainpulse::state::SeriesMessage;
    use chainpulse::stream::{StreamClient, StreamState};
    use futures_util::{SinkExt, StreamExt};
    use std::future::Future;
    use std::time::Duration;
    use tokio::net::{TcpListener, TcpStream};
    use tokio::sync::{mpsc, oneshot, watch};
    use tokio::time::timeout;
    use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
    use tokio_tungstenite::tungstenite::protocol::CloseFrame;
    use tokio_tungstenite::tungstenite::Message;
    use tokio_tungstenite::{accept_async, WebSocketStream};

    const WAIT: Duration = Duration::from_secs(5);

    /// Accept a single WebSocket connection and hand it to `handler`
    async fn spawn_server<F, Fut>(handler: F) -> String
    where
        F: FnOnce(WebSocketStream<TcpStream>) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let ws = accept_async(tcp).await.unwrap();
            handler(ws).await;
        });

        format!("ws://{}/ws", addr)
    }

    /// Drain the socket, counting close frames received from the client
    async fn count_closes(ws: &mut WebSocketStream<TcpStream>) -> usize {
        let mut closes = 0;
        while let Some(Ok(message)) = ws.next().await {
            if let Message::Close(_) = message {
                closes += 1;
            }
        }
        closes
    }

    async fn wait_for_state<P>(states: &mut watch::Receiver<StreamState>, predicate: P) -> StreamState
    where
        P: Fn(&StreamState) -> bool,
    {
        timeout(WAIT, async {
            loop {
                let current = states.borrow_and_update().clone();
                if predicate(&current) {
                    return current;
                }
                states.changed().await.expect("stream task dropped its state");
            }
        })
        .await
        .expect("timed out waiting for stream state")
    }

    async fn next_append(rx: &mut mpsc::Receiver<SeriesMessage>) -> (u64, f64, f64) {
        match timeout(WAIT, rx.recv()).await.expect("timed out waiting for append") {
            Some(SeriesMessage::Append(point)) => (point.peer_count(), point.medium_fee_per_kb(), point.price()),
            other => panic!("expected Append, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_valid_messages_forwarded_malformed_dropped() {
        let (closes_tx, closes_rx) = oneshot::channel();
        let url = spawn_server(|mut ws| async move {
            ws.send(Message::Text(r#"{"peer_count": 1, "medium_fee_per_kb": 0.5, "price": 100}"#.into()))
                .await
                .unwrap();
            ws.send(Message::Text("not json at all".into())).await.unwrap();
            ws.send(Message::Text(r#"{"peer_count": -3, "medium_fee_per_kb": 0.5, "price": 100}"#.into()))
                .await
                .unwrap();
            ws.send(Message::Binary(
                br#"{"peer_count": 2, "medium_fee_per_kb": 0.6, "price": 101}"#.to_vec(),
            ))
            .await
            .unwrap();
            let _ = closes_tx.send(count_closes(&mut ws).await);
        })
        .await;

        let (tx, mut rx) = mpsc::channel(16);
        let client = StreamClient::connect(url, tx);

        assert_eq!(next_append(&mut rx).await, (1, 0.5, 100.0));
        assert_eq!(next_append(&mut rx).await, (2, 0.6, 101.0));
        assert_eq!(client.state(), StreamState::Open);

        // Nothing else was forwarded
        assert!(rx.try_recv().is_err());

        client.shutdown().await;
        assert_eq!(timeout(WAIT, closes_rx).await.unwrap().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_close_is_idempotent_and_sent_once() {
        let (closes_tx, closes_rx) = oneshot::channel();
        let url = spawn_server(|mut ws| async move {
            let _ = closes_tx.send(count_closes(&mut ws).await);
        })
        .await;

        let (tx, _rx) = mpsc::channel(16);
        let mut client = StreamClient::connect(url, tx);
        let mut states = client.subscribe();
        wait_for_state(&mut states, |s| *s == StreamState::Open).await;

        assert!(client.close());
        assert!(!client.close());
        drop(client);

        wait_for_state(&mut states, |s| *s == StreamState::Terminated).await;
        assert_eq!(timeout(WAIT, closes_rx).await.unwrap().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_remote_close_is_terminal() {
        let url = spawn_server(|mut ws| async move {
            ws.close(Some(CloseFrame {
                code: CloseCode::Away,
                reason: "going away".into(),
            }))
            .await
            .unwrap();
            while let Some(Ok(_)) = ws.next().await {}
        })
        .await;

        let (tx, mut rx) = mpsc::channel(16);
        let mut client = StreamClient::connect(url, tx);
        let mut states = client.subscribe();

        let closed = wait_for_state(&mut states, |s| matches!(s, StreamState::Closed { .. })).await;
        assert_eq!(
            closed,
            StreamState::Closed {
                code: Some(1001),
                reason: "going away".to_string()
            }
        );
        assert!(rx.try_recv().is_err());

        // Stays closed until released; no reconnect
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(matches!(client.state(), StreamState::Closed { .. }));

        assert!(client.close());
        wait_for_state(&mut states, |s| *s == StreamState::Terminated).await;
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_errors() {
        // Reserve a port, then free it so nothing is listening
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let (tx, mut rx) = mpsc::channel(16);
        let client = StreamClient::connect(format!("ws://{}/ws", addr), tx);
        let mut states = client.subscribe();

        let errored = wait_for_state(&mut states, |s| matches!(s, StreamState::Errored(_))).await;
        assert!(!errored.is_live());

        client.shutdown().await;
        assert!(matches!(rx.recv().await, None));
    }
}
