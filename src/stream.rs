use {
    crate::{
        series::{DataPoint, RawRecord},
        state::SeriesMessage,
    },
    chrono::Local,
    futures_util::StreamExt,
    tokio::{
        sync::{mpsc, oneshot, watch},
        task::JoinHandle,
    },
    tokio_tungstenite::{connect_async, tungstenite::Message},
};

/// Lifecycle of one stream connection.
///
/// There is no path back to `Connecting`; a new connection needs a new client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamState {
    Connecting,
    Open,
    /// Transport failure; nothing more is processed
    Errored(String),
    /// Remote or explicit close
    Closed { code: Option<u16>, reason: String },
    /// Released by the owner
    Terminated,
}

impl StreamState {
    /// Still able to deliver points
    pub fn is_live(&self) -> bool {
        matches!(self, StreamState::Connecting | StreamState::Open)
    }

    pub fn label(&self) -> &'static str {
        match self {
            StreamState::Connecting => "Connecting",
            StreamState::Open => "Connected",
            StreamState::Errored(_) => "Errored",
            StreamState::Closed { .. } => "Closed",
            StreamState::Terminated => "Terminated",
        }
    }
}

/// Connection callbacks as data
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    Opened,
    Message(Vec<u8>),
    TransportError(String),
    Closed { code: Option<u16>, reason: String },
}

/// Transition table for [`StreamState`], one handler per transition
#[derive(Debug)]
pub struct StreamMachine {
    state: StreamState,
    received: u64,
    dropped: u64,
}

impl Default for StreamMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamMachine {
    pub fn new() -> Self {
        Self {
            state: StreamState::Connecting,
            received: 0,
            dropped: 0,
        }
    }

    pub fn state(&self) -> &StreamState {
        &self.state
    }

    /// Messages accepted so far
    pub fn received(&self) -> u64 {
        self.received
    }

    /// Messages dropped because they failed to parse
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Apply an event; returns the point to append, if the event produced one
    pub fn on_event(&mut self, event: StreamEvent) -> Option<DataPoint> {
        let connecting = self.state == StreamState::Connecting;
        let open = self.state == StreamState::Open;

        match event {
            StreamEvent::Opened if connecting => {
                self.on_open();
                None
            }
            StreamEvent::Message(payload) if open => self.on_message(&payload),
            StreamEvent::TransportError(reason) if connecting || open => {
                self.on_transport_error(reason);
                None
            }
            StreamEvent::Closed { code, reason } if open => {
                self.on_close(code, reason);
                None
            }
            event => {
                log::debug!("Ignoring {:?} while {:?}", event, self.state);
                None
            }
        }
    }

    /// Move to `Terminated`. Returns `false` if already terminated.
    pub fn terminate(&mut self) -> bool {
        if self.state == StreamState::Terminated {
            return false;
        }
        self.state = StreamState::Terminated;
        true
    }

    fn on_open(&mut self) {
        log::info!("✅ WebSocket connection opened");
        self.state = StreamState::Open;
    }

    fn on_message(&mut self, payload: &[u8]) -> Option<DataPoint> {
        match RawRecord::parse(payload) {
            Ok(record) => {
                self.received += 1;
                Some(record.stamp(Local::now()))
            }
            Err(e) => {
                self.dropped += 1;
                log::warn!(
                    "Failed to parse WebSocket message ({}): {}",
                    e,
                    String::from_utf8_lossy(payload)
                );
                None
            }
        }
    }

    fn on_transport_error(&mut self, reason: String) {
        log::error!("❌ WebSocket error: {}", reason);
        self.state = StreamState::Errored(reason);
    }

    fn on_close(&mut self, code: Option<u16>, reason: String) {
        log::error!(
            "WebSocket connection closed: code={} reason='{}'",
            code.map(|c| c.to_string()).unwrap_or_else(|| "none".to_string()),
            reason
        );
        self.state = StreamState::Closed { code, reason };
    }
}

/// Owner of one live WebSocket connection.
///
/// Dropping the client closes the connection.
pub struct StreamClient {
    url: String,
    state: watch::Receiver<StreamState>,
    close_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl StreamClient {
    /// Spawn the connection task. Must be called inside a tokio runtime.
    pub fn connect(url: impl Into<String>, sink: mpsc::Sender<SeriesMessage>) -> Self {
        let url = url.into();
        let (state_tx, state_rx) = watch::channel(StreamState::Connecting);
        let (close_tx, close_rx) = oneshot::channel();

        let task = tokio::spawn(run_connection(url.clone(), sink, state_tx, close_rx));

        Self {
            url,
            state: state_rx,
            close_tx: Some(close_tx),
            task: Some(task),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn state(&self) -> StreamState {
        self.state.borrow().clone()
    }

    /// Watch channel of state transitions, for status displays
    pub fn subscribe(&self) -> watch::Receiver<StreamState> {
        self.state.clone()
    }

    /// Release the connection. Safe to call any number of times; only the
    /// first call has an effect and returns `true`.
    pub fn close(&mut self) -> bool {
        match self.close_tx.take() {
            Some(tx) => {
                log::info!("🔌 Closing stream connection to {}", self.url);
                let _ = tx.send(());
                true
            }
            None => false,
        }
    }

    /// Close and wait for the connection task to finish
    pub async fn shutdown(mut self) {
        self.close();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                log::warn!("Stream task ended abnormally: {}", e);
            }
        }
    }
}

impl Drop for StreamClient {
    fn drop(&mut self) {
        self.close();
    }
}

async fn run_connection(
    url: String,
    sink: mpsc::Sender<SeriesMessage>,
    state_tx: watch::Sender<StreamState>,
    mut close_rx: oneshot::Receiver<()>,
) {
    let mut machine = StreamMachine::new();
    log::info!("🔌 Connecting to WebSocket: {}", url);

    let connected = tokio::select! {
        biased;
        _ = &mut close_rx => None,
        result = connect_async(url.as_str()) => Some(result),
    };

    let mut socket = match connected {
        None => {
            terminate(&mut machine, &state_tx);
            return;
        }
        Some(Ok((socket, _response))) => {
            machine.on_event(StreamEvent::Opened);
            state_tx.send_replace(machine.state().clone());
            socket
        }
        Some(Err(e)) => {
            machine.on_event(StreamEvent::TransportError(e.to_string()));
            state_tx.send_replace(machine.state().clone());
            let _ = close_rx.await;
            terminate(&mut machine, &state_tx);
            return;
        }
    };

    loop {
        tokio::select! {
            biased;

            _ = &mut close_rx => {
                // Owner released us while the socket is still open
                if let Err(e) = socket.close(None).await {
                    log::debug!("Close frame not delivered: {}", e);
                }
                terminate(&mut machine, &state_tx);
                return;
            }

            frame = socket.next() => {
                let event = match frame {
                    Some(Ok(Message::Text(text))) => StreamEvent::Message(text.into_bytes()),
                    Some(Ok(Message::Binary(bytes))) => StreamEvent::Message(bytes),
                    Some(Ok(Message::Close(frame))) => StreamEvent::Closed {
                        code: frame.as_ref().map(|f| u16::from(f.code)),
                        reason: frame.map(|f| f.reason.into_owned()).unwrap_or_default(),
                    },
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => StreamEvent::TransportError(e.to_string()),
                    None => StreamEvent::Closed {
                        code: None,
                        reason: "stream ended".to_string(),
                    },
                };

                if let Some(point) = machine.on_event(event) {
                    if sink.send(SeriesMessage::Append(point)).await.is_err() {
                        log::debug!("Series task gone; dropping streamed point");
                    }
                }

                if !machine.state().is_live() {
                    state_tx.send_replace(machine.state().clone());
                    break;
                }
            }
        }
    }
    drop(socket);

    log::info!(
        "Stream stopped after {} points ({} dropped); waiting for teardown",
        machine.received(),
        machine.dropped()
    );
    let _ = close_rx.await;
    terminate(&mut machine, &state_tx);
}

fn terminate(machine: &mut StreamMachine, state_tx: &watch::Sender<StreamState>) {
    if machine.terminate() {
        state_tx.send_replace(StreamState::Terminated);
    }
}
