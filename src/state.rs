use {
    crate::series::{DataPoint, SeriesBuffer},
    std::sync::Arc,
    tokio::sync::{mpsc, oneshot, watch},
};

/// Message sent by the snapshot loader and the stream client to the series task
#[derive(Debug, Clone)]
pub enum SeriesMessage {
    /// Replace the series with a snapshot
    Initialize(Vec<DataPoint>),
    /// One streamed point
    Append(DataPoint),
}

/// Read-only view handed to renderers.
///
/// Every published value is an immutable snapshot of the series.
#[derive(Debug, Clone)]
pub struct SeriesView {
    receiver: watch::Receiver<Arc<[DataPoint]>>,
}

impl SeriesView {
    /// Current ordered series (0 to `SERIES_CAPACITY` points)
    pub fn current(&self) -> Arc<[DataPoint]> {
        self.receiver.borrow().clone()
    }

    /// Wait until the series changes.
    ///
    /// Returns `false` once the owning series task has stopped.
    pub async fn changed(&mut self) -> bool {
        self.receiver.changed().await.is_ok()
    }
}

/// Create the publishing side and the view for an empty series
pub fn series_channel() -> (watch::Sender<Arc<[DataPoint]>>, SeriesView) {
    let empty: Arc<[DataPoint]> = Arc::from(Vec::new());
    let (sender, receiver) = watch::channel(empty);
    (sender, SeriesView { receiver })
}

/// Background task owning the series buffer.
///
/// All mutations arrive through `receiver` and are applied one at a time, in
/// delivery order. The shutdown signal is checked before each message so
/// nothing queued is applied after teardown.
pub async fn series_task(
    mut receiver: mpsc::Receiver<SeriesMessage>,
    publisher: watch::Sender<Arc<[DataPoint]>>,
    mut shutdown: oneshot::Receiver<()>,
) {
    log::info!("Series task started");
    let mut buffer = SeriesBuffer::new();

    loop {
        tokio::select! {
            biased;

            _ = &mut shutdown => {
                log::info!("Series task received shutdown signal");
                break;
            }

            message = receiver.recv() => {
                let Some(message) = message else {
                    log::info!("All series producers dropped");
                    break;
                };
                apply(&mut buffer, message);
                publisher.send_replace(Arc::from(buffer.current_series()));
            }
        }
    }

    log::info!("Series task stopped ({} points at teardown)", buffer.len());
}

fn apply(buffer: &mut SeriesBuffer, message: SeriesMessage) {
    match message {
        SeriesMessage::Initialize(points) => {
            let count = points.len();
            let overwritten = buffer.initialize(points);
            if overwritten > 0 {
                // Snapshot resolved after the stream had started
                log::warn!(
                    "⚠️  Snapshot arrived after {} streamed point(s); streamed data overwritten",
                    overwritten
                );
            }
            log::info!("📊 Series initialized from snapshot ({} records, {} kept)", count, buffer.len());
        }
        SeriesMessage::Append(point) => {
            log::debug!(
                "Appending point: peers={} fee={:.2} price={:.2}",
                point.peer_count(),
                point.medium_fee_per_kb(),
                point.price()
            );
            buffer.append(point);
        }
    }
}
