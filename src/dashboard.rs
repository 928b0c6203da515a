use {
    crate::{
        config::Config,
        snapshot::{HttpSnapshotSource, SnapshotLoader, SnapshotSource},
        state::{series_channel, series_task, SeriesMessage, SeriesView},
        stream::{StreamClient, StreamState},
    },
    tokio::{
        sync::{mpsc, oneshot, watch},
        task::JoinHandle,
    },
};

/// Producers rarely get ahead of the series task by more than a snapshot
const SERIES_CHANNEL_BUFFER: usize = 64;

/// One mounted live view: snapshot loader, stream client and the series
/// they feed. Everything acquired in `mount` is released in `unmount`, or
/// on drop if the owner never gets that far.
pub struct Dashboard {
    view: SeriesView,
    states: watch::Receiver<StreamState>,
    stream: Option<StreamClient>,
    series_shutdown: Option<oneshot::Sender<()>>,
    series_task: Option<JoinHandle<()>>,
    snapshot_task: Option<JoinHandle<()>>,
}

impl Dashboard {
    /// Mount against the HTTP/WebSocket endpoints derived from `config`
    pub fn mount(config: &Config) -> Self {
        Self::mount_with(HttpSnapshotSource::new(config.snapshot_url()), config.stream_url())
    }

    /// Mount with an explicit snapshot source and stream URL
    pub fn mount_with<S>(source: S, stream_url: impl Into<String>) -> Self
    where
        S: SnapshotSource + 'static,
    {
        let (tx, rx) = mpsc::channel::<SeriesMessage>(SERIES_CHANNEL_BUFFER);
        let (publisher, view) = series_channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let series_task = tokio::spawn(series_task(rx, publisher, shutdown_rx));

        let snapshot_tx = tx.clone();
        let snapshot_task = tokio::spawn(async move {
            SnapshotLoader::new(source).run(snapshot_tx).await;
        });

        let stream = StreamClient::connect(stream_url, tx);

        Self {
            view,
            states: stream.subscribe(),
            stream: Some(stream),
            series_shutdown: Some(shutdown_tx),
            series_task: Some(series_task),
            snapshot_task: Some(snapshot_task),
        }
    }

    /// Read-only view for renderers
    pub fn view(&self) -> SeriesView {
        self.view.clone()
    }

    pub fn stream_state(&self) -> StreamState {
        self.states.borrow().clone()
    }

    pub fn stream_states(&self) -> watch::Receiver<StreamState> {
        self.states.clone()
    }

    /// Tear down and wait for every task to stop
    pub async fn unmount(mut self) {
        self.release();

        if let Some(stream) = self.stream.take() {
            stream.shutdown().await;
        }
        if let Some(task) = self.series_task.take() {
            if let Err(e) = task.await {
                log::warn!("Series task ended abnormally: {}", e);
            }
        }
        if let Some(task) = self.snapshot_task.take() {
            let _ = task.await;
        }
        log::info!("Dashboard unmounted");
    }

    /// Stop applying mutations first, then drop the producers.
    fn release(&mut self) {
        if let Some(shutdown) = self.series_shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(stream) = self.stream.as_mut() {
            stream.close();
        }
        if let Some(task) = &self.snapshot_task {
            task.abort();
        }
    }
}

impl Drop for Dashboard {
    fn drop(&mut self) {
        self.release();
    }
}
