//! One-shot snapshot of recent blocks
//!
//! Fetches `GET <base>/latest_blocks` once at mount and seeds the series.
//!
//! ## Response
//!
//! JSON array of `{peer_count, medium_fee_per_kb, price}`. The payload has no
//! usable time field, so every record is stamped with the local receipt time.
//!
//! A failed fetch is logged and produces no data. There is no retry.

use {
    crate::{
        series::{DataPoint, ParseError, RawRecord},
        state::SeriesMessage,
    },
    async_trait::async_trait,
    chrono::Local,
    tokio::sync::mpsc,
};

#[derive(Debug)]
pub enum SnapshotError {
    /// Transport failure (connect, TLS, read)
    Request(String),
    /// Non-2xx response
    Status(u16),
    /// Body was not an array of valid records
    Body(ParseError),
}

impl From<reqwest::Error> for SnapshotError {
    fn from(err: reqwest::Error) -> Self {
        SnapshotError::Request(err.to_string())
    }
}

impl From<ParseError> for SnapshotError {
    fn from(err: ParseError) -> Self {
        SnapshotError::Body(err)
    }
}

impl From<serde_json::Error> for SnapshotError {
    fn from(err: serde_json::Error) -> Self {
        SnapshotError::Body(ParseError::Json(err))
    }
}

impl std::fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SnapshotError::Request(e) => write!(f, "Snapshot request failed: {}", e),
            SnapshotError::Status(code) => write!(f, "Snapshot endpoint returned HTTP {}", code),
            SnapshotError::Body(e) => write!(f, "Snapshot body rejected: {}", e),
        }
    }
}

impl std::error::Error for SnapshotError {}

/// Source of the raw snapshot records
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    /// Perform the single fetch
    async fn fetch(&self) -> Result<Vec<RawRecord>, SnapshotError>;

    /// Human-readable origin for logging
    fn describe(&self) -> String;
}

/// HTTP source backed by reqwest
pub struct HttpSnapshotSource {
    client: reqwest::Client,
    url: String,
}

impl HttpSnapshotSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl SnapshotSource for HttpSnapshotSource {
    async fn fetch(&self) -> Result<Vec<RawRecord>, SnapshotError> {
        let response = self.client.get(&self.url).send().await?;

        if !response.status().is_success() {
            return Err(SnapshotError::Status(response.status().as_u16()));
        }

        let body = response.bytes().await?;
        let records: Vec<RawRecord> = serde_json::from_slice(&body)?;
        Ok(records)
    }

    fn describe(&self) -> String {
        self.url.clone()
    }
}

/// Loads the initial series from a [`SnapshotSource`]
pub struct SnapshotLoader<S> {
    source: S,
}

impl<S: SnapshotSource> SnapshotLoader<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    /// Fetch once, validate and stamp every record with the current local time.
    ///
    /// Records keep the order the endpoint returned them in.
    pub async fn load(&self) -> Result<Vec<DataPoint>, SnapshotError> {
        let records = self.source.fetch().await?;
        for record in &records {
            record.validate()?;
        }

        let received_at = Local::now();
        Ok(records.into_iter().map(|r| r.stamp(received_at)).collect())
    }

    /// Load and hand the result to the series task.
    ///
    /// Failures are logged and nothing is sent.
    pub async fn run(self, sink: mpsc::Sender<SeriesMessage>) {
        log::info!("📥 Fetching initial snapshot from {}", self.source.describe());

        match self.load().await {
            Ok(points) => {
                log::info!("✅ Snapshot loaded: {} records", points.len());
                if sink.send(SeriesMessage::Initialize(points)).await.is_err() {
                    log::debug!("Series task gone before snapshot could be applied");
                }
            }
            Err(e) => {
                log::error!("❌ Failed to fetch initial data: {}", e);
            }
        }
    }
}
