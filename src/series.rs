//! Bounded, arrival-ordered series of network telemetry points.

use {
    chrono::{DateTime, Local},
    serde::{de::Error as _, Deserialize, Deserializer, Serialize},
    serde_json::{Map, Value},
};

/// Maximum number of points kept in the series
pub const SERIES_CAPACITY: usize = 10;

/// Record shape shared by the snapshot endpoint and the live stream.
///
/// Upstream payloads carry no usable timestamp; extra fields are ignored.
/// Only JSON objects are accepted, never positional arrays.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawRecord {
    pub peer_count: u64,
    pub medium_fee_per_kb: f64,
    pub price: f64,
}

#[derive(Deserialize)]
struct RecordFields {
    peer_count: u64,
    medium_fee_per_kb: f64,
    price: f64,
}

impl<'de> Deserialize<'de> for RawRecord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let object = Map::<String, Value>::deserialize(deserializer)?;
        let fields: RecordFields = serde_json::from_value(Value::Object(object)).map_err(D::Error::custom)?;

        Ok(RawRecord {
            peer_count: fields.peer_count,
            medium_fee_per_kb: fields.medium_fee_per_kb,
            price: fields.price,
        })
    }
}

#[derive(Debug)]
pub enum ParseError {
    Json(serde_json::Error),
    InvalidField { field: &'static str, value: f64 },
}

impl From<serde_json::Error> for ParseError {
    fn from(err: serde_json::Error) -> Self {
        ParseError::Json(err)
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::Json(e) => write!(f, "Malformed record: {}", e),
            ParseError::InvalidField { field, value } => {
                write!(f, "Invalid value for {}: {} (must be finite and non-negative)", field, value)
            }
        }
    }
}

impl std::error::Error for ParseError {}

impl RawRecord {
    /// Parse a single JSON record (one stream message)
    pub fn parse(payload: &[u8]) -> Result<Self, ParseError> {
        let record: RawRecord = serde_json::from_slice(payload)?;
        record.validate()?;
        Ok(record)
    }

    pub fn validate(&self) -> Result<(), ParseError> {
        for (field, value) in [
            ("medium_fee_per_kb", self.medium_fee_per_kb),
            ("price", self.price),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ParseError::InvalidField { field, value });
            }
        }
        Ok(())
    }

    /// Turn the record into a series point received at `received_at`
    pub fn stamp(self, received_at: DateTime<Local>) -> DataPoint {
        DataPoint {
            peer_count: self.peer_count,
            medium_fee_per_kb: self.medium_fee_per_kb,
            price: self.price,
            timestamp: received_at,
        }
    }
}

/// One telemetry sample. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct DataPoint {
    peer_count: u64,
    medium_fee_per_kb: f64,
    price: f64,
    /// Local arrival time, not measurement time
    timestamp: DateTime<Local>,
}

impl DataPoint {
    pub fn peer_count(&self) -> u64 {
        self.peer_count
    }

    pub fn medium_fee_per_kb(&self) -> f64 {
        self.medium_fee_per_kb
    }

    pub fn price(&self) -> f64 {
        self.price
    }

    pub fn timestamp(&self) -> DateTime<Local> {
        self.timestamp
    }
}

/// Sliding window over the most recent [`SERIES_CAPACITY`] points.
///
/// Order is append order and is never re-sorted. Appending past capacity
/// evicts exactly the single oldest point.
#[derive(Debug, Default)]
pub struct SeriesBuffer {
    points: Vec<DataPoint>,
    /// Appends applied since the last initialize
    appended: usize,
}

impl SeriesBuffer {
    pub fn new() -> Self {
        Self {
            points: Vec::with_capacity(SERIES_CAPACITY),
            appended: 0,
        }
    }

    /// Replace the whole content with the last `SERIES_CAPACITY` of `points`.
    ///
    /// Returns the number of streamed points that were overwritten.
    pub fn initialize(&mut self, points: Vec<DataPoint>) -> usize {
        let overwritten = self.appended;
        let skip = points.len().saturating_sub(SERIES_CAPACITY);
        self.points = points.into_iter().skip(skip).collect();
        self.appended = 0;
        overwritten
    }

    pub fn append(&mut self, point: DataPoint) {
        self.points.push(point);
        self.appended += 1;

        if self.points.len() > SERIES_CAPACITY {
            self.points.remove(0);
        }
    }

    pub fn current_series(&self) -> &[DataPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}
