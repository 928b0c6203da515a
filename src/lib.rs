//! Live blockchain telemetry series.
//!
//! A one-shot snapshot and a WebSocket push stream feed a single bounded,
//! arrival-ordered series that a renderer can read at any time:
//!
//! ```text
//! SnapshotLoader ──┐
//!                  ├─ mpsc ─→ series task (SeriesBuffer) ─ watch ─→ SeriesView ─→ ui
//! StreamClient ────┘
//! ```
//!
//! [`Dashboard`] owns one such pipeline and releases it on unmount or drop.

pub mod config;
pub mod dashboard;
pub mod series;
pub mod snapshot;
pub mod state;
pub mod stream;
pub mod ui;

pub use config::{ChartStyle, Config, ConfigError};
pub use dashboard::Dashboard;
pub use series::{DataPoint, RawRecord, SeriesBuffer, SERIES_CAPACITY};
pub use snapshot::{HttpSnapshotSource, SnapshotError, SnapshotLoader, SnapshotSource};
pub use state::{SeriesMessage, SeriesView};
pub use stream::{StreamClient, StreamEvent, StreamMachine, StreamState};
