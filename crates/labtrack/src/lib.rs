//! # labtrack
//!
//! Tracking, plotting, and saving metrics for long-lived experiments.
//!
//! Metrics accumulate observations from the experiment loop; a [`Session`]
//! binds a named collection of them to a directory and snapshots them (one
//! SVG plot and one JSON record per metric); a [`SessionManager`] drives
//! those snapshots on a count- or time-based cadence without blocking the
//! loop.
//!
//! ## Key Types
//!
//! - [`NumericMetric`] / [`TimedNumericMetric`] / [`ParamSetMetric`] - accumulators
//! - [`Session`] - a metric collection bound to a directory
//! - [`SessionManager`] - periodic snapshots with guaranteed final flush
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use labtrack::{Cadence, NumericMetric, Session, SessionManager};
//!
//! # fn main() -> Result<(), labtrack::Error> {
//! let dir = std::env::temp_dir().join("labtrack-doc");
//! let loss = NumericMetric::new("loss");
//! let session = Arc::new(Session::new(dir, vec![loss.clone().into()])?);
//!
//! let manager = SessionManager::new(session, Cadence::Updates(2));
//! let mut managed = manager.manage()?;
//! for step in 0..5 {
//!     loss.record(1.0 / (step + 1) as f64);
//!     managed.tick()?; // snapshots after every 2nd tick
//! }
//! managed.close()?; // final snapshot, even without a pending trigger
//! # Ok(())
//! # }
//! ```

mod error;
mod hooks;
mod manager;
mod session;

pub use error::Error;
pub use hooks::SessionHook;
pub use manager::{Cadence, Managed, SessionManager};
pub use session::Session;

pub use labtrack_metrics::{
    Metric, MetricKind, MetricObserver, MetricRecord, NumericMetric, ParamSetMetric, RecordError,
    TimedNumericMetric,
};
pub use labtrack_plot::PlotError;
