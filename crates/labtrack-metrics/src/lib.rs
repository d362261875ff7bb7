//! # labtrack-metrics
//!
//! Metric accumulators for experiment tracking.
//!
//! A metric is a named, append-only sequence of observations. Handles are
//! cheaply cloneable and internally synchronized, so the experiment loop can
//! keep recording while another thread snapshots the same metric.
//!
//! ## Key Types
//!
//! - [`NumericMetric`] - values plotted against their observation index
//! - [`TimedNumericMetric`] - values plotted against elapsed seconds
//! - [`ParamSetMetric`] - key/value experiment parameters (persisted, not plotted)
//! - [`Metric`] - the closed set of variants a session can register
//! - [`MetricRecord`] - the serialized, re-loadable snapshot of one metric

mod metric;
mod record;

pub use metric::{
    Metric, MetricKind, MetricObserver, NumericMetric, ParamSetMetric, TimedNumericMetric,
};
pub use record::{MetricRecord, RecordError};
