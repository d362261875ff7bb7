use std::ops::{AddAssign, SubAssign};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::record::MetricRecord;

/// Observer invoked with the value of every new observation.
pub type MetricObserver = Arc<dyn Fn(f64) + Send + Sync>;

/// Which variant a metric (or a record of one) is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    Numeric,
    Timed,
    Params,
}

// A poisoned metric still holds a consistent sequence (push is the only
// mutation), so recover the guard instead of propagating the panic.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

struct SeriesInner {
    values: Vec<f64>,
    observers: Vec<MetricObserver>,
}

/// A numeric metric plotted against its observation index.
///
/// Observations are append-only; the x-axis is 0, 1, 2, … in call order.
#[derive(Clone)]
pub struct NumericMetric {
    name: Arc<str>,
    inner: Arc<Mutex<SeriesInner>>,
}

impl NumericMetric {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into().into(),
            inner: Arc::new(Mutex::new(SeriesInner {
                values: Vec::new(),
                observers: Vec::new(),
            })),
        }
    }

    /// Create the metric with one observation already recorded.
    pub fn with_initial(name: impl Into<String>, value: f64) -> Self {
        let metric = Self::new(name);
        metric.record(value);
        metric
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Append one observation.
    pub fn record(&self, value: f64) {
        let observers = {
            let mut inner = lock(&self.inner);
            inner.values.push(value);
            inner.observers.clone()
        };
        for observer in observers {
            observer(value);
        }
    }

    /// The most recently recorded value.
    pub fn latest(&self) -> Option<f64> {
        lock(&self.inner).values.last().copied()
    }

    pub fn len(&self) -> usize {
        lock(&self.inner).values.len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.inner).values.is_empty()
    }

    /// Point-in-time copy of the full `(index, value)` sequence.
    pub fn series(&self) -> Vec<(f64, f64)> {
        lock(&self.inner)
            .values
            .iter()
            .enumerate()
            .map(|(i, v)| (i as f64, *v))
            .collect()
    }

    /// Register an observer called after every [`record`](Self::record).
    pub fn add_observer(&self, observer: MetricObserver) {
        lock(&self.inner).observers.push(observer);
    }

    pub fn to_record(&self) -> MetricRecord {
        MetricRecord::Numeric {
            name: self.name.to_string(),
            recorded_at: chrono::Utc::now(),
            points: self.series(),
        }
    }
}

/// Records `latest + rhs` as a new observation.
///
/// Panics if the metric has no recorded value yet.
impl AddAssign<f64> for NumericMetric {
    fn add_assign(&mut self, rhs: f64) {
        let base = latest_or_panic(self.latest(), &self.name);
        self.record(base + rhs);
    }
}

/// Records `latest - rhs` as a new observation.
///
/// Panics if the metric has no recorded value yet.
impl SubAssign<f64> for NumericMetric {
    fn sub_assign(&mut self, rhs: f64) {
        let base = latest_or_panic(self.latest(), &self.name);
        self.record(base - rhs);
    }
}

fn latest_or_panic(latest: Option<f64>, name: &str) -> f64 {
    match latest {
        Some(value) => value,
        None => panic!("metric `{name}` has no recorded value yet"),
    }
}

struct TimedInner {
    started: Option<Instant>,
    points: Vec<(f64, f64)>,
    observers: Vec<MetricObserver>,
}

/// A numeric metric plotted against wall-clock seconds.
///
/// The clock is anchored at the first observation, so the first point lands
/// at x ≈ 0 and x-values are non-decreasing afterwards.
#[derive(Clone)]
pub struct TimedNumericMetric {
    name: Arc<str>,
    inner: Arc<Mutex<TimedInner>>,
}

impl TimedNumericMetric {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into().into(),
            inner: Arc::new(Mutex::new(TimedInner {
                started: None,
                points: Vec::new(),
                observers: Vec::new(),
            })),
        }
    }

    pub fn with_initial(name: impl Into<String>, value: f64) -> Self {
        let metric = Self::new(name);
        metric.record(value);
        metric
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Append one observation stamped with the seconds elapsed since the
    /// first observation.
    pub fn record(&self, value: f64) {
        let observers = {
            let mut inner = lock(&self.inner);
            let started = *inner.started.get_or_insert_with(Instant::now);
            let elapsed = started.elapsed().as_secs_f64();
            inner.points.push((elapsed, value));
            inner.observers.clone()
        };
        for observer in observers {
            observer(value);
        }
    }

    pub fn latest(&self) -> Option<f64> {
        lock(&self.inner).points.last().map(|(_, v)| *v)
    }

    pub fn len(&self) -> usize {
        lock(&self.inner).points.len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.inner).points.is_empty()
    }

    /// Point-in-time copy of the full `(elapsed_secs, value)` sequence.
    pub fn series(&self) -> Vec<(f64, f64)> {
        lock(&self.inner).points.clone()
    }

    pub fn add_observer(&self, observer: MetricObserver) {
        lock(&self.inner).observers.push(observer);
    }

    pub fn to_record(&self) -> MetricRecord {
        MetricRecord::Timed {
            name: self.name.to_string(),
            recorded_at: chrono::Utc::now(),
            points: self.series(),
        }
    }
}

/// Records `latest + rhs` as a new observation.
///
/// Panics if the metric has no recorded value yet.
impl AddAssign<f64> for TimedNumericMetric {
    fn add_assign(&mut self, rhs: f64) {
        let base = latest_or_panic(self.latest(), &self.name);
        self.record(base + rhs);
    }
}

/// Records `latest - rhs` as a new observation.
///
/// Panics if the metric has no recorded value yet.
impl SubAssign<f64> for TimedNumericMetric {
    fn sub_assign(&mut self, rhs: f64) {
        let base = latest_or_panic(self.latest(), &self.name);
        self.record(base - rhs);
    }
}

/// Key/value experiment parameters, persisted alongside the numeric metrics.
///
/// Entries keep first-insertion order; setting an existing key replaces its
/// value in place. Parameter sets are serialized by sessions but never
/// plotted.
#[derive(Clone)]
pub struct ParamSetMetric {
    name: Arc<str>,
    inner: Arc<Mutex<Vec<(String, String)>>>,
}

impl ParamSetMetric {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into().into(),
            inner: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn from_entries<K, V>(
        name: impl Into<String>,
        entries: impl IntoIterator<Item = (K, V)>,
    ) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let metric = Self::new(name);
        for (key, value) in entries {
            metric.set(key, value);
        }
        metric
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        let mut entries = lock(&self.inner);
        match entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        lock(&self.inner)
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
    }

    /// Point-in-time copy of all entries in insertion order.
    pub fn entries(&self) -> Vec<(String, String)> {
        lock(&self.inner).clone()
    }

    pub fn to_record(&self) -> MetricRecord {
        MetricRecord::Params {
            name: self.name.to_string(),
            recorded_at: chrono::Utc::now(),
            entries: self.entries(),
        }
    }
}

/// The closed set of metric variants a session can register.
#[derive(Clone)]
pub enum Metric {
    Numeric(NumericMetric),
    Timed(TimedNumericMetric),
    Params(ParamSetMetric),
}

impl Metric {
    pub fn name(&self) -> &str {
        match self {
            Self::Numeric(m) => m.name(),
            Self::Timed(m) => m.name(),
            Self::Params(m) => m.name(),
        }
    }

    pub fn kind(&self) -> MetricKind {
        match self {
            Self::Numeric(_) => MetricKind::Numeric,
            Self::Timed(_) => MetricKind::Timed,
            Self::Params(_) => MetricKind::Params,
        }
    }

    /// The plottable `(x, y)` sequence, or `None` for parameter sets.
    pub fn series(&self) -> Option<Vec<(f64, f64)>> {
        match self {
            Self::Numeric(m) => Some(m.series()),
            Self::Timed(m) => Some(m.series()),
            Self::Params(_) => None,
        }
    }

    /// X-axis label for plottable variants.
    pub fn x_label(&self) -> Option<&'static str> {
        match self {
            Self::Numeric(_) => Some("Iteration"),
            Self::Timed(_) => Some("Seconds"),
            Self::Params(_) => None,
        }
    }

    pub fn to_record(&self) -> MetricRecord {
        match self {
            Self::Numeric(m) => m.to_record(),
            Self::Timed(m) => m.to_record(),
            Self::Params(m) => m.to_record(),
        }
    }
}

impl From<NumericMetric> for Metric {
    fn from(metric: NumericMetric) -> Self {
        Self::Numeric(metric)
    }
}

impl From<TimedNumericMetric> for Metric {
    fn from(metric: TimedNumericMetric) -> Self {
        Self::Timed(metric)
    }
}

impl From<ParamSetMetric> for Metric {
    fn from(metric: ParamSetMetric) -> Self {
        Self::Params(metric)
    }
}
