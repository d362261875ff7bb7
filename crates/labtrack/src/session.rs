use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError, RwLock};

use labtrack_metrics::{Metric, MetricRecord};

use crate::error::Error;
use crate::hooks::SessionHook;

/// Stores, plots, and persists a collection of metrics in one directory.
///
/// Metric names are unique within a session and insertion order is kept, so
/// snapshot output is deterministic. The session only reads metric
/// sequences; recording stays with the metric handles the caller holds.
/// One session owns its directory; pointing two sessions at the same
/// directory is unsupported.
pub struct Session {
    dir: PathBuf,
    metrics: RwLock<Vec<Metric>>,
    hooks: Mutex<Vec<Box<dyn SessionHook>>>,
}

impl Session {
    /// Create a session in `dir`, creating the directory (and parents) if
    /// absent, and register the initial metrics.
    pub fn new(dir: impl Into<PathBuf>, metrics: Vec<Metric>) -> Result<Self, Error> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;

        let session = Self {
            dir,
            metrics: RwLock::new(Vec::new()),
            hooks: Mutex::new(Vec::new()),
        };
        for metric in metrics {
            session.add_metric(metric)?;
        }
        Ok(session)
    }

    /// Create a session named `name` under the platform data directory.
    pub fn in_data_dir(name: &str, metrics: Vec<Metric>) -> Result<Self, Error> {
        let data_dir = dirs::data_dir().ok_or(Error::NoDataDir)?;
        Self::new(data_dir.join("labtrack").join(name), metrics)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Register one more metric; names must stay unique.
    pub fn add_metric(&self, metric: Metric) -> Result<(), Error> {
        {
            let mut metrics = self
                .metrics
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            if metrics.iter().any(|m| m.name() == metric.name()) {
                return Err(Error::NameCollision(metric.name().to_string()));
            }
            metrics.push(metric.clone());
        }
        self.each_hook(|hook| hook.on_metric_add(&metric));
        Ok(())
    }

    /// Register a lifecycle hook; fires its start event immediately.
    pub fn add_hook(&self, hook: impl SessionHook + 'static) {
        let mut hook = hook;
        hook.on_session_start(self);
        self.hooks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Box::new(hook));
    }

    /// Handle to a registered metric, if present.
    pub fn metric(&self, name: &str) -> Option<Metric> {
        self.snapshot_metrics()
            .into_iter()
            .find(|m| m.name() == name)
    }

    /// Handles to all registered metrics, in registration order.
    pub fn metrics(&self) -> Vec<Metric> {
        self.snapshot_metrics()
    }

    pub fn metric_names(&self) -> Vec<String> {
        self.snapshot_metrics()
            .iter()
            .map(|m| m.name().to_string())
            .collect()
    }

    /// Render one metric's plot into `<dir>/<name>.svg`, overwriting any
    /// previous plot. Parameter-set metrics are not plottable.
    pub fn plot(&self, name: &str) -> Result<PathBuf, Error> {
        let metric = self
            .metric(name)
            .ok_or_else(|| Error::UnknownMetric(name.to_string()))?;
        fs::create_dir_all(&self.dir)?;
        self.plot_metric(&metric)?
            .ok_or_else(|| Error::NotPlottable(name.to_string()))
    }

    /// Render plots for every plottable metric, in registration order.
    pub fn plot_all(&self) -> Result<Vec<PathBuf>, Error> {
        fs::create_dir_all(&self.dir)?;
        let mut paths = Vec::new();
        for metric in self.snapshot_metrics() {
            if let Some(path) = self.plot_metric(&metric)? {
                paths.push(path);
            }
        }
        Ok(paths)
    }

    /// Persist one metric's record into `<dir>/<name>.json`, overwriting any
    /// previous record.
    pub fn save(&self, name: &str) -> Result<PathBuf, Error> {
        let metric = self
            .metric(name)
            .ok_or_else(|| Error::UnknownMetric(name.to_string()))?;
        fs::create_dir_all(&self.dir)?;
        self.save_metric(&metric)
    }

    /// Persist records for every registered metric, in registration order.
    pub fn save_all(&self) -> Result<Vec<PathBuf>, Error> {
        fs::create_dir_all(&self.dir)?;
        let mut paths = Vec::new();
        for metric in self.snapshot_metrics() {
            paths.push(self.save_metric(&metric)?);
        }
        Ok(paths)
    }

    /// Plot and persist every registered metric.
    ///
    /// This is the operation a [`SessionManager`](crate::SessionManager)
    /// invokes on each trigger. Failures propagate without retry.
    pub fn snapshot(&self) -> Result<(), Error> {
        self.plot_all()?;
        self.save_all()?;
        tracing::debug!(dir = %self.dir.display(), "session snapshot written");
        self.each_hook(|hook| hook.on_snapshot(self));
        Ok(())
    }

    /// Reload the persisted record for one metric.
    pub fn load_record(&self, name: &str) -> Result<MetricRecord, Error> {
        if self.metric(name).is_none() {
            return Err(Error::UnknownMetric(name.to_string()));
        }
        Ok(MetricRecord::load(&self.record_path(name))?)
    }

    pub fn plot_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.svg"))
    }

    pub fn record_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.json"))
    }

    // Copies of the handles, so no registry lock is held during i/o.
    fn snapshot_metrics(&self) -> Vec<Metric> {
        self.metrics
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn plot_metric(&self, metric: &Metric) -> Result<Option<PathBuf>, Error> {
        let (series, x_label) = match (metric.series(), metric.x_label()) {
            (Some(series), Some(x_label)) => (series, x_label),
            _ => return Ok(None),
        };
        let path = self.plot_path(metric.name());
        labtrack_plot::render_series(&path, metric.name(), x_label, &series)?;
        Ok(Some(path))
    }

    fn save_metric(&self, metric: &Metric) -> Result<PathBuf, Error> {
        let path = self.record_path(metric.name());
        metric.to_record().save(&path)?;
        Ok(path)
    }

    fn each_hook(&self, mut f: impl FnMut(&mut Box<dyn SessionHook>)) {
        let mut hooks = self.hooks.lock().unwrap_or_else(PoisonError::into_inner);
        for hook in hooks.iter_mut() {
            f(hook);
        }
    }
}
