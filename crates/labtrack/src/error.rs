use labtrack_metrics::RecordError;
use labtrack_plot::PlotError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("session already has a metric named `{0}`")]
    NameCollision(String),

    #[error("session has no metric named `{0}`")]
    UnknownMetric(String),

    #[error("metric `{0}` has no plottable series")]
    NotPlottable(String),

    #[error("could not determine the platform data directory")]
    NoDataDir,

    #[error("session i/o failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("plot error: {0}")]
    Plot(#[from] PlotError),

    #[error("record error: {0}")]
    Record(#[from] RecordError),

    #[error("session manager is already managing")]
    AlreadyManaging,
}
