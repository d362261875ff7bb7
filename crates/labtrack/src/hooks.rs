use labtrack_metrics::Metric;

use crate::session::Session;

/// Observer for session lifecycle events.
///
/// All methods default to no-ops; implement the ones you care about.
/// `on_session_start` fires once when the hook is registered, so hooks added
/// after construction still see a start event.
pub trait SessionHook: Send {
    fn on_session_start(&mut self, _session: &Session) {}

    fn on_metric_add(&mut self, _metric: &Metric) {}

    fn on_snapshot(&mut self, _session: &Session) {}
}
