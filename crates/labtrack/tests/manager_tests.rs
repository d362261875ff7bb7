use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use labtrack::{
    Cadence, Error, Metric, NumericMetric, RecordError, Session, SessionHook, SessionManager,
};
use tempfile::TempDir;

/// Helper: hook that counts snapshots so tests can observe trigger timing.
struct SnapshotCounter {
    snapshots: Arc<AtomicUsize>,
}

impl SessionHook for SnapshotCounter {
    fn on_snapshot(&mut self, _session: &Session) {
        self.snapshots.fetch_add(1, Ordering::SeqCst);
    }
}

fn counted_session(dir: &TempDir, metrics: Vec<Metric>) -> (Arc<Session>, Arc<AtomicUsize>) {
    let session = Session::new(dir.path().join("s"), metrics).unwrap();
    let snapshots = Arc::new(AtomicUsize::new(0));
    session.add_hook(SnapshotCounter {
        snapshots: snapshots.clone(),
    });
    (Arc::new(session), snapshots)
}

// ============================================================
// Update-driven cadence
// ============================================================

#[test]
fn test_update_cadence_triggers_every_n_ticks() {
    let dir = TempDir::new().unwrap();
    let m0 = NumericMetric::new("m0");
    let (session, snapshots) = counted_session(&dir, vec![m0.clone().into()]);
    let manager = SessionManager::new(session.clone(), Cadence::Updates(2));

    let mut managed = manager.manage().unwrap();
    for i in 0..3 {
        m0.record(i as f64);
        managed.tick().unwrap();
    }
    // Ticks 1..=3 with threshold 2: exactly one automatic snapshot.
    assert_eq!(snapshots.load(Ordering::SeqCst), 1);

    managed.close().unwrap();
    // The counter sat at 1 after tick 3; close still flushes.
    assert_eq!(snapshots.load(Ordering::SeqCst), 2);

    let record = session.load_record("m0").unwrap();
    assert_eq!(
        record.points().unwrap(),
        &[(0.0, 0.0), (1.0, 1.0), (2.0, 2.0)]
    );
}

#[test]
fn test_close_without_any_ticks_still_snapshots() {
    let dir = TempDir::new().unwrap();
    let (session, snapshots) = counted_session(&dir, vec![NumericMetric::new("m0").into()]);
    let manager = SessionManager::new(session.clone(), Cadence::Updates(10));

    let managed = manager.manage().unwrap();
    managed.close().unwrap();

    assert_eq!(snapshots.load(Ordering::SeqCst), 1);
    assert!(session.record_path("m0").is_file());
}

#[test]
fn test_counter_resets_after_each_trigger() {
    let dir = TempDir::new().unwrap();
    let m0 = NumericMetric::new("m0");
    let (session, snapshots) = counted_session(&dir, vec![m0.clone().into()]);
    let manager = SessionManager::new(session, Cadence::Updates(2));

    let mut managed = manager.manage().unwrap();
    for i in 0..8 {
        m0.record(i as f64);
        managed.tick().unwrap();
    }
    // 8 ticks at threshold 2: triggers after ticks 2, 4, 6, 8.
    assert_eq!(snapshots.load(Ordering::SeqCst), 4);
    managed.close().unwrap();
    assert_eq!(snapshots.load(Ordering::SeqCst), 5);
}

#[test]
fn test_foreground_snapshot_failure_propagates_from_tick() {
    let dir = TempDir::new().unwrap();
    let m0 = NumericMetric::with_initial("m0", 1.0);
    let session = Arc::new(Session::new(dir.path().join("s"), vec![m0.into()]).unwrap());
    let manager = SessionManager::new(session.clone(), Cadence::Updates(1));

    // A directory squatting on the record path makes every save fail.
    std::fs::create_dir(session.record_path("m0")).unwrap();

    let mut managed = manager.manage().unwrap();
    match managed.tick() {
        Err(Error::Record(RecordError::Io(_))) => {}
        other => panic!("expected record i/o error, got {other:?}"),
    }
    // The final snapshot hits the same directory and propagates from close.
    assert!(managed.close().is_err());
}

// ============================================================
// Scope exit guarantees
// ============================================================

#[test]
fn test_panic_inside_managed_scope_still_takes_final_snapshot() {
    let dir = TempDir::new().unwrap();
    let m0 = NumericMetric::new("m0");
    let (session, snapshots) = counted_session(&dir, vec![m0.clone().into()]);
    let manager = SessionManager::new(session.clone(), Cadence::Updates(10));

    let result = catch_unwind(AssertUnwindSafe(|| {
        let mut managed = manager.manage().unwrap();
        m0.record(42.0);
        managed.tick().unwrap();
        panic!("experiment exploded");
    }));
    assert!(result.is_err());

    // Exactly one snapshot: the guaranteed flush from the drop path.
    assert_eq!(snapshots.load(Ordering::SeqCst), 1);
    let record = session.load_record("m0").unwrap();
    assert_eq!(record.points().unwrap(), &[(0.0, 42.0)]);

    // The scope is fully released; managing again works.
    let managed = manager.manage().unwrap();
    managed.close().unwrap();
}

#[test]
fn test_reentrant_manage_is_rejected() {
    let dir = TempDir::new().unwrap();
    let (session, _) = counted_session(&dir, Vec::new());
    let manager = SessionManager::new(session, Cadence::Updates(2));

    let managed = manager.manage().unwrap();
    assert!(matches!(manager.manage(), Err(Error::AlreadyManaging)));

    managed.close().unwrap();
    let managed = manager.manage().unwrap();
    managed.close().unwrap();
}

// ============================================================
// Time-driven cadence
// ============================================================

#[test]
fn test_time_cadence_snapshots_from_background_thread() {
    let dir = TempDir::new().unwrap();
    let m0 = NumericMetric::new("m0");
    let (session, snapshots) = counted_session(&dir, vec![m0.clone().into()]);
    let manager = SessionManager::new(session.clone(), Cadence::Time(Duration::from_millis(50)));

    let managed = manager.manage().unwrap();
    m0.record(1.0);
    m0.record(2.0);
    m0.record(3.0);
    std::thread::sleep(Duration::from_millis(250));

    // The caller never ticked; the timer thread did the snapshotting.
    assert!(snapshots.load(Ordering::SeqCst) >= 1);
    managed.close().unwrap();

    let record = session.load_record("m0").unwrap();
    assert_eq!(record.points().unwrap().len(), 3);
}

#[test]
fn test_no_snapshots_after_close() {
    let dir = TempDir::new().unwrap();
    let m0 = NumericMetric::new("m0");
    let (session, snapshots) = counted_session(&dir, vec![m0.clone().into()]);
    let manager = SessionManager::new(session.clone(), Cadence::Time(Duration::from_millis(50)));

    let managed = manager.manage().unwrap();
    m0.record(1.0);
    managed.close().unwrap();
    let flushed = snapshots.load(Ordering::SeqCst);

    // Recording after release must not reach the session directory.
    m0.record(2.0);
    m0.record(3.0);
    std::thread::sleep(Duration::from_millis(200));

    assert_eq!(snapshots.load(Ordering::SeqCst), flushed);
    let record = session.load_record("m0").unwrap();
    assert_eq!(record.points().unwrap(), &[(0.0, 1.0)]);
}

#[test]
fn test_tick_is_a_noop_under_time_cadence() {
    let dir = TempDir::new().unwrap();
    let m0 = NumericMetric::new("m0");
    let (session, snapshots) = counted_session(&dir, vec![m0.clone().into()]);
    let manager = SessionManager::new(session, Cadence::Time(Duration::from_secs(3600)));

    let mut managed = manager.manage().unwrap();
    for i in 0..10 {
        m0.record(i as f64);
        managed.tick().unwrap();
    }
    // Far below the hour interval and ticks don't count here.
    assert_eq!(snapshots.load(Ordering::SeqCst), 0);

    managed.close().unwrap();
    assert_eq!(snapshots.load(Ordering::SeqCst), 1);
}
