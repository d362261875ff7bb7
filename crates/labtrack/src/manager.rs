use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::error::Error;
use crate::session::Session;

/// How often a managed session snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cadence {
    /// Snapshot after every `n` calls to [`Managed::tick`].
    Updates(u64),
    /// Snapshot from a background timer thread at this interval.
    Time(Duration),
}

impl Default for Cadence {
    fn default() -> Self {
        Self::Time(Duration::from_secs(60))
    }
}

/// Drives periodic snapshots of one session.
///
/// A manager does nothing until [`manage`](Self::manage) is entered; the
/// returned guard owns the managed scope and always performs a final
/// snapshot when it ends, whether by [`Managed::close`] or by dropping
/// (including unwinding out of the scope).
pub struct SessionManager {
    session: Arc<Session>,
    cadence: Cadence,
    verbose: u8,
    managing: Arc<AtomicBool>,
}

impl SessionManager {
    pub fn new(session: Arc<Session>, cadence: Cadence) -> Self {
        Self {
            session,
            cadence,
            verbose: 0,
            managing: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Set verbosity: 0 = silent, 1 = snapshot events, 2 = per-tick detail.
    pub fn with_verbose(mut self, verbose: u8) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Enter the managed scope.
    ///
    /// Counters start from zero. With a time cadence this spawns the
    /// background timer thread; with an update cadence the caller advances
    /// the counter through [`Managed::tick`]. Entering while a previous
    /// scope is still open is an error.
    pub fn manage(&self) -> Result<Managed, Error> {
        if self.managing.swap(true, Ordering::SeqCst) {
            return Err(Error::AlreadyManaging);
        }

        let timer = match self.cadence {
            Cadence::Time(interval) => {
                match spawn_timer(self.session.clone(), interval, self.verbose) {
                    Ok(timer) => Some(timer),
                    Err(e) => {
                        self.managing.store(false, Ordering::SeqCst);
                        return Err(Error::Io(e));
                    }
                }
            }
            Cadence::Updates(_) => None,
        };

        if self.verbose >= 1 {
            info!(dir = %self.session.dir().display(), "session management started");
        }

        Ok(Managed {
            session: self.session.clone(),
            cadence: self.cadence,
            verbose: self.verbose,
            managing: self.managing.clone(),
            ticks: 0,
            timer,
            finished: false,
        })
    }
}

struct Timer {
    // Dropping the sender disconnects the channel and wakes the thread.
    stop_tx: mpsc::Sender<()>,
    handle: thread::JoinHandle<()>,
}

fn spawn_timer(
    session: Arc<Session>,
    interval: Duration,
    verbose: u8,
) -> std::io::Result<Timer> {
    let (stop_tx, stop_rx) = mpsc::channel::<()>();
    let handle = thread::Builder::new()
        .name("labtrack-snapshot".to_string())
        .spawn(move || loop {
            match stop_rx.recv_timeout(interval) {
                Err(mpsc::RecvTimeoutError::Timeout) => {
                    // Off the caller's control flow: report, never propagate.
                    match session.snapshot() {
                        Ok(()) => {
                            if verbose >= 1 {
                                info!(dir = %session.dir().display(), "periodic snapshot written");
                            }
                        }
                        Err(e) => {
                            warn!(error = %e, "periodic snapshot failed, skipping until next interval");
                        }
                    }
                }
                Ok(()) | Err(mpsc::RecvTimeoutError::Disconnected) => break,
            }
        })?;
    Ok(Timer { stop_tx, handle })
}

/// The managed scope returned by [`SessionManager::manage`].
pub struct Managed {
    session: Arc<Session>,
    cadence: Cadence,
    verbose: u8,
    managing: Arc<AtomicBool>,
    ticks: u64,
    timer: Option<Timer>,
    finished: bool,
}

impl Managed {
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Advance the update counter.
    ///
    /// With an update cadence, crossing the threshold snapshots
    /// synchronously and resets the counter; a snapshot failure propagates
    /// and the cadence simply starts over. With a time cadence this is a
    /// no-op, so one experiment loop body works under either cadence.
    pub fn tick(&mut self) -> Result<(), Error> {
        let threshold = match self.cadence {
            Cadence::Updates(threshold) => threshold,
            Cadence::Time(_) => return Ok(()),
        };

        self.ticks += 1;
        if self.verbose >= 2 {
            debug!(ticks = self.ticks, threshold, "cadence tick");
        }
        if self.ticks >= threshold {
            self.ticks = 0;
            if self.verbose >= 1 {
                info!(dir = %self.session.dir().display(), "update threshold reached, snapshotting");
            }
            self.session.snapshot()?;
        }
        Ok(())
    }

    /// Leave the managed scope: stop and join the timer thread, then take
    /// one final snapshot. A final-snapshot failure propagates here; the
    /// drop path reports it instead.
    pub fn close(mut self) -> Result<(), Error> {
        self.finished = true;
        self.shutdown()
    }

    fn shutdown(&mut self) -> Result<(), Error> {
        if let Some(timer) = self.timer.take() {
            drop(timer.stop_tx);
            if timer.handle.join().is_err() {
                warn!("snapshot timer thread panicked");
            }
        }

        // No ticks can fire past this point; the final snapshot reflects
        // everything recorded inside the scope.
        let result = self.session.snapshot();
        self.managing.store(false, Ordering::SeqCst);
        if self.verbose >= 1 {
            info!(dir = %self.session.dir().display(), "session management ended");
        }
        result
    }
}

impl Drop for Managed {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;
        if let Err(e) = self.shutdown() {
            warn!(error = %e, "final snapshot failed while leaving managed scope");
        }
    }
}
