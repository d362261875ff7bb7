//! Let a manager snapshot the session every second update.
//!
//! Run with `cargo run --example managed_session`.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use labtrack::{Cadence, NumericMetric, Session, SessionManager, TimedNumericMetric};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .init();

    let dir = std::env::temp_dir().join("labtrack-managed-session");
    let m0 = NumericMetric::new("m0");
    let m1 = TimedNumericMetric::new("m1");
    let session = Arc::new(Session::new(
        dir.clone(),
        vec![m0.clone().into(), m1.clone().into()],
    )?);

    let manager = SessionManager::new(session, Cadence::Updates(2)).with_verbose(2);
    let mut managed = manager.manage()?;
    for i in 0..5 {
        m0.record(i as f64);
        m1.record((i * i) as f64);
        managed.tick()?;
        std::thread::sleep(Duration::from_millis(250));
    }
    managed.close()?;

    println!("session written to {}", dir.display());
    Ok(())
}
