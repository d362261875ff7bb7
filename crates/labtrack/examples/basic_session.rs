//! Record a few observations, then snapshot once at the end.
//!
//! Run with `cargo run --example basic_session`.

use std::time::Duration;

use anyhow::Result;
use labtrack::{NumericMetric, ParamSetMetric, Session, TimedNumericMetric};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .init();

    let dir = std::env::temp_dir().join("labtrack-basic-session");
    let m0 = NumericMetric::new("m0");
    let m1 = TimedNumericMetric::new("m1");
    let config = ParamSetMetric::from_entries("config", [("steps", "5"), ("pause_ms", "250")]);
    let session = Session::new(
        dir.clone(),
        vec![m0.clone().into(), m1.clone().into(), config.into()],
    )?;

    for i in 0..5 {
        m0.record(i as f64);
        m1.record((i * i) as f64);
        std::thread::sleep(Duration::from_millis(250));
    }

    session.snapshot()?;
    println!("session written to {}", dir.display());
    Ok(())
}
