use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::metric::MetricKind;

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("record file i/o failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed record document: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("record holds {found:?} data, expected {expected:?}")]
    WrongKind {
        expected: MetricKind,
        found: MetricKind,
    },
}

/// The serialized snapshot of one metric.
///
/// Saving overwrites the previous record for the metric; a record file is a
/// current-state document, not an append-only log. A saved record loads back
/// to the identical payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MetricRecord {
    Numeric {
        name: String,
        recorded_at: DateTime<Utc>,
        points: Vec<(f64, f64)>,
    },
    Timed {
        name: String,
        recorded_at: DateTime<Utc>,
        points: Vec<(f64, f64)>,
    },
    Params {
        name: String,
        recorded_at: DateTime<Utc>,
        entries: Vec<(String, String)>,
    },
}

impl MetricRecord {
    pub fn name(&self) -> &str {
        match self {
            Self::Numeric { name, .. } | Self::Timed { name, .. } | Self::Params { name, .. } => {
                name
            }
        }
    }

    pub fn kind(&self) -> MetricKind {
        match self {
            Self::Numeric { .. } => MetricKind::Numeric,
            Self::Timed { .. } => MetricKind::Timed,
            Self::Params { .. } => MetricKind::Params,
        }
    }

    /// The `(x, value)` sequence, or `None` for parameter records.
    pub fn points(&self) -> Option<&[(f64, f64)]> {
        match self {
            Self::Numeric { points, .. } | Self::Timed { points, .. } => Some(points),
            Self::Params { .. } => None,
        }
    }

    pub fn entries(&self) -> Option<&[(String, String)]> {
        match self {
            Self::Params { entries, .. } => Some(entries),
            _ => None,
        }
    }

    /// Write the record to `path`, replacing any previous record atomically.
    pub fn save(&self, path: &Path) -> Result<(), RecordError> {
        let content = serde_json::to_string_pretty(self)?;
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, content)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, RecordError> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Load, verifying the record holds the expected variant.
    pub fn load_expecting(path: &Path, expected: MetricKind) -> Result<Self, RecordError> {
        let record = Self::load(path)?;
        if record.kind() != expected {
            return Err(RecordError::WrongKind {
                expected,
                found: record.kind(),
            });
        }
        Ok(record)
    }
}
