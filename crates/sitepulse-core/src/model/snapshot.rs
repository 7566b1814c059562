use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use super::ProjectId;
use crate::error::HealthError;

/// The full metrics object returned by a health computation and stored in
/// each daily snapshot.
///
/// Field names serialize in camelCase (`overallScore`, `scheduleVariance`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct HealthMetrics {
    pub overall_score: f64,
    pub schedule_score: f64,
    pub cost_score: f64,
    pub resource_score: f64,
    pub spi: f64,
    pub cpi: f64,
    pub schedule_variance: f64,
    pub cost_variance: f64,
    pub bac: f64,
    pub pv: f64,
    pub ev: f64,
    pub ac: f64,
    pub eac: f64,
    pub etc: f64,
    pub vac: f64,
    pub tcpi: f64,
}

impl HealthMetrics {
    /// Field names paired with values, in schema order.
    #[must_use]
    pub const fn fields(&self) -> [(&'static str, f64); 16] {
        [
            ("overallScore", self.overall_score),
            ("scheduleScore", self.schedule_score),
            ("costScore", self.cost_score),
            ("resourceScore", self.resource_score),
            ("spi", self.spi),
            ("cpi", self.cpi),
            ("scheduleVariance", self.schedule_variance),
            ("costVariance", self.cost_variance),
            ("bac", self.bac),
            ("pv", self.pv),
            ("ev", self.ev),
            ("ac", self.ac),
            ("eac", self.eac),
            ("etc", self.etc),
            ("vac", self.vac),
            ("tcpi", self.tcpi),
        ]
    }

    /// Shape check for caller-supplied snapshots.
    ///
    /// Every field must be finite and the four scores must lie in `[0, 100]`.
    /// Cross-field consistency is deliberately not checked.
    ///
    /// # Errors
    ///
    /// Returns [`HealthError::InvalidSnapshot`] naming the first bad field.
    pub fn validate(&self) -> Result<(), HealthError> {
        for (field, value) in self.fields() {
            if !value.is_finite() {
                return Err(HealthError::InvalidSnapshot {
                    field,
                    reason: format!("expected a finite number, got {value}"),
                });
            }
        }

        for (field, value) in self.fields().into_iter().take(4) {
            if !(0.0..=100.0).contains(&value) {
                return Err(HealthError::InvalidSnapshot {
                    field,
                    reason: format!("score {value} outside 0..=100"),
                });
            }
        }

        Ok(())
    }
}

/// Where a stored snapshot came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotSource {
    /// Produced by the engine's calculation pipeline.
    #[default]
    Computed,
    /// Submitted directly by a caller for correction or import.
    Manual,
}

impl SnapshotSource {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Computed => "computed",
            Self::Manual => "manual",
        }
    }
}

impl fmt::Display for SnapshotSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SnapshotSource {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s {
            "computed" => Ok(Self::Computed),
            "manual" => Ok(Self::Manual),
            other => anyhow::bail!("unknown snapshot source '{other}'"),
        }
    }
}

/// One persisted row of the daily health series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredSnapshot {
    pub project_id: ProjectId,
    pub date: NaiveDate,
    pub source: SnapshotSource,
    pub recorded_at: DateTime<Utc>,
    #[serde(flatten)]
    pub metrics: HealthMetrics,
}
