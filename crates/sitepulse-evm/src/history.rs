//! Daily snapshot persistence and the history read path.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sitepulse_core::error::HealthError;
use sitepulse_core::model::{HealthMetrics, ProjectId, SnapshotSource, StoredSnapshot};
use sitepulse_core::repo::{DEFAULT_HISTORY_LIMIT, HealthSnapshotRepository, RepositoryError};
use tracing::{debug, info, warn};

/// What happened to the snapshot of a computed health check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordOutcome {
    /// A new row was written for the day.
    Inserted,
    /// The day already had a row; nothing was written.
    AlreadyRecorded,
    /// The write failed and was logged.
    Failed,
    /// Recording is disabled for this call.
    Skipped,
}

impl RecordOutcome {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Inserted => "inserted",
            Self::AlreadyRecorded => "already_recorded",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        }
    }
}

/// Keeps at most one snapshot per project per calendar day.
#[derive(Debug, Clone)]
pub struct HistoryRecorder<H> {
    snapshots: H,
    limit: usize,
}

impl<H: HealthSnapshotRepository> HistoryRecorder<H> {
    #[must_use]
    pub const fn new(snapshots: H) -> Self {
        Self {
            snapshots,
            limit: DEFAULT_HISTORY_LIMIT,
        }
    }

    /// Cap on the number of rows served by [`Self::history`]. Zero is
    /// treated as one.
    #[must_use]
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit.max(1);
        self
    }

    /// Best-effort insert of a computed snapshot for `date`.
    ///
    /// Storage failures are logged and reported as
    /// [`RecordOutcome::Failed`]; they never reach the caller as errors.
    pub fn record(
        &self,
        project: &ProjectId,
        date: NaiveDate,
        metrics: &HealthMetrics,
        recorded_at: DateTime<Utc>,
    ) -> RecordOutcome {
        let snapshot = StoredSnapshot {
            project_id: project.clone(),
            date,
            source: SnapshotSource::Computed,
            recorded_at,
            metrics: *metrics,
        };

        match self.snapshots.try_insert(&snapshot) {
            Ok(true) => {
                info!(%date, overall_score = metrics.overall_score, "recorded health snapshot");
                RecordOutcome::Inserted
            }
            Ok(false) => {
                debug!(%date, "health snapshot already recorded for day");
                RecordOutcome::AlreadyRecorded
            }
            Err(error) => {
                warn!(%date, %error, "failed to persist health snapshot");
                RecordOutcome::Failed
            }
        }
    }

    /// Persist caller-supplied metrics for `date` as a manual snapshot and
    /// return the row stored under that key.
    ///
    /// When the day already has a row, that row is returned unchanged with
    /// `inserted == false`.
    ///
    /// # Errors
    ///
    /// Returns [`HealthError::InvalidSnapshot`] for non-finite fields or
    /// out-of-range scores, and a write/read error when the store fails.
    pub fn record_manual(
        &self,
        project: &ProjectId,
        date: NaiveDate,
        metrics: &HealthMetrics,
        recorded_at: DateTime<Utc>,
    ) -> Result<(StoredSnapshot, bool), HealthError> {
        metrics.validate()?;

        let snapshot = StoredSnapshot {
            project_id: project.clone(),
            date,
            source: SnapshotSource::Manual,
            recorded_at,
            metrics: *metrics,
        };
        let inserted = self
            .snapshots
            .try_insert(&snapshot)
            .map_err(HealthError::SnapshotWrite)?;

        let stored = self
            .snapshots
            .find(project, date)
            .map_err(HealthError::SnapshotRead)?
            .ok_or_else(|| {
                HealthError::SnapshotRead(RepositoryError::Unavailable(format!(
                    "no snapshot stored for {project} on {date}"
                )))
            })?;

        if inserted {
            info!(%date, "recorded manual health snapshot");
        } else {
            debug!(%date, "manual snapshot skipped; day already recorded");
        }
        Ok((stored, inserted))
    }

    /// Up to [`Self::limit`] most recent rows, ascending by date, verbatim.
    ///
    /// # Errors
    ///
    /// Returns [`HealthError::SnapshotRead`] if the store cannot be read.
    pub fn history(&self, project: &ProjectId) -> Result<Vec<StoredSnapshot>, HealthError> {
        self.snapshots
            .recent(project, self.limit)
            .map_err(HealthError::SnapshotRead)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sitepulse_core::memory::MemoryStore;

    fn pid() -> ProjectId {
        ProjectId::parse("tower-a").expect("valid project id")
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 4, d).expect("valid date")
    }

    fn metrics(overall: f64) -> HealthMetrics {
        HealthMetrics {
            overall_score: overall,
            ..HealthMetrics::default()
        }
    }

    #[test]
    fn record_is_idempotent_per_day() {
        let store = MemoryStore::new();
        let recorder = HistoryRecorder::new(&store);

        let first = recorder.record(&pid(), day(1), &metrics(70.0), Utc::now());
        let second = recorder.record(&pid(), day(1), &metrics(10.0), Utc::now());

        assert_eq!(first, RecordOutcome::Inserted);
        assert_eq!(second, RecordOutcome::AlreadyRecorded);
        assert_eq!(store.snapshot_count(&pid()), 1);
        let rows = recorder.history(&pid()).expect("history");
        assert!((rows[0].metrics.overall_score - 70.0).abs() < f64::EPSILON);
    }

    #[test]
    fn record_swallows_write_failures() {
        let store = MemoryStore::new();
        store.fail_snapshots(true);
        let recorder = HistoryRecorder::new(&store);

        let outcome = recorder.record(&pid(), day(1), &metrics(70.0), Utc::now());
        assert_eq!(outcome, RecordOutcome::Failed);
    }

    #[test]
    fn history_is_capped_and_ascending() {
        let store = MemoryStore::new();
        let recorder = HistoryRecorder::new(&store).with_limit(3);
        for d in [5, 1, 4, 2, 3] {
            recorder.record(&pid(), day(d), &metrics(f64::from(d)), Utc::now());
        }

        let dates: Vec<NaiveDate> = recorder
            .history(&pid())
            .expect("history")
            .into_iter()
            .map(|row| row.date)
            .collect();
        assert_eq!(dates, vec![day(3), day(4), day(5)]);
    }

    #[test]
    fn history_read_failure_is_an_error() {
        let store = MemoryStore::new();
        store.fail_snapshots(true);
        let err = HistoryRecorder::new(&store)
            .history(&pid())
            .expect_err("must fail");
        assert!(matches!(err, HealthError::SnapshotRead(_)));
    }

    #[test]
    fn manual_snapshot_is_tagged_and_returned() {
        let store = MemoryStore::new();
        let recorder = HistoryRecorder::new(&store);

        let (row, inserted) = recorder
            .record_manual(&pid(), day(2), &metrics(55.5), Utc::now())
            .expect("manual record");
        assert!(inserted);
        assert_eq!(row.source, SnapshotSource::Manual);
        assert_eq!(row.date, day(2));
    }

    #[test]
    fn manual_snapshot_on_taken_day_returns_existing_row() {
        let store = MemoryStore::new();
        let recorder = HistoryRecorder::new(&store);
        recorder.record(&pid(), day(2), &metrics(40.0), Utc::now());

        let (row, inserted) = recorder
            .record_manual(&pid(), day(2), &metrics(99.0), Utc::now())
            .expect("manual record");
        assert!(!inserted);
        assert_eq!(row.source, SnapshotSource::Computed);
        assert!((row.metrics.overall_score - 40.0).abs() < f64::EPSILON);
    }

    #[test]
    fn manual_snapshot_rejects_out_of_range_scores() {
        let store = MemoryStore::new();
        let err = HistoryRecorder::new(&store)
            .record_manual(&pid(), day(2), &metrics(140.0), Utc::now())
            .expect_err("must reject");
        assert!(matches!(err, HealthError::InvalidSnapshot { .. }));
        assert_eq!(store.snapshot_count(&pid()), 0);
    }

    #[test]
    fn manual_snapshot_write_failure_is_an_error() {
        let store = MemoryStore::new();
        store.fail_snapshots(true);
        let err = HistoryRecorder::new(&store)
            .record_manual(&pid(), day(2), &metrics(50.0), Utc::now())
            .expect_err("must fail");
        assert!(matches!(err, HealthError::SnapshotWrite(_)));
    }
}
