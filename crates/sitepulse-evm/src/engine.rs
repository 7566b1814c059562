//! The health pipeline: validate, aggregate, calculate, compose, record.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sitepulse_core::config::ProjectConfig;
use sitepulse_core::error::HealthError;
use sitepulse_core::identity::CallerIdentity;
use sitepulse_core::model::{HealthMetrics, ProjectId, ResourceCoverage, StoredSnapshot};
use sitepulse_core::repo::{
    DEFAULT_HISTORY_LIMIT, HealthSnapshotRepository, ProjectReader, ResourceCostRepository,
    TaskRepository,
};
use tracing::{debug, instrument};

use crate::evm::{self, EvmFigures, EvmParams};
use crate::history::{HistoryRecorder, RecordOutcome};
use crate::ledger::normalize_bac;
use crate::progress::{self, ProgressSummary};
use crate::score::{self, HealthScores, HealthWeights};

/// Engine tunables, usually derived from `.sitepulse/config.toml`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineSettings {
    pub weights: HealthWeights,
    pub evm: EvmParams,
    pub history_limit: usize,
    pub record_on_health: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            weights: HealthWeights::default(),
            evm: EvmParams::default(),
            history_limit: DEFAULT_HISTORY_LIMIT,
            record_on_health: true,
        }
    }
}

impl From<&ProjectConfig> for EngineSettings {
    fn from(config: &ProjectConfig) -> Self {
        Self {
            weights: HealthWeights::from(&config.scoring),
            evm: EvmParams::from(&config.evm),
            history_limit: config.history.limit,
            record_on_health: config.history.record_on_health,
        }
    }
}

/// Result of one health computation, before any persistence.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Assessment {
    pub project_id: ProjectId,
    pub evaluated_at: DateTime<Utc>,
    pub progress: ProgressSummary,
    pub coverage: ResourceCoverage,
    #[serde(flatten)]
    pub metrics: HealthMetrics,
}

/// Response of [`HealthEngine::health`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    #[serde(flatten)]
    pub assessment: Assessment,
    pub snapshot_date: NaiveDate,
    pub snapshot: RecordOutcome,
}

/// Response of [`HealthEngine::submit`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualSubmission {
    pub inserted: bool,
    pub snapshot: StoredSnapshot,
}

/// Computes project health from injected repositories.
///
/// `R` supplies task and cost reads; each computation takes them from one
/// [`ProjectReader::begin_read`] view. `H` stores the daily series.
pub struct HealthEngine<R, H> {
    reader: R,
    recorder: HistoryRecorder<H>,
    settings: EngineSettings,
}

impl<R, H> HealthEngine<R, H>
where
    R: ProjectReader,
    H: HealthSnapshotRepository,
{
    #[must_use]
    pub fn new(reader: R, snapshots: H, settings: EngineSettings) -> Self {
        Self {
            reader,
            recorder: HistoryRecorder::new(snapshots).with_limit(settings.history_limit),
            settings,
        }
    }

    /// Compute the metrics for `project` at `now` without writing anything.
    ///
    /// # Errors
    ///
    /// Fails with a validation error for a malformed project id, and with
    /// [`HealthError::TaskRead`] or [`HealthError::CostRead`] when a
    /// collaborator read fails. No partial metrics are returned.
    #[instrument(skip_all, fields(project_id = project, caller = %caller))]
    pub fn assess(
        &self,
        caller: &CallerIdentity,
        project: &str,
        now: DateTime<Utc>,
    ) -> Result<Assessment, HealthError> {
        let project = ProjectId::parse(project)?;
        self.compute(project, now)
    }

    /// Compute the metrics and best-effort record them for `now`'s UTC day.
    ///
    /// # Errors
    ///
    /// Same as [`Self::assess`]. Snapshot write failures are logged and
    /// reported through [`HealthReport::snapshot`], never as an error.
    #[instrument(skip_all, fields(project_id = project, caller = %caller))]
    pub fn health(
        &self,
        caller: &CallerIdentity,
        project: &str,
        now: DateTime<Utc>,
    ) -> Result<HealthReport, HealthError> {
        let project = ProjectId::parse(project)?;
        let assessment = self.compute(project, now)?;
        let snapshot_date = now.date_naive();

        let snapshot = if self.settings.record_on_health {
            self.recorder.record(
                &assessment.project_id,
                snapshot_date,
                &assessment.metrics,
                Utc::now(),
            )
        } else {
            RecordOutcome::Skipped
        };

        Ok(HealthReport {
            assessment,
            snapshot_date,
            snapshot,
        })
    }

    /// Stored snapshots for `project`, ascending by date, verbatim.
    ///
    /// # Errors
    ///
    /// Fails for a malformed project id or an unreadable snapshot store.
    #[instrument(skip_all, fields(project_id = project, caller = %caller))]
    pub fn history(
        &self,
        caller: &CallerIdentity,
        project: &str,
    ) -> Result<Vec<StoredSnapshot>, HealthError> {
        let project = ProjectId::parse(project)?;
        let rows = self.recorder.history(&project)?;
        debug!(rows = rows.len(), "served snapshot history");
        Ok(rows)
    }

    /// Persist caller-supplied metrics for `date`, bypassing the calculator.
    ///
    /// # Errors
    ///
    /// Fails for a malformed project id, invalid metrics, or a store
    /// failure. Unlike [`Self::health`], write failures are surfaced.
    #[instrument(skip_all, fields(project_id = project, caller = %caller, date = %date))]
    pub fn submit(
        &self,
        caller: &CallerIdentity,
        project: &str,
        date: NaiveDate,
        metrics: &HealthMetrics,
    ) -> Result<ManualSubmission, HealthError> {
        let project = ProjectId::parse(project)?;
        let (snapshot, inserted) =
            self.recorder
                .record_manual(&project, date, metrics, Utc::now())?;
        Ok(ManualSubmission { inserted, snapshot })
    }

    fn compute(&self, project: ProjectId, now: DateTime<Utc>) -> Result<Assessment, HealthError> {
        // The view is dropped before anything is recorded.
        let (tasks, raw_bac, coverage) = {
            let view = self.reader.begin_read().map_err(HealthError::TaskRead)?;
            let tasks = view
                .list_by_project(&project)
                .map_err(HealthError::TaskRead)?;
            let raw_bac = view
                .sum_by_project(&project)
                .map_err(HealthError::CostRead)?;
            let coverage = view
                .coverage_by_project(&project)
                .map_err(HealthError::CostRead)?;
            (tasks, raw_bac, coverage)
        };

        let progress = progress::task_progress(&tasks, now);
        let bac = normalize_bac(raw_bac);
        let figures = evm::calculate(
            bac,
            progress.avg_actual,
            progress.avg_planned,
            &self.settings.evm,
        );
        let scores = score::compose(
            figures.spi,
            figures.cpi,
            coverage.ratio(),
            &self.settings.weights,
        );

        debug!(
            tasks = progress.task_count,
            avg_actual = progress.avg_actual,
            avg_planned = progress.avg_planned,
            bac,
            spi = figures.spi,
            cpi = figures.cpi,
            overall_score = scores.overall_score,
            "computed project health"
        );

        Ok(Assessment {
            project_id: project,
            evaluated_at: now,
            progress,
            coverage,
            metrics: to_metrics(&figures, &scores),
        })
    }
}

const fn to_metrics(figures: &EvmFigures, scores: &HealthScores) -> HealthMetrics {
    HealthMetrics {
        overall_score: scores.overall_score,
        schedule_score: scores.schedule_score,
        cost_score: scores.cost_score,
        resource_score: scores.resource_score,
        spi: figures.spi,
        cpi: figures.cpi,
        schedule_variance: figures.schedule_variance,
        cost_variance: figures.cost_variance,
        bac: figures.bac,
        pv: figures.pv,
        ev: figures.ev,
        ac: figures.ac,
        eac: figures.eac,
        etc: figures.etc,
        vac: figures.vac,
        tcpi: figures.tcpi,
    }
}
