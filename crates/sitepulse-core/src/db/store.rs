//! Repository implementations over a `SQLite` connection.
//!
//! Timestamps are stored as RFC 3339 UTC text. Snapshot days are stored as
//! `YYYY-MM-DD`. Collaborator-written timestamps are also accepted as
//! `YYYY-MM-DD HH:MM:SS` or a bare date (midnight UTC).

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, Row, Transaction, params};

use crate::model::{
    HealthMetrics, ProjectId, ResourceCoverage, SnapshotSource, StoredSnapshot, Task,
};
use crate::repo::{
    HealthSnapshotRepository, ProjectReader, RepositoryError, ResourceCostRepository,
    TaskRepository,
};

const SNAPSHOT_DATE_FORMAT: &str = "%Y-%m-%d";

const SNAPSHOT_COLUMNS: &str = "project_id, snapshot_date, source, recorded_at, \
     overall_score, schedule_score, cost_score, resource_score, spi, cpi, \
     schedule_variance, cost_variance, bac, pv, ev, ac, eac, etc, vac, tcpi";

/// All three repositories backed by one connection.
#[derive(Debug, Clone, Copy)]
pub struct SqliteStore<'c> {
    conn: &'c Connection,
}

impl<'c> SqliteStore<'c> {
    #[must_use]
    pub const fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    /// Open a deferred read transaction for one computation's reads.
    ///
    /// The view must be dropped before snapshots are written through the
    /// same connection; dropping it rolls back, which is a no-op for reads.
    ///
    /// # Errors
    ///
    /// Returns an error if `SQLite` refuses to begin the transaction.
    pub fn read_view(&self) -> Result<ReadView<'c>, RepositoryError> {
        Ok(ReadView {
            tx: self.conn.unchecked_transaction()?,
        })
    }
}

/// Task and cost reads pinned to a single `SQLite` read transaction.
pub struct ReadView<'c> {
    tx: Transaction<'c>,
}

impl ProjectReader for SqliteStore<'_> {
    type View<'a>
        = ReadView<'a>
    where
        Self: 'a;

    fn begin_read(&self) -> Result<Self::View<'_>, RepositoryError> {
        self.read_view()
    }
}

impl TaskRepository for SqliteStore<'_> {
    fn list_by_project(&self, project: &ProjectId) -> Result<Vec<Task>, RepositoryError> {
        list_tasks(self.conn, project)
    }
}

impl ResourceCostRepository for SqliteStore<'_> {
    fn sum_by_project(&self, project: &ProjectId) -> Result<f64, RepositoryError> {
        sum_costs(self.conn, project)
    }

    fn coverage_by_project(
        &self,
        project: &ProjectId,
    ) -> Result<ResourceCoverage, RepositoryError> {
        cost_coverage(self.conn, project)
    }
}

impl TaskRepository for ReadView<'_> {
    fn list_by_project(&self, project: &ProjectId) -> Result<Vec<Task>, RepositoryError> {
        list_tasks(&self.tx, project)
    }
}

impl ResourceCostRepository for ReadView<'_> {
    fn sum_by_project(&self, project: &ProjectId) -> Result<f64, RepositoryError> {
        sum_costs(&self.tx, project)
    }

    fn coverage_by_project(
        &self,
        project: &ProjectId,
    ) -> Result<ResourceCoverage, RepositoryError> {
        cost_coverage(&self.tx, project)
    }
}

impl HealthSnapshotRepository for SqliteStore<'_> {
    fn try_insert(&self, snapshot: &StoredSnapshot) -> Result<bool, RepositoryError> {
        let m = &snapshot.metrics;
        let changed = self.conn.execute(
            &format!(
                "INSERT INTO health_snapshots ({SNAPSHOT_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10,
                         ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20)
                 ON CONFLICT(project_id, snapshot_date) DO NOTHING"
            ),
            params![
                snapshot.project_id.as_str(),
                snapshot.date.format(SNAPSHOT_DATE_FORMAT).to_string(),
                snapshot.source.as_str(),
                snapshot
                    .recorded_at
                    .to_rfc3339_opts(SecondsFormat::Micros, true),
                m.overall_score,
                m.schedule_score,
                m.cost_score,
                m.resource_score,
                m.spi,
                m.cpi,
                m.schedule_variance,
                m.cost_variance,
                m.bac,
                m.pv,
                m.ev,
                m.ac,
                m.eac,
                m.etc,
                m.vac,
                m.tcpi,
            ],
        )?;
        Ok(changed == 1)
    }

    fn recent(
        &self,
        project: &ProjectId,
        limit: usize,
    ) -> Result<Vec<StoredSnapshot>, RepositoryError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {SNAPSHOT_COLUMNS} FROM (
                 SELECT * FROM health_snapshots
                 WHERE project_id = ?1
                 ORDER BY snapshot_date DESC
                 LIMIT ?2
             )
             ORDER BY snapshot_date ASC"
        ))?;
        let raw = stmt
            .query_map(params![project.as_str(), limit], RawSnapshot::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        raw.into_iter().map(RawSnapshot::decode).collect()
    }

    fn find(
        &self,
        project: &ProjectId,
        date: NaiveDate,
    ) -> Result<Option<StoredSnapshot>, RepositoryError> {
        let raw = self
            .conn
            .query_row(
                &format!(
                    "SELECT {SNAPSHOT_COLUMNS} FROM health_snapshots
                     WHERE project_id = ?1 AND snapshot_date = ?2"
                ),
                params![
                    project.as_str(),
                    date.format(SNAPSHOT_DATE_FORMAT).to_string()
                ],
                RawSnapshot::from_row,
            )
            .optional()?;
        raw.map(RawSnapshot::decode).transpose()
    }
}

fn list_tasks(conn: &Connection, project: &ProjectId) -> Result<Vec<Task>, RepositoryError> {
    let mut stmt = conn.prepare_cached(
        "SELECT task_id, name, start_date, end_date, progress, status
         FROM tasks
         WHERE project_id = ?1
         ORDER BY task_id",
    )?;
    let rows = stmt
        .query_map([project.as_str()], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<String>>(2)?,
                row.get::<_, Option<String>>(3)?,
                row.get::<_, f64>(4)?,
                row.get::<_, String>(5)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|(id, name, start, end, progress, status)| {
            Ok(Task {
                id,
                project_id: project.clone(),
                name,
                start_date: start
                    .as_deref()
                    .map(|raw| parse_timestamp("tasks.start_date", raw))
                    .transpose()?,
                end_date: end
                    .as_deref()
                    .map(|raw| parse_timestamp("tasks.end_date", raw))
                    .transpose()?,
                progress,
                status,
            })
        })
        .collect()
}

/// Same reduction as [`ledger_total`]: infinite amounts are skipped (NaN
/// cannot be stored).
///
/// [`ledger_total`]: crate::model::ledger_total
fn sum_costs(conn: &Connection, project: &ProjectId) -> Result<f64, RepositoryError> {
    // 9e999 reads as +inf in SQLite.
    let total: f64 = conn.query_row(
        "SELECT COALESCE(SUM(c.total_cost), 0.0)
         FROM resource_costs c
         JOIN resources r ON r.resource_id = c.resource_id
         WHERE r.project_id = ?1 AND abs(c.total_cost) < 9e999",
        [project.as_str()],
        |row| row.get(0),
    )?;
    Ok(total)
}

fn cost_coverage(
    conn: &Connection,
    project: &ProjectId,
) -> Result<ResourceCoverage, RepositoryError> {
    let (total, with_costs): (i64, i64) = conn.query_row(
        "SELECT COUNT(DISTINCT r.resource_id), COUNT(DISTINCT c.resource_id)
         FROM resources r
         LEFT JOIN resource_costs c ON c.resource_id = r.resource_id
         WHERE r.project_id = ?1",
        [project.as_str()],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;
    Ok(ResourceCoverage {
        total_resources: decode_count("resources", total)?,
        resources_with_costs: decode_count("resource_costs", with_costs)?,
    })
}

fn decode_count(field: &'static str, value: i64) -> Result<u64, RepositoryError> {
    u64::try_from(value).map_err(|e| RepositoryError::Decode {
        field,
        reason: e.to_string(),
    })
}

fn parse_timestamp(field: &'static str, raw: &str) -> Result<DateTime<Utc>, RepositoryError> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Ok(naive.and_utc());
    }
    if let Some(midnight) = NaiveDate::parse_from_str(raw, SNAPSHOT_DATE_FORMAT)
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
    {
        return Ok(midnight.and_utc());
    }
    Err(RepositoryError::Decode {
        field,
        reason: format!("unrecognized timestamp {raw:?}"),
    })
}

struct RawSnapshot {
    project_id: String,
    date: String,
    source: String,
    recorded_at: String,
    metrics: HealthMetrics,
}

impl RawSnapshot {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            project_id: row.get(0)?,
            date: row.get(1)?,
            source: row.get(2)?,
            recorded_at: row.get(3)?,
            metrics: HealthMetrics {
                overall_score: row.get(4)?,
                schedule_score: row.get(5)?,
                cost_score: row.get(6)?,
                resource_score: row.get(7)?,
                spi: row.get(8)?,
                cpi: row.get(9)?,
                schedule_variance: row.get(10)?,
                cost_variance: row.get(11)?,
                bac: row.get(12)?,
                pv: row.get(13)?,
                ev: row.get(14)?,
                ac: row.get(15)?,
                eac: row.get(16)?,
                etc: row.get(17)?,
                vac: row.get(18)?,
                tcpi: row.get(19)?,
            },
        })
    }

    fn decode(self) -> Result<StoredSnapshot, RepositoryError> {
        let decode_err = |field, reason: String| RepositoryError::Decode { field, reason };
        Ok(StoredSnapshot {
            project_id: ProjectId::parse(&self.project_id)
                .map_err(|e| decode_err("health_snapshots.project_id", e.to_string()))?,
            date: NaiveDate::parse_from_str(&self.date, SNAPSHOT_DATE_FORMAT)
                .map_err(|e| decode_err("health_snapshots.snapshot_date", e.to_string()))?,
            source: self
                .source
                .parse::<SnapshotSource>()
                .map_err(|e| decode_err("health_snapshots.source", e.to_string()))?,
            recorded_at: parse_timestamp("health_snapshots.recorded_at", &self.recorded_at)?,
            metrics: self.metrics,
        })
    }
}
