//! Canonical `SQLite` schema for the sitepulse store.
//!
//! - `tasks`, `resources`, `resource_costs` mirror the records owned by the
//!   project-management CRUD services; the engine only reads them
//! - `health_snapshots` is the append-only daily series, one row per
//!   `(project_id, snapshot_date)`
//! - `store_meta` tracks the schema version for diagnostics

/// Migration v1: collaborator tables, the snapshot series, and store metadata.
pub const MIGRATION_V1_SQL: &str = r"
CREATE TABLE IF NOT EXISTS tasks (
    task_id TEXT PRIMARY KEY,
    project_id TEXT NOT NULL,
    name TEXT NOT NULL DEFAULT '',
    start_date TEXT,
    end_date TEXT,
    progress REAL NOT NULL DEFAULT 0,
    status TEXT NOT NULL DEFAULT 'not_started'
);

CREATE TABLE IF NOT EXISTS resources (
    resource_id TEXT PRIMARY KEY,
    project_id TEXT NOT NULL,
    name TEXT NOT NULL DEFAULT '',
    kind TEXT NOT NULL CHECK (kind IN ('labor', 'equipment', 'material')),
    rate REAL
);

CREATE TABLE IF NOT EXISTS resource_costs (
    cost_id TEXT PRIMARY KEY,
    resource_id TEXT NOT NULL REFERENCES resources(resource_id) ON DELETE CASCADE,
    cost_date TEXT NOT NULL,
    quantity REAL,
    unit_cost REAL NOT NULL,
    total_cost REAL NOT NULL
);

CREATE TABLE IF NOT EXISTS health_snapshots (
    project_id TEXT NOT NULL,
    snapshot_date TEXT NOT NULL,
    overall_score REAL NOT NULL,
    schedule_score REAL NOT NULL,
    cost_score REAL NOT NULL,
    resource_score REAL NOT NULL,
    spi REAL NOT NULL,
    cpi REAL NOT NULL,
    schedule_variance REAL NOT NULL,
    cost_variance REAL NOT NULL,
    bac REAL NOT NULL,
    pv REAL NOT NULL,
    ev REAL NOT NULL,
    ac REAL NOT NULL,
    eac REAL NOT NULL,
    etc REAL NOT NULL,
    vac REAL NOT NULL,
    tcpi REAL NOT NULL,
    recorded_at TEXT NOT NULL,
    PRIMARY KEY (project_id, snapshot_date)
);

CREATE TABLE IF NOT EXISTS store_meta (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    schema_version INTEGER NOT NULL
);

INSERT OR IGNORE INTO store_meta (id, schema_version) VALUES (1, 1);
";

/// Migration v2: read-path indexes and snapshot provenance.
pub const MIGRATION_V2_SQL: &str = r"
CREATE INDEX IF NOT EXISTS idx_tasks_project
    ON tasks(project_id);

CREATE INDEX IF NOT EXISTS idx_resources_project
    ON resources(project_id, resource_id);

CREATE INDEX IF NOT EXISTS idx_resource_costs_resource
    ON resource_costs(resource_id);

CREATE INDEX IF NOT EXISTS idx_health_snapshots_project_date
    ON health_snapshots(project_id, snapshot_date DESC);

ALTER TABLE health_snapshots
    ADD COLUMN source TEXT NOT NULL DEFAULT 'computed'
    CHECK (source IN ('computed', 'manual'));
";

/// Indexes expected by the engine's read paths.
pub const REQUIRED_INDEXES: &[&str] = &[
    "idx_tasks_project",
    "idx_resources_project",
    "idx_resource_costs_resource",
    "idx_health_snapshots_project_date",
];

#[cfg(test)]
mod tests {
    use crate::db::migrations;
    use rusqlite::{Connection, params};

    fn seeded_conn() -> rusqlite::Result<Connection> {
        let mut conn = Connection::open_in_memory()?;
        migrations::migrate(&mut conn).expect("migrate store schema");

        for idx in 0..24_u32 {
            let project = if idx % 2 == 0 { "tower-a" } else { "tower-b" };
            conn.execute(
                "INSERT INTO tasks (task_id, project_id, name, progress)
                 VALUES (?1, ?2, ?3, ?4)",
                params![format!("t-{idx}"), project, format!("Pour slab {idx}"), f64::from(idx)],
            )?;
            conn.execute(
                "INSERT INTO resources (resource_id, project_id, name, kind)
                 VALUES (?1, ?2, 'crew', 'labor')",
                params![format!("r-{idx}"), project],
            )?;
            conn.execute(
                "INSERT INTO resource_costs (cost_id, resource_id, cost_date, unit_cost, total_cost)
                 VALUES (?1, ?2, '2026-01-01T00:00:00Z', 10.0, 10.0)",
                params![format!("c-{idx}"), format!("r-{idx}")],
            )?;
        }

        Ok(conn)
    }

    fn query_plan_details(conn: &Connection, sql: &str) -> rusqlite::Result<Vec<String>> {
        let mut stmt = conn.prepare(&format!("EXPLAIN QUERY PLAN {sql}"))?;
        stmt.query_map([], |row| row.get::<_, String>(3))?
            .collect::<Result<Vec<_>, _>>()
    }

    #[test]
    fn query_plan_uses_task_project_index() -> rusqlite::Result<()> {
        let conn = seeded_conn()?;
        let details = query_plan_details(
            &conn,
            "SELECT task_id FROM tasks WHERE project_id = 'tower-a'",
        )?;

        assert!(
            details
                .iter()
                .any(|detail| detail.contains("idx_tasks_project")),
            "expected task index in plan, got: {details:?}"
        );

        Ok(())
    }

    #[test]
    fn query_plan_uses_snapshot_index_for_history() -> rusqlite::Result<()> {
        let conn = seeded_conn()?;
        let details = query_plan_details(
            &conn,
            "SELECT snapshot_date FROM health_snapshots
             WHERE project_id = 'tower-a'
             ORDER BY snapshot_date DESC
             LIMIT 30",
        )?;

        assert!(
            details.iter().any(|detail| {
                detail.contains("idx_health_snapshots_project_date")
                    || detail.contains("sqlite_autoindex_health_snapshots_1")
            }),
            "expected snapshot key index in plan, got: {details:?}"
        );

        Ok(())
    }

    #[test]
    fn snapshot_key_is_unique_per_day() -> rusqlite::Result<()> {
        let conn = seeded_conn()?;
        let insert = "INSERT INTO health_snapshots (
                project_id, snapshot_date, overall_score, schedule_score, cost_score,
                resource_score, spi, cpi, schedule_variance, cost_variance, bac, pv, ev,
                ac, eac, etc, vac, tcpi, recorded_at
            ) VALUES ('tower-a', '2026-02-01', 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 'x')
            ON CONFLICT(project_id, snapshot_date) DO NOTHING";

        assert_eq!(conn.execute(insert, [])?, 1);
        assert_eq!(conn.execute(insert, [])?, 0);
        Ok(())
    }

    #[test]
    fn source_column_rejects_unknown_provenance() -> rusqlite::Result<()> {
        let conn = seeded_conn()?;
        let result = conn.execute(
            "INSERT INTO health_snapshots (
                project_id, snapshot_date, overall_score, schedule_score, cost_score,
                resource_score, spi, cpi, schedule_variance, cost_variance, bac, pv, ev,
                ac, eac, etc, vac, tcpi, recorded_at, source
            ) VALUES ('tower-a', '2026-02-02', 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 'x', 'guess')",
            [],
        );
        assert!(result.is_err());
        Ok(())
    }
}
