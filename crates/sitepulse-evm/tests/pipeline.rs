//! End-to-end engine behavior over the `SQLite` store and the in-memory
//! repositories: reference figures, zero-data invariants, idempotent daily
//! snapshots, history fidelity, and failure isolation.

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use rusqlite::{Connection, params};
use sitepulse_core::db::{SqliteStore, open_store};
use sitepulse_core::error::HealthError;
use sitepulse_core::identity::CallerIdentity;
use sitepulse_core::memory::MemoryStore;
use sitepulse_core::model::{HealthMetrics, ProjectId, SnapshotSource};
use sitepulse_evm::{EngineSettings, HealthEngine, RecordOutcome};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn caller() -> CallerIdentity {
    CallerIdentity::parse("pm-ops").expect("valid identity")
}

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 6, 15, 12, 0, 0)
        .single()
        .expect("valid timestamp")
}

fn assert_approx_eq(actual: f64, expected: f64, tolerance: f64) {
    assert!(
        (actual - expected).abs() <= tolerance,
        "expected {expected}, got {actual}"
    );
}

fn insert_task(
    conn: &Connection,
    id: &str,
    project: &str,
    window: Option<(i64, i64)>,
    progress: f64,
) {
    let (start, end) = window.map_or((None, None), |(from, to)| {
        (
            Some((now() + Duration::days(from)).to_rfc3339()),
            Some((now() + Duration::days(to)).to_rfc3339()),
        )
    });
    conn.execute(
        "INSERT INTO tasks (task_id, project_id, name, start_date, end_date, progress)
         VALUES (?1, ?2, ?1, ?3, ?4, ?5)",
        params![id, project, start, end, progress],
    )
    .expect("insert task");
}

fn insert_cost(conn: &Connection, resource: &str, project: &str, total: f64) {
    conn.execute(
        "INSERT OR IGNORE INTO resources (resource_id, project_id, name, kind)
         VALUES (?1, ?2, ?1, 'labor')",
        params![resource, project],
    )
    .expect("insert resource");
    conn.execute(
        "INSERT INTO resource_costs (cost_id, resource_id, cost_date, unit_cost, total_cost)
         VALUES (?1 || '-' || ?2, ?1, '2026-06-01T00:00:00Z', ?2, ?2)",
        params![resource, total],
    )
    .expect("insert cost");
}

fn open_temp_store() -> (tempfile::TempDir, Connection) {
    let dir = tempfile::tempdir().expect("temp dir");
    let conn = open_store(&dir.path().join("sitepulse.db")).expect("open store");
    (dir, conn)
}

// ---------------------------------------------------------------------------
// Computation
// ---------------------------------------------------------------------------

/// Tasks averaging 50% actual and 60% planned over a 242,500 ledger.
#[test]
fn reference_project_matches_known_figures() {
    let (_dir, conn) = open_temp_store();
    // Planned fractions: 1.0 (finished window), 0.2 (20% elapsed).
    insert_task(&conn, "t1", "tower-a", Some((-10, -1)), 80.0);
    insert_task(&conn, "t2", "tower-a", Some((-2, 8)), 20.0);
    insert_cost(&conn, "crew", "tower-a", 200_000.0);
    insert_cost(&conn, "crane", "tower-a", 42_500.0);

    let store = SqliteStore::new(&conn);
    let engine = HealthEngine::new(store, store, EngineSettings::default());
    let report = engine.assess(&caller(), "tower-a", now()).expect("assess");
    let m = report.metrics;

    assert_approx_eq(m.bac, 242_500.0, 1e-6);
    assert_approx_eq(m.pv, 145_500.0, 1e-6);
    assert_approx_eq(m.ev, 121_250.0, 1e-6);
    assert_approx_eq(m.ac, 133_375.0, 1e-6);
    assert_approx_eq(m.spi, 0.8335, 1e-3);
    assert_approx_eq(m.cpi, 0.9091, 1e-4);
    assert_approx_eq(m.schedule_variance, -24_250.0, 1e-6);
    assert_approx_eq(m.cost_variance, -12_125.0, 1e-6);
    assert_approx_eq(m.resource_score, 100.0, 1e-9);
}

#[test]
fn project_without_tasks_has_zero_progress_figures() {
    let (_dir, conn) = open_temp_store();
    insert_cost(&conn, "crew", "empty", 10_000.0);

    let store = SqliteStore::new(&conn);
    let engine = HealthEngine::new(store, store, EngineSettings::default());
    let report = engine.assess(&caller(), "empty", now()).expect("assess");

    assert_eq!(report.progress.task_count, 0);
    assert_approx_eq(report.metrics.pv, 0.0, 0.0);
    assert_approx_eq(report.metrics.ev, 0.0, 0.0);
    assert_approx_eq(report.metrics.spi, 0.0, 0.0);
    assert!(report.metrics.fields().iter().all(|(_, v)| v.is_finite()));
}

#[test]
fn project_without_costs_has_zero_money_figures() {
    let (_dir, conn) = open_temp_store();
    insert_task(&conn, "t1", "no-ledger", Some((-5, 5)), 60.0);

    let store = SqliteStore::new(&conn);
    let engine = HealthEngine::new(store, store, EngineSettings::default());
    let m = engine
        .assess(&caller(), "no-ledger", now())
        .expect("assess")
        .metrics;

    for value in [m.bac, m.pv, m.ev, m.ac, m.spi, m.cpi, m.eac] {
        assert_approx_eq(value, 0.0, 0.0);
    }
    assert_approx_eq(m.resource_score, 0.0, 0.0);
}

#[test]
fn out_of_range_progress_is_clamped() {
    let (_dir, conn) = open_temp_store();
    insert_task(&conn, "t1", "p", None, 250.0);
    insert_task(&conn, "t2", "p", None, -40.0);
    insert_cost(&conn, "crew", "p", 1_000.0);

    let store = SqliteStore::new(&conn);
    let engine = HealthEngine::new(store, store, EngineSettings::default());
    let report = engine.assess(&caller(), "p", now()).expect("assess");

    assert_approx_eq(report.progress.avg_actual, 0.5, 1e-12);
    assert_approx_eq(report.progress.avg_planned, 1.0, 1e-12);
}

// ---------------------------------------------------------------------------
// Snapshots and history
// ---------------------------------------------------------------------------

#[test]
fn same_day_health_calls_persist_one_row() {
    let (_dir, conn) = open_temp_store();
    insert_task(&conn, "t1", "tower-a", Some((-5, 5)), 50.0);
    insert_cost(&conn, "crew", "tower-a", 5_000.0);

    let store = SqliteStore::new(&conn);
    let engine = HealthEngine::new(store, store, EngineSettings::default());
    let first = engine.health(&caller(), "tower-a", now()).expect("health");
    let second = engine
        .health(&caller(), "tower-a", now() + Duration::hours(3))
        .expect("health");

    assert_eq!(first.snapshot, RecordOutcome::Inserted);
    assert_eq!(second.snapshot, RecordOutcome::AlreadyRecorded);

    let rows = engine.history(&caller(), "tower-a").expect("history");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].metrics, first.assessment.metrics);
    assert_eq!(rows[0].source, SnapshotSource::Computed);
}

#[test]
fn history_is_capped_ascending_and_verbatim() {
    let (_dir, conn) = open_temp_store();
    insert_task(&conn, "t1", "tower-a", Some((-40, 40)), 50.0);
    insert_cost(&conn, "crew", "tower-a", 5_000.0);

    let store = SqliteStore::new(&conn);
    let engine = HealthEngine::new(store, store, EngineSettings::default());

    // Computed rows for 35 consecutive days, with manual rows mixed in.
    for offset in 0..35 {
        let at = now() - Duration::days(offset);
        if offset % 7 == 0 {
            let manual = HealthMetrics {
                overall_score: 12.5,
                spi: 9.0,
                ..HealthMetrics::default()
            };
            engine
                .submit(&caller(), "tower-a", at.date_naive(), &manual)
                .expect("submit");
        } else {
            engine.health(&caller(), "tower-a", at).expect("health");
        }
    }

    let rows = engine.history(&caller(), "tower-a").expect("history");
    assert_eq!(rows.len(), 30);
    assert!(rows.windows(2).all(|pair| pair[0].date < pair[1].date));
    assert_eq!(rows.last().map(|r| r.date), Some(now().date_naive()));

    let manual: Vec<_> = rows
        .iter()
        .filter(|r| r.source == SnapshotSource::Manual)
        .collect();
    assert!(!manual.is_empty());
    assert!(manual.iter().all(|r| (r.metrics.spi - 9.0).abs() < f64::EPSILON));
}

#[test]
fn submit_returns_stored_row_and_never_overwrites() {
    let (_dir, conn) = open_temp_store();
    let store = SqliteStore::new(&conn);
    let engine = HealthEngine::new(store, store, EngineSettings::default());
    let date = NaiveDate::from_ymd_opt(2026, 6, 1).expect("date");
    let metrics = HealthMetrics {
        overall_score: 64.0,
        schedule_score: 70.0,
        cost_score: 60.0,
        resource_score: 60.0,
        bac: 1_000.0,
        ..HealthMetrics::default()
    };

    let first = engine
        .submit(&caller(), "tower-a", date, &metrics)
        .expect("submit");
    assert!(first.inserted);
    assert_eq!(first.snapshot.metrics, metrics);
    assert_eq!(first.snapshot.source, SnapshotSource::Manual);

    let changed = HealthMetrics {
        overall_score: 1.0,
        ..metrics
    };
    let second = engine
        .submit(&caller(), "tower-a", date, &changed)
        .expect("submit");
    assert!(!second.inserted);
    assert_eq!(second.snapshot, first.snapshot);
}

// ---------------------------------------------------------------------------
// Failure isolation
// ---------------------------------------------------------------------------

#[test]
fn task_read_failure_aborts_computation() {
    let store = MemoryStore::new();
    store.fail_tasks(true);
    let engine = HealthEngine::new(&store, &store, EngineSettings::default());

    let err = engine
        .health(&caller(), "tower-a", now())
        .expect_err("must fail");
    assert!(matches!(err, HealthError::TaskRead(_)));
    let project = ProjectId::parse("tower-a").expect("valid project id");
    assert_eq!(store.snapshot_count(&project), 0);
}

#[test]
fn cost_read_failure_aborts_computation() {
    let store = MemoryStore::new();
    store.fail_costs(true);
    let engine = HealthEngine::new(&store, &store, EngineSettings::default());

    let err = engine
        .assess(&caller(), "tower-a", now())
        .expect_err("must fail");
    assert!(matches!(err, HealthError::CostRead(_)));
}

#[test]
fn snapshot_write_failure_still_returns_metrics() {
    let store = MemoryStore::new();
    store.fail_snapshots(true);
    let engine = HealthEngine::new(&store, &store, EngineSettings::default());

    let report = engine
        .health(&caller(), "tower-a", now())
        .expect("metrics survive write failure");
    assert_eq!(report.snapshot, RecordOutcome::Failed);
    assert!(report.assessment.metrics.fields().iter().all(|(_, v)| v.is_finite()));
}
