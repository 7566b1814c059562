//! `sp record`: store a caller-supplied snapshot, bypassing the calculator.

use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, Utc};
use clap::Args;
use sitepulse_core::db::SqliteStore;
use sitepulse_core::error::HealthError;
use sitepulse_core::model::HealthMetrics;
use sitepulse_evm::{EngineSettings, HealthEngine, ManualSubmission};

use crate::cmd::Session;
use crate::output::{pretty_kv, pretty_section, render_mode};

/// Arguments for `sp record`.
#[derive(Args, Debug)]
pub struct RecordArgs {
    /// Project identifier.
    pub project: String,

    /// JSON metrics object to store; `-` or omitted reads stdin.
    #[arg(long)]
    pub file: Option<PathBuf>,

    /// Snapshot day (YYYY-MM-DD). Defaults to today in UTC.
    #[arg(long, value_parser = parse_day)]
    pub date: Option<NaiveDate>,
}

fn parse_day(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|e| format!("expected YYYY-MM-DD: {e}"))
}

/// Execute `sp record`.
///
/// # Errors
///
/// Returns an error for identity, validation, malformed input or any
/// snapshot store failure.
pub fn run_record(
    args: &RecordArgs,
    agent_flag: Option<&str>,
    json: bool,
    project_root: &Path,
) -> anyhow::Result<()> {
    let session = Session::open(agent_flag, json, project_root)?;

    let body = read_body(args.file.as_deref()).map_err(|e| session.fail(&e))?;
    let metrics = parse_metrics(&body).map_err(|e| session.fail(&e))?;
    let date = args.date.unwrap_or_else(|| Utc::now().date_naive());

    let store = SqliteStore::new(&session.conn);
    let engine = HealthEngine::new(store, store, EngineSettings::from(&session.config));
    let submission = engine
        .submit(&session.caller, &args.project, date, &metrics)
        .map_err(|e| session.fail(&e))?;

    render_mode(
        session.output,
        &submission,
        render_record_text,
        render_record_pretty,
    )
}

/// An unreadable body is reported like a malformed one.
fn read_body(file: Option<&Path>) -> Result<String, HealthError> {
    let unreadable = |source: String, e: std::io::Error| HealthError::InvalidSnapshot {
        field: "body",
        reason: format!("cannot read {source}: {e}"),
    };
    match file {
        Some(path) if path != Path::new("-") => {
            std::fs::read_to_string(path).map_err(|e| unreadable(path.display().to_string(), e))
        }
        _ => {
            let mut body = String::new();
            std::io::stdin()
                .read_to_string(&mut body)
                .map_err(|e| unreadable("stdin".to_string(), e))?;
            Ok(body)
        }
    }
}

fn parse_metrics(body: &str) -> Result<HealthMetrics, HealthError> {
    serde_json::from_str(body).map_err(|e| HealthError::InvalidSnapshot {
        field: "body",
        reason: e.to_string(),
    })
}

fn render_record_text(submission: &ManualSubmission, w: &mut dyn Write) -> std::io::Result<()> {
    let s = &submission.snapshot;
    let status = if submission.inserted { "inserted" } else { "exists" };
    writeln!(
        w,
        "{status}\t{}\t{}\t{}\t{}",
        s.project_id, s.date, s.source, s.metrics.overall_score
    )
}

fn render_record_pretty(submission: &ManualSubmission, w: &mut dyn Write) -> std::io::Result<()> {
    let s = &submission.snapshot;
    if submission.inserted {
        pretty_section(w, "✓ Manual snapshot recorded")?;
    } else {
        pretty_section(w, "◐ Snapshot already recorded for this day (unchanged)")?;
    }
    pretty_kv(w, "project", s.project_id.as_str())?;
    pretty_kv(w, "date", s.date.to_string())?;
    pretty_kv(w, "source", s.source.as_str())?;
    pretty_kv(w, "overall", format!("{:.1}", s.metrics.overall_score))?;
    pretty_kv(w, "recorded at", s.recorded_at.to_rfc3339())
}
