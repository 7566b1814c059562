//! `sp history`: stored snapshots, oldest first.

use std::io::{self, Write};
use std::path::Path;

use clap::Args;
use sitepulse_core::db::SqliteStore;
use sitepulse_core::model::StoredSnapshot;
use sitepulse_evm::{EngineSettings, HealthEngine};

use crate::cmd::Session;
use crate::output::{OutputMode, Renderable, pretty_section, render_list};

/// Arguments for `sp history`.
#[derive(Args, Debug)]
pub struct HistoryArgs {
    /// Project identifier.
    pub project: String,
}

/// Execute `sp history`.
///
/// # Errors
///
/// Returns an error for identity, validation, config or snapshot read
/// failures.
pub fn run_history(
    args: &HistoryArgs,
    agent_flag: Option<&str>,
    json: bool,
    project_root: &Path,
) -> anyhow::Result<()> {
    let session = Session::open(agent_flag, json, project_root)?;

    let store = SqliteStore::new(&session.conn);
    let engine = HealthEngine::new(store, store, EngineSettings::from(&session.config));
    let rows = engine
        .history(&session.caller, &args.project)
        .map_err(|e| session.fail(&e))?;

    let rows: Vec<HistoryRow> = rows.into_iter().map(HistoryRow).collect();
    if session.output == OutputMode::Pretty {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        let heading = format!(
            "Health history: {} ({} days)",
            args.project.trim(),
            rows.len()
        );
        pretty_section(&mut out, &heading)?;
        writeln!(
            out,
            "{:<10}  {:<8}  {:>7}  {:>6}  {:>6}  {:>8}",
            "date", "source", "overall", "spi", "cpi", "tcpi"
        )?;
    }
    render_list(&rows, session.output)?;
    Ok(())
}

struct HistoryRow(StoredSnapshot);

impl Renderable for HistoryRow {
    fn render_human(&self, w: &mut dyn Write) -> io::Result<()> {
        let s = &self.0;
        writeln!(
            w,
            "{:<10}  {:<8}  {:>7.1}  {:>6.3}  {:>6.3}  {:>8.3}",
            s.date,
            s.source.as_str(),
            s.metrics.overall_score,
            s.metrics.spi,
            s.metrics.cpi,
            s.metrics.tcpi
        )
    }

    fn render_json(&self, w: &mut dyn Write) -> io::Result<()> {
        serde_json::to_writer(&mut *w, &self.0)?;
        writeln!(w)
    }

    fn render_table(&self, w: &mut dyn Write) -> io::Result<()> {
        let s = &self.0;
        writeln!(
            w,
            "{}  {}  {}  {}  {}  {}  {}",
            s.date,
            s.source,
            s.metrics.overall_score,
            s.metrics.schedule_score,
            s.metrics.cost_score,
            s.metrics.spi,
            s.metrics.cpi
        )
    }

    fn table_headers() -> &'static [&'static str] {
        &["DATE", "SOURCE", "OVERALL", "SCHEDULE", "COST", "SPI", "CPI"]
    }
}
