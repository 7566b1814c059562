//! `sp health`: compute project health and record today's snapshot.

use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Utc};
use clap::Args;
use sitepulse_core::db::SqliteStore;
use sitepulse_evm::{EngineSettings, HealthEngine, HealthReport};

use crate::cmd::Session;
use crate::output::{format_amount, pretty_kv, pretty_section, render_mode};

/// Arguments for `sp health`.
#[derive(Args, Debug)]
pub struct HealthArgs {
    /// Project identifier.
    pub project: String,

    /// Evaluate at this instant (RFC 3339) instead of now.
    #[arg(long, value_parser = parse_instant)]
    pub at: Option<DateTime<Utc>>,

    /// Compute without recording a snapshot.
    #[arg(long)]
    pub no_record: bool,
}

fn parse_instant(raw: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| format!("expected an RFC 3339 timestamp: {e}"))
}

/// Execute `sp health`.
///
/// # Errors
///
/// Returns an error for identity, validation, config or collaborator read
/// failures. Snapshot write failures only show up in the report.
pub fn run_health(
    args: &HealthArgs,
    agent_flag: Option<&str>,
    json: bool,
    project_root: &Path,
) -> anyhow::Result<()> {
    let session = Session::open(agent_flag, json, project_root)?;

    let mut settings = EngineSettings::from(&session.config);
    if args.no_record {
        settings.record_on_health = false;
    }

    let store = SqliteStore::new(&session.conn);
    let engine = HealthEngine::new(store, store, settings);
    let now = args.at.unwrap_or_else(Utc::now);

    let report = engine
        .health(&session.caller, &args.project, now)
        .map_err(|e| session.fail(&e))?;

    render_mode(session.output, &report, render_health_text, render_health_pretty)
}

fn render_health_text(report: &HealthReport, w: &mut dyn Write) -> std::io::Result<()> {
    writeln!(w, "project\t{}", report.assessment.project_id)?;
    writeln!(w, "evaluated_at\t{}", report.assessment.evaluated_at.to_rfc3339())?;
    for (name, value) in report.assessment.metrics.fields() {
        writeln!(w, "{name}\t{value}")?;
    }
    writeln!(w, "snapshot\t{} {}", report.snapshot_date, report.snapshot.as_str())
}

fn render_health_pretty(report: &HealthReport, w: &mut dyn Write) -> std::io::Result<()> {
    let a = &report.assessment;
    let m = &a.metrics;

    pretty_section(w, &format!("Schedule health: {}", a.project_id))?;
    pretty_kv(w, "overall", format!("{:.1} / 100  {}", m.overall_score, band(m.overall_score)))?;
    pretty_kv(w, "schedule", format!("{:.1}", m.schedule_score))?;
    pretty_kv(w, "cost", format!("{:.1}", m.cost_score))?;
    pretty_kv(w, "resources", format!("{:.1}", m.resource_score))?;
    writeln!(w)?;

    pretty_section(w, "Earned value")?;
    pretty_kv(w, "BAC", format_amount(m.bac))?;
    pretty_kv(w, "PV", format_amount(m.pv))?;
    pretty_kv(w, "EV", format_amount(m.ev))?;
    pretty_kv(w, "AC", format_amount(m.ac))?;
    pretty_kv(w, "SPI", format!("{:.4}", m.spi))?;
    pretty_kv(w, "CPI", format!("{:.4}", m.cpi))?;
    pretty_kv(w, "schedule var.", format_amount(m.schedule_variance))?;
    pretty_kv(w, "cost var.", format_amount(m.cost_variance))?;
    writeln!(w)?;

    pretty_section(w, "Forecast")?;
    pretty_kv(w, "EAC", format_amount(m.eac))?;
    pretty_kv(w, "ETC", format_amount(m.etc))?;
    pretty_kv(w, "VAC", format_amount(m.vac))?;
    pretty_kv(w, "TCPI", format!("{:.4}", m.tcpi))?;
    writeln!(w)?;

    pretty_kv(
        w,
        "tasks",
        format!(
            "{} (actual {:.1}%, planned {:.1}%)",
            a.progress.task_count,
            a.progress.avg_actual * 100.0,
            a.progress.avg_planned * 100.0
        ),
    )?;
    pretty_kv(
        w,
        "costed resources",
        format!(
            "{}/{}",
            a.coverage.resources_with_costs, a.coverage.total_resources
        ),
    )?;
    pretty_kv(w, "evaluated at", a.evaluated_at.to_rfc3339())?;
    pretty_kv(
        w,
        "snapshot",
        format!("{} ({})", report.snapshot_date, report.snapshot.as_str()),
    )
}

fn band(overall: f64) -> &'static str {
    if overall >= 90.0 {
        "✓ healthy"
    } else if overall >= 70.0 {
        "◐ watch"
    } else {
        "⚠ at risk"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use clap::Parser;
    use sitepulse_core::memory::MemoryStore;
    use sitepulse_core::identity::CallerIdentity;

    #[derive(Parser)]
    struct Wrapper {
        #[command(flatten)]
        args: HealthArgs,
    }

    fn sample_report() -> HealthReport {
        let store = MemoryStore::new();
        let engine = HealthEngine::new(&store, &store, EngineSettings::default());
        let caller = CallerIdentity::parse("tester").expect("valid identity");
        let now = Utc
            .with_ymd_and_hms(2026, 7, 1, 8, 0, 0)
            .single()
            .expect("valid timestamp");
        engine.health(&caller, "tower-a", now).expect("health")
    }

    #[test]
    fn parses_at_and_no_record() {
        let parsed = Wrapper::parse_from([
            "test",
            "tower-a",
            "--at",
            "2026-07-01T08:00:00+02:00",
            "--no-record",
        ]);
        assert_eq!(parsed.args.project, "tower-a");
        assert!(parsed.args.no_record);
        assert_eq!(
            parsed.args.at,
            Utc.with_ymd_and_hms(2026, 7, 1, 6, 0, 0).single()
        );
    }

    #[test]
    fn rejects_malformed_instant() {
        assert!(Wrapper::try_parse_from(["test", "tower-a", "--at", "yesterday"]).is_err());
    }

    #[test]
    fn pretty_output_has_sections() {
        let mut out = Vec::new();
        render_health_pretty(&sample_report(), &mut out).expect("render");
        let text = String::from_utf8(out).expect("utf8");
        assert!(text.contains("Schedule health: tower-a"));
        assert!(text.contains("Earned value"));
        assert!(text.contains("TCPI"));
    }

    #[test]
    fn text_output_lists_every_metric() {
        let mut out = Vec::new();
        render_health_text(&sample_report(), &mut out).expect("render");
        let text = String::from_utf8(out).expect("utf8");
        for name in ["overallScore", "scheduleVariance", "tcpi"] {
            assert!(text.contains(name), "missing {name}");
        }
        assert!(text.contains("snapshot\t2026-07-01 inserted"));
    }

    #[test]
    fn bands_follow_thresholds() {
        assert_eq!(band(95.0), "✓ healthy");
        assert_eq!(band(70.0), "◐ watch");
        assert_eq!(band(12.3), "⚠ at risk");
    }
}
