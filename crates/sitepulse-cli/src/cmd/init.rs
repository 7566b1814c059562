use anyhow::{Context as _, Result};
use clap::Args;
use serde::Serialize;
use sitepulse_core::config::{STATE_DIR, project_config_path, store_path};
use sitepulse_core::db::{self, migrations};
use std::path::Path;

use crate::output::{OutputMode, pretty_kv, render_mode};

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Re-initialize even if `.sitepulse/` already exists.
    #[arg(long)]
    pub force: bool,
}

const CONFIG_TOML: &str = "[scoring]\n\
    schedule_weight = 0.4\n\
    cost_weight = 0.4\n\
    resource_weight = 0.2\n\
    \n\
    [evm]\n\
    ac_overrun_factor = 1.1\n\
    \n\
    [history]\n\
    limit = 30\n\
    record_on_health = true\n";

const GITIGNORE: &str = "sitepulse.db\nsitepulse.db-wal\nsitepulse.db-shm\n";

#[derive(Debug, Serialize)]
struct InitOutput {
    config: String,
    store: String,
    schema_version: u32,
}

/// Execute `sp init`. Creates the project skeleton:
///
/// ```text
/// .sitepulse/
///   config.toml    (default scoring/evm/history settings)
///   .gitignore     (store and its WAL files)
///   sitepulse.db   (migrated SQLite store)
/// ```
///
/// With `--force` the config is rewritten; the store is kept and migrated.
///
/// # Errors
///
/// Returns an error if `.sitepulse/` already exists and `--force` is not
/// set, or if any filesystem or store operation fails.
pub fn run_init(args: &InitArgs, output: OutputMode, project_root: &Path) -> Result<()> {
    let state_dir = project_root.join(STATE_DIR);

    if state_dir.exists() && !args.force {
        anyhow::bail!("{STATE_DIR}/ already exists. Use `sp init --force` to reinitialize.");
    }

    std::fs::create_dir_all(&state_dir)
        .with_context(|| format!("Failed to create {}", state_dir.display()))?;

    let config_path = project_config_path(project_root);
    std::fs::write(&config_path, CONFIG_TOML)
        .with_context(|| format!("Failed to write config: {}", config_path.display()))?;

    let gitignore_path = state_dir.join(".gitignore");
    std::fs::write(&gitignore_path, GITIGNORE)
        .with_context(|| format!("Failed to write .gitignore: {}", gitignore_path.display()))?;

    let store = store_path(project_root);
    let conn = db::open_store(&store)?;
    let schema_version = migrations::current_schema_version(&conn)
        .context("Failed to read store schema version")?;
    tracing::info!(store = %store.display(), schema_version, "initialized sitepulse store");

    let payload = InitOutput {
        config: config_path.display().to_string(),
        store: store.display().to_string(),
        schema_version,
    };

    render_mode(
        output,
        &payload,
        |p, w| {
            writeln!(w, "config\t{}", p.config)?;
            writeln!(w, "store\t{}", p.store)
        },
        |p, w| {
            writeln!(w, "✓ Initialized {STATE_DIR}/ project structure.")?;
            writeln!(w)?;
            pretty_kv(w, "config", &p.config)?;
            pretty_kv(w, "store", format!("{} (schema v{})", p.store, p.schema_version))?;
            writeln!(w)?;
            writeln!(w, "Next steps:")?;
            writeln!(w, "  Set your identity (required for every data command):")?;
            writeln!(w, "    export SITEPULSE_AGENT=your-name")?;
            writeln!(w)?;
            writeln!(w, "  Check a project's health:")?;
            writeln!(w, "    sp health <project-id>")
        },
    )
}
