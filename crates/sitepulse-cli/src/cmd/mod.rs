pub mod completions;
pub mod health;
pub mod history;
pub mod init;
pub mod record;

use std::path::Path;

use anyhow::Result;
use rusqlite::Connection;
use sitepulse_core::config::{self, ProjectConfig};
use sitepulse_core::db;
use sitepulse_core::error::{ErrorCode, HealthError};
use sitepulse_core::identity::CallerIdentity;

use crate::identity::require_identity;
use crate::output::{CliError, OutputMode, render_error, resolve_output_mode};

/// Everything a data command needs: resolved output mode, a validated
/// caller, project settings and an open store.
pub struct Session {
    pub output: OutputMode,
    pub caller: CallerIdentity,
    pub config: ProjectConfig,
    pub conn: Connection,
}

impl Session {
    /// Resolve identity, load config and open the store, in that order.
    ///
    /// Identity failures are reported before anything on disk is read.
    ///
    /// # Errors
    ///
    /// Renders a coded error and returns it when any step fails.
    pub fn open(agent_flag: Option<&str>, json: bool, project_root: &Path) -> Result<Self> {
        let user = config::load_user_config().ok();
        let output = resolve_output_mode(json, user.as_ref());

        let caller = require_identity(agent_flag).map_err(|e| fail(output, &e))?;

        let config = config::load_project_config(project_root).map_err(|e| {
            fail_with(
                output,
                CliError::coded(format!("{e:#}"), ErrorCode::ConfigParseError),
            )
        })?;

        let store_path = config::store_path(project_root);
        let conn = match db::try_open_store(&store_path) {
            Ok(Some(conn)) => conn,
            Ok(None) => {
                return Err(fail_with(
                    output,
                    CliError::coded(
                        format!("no sitepulse store at {}", store_path.display()),
                        ErrorCode::NotInitialized,
                    ),
                ));
            }
            Err(e) => {
                return Err(fail_with(
                    output,
                    CliError::coded(format!("{e:#}"), ErrorCode::InternalUnexpected),
                ));
            }
        };

        tracing::debug!(caller = %caller, store = %store_path.display(), "session opened");
        Ok(Self {
            output,
            caller,
            config,
            conn,
        })
    }

    /// Render `err` in this session's output mode and convert it for `?`.
    pub fn fail(&self, err: &HealthError) -> anyhow::Error {
        fail(self.output, err)
    }
}

/// Render an engine error to stderr and return it as an `anyhow::Error`.
pub fn fail(output: OutputMode, err: &HealthError) -> anyhow::Error {
    if err.is_rejection() {
        tracing::debug!(code = %err.code(), "request rejected");
    } else {
        tracing::warn!(code = %err.code(), error = %err, "request failed");
    }
    fail_with(output, CliError::from(err))
}

fn fail_with(output: OutputMode, error: CliError) -> anyhow::Error {
    if let Err(render_err) = render_error(output, &error) {
        tracing::warn!(%render_err, "failed to render error");
    }
    let code = error.error_code.unwrap_or_default();
    anyhow::anyhow!("{code}: {}", error.message)
}
