//! Caller identity resolution for CLI commands.
//!
//! The resolution chain: `--agent` flag > `SITEPULSE_AGENT` env > `AGENT` env
//! > `USER` env (TTY only). Every command that touches project data requires
//! an identity; `init` and `completions` do not.

use sitepulse_core::error::HealthError;
use sitepulse_core::identity::CallerIdentity;
use std::env;

/// Environment reader trait for dependency injection in tests.
trait EnvReader {
    fn get(&self, key: &str) -> Option<String>;
    fn is_tty(&self) -> bool;
}

/// Real environment reader.
struct RealEnv;

impl EnvReader for RealEnv {
    fn get(&self, key: &str) -> Option<String> {
        env::var(key).ok().filter(|v| !v.is_empty())
    }

    fn is_tty(&self) -> bool {
        use std::io::IsTerminal;
        std::io::stdin().is_terminal()
    }
}

fn resolve_identity_with(cli_flag: Option<&str>, env: &dyn EnvReader) -> Option<String> {
    if let Some(agent) = cli_flag.filter(|a| !a.is_empty()) {
        return Some(agent.to_string());
    }

    if let Some(val) = env.get("SITEPULSE_AGENT") {
        return Some(val);
    }

    if let Some(val) = env.get("AGENT") {
        return Some(val);
    }

    // USER only counts for interactive sessions.
    if env.is_tty() {
        return env.get("USER");
    }

    None
}

fn require_identity_with(
    cli_flag: Option<&str>,
    env: &dyn EnvReader,
) -> Result<CallerIdentity, HealthError> {
    CallerIdentity::require(resolve_identity_with(cli_flag, env).as_deref())
}

/// Resolve and validate the caller identity.
///
/// # Errors
///
/// Returns [`HealthError::MissingIdentity`] when no source yields a value and
/// [`HealthError::InvalidIdentity`] when the resolved value is malformed.
pub fn require_identity(cli_flag: Option<&str>) -> Result<CallerIdentity, HealthError> {
    require_identity_with(cli_flag, &RealEnv)
}
