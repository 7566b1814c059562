use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::repo::DEFAULT_HISTORY_LIMIT;

/// Directory (under the project root) holding config and the store.
pub const STATE_DIR: &str = ".sitepulse";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub evm: EvmConfig,
    #[serde(default)]
    pub history: HistoryConfig,
}

/// Sub-score weights for the overall health score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    #[serde(default = "default_schedule_weight")]
    pub schedule_weight: f64,
    #[serde(default = "default_cost_weight")]
    pub cost_weight: f64,
    #[serde(default = "default_resource_weight")]
    pub resource_weight: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            schedule_weight: default_schedule_weight(),
            cost_weight: default_cost_weight(),
            resource_weight: default_resource_weight(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EvmConfig {
    /// Multiplier applied to earned progress to approximate actual cost.
    #[serde(default = "default_ac_overrun_factor")]
    pub ac_overrun_factor: f64,
}

impl Default for EvmConfig {
    fn default() -> Self {
        Self {
            ac_overrun_factor: default_ac_overrun_factor(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryConfig {
    #[serde(default = "default_history_limit")]
    pub limit: usize,
    /// Persist a snapshot as a side effect of `health`.
    #[serde(default = "default_true")]
    pub record_on_health: bool,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            limit: default_history_limit(),
            record_on_health: default_true(),
        }
    }
}

impl ProjectConfig {
    /// Reject configurations that would make the calculations meaningless.
    ///
    /// # Errors
    ///
    /// Returns an error naming the offending setting.
    pub fn validate(&self) -> Result<()> {
        let weights = [
            ("scoring.schedule_weight", self.scoring.schedule_weight),
            ("scoring.cost_weight", self.scoring.cost_weight),
            ("scoring.resource_weight", self.scoring.resource_weight),
        ];
        for (name, value) in weights {
            ensure!(
                value.is_finite() && value >= 0.0,
                "{name} must be a finite, non-negative number (got {value})"
            );
        }
        let total: f64 = weights.iter().map(|(_, w)| w).sum();
        ensure!(total > 0.0, "scoring weights must not all be zero");

        ensure!(
            self.evm.ac_overrun_factor.is_finite() && self.evm.ac_overrun_factor > 0.0,
            "evm.ac_overrun_factor must be a finite, positive number (got {})",
            self.evm.ac_overrun_factor
        );
        ensure!(self.history.limit > 0, "history.limit must be at least 1");
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UserConfig {
    #[serde(default)]
    pub output: Option<String>,
}

/// Path of the project config file under `project_root`.
#[must_use]
pub fn project_config_path(project_root: &Path) -> PathBuf {
    project_root.join(STATE_DIR).join("config.toml")
}

/// Path of the `SQLite` store under `project_root`.
#[must_use]
pub fn store_path(project_root: &Path) -> PathBuf {
    project_root.join(STATE_DIR).join("sitepulse.db")
}

/// Load `.sitepulse/config.toml`, falling back to defaults when absent.
///
/// # Errors
///
/// Returns an error if the file cannot be read, parsed, or fails validation.
pub fn load_project_config(project_root: &Path) -> Result<ProjectConfig> {
    let path = project_config_path(project_root);
    if !path.exists() {
        return Ok(ProjectConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let config = toml::from_str::<ProjectConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    config
        .validate()
        .with_context(|| format!("Invalid settings in {}", path.display()))?;
    Ok(config)
}

/// Load the per-user config from the platform config directory.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_user_config() -> Result<UserConfig> {
    let Some(config_dir) = dirs::config_dir() else {
        return Ok(UserConfig::default());
    };

    let path = config_dir.join("sitepulse/config.toml");
    if !path.exists() {
        return Ok(UserConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<UserConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

/// Output mode precedence: `--json` > `FORMAT` env > user config > TTY.
///
/// Returns one of `"pretty"`, `"text"` or `"json"`.
#[must_use]
pub fn resolve_output(
    cli_json: bool,
    user_output: Option<String>,
    env_format: Option<String>,
    is_tty: bool,
) -> String {
    fn normalize_output_mode(raw: &str) -> Option<&'static str> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pretty" | "human" => Some("pretty"),
            "text" | "table" => Some("text"),
            "json" => Some("json"),
            _ => None,
        }
    }

    if cli_json {
        return "json".to_string();
    }

    if let Some(mode) = env_format.as_deref().and_then(normalize_output_mode) {
        return mode.to_string();
    }

    if let Some(mode) = user_output.as_deref().and_then(normalize_output_mode) {
        return mode.to_string();
    }

    let mode = if is_tty { "pretty" } else { "text" };
    mode.to_string()
}

const fn default_true() -> bool {
    true
}

const fn default_schedule_weight() -> f64 {
    0.4
}

const fn default_cost_weight() -> f64 {
    0.4
}

const fn default_resource_weight() -> f64 {
    0.2
}

const fn default_ac_overrun_factor() -> f64 {
    1.1
}

const fn default_history_limit() -> usize {
    DEFAULT_HISTORY_LIMIT
}
