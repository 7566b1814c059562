use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use super::ProjectId;

/// Resource category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Labor,
    Equipment,
    Material,
}

impl ResourceKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Labor => "labor",
            Self::Equipment => "equipment",
            Self::Material => "material",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "labor" | "labour" => Ok(Self::Labor),
            "equipment" => Ok(Self::Equipment),
            "material" => Ok(Self::Material),
            other => anyhow::bail!(
                "unknown resource kind '{other}': expected one of labor, equipment, material"
            ),
        }
    }
}

/// A labor/equipment/material resource attached to a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    pub id: String,
    pub project_id: ProjectId,
    pub name: String,
    pub kind: ResourceKind,
    pub rate: Option<f64>,
}

/// One cost-ledger entry for a resource.
///
/// `total_cost` is the authoritative monetary amount; `quantity` and
/// `unit_cost` are informational.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceCost {
    pub id: String,
    pub resource_id: String,
    pub date: DateTime<Utc>,
    pub quantity: Option<f64>,
    pub unit_cost: f64,
    pub total_cost: f64,
}

/// Sum of `total_cost` over a cost ledger.
///
/// Non-finite amounts are skipped. An empty ledger sums to `0.0`.
#[must_use]
pub fn ledger_total<'a, I>(entries: I) -> f64
where
    I: IntoIterator<Item = &'a ResourceCost>,
{
    entries
        .into_iter()
        .map(|entry| entry.total_cost)
        .filter(|cost| cost.is_finite())
        .sum()
}

/// How many of a project's resources carry at least one cost entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceCoverage {
    pub total_resources: u64,
    pub resources_with_costs: u64,
}

impl ResourceCoverage {
    /// `resources_with_costs / total_resources`, or `0.0` without resources.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn ratio(self) -> f64 {
        if self.total_resources == 0 {
            return 0.0;
        }
        (self.resources_with_costs.min(self.total_resources) as f64)
            / (self.total_resources as f64)
    }
}
