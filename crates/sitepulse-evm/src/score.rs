//! Health score composition.

use serde::{Deserialize, Serialize};
use sitepulse_core::config::ScoringConfig;

/// Weights for the overall score:
///
/// `overall = schedule*S + cost*C + resource*R`
///
/// Weights are normalized by their sum, so the defaults (0.4/0.4/0.2) are
/// applied verbatim and custom weights keep `overall` within `[0, 100]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HealthWeights {
    pub schedule: f64,
    pub cost: f64,
    pub resource: f64,
}

impl Default for HealthWeights {
    fn default() -> Self {
        Self {
            schedule: 0.4,
            cost: 0.4,
            resource: 0.2,
        }
    }
}

impl From<&ScoringConfig> for HealthWeights {
    fn from(config: &ScoringConfig) -> Self {
        Self {
            schedule: config.schedule_weight,
            cost: config.cost_weight,
            resource: config.resource_weight,
        }
    }
}

impl HealthWeights {
    fn normalized(self) -> Self {
        let parts = [self.schedule, self.cost, self.resource];
        if parts.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Self::default();
        }
        let total: f64 = parts.iter().sum();
        if total <= 0.0 {
            return Self::default();
        }
        Self {
            schedule: self.schedule / total,
            cost: self.cost / total,
            resource: self.resource / total,
        }
    }
}

/// Sub-scores and the weighted overall score, each in `[0, 100]`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthScores {
    pub overall_score: f64,
    pub schedule_score: f64,
    pub cost_score: f64,
    pub resource_score: f64,
}

/// Map SPI, CPI and resource coverage onto 0-100 scores.
///
/// The overall score is rounded to one decimal place.
#[must_use]
pub fn compose(spi: f64, cpi: f64, coverage: f64, weights: &HealthWeights) -> HealthScores {
    let schedule_score = percent(spi);
    let cost_score = percent(cpi);
    let resource_score = percent(coverage);

    let w = weights.normalized();
    let overall = w.resource.mul_add(
        resource_score,
        w.schedule.mul_add(schedule_score, w.cost * cost_score),
    );

    HealthScores {
        overall_score: round_tenth(overall.clamp(0.0, 100.0)),
        schedule_score,
        cost_score,
        resource_score,
    }
}

fn percent(ratio: f64) -> f64 {
    if ratio.is_finite() {
        (ratio * 100.0).clamp(0.0, 100.0)
    } else {
        0.0
    }
}

fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
