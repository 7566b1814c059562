//! Earned value management figures.
//!
//! Every division has a defined fallback, so the calculator never panics and
//! never produces NaN or infinity for finite inputs.

use serde::{Deserialize, Serialize};
use sitepulse_core::config::EvmConfig;

use crate::ledger::normalize_bac;

/// Default multiplier applied to earned progress when approximating AC.
pub const DEFAULT_AC_OVERRUN_FACTOR: f64 = 1.1;

/// Tunables for [`calculate`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EvmParams {
    /// `AC = BAC * min(1, avg_actual * ac_overrun_factor)`.
    ///
    /// The ledger carries a budget baseline rather than dated spend, so
    /// actual cost is approximated from earned progress.
    pub ac_overrun_factor: f64,
}

impl Default for EvmParams {
    fn default() -> Self {
        Self {
            ac_overrun_factor: DEFAULT_AC_OVERRUN_FACTOR,
        }
    }
}

impl From<&EvmConfig> for EvmParams {
    fn from(config: &EvmConfig) -> Self {
        Self {
            ac_overrun_factor: config.ac_overrun_factor,
        }
    }
}

/// Output of [`calculate`].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvmFigures {
    pub bac: f64,
    pub pv: f64,
    pub ev: f64,
    pub ac: f64,
    pub spi: f64,
    pub cpi: f64,
    pub schedule_variance: f64,
    pub cost_variance: f64,
    pub eac: f64,
    pub etc: f64,
    pub vac: f64,
    pub tcpi: f64,
}

/// Compute the EVM figures for a project.
///
/// - `SPI = EV / PV`, 0 when `PV` is not positive
/// - `CPI = EV / AC`, 0 when `AC` is not positive
/// - `EAC = BAC / CPI` unless `CPI` is 0 or exactly 1, otherwise `BAC`
/// - `TCPI = (BAC - EV) / (BAC - AC)` when both are positive, otherwise 1
#[must_use]
pub fn calculate(bac: f64, avg_actual: f64, avg_planned: f64, params: &EvmParams) -> EvmFigures {
    let bac = normalize_bac(bac);
    let actual = unit(avg_actual);
    let planned = unit(avg_planned);
    let factor = if params.ac_overrun_factor.is_finite() && params.ac_overrun_factor > 0.0 {
        params.ac_overrun_factor
    } else {
        DEFAULT_AC_OVERRUN_FACTOR
    };

    let pv = bac * planned;
    let ev = bac * actual;
    let ac = bac * (actual * factor).min(1.0);

    let spi = ratio_or(ev, pv, 0.0);
    let cpi = ratio_or(ev, ac, 0.0);

    #[allow(clippy::float_cmp)]
    let eac = if cpi > 0.0 && cpi != 1.0 {
        finite_or(bac / cpi, bac)
    } else {
        bac
    };
    let etc = (eac - ac).max(0.0);

    let remaining_work = bac - ev;
    let remaining_budget = bac - ac;
    let tcpi = if remaining_work > 0.0 && remaining_budget > 0.0 {
        finite_or(remaining_work / remaining_budget, 1.0)
    } else {
        1.0
    };

    EvmFigures {
        bac,
        pv,
        ev,
        ac,
        spi,
        cpi,
        schedule_variance: ev - pv,
        cost_variance: ev - ac,
        eac,
        etc,
        vac: bac - eac,
        tcpi,
    }
}

fn unit(value: f64) -> f64 {
    if value.is_finite() { value.clamp(0.0, 1.0) } else { 0.0 }
}

const fn ratio_or(numerator: f64, denominator: f64, fallback: f64) -> f64 {
    if denominator > 0.0 {
        finite_or(numerator / denominator, fallback)
    } else {
        fallback
    }
}

// Subnormal denominators can still overflow a quotient.
const fn finite_or(value: f64, fallback: f64) -> f64 {
    if value.is_finite() { value } else { fallback }
}
