//! Budget baseline from the resource cost ledger.
//!
//! Ledger totals come from `ResourceCostRepository::sum_by_project`, which
//! skips non-finite amounts like [`sitepulse_core::model::ledger_total`].

/// Clamp a raw ledger total so BAC is always a finite, non-negative number.
#[must_use]
pub fn normalize_bac(total: f64) -> f64 {
    if total.is_finite() { total.max(0.0) } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sitepulse_core::model::{ResourceCost, ledger_total};

    fn cost(total: f64) -> ResourceCost {
        ResourceCost {
            id: "c".to_string(),
            resource_id: "r".to_string(),
            date: Utc::now(),
            quantity: None,
            unit_cost: total,
            total_cost: total,
        }
    }

    #[test]
    fn positive_total_passes_through() {
        assert!((normalize_bac(242_500.0) - 242_500.0).abs() < 1e-9);
    }

    #[test]
    fn credits_exceeding_charges_clamp_to_zero() {
        let entries = [cost(100.0), cost(-250.0)];
        assert!(normalize_bac(ledger_total(&entries)).abs() < f64::EPSILON);
    }

    #[test]
    fn non_finite_total_is_zero() {
        assert!(normalize_bac(f64::NAN).abs() < f64::EPSILON);
        assert!(normalize_bac(f64::INFINITY).abs() < f64::EPSILON);
        assert!(normalize_bac(f64::NEG_INFINITY).abs() < f64::EPSILON);
    }
}
