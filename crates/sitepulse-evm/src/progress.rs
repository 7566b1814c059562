//! Task progress aggregation.
//!
//! Each task contributes an actual fraction (its reported progress) and a
//! planned fraction (how much of its schedule window has elapsed at `now`).
//! The project figures are unweighted means over all tasks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sitepulse_core::model::Task;

/// Project-level progress averages.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSummary {
    pub avg_actual: f64,
    pub avg_planned: f64,
    pub task_count: usize,
}

/// Reported completion as a fraction in `[0, 1]`.
///
/// Out-of-range percentages are clamped and non-finite values read as 0.
#[must_use]
pub fn actual_fraction(task: &Task) -> f64 {
    if !task.progress.is_finite() {
        return 0.0;
    }
    (task.progress / 100.0).clamp(0.0, 1.0)
}

/// Fraction of the task that should be done at `now`.
///
/// Unscheduled tasks are treated as fully due. A zero-length window
/// resolves to 1 as soon as `now` reaches it.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn planned_fraction(task: &Task, now: DateTime<Utc>) -> f64 {
    let (Some(start), Some(end)) = (task.start_date, task.end_date) else {
        return 1.0;
    };
    if now >= end {
        return 1.0;
    }
    if now < start {
        return 0.0;
    }

    // start <= now < end from here on, so the window is non-empty.
    let span = (end - start).num_microseconds().unwrap_or(i64::MAX);
    if span <= 0 {
        return 1.0;
    }
    let elapsed = (now - start).num_microseconds().unwrap_or(i64::MAX);
    (elapsed as f64 / span as f64).clamp(0.0, 1.0)
}

/// Reduce `tasks` to project-level averages at `now`.
///
/// An empty task list yields zeros rather than NaN.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn task_progress(tasks: &[Task], now: DateTime<Utc>) -> ProgressSummary {
    if tasks.is_empty() {
        return ProgressSummary::default();
    }

    let (actual, planned) = tasks.iter().fold((0.0_f64, 0.0_f64), |(a, p), task| {
        (a + actual_fraction(task), p + planned_fraction(task, now))
    });
    let count = tasks.len() as f64;

    ProgressSummary {
        avg_actual: actual / count,
        avg_planned: planned / count,
        task_count: tasks.len(),
    }
}
