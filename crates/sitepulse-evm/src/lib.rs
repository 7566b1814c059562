#![forbid(unsafe_code)]
//! Schedule health analytics for sitepulse projects.
//!
//! The pipeline runs leaf-first: [`progress`] and [`ledger`] reduce raw
//! task and cost records, [`evm`] turns those aggregates into earned value
//! figures, [`score`] composes the 0-100 health scores, and [`history`]
//! keeps the daily snapshot series. [`engine::HealthEngine`] wires them
//! together behind validated project ids and caller identities.
//!
//! # Conventions
//!
//! - **Errors**: public entry points return [`sitepulse_core::error::HealthError`].
//! - **Logging**: `tracing` macros; persistence failures on the computed
//!   path are logged at `warn` and never returned.

pub mod engine;
pub mod evm;
pub mod history;
pub mod ledger;
pub mod progress;
pub mod score;

pub use engine::{Assessment, EngineSettings, HealthEngine, HealthReport, ManualSubmission};
pub use evm::{EvmFigures, EvmParams};
pub use history::{HistoryRecorder, RecordOutcome};
pub use progress::ProgressSummary;
pub use score::{HealthScores, HealthWeights};
