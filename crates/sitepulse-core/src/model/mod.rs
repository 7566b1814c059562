//! Domain records read and written by the health engine.

pub mod project;
pub mod resource;
pub mod snapshot;
pub mod task;

pub use project::ProjectId;
pub use resource::{Resource, ResourceCost, ResourceCoverage, ResourceKind, ledger_total};
pub use snapshot::{HealthMetrics, SnapshotSource, StoredSnapshot};
pub use task::Task;
