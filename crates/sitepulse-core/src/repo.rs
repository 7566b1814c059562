//! Collaborator interfaces consumed by the health engine.
//!
//! The task and cost repositories are read-only from the engine's point of
//! view. The snapshot repository is append-only: rows are inserted once per
//! `(project_id, date)` and never updated.

use chrono::NaiveDate;

use crate::model::{ProjectId, ResourceCoverage, StoredSnapshot, Task};

/// Default number of snapshots served by the history read path.
pub const DEFAULT_HISTORY_LIMIT: usize = 30;

/// Storage-level failure reported by a repository implementation.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// Underlying `SQLite` failure.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// A stored value could not be decoded into the domain type.
    #[error("corrupt {field} value: {reason}")]
    Decode { field: &'static str, reason: String },

    /// The backing store is unreachable or refused the operation.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Read access to a project's tasks.
pub trait TaskRepository {
    /// All tasks belonging to `project`, in no particular order.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn list_by_project(&self, project: &ProjectId) -> Result<Vec<Task>, RepositoryError>;
}

/// Read access to a project's resource cost ledger.
pub trait ResourceCostRepository {
    /// Sum of `total_cost` over every cost row whose resource belongs to
    /// `project`. An empty ledger sums to `0.0`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn sum_by_project(&self, project: &ProjectId) -> Result<f64, RepositoryError>;

    /// Resource counts used for the resource-coverage signal.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn coverage_by_project(&self, project: &ProjectId)
    -> Result<ResourceCoverage, RepositoryError>;
}

/// Append-only store of daily health snapshots.
pub trait HealthSnapshotRepository {
    /// Insert `snapshot` keyed by `(project_id, date)` unless a row already
    /// exists for that key.
    ///
    /// Returns `true` when the row was written and `false` when the key was
    /// already taken. A lost race between concurrent writers is reported as
    /// `false`, never as an error.
    ///
    /// # Errors
    ///
    /// Returns an error only for genuine storage failures.
    fn try_insert(&self, snapshot: &StoredSnapshot) -> Result<bool, RepositoryError>;

    /// Up to `limit` most recent rows for `project`, ascending by date.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn recent(&self, project: &ProjectId, limit: usize)
    -> Result<Vec<StoredSnapshot>, RepositoryError>;

    /// The row stored for `(project, date)`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn find(
        &self,
        project: &ProjectId,
        date: NaiveDate,
    ) -> Result<Option<StoredSnapshot>, RepositoryError>;
}

/// Source of consistent per-computation reads.
///
/// A view returned by [`ProjectReader::begin_read`] serves the task and cost
/// reads of one computation. Stores that support it back the view with a
/// single read transaction so both reads observe the same state.
pub trait ProjectReader {
    type View<'a>: TaskRepository + ResourceCostRepository
    where
        Self: 'a;

    /// Open a read view.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot start a read.
    fn begin_read(&self) -> Result<Self::View<'_>, RepositoryError>;
}

impl<T: TaskRepository + ?Sized> TaskRepository for &T {
    fn list_by_project(&self, project: &ProjectId) -> Result<Vec<Task>, RepositoryError> {
        (**self).list_by_project(project)
    }
}

impl<T: ResourceCostRepository + ?Sized> ResourceCostRepository for &T {
    fn sum_by_project(&self, project: &ProjectId) -> Result<f64, RepositoryError> {
        (**self).sum_by_project(project)
    }

    fn coverage_by_project(
        &self,
        project: &ProjectId,
    ) -> Result<ResourceCoverage, RepositoryError> {
        (**self).coverage_by_project(project)
    }
}

impl<T: HealthSnapshotRepository + ?Sized> HealthSnapshotRepository for &T {
    fn try_insert(&self, snapshot: &StoredSnapshot) -> Result<bool, RepositoryError> {
        (**self).try_insert(snapshot)
    }

    fn recent(
        &self,
        project: &ProjectId,
        limit: usize,
    ) -> Result<Vec<StoredSnapshot>, RepositoryError> {
        (**self).recent(project, limit)
    }

    fn find(
        &self,
        project: &ProjectId,
        date: NaiveDate,
    ) -> Result<Option<StoredSnapshot>, RepositoryError> {
        (**self).find(project, date)
    }
}

impl<T: ProjectReader + ?Sized> ProjectReader for &T {
    type View<'a>
        = T::View<'a>
    where
        Self: 'a;

    fn begin_read(&self) -> Result<Self::View<'_>, RepositoryError> {
        (**self).begin_read()
    }
}
