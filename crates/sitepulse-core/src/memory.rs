//! In-memory repositories for tests and embedding.
//!
//! Not durable. Each operation family can be switched into a failing state
//! to exercise the engine's error paths.

use chrono::NaiveDate;
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::model::{
    ProjectId, Resource, ResourceCost, ResourceCoverage, StoredSnapshot, Task, ledger_total,
};
use crate::repo::{
    HealthSnapshotRepository, ProjectReader, RepositoryError, ResourceCostRepository,
    TaskRepository,
};

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
    fail_tasks: AtomicBool,
    fail_costs: AtomicBool,
    fail_snapshots: AtomicBool,
}

#[derive(Default)]
struct Inner {
    tasks: Vec<Task>,
    resources: Vec<Resource>,
    costs: Vec<ResourceCost>,
    snapshots: BTreeMap<(ProjectId, NaiveDate), StoredSnapshot>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn add_task(&self, task: Task) {
        self.lock().tasks.push(task);
    }

    pub fn add_resource(&self, resource: Resource) {
        self.lock().resources.push(resource);
    }

    pub fn add_cost(&self, cost: ResourceCost) {
        self.lock().costs.push(cost);
    }

    /// Make task reads fail until reset.
    pub fn fail_tasks(&self, fail: bool) {
        self.fail_tasks.store(fail, Ordering::SeqCst);
    }

    /// Make cost-ledger reads fail until reset.
    pub fn fail_costs(&self, fail: bool) {
        self.fail_costs.store(fail, Ordering::SeqCst);
    }

    /// Make every snapshot operation fail until reset.
    pub fn fail_snapshots(&self, fail: bool) {
        self.fail_snapshots.store(fail, Ordering::SeqCst);
    }

    /// Number of stored snapshots for `project`.
    #[must_use]
    pub fn snapshot_count(&self, project: &ProjectId) -> usize {
        self.lock()
            .snapshots
            .keys()
            .filter(|(p, _)| p == project)
            .count()
    }

    fn check(flag: &AtomicBool, what: &str) -> Result<(), RepositoryError> {
        if flag.load(Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable(format!(
                "{what} store offline"
            )));
        }
        Ok(())
    }

    fn project_resource_ids(inner: &Inner, project: &ProjectId) -> HashSet<String> {
        inner
            .resources
            .iter()
            .filter(|r| &r.project_id == project)
            .map(|r| r.id.clone())
            .collect()
    }
}

/// Reads go straight to the shared state; a writer may interleave between
/// the task read and the cost read of one computation.
impl ProjectReader for MemoryStore {
    type View<'a>
        = &'a Self
    where
        Self: 'a;

    fn begin_read(&self) -> Result<Self::View<'_>, RepositoryError> {
        Ok(self)
    }
}

impl TaskRepository for MemoryStore {
    fn list_by_project(&self, project: &ProjectId) -> Result<Vec<Task>, RepositoryError> {
        Self::check(&self.fail_tasks, "task")?;
        Ok(self
            .lock()
            .tasks
            .iter()
            .filter(|t| &t.project_id == project)
            .cloned()
            .collect())
    }
}

impl ResourceCostRepository for MemoryStore {
    fn sum_by_project(&self, project: &ProjectId) -> Result<f64, RepositoryError> {
        Self::check(&self.fail_costs, "cost")?;
        let inner = self.lock();
        let owned = Self::project_resource_ids(&inner, project);
        Ok(ledger_total(
            inner
                .costs
                .iter()
                .filter(|c| owned.contains(&c.resource_id)),
        ))
    }

    fn coverage_by_project(
        &self,
        project: &ProjectId,
    ) -> Result<ResourceCoverage, RepositoryError> {
        Self::check(&self.fail_costs, "cost")?;
        let inner = self.lock();
        let owned = Self::project_resource_ids(&inner, project);
        let with_costs: HashSet<&str> = inner
            .costs
            .iter()
            .filter(|c| owned.contains(&c.resource_id))
            .map(|c| c.resource_id.as_str())
            .collect();
        Ok(ResourceCoverage {
            total_resources: owned.len() as u64,
            resources_with_costs: with_costs.len() as u64,
        })
    }
}

impl HealthSnapshotRepository for MemoryStore {
    fn try_insert(&self, snapshot: &StoredSnapshot) -> Result<bool, RepositoryError> {
        Self::check(&self.fail_snapshots, "snapshot")?;
        let key = (snapshot.project_id.clone(), snapshot.date);
        let mut inner = self.lock();
        if inner.snapshots.contains_key(&key) {
            return Ok(false);
        }
        inner.snapshots.insert(key, snapshot.clone());
        Ok(true)
    }

    fn recent(
        &self,
        project: &ProjectId,
        limit: usize,
    ) -> Result<Vec<StoredSnapshot>, RepositoryError> {
        Self::check(&self.fail_snapshots, "snapshot")?;
        let inner = self.lock();
        let mut rows: Vec<StoredSnapshot> = inner
            .snapshots
            .iter()
            .rev()
            .filter(|((p, _), _)| p == project)
            .take(limit)
            .map(|(_, row)| row.clone())
            .collect();
        rows.reverse();
        Ok(rows)
    }

    fn find(
        &self,
        project: &ProjectId,
        date: NaiveDate,
    ) -> Result<Option<StoredSnapshot>, RepositoryError> {
        Self::check(&self.fail_snapshots, "snapshot")?;
        Ok(self.lock().snapshots.get(&(project.clone(), date)).cloned())
    }
}
