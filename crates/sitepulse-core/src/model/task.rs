use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ProjectId;

/// A scheduled unit of work, owned by the project-management workflows.
///
/// The engine only reads tasks. `progress` is a percentage and is not
/// trusted to be in range; consumers clamp it on read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub project_id: ProjectId,
    pub name: String,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub progress: f64,
    pub status: String,
}
