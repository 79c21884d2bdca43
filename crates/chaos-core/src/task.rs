use crate::error::ChaosError;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct TaskId(pub String);

impl TaskId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn from_string(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

/// Origin of a run. Decides how the task is created, not how it executes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Trigger {
    Scheduled,
    Manual,
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trigger::Scheduled => write!(f, "SCHEDULED"),
            Trigger::Manual => write!(f, "MANUAL"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Running,
    Complete,
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Complete)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskStatus::Running => write!(f, "running"),
            TaskStatus::Complete => write!(f, "complete"),
        }
    }
}

/// Point-in-time view of a task, as served by the task endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: TaskId,
    pub trigger: Trigger,
    pub status: TaskStatus,
    pub started_at: DateTime<Utc>,
    pub stopped_at: Option<DateTime<Utc>>,
}

/// Handle for one run. Clones share the same underlying record, so the
/// registry observes `stop()` calls made by the orchestrator.
#[derive(Debug, Clone)]
pub struct Task {
    inner: Arc<RwLock<TaskRecord>>,
}

impl Task {
    pub fn new(trigger: Trigger) -> Self {
        Self {
            inner: Arc::new(RwLock::new(TaskRecord {
                id: TaskId::new(),
                trigger,
                status: TaskStatus::Running,
                started_at: Utc::now(),
                stopped_at: None,
            })),
        }
    }

    pub fn id(&self) -> TaskId {
        self.inner.read().id.clone()
    }

    pub fn trigger(&self) -> Trigger {
        self.inner.read().trigger
    }

    pub fn status(&self) -> TaskStatus {
        self.inner.read().status
    }

    pub fn record(&self) -> TaskRecord {
        self.inner.read().clone()
    }

    /// Mark the task complete. Returns false if it was already stopped.
    pub fn stop(&self) -> bool {
        let mut record = self.inner.write();
        if record.status.is_terminal() {
            return false;
        }
        record.status = TaskStatus::Complete;
        record.stopped_at = Some(Utc::now());
        true
    }

    pub fn to_json(&self) -> serde_json::Value {
        let record = self.record();
        serde_json::json!({
            "id": record.id.0,
            "trigger": record.trigger,
            "status": record.status,
            "started_at": record.started_at.to_rfc3339(),
            "stopped_at": record.stopped_at.map(|t| t.to_rfc3339()),
        })
    }
}

/// Creates and tracks run tasks.
pub trait TaskRepository: Send + Sync {
    fn create(&self, trigger: Trigger) -> Result<Task, ChaosError>;

    fn get(&self, id: &TaskId) -> Result<Task, ChaosError>;

    /// All known tasks, newest first.
    fn list(&self) -> Vec<Task>;
}

/// Tasks kept by [`InMemoryTaskRepository::new`].
pub const DEFAULT_TASK_CAPACITY: usize = 1024;

/// Holds at most `capacity` tasks. When full, the completed task that
/// stopped earliest is evicted; if every task is still running, creation
/// fails.
#[derive(Debug)]
pub struct InMemoryTaskRepository {
    tasks: RwLock<HashMap<TaskId, Task>>,
    capacity: usize,
}

impl Default for InMemoryTaskRepository {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_TASK_CAPACITY)
    }
}

impl InMemoryTaskRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            tasks: RwLock::new(HashMap::new()),
            capacity: capacity.max(1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.tasks.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.read().is_empty()
    }
}

impl TaskRepository for InMemoryTaskRepository {
    fn create(&self, trigger: Trigger) -> Result<Task, ChaosError> {
        let mut tasks = self.tasks.write();
        if tasks.len() >= self.capacity {
            let oldest = tasks
                .values()
                .map(Task::record)
                .filter_map(|r| r.stopped_at.map(|stopped| (stopped, r.id)))
                .min_by_key(|(stopped, _)| *stopped)
                .map(|(_, id)| id)
                .ok_or_else(|| {
                    ChaosError::TaskTracker(format!("all {} tasks are still running", self.capacity))
                })?;
            tasks.remove(&oldest);
            debug!("Evicted completed task {}", oldest);
        }

        let task = Task::new(trigger);
        tasks.insert(task.id(), task.clone());
        Ok(task)
    }

    fn get(&self, id: &TaskId) -> Result<Task, ChaosError> {
        self.tasks
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| ChaosError::TaskNotFound(id.to_string()))
    }

    fn list(&self) -> Vec<Task> {
        let mut tasks: Vec<Task> = self.tasks.read().values().cloned().collect();
        tasks.sort_by(|a, b| b.record().started_at.cmp(&a.record().started_at));
        tasks
    }
}

/// Builds the `Location` of a task for accepted responses.
#[derive(Debug, Clone)]
pub struct TaskUriBuilder {
    base_url: String,
}

impl TaskUriBuilder {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }

    pub fn uri(&self, task: &Task) -> String {
        format!("{}/task/{}", self.base_url.trim_end_matches('/'), task.id())
    }
}
