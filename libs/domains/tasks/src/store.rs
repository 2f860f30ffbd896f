use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::models::{SubTask, TaskItem, UNASSIGNED_ID};

/// Failure raised by a store backend
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("conflicting change: {0}")]
    Conflict(String),

    #[error("inconsistent commit: {0}")]
    Inconsistent(String),

    #[error("database error: {0}")]
    Database(#[from] sea_orm::DbErr),
}

/// A staged mutation, applied when the session commits
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    AddTaskItem(TaskItem),
    UpdateTaskItem(TaskItem),
    RemoveTaskItem(i32),
    AddSubTask(SubTask),
    UpdateSubTask(SubTask),
    RemoveSubTask(i32),
}

/// Rows inserted by a commit, carrying their assigned ids
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Committed {
    pub task_items: Vec<TaskItem>,
    pub sub_tasks: Vec<SubTask>,
}

/// Persistence context shared by the task and subtask services.
///
/// Every service call works inside one session. A session isolates its
/// reads and staged changes from concurrent sessions until it commits;
/// dropping it without committing discards the staged changes.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Open a new unit of work
    async fn begin(&self) -> Result<Box<dyn StoreSession>, StoreError>;
}

/// One unit of work against a [`TaskStore`]
#[async_trait]
pub trait StoreSession: Send {
    /// All task items in store order, each with its subtasks attached
    async fn task_items(&mut self) -> Result<Vec<TaskItem>, StoreError>;

    /// All subtasks in store order
    async fn sub_tasks(&mut self) -> Result<Vec<SubTask>, StoreError>;

    /// Stage a mutation for the next commit
    fn stage(&mut self, change: Change);

    /// Apply every staged change atomically
    async fn commit(self: Box<Self>) -> Result<Committed, StoreError>;

    fn add_task_item(&mut self, item: TaskItem) {
        self.stage(Change::AddTaskItem(item));
    }

    fn update_task_item(&mut self, item: TaskItem) {
        self.stage(Change::UpdateTaskItem(item));
    }

    fn remove_task_item(&mut self, id: i32) {
        self.stage(Change::RemoveTaskItem(id));
    }

    fn add_sub_task(&mut self, sub_task: SubTask) {
        self.stage(Change::AddSubTask(sub_task));
    }

    fn update_sub_task(&mut self, sub_task: SubTask) {
        self.stage(Change::UpdateSubTask(sub_task));
    }

    fn remove_sub_task(&mut self, id: i32) {
        self.stage(Change::RemoveSubTask(id));
    }
}

/// Attach each subtask to its owning task item, keeping store order
pub(crate) fn attach_sub_tasks(mut items: Vec<TaskItem>, sub_tasks: &[SubTask]) -> Vec<TaskItem> {
    for item in &mut items {
        item.sub_tasks = sub_tasks
            .iter()
            .filter(|s| s.task_item_id == item.id)
            .cloned()
            .collect();
    }
    items
}

#[derive(Debug, Default, Clone)]
struct State {
    task_items: Vec<TaskItem>,
    sub_tasks: Vec<SubTask>,
}

fn next_id(ids: impl Iterator<Item = i32>, entity: &str) -> Result<i32, StoreError> {
    ids.max()
        .unwrap_or(0)
        .checked_add(1)
        .ok_or_else(|| StoreError::Conflict(format!("{entity} id space exhausted")))
}

impl State {
    fn next_task_item_id(&self) -> Result<i32, StoreError> {
        next_id(self.task_items.iter().map(|t| t.id), "TaskItem")
    }

    fn next_sub_task_id(&self) -> Result<i32, StoreError> {
        next_id(self.sub_tasks.iter().map(|s| s.id), "SubTask")
    }

    fn apply(&mut self, change: Change, committed: &mut Committed) -> Result<(), StoreError> {
        match change {
            Change::AddTaskItem(mut item) => {
                if item.id == UNASSIGNED_ID {
                    item.id = self.next_task_item_id()?;
                } else if self.task_items.iter().any(|t| t.id == item.id) {
                    return Err(StoreError::Conflict(format!(
                        "TaskItem id {} already exists",
                        item.id
                    )));
                }
                item.sub_tasks.clear();
                self.task_items.push(item.clone());
                committed.task_items.push(item);
            }
            Change::UpdateTaskItem(mut item) => {
                let slot = self
                    .task_items
                    .iter_mut()
                    .find(|t| t.id == item.id)
                    .ok_or_else(|| {
                        StoreError::Conflict(format!("TaskItem id {} no longer exists", item.id))
                    })?;
                item.sub_tasks.clear();
                *slot = item;
            }
            Change::RemoveTaskItem(id) => {
                let before = self.task_items.len();
                self.task_items.retain(|t| t.id != id);
                if self.task_items.len() == before {
                    return Err(StoreError::Conflict(format!(
                        "TaskItem id {id} no longer exists"
                    )));
                }
                // Mirrors the ON DELETE CASCADE foreign key of the relational schema
                self.sub_tasks.retain(|s| s.task_item_id != id);
            }
            Change::AddSubTask(mut sub_task) => {
                if !self.task_items.iter().any(|t| t.id == sub_task.task_item_id) {
                    return Err(StoreError::Conflict(format!(
                        "TaskItem id {} referenced by SubTask does not exist",
                        sub_task.task_item_id
                    )));
                }
                if sub_task.id == UNASSIGNED_ID {
                    sub_task.id = self.next_sub_task_id()?;
                } else if self.sub_tasks.iter().any(|s| s.id == sub_task.id) {
                    return Err(StoreError::Conflict(format!(
                        "SubTask id {} already exists",
                        sub_task.id
                    )));
                }
                self.sub_tasks.push(sub_task.clone());
                committed.sub_tasks.push(sub_task);
            }
            Change::UpdateSubTask(sub_task) => {
                let slot = self
                    .sub_tasks
                    .iter_mut()
                    .find(|s| s.id == sub_task.id)
                    .ok_or_else(|| {
                        StoreError::Conflict(format!("SubTask id {} no longer exists", sub_task.id))
                    })?;
                *slot = sub_task;
            }
            Change::RemoveSubTask(id) => {
                let before = self.sub_tasks.len();
                self.sub_tasks.retain(|s| s.id != id);
                if self.sub_tasks.len() == before {
                    return Err(StoreError::Conflict(format!(
                        "SubTask id {id} no longer exists"
                    )));
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
struct Faults {
    reads: AtomicBool,
    commits: AtomicBool,
}

/// In-memory implementation of [`TaskStore`] (for development/testing).
///
/// Sessions hold the store lock from `begin` until they are committed or
/// dropped, so units of work never interleave. Reads and commits can be made
/// to fail on demand.
#[derive(Debug, Default, Clone)]
pub struct InMemoryTaskStore {
    state: Arc<Mutex<State>>,
    faults: Arc<Faults>,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store holding `task_items`; their nested subtasks are stored too.
    ///
    /// Items and subtasks with an unassigned id get the next free one; those
    /// that cannot get one are skipped.
    pub fn with_task_items(task_items: Vec<TaskItem>) -> Self {
        let mut state = State::default();

        for mut item in task_items {
            if item.id == UNASSIGNED_ID {
                match state.next_task_item_id() {
                    Ok(id) => item.id = id,
                    Err(e) => {
                        tracing::warn!(error = %e, name = %item.name, "Skipping seed task item");
                        continue;
                    }
                }
            }
            for mut sub_task in std::mem::take(&mut item.sub_tasks) {
                if sub_task.id == UNASSIGNED_ID {
                    match state.next_sub_task_id() {
                        Ok(id) => sub_task.id = id,
                        Err(e) => {
                            tracing::warn!(
                                error = %e,
                                name = %sub_task.name,
                                "Skipping seed subtask"
                            );
                            continue;
                        }
                    }
                }
                sub_task.task_item_id = item.id;
                state.sub_tasks.push(sub_task);
            }
            state.task_items.push(item);
        }

        Self {
            state: Arc::new(Mutex::new(state)),
            faults: Arc::default(),
        }
    }

    /// Make every subsequent read fail with [`StoreError::Unavailable`]
    pub fn set_fail_reads(&self, fail: bool) {
        self.faults.reads.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent commit fail with [`StoreError::Unavailable`]
    pub fn set_fail_commits(&self, fail: bool) {
        self.faults.commits.store(fail, Ordering::SeqCst);
    }

    /// Committed task items with subtasks attached
    pub async fn snapshot(&self) -> Vec<TaskItem> {
        let state = self.state.lock().await;
        attach_sub_tasks(state.task_items.clone(), &state.sub_tasks)
    }

    /// Committed subtasks
    pub async fn sub_task_snapshot(&self) -> Vec<SubTask> {
        self.state.lock().await.sub_tasks.clone()
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn begin(&self) -> Result<Box<dyn StoreSession>, StoreError> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        Ok(Box::new(InMemorySession {
            guard,
            faults: Arc::clone(&self.faults),
            pending: Vec::new(),
        }))
    }
}

struct InMemorySession {
    guard: OwnedMutexGuard<State>,
    faults: Arc<Faults>,
    pending: Vec<Change>,
}

impl InMemorySession {
    fn check_reads(&self) -> Result<(), StoreError> {
        if self.faults.reads.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("Database error".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl StoreSession for InMemorySession {
    async fn task_items(&mut self) -> Result<Vec<TaskItem>, StoreError> {
        self.check_reads()?;
        Ok(attach_sub_tasks(
            self.guard.task_items.clone(),
            &self.guard.sub_tasks,
        ))
    }

    async fn sub_tasks(&mut self) -> Result<Vec<SubTask>, StoreError> {
        self.check_reads()?;
        Ok(self.guard.sub_tasks.clone())
    }

    fn stage(&mut self, change: Change) {
        self.pending.push(change);
    }

    async fn commit(self: Box<Self>) -> Result<Committed, StoreError> {
        let InMemorySession {
            mut guard,
            faults,
            pending,
        } = *self;

        if faults.commits.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("Database error".to_string()));
        }

        // Work on a copy so a failing change leaves the committed state untouched
        let mut next = guard.clone();
        let mut committed = Committed::default();
        let changes = pending.len();

        for change in pending {
            next.apply(change, &mut committed)?;
        }

        *guard = next;
        tracing::debug!(
            changes,
            inserted_task_items = committed.task_items.len(),
            inserted_sub_tasks = committed.sub_tasks.len(),
            "Committed in-memory session"
        );
        Ok(committed)
    }
}
