use std::sync::Arc;
use tracing::instrument;

use crate::error::{DEFAULT_STORE_CONTEXT, Reply, TaskError, TaskResult, log_outcome};
use crate::models::TaskItem;
use crate::store::{StoreError, StoreSession, TaskStore};
use crate::validation::Validate;

/// Service layer for TaskItem business logic
#[derive(Clone)]
pub struct TaskService<S: TaskStore> {
    store: Arc<S>,
}

async fn find_task_item(
    session: &mut dyn StoreSession,
    id: i32,
) -> TaskResult<Option<TaskItem>> {
    Ok(session.task_items().await?.into_iter().find(|t| t.id == id))
}

impl<S: TaskStore> TaskService<S> {
    pub fn new(store: S) -> Self {
        Self::with_shared(Arc::new(store))
    }

    /// Build a service over a store that other services also use
    pub fn with_shared(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Every stored task item, in store order
    #[instrument(skip(self))]
    pub async fn get_all_task_items(&self) -> TaskResult<Vec<TaskItem>> {
        let mut session = self.store.begin().await?;
        let items = session.task_items().await.inspect_err(|e| {
            tracing::error!(error = %e, "Failed to list task items");
        })?;

        tracing::debug!(count = items.len(), "Listed task items");
        Ok(items)
    }

    /// Look up a task item by id
    #[instrument(skip(self))]
    pub async fn get_task_item(&self, id: i32) -> TaskResult<Reply<TaskItem>> {
        let mut session = self.store.begin().await?;

        match find_task_item(session.as_mut(), id).await? {
            Some(item) => Ok(Reply::new(
                item,
                format!("Successfully retrieved TaskItem with id: {id}"),
            )),
            None => {
                tracing::debug!(task_item_id = id, "Task item not found");
                Err(TaskError::NotFound(format!("TaskItem with id: {id} not found")))
            }
        }
    }

    /// Validate and persist a new task item.
    ///
    /// Nested subtasks in the payload are ignored; they are created through
    /// the subtask service.
    #[instrument(skip(self, item), fields(task_item_id = item.id, name = %item.name))]
    pub async fn add_task(&self, item: TaskItem) -> TaskResult<Reply<TaskItem>> {
        let result = self.try_add_task(item).await;
        log_outcome("add_task", &result);
        result
    }

    async fn try_add_task(&self, mut item: TaskItem) -> TaskResult<Reply<TaskItem>> {
        item.validate()?;
        item.sub_tasks.clear();

        let mut session = self.store.begin().await?;
        session.add_task_item(item);
        let committed = session.commit().await?;

        let persisted = committed.task_items.into_iter().next().ok_or_else(|| {
            TaskError::store(
                DEFAULT_STORE_CONTEXT,
                StoreError::Inconsistent("commit reported no inserted TaskItem".to_string()),
            )
        })?;

        let message = format!("TaskItem with name {} added successfully", persisted.name);
        Ok(Reply::new(persisted, message))
    }

    /// Delete a task item whose subtasks are all completed.
    ///
    /// The completed subtasks are removed in the same commit.
    #[instrument(skip(self))]
    pub async fn delete_task(&self, id: i32) -> TaskResult<Reply<()>> {
        let result = self.try_delete_task(id).await;
        log_outcome("delete_task", &result);
        result
    }

    async fn try_delete_task(&self, id: i32) -> TaskResult<Reply<()>> {
        let mut session = self.store.begin().await?;

        let item = find_task_item(session.as_mut(), id)
            .await?
            .ok_or_else(|| TaskError::NotFound(format!("TaskItem with id: {id} not found")))?;

        if item.has_pending_sub_tasks() {
            return Err(TaskError::PendingSubTasks(id));
        }

        for sub_task in &item.sub_tasks {
            session.remove_sub_task(sub_task.id);
        }
        session.remove_task_item(id);
        session.commit().await?;

        Ok(Reply::new((), format!("TaskItem with id: {id} deleted sucessfully")))
    }

    /// Replace the mutable fields of task item `id` with those of `item`
    #[instrument(skip(self, item), fields(payload_id = item.id))]
    pub async fn update_task(&self, id: i32, item: TaskItem) -> TaskResult<Reply<()>> {
        let result = self.try_update_task(id, item).await;
        log_outcome("update_task", &result);
        result
    }

    async fn try_update_task(&self, id: i32, item: TaskItem) -> TaskResult<Reply<()>> {
        let mut session = self.store.begin().await?;

        let mut existing = find_task_item(session.as_mut(), id)
            .await?
            .ok_or_else(|| TaskError::NotFound(format!("TaskItem with id: {id} does not exist")))?;

        if item.id != id {
            return Err(TaskError::IdMismatch(
                "Invalid request as provided id does not match with TaskItemId".to_string(),
            ));
        }

        item.validate()?;

        existing.apply_update(item);
        session.update_task_item(existing);
        session.commit().await?;

        Ok(Reply::new((), format!("TaskItem with id: {id} updated successfully")))
    }
}
