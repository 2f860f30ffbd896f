use std::sync::Arc;
use tracing::instrument;

use crate::error::{DEFAULT_STORE_CONTEXT, Reply, TaskError, TaskResult, log_outcome};
use crate::models::SubTask;
use crate::store::{StoreError, StoreSession, TaskStore};
use crate::validation::Validate;

/// Service layer for SubTask business logic
#[derive(Clone)]
pub struct SubTaskService<S: TaskStore> {
    store: Arc<S>,
}

async fn task_item_exists(session: &mut dyn StoreSession, id: i32) -> TaskResult<bool> {
    Ok(session.task_items().await?.iter().any(|t| t.id == id))
}

async fn find_sub_task(session: &mut dyn StoreSession, id: i32) -> TaskResult<Option<SubTask>> {
    Ok(session.sub_tasks().await?.into_iter().find(|s| s.id == id))
}

fn sub_task_missing(id: i32) -> TaskError {
    TaskError::NotFound(format!("SubTask with id: {id} doesnot exists"))
}

fn not_owned_by(sub_task_id: i32, task_id: i32) -> TaskError {
    TaskError::NotFound(format!(
        "SubTask with id: {sub_task_id} does not belong to TaskItem with id: {task_id}"
    ))
}

impl<S: TaskStore> SubTaskService<S> {
    pub fn new(store: S) -> Self {
        Self::with_shared(Arc::new(store))
    }

    /// Build a service over a store that other services also use
    pub fn with_shared(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Look up a subtask by its own id, whatever task owns it
    #[instrument(skip(self))]
    pub async fn get_sub_task_with_id(&self, id: i32) -> TaskResult<Reply<SubTask>> {
        let mut session = self.store.begin().await?;

        let sub_task = find_sub_task(session.as_mut(), id)
            .await?
            .ok_or_else(|| sub_task_missing(id))?;

        Ok(Reply::new(
            sub_task,
            format!("Successfully retrieved SubTask for Task with id: {id}"),
        ))
    }

    /// Subtasks owned by task item `task_id`.
    ///
    /// An unknown task yields an empty list rather than an error; only a
    /// store failure makes the list absent.
    #[instrument(skip(self))]
    pub async fn get_sub_tasks(&self, task_id: i32) -> TaskResult<Reply<Vec<SubTask>>> {
        let context = format!("Failed to retreive SubTasks for Task with TaskId: {task_id}");

        let items = async {
            let mut session = self.store.begin().await?;
            session.task_items().await
        }
        .await
        .map_err(|e| {
            tracing::error!(task_item_id = task_id, error = %e, "Failed to load subtasks");
            TaskError::store(context, e)
        })?;

        match items.into_iter().find(|t| t.id == task_id) {
            Some(item) => Ok(Reply::new(
                item.sub_tasks,
                format!("Successfully retrieved SubTasks for Task with TaskId: {task_id}"),
            )),
            None => {
                tracing::warn!(task_item_id = task_id, "Subtasks requested for unknown task");
                Ok(Reply::new(
                    Vec::new(),
                    format!(
                        "TaskItem with id: {task_id} doesnot exists, Please recheck the task id"
                    ),
                ))
            }
        }
    }

    /// Replace the mutable fields of subtask `sub_task_id` owned by `task_id`
    #[instrument(skip(self, sub_task), fields(payload_id = sub_task.id))]
    pub async fn update_sub_task(
        &self,
        task_id: i32,
        sub_task_id: i32,
        sub_task: SubTask,
    ) -> TaskResult<Reply<()>> {
        let result = self.try_update_sub_task(task_id, sub_task_id, sub_task).await;
        log_outcome("update_sub_task", &result);
        result
    }

    async fn try_update_sub_task(
        &self,
        task_id: i32,
        sub_task_id: i32,
        sub_task: SubTask,
    ) -> TaskResult<Reply<()>> {
        sub_task.validate()?;

        let mut session = self.store.begin().await?;

        if !task_item_exists(session.as_mut(), task_id).await? {
            return Err(TaskError::NotFound(format!(
                "TaskItem with id: {task_id} does not exist"
            )));
        }

        let mut existing = find_sub_task(session.as_mut(), sub_task_id)
            .await?
            .ok_or_else(|| sub_task_missing(sub_task_id))?;

        if sub_task.id != sub_task_id {
            return Err(TaskError::IdMismatch(
                "Invalid request as provided id does not match with SubTaskId".to_string(),
            ));
        }
        if sub_task.task_item_id != task_id {
            return Err(TaskError::IdMismatch(
                "Invalid request as provided task id does not match with TaskItemId".to_string(),
            ));
        }
        if existing.task_item_id != task_id {
            return Err(not_owned_by(sub_task_id, task_id));
        }

        existing.apply_update(sub_task);
        session.update_sub_task(existing);
        session.commit().await?;

        Ok(Reply::new((), format!("SubTask with id: {sub_task_id} updated successfully")))
    }

    /// Validate and persist a new subtask under an existing task item
    #[instrument(
        skip(self, sub_task),
        fields(task_item_id = sub_task.task_item_id, name = %sub_task.name)
    )]
    pub async fn add_sub_task(&self, sub_task: SubTask) -> TaskResult<Reply<SubTask>> {
        let result = self.try_add_sub_task(sub_task).await;
        log_outcome("add_sub_task", &result);
        result
    }

    async fn try_add_sub_task(&self, sub_task: SubTask) -> TaskResult<Reply<SubTask>> {
        let mut session = self.store.begin().await?;

        if !task_item_exists(session.as_mut(), sub_task.task_item_id).await? {
            return Err(TaskError::NotFound(format!(
                "  Cannot add SubTask,Task with id:{} doesnot exists, Please recheck the task Id",
                sub_task.task_item_id
            )));
        }

        sub_task.validate()?;

        session.add_sub_task(sub_task);
        let committed = session.commit().await?;

        let persisted = committed.sub_tasks.into_iter().next().ok_or_else(|| {
            TaskError::store(
                DEFAULT_STORE_CONTEXT,
                StoreError::Inconsistent("commit reported no inserted SubTask".to_string()),
            )
        })?;

        let message = format!("TaskItem with name {} added successfully", persisted.name);
        Ok(Reply::new(persisted, message))
    }

    /// Delete subtask `sub_task_id` owned by `task_id`
    #[instrument(skip(self))]
    pub async fn delete_sub_task(&self, task_id: i32, sub_task_id: i32) -> TaskResult<Reply<()>> {
        let result = self.try_delete_sub_task(task_id, sub_task_id).await;
        log_outcome("delete_sub_task", &result);
        result
    }

    async fn try_delete_sub_task(&self, task_id: i32, sub_task_id: i32) -> TaskResult<Reply<()>> {
        let mut session = self.store.begin().await?;

        if !task_item_exists(session.as_mut(), task_id).await? {
            return Err(TaskError::NotFound(format!(
                "  Cannot add SubTask,Task with id: {task_id} doesnot exists, Please recheck the task Id"
            )));
        }

        let existing = find_sub_task(session.as_mut(), sub_task_id)
            .await?
            .ok_or_else(|| sub_task_missing(sub_task_id))?;

        if existing.task_item_id != task_id {
            return Err(not_owned_by(sub_task_id, task_id));
        }

        session.remove_sub_task(sub_task_id);
        session.commit().await?;

        Ok(Reply::new((), format!("SubTask with id: {sub_task_id} deleted successfully")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{TaskItem, UNASSIGNED_ID};
    use crate::store::{InMemoryTaskStore, MockTaskStore};
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sub_task(id: i32, task_item_id: i32) -> SubTask {
        SubTask {
            id,
            name: format!("Test SubTask {id}"),
            description: format!("Description for Test SubTask {id}"),
            date_created: date(2024, 7, 24),
            due_date: date(2024, 7, 25),
            is_completed: true,
            task_item_id,
        }
    }

    fn task_item(id: i32, sub_tasks: Vec<SubTask>) -> TaskItem {
        TaskItem {
            id,
            name: format!("Test Task Item {id}"),
            description: "It is a unit test task".to_string(),
            date_created: date(2024, 7, 23),
            due_date: date(2024, 7, 28),
            is_completed: true,
            sub_tasks,
        }
    }

    fn seeded() -> (InMemoryTaskStore, SubTaskService<InMemoryTaskStore>) {
        let store = InMemoryTaskStore::with_task_items(vec![
            task_item(1, vec![sub_task(1, 1)]),
            task_item(2, vec![]),
            task_item(3, vec![sub_task(2, 3)]),
        ]);
        let service = SubTaskService::new(store.clone());
        (store, service)
    }

    #[tokio::test]
    async fn test_get_sub_task_with_id_existing() {
        let (_, service) = seeded();

        let reply = service.get_sub_task_with_id(1).await.unwrap();

        assert_eq!(reply.value.name, "Test SubTask 1");
        assert!(
            reply
                .message
                .contains("Successfully retrieved SubTask for Task with id: 1")
        );
    }

    #[tokio::test]
    async fn test_get_sub_task_with_id_missing() {
        let (_, service) = seeded();

        let err = service.get_sub_task_with_id(3).await.unwrap_err();

        assert!(err.to_string().contains("SubTask with id: 3 doesnot exists"));
    }

    #[tokio::test]
    async fn test_get_sub_tasks_store_failure_is_absent() {
        let (store, service) = seeded();
        store.set_fail_reads(true);

        let err = service.get_sub_tasks(1).await.unwrap_err();

        assert!(err.is_store_failure());
        assert!(
            err.to_string()
                .contains("Failed to retreive SubTasks for Task with TaskId: 1")
        );
    }

    #[tokio::test]
    async fn test_get_sub_tasks_unknown_task_is_empty() {
        let (_, service) = seeded();

        let reply = service.get_sub_tasks(999).await.unwrap();

        assert!(reply.value.is_empty());
        assert!(
            reply
                .message
                .contains("TaskItem with id: 999 doesnot exists, Please recheck the task id")
        );
    }

    #[tokio::test]
    async fn test_get_sub_tasks_task_without_sub_tasks_is_empty() {
        let (_, service) = seeded();

        let reply = service.get_sub_tasks(2).await.unwrap();

        assert!(reply.value.is_empty());
        assert!(reply.message.contains("Successfully retrieved SubTasks"));
    }

    #[tokio::test]
    async fn test_get_sub_tasks_scoped_to_task() {
        let (_, service) = seeded();

        let reply = service.get_sub_tasks(3).await.unwrap();

        assert_eq!(reply.value.len(), 1);
        assert_eq!(reply.value[0].id, 2);
    }

    #[tokio::test]
    async fn test_update_sub_task_empty_description() {
        let (store, service) = seeded();
        let mut payload = sub_task(1, 1);
        payload.name = "Updated SubTask".to_string();
        payload.description = String::new();
        payload.due_date = date(2024, 7, 26);
        payload.is_completed = false;

        let err = service.update_sub_task(1, 1, payload).await.unwrap_err();

        assert!(
            err.to_string()
                .contains("The SubTask description cannot be left empty")
        );
        assert!(store.sub_task_snapshot().await[0].is_completed);
    }

    #[tokio::test]
    async fn test_update_sub_task_overwrites_fields() {
        let (store, service) = seeded();
        let mut payload = sub_task(1, 1);
        payload.name = "Updated SubTask".to_string();
        payload.is_completed = false;

        let reply = service.update_sub_task(1, 1, payload).await.unwrap();

        assert!(reply.message.contains("SubTask with id: 1 updated successfully"));
        let stored = &store.sub_task_snapshot().await[0];
        assert_eq!(stored.name, "Updated SubTask");
        assert!(!stored.is_completed);
    }

    #[tokio::test]
    async fn test_update_sub_task_rejects_mismatches() {
        let (_, service) = seeded();

        let err = service
            .update_sub_task(1, 1, sub_task(2, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, TaskError::IdMismatch(_)));

        let err = service
            .update_sub_task(1, 1, sub_task(1, 3))
            .await
            .unwrap_err();
        assert!(matches!(err, TaskError::IdMismatch(_)));

        let err = service
            .update_sub_task(3, 1, sub_task(1, 3))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("does not belong to TaskItem with id: 3"));
    }

    #[tokio::test]
    async fn test_update_sub_task_missing_parent() {
        let (_, service) = seeded();

        let err = service
            .update_sub_task(99, 1, sub_task(1, 99))
            .await
            .unwrap_err();

        assert!(err.to_string().contains("TaskItem with id: 99 does not exist"));
    }

    #[tokio::test]
    async fn test_add_sub_task_unknown_task() {
        let (store, service) = seeded();
        let mut payload = sub_task(0, 99);
        payload.name = "SubTask1".to_string();
        payload.description = "Description1".to_string();

        let err = service.add_sub_task(payload).await.unwrap_err();

        assert_eq!(
            err.to_string(),
            "  Cannot add SubTask,Task with id:99 doesnot exists, Please recheck the task Id"
        );
        assert_eq!(store.sub_task_snapshot().await.len(), 2);
    }

    #[tokio::test]
    async fn test_add_sub_task_empty_name() {
        let (_, service) = seeded();
        let mut payload = sub_task(0, 1);
        payload.name = String::new();

        let err = service.add_sub_task(payload).await.unwrap_err();

        assert_eq!(err.to_string(), "The SubTask name cannot be left empty");
    }

    #[tokio::test]
    async fn test_add_sub_task_valid_input() {
        let (_, service) = seeded();
        let mut payload = sub_task(0, 1);
        payload.name = "SubTask1".to_string();

        let reply = service.add_sub_task(payload.clone()).await.unwrap();

        assert_eq!(reply.value.name, payload.name);
        assert_eq!(reply.message, "TaskItem with name SubTask1 added successfully");

        let fetched = service.get_sub_task_with_id(reply.value.id).await.unwrap();
        assert_eq!(fetched.value, reply.value);
    }

    #[tokio::test]
    async fn test_add_sub_task_after_max_id_is_store_failure() {
        let store =
            InMemoryTaskStore::with_task_items(vec![task_item(1, vec![sub_task(i32::MAX, 1)])]);
        let service = SubTaskService::new(store.clone());

        let err = service
            .add_sub_task(sub_task(UNASSIGNED_ID, 1))
            .await
            .unwrap_err();

        assert!(err.is_store_failure());
        assert_eq!(store.sub_task_snapshot().await.len(), 1);
    }

    #[tokio::test]
    async fn test_delete_sub_task_unknown_task() {
        let (_, service) = seeded();

        let err = service.delete_sub_task(99, 1).await.unwrap_err();

        assert_eq!(
            err.to_string(),
            "  Cannot add SubTask,Task with id: 99 doesnot exists, Please recheck the task Id"
        );
    }

    #[tokio::test]
    async fn test_delete_sub_task_removes_only_that_row() {
        let (store, service) = seeded();

        let reply = service.delete_sub_task(3, 2).await.unwrap();

        assert!(reply.message.contains("SubTask with id: 2 deleted successfully"));
        let remaining = store.sub_task_snapshot().await;
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, 1);
    }

    #[tokio::test]
    async fn test_delete_sub_task_owned_by_other_task() {
        let (store, service) = seeded();

        let err = service.delete_sub_task(1, 2).await.unwrap_err();

        assert!(err.to_string().contains("does not belong to TaskItem with id: 1"));
        assert_eq!(store.sub_task_snapshot().await.len(), 2);
    }

    #[tokio::test]
    async fn test_unavailable_store_on_get_sub_tasks() {
        let mut mock_store = MockTaskStore::new();
        mock_store
            .expect_begin()
            .returning(|| Err(StoreError::Unavailable("Database error".to_string())));

        let service = SubTaskService::new(mock_store);
        let err = service.get_sub_tasks(1).await.unwrap_err();

        assert!(
            err.to_string()
                .starts_with("Failed to retreive SubTasks for Task with TaskId: 1")
        );
    }
}
