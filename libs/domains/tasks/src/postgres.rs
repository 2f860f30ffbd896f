use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    IsolationLevel, QueryOrder, TransactionTrait,
};

use crate::{
    entity::{sub_task, task_item},
    models::{SubTask, TaskItem, UNASSIGNED_ID},
    store::{Change, Committed, StoreError, StoreSession, TaskStore, attach_sub_tasks},
};

/// Move the `SERIAL` sequence of `table` past its highest id.
///
/// Needed after a row is inserted with an explicit id, otherwise later
/// store-assigned inserts collide with it.
async fn sync_id_sequence(txn: &DatabaseTransaction, table: &str) -> Result<(), StoreError> {
    txn.execute_unprepared(&format!(
        "SELECT setval(pg_get_serial_sequence('{table}', 'id'), GREATEST(MAX(id), 1)) FROM {table}"
    ))
    .await?;
    Ok(())
}

/// PostgreSQL implementation of [`TaskStore`].
///
/// Each session is a SERIALIZABLE transaction, so the existence checks a
/// service performs still hold when its staged changes are written. Rows are
/// listed in id order.
#[derive(Clone)]
pub struct PgTaskStore {
    db: DatabaseConnection,
}

impl PgTaskStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }
}

#[async_trait]
impl TaskStore for PgTaskStore {
    async fn begin(&self) -> Result<Box<dyn StoreSession>, StoreError> {
        let txn = self
            .db
            .begin_with_config(Some(IsolationLevel::Serializable), None)
            .await?;

        Ok(Box::new(PgSession {
            txn,
            pending: Vec::new(),
        }))
    }
}

struct PgSession {
    txn: DatabaseTransaction,
    pending: Vec<Change>,
}

impl PgSession {
    async fn load_sub_tasks(&self) -> Result<Vec<SubTask>, StoreError> {
        let models = sub_task::Entity::find()
            .order_by_asc(sub_task::Column::Id)
            .all(&self.txn)
            .await?;

        Ok(models.into_iter().map(Into::into).collect())
    }
}

#[async_trait]
impl StoreSession for PgSession {
    async fn task_items(&mut self) -> Result<Vec<TaskItem>, StoreError> {
        let models = task_item::Entity::find()
            .order_by_asc(task_item::Column::Id)
            .all(&self.txn)
            .await?;
        let sub_tasks = self.load_sub_tasks().await?;

        let items = models.into_iter().map(Into::into).collect();
        Ok(attach_sub_tasks(items, &sub_tasks))
    }

    async fn sub_tasks(&mut self) -> Result<Vec<SubTask>, StoreError> {
        self.load_sub_tasks().await
    }

    fn stage(&mut self, change: Change) {
        self.pending.push(change);
    }

    async fn commit(self: Box<Self>) -> Result<Committed, StoreError> {
        let PgSession { txn, pending } = *self;
        let mut committed = Committed::default();

        // Any error drops `txn`, which rolls the transaction back
        for change in pending {
            match change {
                Change::AddTaskItem(item) => {
                    let explicit_id = item.id != UNASSIGNED_ID;
                    let model = task_item::ActiveModel::from(item).insert(&txn).await?;
                    if explicit_id {
                        sync_id_sequence(&txn, "task_items").await?;
                    }
                    tracing::info!(task_item_id = model.id, "Inserted task item");
                    committed.task_items.push(model.into());
                }
                Change::UpdateTaskItem(item) => {
                    let id = item.id;
                    task_item::ActiveModel::from(item).update(&txn).await?;
                    tracing::info!(task_item_id = id, "Updated task item");
                }
                Change::RemoveTaskItem(id) => {
                    let result = task_item::Entity::delete_by_id(id).exec(&txn).await?;
                    if result.rows_affected == 0 {
                        return Err(StoreError::Conflict(format!(
                            "TaskItem id {id} no longer exists"
                        )));
                    }
                    tracing::info!(task_item_id = id, "Deleted task item");
                }
                Change::AddSubTask(sub_task) => {
                    let explicit_id = sub_task.id != UNASSIGNED_ID;
                    let model = sub_task::ActiveModel::from(sub_task).insert(&txn).await?;
                    if explicit_id {
                        sync_id_sequence(&txn, "sub_tasks").await?;
                    }
                    tracing::info!(
                        sub_task_id = model.id,
                        task_item_id = model.task_item_id,
                        "Inserted subtask"
                    );
                    committed.sub_tasks.push(model.into());
                }
                Change::UpdateSubTask(sub_task) => {
                    let id = sub_task.id;
                    sub_task::ActiveModel::from(sub_task).update(&txn).await?;
                    tracing::info!(sub_task_id = id, "Updated subtask");
                }
                Change::RemoveSubTask(id) => {
                    let result = sub_task::Entity::delete_by_id(id).exec(&txn).await?;
                    if result.rows_affected == 0 {
                        return Err(StoreError::Conflict(format!(
                            "SubTask id {id} no longer exists"
                        )));
                    }
                    tracing::info!(sub_task_id = id, "Deleted subtask");
                }
            }
        }

        txn.commit().await?;
        Ok(committed)
    }
}
