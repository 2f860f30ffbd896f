//! Sea-ORM entities for the `task_items` and `sub_tasks` tables

use sea_orm::ActiveValue::{NotSet, Set};

use crate::models::{SubTask, TaskItem, UNASSIGNED_ID};

pub mod task_item {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
    #[sea_orm(table_name = "task_items")]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i32,
        pub name: String,
        #[sea_orm(column_type = "Text")]
        pub description: String,
        pub date_created: Date,
        pub due_date: Date,
        pub is_completed: bool,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {
        #[sea_orm(has_many = "super::sub_task::Entity")]
        SubTasks,
    }

    impl Related<super::sub_task::Entity> for Entity {
        fn to() -> RelationDef {
            Relation::SubTasks.def()
        }
    }

    impl ActiveModelBehavior for ActiveModel {}
}

pub mod sub_task {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
    #[sea_orm(table_name = "sub_tasks")]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i32,
        pub task_item_id: i32,
        pub name: String,
        #[sea_orm(column_type = "Text")]
        pub description: String,
        pub date_created: Date,
        pub due_date: Date,
        pub is_completed: bool,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {
        #[sea_orm(
            belongs_to = "super::task_item::Entity",
            from = "Column::TaskItemId",
            to = "super::task_item::Column::Id",
            on_delete = "Cascade"
        )]
        TaskItem,
    }

    impl Related<super::task_item::Entity> for Entity {
        fn to() -> RelationDef {
            Relation::TaskItem.def()
        }
    }

    impl ActiveModelBehavior for ActiveModel {}
}

// Subtasks are loaded separately and attached by the store
impl From<task_item::Model> for TaskItem {
    fn from(model: task_item::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            description: model.description,
            date_created: model.date_created,
            due_date: model.due_date,
            is_completed: model.is_completed,
            sub_tasks: Vec::new(),
        }
    }
}

impl From<sub_task::Model> for SubTask {
    fn from(model: sub_task::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            description: model.description,
            date_created: model.date_created,
            due_date: model.due_date,
            is_completed: model.is_completed,
            task_item_id: model.task_item_id,
        }
    }
}

// An unassigned id is left to the SERIAL column
impl From<TaskItem> for task_item::ActiveModel {
    fn from(item: TaskItem) -> Self {
        task_item::ActiveModel {
            id: if item.id == UNASSIGNED_ID {
                NotSet
            } else {
                Set(item.id)
            },
            name: Set(item.name),
            description: Set(item.description),
            date_created: Set(item.date_created),
            due_date: Set(item.due_date),
            is_completed: Set(item.is_completed),
        }
    }
}

impl From<SubTask> for sub_task::ActiveModel {
    fn from(sub_task: SubTask) -> Self {
        sub_task::ActiveModel {
            id: if sub_task.id == UNASSIGNED_ID {
                NotSet
            } else {
                Set(sub_task.id)
            },
            task_item_id: Set(sub_task.task_item_id),
            name: Set(sub_task.name),
            description: Set(sub_task.description),
            date_created: Set(sub_task.date_created),
            due_date: Set(sub_task.due_date),
            is_completed: Set(sub_task.is_completed),
        }
    }
}
