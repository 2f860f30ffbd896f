use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(TaskItems::Table)
                    .if_not_exists()
                    .col(pk_auto(TaskItems::Id))
                    .col(string(TaskItems::Name))
                    .col(text(TaskItems::Description))
                    .col(date(TaskItems::DateCreated))
                    .col(date(TaskItems::DueDate))
                    .col(boolean(TaskItems::IsCompleted).default(false))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(SubTasks::Table)
                    .if_not_exists()
                    .col(pk_auto(SubTasks::Id))
                    .col(integer(SubTasks::TaskItemId))
                    .col(string(SubTasks::Name))
                    .col(text(SubTasks::Description))
                    .col(date(SubTasks::DateCreated))
                    .col(date(SubTasks::DueDate))
                    .col(boolean(SubTasks::IsCompleted).default(false))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_sub_tasks_task_item_id")
                            .from(SubTasks::Table, SubTasks::TaskItemId)
                            .to(TaskItems::Table, TaskItems::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_sub_tasks_task_item_id")
                    .table(SubTasks::Table)
                    .col(SubTasks::TaskItemId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SubTasks::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(TaskItems::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum TaskItems {
    Table,
    Id,
    Name,
    Description,
    DateCreated,
    DueDate,
    IsCompleted,
}

#[derive(DeriveIden)]
enum SubTasks {
    Table,
    Id,
    TaskItemId,
    Name,
    Description,
    DateCreated,
    DueDate,
    IsCompleted,
}
