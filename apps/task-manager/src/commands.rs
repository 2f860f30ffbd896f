//! Subcommand execution against the task and subtask services

use std::io::Read;

use clap::Subcommand;
use domain_tasks::{Reply, SubTask, SubTaskService, TaskItem, TaskResult, TaskService, TaskStore};
use eyre::{Result, WrapErr};
use serde::Serialize;
use serde::de::DeserializeOwned;

#[derive(Subcommand, Debug)]
pub enum TaskCommand {
    /// List every task item with its subtasks
    List,
    /// Show one task item
    Get { id: i32 },
    /// Create a task item from a JSON payload ("-" reads stdin)
    Add { payload: String },
    /// Replace a task item's fields from a JSON payload
    Update { id: i32, payload: String },
    /// Delete a task item that has no pending subtasks
    Delete { id: i32 },
}

#[derive(Subcommand, Debug)]
pub enum SubTaskCommand {
    /// List the subtasks of a task item
    List { task_id: i32 },
    /// Show one subtask
    Get { id: i32 },
    /// Create a subtask from a JSON payload ("-" reads stdin)
    Add { payload: String },
    /// Replace a subtask's fields from a JSON payload
    Update {
        task_id: i32,
        sub_task_id: i32,
        payload: String,
    },
    /// Delete a subtask owned by the given task item
    Delete { task_id: i32, sub_task_id: i32 },
}

/// What a command prints once it has run
#[derive(Debug)]
pub struct Output {
    pub success: bool,
    pub message: String,
    pub body: Option<serde_json::Value>,
}

impl Output {
    fn from_reply<T: Serialize>(result: TaskResult<Reply<T>>) -> Result<Self> {
        match result {
            Ok(reply) => Ok(Self {
                success: true,
                message: reply.message,
                body: Some(serde_json::to_value(reply.value)?),
            }),
            Err(err) => Ok(Self::failure(err.to_string())),
        }
    }

    fn from_status(result: TaskResult<Reply<()>>) -> Self {
        match result {
            Ok(reply) => Self {
                success: true,
                message: reply.message,
                body: None,
            },
            Err(err) => Self::failure(err.to_string()),
        }
    }

    fn failure(message: String) -> Self {
        Self {
            success: false,
            message,
            body: None,
        }
    }

    /// Render the message, followed by the entity as pretty JSON when present
    pub fn render(&self) -> Result<String> {
        match &self.body {
            Some(body) => Ok(format!(
                "{}\n{}",
                self.message,
                serde_json::to_string_pretty(body)?
            )),
            None => Ok(self.message.clone()),
        }
    }
}

fn parse_payload<T: DeserializeOwned>(payload: &str, what: &str) -> Result<T> {
    let raw = if payload == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .wrap_err("Failed to read payload from stdin")?;
        buf
    } else {
        payload.to_string()
    };

    serde_json::from_str(&raw).wrap_err_with(|| format!("Invalid {what} payload"))
}

pub async fn run_task_command<S: TaskStore>(
    service: &TaskService<S>,
    command: TaskCommand,
) -> Result<Output> {
    match command {
        TaskCommand::List => match service.get_all_task_items().await {
            Ok(items) => Ok(Output {
                success: true,
                message: format!("Retrieved {} TaskItems", items.len()),
                body: Some(serde_json::to_value(items)?),
            }),
            Err(err) => Ok(Output::failure(err.to_string())),
        },
        TaskCommand::Get { id } => Output::from_reply(service.get_task_item(id).await),
        TaskCommand::Add { payload } => {
            let item: TaskItem = parse_payload(&payload, "TaskItem")?;
            Output::from_reply(service.add_task(item).await)
        }
        TaskCommand::Update { id, payload } => {
            let item: TaskItem = parse_payload(&payload, "TaskItem")?;
            Ok(Output::from_status(service.update_task(id, item).await))
        }
        TaskCommand::Delete { id } => Ok(Output::from_status(service.delete_task(id).await)),
    }
}

pub async fn run_sub_task_command<S: TaskStore>(
    service: &SubTaskService<S>,
    command: SubTaskCommand,
) -> Result<Output> {
    match command {
        SubTaskCommand::List { task_id } => {
            Output::from_reply(service.get_sub_tasks(task_id).await)
        }
        SubTaskCommand::Get { id } => Output::from_reply(service.get_sub_task_with_id(id).await),
        SubTaskCommand::Add { payload } => {
            let sub_task: SubTask = parse_payload(&payload, "SubTask")?;
            Output::from_reply(service.add_sub_task(sub_task).await)
        }
        SubTaskCommand::Update {
            task_id,
            sub_task_id,
            payload,
        } => {
            let sub_task: SubTask = parse_payload(&payload, "SubTask")?;
            Ok(Output::from_status(
                service.update_sub_task(task_id, sub_task_id, sub_task).await,
            ))
        }
        SubTaskCommand::Delete {
            task_id,
            sub_task_id,
        } => Ok(Output::from_status(
            service.delete_sub_task(task_id, sub_task_id).await,
        )),
    }
}
