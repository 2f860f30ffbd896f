//! Tasks Domain
//!
//! Task items with nested subtasks, plus the services that enforce their
//! validation and referential rules.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────┐
//! │ TaskService / SubTaskService │  ← Business rules, validation, outcome logging
//! └──────────────┬───────────────┘
//!                │
//! ┌──────────────▼───────────────┐
//! │          TaskStore           │  ← Sessions: read, stage, commit
//! └──────────────┬───────────────┘
//!                │
//! ┌──────────────▼───────────────┐
//! │  InMemoryTaskStore / Pg...   │  ← Storage backends
//! └──────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use domain_tasks::{PgTaskStore, SubTaskService, TaskService};
//! use sea_orm::Database;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let db = Database::connect("postgres://...").await?;
//!
//! // Both services share one store
//! let store = Arc::new(PgTaskStore::new(db));
//! let tasks = TaskService::with_shared(Arc::clone(&store));
//! let sub_tasks = SubTaskService::with_shared(store);
//!
//! let reply = tasks.get_task_item(1).await?;
//! println!("{}", reply.message);
//! # Ok(())
//! # }
//! ```

pub mod entity;
pub mod error;
pub mod models;
pub mod postgres;
pub mod store;
pub mod sub_task_service;
pub mod task_service;
pub mod validation;

// Re-export commonly used types
pub use error::{Reply, TaskError, TaskResult, into_parts, into_status};
pub use models::{SubTask, TaskItem, UNASSIGNED_ID};
pub use postgres::PgTaskStore;
pub use store::{Change, Committed, InMemoryTaskStore, StoreError, StoreSession, TaskStore};
pub use sub_task_service::SubTaskService;
pub use task_service::TaskService;
pub use validation::Validate;
