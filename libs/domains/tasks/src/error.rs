use thiserror::Error;

use crate::store::StoreError;

/// Context used for store failures that have no operation-specific wording
pub const DEFAULT_STORE_CONTEXT: &str = "operation failed";

/// Failure outcomes of the task and subtask services.
///
/// `Display` renders the human-readable message handed back to callers.
#[derive(Debug, Error)]
pub enum TaskError {
    /// A field or relationship invariant is violated
    #[error("{0}")]
    Validation(String),

    /// Path and payload identities disagree
    #[error("{0}")]
    IdMismatch(String),

    /// A referenced entity does not exist
    #[error("{0}")]
    NotFound(String),

    /// Delete blocked because the task still owns incomplete subtasks
    #[error("TaskItem with id: {0} cannot be deleted as it has one or more pending subtasks.")]
    PendingSubTasks(i32),

    /// The persistence layer failed
    #[error("{context}: {source}")]
    Store {
        context: String,
        #[source]
        source: StoreError,
    },
}

pub type TaskResult<T> = Result<T, TaskError>;

impl TaskError {
    /// Wrap a store failure with an operation-specific message
    pub fn store(context: impl Into<String>, source: StoreError) -> Self {
        TaskError::Store {
            context: context.into(),
            source,
        }
    }

    /// True for failures raised by the persistence layer
    pub fn is_store_failure(&self) -> bool {
        matches!(self, TaskError::Store { .. })
    }
}

impl From<StoreError> for TaskError {
    fn from(err: StoreError) -> Self {
        TaskError::store(DEFAULT_STORE_CONTEXT, err)
    }
}

/// Successful service outcome: the value plus a display message
#[derive(Debug, Clone, PartialEq)]
pub struct Reply<T> {
    pub value: T,
    pub message: String,
}

impl<T> Reply<T> {
    pub fn new(value: T, message: impl Into<String>) -> Self {
        Self {
            value,
            message: message.into(),
        }
    }
}

/// Flatten a service outcome into `(value or absent, message)`
pub fn into_parts<T>(result: TaskResult<Reply<T>>) -> (Option<T>, String) {
    match result {
        Ok(reply) => (Some(reply.value), reply.message),
        Err(err) => (None, err.to_string()),
    }
}

/// Flatten a valueless service outcome into `(succeeded, message)`
pub fn into_status(result: TaskResult<Reply<()>>) -> (bool, String) {
    let (value, message) = into_parts(result);
    (value.is_some(), message)
}

/// Record the outcome of a service operation
pub(crate) fn log_outcome<T>(operation: &'static str, result: &TaskResult<Reply<T>>) {
    match result {
        Ok(reply) => tracing::info!(operation, message = %reply.message, "Operation succeeded"),
        Err(err) if err.is_store_failure() => {
            tracing::error!(operation, error = %err, "Operation failed in store")
        }
        Err(err) => tracing::warn!(operation, error = %err, "Operation rejected"),
    }
}
