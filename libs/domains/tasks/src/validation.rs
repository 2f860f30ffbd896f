//! Field rules shared by every mutating entry point.
//!
//! Add and update paths run the same rule set, so an entity that could not be
//! created can never be produced by an update either.

use crate::error::{TaskError, TaskResult};
use crate::models::{SubTask, TaskItem};

pub const TASK_NAME_EMPTY: &str = "Validation failed. TaskItem name cannot be left empty.";
pub const TASK_DESCRIPTION_EMPTY: &str =
    "Validation failed. TaskItem description cannot be left empty.";
pub const SUB_TASK_NAME_EMPTY: &str = "The SubTask name cannot be left empty";
pub const SUB_TASK_DESCRIPTION_EMPTY: &str = "The SubTask description cannot be left empty";

/// Entities that carry their own invariant set
pub trait Validate {
    /// Check the invariants in a fixed order and report the first violation
    fn validate(&self) -> TaskResult<()>;
}

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

fn require(ok: bool, message: &str) -> TaskResult<()> {
    if ok {
        Ok(())
    } else {
        Err(TaskError::Validation(message.to_string()))
    }
}

impl Validate for TaskItem {
    fn validate(&self) -> TaskResult<()> {
        require(!is_blank(&self.description), TASK_DESCRIPTION_EMPTY)?;
        require(!is_blank(&self.name), TASK_NAME_EMPTY)?;

        if self.due_date < self.date_created {
            return Err(TaskError::Validation(format!(
                "Date validation failed. DueDate {} cannot be earlier than DateCreated {}.",
                self.due_date, self.date_created
            )));
        }

        Ok(())
    }
}

impl Validate for SubTask {
    fn validate(&self) -> TaskResult<()> {
        require(!is_blank(&self.name), SUB_TASK_NAME_EMPTY)?;
        require(!is_blank(&self.description), SUB_TASK_DESCRIPTION_EMPTY)
    }
}
