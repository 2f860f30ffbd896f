use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Identifier value meaning "not yet persisted, let the store assign one"
pub const UNASSIGNED_ID: i32 = 0;

/// Top-level work unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskItem {
    /// Unique identifier, `0` until the store assigns one
    #[serde(default)]
    pub id: i32,
    pub name: String,
    pub description: String,
    pub date_created: NaiveDate,
    pub due_date: NaiveDate,
    #[serde(default)]
    pub is_completed: bool,
    /// Owned subtasks, populated when read from a store
    #[serde(default)]
    pub sub_tasks: Vec<SubTask>,
}

/// Child work unit owned by exactly one [`TaskItem`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubTask {
    /// Unique identifier, `0` until the store assigns one
    #[serde(default)]
    pub id: i32,
    pub name: String,
    pub description: String,
    pub date_created: NaiveDate,
    pub due_date: NaiveDate,
    #[serde(default)]
    pub is_completed: bool,
    /// Owning task
    pub task_item_id: i32,
}

impl TaskItem {
    /// True when at least one owned subtask is not completed
    pub fn has_pending_sub_tasks(&self) -> bool {
        self.sub_tasks.iter().any(|s| !s.is_completed)
    }

    /// Overwrite the mutable fields with the ones from `update`.
    ///
    /// Identity and the owned subtask collection are left untouched.
    pub fn apply_update(&mut self, update: TaskItem) {
        self.name = update.name;
        self.description = update.description;
        self.date_created = update.date_created;
        self.due_date = update.due_date;
        self.is_completed = update.is_completed;
    }
}

impl SubTask {
    /// Overwrite the mutable fields with the ones from `update`
    pub fn apply_update(&mut self, update: SubTask) {
        self.name = update.name;
        self.description = update.description;
        self.date_created = update.date_created;
        self.due_date = update.due_date;
        self.is_completed = update.is_completed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sub_task(id: i32, completed: bool) -> SubTask {
        SubTask {
            id,
            name: format!("SubTask {id}"),
            description: "SubDescription".to_string(),
            date_created: date(2024, 7, 24),
            due_date: date(2024, 7, 25),
            is_completed: completed,
            task_item_id: 1,
        }
    }

    fn task_item(sub_tasks: Vec<SubTask>) -> TaskItem {
        TaskItem {
            id: 1,
            name: "Test Task Item 1".to_string(),
            description: "It is a unit test task".to_string(),
            date_created: date(2024, 7, 23),
            due_date: date(2024, 7, 28),
            is_completed: false,
            sub_tasks,
        }
    }

    #[test]
    fn test_pending_sub_tasks() {
        assert!(!task_item(vec![]).has_pending_sub_tasks());
        assert!(!task_item(vec![sub_task(1, true)]).has_pending_sub_tasks());
        assert!(task_item(vec![sub_task(1, true), sub_task(2, false)]).has_pending_sub_tasks());
    }

    #[test]
    fn test_apply_update_keeps_identity_and_sub_tasks() {
        let mut item = task_item(vec![sub_task(1, true)]);
        let mut update = task_item(vec![]);
        update.id = 42;
        update.name = "Renamed".to_string();
        update.is_completed = true;

        item.apply_update(update);

        assert_eq!(item.id, 1);
        assert_eq!(item.name, "Renamed");
        assert!(item.is_completed);
        assert_eq!(item.sub_tasks.len(), 1);
    }

    #[test]
    fn test_deserialize_defaults_id_and_completion() {
        let json = r#"{
            "name": "Write report",
            "description": "Quarterly numbers",
            "dateCreated": "2024-07-23",
            "dueDate": "2024-07-28"
        }"#;

        let item: TaskItem = serde_json::from_str(json).unwrap();

        assert_eq!(item.id, UNASSIGNED_ID);
        assert!(!item.is_completed);
        assert!(item.sub_tasks.is_empty());
        assert_eq!(item.due_date, date(2024, 7, 28));
    }
}
