//! JSON encoding of the whole collection, used for the local blob and for
//! export/import files. Both share the wire shape of a task array.

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::error::{TaskError, TaskResult};
use crate::store::ensure_unique_ids;
use crate::task::{validate_text, Task};

pub const INVALID_FORMAT_MESSAGE: &str = "Invalid file format. Please select a valid tasks file.";
pub const IMPORT_FAILED_MESSAGE: &str = "Error importing tasks. Please check the file format.";
pub const IMPORT_SUCCESS_MESSAGE: &str = "Tasks imported successfully!";

pub fn encode_tasks(tasks: &[Task]) -> TaskResult<String> {
    serde_json::to_string(tasks).map_err(|err| TaskError::storage(format!("failed to encode tasks: {err}")))
}

pub fn decode_tasks(raw: &str) -> TaskResult<Vec<Task>> {
    serde_json::from_str(raw).map_err(|err| TaskError::storage(format!("stored tasks are unreadable: {err}")))
}

/// Pretty-printed array written to the downloadable export file.
pub fn export_tasks(tasks: &[Task]) -> TaskResult<String> {
    serde_json::to_string_pretty(tasks)
        .map_err(|err| TaskError::storage(format!("failed to encode tasks: {err}")))
}

pub fn export_file_name(now: DateTime<Utc>) -> String {
    format!("tasks_{}.json", now.format("%Y-%m-%d"))
}

/// Validates an import file: must be a JSON array of well-formed tasks with unique ids
/// and non-empty text.
pub fn import_tasks(raw: &str) -> TaskResult<Vec<Task>> {
    let value: Value = serde_json::from_str(raw).map_err(|_| TaskError::storage(IMPORT_FAILED_MESSAGE))?;
    let Value::Array(items) = value else {
        return Err(TaskError::storage(INVALID_FORMAT_MESSAGE));
    };

    let mut tasks = Vec::with_capacity(items.len());
    for item in items {
        let mut task: Task =
            serde_json::from_value(item).map_err(|_| TaskError::storage(IMPORT_FAILED_MESSAGE))?;
        task.text = validate_text(&task.text).map_err(|_| TaskError::storage(IMPORT_FAILED_MESSAGE))?;
        tasks.push(task);
    }
    ensure_unique_ids(&tasks).map_err(|_| TaskError::storage(IMPORT_FAILED_MESSAGE))?;
    Ok(tasks)
}
