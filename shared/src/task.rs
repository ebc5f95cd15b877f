use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{TaskError, TaskResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default, with = "iso8601::option")]
    pub deadline: Option<DateTime<Utc>>,
    #[serde(with = "iso8601")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateTaskRequest {
    #[serde(default)]
    pub text: String,
    #[serde(default, with = "iso8601::option")]
    pub deadline: Option<DateTime<Utc>>,
}

/// Partial update. Absent fields are left untouched; `deadline: Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateTaskRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "iso8601::patch")]
    pub deadline: Option<Option<DateTime<Utc>>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskStats {
    pub total: u64,
    pub completed: u64,
    pub pending: u64,
    pub overdue: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskFilter {
    #[default]
    All,
    Pending,
    Completed,
}

impl Task {
    pub fn new(text: String, deadline: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            text,
            completed: false,
            deadline: deadline.map(iso8601::truncate),
            created_at: iso8601::truncate(now),
        }
    }

    /// Deadline strictly in the past and the task still open.
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        !self.completed && self.deadline.is_some_and(|deadline| deadline < now)
    }
}

impl CreateTaskRequest {
    pub fn new(text: impl Into<String>, deadline: Option<DateTime<Utc>>) -> Self {
        Self {
            text: text.into(),
            deadline,
        }
    }

    /// Trimmed text, or `InvalidInput` when nothing is left.
    pub fn validated_text(&self) -> TaskResult<String> {
        validate_text(&self.text)
    }
}

impl UpdateTaskRequest {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn completed(completed: bool) -> Self {
        Self {
            completed: Some(completed),
            ..Self::default()
        }
    }

    pub fn deadline(deadline: Option<DateTime<Utc>>) -> Self {
        Self {
            deadline: Some(deadline),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_none() && self.completed.is_none() && self.deadline.is_none()
    }

    /// Rejects empty patches and blank text, returning a copy with text trimmed.
    pub fn validated(&self) -> TaskResult<Self> {
        if self.is_empty() {
            return Err(TaskError::invalid("No valid fields to update"));
        }
        let text = self.text.as_deref().map(validate_text).transpose()?;
        Ok(Self {
            text,
            completed: self.completed,
            deadline: self.deadline.map(|deadline| deadline.map(iso8601::truncate)),
        })
    }

    pub fn apply_to(&self, task: &mut Task) {
        if let Some(text) = &self.text {
            task.text = text.clone();
        }
        if let Some(completed) = self.completed {
            task.completed = completed;
        }
        if let Some(deadline) = self.deadline {
            task.deadline = deadline;
        }
    }
}

impl TaskStats {
    pub fn from_tasks(tasks: &[Task], now: DateTime<Utc>) -> Self {
        let total = tasks.len() as u64;
        let completed = tasks.iter().filter(|t| t.completed).count() as u64;
        let overdue = tasks.iter().filter(|t| t.is_overdue(now)).count() as u64;
        Self {
            total,
            completed,
            pending: total - completed,
            overdue,
        }
    }
}

impl TaskFilter {
    pub const ALL: [TaskFilter; 3] = [TaskFilter::All, TaskFilter::Pending, TaskFilter::Completed];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskFilter::All => "all",
            TaskFilter::Pending => "pending",
            TaskFilter::Completed => "completed",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TaskFilter::All => "All",
            TaskFilter::Pending => "Pending",
            TaskFilter::Completed => "Completed",
        }
    }

    pub fn matches(&self, task: &Task) -> bool {
        match self {
            TaskFilter::All => true,
            TaskFilter::Pending => !task.completed,
            TaskFilter::Completed => task.completed,
        }
    }

    /// Unknown or missing values fall back to `All`, as the list endpoint does.
    pub fn parse_lenient(raw: Option<&str>) -> Self {
        raw.and_then(|value| value.parse().ok()).unwrap_or_default()
    }
}

impl FromStr for TaskFilter {
    type Err = TaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(TaskFilter::All),
            "pending" => Ok(TaskFilter::Pending),
            "completed" => Ok(TaskFilter::Completed),
            other => Err(TaskError::invalid(format!("unknown filter `{other}`"))),
        }
    }
}

impl fmt::Display for TaskFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn validate_text(raw: &str) -> TaskResult<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(TaskError::invalid("Task text is required"));
    }
    Ok(trimmed.to_string())
}

/// Parses the value of a `datetime-local` input (local wall clock, no zone) or a full
/// RFC 3339 timestamp. An empty value means "no deadline".
pub fn parse_deadline_input(raw: &str) -> TaskResult<Option<DateTime<Utc>>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    if let Ok(parsed) = iso8601::parse(raw) {
        return Ok(Some(parsed));
    }
    let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S"))
        .map_err(|err| TaskError::invalid(format!("invalid deadline `{raw}`: {err}")))?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|local| Some(local.with_timezone(&Utc)))
        .ok_or_else(|| TaskError::invalid(format!("deadline `{raw}` does not exist locally")))
}

/// ISO-8601 encoding used on the wire and in persisted blobs: UTC, millisecond precision.
pub mod iso8601 {
    use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn format(value: &DateTime<Utc>) -> String {
        value.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    pub fn parse(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
        DateTime::parse_from_rfc3339(raw).map(|parsed| parsed.with_timezone(&Utc))
    }

    /// Drops sub-millisecond precision so values survive a trip through `format`.
    pub fn truncate(value: DateTime<Utc>) -> DateTime<Utc> {
        value.trunc_subsecs(3)
    }

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).map_err(serde::de::Error::custom)
    }

    pub mod option {
        use chrono::{DateTime, Utc};
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(
            value: &Option<DateTime<Utc>>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match value {
                Some(value) => serializer.serialize_str(&super::format(value)),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<DateTime<Utc>>, D::Error> {
            Option::<String>::deserialize(deserializer)?
                .filter(|raw| !raw.is_empty())
                .map(|raw| super::parse(&raw).map_err(serde::de::Error::custom))
                .transpose()
        }
    }

    /// Present-but-null and absent must stay distinguishable for updates.
    pub mod patch {
        use chrono::{DateTime, Utc};
        use serde::{Deserializer, Serializer};

        pub fn serialize<S: Serializer>(
            value: &Option<Option<DateTime<Utc>>>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            super::option::serialize(&value.flatten(), serializer)
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<Option<DateTime<Utc>>>, D::Error> {
            super::option::deserialize(deserializer).map(Some)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at(ms: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(ms).single().expect("valid timestamp")
    }

    #[test]
    fn task_serializes_with_camel_case_and_millis() {
        let task = Task {
            id: "1".into(),
            text: "Buy milk".into(),
            completed: false,
            deadline: None,
            created_at: at(1_714_564_800_000),
        };
        let json = serde_json::to_value(&task).expect("serialize");
        assert_eq!(
            json,
            serde_json::json!({
                "id": "1",
                "text": "Buy milk",
                "completed": false,
                "deadline": null,
                "createdAt": "2024-05-01T12:00:00.000Z",
            })
        );
    }

    #[test]
    fn task_decodes_missing_optional_fields() {
        let task: Task = serde_json::from_str(
            r#"{"id":"7","text":"Read","createdAt":"2024-05-01T12:00:00Z"}"#,
        )
        .expect("decode");
        assert!(!task.completed);
        assert_eq!(task.deadline, None);
        assert_eq!(task.created_at, at(1_714_564_800_000));
    }

    #[test]
    fn new_task_truncates_to_milliseconds() {
        let now = at(1_000) + Duration::nanoseconds(123_456);
        let task = Task::new("x".into(), Some(now), now);
        assert_eq!(task.created_at, at(1_000));
        assert_eq!(task.deadline, Some(at(1_000)));
        assert!(!task.completed);
    }

    #[test]
    fn patch_distinguishes_absent_and_null_deadline() {
        let absent: UpdateTaskRequest = serde_json::from_str(r#"{"completed":true}"#).expect("decode");
        assert_eq!(absent.deadline, None);

        let cleared: UpdateTaskRequest = serde_json::from_str(r#"{"deadline":null}"#).expect("decode");
        assert_eq!(cleared.deadline, Some(None));

        let body = serde_json::to_string(&UpdateTaskRequest::completed(true)).expect("encode");
        assert_eq!(body, r#"{"completed":true}"#);

        let body = serde_json::to_string(&UpdateTaskRequest::deadline(None)).expect("encode");
        assert_eq!(body, r#"{"deadline":null}"#);
    }

    #[test]
    fn patch_validation_rejects_empty_and_blank() {
        assert!(matches!(
            UpdateTaskRequest::default().validated(),
            Err(TaskError::InvalidInput(_))
        ));
        assert!(matches!(
            UpdateTaskRequest::text("   ").validated(),
            Err(TaskError::InvalidInput(_))
        ));
        let ok = UpdateTaskRequest::text("  walk dog ").validated().expect("valid");
        assert_eq!(ok.text.as_deref(), Some("walk dog"));
    }

    #[test]
    fn overdue_requires_open_task_with_past_deadline() {
        let now = at(10_000);
        let mut task = Task::new("t".into(), Some(at(9_999)), at(0));
        assert!(task.is_overdue(now));
        task.deadline = Some(now);
        assert!(!task.is_overdue(now));
        task.deadline = Some(at(9_999));
        task.completed = true;
        assert!(!task.is_overdue(now));
    }

    #[test]
    fn stats_count_each_bucket() {
        let now = at(100_000);
        let mut done = Task::new("a".into(), None, at(0));
        done.completed = true;
        let late = Task::new("b".into(), Some(at(1)), at(0));
        let open = Task::new("c".into(), None, at(0));
        let stats = TaskStats::from_tasks(&[done, late, open], now);
        assert_eq!(
            stats,
            TaskStats {
                total: 3,
                completed: 1,
                pending: 2,
                overdue: 1
            }
        );
    }

    #[test]
    fn filter_parsing_is_lenient_for_queries() {
        assert_eq!("Pending".parse::<TaskFilter>().expect("parse"), TaskFilter::Pending);
        assert!("soon".parse::<TaskFilter>().is_err());
        assert_eq!(TaskFilter::parse_lenient(Some("soon")), TaskFilter::All);
        assert_eq!(TaskFilter::parse_lenient(None), TaskFilter::All);
        assert_eq!(TaskFilter::Completed.to_string(), "completed");
    }

    #[test]
    fn deadline_input_accepts_blank_rfc3339_and_local() {
        assert_eq!(parse_deadline_input("  ").expect("blank"), None);
        assert_eq!(
            parse_deadline_input("2024-05-01T12:00:00.000Z").expect("rfc3339"),
            Some(at(1_714_564_800_000))
        );
        let local = parse_deadline_input("2024-05-01T12:00").expect("local");
        let expected = Local
            .from_local_datetime(
                &NaiveDateTime::parse_from_str("2024-05-01T12:00", "%Y-%m-%dT%H:%M").expect("naive"),
            )
            .earliest()
            .map(|dt| dt.with_timezone(&Utc));
        assert_eq!(local, expected);
        assert!(parse_deadline_input("tomorrow").is_err());
    }
}
