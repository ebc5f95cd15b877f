//! Pure projection of the task collection into what the UI shows.
//!
//! Nothing here holds state: the same tasks, filter, edit target and clock always
//! produce the same [`TaskListView`]. Task text is carried verbatim; the presentation
//! layer must emit it as a text node, never as markup.

use chrono::{DateTime, Duration, Local, Utc};

use crate::store::TaskCounts;
use crate::task::{Task, TaskFilter};

const DAY_MS: i64 = 24 * 60 * 60 * 1000;

/// Open tasks due within this many hours are flagged as due soon.
pub const DUE_SOON_WINDOW_HOURS: i64 = 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeadlineState {
    Overdue,
    DueSoon,
    Normal,
}

impl DeadlineState {
    pub fn css_class(&self) -> &'static str {
        match self {
            DeadlineState::Overdue => "overdue",
            DeadlineState::DueSoon => "due-soon",
            DeadlineState::Normal => "normal",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeadlineView {
    pub label: String,
    pub state: DeadlineState,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskView {
    pub id: String,
    pub text: String,
    pub completed: bool,
    pub editing: bool,
    pub created_label: String,
    pub deadline: Option<DeadlineView>,
}

impl TaskView {
    pub fn is_overdue(&self) -> bool {
        self.deadline
            .as_ref()
            .is_some_and(|deadline| deadline.state == DeadlineState::Overdue)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmptyState {
    pub title: &'static str,
    pub message: &'static str,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskListView {
    pub filter: TaskFilter,
    pub items: Vec<TaskView>,
    pub count_label: String,
    pub empty: Option<EmptyState>,
}

pub fn render(
    tasks: &[Task],
    filter: TaskFilter,
    editing: Option<&str>,
    now: DateTime<Utc>,
) -> TaskListView {
    let items: Vec<TaskView> = tasks
        .iter()
        .filter(|task| filter.matches(task))
        .map(|task| task_view(task, editing == Some(task.id.as_str()), now))
        .collect();

    let completed = tasks.iter().filter(|t| t.completed).count();
    let counts = TaskCounts {
        total: tasks.len(),
        pending: tasks.len() - completed,
        completed,
    };

    TaskListView {
        filter,
        empty: items.is_empty().then(|| empty_state(filter)),
        items,
        count_label: count_label(counts, filter),
    }
}

pub fn task_view(task: &Task, editing: bool, now: DateTime<Utc>) -> TaskView {
    TaskView {
        id: task.id.clone(),
        text: task.text.clone(),
        completed: task.completed,
        editing,
        created_label: created_label(task.created_at, now),
        deadline: task.deadline.map(|deadline| DeadlineView {
            label: deadline_label(deadline, now),
            state: deadline_state(task, deadline, now),
        }),
    }
}

pub fn deadline_state(task: &Task, deadline: DateTime<Utc>, now: DateTime<Utc>) -> DeadlineState {
    if task.completed {
        DeadlineState::Normal
    } else if deadline < now {
        DeadlineState::Overdue
    } else if deadline - now <= Duration::hours(DUE_SOON_WINDOW_HOURS) {
        DeadlineState::DueSoon
    } else {
        DeadlineState::Normal
    }
}

/// Age of a task: whole days elapsed, rounded down.
pub fn created_label(created_at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let days = (now - created_at).num_milliseconds().div_euclid(DAY_MS);
    match days {
        i64::MIN..=0 => "Today".to_string(),
        1 => "Yesterday".to_string(),
        2..=7 => format!("{days} days ago"),
        _ => absolute_date(created_at),
    }
}

/// Time left until a deadline: whole days, rounded up.
pub fn deadline_label(deadline: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let days = -(-(deadline - now).num_milliseconds()).div_euclid(DAY_MS);
    match days {
        i64::MIN..=-1 => {
            let overdue = days.unsigned_abs();
            format!("Overdue by {overdue} {}", plural(overdue, "day"))
        }
        0 => "Due today".to_string(),
        1 => "Due tomorrow".to_string(),
        2..=7 => format!("Due in {days} days"),
        _ => format!("Due {}", absolute_date(deadline)),
    }
}

/// Calendar date in the viewer's time zone, e.g. `5/14/2024`.
pub fn absolute_date(value: DateTime<Utc>) -> String {
    value.with_timezone(&Local).format("%-m/%-d/%Y").to_string()
}

pub fn count_label(counts: TaskCounts, filter: TaskFilter) -> String {
    match filter {
        TaskFilter::Pending => {
            format!("{} pending {}", counts.pending, plural(counts.pending as u64, "task"))
        }
        TaskFilter::Completed => format!(
            "{} completed {}",
            counts.completed,
            plural(counts.completed as u64, "task")
        ),
        TaskFilter::All => format!(
            "{} {} ({} pending, {} completed)",
            counts.total,
            plural(counts.total as u64, "task"),
            counts.pending,
            counts.completed
        ),
    }
}

pub fn empty_state(filter: TaskFilter) -> EmptyState {
    match filter {
        TaskFilter::All => EmptyState {
            title: "No tasks yet",
            message: "Add your first task to get started!",
        },
        TaskFilter::Pending => EmptyState {
            title: "No pending tasks",
            message: "All tasks are completed!",
        },
        TaskFilter::Completed => EmptyState {
            title: "No completed tasks",
            message: "Complete some tasks to see them here!",
        },
    }
}

fn plural(count: u64, noun: &str) -> String {
    if count == 1 {
        noun.to_string()
    } else {
        format!("{noun}s")
    }
}
