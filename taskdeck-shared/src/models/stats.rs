//! Dashboard statistics derived from a user's tasks

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::task::{Task, TaskStatus};

/// How far ahead a due date counts as upcoming
pub const UPCOMING_WINDOW_DAYS: i64 = 7;

/// Maximum number of upcoming deadlines reported
pub const UPCOMING_LIMIT: usize = 5;

/// Aggregate view of one user's tasks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStats {
    pub total: usize,
    pub completed: usize,
    pub in_progress: usize,
    pub pending: usize,

    /// Completed share in percent, 0 when there are no tasks
    pub completion_rate: f64,

    /// Open tasks due within the next week, soonest first
    pub upcoming_deadlines: Vec<Task>,
}

impl TaskStats {
    /// Computes statistics for `tasks` as of `now`
    pub fn from_tasks(tasks: &[Task], now: DateTime<Utc>) -> Self {
        let count = |status: TaskStatus| tasks.iter().filter(|t| t.status == status).count();

        let total = tasks.len();
        let completed = count(TaskStatus::Completed);

        let completion_rate = if total == 0 {
            0.0
        } else {
            completed as f64 * 100.0 / total as f64
        };

        let horizon = now + Duration::days(UPCOMING_WINDOW_DAYS);
        let mut upcoming: Vec<Task> = tasks
            .iter()
            .filter(|t| !t.is_completed)
            .filter(|t| t.due_date.is_some_and(|due| due >= now && due <= horizon))
            .cloned()
            .collect();
        upcoming.sort_by_key(|t| (t.due_date, t.created_at));
        upcoming.truncate(UPCOMING_LIMIT);

        Self {
            total,
            completed,
            in_progress: count(TaskStatus::InProgress),
            pending: count(TaskStatus::Pending),
            completion_rate,
            upcoming_deadlines: upcoming,
        }
    }
}
