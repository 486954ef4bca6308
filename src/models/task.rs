use std::fmt;
use std::io::Write;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use diesel::deserialize::{self, FromSql, FromSqlRow};
use diesel::expression::AsExpression;
use diesel::pg::{Pg, PgValue};
use diesel::serialize::{self, IsNull, Output, ToSql};
use diesel::sql_types::{BigInt, Text};
use diesel::{Insertable, Queryable, QueryableByName, Selectable};
use serde::{Deserialize, Serialize};

use crate::repository::schema::tasks;

#[derive(Debug, thiserror::Error)]
#[error("unknown {kind} {value:?}")]
pub struct ParseEnumError {
    kind: &'static str,
    value: String,
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Default, Debug)]
#[derive(Serialize, Deserialize, AsExpression, FromSqlRow)]
#[serde(rename_all = "snake_case")]
#[diesel(sql_type = Text)]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
}

impl TaskStatus {
    /// Board column order.
    pub const ALL: [TaskStatus; 3] = [Self::Pending, Self::InProgress, Self::Completed];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::InProgress => "In Progress",
            Self::Completed => "Completed",
        }
    }
}

impl FromStr for TaskStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            other => Err(ParseEnumError {
                kind: "status",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Default, Debug)]
#[derive(Serialize, Deserialize, AsExpression, FromSqlRow)]
#[serde(rename_all = "snake_case")]
#[diesel(sql_type = Text)]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
}

impl TaskPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl FromStr for TaskPriority {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(ParseEnumError {
                kind: "priority",
                value: other.to_string(),
            }),
        }
    }
}

// Both enumerations live in VARCHAR columns as their snake_case names.
macro_rules! text_column_enum {
    ($ty:ty) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl ToSql<Text, Pg> for $ty {
            fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
                out.write_all(self.as_str().as_bytes())?;
                Ok(IsNull::No)
            }
        }

        impl FromSql<Text, Pg> for $ty {
            fn from_sql(bytes: PgValue<'_>) -> deserialize::Result<Self> {
                let raw = <String as FromSql<Text, Pg>>::from_sql(bytes)?;
                Ok(raw.parse()?)
            }
        }
    };
}

text_column_enum!(TaskStatus);
text_column_enum!(TaskPriority);

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Queryable, Selectable)]
#[diesel(table_name = tasks)]
#[diesel(check_for_backend(Pg))]
pub struct Task {
    pub id: i32,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub due_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// A task is overdue when its due date lies before `today` and it is not completed.
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.status != TaskStatus::Completed && self.due_date.is_some_and(|due| due < today)
    }
}

/// A validated task ready for insertion. Both timestamps carry the same instant.
#[derive(Debug, Clone, PartialEq, Insertable)]
#[diesel(table_name = tasks)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub due_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Partial update. `None` leaves a column untouched; `Some(None)` clears a nullable one.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskChanges {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub due_date: Option<Option<NaiveDate>>,
    pub updated_at: DateTime<Utc>,
}

impl TaskChanges {
    pub fn touch(updated_at: DateTime<Utc>) -> Self {
        Self {
            title: None,
            description: None,
            status: None,
            priority: None,
            due_date: None,
            updated_at,
        }
    }

    pub fn apply(self, task: &mut Task) {
        if let Some(title) = self.title {
            task.title = title;
        }
        if let Some(description) = self.description {
            task.description = description;
        }
        if let Some(status) = self.status {
            task.status = status;
        }
        if let Some(priority) = self.priority {
            task.priority = priority;
        }
        if let Some(due_date) = self.due_date {
            task.due_date = due_date;
        }
        task.updated_at = self.updated_at.max(task.updated_at);
    }
}

/// Exact-match list filters. Empty values count as absent; unknown values match nothing.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
}

impl TaskFilter {
    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = Some(status.as_str().to_string());
        self
    }

    pub fn with_priority(mut self, priority: TaskPriority) -> Self {
        self.priority = Some(priority.as_str().to_string());
        self
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref().filter(|value| !value.is_empty())
    }

    pub fn priority(&self) -> Option<&str> {
        self.priority.as_deref().filter(|value| !value.is_empty())
    }

    pub fn matches(&self, task: &Task) -> bool {
        self.status().map_or(true, |status| task.status.as_str() == status)
            && self.priority().map_or(true, |priority| task.priority.as_str() == priority)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, QueryableByName)]
pub struct TaskStats {
    #[diesel(sql_type = BigInt)]
    pub total_tasks: i64,
    #[diesel(sql_type = BigInt)]
    pub completed_tasks: i64,
    #[diesel(sql_type = BigInt)]
    pub in_progress_tasks: i64,
    #[diesel(sql_type = BigInt)]
    pub pending_tasks: i64,
    #[diesel(sql_type = BigInt)]
    pub high_priority_tasks: i64,
    #[diesel(sql_type = BigInt)]
    pub overdue_tasks: i64,
}

impl TaskStats {
    pub fn tally<'a>(tasks: impl IntoIterator<Item = &'a Task>, today: NaiveDate) -> Self {
        tasks.into_iter().fold(Self::default(), |mut stats, task| {
            stats.total_tasks += 1;
            match task.status {
                TaskStatus::Completed => stats.completed_tasks += 1,
                TaskStatus::InProgress => stats.in_progress_tasks += 1,
                TaskStatus::Pending => stats.pending_tasks += 1,
            }
            if task.priority == TaskPriority::High {
                stats.high_priority_tasks += 1;
            }
            if task.is_overdue(today) {
                stats.overdue_tasks += 1;
            }
            stats
        })
    }
}
