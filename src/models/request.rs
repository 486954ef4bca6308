use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ApiError;
use crate::models::task::{NewTask, TaskChanges, TaskPriority, TaskStatus};

pub const TITLE_MAX_CHARS: usize = 255;

/// Body of `POST /api/tasks`. Only `title` is required; a missing title is reported
/// as a validation fault rather than a malformed body.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct CreateTaskRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<TaskPriority>,
    #[serde(
        default,
        deserialize_with = "blank_date_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub due_date: Option<NaiveDate>,
}

impl CreateTaskRequest {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }

    pub fn into_new_task(self, now: DateTime<Utc>) -> Result<NewTask, ApiError> {
        let title = normalize_title(self.title.as_deref().unwrap_or_default())?;
        Ok(NewTask {
            title,
            description: self.description.as_deref().and_then(normalize_description),
            status: self.status.unwrap_or_default(),
            priority: self.priority.unwrap_or_default(),
            due_date: self.due_date,
            created_at: now,
            updated_at: now,
        })
    }
}

/// Body of `PUT /api/tasks/{id}`. Absent and `null` fields are left unchanged,
/// except `due_date`, where `null` or `""` clears the stored date.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct UpdateTaskRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<TaskPriority>,
    #[serde(
        default,
        deserialize_with = "clearable_date",
        skip_serializing_if = "Option::is_none"
    )]
    pub due_date: Option<Option<NaiveDate>>,
}

impl UpdateTaskRequest {
    pub fn into_changes(self, now: DateTime<Utc>) -> Result<TaskChanges, ApiError> {
        let title = self.title.as_deref().map(normalize_title).transpose()?;
        Ok(TaskChanges {
            title,
            // a blank description clears the stored one
            description: self.description.as_deref().map(normalize_description),
            status: self.status,
            priority: self.priority,
            due_date: self.due_date,
            updated_at: now,
        })
    }
}

fn normalize_title(raw: &str) -> Result<String, ApiError> {
    let title = raw.trim();
    if title.is_empty() {
        return Err(ApiError::Validation("Title is required".to_string()));
    }
    if title.chars().count() > TITLE_MAX_CHARS {
        return Err(ApiError::Validation(format!(
            "Title must be at most {TITLE_MAX_CHARS} characters"
        )));
    }
    Ok(title.to_string())
}

fn normalize_description(raw: &str) -> Option<String> {
    let description = raw.trim();
    (!description.is_empty()).then(|| description.to_string())
}

/// Accepts `YYYY-MM-DD`, a timestamp starting with one, an empty string or `null`.
fn blank_date_as_none<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    let Some(raw) = raw else {
        return Ok(None);
    };
    let date_part = raw.trim().split('T').next().unwrap_or_default();
    if date_part.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
        .map(Some)
        .map_err(|err| serde::de::Error::custom(format!("invalid due_date {raw:?}: {err}")))
}

/// Only called for a present field, so the outer `Some` marks it as supplied.
fn clearable_date<'de, D>(deserializer: D) -> Result<Option<Option<NaiveDate>>, D::Error>
where
    D: Deserializer<'de>,
{
    blank_date_as_none(deserializer).map(Some)
}
