use chrono::NaiveDate;

use crate::models::request::{CreateTaskRequest, UpdateTaskRequest, TITLE_MAX_CHARS};
use crate::models::task::{Task, TaskPriority, TaskStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Title,
    DueDate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: FormField,
    pub message: &'static str,
}

/// Editable task fields as entered in the create/edit dialog.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskForm {
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub due_date: Option<NaiveDate>,
}

impl TaskForm {
    pub fn from_task(task: &Task) -> Self {
        Self {
            title: task.title.clone(),
            description: task.description.clone().unwrap_or_default(),
            status: task.status,
            priority: task.priority,
            due_date: task.due_date,
        }
    }

    /// Mirrors the API's title rules. New tasks additionally may not be due
    /// before `today`; stored tasks keep whatever due date they have.
    pub fn validate(&self, today: NaiveDate, is_new: bool) -> Result<(), Vec<FieldError>> {
        let mut errors = Vec::new();
        let title = self.title.trim();
        if title.is_empty() {
            errors.push(FieldError {
                field: FormField::Title,
                message: "Title is required",
            });
        } else if title.chars().count() > TITLE_MAX_CHARS {
            errors.push(FieldError {
                field: FormField::Title,
                message: "Title is too long",
            });
        }
        if is_new && self.due_date.is_some_and(|due| due < today) {
            errors.push(FieldError {
                field: FormField::DueDate,
                message: "Due date cannot be in the past",
            });
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    pub fn to_create_request(&self) -> CreateTaskRequest {
        CreateTaskRequest {
            title: Some(self.title.clone()),
            description: Some(self.description.clone()),
            status: Some(self.status),
            priority: Some(self.priority),
            due_date: self.due_date,
        }
    }

    pub fn to_update_request(&self) -> UpdateTaskRequest {
        UpdateTaskRequest {
            title: Some(self.title.clone()),
            description: Some(self.description.clone()),
            status: Some(self.status),
            priority: Some(self.priority),
            // always sent, so a removed date is cleared
            due_date: Some(self.due_date),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 10).unwrap()
    }

    #[test]
    fn blank_title_is_required() {
        let form = TaskForm {
            title: "   ".to_string(),
            ..TaskForm::default()
        };
        let errors = form.validate(today(), true).unwrap_err();
        assert_eq!(
            errors,
            vec![FieldError {
                field: FormField::Title,
                message: "Title is required"
            }]
        );
    }

    #[test]
    fn past_due_date_only_blocks_new_tasks() {
        let form = TaskForm {
            title: "Pay rent".to_string(),
            due_date: NaiveDate::from_ymd_opt(2024, 6, 9),
            ..TaskForm::default()
        };
        let errors = form.validate(today(), true).unwrap_err();
        assert_eq!(errors[0].field, FormField::DueDate);
        assert!(form.validate(today(), false).is_ok());

        let due_today = TaskForm {
            due_date: Some(today()),
            ..form
        };
        assert!(due_today.validate(today(), true).is_ok());
    }

    #[test]
    fn form_requests_pass_server_validation() {
        let form = TaskForm {
            title: " Review PR ".to_string(),
            description: String::new(),
            status: TaskStatus::InProgress,
            priority: TaskPriority::High,
            due_date: None,
        };
        let now = chrono::Utc::now();
        let task = form.to_create_request().into_new_task(now).unwrap();
        assert_eq!(task.title, "Review PR");
        assert_eq!(task.description, None);
        assert_eq!(task.status, TaskStatus::InProgress);

        let changes = form.to_update_request().into_changes(now).unwrap();
        assert_eq!(changes.description, Some(None));
        assert_eq!(changes.priority, Some(TaskPriority::High));
        assert_eq!(changes.due_date, Some(None));
    }
}
