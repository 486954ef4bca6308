use chrono::NaiveDate;

use crate::models::task::{Task, TaskFilter, TaskStatus};

/// One status column of the board.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub status: TaskStatus,
    pub tasks: Vec<Task>,
}

impl Column {
    pub fn title(&self) -> &'static str {
        self.status.label()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

/// Tasks grouped into pending, in-progress and completed columns, each keeping
/// the order of the fetched list.
#[derive(Debug, Clone, PartialEq)]
pub struct Board {
    columns: Vec<Column>,
}

impl Board {
    pub fn from_tasks(tasks: impl IntoIterator<Item = Task>) -> Self {
        let mut columns: Vec<Column> = TaskStatus::ALL
            .iter()
            .map(|&status| Column { status, tasks: Vec::new() })
            .collect();
        for task in tasks {
            if let Some(column) = columns.iter_mut().find(|column| column.status == task.status) {
                column.tasks.push(task);
            }
        }
        Self { columns }
    }

    /// Client-side filtering over an already fetched list.
    pub fn filtered(tasks: &[Task], filter: &TaskFilter) -> Self {
        Self::from_tasks(tasks.iter().filter(|task| filter.matches(task)).cloned())
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, status: TaskStatus) -> &Column {
        let index = TaskStatus::ALL
            .iter()
            .position(|candidate| *candidate == status)
            .unwrap_or_default();
        &self.columns[index]
    }

    pub fn overdue(&self, today: NaiveDate) -> impl Iterator<Item = &Task> {
        self.columns
            .iter()
            .flat_map(|column| column.tasks.iter())
            .filter(move |task| task.is_overdue(today))
    }
}
