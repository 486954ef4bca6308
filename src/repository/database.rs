use chrono::NaiveDate;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{self, ConnectionManager, PooledConnection};
use diesel::sql_types::Timestamptz;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};

use crate::config::DatabaseSettings;
use crate::error::StoreError;
use crate::models::task::{
    NewTask, Task, TaskChanges, TaskFilter, TaskPriority, TaskStats, TaskStatus,
};
use crate::repository::schema::tasks;
use crate::repository::store::TaskStore;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

diesel::define_sql_function!(fn greatest(a: Timestamptz, b: Timestamptz) -> Timestamptz);

type DBPool = r2d2::Pool<ConnectionManager<PgConnection>>;
type DBConnection = PooledConnection<ConnectionManager<PgConnection>>;

const STATS_QUERY: &str = "
    SELECT
        COUNT(*) AS total_tasks,
        COUNT(CASE WHEN status = 'completed' THEN 1 END) AS completed_tasks,
        COUNT(CASE WHEN status = 'in_progress' THEN 1 END) AS in_progress_tasks,
        COUNT(CASE WHEN status = 'pending' THEN 1 END) AS pending_tasks,
        COUNT(CASE WHEN priority = 'high' THEN 1 END) AS high_priority_tasks,
        COUNT(CASE WHEN due_date < CURRENT_DATE AND status != 'completed' THEN 1 END)
            AS overdue_tasks
    FROM tasks";

/// Column assignments of a [`TaskChanges`]. `updated_at` is set separately so it
/// can be clamped against the stored value.
#[derive(AsChangeset)]
#[diesel(table_name = tasks)]
struct ColumnChanges<'a> {
    title: Option<&'a str>,
    description: Option<Option<&'a str>>,
    status: Option<TaskStatus>,
    priority: Option<TaskPriority>,
    due_date: Option<Option<NaiveDate>>,
}

impl<'a> From<&'a TaskChanges> for ColumnChanges<'a> {
    fn from(changes: &'a TaskChanges) -> Self {
        ColumnChanges {
            title: changes.title.as_deref(),
            description: changes.description.as_ref().map(Option::as_deref),
            status: changes.status,
            priority: changes.priority,
            due_date: changes.due_date,
        }
    }
}

/// Every pooled session runs in UTC so `CURRENT_DATE` in the stats query is the
/// same day the in-memory store uses.
#[derive(Debug)]
struct UtcSession;

impl r2d2::CustomizeConnection<PgConnection, r2d2::Error> for UtcSession {
    fn on_acquire(&self, conn: &mut PgConnection) -> Result<(), r2d2::Error> {
        diesel::sql_query("SET TIME ZONE 'UTC'")
            .execute(conn)
            .map(|_| ())
            .map_err(r2d2::Error::QueryError)
    }
}

/// Postgres-backed task store. Connections are checked out per call and
/// returned to the pool when dropped.
#[derive(Debug, Clone)]
pub struct Database {
    pool: DBPool,
}

impl Database {
    pub fn connect(settings: &DatabaseSettings) -> Result<Self, StoreError> {
        let manager = ConnectionManager::<PgConnection>::new(settings.connection_url());
        let pool = r2d2::Pool::builder()
            .max_size(settings.pool_size.max(1))
            .connection_customizer(Box::new(UtcSession))
            .build(manager)?;
        Ok(Database { pool })
    }

    /// Applies pending embedded migrations and returns how many ran.
    pub fn run_migrations(&self) -> Result<usize, StoreError> {
        let mut conn = self.conn()?;
        let applied = conn
            .run_pending_migrations(MIGRATIONS)
            .map_err(|err| StoreError::Migration(err.to_string()))?;
        Ok(applied.len())
    }

    fn conn(&self) -> Result<DBConnection, StoreError> {
        Ok(self.pool.get()?)
    }
}

impl TaskStore for Database {
    fn list(&self, filter: &TaskFilter) -> Result<Vec<Task>, StoreError> {
        let mut query = tasks::table.select(Task::as_select()).into_boxed();
        if let Some(status) = filter.status() {
            query = query.filter(tasks::status.eq(status));
        }
        if let Some(priority) = filter.priority() {
            query = query.filter(tasks::priority.eq(priority));
        }
        let rows = query
            .order((tasks::created_at.desc(), tasks::id.desc()))
            .load(&mut self.conn()?)?;
        Ok(rows)
    }

    fn get(&self, id: i32) -> Result<Option<Task>, StoreError> {
        let task = tasks::table
            .find(id)
            .select(Task::as_select())
            .first(&mut self.conn()?)
            .optional()?;
        Ok(task)
    }

    fn create(&self, task: NewTask) -> Result<Task, StoreError> {
        let task = diesel::insert_into(tasks::table)
            .values(&task)
            .returning(Task::as_returning())
            .get_result(&mut self.conn()?)?;
        Ok(task)
    }

    fn update(&self, id: i32, changes: TaskChanges) -> Result<Option<Task>, StoreError> {
        let touched = greatest(tasks::updated_at, changes.updated_at);
        let task = diesel::update(tasks::table.find(id))
            .set((ColumnChanges::from(&changes), tasks::updated_at.eq(touched)))
            .returning(Task::as_returning())
            .get_result(&mut self.conn()?)
            .optional()?;
        Ok(task)
    }

    fn delete(&self, id: i32) -> Result<Option<Task>, StoreError> {
        let task = diesel::delete(tasks::table.find(id))
            .returning(Task::as_returning())
            .get_result(&mut self.conn()?)
            .optional()?;
        Ok(task)
    }

    fn stats(&self) -> Result<TaskStats, StoreError> {
        let stats = diesel::sql_query(STATS_QUERY).get_result::<TaskStats>(&mut self.conn()?)?;
        Ok(stats)
    }

    fn ping(&self) -> Result<(), StoreError> {
        diesel::sql_query("SELECT 1").execute(&mut self.conn()?)?;
        Ok(())
    }
}

// These tests start a Postgres container and need a local Docker daemon:
// `cargo test -- --ignored`.
#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::request::{CreateTaskRequest, UpdateTaskRequest};
    use crate::models::task::{TaskPriority, TaskStatus};
    use chrono::{Duration, NaiveDate, Utc};
    use testcontainers::core::{IntoContainerPort, WaitFor};
    use testcontainers::runners::SyncRunner;
    use testcontainers::{Container, GenericImage, ImageExt};

    fn start_postgres() -> (Container<GenericImage>, Database) {
        let node = GenericImage::new("postgres", "16-alpine")
            .with_exposed_port(5432.tcp())
            .with_wait_for(WaitFor::message_on_stdout("PostgreSQL init process complete"))
            .with_env_var("POSTGRES_DB", "taskmanager")
            .with_env_var("POSTGRES_USER", "taskuser")
            .with_env_var("POSTGRES_PASSWORD", "taskpass123")
            .start()
            .unwrap();
        let port = node.get_host_port_ipv4(5432.tcp()).unwrap();

        let settings = DatabaseSettings {
            host: "localhost".to_string(),
            port,
            name: "taskmanager".to_string(),
            user: "taskuser".to_string(),
            password: "taskpass123".to_string(),
            url: None,
            pool_size: 2,
        };
        let db = Database::connect(&settings).unwrap();
        db.run_migrations().unwrap();
        (node, db)
    }

    fn new_task(title: &str) -> NewTask {
        CreateTaskRequest::titled(title).into_new_task(Utc::now()).unwrap()
    }

    #[test]
    #[ignore = "requires docker"]
    fn test_create_get_and_defaults() {
        let (_node, db) = start_postgres();
        db.ping().unwrap();

        let created = db.create(new_task("Buy milk")).unwrap();
        assert!(created.id > 0);
        assert_eq!(created.status, TaskStatus::Pending);
        assert_eq!(created.priority, TaskPriority::Medium);
        assert_eq!(created.description, None);
        assert_eq!(created.due_date, None);
        assert_eq!(created.created_at, created.updated_at);

        let fetched = db.get(created.id).unwrap();
        assert_eq!(fetched, Some(created));
        assert_eq!(db.get(9999).unwrap(), None);
    }

    #[test]
    #[ignore = "requires docker"]
    fn test_list_filters_and_ordering() {
        let (_node, db) = start_postgres();
        let base = Utc::now();
        for (offset, status, priority) in [
            (0, TaskStatus::Completed, TaskPriority::High),
            (1, TaskStatus::Pending, TaskPriority::High),
            (2, TaskStatus::Completed, TaskPriority::High),
            (3, TaskStatus::Completed, TaskPriority::Low),
        ] {
            let mut task = new_task(&format!("task {offset}"));
            task.status = status;
            task.priority = priority;
            task.created_at = base + Duration::seconds(offset);
            task.updated_at = task.created_at;
            db.create(task).unwrap();
        }

        let filter = TaskFilter::default()
            .with_status(TaskStatus::Completed)
            .with_priority(TaskPriority::High);
        let titles: Vec<_> = db.list(&filter).unwrap().into_iter().map(|t| t.title).collect();
        assert_eq!(titles, vec!["task 2", "task 0"]);

        assert_eq!(db.list(&TaskFilter::default()).unwrap().len(), 4);
        let unknown = TaskFilter {
            status: Some("archived".to_string()),
            priority: None,
        };
        assert!(db.list(&unknown).unwrap().is_empty());
    }

    #[test]
    #[ignore = "requires docker"]
    fn test_partial_update_and_delete() {
        let (_node, db) = start_postgres();
        let mut task = new_task("Write report");
        task.due_date = NaiveDate::from_ymd_opt(2030, 1, 1);
        let created = db.create(task).unwrap();

        let request = UpdateTaskRequest {
            status: Some(TaskStatus::InProgress),
            ..UpdateTaskRequest::default()
        };
        let changes = request.into_changes(Utc::now()).unwrap();
        let updated = db.update(created.id, changes.clone()).unwrap().unwrap();
        assert_eq!(updated.status, TaskStatus::InProgress);
        assert_eq!(updated.title, created.title);
        assert_eq!(updated.priority, created.priority);
        assert_eq!(updated.created_at, created.created_at);
        assert!(updated.updated_at >= created.updated_at);
        assert_eq!(db.update(created.id + 1000, changes).unwrap(), None);

        let stale = UpdateTaskRequest {
            title: Some("Write the report".to_string()),
            due_date: Some(None),
            ..UpdateTaskRequest::default()
        };
        let stale = stale.into_changes(updated.updated_at - Duration::minutes(10)).unwrap();
        let renamed = db.update(created.id, stale).unwrap().unwrap();
        assert_eq!(renamed.title, "Write the report");
        assert_eq!(renamed.updated_at, updated.updated_at);
        assert_eq!(renamed.due_date, None);

        assert_eq!(db.delete(created.id + 1000).unwrap(), None);
        assert_eq!(db.stats().unwrap().total_tasks, 1);
        assert_eq!(db.delete(created.id).unwrap(), Some(renamed));
        assert_eq!(db.get(created.id).unwrap(), None);
    }

    #[derive(QueryableByName)]
    struct SessionZone {
        #[diesel(sql_type = diesel::sql_types::Text)]
        zone: String,
    }

    #[test]
    #[ignore = "requires docker"]
    fn test_sessions_use_utc() {
        let (_node, db) = start_postgres();
        let session = diesel::sql_query("SELECT current_setting('TimeZone') AS zone")
            .get_result::<SessionZone>(&mut db.conn().unwrap())
            .unwrap();
        assert_eq!(session.zone, "UTC");
    }

    #[test]
    #[ignore = "requires docker"]
    fn test_stats_counts_overdue_tasks() {
        let (_node, db) = start_postgres();
        let past = Utc::now().date_naive() - Duration::days(2);
        let far_future = NaiveDate::from_ymd_opt(2999, 1, 1);

        let mut overdue = new_task("overdue");
        overdue.due_date = Some(past);
        overdue.priority = TaskPriority::High;
        db.create(overdue).unwrap();

        let mut done = new_task("done late");
        done.due_date = Some(past);
        done.status = TaskStatus::Completed;
        db.create(done).unwrap();

        let mut later = new_task("later");
        later.due_date = far_future;
        later.status = TaskStatus::InProgress;
        db.create(later).unwrap();

        let stats = db.stats().unwrap();
        assert_eq!(
            stats,
            TaskStats {
                total_tasks: 3,
                completed_tasks: 1,
                in_progress_tasks: 1,
                pending_tasks: 1,
                high_priority_tasks: 1,
                overdue_tasks: 1,
            }
        );
    }
}
