use std::sync::Arc;

use actix_web::{delete, get, post, put, web, HttpResponse};
use chrono::Utc;

use crate::config::Environment;
use crate::error::{ApiError, StoreError};
use crate::models::envelope::Envelope;
use crate::models::request::{CreateTaskRequest, UpdateTaskRequest};
use crate::models::task::{Task, TaskFilter, TaskStats};
use crate::repository::store::TaskStore;

/// The task API over an injected store. Holds no mutable state of its own.
#[derive(Clone)]
pub struct TaskApi {
    store: Arc<dyn TaskStore>,
    environment: Environment,
}

impl TaskApi {
    pub fn new(store: Arc<dyn TaskStore>, environment: Environment) -> Self {
        Self { store, environment }
    }

    pub async fn list_tasks(&self, filter: TaskFilter) -> Result<Vec<Task>, ApiError> {
        self.run(move |store| store.list(&filter)).await
    }

    pub async fn get_task(&self, id: i32) -> Result<Task, ApiError> {
        self.run(move |store| store.get(id)).await?.ok_or(ApiError::NotFound)
    }

    pub async fn create_task(&self, request: CreateTaskRequest) -> Result<Task, ApiError> {
        let task = request.into_new_task(Utc::now())?;
        self.run(move |store| store.create(task)).await
    }

    pub async fn update_task(&self, id: i32, request: UpdateTaskRequest) -> Result<Task, ApiError> {
        let changes = request.into_changes(Utc::now())?;
        self.run(move |store| store.update(id, changes)).await?.ok_or(ApiError::NotFound)
    }

    pub async fn delete_task(&self, id: i32) -> Result<Task, ApiError> {
        self.run(move |store| store.delete(id)).await?.ok_or(ApiError::NotFound)
    }

    pub async fn stats(&self) -> Result<TaskStats, ApiError> {
        self.run(|store| store.stats()).await
    }

    /// Unlike the task operations, the raw store error is handed back so the
    /// health report can show it.
    pub async fn ping(&self) -> Result<(), StoreError> {
        let store = Arc::clone(&self.store);
        web::block(move || store.ping()).await?
    }

    async fn run<T, F>(&self, op: F) -> Result<T, ApiError>
    where
        F: FnOnce(&dyn TaskStore) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let store = Arc::clone(&self.store);
        let result = web::block(move || op(store.as_ref()))
            .await
            .map_err(StoreError::from)
            .and_then(|result| result);
        result.map_err(|err| ApiError::internal(err, self.environment))
    }
}

#[get("/tasks")]
pub async fn get_tasks(
    api: web::Data<TaskApi>,
    filter: web::Query<TaskFilter>,
) -> Result<HttpResponse, ApiError> {
    let tasks = api.list_tasks(filter.into_inner()).await?;
    Ok(HttpResponse::Ok().json(Envelope::list(tasks)))
}

#[get("/tasks/{id}")]
pub async fn get_task_by_id(
    api: web::Data<TaskApi>,
    id: web::Path<i32>,
) -> Result<HttpResponse, ApiError> {
    let task = api.get_task(id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(Envelope::data(task)))
}

#[post("/tasks")]
pub async fn create_task(
    api: web::Data<TaskApi>,
    new_task: web::Json<CreateTaskRequest>,
) -> Result<HttpResponse, ApiError> {
    let task = api.create_task(new_task.into_inner()).await?;
    tracing::info!(task_id = task.id, "task created");
    Ok(HttpResponse::Created().json(Envelope::data(task).with_message("Task created successfully")))
}

#[put("/tasks/{id}")]
pub async fn update_task_by_id(
    api: web::Data<TaskApi>,
    id: web::Path<i32>,
    updated_task: web::Json<UpdateTaskRequest>,
) -> Result<HttpResponse, ApiError> {
    let task = api.update_task(id.into_inner(), updated_task.into_inner()).await?;
    tracing::info!(task_id = task.id, "task updated");
    Ok(HttpResponse::Ok().json(Envelope::data(task).with_message("Task updated successfully")))
}

#[delete("/tasks/{id}")]
pub async fn delete_task_by_id(
    api: web::Data<TaskApi>,
    id: web::Path<i32>,
) -> Result<HttpResponse, ApiError> {
    let task = api.delete_task(id.into_inner()).await?;
    tracing::info!(task_id = task.id, "task deleted");
    Ok(HttpResponse::Ok().json(Envelope::data(task).with_message("Task deleted successfully")))
}

#[get("/stats")]
pub async fn get_stats(api: web::Data<TaskApi>) -> Result<HttpResponse, ApiError> {
    let stats = api.stats().await?;
    Ok(HttpResponse::Ok().json(Envelope::data(stats)))
}
