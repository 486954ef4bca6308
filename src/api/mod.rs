use actix_web::{web, HttpRequest, HttpResponse};

use crate::error::{json_error_handler, path_error_handler, query_error_handler};
use crate::models::envelope::RouteNotFound;

pub mod health;
pub mod tasks;

/// Request bodies above this size are rejected.
pub const JSON_LIMIT: usize = 10 * 1024 * 1024;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .app_data(
                web::JsonConfig::default()
                    .limit(JSON_LIMIT)
                    .error_handler(json_error_handler),
            )
            .app_data(web::PathConfig::default().error_handler(path_error_handler))
            .app_data(web::QueryConfig::default().error_handler(query_error_handler))
            .service(tasks::get_tasks)
            .service(tasks::create_task)
            .service(tasks::get_task_by_id)
            .service(tasks::update_task_by_id)
            .service(tasks::delete_task_by_id)
            .service(tasks::get_stats),
    );
}

pub async fn not_found(req: HttpRequest) -> HttpResponse {
    HttpResponse::NotFound().json(RouteNotFound {
        success: false,
        error: "Endpoint not found".to_string(),
        path: req.uri().to_string(),
        method: req.method().to_string(),
    })
}
