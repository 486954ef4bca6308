use actix_web::{get, web, HttpResponse};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::tasks::TaskApi;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct HealthReport {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub database: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[get("/health")]
pub async fn healthcheck(api: web::Data<TaskApi>) -> HttpResponse {
    match api.ping().await {
        Ok(()) => HttpResponse::Ok().json(HealthReport {
            status: "healthy".to_string(),
            timestamp: Utc::now(),
            database: "connected".to_string(),
            error: None,
        }),
        Err(err) => {
            tracing::warn!(error = %err, "health check could not reach the task store");
            HttpResponse::ServiceUnavailable().json(HealthReport {
                status: "unhealthy".to_string(),
                timestamp: Utc::now(),
                database: "disconnected".to_string(),
                error: Some(err.to_string()),
            })
        }
    }
}
