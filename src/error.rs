use actix_web::error::{BlockingError, JsonPayloadError, PathError, QueryPayloadError};
use actix_web::http::StatusCode;
use actix_web::{HttpRequest, HttpResponse, ResponseError};

use crate::config::Environment;
use crate::models::envelope::Envelope;

const INTERNAL_ERROR: &str = "Internal server error";
const GENERIC_DETAIL: &str = "Something went wrong";

/// Failures below the API layer.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to check out a database connection: {0}")]
    Pool(#[from] diesel::r2d2::PoolError),
    #[error("database query failed: {0}")]
    Query(#[from] diesel::result::Error),
    #[error("database migration failed: {0}")]
    Migration(String),
    #[error("task store lock poisoned")]
    Poisoned,
    #[error("store call did not complete: {0}")]
    Blocking(#[from] BlockingError),
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("Task not found")]
    NotFound,
    #[error("internal server error: {detail}")]
    Internal { detail: String, expose: bool },
}

impl ApiError {
    /// Logs a store fault and hides its detail unless running in development.
    pub fn internal(err: StoreError, environment: Environment) -> Self {
        tracing::error!(error = %err, "task store operation failed");
        ApiError::Internal {
            detail: err.to_string(),
            expose: environment.is_development(),
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            ApiError::Validation(message) => Envelope::failure(message.as_str()),
            ApiError::NotFound => Envelope::failure("Task not found"),
            ApiError::Internal { detail, expose } => {
                let message = if *expose { detail.as_str() } else { GENERIC_DETAIL };
                Envelope::failure(INTERNAL_ERROR).with_message(message)
            }
        };
        HttpResponse::build(self.status_code()).json(body)
    }
}

pub fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    ApiError::Validation(format!("Invalid request body: {err}")).into()
}

pub fn path_error_handler(err: PathError, _req: &HttpRequest) -> actix_web::Error {
    tracing::debug!(error = %err, "rejected path parameter");
    ApiError::Validation("Invalid task id".to_string()).into()
}

pub fn query_error_handler(err: QueryPayloadError, _req: &HttpRequest) -> actix_web::Error {
    ApiError::Validation(format!("Invalid query string: {err}")).into()
}
