use actix_cors::Cors;
use actix_web::http::{header, Method};

use crate::config::{Environment, Settings};

/// Production only admits the configured origins; every other mode reflects
/// the caller's origin. Credentials are allowed in both.
pub fn cors(settings: &Settings) -> Cors {
    let cors = Cors::default()
        .allowed_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allowed_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
        .supports_credentials()
        .max_age(3600_usize);

    match settings.environment {
        Environment::Production => settings
            .cors_origins
            .iter()
            .fold(cors, |cors, origin| cors.allowed_origin(origin)),
        Environment::Development | Environment::Test => cors.allow_any_origin(),
    }
}
