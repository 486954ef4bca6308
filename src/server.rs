use std::net::SocketAddr;
use std::sync::Arc;

use actix_web::dev::Server;
use actix_web::middleware::{from_fn, Logger};
use actix_web::{web, App, HttpServer};

use crate::api::{self, health, tasks::TaskApi};
use crate::config::{Settings, StoreBackend};
use crate::error::StoreError;
use crate::middleware::cors::cors;
use crate::middleware::rate_limit::{self, RateLimit};
use crate::middleware::{security_headers, COMBINED_LOG_FORMAT};
use crate::repository::database::Database;
use crate::repository::memory::MemoryStore;
use crate::repository::store::TaskStore;

/// Opens the configured store. Postgres gets its pending migrations applied first.
pub fn build_store(settings: &Settings) -> Result<Arc<dyn TaskStore>, StoreError> {
    match settings.backend {
        StoreBackend::Postgres => {
            let db = Database::connect(&settings.database)?;
            let applied = db.run_migrations()?;
            tracing::info!(applied, "database migrations are up to date");
            Ok(Arc::new(db))
        }
        StoreBackend::Memory => {
            tracing::warn!("using the in-memory task store; tasks are lost on shutdown");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

/// Binds the HTTP server with the full middleware stack. The returned server
/// must be awaited (or spawned) to start accepting requests; it stops on
/// SIGINT/SIGTERM after draining in-flight requests.
pub fn serve(
    settings: &Settings,
    store: Arc<dyn TaskStore>,
) -> std::io::Result<(Server, Vec<SocketAddr>)> {
    let task_api = web::Data::new(TaskApi::new(store, settings.environment));
    let limiter = web::Data::new(RateLimit::new(&settings.rate_limit));
    let app_settings = settings.clone();

    let server = HttpServer::new(move || {
        App::new()
            .app_data(task_api.clone())
            .app_data(limiter.clone())
            .configure(api::config)
            .service(health::healthcheck)
            .default_service(web::route().to(api::not_found))
            .wrap(from_fn(rate_limit::enforce))
            .wrap(cors(&app_settings))
            .wrap(security_headers())
            .wrap(Logger::new(COMBINED_LOG_FORMAT))
    })
    .bind((settings.host.as_str(), settings.port))?;

    let addrs = server.addrs();
    Ok((server.run(), addrs))
}
