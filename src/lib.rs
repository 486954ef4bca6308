pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod middleware;
pub mod models;
pub mod repository;
pub mod server;
pub mod telemetry;
