pub mod database;
pub mod memory;
pub mod schema;
pub mod store;
