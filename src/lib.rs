pub mod admin_handlers;
pub mod auth;
pub mod config;
pub mod database;
pub mod errors;
pub mod gateway;
pub mod handlers;
pub mod metrics;
pub mod models;
pub mod services;
pub mod store;

pub use config::Config;
pub use errors::{BrokerageError, Result};
