pub mod alerts;
pub mod analytics;
pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod security;
pub mod services;
pub mod utils;

// Re-export main components for easier use
pub use api::{build_router, AppState, RestApi};
pub use config::{load_config, Config};
pub use error::Error;
