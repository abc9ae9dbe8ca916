pub mod config;
mod http_layers;
mod job_routes;
pub mod metrics;
mod notify_routes;
pub mod server;
pub mod state;

pub use config::ServerConfig;
pub use http_layers::*;
pub use notify_routes::{ErrorResponse, NotifyResponse};
pub use server::{make_app, run_server};
