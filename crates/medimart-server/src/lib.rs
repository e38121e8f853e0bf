pub mod blog_generator;
pub mod bootstrap;
pub mod config;
pub mod config_watch;
pub mod handlers;
pub mod locks;
pub mod metrics;
pub mod middleware;
pub mod notifier;
pub mod observability;
pub mod routes;
pub mod server;

pub use blog_generator::{BlogGenerator, GeneratedPost, GeneratorError};
pub use config::{AppConfig, StorageBackend};
pub use observability::init_tracing;
pub use server::{AppState, MedimartServer, ServerBuilder, build_app, build_state, router};
