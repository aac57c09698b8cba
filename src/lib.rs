//! Rowboat: schema-declared CRUD REST services over SQLite.
//!
//! Two applications share the engine: [`App::Blog`] (users, posts) and
//! [`App::Library`] (users, authors, books, borrows). Each embeds a JSON schema
//! declaration under `schemas/` that drives table creation, validation and routing.

pub mod app;
pub mod config;
pub mod error;
pub mod handlers;
pub mod migration;
pub mod response;
pub mod routes;
pub mod service;
pub mod settings;
pub mod sql;
pub mod state;
pub mod store;

pub use app::App;
pub use config::{parse_config, resolve, FullConfig, ResolvedEntity, ResolvedModel};
pub use error::{AppError, ConfigError};
pub use migration::apply_migrations;
pub use routes::{common_routes, entity_routes, library_routes};
pub use service::CrudService;
pub use settings::ServerSettings;
pub use state::AppState;
pub use store::{connect, ensure_sys_tables, record_schema, SchemaStatus};
