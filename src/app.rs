//! The two applications served by this crate and their bootstrap.

use crate::config::{parse_config, resolve, FullConfig};
use crate::error::{AppError, ConfigError};
use crate::migration::apply_migrations;
use crate::routes::{common_routes, entity_routes, library_routes};
use crate::settings::ServerSettings;
use crate::state::AppState;
use crate::store::{connect, ensure_sys_tables, record_schema};
use axum::Router;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

const BODY_LIMIT_BYTES: usize = 1024 * 1024;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum App {
    /// Users and posts.
    Blog,
    /// Users, authors, books and borrow records.
    Library,
}

impl App {
    pub fn name(self) -> &'static str {
        match self {
            App::Blog => "blog",
            App::Library => "library",
        }
    }

    fn env_prefix(self) -> &'static str {
        match self {
            App::Blog => "BLOG",
            App::Library => "LIBRARY",
        }
    }

    fn default_bind_addr(self) -> &'static str {
        match self {
            App::Blog => "127.0.0.1:5000",
            App::Library => "127.0.0.1:5001",
        }
    }

    fn default_database_url(self) -> &'static str {
        match self {
            App::Blog => "sqlite://app.db",
            App::Library => "sqlite://library.db",
        }
    }

    /// Library collections also answer with a trailing slash ("/users/").
    fn trailing_slash(self) -> bool {
        matches!(self, App::Library)
    }

    fn schema_source(self) -> &'static str {
        match self {
            App::Blog => include_str!("../schemas/blog.json"),
            App::Library => include_str!("../schemas/library.json"),
        }
    }

    pub fn config(self) -> Result<FullConfig, ConfigError> {
        parse_config(self.schema_source())
    }

    pub fn settings_from_env(self) -> Result<ServerSettings, ConfigError> {
        ServerSettings::from_env(self.env_prefix(), self.default_bind_addr(), self.default_database_url())
    }

    /// Open the database, create missing tables and resolve the model.
    pub async fn bootstrap(self, settings: &ServerSettings) -> Result<AppState, AppError> {
        let config = self.config()?;
        let model = resolve(&config)?;
        let pool = connect(&settings.database_url, settings.max_connections).await?;
        ensure_sys_tables(&pool).await?;
        apply_migrations(&pool, &config).await?;
        let status = record_schema(&pool, self.name(), &config).await?;
        tracing::info!(app = self.name(), entities = model.entities.len(), schema = ?status, "bootstrap complete");
        Ok(AppState {
            pool,
            model: Arc::new(model),
        })
    }

    pub fn router(self, state: AppState) -> Router {
        let mut router = common_routes(state.clone()).merge(entity_routes(state.clone(), self.trailing_slash()));
        if self == App::Library {
            router = router.merge(library_routes(state));
        }
        router.layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(RequestBodyLimitLayer::new(BODY_LIMIT_BYTES)),
        )
    }

    /// Bootstrap and serve until ctrl-c.
    pub async fn serve(self, settings: ServerSettings) -> Result<(), AppError> {
        let state = self.bootstrap(&settings).await?;
        let app = self.router(state);
        let listener = TcpListener::bind(settings.bind_addr).await?;
        tracing::info!("{} listening on http://{}", self.name(), listener.local_addr()?);
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_schemas_resolve() {
        for app in [App::Blog, App::Library] {
            let config = app.config().unwrap();
            resolve(&config).unwrap();
            crate::migration::migration_statements(&config).unwrap();
        }
    }

    #[test]
    fn library_declares_every_resource() {
        let model = resolve(&App::Library.config().unwrap()).unwrap();
        for segment in ["users", "authors", "books", "borrow"] {
            assert!(model.entity_by_path(segment).is_some(), "{}", segment);
        }
        let users = model.entity_by_path("users").unwrap();
        assert_eq!(users.unique_checks, vec!["email".to_string()]);
    }

    #[test]
    fn blog_posts_keep_their_author() {
        let model = resolve(&App::Blog.config().unwrap()).unwrap();
        let posts = model.entity_by_path("posts").unwrap();
        assert!(posts.immutable_columns.contains("user_id"));
        assert!(model.entity_by_path("users").unwrap().unique_checks.is_empty());
    }
}
