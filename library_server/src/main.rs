//! Library API server: users, authors, books and borrows.
//!
//! Run from repo root: `cargo run -p library-server`

use rowboat::App;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("rowboat=info,tower_http=debug")),
        )
        .init();

    let settings = App::Library.settings_from_env()?;
    tracing::info!(database_url = %settings.database_url, "starting library server");
    App::Library.serve(settings).await?;
    Ok(())
}
