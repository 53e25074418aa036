use std::sync::Arc;

use anyhow::Context;
use songs_backend::{
    app,
    db::{Database, SongStore},
    secrets::SecretManager,
    seed::{apply_seed, load_seed},
    state::AppState,
};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "songs_backend=debug,tower_http=info".into()),
        )
        .with_target(false)
        .init();

    if let Err(e) = run().await {
        error!("❌ {:#}", e);
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> anyhow::Result<()> {
    let secrets = SecretManager::from_env().context("Invalid configuration")?;
    info!("Connecting to {}", secrets.redacted_mongodb_url());

    let database = Database::new(&secrets)
        .await
        .context("Failed to connect to MongoDB")?;
    info!("📊 Connected to MongoDB database {}", secrets.database);

    let songs = load_seed(&secrets.seed_file)
        .await
        .context("Failed to load seed dataset")?;
    info!(
        "Seeding {} songs from {} (mode: {})",
        songs.len(),
        secrets.seed_file.display(),
        secrets.seed_mode
    );
    apply_seed(&database, secrets.seed_mode, songs)
        .await
        .context("Failed to seed songs collection")?;
    database.ensure_unique_index().await;

    let store: Arc<dyn SongStore> = Arc::new(database);
    info!("📊 {} songs stored", store.count().await?);

    let state = AppState::new(store, secrets.conflict_status);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", secrets.port))
        .await
        .with_context(|| format!("Failed to bind port {}", secrets.port))?;

    info!("🎧 Songs backend listening on {}", listener.local_addr()?);
    axum::serve(listener, app(state)).await?;
    Ok(())
}
