use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use visa_intake_api::config;
use visa_intake_api::database::DatabaseManager;
use visa_intake_api::services::accounts::{self, BootstrapError};
use visa_intake_api::storage::LocalStorage;
use visa_intake_api::{app, is_production, AppState};

#[derive(Parser, Debug)]
#[command(name = "visa-intake-api", version, about = "Visa intake back office API server")]
struct Args {
    /// Port to listen on (defaults to API_PORT / PORT, then 8000)
    #[arg(short, long)]
    port: Option<u16>,

    /// Directory for uploaded files (defaults to UPLOAD_DIR)
    #[arg(long)]
    upload_dir: Option<PathBuf>,

    /// Do not apply pending migrations at startup
    #[arg(long)]
    skip_migrations: bool,

    /// Create this admin account at startup if missing (password from ADMIN_PASSWORD)
    #[arg(long)]
    admin_email: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, SECURITY_JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let mut config = config::config().clone();
    if let Some(port) = args.port {
        config.api.port = port;
    }
    if let Some(upload_dir) = args.upload_dir {
        config.storage.upload_dir = upload_dir;
    }
    if let Some(admin_email) = args.admin_email {
        config.bootstrap.admin_email = Some(admin_email);
    }
    tracing::info!("Starting Visa Intake API in {:?} mode", config.environment);

    if config.security.jwt_secret.is_empty() {
        if is_production!() {
            bail!("SECURITY_JWT_SECRET must be set in production");
        }
        tracing::warn!("No JWT secret configured; every login and token check will fail");
    }

    let pool = DatabaseManager::connect_lazy(&config.database).context("invalid database configuration")?;

    if args.skip_migrations {
        tracing::info!("Skipping database migrations");
    } else if let Err(e) = DatabaseManager::run_migrations(&pool).await {
        // Keep serving; /health reports the database state
        tracing::error!("Database migrations failed: {}", e);
    }

    match accounts::ensure_admin(&pool, &config.bootstrap, &config.security).await {
        Ok(_) => {}
        Err(BootstrapError::Database(e)) => tracing::error!("Admin bootstrap skipped: {}", e),
        Err(e) => return Err(e).context("invalid admin bootstrap settings"),
    }

    let storage = LocalStorage::new(&config.storage.upload_dir)
        .await
        .with_context(|| format!("cannot create upload directory {}", config.storage.upload_dir.display()))?;
    tracing::info!(upload_dir = %config.storage.upload_dir.display(), "File storage ready");

    let bind_addr = format!("0.0.0.0:{}", config.api.port);
    let state = AppState::new(pool, Arc::new(storage), config);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;
    tracing::info!("Visa Intake API listening on http://{}", bind_addr);

    axum::serve(listener, app(state)).await.context("server error")?;
    Ok(())
}
