use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use fieldline_api::auth::TokenCodec;
use fieldline_api::database::{seed, DatabaseManager, MemoryStore, PgStore, TenantStore, UserStore};
use fieldline_api::state::AppState;

#[derive(Parser)]
#[command(name = "fieldline-api")]
#[command(about = "Fieldline API - multi-tenant field-service backend")]
#[command(version)]
struct Args {
    #[arg(long, help = "Port to listen on (overrides PORT / FIELDLINE_API_PORT)")]
    port: Option<u16>,

    #[arg(long, help = "Address to bind (overrides BIND_ADDRESS)")]
    bind: Option<String>,

    #[arg(long, help = "Use in-process storage instead of Postgres")]
    memory: bool,

    #[arg(long, help = "Seed the 'acme' demo organization and admin user")]
    seed_demo: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, SECURITY_JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug")))
        .init();

    let args = Args::parse();
    let config = fieldline_api::config::config();
    tracing::info!("Starting Fieldline API in {:?} mode", config.environment);

    // Refuse to start with a weak or missing signing key
    let tokens = TokenCodec::from_config(&config.security).context("invalid SECURITY_JWT_SECRET / SECURITY_JWT_TTL_MS")?;

    let (tenants, users): (Arc<dyn TenantStore>, Arc<dyn UserStore>) = if args.memory {
        tracing::warn!("Using in-memory storage; data is lost on exit");
        let store = MemoryStore::new();
        (Arc::new(store.clone()), Arc::new(store))
    } else {
        let pool = DatabaseManager::connect(&config.database)
            .await
            .context("failed to connect to database")?;
        let store = PgStore::new(pool);
        (Arc::new(store.clone()), Arc::new(store))
    };

    if args.seed_demo {
        if fieldline_api::is_production!() {
            anyhow::bail!("--seed-demo creates a known admin password and is refused in production");
        }
        seed::seed_demo(tenants.as_ref(), users.as_ref(), config.security.bcrypt_cost)
            .await
            .context("failed to seed demo organization")?;
    }

    let state = AppState::new(tokens, tenants, users, config.security.bcrypt_cost);
    let app = fieldline_api::app(state).layer(fieldline_api::cors_layer(&config.security));

    let bind_addr = format!(
        "{}:{}",
        args.bind.as_deref().unwrap_or(&config.server.bind_address),
        args.port.unwrap_or(config.server.port)
    );
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("Fieldline API listening on http://{}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
}
