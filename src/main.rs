use axum::Router;
use secrecy::ExposeSecret;
use tower_http::trace::TraceLayer;
use tower_sessions::{MemoryStore, SessionManagerLayer, SessionStore};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use entrypass::api::{
    self,
    middleware::session::{configure_session_layer, create_postgres_session_layer, AppState},
};
use entrypass::config::{AdminSeed, Config, DirectorySettings};
use entrypass::db::{self, rest::RestDirectory, Directory};
use entrypass::models::Admin;
use entrypass::services::{pass_signer::PassSigner, password};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "entrypass=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting entry pass server...");

    let config = Config::from_env()?;
    tracing::info!("Configuration loaded successfully");

    let signer = PassSigner::new(config.pass_secret.clone(), &config.verify_url)?;
    tracing::info!(verify_url = %signer.verify_url(), "Pass signer ready");

    let secure = config.secure_cookies();

    let app = match &config.directory {
        DirectorySettings::Postgres { database_url } => {
            let pool = db::create_pool(database_url.expose_secret()).await?;
            tracing::info!("Database pool created");

            db::run_migrations(&pool).await?;
            tracing::info!("Database migrations completed");

            if let Some(seed) = &config.admin_seed {
                seed_admin(&pool, seed).await?;
            }

            let session_layer = create_postgres_session_layer(pool.clone(), secure).await?;
            let state = AppState {
                directory: Directory::Postgres(pool),
                signer,
                config: config.clone(),
            };
            build_app(state, session_layer)
        }
        DirectorySettings::Rest { url, service_key } => {
            let directory = RestDirectory::new(url, service_key.clone())?;
            tracing::info!(url = %url, "Using hosted student directory");

            if config.admin_seed.is_some() {
                tracing::warn!("ADMIN_EMAIL is ignored with a hosted directory; manage admins there");
            }

            let session_layer = configure_session_layer(MemoryStore::default(), secure);
            let state = AppState {
                directory: Directory::Rest(directory),
                signer,
                config: config.clone(),
            };
            build_app(state, session_layer)
        }
    };

    let listener = tokio::net::TcpListener::bind((config.host.as_str(), config.port)).await?;
    tracing::info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn build_app<Store: SessionStore + Clone>(
    state: AppState,
    session_layer: SessionManagerLayer<Store>,
) -> Router {
    api::router()
        .layer(session_layer)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Creates the configured admin or resets its password
async fn seed_admin(pool: &sqlx::PgPool, seed: &AdminSeed) -> anyhow::Result<()> {
    let hash = password::hash_password(seed.password.expose_secret())?;
    let admin = Admin::upsert(pool, &seed.email, &hash).await?;
    tracing::info!(admin_id = %admin.id, email = %admin.email, "Admin account seeded");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
        tracing::info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                tracing::info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
