use sqlx::PgPool;
use tower_sessions::{Expiry, SessionManagerLayer, SessionStore};
use tower_sessions_sqlx_store::PostgresStore;

use crate::db::Directory;
use crate::services::pass_signer::PassSigner;

/// Session keys used in the application
pub const SESSION_KEY_ADMIN_ID: &str = "admin_id";
pub const SESSION_KEY_FLASH: &str = "flash";

/// Applies the cookie policy shared by every session store
pub fn configure_session_layer<Store: SessionStore>(
    store: Store,
    secure: bool,
) -> SessionManagerLayer<Store> {
    SessionManagerLayer::new(store)
        .with_secure(secure)
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(time::Duration::hours(12)))
}

/// Creates a session layer persisted in the Postgres directory
pub async fn create_postgres_session_layer(
    pool: PgPool,
    secure: bool,
) -> Result<SessionManagerLayer<PostgresStore>, sqlx::Error> {
    let session_store = PostgresStore::new(pool);
    session_store.migrate().await?;

    Ok(configure_session_layer(session_store, secure))
}

/// Application state shared by all handlers
#[derive(Clone)]
pub struct AppState {
    pub directory: Directory,
    pub signer: PassSigner,
    pub config: crate::config::Config,
}
