//! Shared fixtures: a PostgREST directory pointed at a wiremock server.

use axum::Router;
use secrecy::Secret;
use serde_json::{json, Value};
use tower_sessions::MemoryStore;
use uuid::Uuid;
use wiremock::MockServer;

use crate::api::{self, middleware::session::{configure_session_layer, AppState}};
use crate::config::Config;
use crate::db::{rest::RestDirectory, Directory};
use crate::services::pass_signer::PassSigner;

pub const TEST_SERVICE_KEY: &str = "test-service-key";
pub const TEST_PASS_SECRET: &str = "test-pass-secret";
pub const TEST_VERIFY_URL: &str = "https://passes.example.edu/verify";

pub fn mock_directory(server: &MockServer) -> Directory {
    Directory::Rest(
        RestDirectory::new(&server.uri(), Secret::new(TEST_SERVICE_KEY.to_string()))
            .expect("client builds"),
    )
}

pub fn test_signer() -> PassSigner {
    PassSigner::new(Secret::new(TEST_PASS_SECRET.to_string()), TEST_VERIFY_URL)
        .expect("valid verify url")
}

pub fn student_json(id: Uuid, name: &str, class: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "class": class,
        "created_at": "2025-09-01T10:00:00+00:00"
    })
}

pub fn test_config(server: &MockServer) -> Config {
    let source = config::Config::builder()
        .set_override("supabase_url", server.uri())
        .and_then(|b| b.set_override("supabase_service_key", TEST_SERVICE_KEY))
        .and_then(|b| b.set_override("pass_secret", TEST_PASS_SECRET))
        .and_then(|b| b.set_override("verify_url", TEST_VERIFY_URL))
        .and_then(|b| b.build())
        .expect("test config builds");

    Config::from_source(&source).expect("test config is complete")
}

/// Full application router backed by the mock directory and an in-memory session store
pub fn test_app(server: &MockServer) -> Router {
    let state = AppState {
        directory: mock_directory(server),
        signer: test_signer(),
        config: test_config(server),
    };

    api::router()
        .layer(configure_session_layer(MemoryStore::default(), false))
        .with_state(state)
}
