use askama::Template;
use axum::{
    extract::{Query, State},
    http::{header, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tower_http::cors::{Any, CorsLayer};

use crate::api::middleware::session::AppState;
use crate::models::pass_log::ClientInfo;
use crate::services::pass_verifier::{self, VerificationOutcome, VerifyParams};

#[derive(Template)]
#[template(path = "verify/success.html")]
struct VerifiedTemplate {
    student_name: String,
    student_class: String,
    event_name: String,
    event_date: String,
    verified_at: String,
}

#[derive(Template)]
#[template(path = "verify/failure.html")]
struct VerificationFailedTemplate {
    message: &'static str,
}

/// Verifies a scanned pass and renders the result page.
///
/// Every failure is a 400 with a human-readable page; there is no retry.
async fn verify(
    State(state): State<AppState>,
    Query(params): Query<VerifyParams>,
    client: ClientInfo,
) -> Response {
    let outcome =
        pass_verifier::verify_pass(&state.directory, &state.signer, &params, &client).await;

    tracing::info!(result = outcome.result_type(), "Verification request handled");

    match outcome {
        VerificationOutcome::Verified { student } => VerifiedTemplate {
            student_name: student.name,
            student_class: student.class,
            event_name: state.config.event_name.clone(),
            event_date: state.config.event_date.clone(),
            verified_at: chrono::Local::now()
                .format("%d %b %Y, %H:%M:%S")
                .to_string(),
        }
        .into_response(),
        other => (
            StatusCode::BAD_REQUEST,
            VerificationFailedTemplate {
                message: other.message(),
            },
        )
            .into_response(),
    }
}

/// CORS preflight; the layer fills in the headers
async fn preflight() -> StatusCode {
    StatusCode::OK
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/verify", get(verify).options(preflight))
        .layer(cors_layer())
}
