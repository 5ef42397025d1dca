use askama::Template;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Form, Router,
};
use serde::Deserialize;

use crate::api::middleware::session::AppState;
use crate::models::{pass_log::ClientInfo, student::Student};
use crate::services::pass_issuer::{self, PassIssueError};

#[derive(Template)]
#[template(path = "home.html")]
struct HomeTemplate {
    event_name: String,
    event_date: String,
    error: Option<&'static str>,
    name: String,
    class: String,
}

#[derive(Template)]
#[template(path = "pass.html")]
struct PassTemplate {
    student: Student,
    event_name: String,
    event_date: String,
    verify_url: String,
    qr_svg: String,
    qr_png_data_url: String,
    download_name: String,
}

#[derive(Deserialize)]
struct PassRequestForm {
    name: String,
    class: String,
}

fn download_name(student_name: &str) -> String {
    format!(
        "entry-pass-{}.png",
        student_name.split_whitespace().collect::<Vec<_>>().join("-")
    )
}

/// Landing page with the pass lookup form
async fn home(State(state): State<AppState>) -> HomeTemplate {
    HomeTemplate {
        event_name: state.config.event_name.clone(),
        event_date: state.config.event_date.clone(),
        error: None,
        name: String::new(),
        class: String::new(),
    }
}

/// Looks the student up and renders their pass card
async fn generate_pass(
    State(state): State<AppState>,
    client: ClientInfo,
    Form(form): Form<PassRequestForm>,
) -> Response {
    match pass_issuer::issue_pass(
        &state.directory,
        &state.signer,
        &form.name,
        &form.class,
        &client,
    )
    .await
    {
        Ok(issued) => PassTemplate {
            download_name: download_name(&issued.student.name),
            student: issued.student,
            event_name: state.config.event_name.clone(),
            event_date: state.config.event_date.clone(),
            verify_url: issued.pass.url,
            qr_svg: issued.qr_svg,
            qr_png_data_url: issued.qr_png_data_url,
        }
        .into_response(),
        Err(e) => {
            let status = match e {
                PassIssueError::MissingFields => StatusCode::BAD_REQUEST,
                PassIssueError::StudentNotFound => StatusCode::NOT_FOUND,
                PassIssueError::Directory(_) | PassIssueError::QrGeneration(_) => {
                    tracing::error!(error = %e, "Pass generation failed");
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            };

            (
                status,
                HomeTemplate {
                    event_name: state.config.event_name.clone(),
                    event_date: state.config.event_date.clone(),
                    error: Some(e.user_message()),
                    name: form.name,
                    class: form.class,
                },
            )
                .into_response()
        }
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(home))
        .route("/pass", post(generate_pass))
}
