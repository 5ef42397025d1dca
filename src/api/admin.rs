use std::collections::HashSet;

use askama::Template;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Router,
};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use uuid::Uuid;

use crate::api::middleware::{
    auth::{require_admin, AuthError},
    session::{AppState, SESSION_KEY_ADMIN_ID, SESSION_KEY_FLASH},
};
use crate::db::DirectoryError;
use crate::error::Result;
use crate::models::{
    pass_log::{ClientInfo, CreatePassLogData, PassAction, PassLog},
    revoked_pass::CreateRevokedPassData,
    student::{CreateStudentData, Student},
};

const RECENT_ACTIVITY_LIMIT: i64 = 50;

/// One-shot message shown on the next dashboard render
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Flash {
    success: bool,
    message: String,
}

impl Flash {
    fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }

    fn css_class(&self) -> &'static str {
        if self.success {
            "alert-success"
        } else {
            "alert-error"
        }
    }
}

struct StudentRow {
    student: Student,
    revoked: bool,
}

struct DashboardStats {
    total_students: usize,
    passes_generated: usize,
    passes_verified: usize,
}

impl DashboardStats {
    /// Pass counts cover the recent activity window only
    fn compute(students: &[StudentRow], logs: &[PassLog]) -> Self {
        let count = |action: PassAction| logs.iter().filter(|l| l.action_type == action).count();

        Self {
            total_students: students.len(),
            passes_generated: count(PassAction::Generated),
            passes_verified: count(PassAction::Verified),
        }
    }
}

#[derive(Template)]
#[template(path = "admin/login.html")]
struct LoginTemplate {
    error: Option<&'static str>,
    email: String,
}

#[derive(Template)]
#[template(path = "admin/dashboard.html")]
struct DashboardTemplate {
    students: Vec<StudentRow>,
    logs: Vec<PassLog>,
    stats: DashboardStats,
    flash: Option<Flash>,
}

#[derive(Deserialize)]
struct LoginForm {
    email: String,
    password: String,
}

#[derive(Deserialize)]
struct AddStudentForm {
    name: String,
    class: String,
}

#[derive(Deserialize)]
struct RevokeForm {
    student_id: Uuid,
    reason: Option<String>,
}

/// Dashboard for signed-in admins, login form for everyone else
async fn dashboard(State(state): State<AppState>, session: Session) -> Result<Response> {
    match require_admin(&session, &state.directory).await {
        Ok(_) => {}
        Err(AuthError::Unauthorized) => {
            return Ok(LoginTemplate {
                error: None,
                email: String::new(),
            }
            .into_response())
        }
        Err(e) => return Err(e.into()),
    }

    let flash: Option<Flash> = session.remove(SESSION_KEY_FLASH).await?;

    let revoked: HashSet<Uuid> = state
        .directory
        .list_revoked()
        .await?
        .into_iter()
        .map(|r| r.student_id)
        .collect();

    let students: Vec<StudentRow> = state
        .directory
        .list_students()
        .await?
        .into_iter()
        .map(|student| StudentRow {
            revoked: revoked.contains(&student.id),
            student,
        })
        .collect();

    let logs = state.directory.recent_logs(RECENT_ACTIVITY_LIMIT).await?;
    let stats = DashboardStats::compute(&students, &logs);

    Ok(DashboardTemplate {
        students,
        logs,
        stats,
        flash,
    }
    .into_response())
}

async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Result<Response> {
    let email = form.email.trim();

    match state
        .directory
        .authenticate_admin(email, &form.password)
        .await?
    {
        Some(admin_id) => {
            session.cycle_id().await?;
            session.insert(SESSION_KEY_ADMIN_ID, admin_id).await?;

            tracing::info!(admin_id = %admin_id, "Admin signed in");
            Ok(Redirect::to("/admin").into_response())
        }
        None => Ok((
            StatusCode::UNAUTHORIZED,
            LoginTemplate {
                error: Some("Invalid credentials or not an admin"),
                email: email.to_string(),
            },
        )
            .into_response()),
    }
}

async fn logout(session: Session) -> Result<Redirect> {
    session.flush().await?;
    Ok(Redirect::to("/"))
}

async fn add_student(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<AddStudentForm>,
) -> Result<Redirect> {
    let admin = require_admin(&session, &state.directory).await?;

    let flash = match CreateStudentData::new(&form.name, &form.class) {
        None => Flash::error("Student name and class are required"),
        Some(data) => match state.directory.create_student(&data).await {
            Ok(student) => {
                tracing::info!(
                    admin_id = %admin.admin_id,
                    student_id = %student.id,
                    "Student registered"
                );
                Flash::success(format!("Student {} added successfully!", student.name))
            }
            Err(DirectoryError::Duplicate) => {
                Flash::error("Student with this name and class already exists")
            }
            Err(e) => return Err(e.into()),
        },
    };

    session.insert(SESSION_KEY_FLASH, flash).await?;
    Ok(Redirect::to("/admin"))
}

async fn revoke_pass(
    State(state): State<AppState>,
    session: Session,
    client: ClientInfo,
    Form(form): Form<RevokeForm>,
) -> Result<Redirect> {
    let admin = require_admin(&session, &state.directory).await?;

    let student = state.directory.find_student(form.student_id).await?;
    let already_revoked = match &student {
        Some(student) => state.directory.is_revoked(student.id).await?,
        None => false,
    };

    let flash = match student {
        None => Flash::error("Student not found"),
        Some(student) if already_revoked => {
            Flash::error(format!("The pass for {} is already revoked", student.name))
        }
        Some(student) => {
            let reason = form
                .reason
                .map(|r| r.trim().to_string())
                .filter(|r| !r.is_empty());

            state
                .directory
                .revoke_pass(&CreateRevokedPassData {
                    student_id: student.id,
                    reason,
                    revoked_by: Some(admin.admin_id.to_string()),
                })
                .await?;

            state
                .directory
                .append_log(&CreatePassLogData::new(
                    student.id,
                    PassAction::Revoked,
                    &client,
                ))
                .await?;

            tracing::info!(
                admin_id = %admin.admin_id,
                student_id = %student.id,
                "Pass revoked"
            );
            Flash::success(format!("The pass for {} has been revoked", student.name))
        }
    };

    session.insert(SESSION_KEY_FLASH, flash).await?;
    Ok(Redirect::to("/admin"))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/admin", get(dashboard))
        .route("/admin/login", post(login))
        .route("/admin/logout", post(logout))
        .route("/admin/students", post(add_student))
        .route("/admin/revocations", post(revoke_pass))
}

#[cfg(test)]
mod tests {
    use crate::test_support::{student_json, test_app};
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use axum::Router;
    use serde_json::json;
    use tower::ServiceExt;
    use uuid::Uuid;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn form(uri: &str, body: &str, cookie: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    async fn body_text(response: axum::response::Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    async fn mount_admin_login(server: &MockServer, admin_id: Uuid) {
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "jwt",
                "user": { "id": admin_id }
            })))
            .mount(server)
            .await;
    }

    /// Signs in and returns the session cookie
    async fn sign_in(app: &Router) -> String {
        let response = app
            .clone()
            .oneshot(form(
                "/admin/login",
                "email=admin%40example.edu&password=secret",
                None,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let set_cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
        set_cookie.split(';').next().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_dashboard_without_session_shows_login() {
        let server = MockServer::start().await;
        let request = Request::builder().uri("/admin").body(Body::empty()).unwrap();

        let response = test_app(&server).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains(r#"action="/admin/login""#));
    }

    #[tokio::test]
    async fn test_add_student_requires_session() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/rest/v1/students"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!([])))
            .expect(0)
            .mount(&server)
            .await;

        let response = test_app(&server)
            .oneshot(form("/admin/students", "name=Asha+Rao&class=BSC+MATH+III", None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_login_rejected_for_non_admin() {
        let server = MockServer::start().await;
        mount_admin_login(&server, Uuid::new_v4()).await;

        Mock::given(method("GET"))
            .and(path("/rest/v1/admins"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let response = test_app(&server)
            .oneshot(form(
                "/admin/login",
                "email=student%40example.edu&password=secret",
                None,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(body_text(response)
            .await
            .contains("Invalid credentials or not an admin"));
    }

    #[tokio::test]
    async fn test_admin_adds_student_after_authoritative_check() {
        let server = MockServer::start().await;
        let admin_id = Uuid::new_v4();
        mount_admin_login(&server, admin_id).await;

        // Once at sign-in, once before the insert
        Mock::given(method("GET"))
            .and(path("/rest/v1/admins"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": Uuid::new_v4() }])))
            .expect(2)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/rest/v1/students"))
            .and(body_partial_json(json!({ "name": "Asha Rao", "class": "BSC MATH III" })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!([student_json(
                Uuid::new_v4(),
                "Asha Rao",
                "BSC MATH III"
            )])))
            .expect(1)
            .mount(&server)
            .await;

        let app = test_app(&server);
        let cookie = sign_in(&app).await;

        let response = app
            .clone()
            .oneshot(form(
                "/admin/students",
                "name=+Asha+Rao+&class=BSC+MATH+III",
                Some(&cookie),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], "/admin");
    }

    #[tokio::test]
    async fn test_revoked_admin_session_is_refused() {
        let server = MockServer::start().await;
        let admin_id = Uuid::new_v4();
        mount_admin_login(&server, admin_id).await;

        Mock::given(method("GET"))
            .and(path("/rest/v1/admins"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": Uuid::new_v4() }])))
            .up_to_n_times(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/rest/v1/admins"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/rest/v1/revoked_passes"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!([])))
            .expect(0)
            .mount(&server)
            .await;

        let app = test_app(&server);
        let cookie = sign_in(&app).await;

        let body = format!("student_id={}&reason=lost+card", Uuid::new_v4());
        let response = app
            .clone()
            .oneshot(form("/admin/revocations", &body, Some(&cookie)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_revoke_pass_records_revocation_and_log() {
        let server = MockServer::start().await;
        let admin_id = Uuid::new_v4();
        let student_id = Uuid::new_v4();
        mount_admin_login(&server, admin_id).await;

        Mock::given(method("GET"))
            .and(path("/rest/v1/admins"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": Uuid::new_v4() }])))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/rest/v1/students"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([student_json(
                student_id,
                "Asha Rao",
                "BSC MATH III"
            )])))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/rest/v1/revoked_passes"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/rest/v1/revoked_passes"))
            .and(body_partial_json(json!({
                "student_id": student_id,
                "reason": "lost card",
                "revoked_by": admin_id.to_string()
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!([{
                "id": Uuid::new_v4(),
                "student_id": student_id,
                "reason": "lost card",
                "revoked_by": admin_id.to_string(),
                "created_at": "2025-09-29T12:00:00+00:00"
            }])))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/rest/v1/pass_logs"))
            .and(body_partial_json(json!({ "action_type": "revoked" })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!([{
                "id": Uuid::new_v4(),
                "student_id": student_id,
                "action_type": "revoked",
                "ip_address": "unknown",
                "user_agent": "unknown",
                "created_at": "2025-09-29T12:00:00+00:00"
            }])))
            .expect(1)
            .mount(&server)
            .await;

        let app = test_app(&server);
        let cookie = sign_in(&app).await;

        let body = format!("student_id={}&reason=lost+card", student_id);
        let response = app
            .clone()
            .oneshot(form("/admin/revocations", &body, Some(&cookie)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
    }
}
