//! Student directory backed by a hosted PostgREST API (e.g. Supabase).
//!
//! Tables are addressed as `{base}/rest/v1/{table}`; admin sign-in goes
//! through the password grant at `{base}/auth/v1/token`.

use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, Secret};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use super::DirectoryError;
use crate::models::{
    pass_log::{CreatePassLogData, PassLog},
    revoked_pass::{CreateRevokedPassData, RevokedPass},
    student::{CreateStudentData, Student},
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const UNIQUE_VIOLATION: &str = "23505";

#[derive(Clone, Debug)]
pub struct RestDirectory {
    client: Client,
    base_url: String,
    api_key: Secret<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    code: Option<String>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    user: AuthUser,
}

#[derive(Debug, Deserialize)]
struct AuthUser {
    id: Uuid,
}

#[derive(Debug, Deserialize)]
struct IdRow {
    #[allow(dead_code)]
    id: Uuid,
}

/// Escapes LIKE metacharacters so `ilike` performs an exact, case-insensitive match
fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

impl RestDirectory {
    pub fn new(base_url: &str, api_key: Secret<String>) -> Result<Self, DirectoryError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let key = self.api_key.expose_secret();
        self.client
            .request(method, url)
            .header("apikey", key)
            .header("Authorization", format!("Bearer {}", key))
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    async fn check(response: Response) -> Result<Response, DirectoryError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        let body: Option<ApiErrorBody> = serde_json::from_str(&text).ok();

        if body.as_ref().and_then(|b| b.code.as_deref()) == Some(UNIQUE_VIOLATION) {
            return Err(DirectoryError::Duplicate);
        }

        let message = body.and_then(|b| b.message).unwrap_or(text);
        Err(DirectoryError::Api { status, message })
    }

    async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<T>, DirectoryError> {
        let response = self
            .request(Method::GET, &self.table_url(table))
            .query(query)
            .send()
            .await?;

        Ok(Self::check(response).await?.json().await?)
    }

    async fn insert<B: Serialize, T: DeserializeOwned>(
        &self,
        table: &str,
        body: &B,
    ) -> Result<T, DirectoryError> {
        let response = self
            .request(Method::POST, &self.table_url(table))
            .header("Prefer", "return=representation")
            .json(body)
            .send()
            .await?;

        let mut rows: Vec<T> = Self::check(response).await?.json().await?;
        if rows.is_empty() {
            return Err(DirectoryError::InvalidResponse(format!(
                "insert into {} returned no rows",
                table
            )));
        }
        Ok(rows.swap_remove(0))
    }

    pub async fn ping(&self) -> Result<(), DirectoryError> {
        let _: Vec<IdRow> = self
            .select("students", &[("select", "id".to_string()), ("limit", "1".to_string())])
            .await?;
        Ok(())
    }

    pub async fn find_student(&self, id: Uuid) -> Result<Option<Student>, DirectoryError> {
        let rows: Vec<Student> = self
            .select(
                "students",
                &[
                    ("select", "*".to_string()),
                    ("id", format!("eq.{}", id)),
                    ("limit", "1".to_string()),
                ],
            )
            .await?;

        Ok(rows.into_iter().next())
    }

    pub async fn find_student_by_name_and_class(
        &self,
        name: &str,
        class: &str,
    ) -> Result<Option<Student>, DirectoryError> {
        // PostgREST rewrites `*` to `%` inside like patterns, so it cannot be matched literally
        if name.contains('*') || class.contains('*') {
            return Ok(None);
        }

        let rows: Vec<Student> = self
            .select(
                "students",
                &[
                    ("select", "*".to_string()),
                    ("name", format!("ilike.{}", escape_like(name))),
                    ("class", format!("ilike.{}", escape_like(class))),
                    ("order", "created_at.asc".to_string()),
                    ("limit", "1".to_string()),
                ],
            )
            .await?;

        Ok(rows.into_iter().next())
    }

    pub async fn create_student(&self, data: &CreateStudentData) -> Result<Student, DirectoryError> {
        self.insert("students", data).await
    }

    pub async fn list_students(&self) -> Result<Vec<Student>, DirectoryError> {
        self.select(
            "students",
            &[
                ("select", "*".to_string()),
                ("order", "created_at.desc".to_string()),
            ],
        )
        .await
    }

    pub async fn append_log(&self, data: &CreatePassLogData) -> Result<PassLog, DirectoryError> {
        self.insert("pass_logs", data).await
    }

    pub async fn recent_logs(&self, limit: i64) -> Result<Vec<PassLog>, DirectoryError> {
        self.select(
            "pass_logs",
            &[
                ("select", "*".to_string()),
                ("order", "created_at.desc".to_string()),
                ("limit", limit.to_string()),
            ],
        )
        .await
    }

    pub async fn is_revoked(&self, student_id: Uuid) -> Result<bool, DirectoryError> {
        let rows: Vec<IdRow> = self
            .select(
                "revoked_passes",
                &[
                    ("select", "id".to_string()),
                    ("student_id", format!("eq.{}", student_id)),
                    ("limit", "1".to_string()),
                ],
            )
            .await?;

        Ok(!rows.is_empty())
    }

    pub async fn revoke_pass(
        &self,
        data: &CreateRevokedPassData,
    ) -> Result<RevokedPass, DirectoryError> {
        self.insert("revoked_passes", data).await
    }

    pub async fn list_revoked(&self) -> Result<Vec<RevokedPass>, DirectoryError> {
        self.select(
            "revoked_passes",
            &[
                ("select", "*".to_string()),
                ("order", "created_at.desc".to_string()),
            ],
        )
        .await
    }

    #[tracing::instrument(skip(self, password))]
    pub async fn authenticate_admin(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<Uuid>, DirectoryError> {
        let url = format!("{}/auth/v1/token", self.base_url);
        let response = self
            .request(Method::POST, &url)
            .query(&[("grant_type", "password")])
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;

        if matches!(
            response.status(),
            StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED
        ) {
            tracing::info!("Admin sign-in rejected by auth service");
            return Ok(None);
        }

        let token: TokenResponse = Self::check(response).await?.json().await?;

        if self.is_admin(token.user.id).await? {
            Ok(Some(token.user.id))
        } else {
            tracing::warn!(user_id = %token.user.id, "Authenticated user is not an admin");
            Ok(None)
        }
    }

    pub async fn is_admin(&self, user_id: Uuid) -> Result<bool, DirectoryError> {
        let rows: Vec<IdRow> = self
            .select(
                "admins",
                &[
                    ("select", "id".to_string()),
                    ("user_id", format!("eq.{}", user_id)),
                    ("limit", "1".to_string()),
                ],
            )
            .await?;

        Ok(!rows.is_empty())
    }
}
