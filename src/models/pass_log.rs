use std::fmt;

use axum::http::HeaderMap;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

pub const UNKNOWN_CLIENT: &str = "unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "text", rename_all = "lowercase")]
pub enum PassAction {
    Generated,
    Verified,
    Revoked,
}

impl PassAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            PassAction::Generated => "generated",
            PassAction::Verified => "verified",
            PassAction::Revoked => "revoked",
        }
    }

    /// CSS class used for the dashboard activity badge
    pub fn badge_class(&self) -> &'static str {
        match self {
            PassAction::Generated => "badge-generated",
            PassAction::Verified => "badge-verified",
            PassAction::Revoked => "badge-revoked",
        }
    }
}

impl fmt::Display for PassAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PassLog {
    pub id: Uuid,
    pub student_id: Uuid,
    pub action_type: PassAction,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl PassLog {
    /// First eight characters of the student id, for compact listings
    pub fn short_student_id(&self) -> String {
        self.student_id.to_string().chars().take(8).collect()
    }
}

/// Caller details recorded alongside every log entry.
///
/// Both fields are best-effort; missing headers are recorded as "unknown".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientInfo {
    pub ip_address: String,
    pub user_agent: String,
}

impl ClientInfo {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let ip_address = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .unwrap_or(UNKNOWN_CLIENT)
            .to_string();

        let user_agent = headers
            .get(axum::http::header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .unwrap_or(UNKNOWN_CLIENT)
            .to_string();

        Self {
            ip_address,
            user_agent,
        }
    }

    pub fn unknown() -> Self {
        Self {
            ip_address: UNKNOWN_CLIENT.to_string(),
            user_agent: UNKNOWN_CLIENT.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CreatePassLogData {
    pub student_id: Uuid,
    pub action_type: PassAction,
    pub ip_address: String,
    pub user_agent: String,
}

impl CreatePassLogData {
    pub fn new(student_id: Uuid, action_type: PassAction, client: &ClientInfo) -> Self {
        Self {
            student_id,
            action_type,
            ip_address: client.ip_address.clone(),
            user_agent: client.user_agent.clone(),
        }
    }
}

impl PassLog {
    /// Appends a log entry
    pub async fn create(pool: &PgPool, data: &CreatePassLogData) -> Result<Self, sqlx::Error> {
        let log = sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO pass_logs (student_id, action_type, ip_address, user_agent)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(data.student_id)
        .bind(data.action_type.as_str())
        .bind(&data.ip_address)
        .bind(&data.user_agent)
        .fetch_one(pool)
        .await?;

        Ok(log)
    }

    /// Lists the most recent log entries across all students
    pub async fn list_recent(pool: &PgPool, limit: i64) -> Result<Vec<Self>, sqlx::Error> {
        let logs = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM pass_logs
            ORDER BY created_at DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(pool)
        .await?;

        Ok(logs)
    }
}
