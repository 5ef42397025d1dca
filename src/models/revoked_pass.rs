use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RevokedPass {
    pub id: Uuid,
    pub student_id: Uuid,
    pub reason: Option<String>, // free text, e.g. "lost card"
    pub revoked_by: Option<String>, // admin id that performed the revocation
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateRevokedPassData {
    pub student_id: Uuid,
    pub reason: Option<String>,
    pub revoked_by: Option<String>,
}

impl RevokedPass {
    pub async fn create(pool: &PgPool, data: &CreateRevokedPassData) -> Result<Self, sqlx::Error> {
        let revoked = sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO revoked_passes (student_id, reason, revoked_by)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(data.student_id)
        .bind(&data.reason)
        .bind(&data.revoked_by)
        .fetch_one(pool)
        .await?;

        Ok(revoked)
    }

    /// Whether any revocation row exists for the student
    pub async fn exists_for_student(pool: &PgPool, student_id: Uuid) -> Result<bool, sqlx::Error> {
        let exists = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(SELECT 1 FROM revoked_passes WHERE student_id = $1)
            "#,
        )
        .bind(student_id)
        .fetch_one(pool)
        .await?;

        Ok(exists)
    }

    pub async fn list_all(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        let revoked = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM revoked_passes
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(pool)
        .await?;

        Ok(revoked)
    }
}
