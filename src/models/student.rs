use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Student {
    pub id: Uuid,
    pub name: String,
    pub class: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateStudentData {
    pub name: String,
    pub class: String,
}

impl CreateStudentData {
    /// Trims both fields; returns `None` if either ends up empty
    pub fn new(name: &str, class: &str) -> Option<Self> {
        let name = name.trim();
        let class = class.trim();

        if name.is_empty() || class.is_empty() {
            return None;
        }

        Some(Self {
            name: name.to_string(),
            class: class.to_string(),
        })
    }
}

impl Student {
    /// Registers a new student
    pub async fn create(pool: &PgPool, data: &CreateStudentData) -> Result<Self, sqlx::Error> {
        let student = sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO students (name, class)
            VALUES ($1, $2)
            RETURNING *
            "#,
        )
        .bind(&data.name)
        .bind(&data.class)
        .fetch_one(pool)
        .await?;

        Ok(student)
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let student = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM students WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(student)
    }

    /// Case-insensitive exact match on the (name, class) pair
    pub async fn find_by_name_and_class(
        pool: &PgPool,
        name: &str,
        class: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let student = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM students
            WHERE lower(name) = lower($1) AND lower(class) = lower($2)
            ORDER BY created_at ASC
            LIMIT 1
            "#,
        )
        .bind(name)
        .bind(class)
        .fetch_optional(pool)
        .await?;

        Ok(student)
    }

    /// Lists all students, newest first
    pub async fn list_recent(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        let students = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM students
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(pool)
        .await?;

        Ok(students)
    }
}
