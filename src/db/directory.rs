use sqlx::PgPool;
use uuid::Uuid;

use crate::db::rest::RestDirectory;
use crate::models::{
    admin::Admin,
    pass_log::{CreatePassLogData, PassLog},
    revoked_pass::{CreateRevokedPassData, RevokedPass},
    student::{CreateStudentData, Student},
};
use crate::services::password;

const UNIQUE_VIOLATION: &str = "23505";

#[derive(thiserror::Error, Debug)]
pub enum DirectoryError {
    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Directory API error ({status}): {message}")]
    Api {
        status: reqwest::StatusCode,
        message: String,
    },

    #[error("Record already exists")]
    Duplicate,

    #[error("Unexpected directory response: {0}")]
    InvalidResponse(String),
}

impl From<sqlx::Error> for DirectoryError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::Database(db) if db.code().as_deref() == Some(UNIQUE_VIOLATION) => {
                DirectoryError::Duplicate
            }
            _ => DirectoryError::Database(e),
        }
    }
}

/// The student directory: students, pass logs, revocations and admins.
///
/// Every call is an independent request; nothing is cached and no call is
/// transactional with another.
#[derive(Clone, Debug)]
pub enum Directory {
    Postgres(PgPool),
    Rest(RestDirectory),
}

impl Directory {
    /// Cheap round trip used by the health check
    pub async fn ping(&self) -> Result<(), DirectoryError> {
        match self {
            Directory::Postgres(pool) => {
                sqlx::query("SELECT 1").execute(pool).await?;
                Ok(())
            }
            Directory::Rest(rest) => rest.ping().await,
        }
    }

    pub async fn find_student(&self, id: Uuid) -> Result<Option<Student>, DirectoryError> {
        match self {
            Directory::Postgres(pool) => Ok(Student::find_by_id(pool, id).await?),
            Directory::Rest(rest) => rest.find_student(id).await,
        }
    }

    pub async fn find_student_by_name_and_class(
        &self,
        name: &str,
        class: &str,
    ) -> Result<Option<Student>, DirectoryError> {
        match self {
            Directory::Postgres(pool) => {
                Ok(Student::find_by_name_and_class(pool, name, class).await?)
            }
            Directory::Rest(rest) => rest.find_student_by_name_and_class(name, class).await,
        }
    }

    pub async fn create_student(&self, data: &CreateStudentData) -> Result<Student, DirectoryError> {
        match self {
            Directory::Postgres(pool) => Ok(Student::create(pool, data).await?),
            Directory::Rest(rest) => rest.create_student(data).await,
        }
    }

    pub async fn list_students(&self) -> Result<Vec<Student>, DirectoryError> {
        match self {
            Directory::Postgres(pool) => Ok(Student::list_recent(pool).await?),
            Directory::Rest(rest) => rest.list_students().await,
        }
    }

    pub async fn append_log(&self, data: &CreatePassLogData) -> Result<PassLog, DirectoryError> {
        match self {
            Directory::Postgres(pool) => Ok(PassLog::create(pool, data).await?),
            Directory::Rest(rest) => rest.append_log(data).await,
        }
    }

    pub async fn recent_logs(&self, limit: i64) -> Result<Vec<PassLog>, DirectoryError> {
        match self {
            Directory::Postgres(pool) => Ok(PassLog::list_recent(pool, limit).await?),
            Directory::Rest(rest) => rest.recent_logs(limit).await,
        }
    }

    /// Read at call time; revocations take effect on the next verification
    pub async fn is_revoked(&self, student_id: Uuid) -> Result<bool, DirectoryError> {
        match self {
            Directory::Postgres(pool) => Ok(RevokedPass::exists_for_student(pool, student_id).await?),
            Directory::Rest(rest) => rest.is_revoked(student_id).await,
        }
    }

    pub async fn revoke_pass(
        &self,
        data: &CreateRevokedPassData,
    ) -> Result<RevokedPass, DirectoryError> {
        match self {
            Directory::Postgres(pool) => Ok(RevokedPass::create(pool, data).await?),
            Directory::Rest(rest) => rest.revoke_pass(data).await,
        }
    }

    pub async fn list_revoked(&self) -> Result<Vec<RevokedPass>, DirectoryError> {
        match self {
            Directory::Postgres(pool) => Ok(RevokedPass::list_all(pool).await?),
            Directory::Rest(rest) => rest.list_revoked().await,
        }
    }

    /// Checks admin credentials and returns the admin id on success.
    ///
    /// Wrong credentials and non-admin accounts both yield `Ok(None)`.
    pub async fn authenticate_admin(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<Uuid>, DirectoryError> {
        match self {
            Directory::Postgres(pool) => {
                let Some(admin) = Admin::find_by_email(pool, email).await? else {
                    return Ok(None);
                };

                if password::verify_password(password, &admin.password_hash) {
                    Ok(Some(admin.id))
                } else {
                    Ok(None)
                }
            }
            Directory::Rest(rest) => rest.authenticate_admin(email, password).await,
        }
    }

    pub async fn is_admin(&self, admin_id: Uuid) -> Result<bool, DirectoryError> {
        match self {
            Directory::Postgres(pool) => Ok(Admin::exists(pool, admin_id).await?),
            Directory::Rest(rest) => rest.is_admin(admin_id).await,
        }
    }
}
