use crate::db::{Directory, DirectoryError};
use crate::models::{
    pass_log::{ClientInfo, CreatePassLogData, PassAction},
    student::Student,
};
use crate::services::pass_signer::{PassSigner, SignedPass};
use crate::services::qr_generator::{self, QrGenerationError};

#[derive(thiserror::Error, Debug)]
pub enum PassIssueError {
    #[error("Student name and class are required")]
    MissingFields,

    #[error("No student matches the given name and class")]
    StudentNotFound,

    #[error("Directory error: {0}")]
    Directory(#[from] DirectoryError),

    #[error("QR generation error: {0}")]
    QrGeneration(#[from] QrGenerationError),
}

impl PassIssueError {
    /// Message safe to show to the person requesting a pass
    pub fn user_message(&self) -> &'static str {
        match self {
            PassIssueError::MissingFields => "Please enter both your name and class.",
            PassIssueError::StudentNotFound => {
                "Student not found. Please check your name and class, or contact admin."
            }
            PassIssueError::Directory(_) => "Database error occurred",
            PassIssueError::QrGeneration(_) => "An unexpected error occurred",
        }
    }
}

/// Everything needed to render a student's pass card
#[derive(Debug, Clone)]
pub struct IssuedPass {
    pub student: Student,
    pub pass: SignedPass,
    pub qr_svg: String,
    pub qr_png_data_url: String,
}

/// Looks a student up by (name, class) and issues their pass.
///
/// The match is case-insensitive on trimmed input. A "generated" log entry is
/// appended only once a student was found and the QR code rendered.
#[tracing::instrument(skip(directory, signer, client))]
pub async fn issue_pass(
    directory: &Directory,
    signer: &PassSigner,
    name: &str,
    class: &str,
    client: &ClientInfo,
) -> Result<IssuedPass, PassIssueError> {
    let name = name.trim();
    let class = class.trim();
    if name.is_empty() || class.is_empty() {
        return Err(PassIssueError::MissingFields);
    }

    let student = directory
        .find_student_by_name_and_class(name, class)
        .await?
        .ok_or_else(|| {
            tracing::info!("No student matched pass request");
            PassIssueError::StudentNotFound
        })?;

    let pass = signer.sign(student.id);
    let qr_svg = qr_generator::generate_qr_svg(&pass.url)?;
    let qr_png_data_url = qr_generator::png_data_url(&qr_generator::generate_qr_png(&pass.url)?);

    directory
        .append_log(&CreatePassLogData::new(
            student.id,
            PassAction::Generated,
            client,
        ))
        .await?;

    tracing::info!(student_id = %student.id, "Pass generated");

    Ok(IssuedPass {
        student,
        pass,
        qr_svg,
        qr_png_data_url,
    })
}
