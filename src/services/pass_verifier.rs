use serde::Deserialize;
use uuid::Uuid;

use crate::db::Directory;
use crate::models::{
    pass_log::{ClientInfo, CreatePassLogData, PassAction},
    student::Student,
};
use crate::services::pass_signer::PassSigner;

/// Query parameters carried by a pass URL
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VerifyParams {
    pub id: Option<String>,
    pub sig: Option<String>,
}

#[derive(Debug)]
pub enum VerificationOutcome {
    Verified { student: Student },
    MissingParameters,
    StudentNotFound,
    Revoked { student_id: Uuid },
    InvalidSignature { student_id: Uuid },
    Failed,
}

impl VerificationOutcome {
    /// Returns the outcome as a string for logging
    pub fn result_type(&self) -> &'static str {
        match self {
            VerificationOutcome::Verified { .. } => "verified",
            VerificationOutcome::MissingParameters => "missing_parameters",
            VerificationOutcome::StudentNotFound => "student_not_found",
            VerificationOutcome::Revoked { .. } => "revoked",
            VerificationOutcome::InvalidSignature { .. } => "invalid_signature",
            VerificationOutcome::Failed => "failed",
        }
    }

    /// Message shown on the result page.
    ///
    /// A bad signature reads exactly like an unknown student so the page never
    /// confirms that an id exists.
    pub fn message(&self) -> &'static str {
        match self {
            VerificationOutcome::Verified { .. } => "Pass verified",
            VerificationOutcome::MissingParameters => "Missing parameters",
            VerificationOutcome::StudentNotFound | VerificationOutcome::InvalidSignature { .. } => {
                "Invalid pass - student not found"
            }
            VerificationOutcome::Revoked { .. } => "This pass has been revoked",
            VerificationOutcome::Failed => "Verification failed",
        }
    }

    pub fn is_verified(&self) -> bool {
        matches!(self, VerificationOutcome::Verified { .. })
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Verifies a scanned pass.
///
/// Steps, each terminal on failure:
/// 1. Require both `id` and `sig` (no directory access otherwise)
/// 2. Look up the student
/// 3. Reject revoked passes, whatever the signature
/// 4. Compare `sig` against the recomputed signature
/// 5. Append a "verified" log entry
#[tracing::instrument(skip(directory, signer, params, client))]
pub async fn verify_pass(
    directory: &Directory,
    signer: &PassSigner,
    params: &VerifyParams,
    client: &ClientInfo,
) -> VerificationOutcome {
    let (Some(raw_id), Some(sig)) = (non_empty(&params.id), non_empty(&params.sig)) else {
        tracing::info!("Verification request missing parameters");
        return VerificationOutcome::MissingParameters;
    };

    // Ids are UUIDs; anything else cannot exist in the directory
    let Ok(student_id) = Uuid::parse_str(raw_id) else {
        tracing::info!("Verification request with malformed student id");
        return VerificationOutcome::StudentNotFound;
    };

    let student = match directory.find_student(student_id).await {
        Ok(Some(student)) => student,
        Ok(None) => {
            tracing::info!(student_id = %student_id, "Student not found");
            return VerificationOutcome::StudentNotFound;
        }
        Err(e) => {
            tracing::error!(student_id = %student_id, error = %e, "Student lookup failed");
            return VerificationOutcome::StudentNotFound;
        }
    };

    match directory.is_revoked(student_id).await {
        Ok(false) => {}
        Ok(true) => {
            tracing::info!(student_id = %student_id, "Revoked pass presented");
            return VerificationOutcome::Revoked { student_id };
        }
        Err(e) => {
            tracing::error!(student_id = %student_id, error = %e, "Revocation check failed");
            return VerificationOutcome::Failed;
        }
    }

    if !signer.verify(student_id, sig) {
        tracing::warn!(student_id = %student_id, "Pass signature mismatch");
        return VerificationOutcome::InvalidSignature { student_id };
    }

    if let Err(e) = directory
        .append_log(&CreatePassLogData::new(
            student_id,
            PassAction::Verified,
            client,
        ))
        .await
    {
        tracing::error!(student_id = %student_id, error = %e, "Failed to record verification");
        return VerificationOutcome::Failed;
    }

    tracing::info!(student_id = %student_id, "Pass verified");
    VerificationOutcome::Verified { student }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{mock_directory, student_json, test_signer};
    use serde_json::json;
    use wiremock::matchers::{any, body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn mount_student(server: &MockServer, id: Uuid) {
        Mock::given(method("GET"))
            .and(path("/rest/v1/students"))
            .and(query_param("id", format!("eq.{}", id)))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!([student_json(id, "Asha Rao", "BSC MATH III")])),
            )
            .mount(server)
            .await;
    }

    async fn mount_revoked(server: &MockServer, revoked: bool) {
        let body = if revoked {
            json!([{ "id": Uuid::new_v4() }])
        } else {
            json!([])
        };

        Mock::given(method("GET"))
            .and(path("/rest/v1/revoked_passes"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(server)
            .await;
    }

    fn params(id: Option<&str>, sig: Option<&str>) -> VerifyParams {
        VerifyParams {
            id: id.map(str::to_string),
            sig: sig.map(str::to_string),
        }
    }

    fn full(id: Uuid, sig: &str) -> VerifyParams {
        params(Some(id.to_string().as_str()), Some(sig))
    }

    #[tokio::test]
    async fn test_missing_parameters_issue_no_queries() {
        let server = MockServer::start().await;
        Mock::given(any())
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(0)
            .mount(&server)
            .await;

        let directory = mock_directory(&server);
        let signer = test_signer();
        let id = Uuid::new_v4().to_string();

        for p in [
            params(None, None),
            params(Some(id.as_str()), None),
            params(None, Some("abc")),
            params(Some(""), Some("abc")),
            params(Some(id.as_str()), Some("  ")),
        ] {
            let outcome = verify_pass(&directory, &signer, &p, &ClientInfo::unknown()).await;
            assert!(matches!(outcome, VerificationOutcome::MissingParameters));
            assert_eq!(outcome.message(), "Missing parameters");
        }
    }

    #[tokio::test]
    async fn test_valid_pass_logs_verified_once() {
        let server = MockServer::start().await;
        let id = Uuid::new_v4();
        mount_student(&server, id).await;
        mount_revoked(&server, false).await;

        Mock::given(method("POST"))
            .and(path("/rest/v1/pass_logs"))
            .and(body_partial_json(json!({
                "student_id": id,
                "action_type": "verified",
                "ip_address": "198.51.100.4"
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!([{
                "id": Uuid::new_v4(),
                "student_id": id,
                "action_type": "verified",
                "ip_address": "198.51.100.4",
                "user_agent": "unknown",
                "created_at": "2025-09-30T09:15:00+00:00"
            }])))
            .expect(1)
            .mount(&server)
            .await;

        let signer = test_signer();
        let sig = signer.signature_for(id);
        let client = ClientInfo {
            ip_address: "198.51.100.4".to_string(),
            user_agent: "unknown".to_string(),
        };

        let outcome = verify_pass(
            &mock_directory(&server),
            &signer,
            &full(id, &sig),
            &client,
        )
        .await;

        match outcome {
            VerificationOutcome::Verified { student } => assert_eq!(student.name, "Asha Rao"),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_revoked_pass_rejected_regardless_of_signature() {
        let server = MockServer::start().await;
        let id = Uuid::new_v4();
        mount_student(&server, id).await;
        mount_revoked(&server, true).await;

        Mock::given(method("POST"))
            .and(path("/rest/v1/pass_logs"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!([])))
            .expect(0)
            .mount(&server)
            .await;

        let signer = test_signer();
        let directory = mock_directory(&server);
        for sig in [signer.signature_for(id), "deadbeef".to_string()] {
            let outcome = verify_pass(
                &directory,
                &signer,
                &full(id, &sig),
                &ClientInfo::unknown(),
            )
            .await;
            assert!(matches!(outcome, VerificationOutcome::Revoked { .. }));
            assert_eq!(outcome.message(), "This pass has been revoked");
        }
    }

    #[tokio::test]
    async fn test_bad_signature_rejected_without_log() {
        let server = MockServer::start().await;
        let id = Uuid::new_v4();
        mount_student(&server, id).await;
        mount_revoked(&server, false).await;

        Mock::given(method("POST"))
            .and(path("/rest/v1/pass_logs"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!([])))
            .expect(0)
            .mount(&server)
            .await;

        let forged = test_signer().signature_for(Uuid::new_v4());
        let outcome = verify_pass(
            &mock_directory(&server),
            &test_signer(),
            &full(id, &forged),
            &ClientInfo::unknown(),
        )
        .await;

        assert!(matches!(outcome, VerificationOutcome::InvalidSignature { .. }));
        assert_eq!(outcome.message(), "Invalid pass - student not found");
    }

    #[tokio::test]
    async fn test_unknown_and_malformed_ids_not_found() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/rest/v1/students"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let directory = mock_directory(&server);
        let signer = test_signer();

        let unknown = Uuid::new_v4();
        let outcome = verify_pass(
            &directory,
            &signer,
            &full(unknown, &signer.signature_for(unknown)),
            &ClientInfo::unknown(),
        )
        .await;
        assert!(matches!(outcome, VerificationOutcome::StudentNotFound));

        let outcome = verify_pass(
            &directory,
            &signer,
            &params(Some("not-a-uuid"), Some("abc")),
            &ClientInfo::unknown(),
        )
        .await;
        assert!(matches!(outcome, VerificationOutcome::StudentNotFound));
    }

    #[tokio::test]
    async fn test_lookup_error_collapses_to_not_found() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/rest/v1/students"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let id = Uuid::new_v4();
        let outcome = verify_pass(
            &mock_directory(&server),
            &test_signer(),
            &full(id, "abc"),
            &ClientInfo::unknown(),
        )
        .await;
        assert_eq!(outcome.message(), "Invalid pass - student not found");
    }

    #[tokio::test]
    async fn test_log_failure_is_generic_failure() {
        let server = MockServer::start().await;
        let id = Uuid::new_v4();
        mount_student(&server, id).await;
        mount_revoked(&server, false).await;

        Mock::given(method("POST"))
            .and(path("/rest/v1/pass_logs"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let signer = test_signer();
        let outcome = verify_pass(
            &mock_directory(&server),
            &signer,
            &full(id, &signer.signature_for(id)),
            &ClientInfo::unknown(),
        )
        .await;

        assert!(matches!(outcome, VerificationOutcome::Failed));
        assert_eq!(outcome.message(), "Verification failed");
    }
}
