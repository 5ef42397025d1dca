use secrecy::{ExposeSecret, Secret};
use url::Url;
use uuid::Uuid;

use crate::services::signature;

/// A signed verification link for one student's pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedPass {
    pub url: String,
    pub signature: String,
}

/// Derives and checks pass signatures.
///
/// The signed message is the canonical (lowercase, hyphenated) student id and
/// nothing else, so the verifier can recompute it from the URL alone.
#[derive(Clone)]
pub struct PassSigner {
    secret: Secret<String>,
    verify_url: Url,
}

impl PassSigner {
    pub fn new(secret: Secret<String>, verify_url: &str) -> Result<Self, url::ParseError> {
        Ok(Self {
            secret,
            verify_url: Url::parse(verify_url)?,
        })
    }

    pub fn verify_url(&self) -> &Url {
        &self.verify_url
    }

    fn message(student_id: Uuid) -> String {
        student_id.hyphenated().to_string()
    }

    pub fn signature_for(&self, student_id: Uuid) -> String {
        signature::sign(
            &Self::message(student_id),
            self.secret.expose_secret().as_bytes(),
        )
    }

    /// Builds the verification URL carrying `id` and `sig` query parameters
    pub fn sign(&self, student_id: Uuid) -> SignedPass {
        let signature = self.signature_for(student_id);

        let mut url = self.verify_url.clone();
        url.query_pairs_mut()
            .append_pair("id", &Self::message(student_id))
            .append_pair("sig", &signature);

        SignedPass {
            url: url.to_string(),
            signature,
        }
    }

    pub fn verify(&self, student_id: Uuid, signature: &str) -> bool {
        signature::verify(
            &Self::message(student_id),
            signature,
            self.secret.expose_secret().as_bytes(),
        )
    }
}

impl std::fmt::Debug for PassSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PassSigner")
            .field("verify_url", &self.verify_url.as_str())
            .finish_non_exhaustive()
    }
}
