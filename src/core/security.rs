use std::fmt;
use std::path::PathBuf;

use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::core::config::Settings;

#[derive(Debug, Error)]
pub(crate) enum SecurityError {
    #[error("no bearer token configured; sign in first (CBT_TOKEN or CBT_TOKEN_FILE)")]
    MissingToken,
    #[error("student identity unavailable: set CBT_STUDENT_ID or use a token with a subject")]
    MissingStudentId,
    #[error("credentials were cleared after submission")]
    Cleared,
}

/// Identity and bearer token passed explicitly to every backend call.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    student_id: String,
    token: String,
}

impl Credentials {
    pub fn new(student_id: impl Into<String>, token: impl Into<String>) -> Self {
        Self { student_id: student_id.into(), token: token.into() }
    }

    pub fn student_id(&self) -> &str {
        &self.student_id
    }

    pub fn bearer_token(&self) -> &str {
        &self.token
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("student_id", &self.student_id)
            .field("token", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct Claims {
    #[serde(default)]
    sub: Option<Value>,
    #[serde(default, alias = "_id", alias = "userId")]
    id: Option<Value>,
}

/// Reads the subject out of a JWT without checking its signature.
/// The backend verifies the token on every request; the client only needs the identity.
pub(crate) fn subject_from_token(token: &str) -> Option<String> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    let claims = decode::<Claims>(token, &DecodingKey::from_secret(&[]), &validation)
        .map(|data| data.claims)
        .ok()?;

    claims.sub.or(claims.id).and_then(|value| match value {
        Value::String(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    })
}

pub(crate) fn resolve_credentials(
    student_id: Option<&str>,
    token: Option<&str>,
) -> Result<Credentials, SecurityError> {
    let token = token.map(str::trim).filter(|value| !value.is_empty());
    let Some(token) = token else {
        return Err(SecurityError::MissingToken);
    };

    let student_id = match student_id.map(str::trim).filter(|value| !value.is_empty()) {
        Some(value) => value.to_string(),
        None => subject_from_token(token).ok_or(SecurityError::MissingStudentId)?,
    };

    Ok(Credentials::new(student_id, token))
}

/// Holds the signed-in student's credentials for the lifetime of one exam attempt.
pub(crate) struct CredentialStore {
    credentials: Option<Credentials>,
    token_file: PathBuf,
}

impl CredentialStore {
    pub(crate) fn from_settings(settings: &Settings) -> Result<Self, SecurityError> {
        let config = settings.credentials();
        let credentials =
            resolve_credentials(config.student_id.as_deref(), config.token.as_deref())?;
        Ok(Self::new(credentials, config.token_file.clone()))
    }

    pub(crate) fn new(credentials: Credentials, token_file: PathBuf) -> Self {
        Self { credentials: Some(credentials), token_file }
    }

    pub(crate) fn credentials(&self) -> Result<&Credentials, SecurityError> {
        self.credentials.as_ref().ok_or(SecurityError::Cleared)
    }

    pub(crate) fn is_cleared(&self) -> bool {
        self.credentials.is_none()
    }

    /// Forgets the in-memory credentials and deletes the persisted token.
    pub(crate) fn clear(&mut self) {
        self.credentials = None;
        match std::fs::remove_file(&self.token_file) {
            Ok(()) => tracing::info!(path = %self.token_file.display(), "Token file removed"),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => tracing::warn!(
                error = %err,
                path = %self.token_file.display(),
                "Failed to remove token file"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde_json::json;

    fn token_with(claims: Value) -> String {
        encode(&Header::default(), &claims, &EncodingKey::from_secret(b"backend-secret"))
            .expect("encode token")
    }

    #[test]
    fn subject_is_read_without_the_backend_secret() {
        let token = token_with(json!({ "sub": "student-42", "exp": 1 }));
        assert_eq!(subject_from_token(&token).as_deref(), Some("student-42"));
    }

    #[test]
    fn numeric_id_claim_is_accepted() {
        let token = token_with(json!({ "id": 7 }));
        assert_eq!(subject_from_token(&token).as_deref(), Some("7"));
    }

    #[test]
    fn garbage_token_has_no_subject() {
        assert_eq!(subject_from_token("not-a-jwt"), None);
    }

    #[test]
    fn explicit_student_id_wins_over_token_subject() {
        let token = token_with(json!({ "sub": "from-token" }));
        let credentials = resolve_credentials(Some("explicit"), Some(&token)).expect("creds");
        assert_eq!(credentials.student_id(), "explicit");
        assert_eq!(credentials.bearer_token(), token);
    }

    #[test]
    fn missing_token_is_rejected() {
        assert!(matches!(resolve_credentials(Some("s"), None), Err(SecurityError::MissingToken)));
        assert!(matches!(
            resolve_credentials(None, Some("opaque-token")),
            Err(SecurityError::MissingStudentId)
        ));
    }

    #[test]
    fn debug_output_redacts_token() {
        let credentials = Credentials::new("s-1", "secret-token");
        let rendered = format!("{credentials:?}");
        assert!(rendered.contains("s-1"));
        assert!(!rendered.contains("secret-token"));
    }

    #[test]
    fn clear_forgets_credentials_and_removes_token_file() {
        let path = std::env::temp_dir().join(format!("cbt-store-{}", std::process::id()));
        std::fs::write(&path, "token").expect("write token");

        let mut store = CredentialStore::new(Credentials::new("s", "token"), path.clone());
        assert!(store.credentials().is_ok());

        store.clear();
        assert!(store.is_cleared());
        assert!(matches!(store.credentials(), Err(SecurityError::Cleared)));
        assert!(!path.exists());
    }
}
