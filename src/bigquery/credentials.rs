//! Service-account credential parsing.
//!
//! The uploaded JSON key is validated up front so a bad file fails before any
//! network call. Key material stays inside `SecretString` and never reaches
//! `Debug` output or error messages.

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::error::AppError;

/// The only key type accepted.
const SERVICE_ACCOUNT_TYPE: &str = "service_account";

/// Fields read from the key file. Everything else is left to the OAuth layer.
#[derive(Deserialize)]
struct KeyFileFields {
    #[serde(rename = "type")]
    key_type: Option<String>,
    project_id: Option<String>,
    client_email: Option<String>,
    private_key: Option<String>,
    token_uri: Option<String>,
}

/// An authentication handle built from a Google service-account JSON key.
#[derive(Clone)]
pub struct ServiceAccountCredential {
    project_id: Option<String>,
    client_email: String,
    key_json: SecretString,
}

impl std::fmt::Debug for ServiceAccountCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountCredential")
            .field("project_id", &self.project_id)
            .field("client_email", &self.client_email)
            .field("key_json", &"[REDACTED]")
            .finish()
    }
}

impl ServiceAccountCredential {
    /// Parses and validates an uploaded key file.
    ///
    /// # Errors
    ///
    /// Returns `AppError::InvalidCredential` if the bytes are not a JSON
    /// object, the `type` is not `service_account`, or any of
    /// `client_email`, `private_key` and `token_uri` is missing or empty.
    pub fn from_json_bytes(bytes: &[u8]) -> Result<Self, AppError> {
        let text = std::str::from_utf8(bytes).map_err(|_| {
            AppError::InvalidCredential("The credential file is not UTF-8 text".to_string())
        })?;

        // serde_json messages can quote input, so only the position is reported.
        let fields: KeyFileFields = serde_json::from_str(text).map_err(|e| {
            AppError::InvalidCredential(format!(
                "The credential file is not a JSON key object (line {}, column {})",
                e.line(),
                e.column()
            ))
        })?;

        match fields.key_type.as_deref() {
            Some(SERVICE_ACCOUNT_TYPE) => {}
            Some(_) => {
                return Err(AppError::InvalidCredential(
                    "The credential file is not a service account key".to_string(),
                ))
            }
            None => {
                return Err(AppError::InvalidCredential(
                    "The credential file has no 'type' field".to_string(),
                ))
            }
        }

        let client_email = required(fields.client_email, "client_email")?;
        required(fields.private_key, "private_key")?;
        required(fields.token_uri, "token_uri")?;

        Ok(Self {
            project_id: fields.project_id.filter(|p| !p.trim().is_empty()),
            client_email,
            key_json: SecretString::from(text.to_string()),
        })
    }

    /// Project the key was issued in, if the file names one.
    pub fn project_id(&self) -> Option<&str> {
        self.project_id.as_deref()
    }

    pub fn client_email(&self) -> &str {
        &self.client_email
    }

    /// Converts the handle into the key type the OAuth client consumes.
    pub(crate) fn to_service_account_key(
        &self,
    ) -> Result<yup_oauth2::ServiceAccountKey, AppError> {
        yup_oauth2::parse_service_account_key(self.key_json.expose_secret().as_bytes()).map_err(
            |_| AppError::InvalidCredential("The service account key could not be read".to_string()),
        )
    }
}

fn required(value: Option<String>, field: &str) -> Result<String, AppError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(AppError::InvalidCredential(format!(
            "The credential file is missing '{}'",
            field
        ))),
    }
}
