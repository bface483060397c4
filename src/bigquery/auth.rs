//! OAuth access tokens for the BigQuery API.

use secrecy::SecretString;
use tracing::info;
use yup_oauth2::ServiceAccountAuthenticator;

use super::credentials::ServiceAccountCredential;
use crate::error::AppError;

/// Scope granting read/write access to BigQuery.
pub const BIGQUERY_SCOPE: &str = "https://www.googleapis.com/auth/bigquery";

/// Exchanges a service-account key for a short-lived access token.
///
/// A new authenticator is built per call; nothing is cached between
/// requests because each request brings its own key.
///
/// # Errors
///
/// - `AppError::InvalidCredential` - the key could not be used to sign a grant
/// - `AppError::UpstreamFailure` - the token endpoint refused the grant
pub async fn fetch_access_token(
    credential: &ServiceAccountCredential,
) -> Result<SecretString, AppError> {
    let key = credential.to_service_account_key()?;

    let authenticator = ServiceAccountAuthenticator::builder(key)
        .build()
        .await
        .map_err(|e| {
            AppError::InvalidCredential(format!("Could not set up service account auth: {}", e.kind()))
        })?;

    info!(
        "[BQ-AUTH] Requesting access token for {}",
        redact_email(credential.client_email())
    );

    let token = authenticator
        .token(&[BIGQUERY_SCOPE])
        .await
        .map_err(|e| AppError::UpstreamFailure(format!("Token exchange failed: {}", e)))?;

    let value = token.token().ok_or_else(|| {
        AppError::UpstreamFailure("Token endpoint returned no access token".to_string())
    })?;

    info!("[BQ-AUTH] Access token acquired");

    Ok(SecretString::from(value.to_string()))
}

/// Keeps the domain and the first two characters of the local part.
fn redact_email(email: &str) -> String {
    match email.split_once('@') {
        Some((local, domain)) => {
            let visible: String = local.chars().take(2).collect();
            format!("{}***@{}", visible, domain)
        }
        None => "***".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redact_email() {
        assert_eq!(
            redact_email("loader@campaigns.iam.gserviceaccount.com"),
            "lo***@campaigns.iam.gserviceaccount.com"
        );
        assert_eq!(redact_email("no-at-sign"), "***");
    }
}
