use anyhow::Result;
use serde_json::json;
use tracing::{error, info, instrument, warn};

use crate::services::client::errors::AuthError;
use crate::services::client::session::JwtUtils;
use crate::services::client::types::*;
use crate::services::client::BackendClient;

/// Implementation of create_account functionality
/// Registers a new identity; the backend provisions the matching profile
/// record from the forwarded metadata.
#[instrument(skip(client, request), err)]
pub async fn create_account_impl(
    client: &BackendClient,
    request: &CreateAccountRequest,
) -> Result<CreatedAccount, AuthError> {
    info!(
        "Creating {} account for email: {}",
        request.attributes.user_type, request.email
    );

    let signup_url = client.auth_url("signup");
    let request_body = json!({
        "email": &request.email,
        "password": &request.password,
        "data": &request.attributes,
    });

    let response = client
        .http_client
        .post(&signup_url)
        .header("apikey", &client.config.anon_key)
        .header("Content-Type", "application/json")
        .json(&request_body)
        .send()
        .await
        .map_err(|e| AuthError::Network {
            message: format!("Failed to call signup: {}", e),
        })?;

    let status = response.status();
    if status.is_success() {
        let account_data: serde_json::Value =
            response.json().await.map_err(|e| AuthError::Network {
                message: format!("Failed to parse signup response: {}", e),
            })?;

        let created = parse_created_account(&account_data, &request.email)?;
        info!(
            "Account created successfully: {} (pending verification: {})",
            created.account_id, created.pending_verification
        );
        Ok(created)
    } else {
        let error_text = response.text().await.unwrap_or_default();
        error!(
            "Account creation failed with status {}: {}",
            status, error_text
        );
        Err(map_signup_failure(status.as_u16(), &error_text))
    }
}

/// Implementation of confirm_email functionality
/// Redeems an email-link verification token. Returns false when the backend
/// rejects the token as invalid or expired.
#[instrument(skip(client, token), err)]
pub async fn confirm_email_impl(
    client: &BackendClient,
    email: &str,
    token: &str,
) -> Result<bool, AuthError> {
    info!("Verifying email token for: {}", email);

    let verify_url = client.auth_url("verify");
    let request_body = json!({
        "type": "email",
        "email": email,
        "token": token,
    });

    let response = client
        .http_client
        .post(&verify_url)
        .header("apikey", &client.config.anon_key)
        .header("Content-Type", "application/json")
        .json(&request_body)
        .send()
        .await
        .map_err(|e| AuthError::Network {
            message: format!("Failed to call verify: {}", e),
        })?;

    let status = response.status();
    if status.is_success() {
        info!("Email verified successfully for: {}", email);
        Ok(true)
    } else if status.is_client_error() {
        let error_text = response.text().await.unwrap_or_default();
        warn!("Email verification rejected: {}", error_text);
        Ok(false)
    } else {
        let error_text = response.text().await.unwrap_or_default();
        Err(AuthError::Network {
            message: format!("Verification failed with status {}: {}", status, error_text),
        })
    }
}

/// Pull the account identity and optional immediate session out of a signup
/// response. The endpoint returns either the bare account object or a
/// `{user, session}` pair depending on whether confirmation is required.
fn parse_created_account(
    data: &serde_json::Value,
    fallback_email: &str,
) -> Result<CreatedAccount, AuthError> {
    let user = data.get("user").unwrap_or(data);

    let account_id = user["id"].as_str().unwrap_or_default().to_string();
    if account_id.is_empty() {
        return Err(AuthError::BadResponse {
            message: "signup response carried no account id".to_string(),
        });
    }

    let email = user["email"].as_str().unwrap_or(fallback_email).to_string();
    let tokens = parse_session_tokens(data);
    let pending_verification = tokens.is_none();

    Ok(CreatedAccount {
        account_id,
        email,
        pending_verification,
        tokens,
    })
}

/// Session tokens from an auth endpoint response, whether they sit at the top
/// level or nested under `session`. Expiry falls back to the token's own
/// claim when the response omits it.
pub(crate) fn parse_session_tokens(data: &serde_json::Value) -> Option<SessionTokens> {
    let holder = if data.get("access_token").is_some() {
        data
    } else {
        data.get("session")?
    };

    let access_token = holder["access_token"].as_str()?.to_string();
    let refresh_token = holder["refresh_token"]
        .as_str()
        .unwrap_or_default()
        .to_string();
    let expires_at = holder["expires_at"]
        .as_u64()
        .or_else(|| JwtUtils::get_expiration(&access_token));

    Some(SessionTokens {
        access_token,
        refresh_token,
        expires_at,
    })
}

/// Map a signup refusal to the credential error taxonomy, preserving the
/// backend's message text.
pub(crate) fn map_signup_failure(status: u16, body: &str) -> AuthError {
    let parsed: Option<serde_json::Value> = serde_json::from_str(body).ok();

    let error_code = parsed
        .as_ref()
        .and_then(|v| v.get("error_code").and_then(|c| c.as_str()))
        .unwrap_or_default()
        .to_string();
    let message = parsed
        .as_ref()
        .and_then(|v| {
            v.get("msg")
                .or_else(|| v.get("message"))
                .or_else(|| v.get("error_description"))
                .and_then(|m| m.as_str())
        })
        .unwrap_or(body)
        .to_string();
    let lowered = message.to_lowercase();

    if error_code == "user_already_exists"
        || error_code == "email_exists"
        || lowered.contains("already registered")
    {
        return AuthError::DuplicateAccount;
    }

    if error_code == "weak_password" || (status == 422 && lowered.contains("password")) {
        return AuthError::WeakCredential { message };
    }

    AuthError::Rejected {
        message: if message.is_empty() {
            format!("signup failed with status {}", status)
        } else {
            message
        },
    }
}
